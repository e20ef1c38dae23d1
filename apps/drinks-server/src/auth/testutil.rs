// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test helpers: throwaway ES256 keys, signed tokens and an in-process key source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde_json::{json, Value};

use super::{AuthError, AuthGate, JwksManager, KeySetSource};

pub const TEST_ISSUER: &str = "https://drinks-test.example.com/";
pub const TEST_AUDIENCE: &str = "drinks";

/// An ES256 signing key with its public JWK.
pub struct TestKey {
    pub kid: String,
    pkcs8: Vec<u8>,
    x: String,
    y: String,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .expect("generate P-256 key");
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .expect("parse generated key");

        // Uncompressed point: 0x04 || x || y
        let public = pair.public_key().as_ref();
        Self {
            kid: kid.to_string(),
            pkcs8: pkcs8.as_ref().to_vec(),
            x: URL_SAFE_NO_PAD.encode(&public[1..33]),
            y: URL_SAFE_NO_PAD.encode(&public[33..65]),
        }
    }

    pub fn jwk(&self) -> Jwk {
        serde_json::from_value(json!({
            "kty": "EC",
            "crv": "P-256",
            "x": self.x,
            "y": self.y,
            "kid": self.kid,
            "alg": "ES256",
            "use": "sig"
        }))
        .expect("valid EC jwk")
    }

    /// Sign `payload` with this key, naming this key's kid.
    pub fn sign(&self, payload: &Value) -> String {
        self.sign_as(&self.kid, payload)
    }

    /// Sign `payload` with this key but put `kid` in the header.
    pub fn sign_as(&self, kid: &str, payload: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(kid.to_string());
        encode(&header, payload, &EncodingKey::from_ec_der(&self.pkcs8)).expect("sign token")
    }
}

pub fn key_set(keys: &[&TestKey]) -> JwkSet {
    JwkSet {
        keys: keys.iter().map(|key| key.jwk()).collect(),
    }
}

pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64
}

/// A payload that passes every claim check and grants `permissions`.
pub fn valid_payload(permissions: &[&str]) -> Value {
    json!({
        "iss": TEST_ISSUER,
        "sub": "auth0|barista",
        "aud": [TEST_AUDIENCE, "https://drinks-test.example.com/userinfo"],
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Key source serving a replaceable in-memory key set.
pub struct StaticKeySet {
    keys: Mutex<Option<JwkSet>>,
    fetches: AtomicUsize,
    delay: Option<Duration>,
}

impl StaticKeySet {
    pub fn new(keys: JwkSet) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(Some(keys)),
            fetches: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// Like `new`, but every fetch takes `delay` to complete.
    pub fn slow(keys: JwkSet, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(Some(keys)),
            fetches: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn replace(&self, keys: JwkSet) {
        *self.keys.lock().unwrap() = Some(keys);
    }

    /// Make subsequent fetches fail.
    pub fn go_offline(&self) {
        *self.keys.lock().unwrap() = None;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySet {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.keys
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::KeySetUnavailable("test source offline".into()))
    }
}

/// Gate trusting `keys` with the test issuer and audience, plus the source
/// backing it.
pub fn test_gate(keys: &[&TestKey]) -> (AuthGate, Arc<StaticKeySet>) {
    let source = StaticKeySet::new(key_set(keys));
    let manager = JwksManager::new(source.clone());
    let gate = AuthGate::new(Arc::new(manager), TEST_ISSUER, TEST_AUDIENCE);
    (gate, source)
}
