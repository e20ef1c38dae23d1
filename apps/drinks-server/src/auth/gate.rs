// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The authorization gate.
//!
//! `AuthGate::authorize` takes the raw `Authorization` header and the
//! permission a route requires, and either returns the verified claims or
//! the first check that failed:
//!
//! 1. header is `Bearer <token>` → `MalformedHeader`
//! 2. token is a three-segment JWT with a `kid` → `MalformedToken`
//! 3. `kid` is in the signing key set → `UnknownKey`
//! 4. algorithm matches the key and the signature verifies → `InvalidSignature`
//! 5. `exp`, `nbf`, `iss`, `aud` → `ClaimRejected`
//! 6. `permissions` contains the required permission →
//!    `PermissionsClaimMissing` / `InsufficientScope`

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Header, Validation};
use serde_json::Value;

use super::error::{ClaimRejection, HeaderRejection};
use super::jwks::{JwksManager, VerificationKey};
use super::{AuthError, Claims};

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies bearer tokens against the issuer's signing keys.
pub struct AuthGate {
    keys: Arc<JwksManager>,
    issuer: String,
    audience: String,
    /// Clock skew tolerance in seconds
    leeway: u64,
}

impl AuthGate {
    pub fn new(
        keys: Arc<JwksManager>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway: 0,
        }
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    pub fn keys(&self) -> &JwksManager {
        &self.keys
    }

    /// Decide whether a request carrying `raw_header` may perform an
    /// operation that requires `required_permission`.
    pub async fn authorize(
        &self,
        raw_header: Option<&str>,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let token = bearer_token(raw_header)?;
        let header = decode_structure(token)?;
        let kid = header.kid.as_deref().ok_or(AuthError::MalformedToken)?;

        let key = self.keys.decoding_key(kid).await?;
        if header.alg != key.algorithm {
            return Err(AuthError::InvalidSignature);
        }

        let claims = self.verify(token, &key)?;
        claims.require_permission(required_permission)?;
        Ok(claims)
    }

    /// Check the signature, then the registered claims.
    fn verify(&self, token: &str, key: &VerificationKey) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(key.algorithm);
        validation.leeway = self.leeway;
        // `exp` must lie strictly after now - leeway.
        validation.reject_tokens_expiring_in_less_than = 1;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let token_data =
            decode::<Value>(token, &key.decoding_key, &validation).map_err(map_decode_error)?;
        Claims::from_payload(token_data.claims)
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(raw_header: Option<&str>) -> Result<&str, AuthError> {
    let header = raw_header.ok_or(AuthError::MalformedHeader(HeaderRejection::Missing))?;

    if header == BEARER_PREFIX.trim_end() {
        return Err(AuthError::MalformedHeader(HeaderRejection::NotSingleToken));
    }
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader(HeaderRejection::NotBearer))?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedHeader(HeaderRejection::NotSingleToken));
    }
    Ok(token)
}

fn decode_structure(token: &str) -> Result<Header, AuthError> {
    if token.split('.').count() != 3 {
        return Err(AuthError::MalformedToken);
    }
    decode_header(token).map_err(|_| AuthError::MalformedToken)
}

fn map_decode_error(error: jsonwebtoken::errors::Error) -> AuthError {
    match error.kind() {
        // The header is already parsed and the payload is only decoded once
        // the signature verifies, so bad base64 here is in the signature.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::Base64(_) => {
            AuthError::InvalidSignature
        }
        // With three segments known, this is only raised for `exp` below the
        // expiry margin, i.e. `exp == 0`.
        ErrorKind::ExpiredSignature | ErrorKind::InvalidToken => {
            AuthError::ClaimRejected(ClaimRejection::Expired)
        }
        ErrorKind::ImmatureSignature => AuthError::ClaimRejected(ClaimRejection::NotYetValid),
        ErrorKind::InvalidIssuer => AuthError::ClaimRejected(ClaimRejection::BadIssuer),
        ErrorKind::InvalidAudience => AuthError::ClaimRejected(ClaimRejection::BadAudience),
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "exp" => AuthError::ClaimRejected(ClaimRejection::Expired),
            "iss" => AuthError::ClaimRejected(ClaimRejection::BadIssuer),
            "aud" => AuthError::ClaimRejected(ClaimRejection::BadAudience),
            _ => AuthError::MalformedToken,
        },
        _ => AuthError::MalformedToken,
    }
}
