// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decoded JWT claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::AuthError;

/// Name of the claim carrying granted permission strings.
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// The `aud` claim, which may be a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Claims of a verified token.
///
/// Registered claims the gate validates are typed; every other payload
/// member (including `permissions`) is kept in `extra`, so the struct
/// serializes back to the payload it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: Audience,

    /// Expiration time as a NumericDate (seconds since the Unix epoch,
    /// fractions allowed)
    pub exp: Number,

    /// Subject (caller identity), used for audit logging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Remaining payload members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Build claims from a signature-verified payload.
    pub fn from_payload(payload: Value) -> Result<Self, AuthError> {
        serde_json::from_value(payload).map_err(|_| AuthError::MalformedToken)
    }

    /// The granted permission set.
    ///
    /// `None` when the claim is absent or is not an array of strings.
    pub fn permissions(&self) -> Option<Vec<&str>> {
        let Value::Array(items) = self.extra.get(PERMISSIONS_CLAIM)? else {
            return None;
        };
        items.iter().map(Value::as_str).collect()
    }

    /// Require `permission` to be an exact element of the permission set.
    pub fn require_permission(&self, permission: &str) -> Result<(), AuthError> {
        let granted = self
            .permissions()
            .ok_or(AuthError::PermissionsClaimMissing)?;

        if granted.contains(&permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientScope)
        }
    }

    /// Subject for log lines, `"unknown"` when the token has none.
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or("unknown")
    }
}
