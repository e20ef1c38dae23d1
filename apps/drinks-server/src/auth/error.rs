// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.
//!
//! Every variant maps to a stable `error_code` and a fixed description.
//! Library error text, key material and token bytes never reach the
//! response body; fetch details are only carried for logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why the `Authorization` header was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRejection {
    /// No header at all
    Missing,
    /// Header does not start with `Bearer `
    NotBearer,
    /// Zero tokens, or more than one whitespace-separated segment
    NotSingleToken,
}

/// Why a verified token's registered claims were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    /// `exp` is in the past (or missing)
    Expired,
    /// `nbf` is in the future
    NotYetValid,
    /// `iss` is not the configured issuer (or missing)
    BadIssuer,
    /// `aud` does not contain the configured audience (or missing)
    BadAudience,
}

/// Authorization failure returned by the gate.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("malformed authorization header: {0:?}")]
    MalformedHeader(HeaderRejection),

    #[error("malformed token")]
    MalformedToken,

    #[error("token signed by a key that is not in the signing key set")]
    UnknownKey,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token claim rejected: {0:?}")]
    ClaimRejected(ClaimRejection),

    #[error("token carries no permissions claim")]
    PermissionsClaimMissing,

    #[error("token lacks the required permission")]
    InsufficientScope,

    /// The key source could not be reached and nothing is cached.
    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: u16,
    error_code: &'static str,
    message: &'static str,
}

impl AuthError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MalformedHeader(_) => "malformed_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownKey => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ClaimRejected(ClaimRejection::Expired) => "token_expired",
            AuthError::ClaimRejected(ClaimRejection::NotYetValid) => "token_not_yet_valid",
            AuthError::ClaimRejected(ClaimRejection::BadIssuer) => "invalid_issuer",
            AuthError::ClaimRejected(ClaimRejection::BadAudience) => "invalid_audience",
            AuthError::PermissionsClaimMissing => "permissions_claim_missing",
            AuthError::InsufficientScope => "insufficient_scope",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
        }
    }

    /// Human-readable description, safe to return to clients.
    pub fn description(&self) -> &'static str {
        match self {
            AuthError::MalformedHeader(HeaderRejection::Missing) => {
                "Authorization header is required"
            }
            AuthError::MalformedHeader(HeaderRejection::NotBearer) => {
                "Authorization header must start with 'Bearer'"
            }
            AuthError::MalformedHeader(HeaderRejection::NotSingleToken) => {
                "Authorization header must be 'Bearer <token>'"
            }
            AuthError::MalformedToken => "Token is malformed",
            AuthError::UnknownKey => "Token was signed by an unknown key",
            AuthError::InvalidSignature => "Token signature is invalid",
            AuthError::ClaimRejected(ClaimRejection::Expired) => "Token has expired",
            AuthError::ClaimRejected(ClaimRejection::NotYetValid) => "Token is not yet valid",
            AuthError::ClaimRejected(ClaimRejection::BadIssuer) => "Token issuer is invalid",
            AuthError::ClaimRejected(ClaimRejection::BadAudience) => "Token audience is invalid",
            AuthError::PermissionsClaimMissing => "Permissions are not included in the token",
            AuthError::InsufficientScope => "Permission not granted for this operation",
            AuthError::KeySetUnavailable(_) => "Token signing keys are currently unavailable",
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedHeader(_)
            | AuthError::MalformedToken
            | AuthError::UnknownKey
            | AuthError::InvalidSignature
            | AuthError::ClaimRejected(_)
            | AuthError::PermissionsClaimMissing => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientScope => StatusCode::FORBIDDEN,
            AuthError::KeySetUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            success: false,
            error: status.as_u16(),
            error_code: self.error_code(),
            message: self.description(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_header_returns_401() {
        let response = AuthError::MalformedHeader(HeaderRejection::Missing).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 401);
        assert_eq!(body["error_code"], "malformed_header");
        assert_eq!(body["message"], "Authorization header is required");
    }

    #[tokio::test]
    async fn insufficient_scope_returns_403() {
        let response = AuthError::InsufficientScope.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn every_token_failure_is_401() {
        let failures = [
            AuthError::MalformedHeader(HeaderRejection::NotBearer),
            AuthError::MalformedToken,
            AuthError::UnknownKey,
            AuthError::InvalidSignature,
            AuthError::ClaimRejected(ClaimRejection::Expired),
            AuthError::ClaimRejected(ClaimRejection::BadIssuer),
            AuthError::ClaimRejected(ClaimRejection::BadAudience),
            AuthError::PermissionsClaimMissing,
        ];
        for failure in failures {
            assert_eq!(failure.status_code(), StatusCode::UNAUTHORIZED, "{failure:?}");
        }
    }

    #[test]
    fn claim_rejections_have_distinct_codes() {
        let codes = [
            ClaimRejection::Expired,
            ClaimRejection::NotYetValid,
            ClaimRejection::BadIssuer,
            ClaimRejection::BadAudience,
        ]
        .map(|reason| AuthError::ClaimRejected(reason).error_code());
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[tokio::test]
    async fn fetch_detail_is_not_exposed() {
        let response =
            AuthError::KeySetUnavailable("connect error: 10.0.0.7:443".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert!(!body.contains("10.0.0.7"));
    }
}
