// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authorized callers.
//!
//! Use the `Authorized` extractor in handlers behind the permission layer:
//!
//! ```rust,ignore
//! async fn create_drink(Authorized(claims): Authorized) -> impl IntoResponse {
//!     // claims were verified and carry the route's permission
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::HeaderRejection;
use super::{AuthError, Claims};

/// Verified claims of the caller.
///
/// Only available on routes gated by
/// [`require_permission`](super::require_permission); elsewhere extraction
/// fails as if the `Authorization` header were missing.
#[derive(Debug, Clone)]
pub struct Authorized(pub Claims);

impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Authorized)
            .ok_or(AuthError::MalformedHeader(HeaderRejection::Missing))
    }
}
