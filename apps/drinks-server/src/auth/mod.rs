// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Bearer-token authorization for the drinks API.
//!
//! ## Auth Flow
//!
//! 1. The client obtains an access token from the identity provider
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Looks up the permission the route requires (`RoutePermissions`)
//!    - Fetches the issuer's JWKS via HTTPS (cached, single-flight)
//!    - Verifies signature, expiry, issuer and audience
//!    - Checks the `permissions` claim for the required permission
//!
//! ## Security
//!
//! - Only `GET /drinks` and the health/docs endpoints are public
//! - Keys are selected by `kid`; the token's `alg` must match the key
//! - Symmetric keys in the JWKS are never trusted
//! - Rejections return fixed messages, never token contents

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod middleware;
pub mod permissions;

#[cfg(test)]
pub(crate) mod testutil;

pub use claims::{Audience, Claims};
pub use error::{AuthError, ClaimRejection, HeaderRejection};
pub use extractor::Authorized;
pub use gate::AuthGate;
pub use jwks::{JwksManager, KeySetSource, RemoteKeySet};
pub use middleware::{require_permission, PermissionLayerState};
pub use permissions::RoutePermissions;
