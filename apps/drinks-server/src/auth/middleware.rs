// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission-checking middleware for Axum.
//!
//! Applied with `route_layer`, so it runs after routing and can look up the
//! matched route template in the [`RoutePermissions`] table:
//!
//! ```rust,ignore
//! let layer_state = PermissionLayerState::new(gate, permissions);
//! let app = Router::new()
//!     .route("/drinks", post(create_drink))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         layer_state,
//!         require_permission,
//!     ));
//! ```
//!
//! On success the verified [`Claims`] are inserted into the request
//! extensions, where the [`Authorized`](super::Authorized) extractor picks
//! them up.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::error::HeaderRejection;
use super::{AuthError, AuthGate, Claims, RoutePermissions};

/// State shared by every invocation of [`require_permission`].
#[derive(Clone)]
pub struct PermissionLayerState {
    gate: Arc<AuthGate>,
    permissions: Arc<RoutePermissions>,
}

impl PermissionLayerState {
    pub fn new(gate: Arc<AuthGate>, permissions: RoutePermissions) -> Self {
        Self {
            gate,
            permissions: Arc::new(permissions),
        }
    }
}

/// Reject the request unless its bearer token grants the permission the
/// matched route requires. Routes without a requirement pass through.
pub async fn require_permission(
    State(state): State<PermissionLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned());

    let Some(permission) = route
        .as_deref()
        .and_then(|route| state.permissions.required(request.method(), route))
    else {
        return next.run(request).await;
    };

    let header = request.headers().get(AUTHORIZATION).cloned();
    match authorize(&state.gate, header.as_ref(), permission).await {
        Ok(claims) => {
            debug!(
                subject = claims.subject(),
                permission,
                "Request authorized"
            );
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                method = %request.method(),
                route = route.as_deref().unwrap_or_default(),
                permission,
                error_code = err.error_code(),
                "Request rejected"
            );
            err.into_response()
        }
    }
}

async fn authorize(
    gate: &AuthGate,
    header: Option<&HeaderValue>,
    permission: &str,
) -> Result<Claims, AuthError> {
    let raw_header = match header {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::MalformedHeader(HeaderRejection::NotBearer))?,
        ),
        None => None,
    };
    gate.authorize(raw_header, permission).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testutil::{bearer, test_gate, valid_payload, TestKey};
    use crate::auth::Authorized;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(Authorized(claims): Authorized) -> String {
        claims.subject().to_string()
    }

    fn app(key: &TestKey) -> Router {
        let (gate, _source) = test_gate(&[key]);
        let permissions = RoutePermissions::new()
            .require(Method::GET, "/private/{id}", "get:private")
            .require(Method::POST, "/mixed", "post:mixed");
        let state = PermissionLayerState::new(Arc::new(gate), permissions);

        Router::new()
            .route("/private/{id}", get(whoami))
            .route("/mixed", get(|| async { "open" }).post(whoami))
            .route("/public", get(|| async { "open" }))
            .route_layer(from_fn_with_state(state, require_permission))
    }

    async fn send(app: Router, request: Request) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn request(method: Method, uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn public_routes_need_no_token() {
        let key = TestKey::generate("k1");
        let (status, body) = send(app(&key), request(Method::GET, "/public", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"open");

        // Only POST is gated on /mixed.
        let (status, _) = send(app(&key), request(Method::GET, "/mixed", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn gated_route_without_token_is_401() {
        let key = TestKey::generate("k1");
        let (status, body) = send(app(&key), request(Method::GET, "/private/7", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "malformed_header");
    }

    #[tokio::test]
    async fn permission_is_looked_up_by_route_template() {
        let key = TestKey::generate("k1");
        let token = key.sign(&valid_payload(&["get:private"]));
        let (status, body) = send(
            app(&key),
            request(Method::GET, "/private/7", Some(&bearer(&token))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"auth0|barista");
    }

    #[tokio::test]
    async fn wrong_permission_is_403() {
        let key = TestKey::generate("k1");
        let token = key.sign(&valid_payload(&["get:private"]));
        let (status, body) = send(
            app(&key),
            request(Method::POST, "/mixed", Some(&bearer(&token))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "insufficient_scope");
    }

    #[tokio::test]
    async fn non_ascii_header_is_malformed() {
        let key = TestKey::generate("k1");
        let mut req = request(Method::GET, "/private/7", None);
        req.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );
        let (status, body) = send(app(&key), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "malformed_header");
    }
}
