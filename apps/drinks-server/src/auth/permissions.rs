// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route permission requirements.
//!
//! The table maps a route template (as registered with the router, e.g.
//! `/drinks/{drink_id}`) and an HTTP method to the permission string a
//! caller's token must carry. Routes absent from the table are public.

use std::collections::HashMap;

use axum::http::Method;

/// Route + method → required permission.
#[derive(Debug, Clone, Default)]
pub struct RoutePermissions {
    by_route: HashMap<String, HashMap<Method, String>>,
}

impl RoutePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `permission` for `method` requests to `route`.
    pub fn require(
        mut self,
        method: Method,
        route: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        self.by_route
            .entry(route.into())
            .or_default()
            .insert(method, permission.into());
        self
    }

    /// Permission required for `method` on `route`, `None` if public.
    pub fn required(&self, method: &Method, route: &str) -> Option<&str> {
        self.by_route.get(route)?.get(method).map(String::as_str)
    }
}
