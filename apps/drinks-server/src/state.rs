// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::storage::DrinkStore;

#[derive(Clone)]
pub struct AppState {
    pub drinks: DrinkStore,
    /// Shared with the permission layer; owns the signing key cache.
    pub gate: Arc<AuthGate>,
}

impl AppState {
    pub fn new(drinks: DrinkStore, gate: Arc<AuthGate>) -> Self {
        Self { drinks, gate }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory store and a gate trusting `keys`.
    pub fn for_tests(keys: &[&crate::auth::testutil::TestKey]) -> Self {
        let (gate, _source) = crate::auth::testutil::test_gate(keys);
        Self::new(
            DrinkStore::in_memory().expect("in-memory store"),
            Arc::new(gate),
        )
    }
}
