// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent drink storage in an embedded **redb** database (pure Rust,
//! ACID). The database lives in a single file when `DATABASE_PATH` is set
//! and in memory otherwise.

pub mod drinks;

pub use drinks::{DrinkPatch, DrinkStore, NewDrink, StoreError, StoreResult};
