// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Drink table backed by redb.
//!
//! ## Table Layout
//!
//! - `drinks`: id → serialized [`Drink`] (JSON bytes)
//! - `drink_titles`: title → id (uniqueness index)
//! - `sequences`: name → last assigned id

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::{Drink, Ingredient};

// =============================================================================
// Table Definitions
// =============================================================================

const DRINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("drinks");

const DRINK_TITLES: TableDefinition<&str, u64> = TableDefinition::new("drink_titles");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const DRINK_SEQUENCE: &str = "drinks";

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("drink {0} not found")]
    NotFound(u64),

    #[error("a drink titled '{0}' already exists")]
    TitleTaken(String),

    #[error("invalid drink: {0}")]
    Invalid(&'static str),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Inputs
// =============================================================================

/// A drink to insert.
#[derive(Debug, Clone)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Changes to apply to an existing drink.
#[derive(Debug, Clone, Default)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

fn validate_title(title: &str) -> StoreResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(StoreError::Invalid("title is longer than 80 characters"));
    }
    Ok(title.to_string())
}

fn validate_recipe(recipe: &[Ingredient]) -> StoreResult<()> {
    if recipe.is_empty() {
        return Err(StoreError::Invalid("recipe needs at least one ingredient"));
    }
    for ingredient in recipe {
        if ingredient.name.trim().is_empty() {
            return Err(StoreError::Invalid("ingredient name must not be empty"));
        }
        if ingredient.color.trim().is_empty() {
            return Err(StoreError::Invalid("ingredient color must not be empty"));
        }
        if ingredient.parts == 0 {
            return Err(StoreError::Invalid("ingredient parts must be positive"));
        }
    }
    Ok(())
}

// =============================================================================
// DrinkStore
// =============================================================================

/// Embedded ACID drink store. Clones share the same database.
#[derive(Clone)]
pub struct DrinkStore {
    db: Arc<Database>,
}

impl DrinkStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Database::create(path)?)
    }

    /// Database that lives only as long as the process.
    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DRINKS)?;
            let _ = write_txn.open_table(DRINK_TITLES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert a drink under the next id.
    pub fn create(&self, drink: NewDrink) -> StoreResult<Drink> {
        let title = validate_title(&drink.title)?;
        validate_recipe(&drink.recipe)?;

        let write_txn = self.db.begin_write()?;
        let created = {
            let mut titles = write_txn.open_table(DRINK_TITLES)?;
            if titles.get(title.as_str())?.is_some() {
                return Err(StoreError::TitleTaken(title));
            }

            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let id = sequences
                .get(DRINK_SEQUENCE)?
                .map(|last| last.value())
                .unwrap_or(0)
                + 1;
            sequences.insert(DRINK_SEQUENCE, id)?;

            let created = Drink {
                id,
                title,
                recipe: drink.recipe,
            };
            let json = serde_json::to_vec(&created)?;
            write_txn.open_table(DRINKS)?.insert(id, json.as_slice())?;
            titles.insert(created.title.as_str(), id)?;
            created
        };
        write_txn.commit()?;
        Ok(created)
    }

    /// All drinks, ordered by id.
    pub fn list(&self) -> StoreResult<Vec<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;
        let mut drinks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            drinks.push(serde_json::from_slice(value.value())?);
        }
        Ok(drinks)
    }

    pub fn get(&self, id: u64) -> StoreResult<Option<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Apply `patch` to drink `id` and return the updated drink.
    pub fn update(&self, id: u64, patch: DrinkPatch) -> StoreResult<Drink> {
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        if let Some(recipe) = &patch.recipe {
            validate_recipe(recipe)?;
        }

        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let existing_bytes = {
                let existing = drinks.get(id)?.ok_or(StoreError::NotFound(id))?;
                existing.value().to_vec()
            };
            let mut drink: Drink = serde_json::from_slice(&existing_bytes)?;

            if let Some(title) = title.filter(|title| *title != drink.title) {
                let mut titles = write_txn.open_table(DRINK_TITLES)?;
                if titles.get(title.as_str())?.is_some() {
                    return Err(StoreError::TitleTaken(title));
                }
                titles.remove(drink.title.as_str())?;
                titles.insert(title.as_str(), id)?;
                drink.title = title;
            }
            if let Some(recipe) = patch.recipe {
                drink.recipe = recipe;
            }

            let json = serde_json::to_vec(&drink)?;
            drinks.insert(id, json.as_slice())?;
            drink
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Remove drink `id`, returning its id.
    pub fn delete(&self, id: u64) -> StoreResult<u64> {
        let write_txn = self.db.begin_write()?;
        {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let removed_bytes = {
                let removed = drinks.remove(id)?.ok_or(StoreError::NotFound(id))?;
                removed.value().to_vec()
            };
            let removed: Drink = serde_json::from_slice(&removed_bytes)?;
            write_txn
                .open_table(DRINK_TITLES)?
                .remove(removed.title.as_str())?;
        }
        write_txn.commit()?;
        Ok(id)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;
        let empty = table.first()?.is_none();
        Ok(empty)
    }

    /// Open a read transaction on every table (readiness check).
    pub fn check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(DRINKS)?;
        let _ = read_txn.open_table(DRINK_TITLES)?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
