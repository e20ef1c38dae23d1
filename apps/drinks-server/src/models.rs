// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`/`Deserialize` and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Representations
//!
//! A drink has two public shapes:
//!
//! - **long** ([`Drink`]): full recipe with ingredient names
//! - **short** ([`DrinkShort`]): recipe reduced to `{color, parts}`, served
//!   on the public listing so recipes stay private

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Drinks
// =============================================================================

/// One ingredient of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Ingredient {
    /// Ingredient name
    pub name: String,
    /// Display color (e.g. `"blue"`, `"#ab0000"`)
    pub color: String,
    /// Relative amount
    pub parts: u32,
}

/// Ingredient without its name.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IngredientShort {
    pub color: String,
    pub parts: u32,
}

impl From<&Ingredient> for IngredientShort {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            color: ingredient.color.clone(),
            parts: ingredient.parts,
        }
    }
}

/// A drink in its long representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Drink {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.iter().map(IngredientShort::from).collect(),
        }
    }
}

/// A drink in its short representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DrinkShort {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<IngredientShort>,
}

// =============================================================================
// Requests
// =============================================================================

/// A recipe as submitted by clients: one ingredient or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl RecipeInput {
    pub fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::Many(ingredients) => ingredients,
            RecipeInput::One(ingredient) => vec![ingredient],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: RecipeInput,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

// =============================================================================
// Responses
// =============================================================================

/// `GET /drinks`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrinkListResponse {
    pub success: bool,
    pub drinks: Vec<DrinkShort>,
}

/// Long representations, returned by the detail listing and by mutations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DrinkDetailResponse {
    pub success: bool,
    pub drinks: Vec<Drink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    /// Id of the deleted drink
    pub delete: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn water() -> Drink {
        Drink {
            id: 1,
            title: "water".into(),
            recipe: vec![Ingredient {
                name: "water".into(),
                color: "blue".into(),
                parts: 1,
            }],
        }
    }

    #[test]
    fn short_representation_drops_ingredient_names() {
        let short = serde_json::to_value(water().short()).unwrap();
        assert_eq!(
            short,
            json!({"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]})
        );
    }

    #[test]
    fn recipe_accepts_object_or_array() {
        let one: RecipeInput =
            serde_json::from_value(json!({"name": "milk", "color": "white", "parts": 2})).unwrap();
        assert_eq!(one.into_vec().len(), 1);

        let many: RecipeInput = serde_json::from_value(json!([
            {"name": "espresso", "color": "brown", "parts": 1},
            {"name": "milk", "color": "white", "parts": 3}
        ]))
        .unwrap();
        assert_eq!(many.into_vec()[1].name, "milk");

        let empty: RecipeInput = serde_json::from_value(json!([])).unwrap();
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn update_request_fields_are_optional() {
        let request: UpdateDrinkRequest = serde_json::from_value(json!({"title": "tea"})).unwrap();
        assert_eq!(request.title.as_deref(), Some("tea"));
        assert!(request.recipe.is_none());
    }

    #[test]
    fn negative_parts_are_rejected() {
        let result = serde_json::from_value::<Ingredient>(
            json!({"name": "milk", "color": "white", "parts": -1}),
        );
        assert!(result.is_err());
    }
}
