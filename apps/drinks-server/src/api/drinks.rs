// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use tracing::info;

use crate::{
    auth::Authorized,
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinkDetailResponse, DrinkListResponse,
        UpdateDrinkRequest,
    },
    state::AppState,
    storage::{DrinkPatch, NewDrink},
};

/// A non-integer id can never name a drink.
fn drink_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::not_found("Resource not found"))
}

#[utoipa::path(
    get,
    path = "/drinks",
    tag = "Drinks",
    responses((status = 200, body = DrinkListResponse))
)]
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinkListResponse>, ApiError> {
    let drinks = state.drinks.list()?;
    Ok(Json(DrinkListResponse {
        success: true,
        drinks: drinks.iter().map(|drink| drink.short()).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/drinks-detail",
    tag = "Drinks",
    responses(
        (status = 200, body = DrinkDetailResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token lacks get:drinks-detail")
    )
)]
pub async fn list_drink_details(
    Authorized(_claims): Authorized,
    State(state): State<AppState>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    Ok(Json(DrinkDetailResponse {
        success: true,
        drinks: state.drinks.list()?,
    }))
}

#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    tag = "Drinks",
    responses(
        (status = 200, body = DrinkDetailResponse),
        (status = 400, description = "Malformed JSON"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token lacks post:drinks"),
        (status = 422, description = "Invalid drink or title already taken")
    )
)]
pub async fn create_drink(
    Authorized(claims): Authorized,
    State(state): State<AppState>,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    let Json(request) = payload?;
    let drink = state.drinks.create(NewDrink {
        title: request.title,
        recipe: request.recipe.into_vec(),
    })?;

    info!(
        subject = claims.subject(),
        drink_id = drink.id,
        title = %drink.title,
        "Drink created"
    );
    Ok(Json(DrinkDetailResponse {
        success: true,
        drinks: vec![drink],
    }))
}

#[utoipa::path(
    patch,
    path = "/drinks/{drink_id}",
    params(
        ("drink_id" = u64, Path, description = "Identifier of the drink to update")
    ),
    request_body = UpdateDrinkRequest,
    tag = "Drinks",
    responses(
        (status = 200, body = DrinkDetailResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token lacks patch:drinks"),
        (status = 404, description = "No drink with this id"),
        (status = 422, description = "Invalid drink or title already taken")
    )
)]
pub async fn update_drink(
    Authorized(claims): Authorized,
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinkDetailResponse>, ApiError> {
    let id = drink_id(path)?;
    let Json(request) = payload?;
    let drink = state.drinks.update(
        id,
        DrinkPatch {
            title: request.title,
            recipe: request.recipe.map(|recipe| recipe.into_vec()),
        },
    )?;

    info!(subject = claims.subject(), drink_id = id, "Drink updated");
    Ok(Json(DrinkDetailResponse {
        success: true,
        drinks: vec![drink],
    }))
}

#[utoipa::path(
    delete,
    path = "/drinks/{drink_id}",
    params(
        ("drink_id" = u64, Path, description = "Identifier of the drink to delete")
    ),
    tag = "Drinks",
    responses(
        (status = 200, body = DeleteDrinkResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Token lacks delete:drinks"),
        (status = 404, description = "No drink with this id")
    )
)]
pub async fn delete_drink(
    Authorized(claims): Authorized,
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, ApiError> {
    let id = state.drinks.delete(drink_id(path)?)?;

    info!(subject = claims.subject(), drink_id = id, "Drink deleted");
    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{testutil::valid_payload, Claims};
    use crate::models::{Ingredient, RecipeInput};
    use axum::http::StatusCode;

    fn claims() -> Authorized {
        Authorized(Claims::from_payload(valid_payload(&["post:drinks"])).unwrap())
    }

    fn milk() -> Ingredient {
        Ingredient {
            name: "milk".into(),
            color: "white".into(),
            parts: 1,
        }
    }

    fn create_request(title: &str) -> CreateDrinkRequest {
        CreateDrinkRequest {
            title: title.into(),
            recipe: RecipeInput::One(milk()),
        }
    }

    #[tokio::test]
    async fn create_then_list() {
        let state = AppState::for_tests(&[]);
        let Json(created) = create_drink(
            claims(),
            State(state.clone()),
            Ok(Json(create_request("milk"))),
        )
        .await
        .expect("drink creation succeeds");
        assert!(created.success);
        assert_eq!(created.drinks[0].recipe, vec![milk()]);

        let Json(listing) = list_drinks(State(state.clone())).await.unwrap();
        assert_eq!(listing.drinks, vec![created.drinks[0].short()]);

        let Json(details) = list_drink_details(claims(), State(state)).await.unwrap();
        assert_eq!(details.drinks, created.drinks);
    }

    #[tokio::test]
    async fn duplicate_title_is_unprocessable() {
        let state = AppState::for_tests(&[]);
        create_drink(claims(), State(state.clone()), Ok(Json(create_request("milk"))))
            .await
            .unwrap();
        let err = create_drink(claims(), State(state), Ok(Json(create_request("milk"))))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_missing_drink_is_not_found() {
        let state = AppState::for_tests(&[]);
        let err = update_drink(
            claims(),
            State(state),
            Ok(Path(42)),
            Ok(Json(UpdateDrinkRequest {
                title: Some("tea".into()),
                recipe: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_changes_title() {
        let state = AppState::for_tests(&[]);
        let Json(created) = create_drink(
            claims(),
            State(state.clone()),
            Ok(Json(create_request("milk"))),
        )
        .await
        .unwrap();
        let id = created.drinks[0].id;

        let Json(updated) = update_drink(
            claims(),
            State(state.clone()),
            Ok(Path(id)),
            Ok(Json(UpdateDrinkRequest {
                title: Some("oat milk".into()),
                recipe: None,
            })),
        )
        .await
        .unwrap();
        assert_eq!(updated.drinks[0].title, "oat milk");
        assert_eq!(updated.drinks[0].recipe, vec![milk()]);
    }

    #[tokio::test]
    async fn delete_returns_id_then_not_found() {
        let state = AppState::for_tests(&[]);
        let Json(created) = create_drink(
            claims(),
            State(state.clone()),
            Ok(Json(create_request("milk"))),
        )
        .await
        .unwrap();
        let id = created.drinks[0].id;

        let Json(deleted) = delete_drink(claims(), State(state.clone()), Ok(Path(id)))
            .await
            .unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.delete, id);

        let err = delete_drink(claims(), State(state), Ok(Path(id)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
