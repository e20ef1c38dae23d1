// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_permission, PermissionLayerState, RoutePermissions},
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, Drink, DrinkDetailResponse, DrinkListResponse,
        DrinkShort, Ingredient, IngredientShort, RecipeInput, UpdateDrinkRequest,
    },
    state::AppState,
};

pub mod drinks;
pub mod health;

pub const DRINKS_PATH: &str = "/drinks";
pub const DRINKS_DETAIL_PATH: &str = "/drinks-detail";
pub const DRINK_PATH: &str = "/drinks/{drink_id}";

pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
pub const POST_DRINKS: &str = "post:drinks";
pub const PATCH_DRINKS: &str = "patch:drinks";
pub const DELETE_DRINKS: &str = "delete:drinks";

/// Permissions required by the drink routes. Everything else is public.
pub fn route_permissions() -> RoutePermissions {
    RoutePermissions::new()
        .require(Method::GET, DRINKS_DETAIL_PATH, GET_DRINKS_DETAIL)
        .require(Method::POST, DRINKS_PATH, POST_DRINKS)
        .require(Method::PATCH, DRINK_PATH, PATCH_DRINKS)
        .require(Method::DELETE, DRINK_PATH, DELETE_DRINKS)
}

pub fn router(state: AppState) -> Router {
    let permission_layer = PermissionLayerState::new(state.gate.clone(), route_permissions());

    let drink_routes = Router::new()
        .route(
            DRINKS_PATH,
            get(drinks::list_drinks).post(drinks::create_drink),
        )
        .route(DRINKS_DETAIL_PATH, get(drinks::list_drink_details))
        .route(
            DRINK_PATH,
            patch(drinks::update_drink).delete(drinks::delete_drink),
        )
        .route_layer(from_fn_with_state(permission_layer, require_permission));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .merge(drink_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        drinks::list_drinks,
        drinks::list_drink_details,
        drinks::create_drink,
        drinks::update_drink,
        drinks::delete_drink,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Drink,
            DrinkShort,
            Ingredient,
            IngredientShort,
            RecipeInput,
            CreateDrinkRequest,
            UpdateDrinkRequest,
            DrinkListResponse,
            DrinkDetailResponse,
            DeleteDrinkResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Drinks", description = "Drinks menu; mutations require bearer token permissions"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
