use crate::api::{db_error_response, error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::recipes;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use super::full::{load_full_recipe, FullRecipeResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ByNameParams {
    /// Exact name of the predefined recipe
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/predefined/by-name",
    tag = "recipes",
    params(ByNameParams),
    responses(
        (status = 200, description = "Predefined recipe", body = FullRecipeResponse),
        (status = 400, description = "Name missing", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No predefined recipe with that name", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_predefined_by_name(
    _user: AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ByNameParams>,
) -> impl IntoResponse {
    let Some(name) = params.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Recipe name is required");
    };

    let mut conn = get_conn!(pool);

    let recipe = match recipes::table
        .filter(recipes::is_predefined.eq(true))
        .filter(recipes::deleted_at.is_null())
        .filter(recipes::name.eq(name))
        .order(recipes::created_at.asc())
        .select(Recipe::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Predefined recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    };

    match load_full_recipe(&mut conn, recipe) {
        Ok(full) => (StatusCode::OK, Json(full)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch recipe steps"),
    }
}

