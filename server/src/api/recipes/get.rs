use crate::api::{db_error_response, error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::full::{find_visible_recipe, load_full_recipe, FullRecipeResponse};

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/full",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe with steps, parameter values and ingredients", body = FullRecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_full_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe = match find_visible_recipe(&mut conn, user.id, id) {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    };

    match load_full_recipe(&mut conn, recipe) {
        Ok(full) => (StatusCode::OK, Json(full)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch recipe steps"),
    }
}
