use crate::api::recipes::full::{find_owned_recipe, load_recipe_steps, RecipeStepResponse};
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
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepsResponse {
    pub steps: Vec<RecipeStepResponse>,
}

#[utoipa::path(
    get,
    path = "/api/steps/{id}",
    tag = "steps",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Steps of the recipe in order", body = StepsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_steps(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(recipe_id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    match find_owned_recipe(&mut conn, user.id, recipe_id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    }

    match load_recipe_steps(&mut conn, recipe_id) {
        Ok(steps) => (StatusCode::OK, Json(StepsResponse { steps })).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch steps"),
    }
}
