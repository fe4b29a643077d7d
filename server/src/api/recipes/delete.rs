use crate::api::{db_error_response, error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::recipes;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    // Soft delete; bakes keep pointing at the row
    let result = diesel::update(
        recipes::table
            .filter(recipes::id.eq(id))
            .filter(recipes::owner_id.eq(user.id))
            .filter(recipes::is_predefined.eq(false))
            .filter(recipes::deleted_at.is_null()),
    )
    .set(recipes::deleted_at.eq(diesel::dsl::now))
    .execute(&mut conn);

    match result {
        Ok(0) => error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Ok(_) => {
            tracing::info!(recipe_id = %id, "recipe deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => db_error_response(&e, "Failed to delete recipe"),
    }
}
