use crate::api::{db_error_response, ErrorResponse, MessageResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::schema::recipe_steps;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use super::authorize_step;

#[utoipa::path(
    delete,
    path = "/api/steps/{id}",
    tag = "steps",
    params(
        ("id" = Uuid, Path, description = "Step ID")
    ),
    responses(
        (status = 200, description = "Step deleted with its values and ingredients", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Step belongs to another user's recipe", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    if let Err(response) = authorize_step(&mut conn, user.id, id) {
        return response;
    }

    match diesel::delete(recipe_steps::table.find(id)).execute(&mut conn) {
        Ok(_) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Step deleted successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => db_error_response(&e, "Failed to delete step"),
    }
}
