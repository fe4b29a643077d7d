use crate::api::{db_error_response, ErrorResponse};
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

use super::detail::{load_bake_detail, BakeResponse};
use super::find_bake;

#[utoipa::path(
    get,
    path = "/api/bakes/{id}",
    tag = "bakes",
    params(
        ("id" = Uuid, Path, description = "Bake ID")
    ),
    responses(
        (status = 200, description = "Bake with steps, parameter values and ingredients", body = BakeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Bake not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_bake(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let bake = match find_bake(&mut conn, user.id, id) {
        Ok(b) => b,
        Err(response) => return response,
    };

    match load_bake_detail(&mut conn, bake) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch bake"),
    }
}
