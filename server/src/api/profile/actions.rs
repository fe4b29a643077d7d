use crate::api::{error_response, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::get::UserActionResponse;
use super::store::record_action;

const MAX_ACTION_LENGTH: usize = 64;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrackActionRequest {
    /// e.g. recipe_created, bake_completed, advanced_feature
    pub action: String,
    /// bake_completed reads duration_minutes; advanced_feature reads feature
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub session_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/profile/actions",
    tag = "profile",
    request_body = TrackActionRequest,
    responses(
        (status = 201, description = "Action recorded and counters updated", body = UserActionResponse),
        (status = 400, description = "Invalid action name", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn track_action(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<TrackActionRequest>,
) -> impl IntoResponse {
    let action = request.action.trim();
    if action.is_empty() || action.chars().count() > MAX_ACTION_LENGTH {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Action must be between 1 and 64 characters",
        );
    }

    let mut conn = get_conn!(pool);

    let result = conn.transaction::<_, ApiError, _>(|conn| {
        Ok(record_action(
            conn,
            user.id,
            action,
            request.details.clone(),
            request.session_id.as_deref(),
        )?)
    });

    match result {
        Ok(recorded) => {
            (StatusCode::CREATED, Json(UserActionResponse::from(recorded))).into_response()
        }
        Err(e) => e.into_response(),
    }
}
