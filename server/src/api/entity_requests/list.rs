use crate::api::{db_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::EntityRequest;
use crate::schema::entity_requests;
use crate::types::RequestStatus;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::EntityRequestResponse;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEntityRequestsParams {
    /// Only requests with this status
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityRequestsResponse {
    pub requests: Vec<EntityRequestResponse>,
}

#[utoipa::path(
    get,
    path = "/api/entity-requests",
    tag = "entity-requests",
    params(ListEntityRequestsParams),
    responses(
        (status = 200, description = "The caller's requests, or every request for admins", body = EntityRequestsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_entity_requests(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Query(params): Query<ListEntityRequestsParams>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let mut query = entity_requests::table
        .order(entity_requests::created_at.desc())
        .select(EntityRequest::as_select())
        .into_boxed();

    if !user.is_admin() {
        query = query.filter(entity_requests::user_id.eq(user.id));
    }
    if let Some(status) = params.status {
        query = query.filter(entity_requests::status.eq(status.as_str()));
    }

    match query.load(&mut conn) {
        Ok(rows) => {
            let requests = rows.into_iter().map(EntityRequestResponse::from).collect();
            (StatusCode::OK, Json(EntityRequestsResponse { requests })).into_response()
        }
        Err(e) => db_error_response(&e, "Failed to fetch entity requests"),
    }
}
