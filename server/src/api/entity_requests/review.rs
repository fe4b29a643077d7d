use crate::api::{db_error_response, error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::EntityRequest;
use crate::schema::entity_requests;
use crate::types::RequestStatus;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::EntityRequestResponse;

const NOT_PENDING: &str = "Only pending requests can be reviewed";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReviewEntityRequestRequest {
    /// APPROVED or REJECTED
    pub status: RequestStatus,
    pub admin_notes: Option<String>,
}

fn check_review(current: &str, decision: RequestStatus) -> Result<(), &'static str> {
    if decision == RequestStatus::Pending {
        return Err("Status must be APPROVED or REJECTED");
    }
    match RequestStatus::from_str(current) {
        Some(RequestStatus::Pending) => Ok(()),
        _ => Err(NOT_PENDING),
    }
}

#[utoipa::path(
    put,
    path = "/api/entity-requests/{id}/status",
    tag = "entity-requests",
    params(
        ("id" = Uuid, Path, description = "Entity request ID")
    ),
    request_body = ReviewEntityRequestRequest,
    responses(
        (status = 200, description = "Request reviewed", body = EntityRequestResponse),
        (status = 400, description = "Request already reviewed or invalid status", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin access required", body = ErrorResponse),
        (status = 404, description = "Entity request not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn review_entity_request(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewEntityRequestRequest>,
) -> impl IntoResponse {
    if !user.is_admin() {
        return error_response(StatusCode::FORBIDDEN, "Admin access required");
    }

    let mut conn = get_conn!(pool);

    let existing = match entity_requests::table
        .find(id)
        .select(EntityRequest::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Entity request not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch entity request"),
    };

    if let Err(message) = check_review(&existing.status, request.status) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    // Only a row that is still pending gets decided
    let reviewed = diesel::update(
        entity_requests::table
            .filter(entity_requests::id.eq(id))
            .filter(entity_requests::status.eq(RequestStatus::Pending.as_str())),
    )
    .set((
        entity_requests::status.eq(request.status.as_str()),
        entity_requests::admin_notes.eq(request.admin_notes.as_deref()),
        entity_requests::reviewed_by.eq(Some(user.id)),
        entity_requests::reviewed_at.eq(Some(Utc::now())),
    ))
    .returning(EntityRequest::as_returning())
    .get_result(&mut conn)
    .optional();

    match reviewed {
        Ok(Some(r)) => {
            tracing::info!(request_id = %r.id, status = %r.status, reviewer = %user.id, "entity request reviewed");
            (StatusCode::OK, Json(EntityRequestResponse::from(r))).into_response()
        }
        Ok(None) => error_response(StatusCode::BAD_REQUEST, NOT_PENDING),
        Err(e) => db_error_response(&e, "Failed to review entity request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_requests_can_be_decided() {
        assert!(check_review("PENDING", RequestStatus::Approved).is_ok());
        assert!(check_review("PENDING", RequestStatus::Rejected).is_ok());
        assert_eq!(check_review("APPROVED", RequestStatus::Rejected), Err(NOT_PENDING));
        assert_eq!(
            check_review("PENDING", RequestStatus::Pending),
            Err("Status must be APPROVED or REJECTED")
        );
    }
}
