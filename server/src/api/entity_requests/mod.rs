pub mod create;
pub mod list;
pub mod review;

use crate::models::EntityRequest;
use crate::AppState;
use axum::routing::{get, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

/// Returns the router for /api/entity-requests endpoints (mounted at /api/entity-requests)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list::list_entity_requests).post(create::create_entity_request),
        )
        .route("/{id}/status", put(review::review_entity_request))
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityRequestResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    /// INGREDIENT, INGREDIENT_CATEGORY, STEP_TEMPLATE or STEP_PARAMETER
    pub entity_type: String,
    pub name: String,
    pub description: Option<String>,
    /// PENDING, APPROVED or REJECTED
    pub status: String,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<EntityRequest> for EntityRequestResponse {
    fn from(request: EntityRequest) -> Self {
        Self {
            id: request.id,
            user_id: request.user_id,
            entity_type: request.entity_type,
            name: request.name,
            description: request.description,
            status: request.status,
            admin_notes: request.admin_notes,
            reviewed_by: request.reviewed_by,
            reviewed_at: request.reviewed_at,
            created_at: request.created_at,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_entity_request,
        list::list_entity_requests,
        review::review_entity_request,
    ),
    components(schemas(
        EntityRequestResponse,
        create::CreateEntityRequestRequest,
        list::EntityRequestsResponse,
        review::ReviewEntityRequestRequest,
        crate::types::EntityType,
        crate::types::RequestStatus,
    ))
)]
pub struct ApiDoc;
