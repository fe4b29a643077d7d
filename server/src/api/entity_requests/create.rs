use crate::api::{db_error_response, validation_error, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{EntityRequest, NewEntityRequest};
use crate::schema::entity_requests;
use crate::types::EntityType;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use loafly_core::validation::{validate_required_text, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};
use loafly_core::ValidationErrors;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::EntityRequestResponse;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEntityRequestRequest {
    pub entity_type: EntityType,
    pub name: String,
    /// What the entity is and why it should be added
    pub description: Option<String>,
}

impl CreateEntityRequestRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_required_text(&mut errors, "name", "Name", &self.name, MAX_NAME_LENGTH);
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_NOTES_LENGTH)
        {
            errors.add("description", "Must not exceed 5,000 characters");
        }
        errors
    }
}

#[utoipa::path(
    post,
    path = "/api/entity-requests",
    tag = "entity-requests",
    request_body = CreateEntityRequestRequest,
    responses(
        (status = 201, description = "Request submitted for review", body = EntityRequestResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_entity_request(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateEntityRequestRequest>,
) -> impl IntoResponse {
    let errors = request.validate();
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    match diesel::insert_into(entity_requests::table)
        .values(&NewEntityRequest {
            user_id: user.id,
            entity_type: request.entity_type.as_str(),
            name: request.name.trim(),
            description: request.description.as_deref(),
        })
        .returning(EntityRequest::as_returning())
        .get_result(&mut conn)
    {
        Ok(created) => {
            tracing::info!(
                request_id = %created.id,
                entity_type = %created.entity_type,
                "entity request submitted"
            );
            (StatusCode::CREATED, Json(EntityRequestResponse::from(created))).into_response()
        }
        Err(e) => db_error_response(&e, "Failed to create entity request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_required_and_bounded() {
        let blank: CreateEntityRequestRequest =
            serde_json::from_str(r#"{"entity_type": "INGREDIENT", "name": "  "}"#).unwrap();
        assert_eq!(blank.validate().errors()[0].field, "name");

        let long = CreateEntityRequestRequest {
            entity_type: EntityType::StepTemplate,
            name: "x".repeat(256),
            description: None,
        };
        assert_eq!(long.validate().errors()[0].field, "name");

        let ok = CreateEntityRequestRequest {
            entity_type: EntityType::Ingredient,
            name: "Einkorn Flour".to_string(),
            description: Some("Ancient grain".to_string()),
        };
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn test_unknown_entity_type_is_rejected() {
        let parsed = serde_json::from_str::<CreateEntityRequestRequest>(
            r#"{"entity_type": "OVEN", "name": "Dutch oven"}"#,
        );
        assert!(parsed.is_err());
    }
}
