use crate::api::recipes::full::RecipeStepResponse;
use crate::api::{db_error_response, nullable, validation_error, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::RecipeStepChanges;
use crate::schema::recipe_steps;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use loafly_core::validation::MAX_NOTES_LENGTH;
use loafly_core::ValidationErrors;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{authorize_step, load_step};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStepRequest {
    pub order: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

impl UpdateStepRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.order.is_some_and(|o| o < 0) {
            errors.add("order", "Step order cannot be negative");
        }
        for (field, value) in [("description", &self.description), ("notes", &self.notes)] {
            if let Some(Some(text)) = value {
                if text.chars().count() > MAX_NOTES_LENGTH {
                    errors.add(field, "Must not exceed 5,000 characters");
                }
            }
        }
        errors
    }

    fn changes(&self) -> RecipeStepChanges<'_> {
        RecipeStepChanges {
            step_template_id: None,
            step_order: self.order,
            description: self.description.as_ref().map(|d| d.as_deref()),
            notes: self.notes.as_ref().map(|n| n.as_deref()),
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/steps/{id}",
    tag = "steps",
    params(
        ("id" = Uuid, Path, description = "Step ID")
    ),
    request_body = UpdateStepRequest,
    responses(
        (status = 200, description = "Updated step", body = RecipeStepResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Step belongs to another user's recipe", body = ErrorResponse),
        (status = 404, description = "Step not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStepRequest>,
) -> impl IntoResponse {
    let errors = request.validate();
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    if let Err(response) = authorize_step(&mut conn, user.id, id) {
        return response;
    }

    let changes = request.changes();
    if changes.step_order.is_some() || changes.description.is_some() || changes.notes.is_some() {
        if let Err(e) = diesel::update(recipe_steps::table.find(id))
            .set(&changes)
            .execute(&mut conn)
        {
            return db_error_response(&e, "Failed to update step");
        }
    }

    match load_step(&mut conn, id) {
        Ok(step) => (StatusCode::OK, Json(step)).into_response(),
        Err(e) => db_error_response(&e, "Failed to fetch step"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_order_and_long_notes_are_rejected() {
        let request = UpdateStepRequest {
            order: Some(-1),
            description: None,
            notes: Some(Some("x".repeat(5001))),
        };
        let errors = request.validate();
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["order", "notes"]);
    }

    #[test]
    fn test_null_description_clears() {
        let request: UpdateStepRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        let changes = request.changes();
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.notes, None);
        assert_eq!(changes.step_order, None);
    }
}
