use crate::api::recipes::full::RecipeStepResponse;
use crate::api::recipes::input::{check_new_step, insert_step, Libraries, StepInput};
use crate::api::{db_error_response, error_response, validation_error, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::recipes;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::load_step;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateStepRequest {
    pub recipe_id: Uuid,
    pub step_template_id: Uuid,
    pub order: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateStepRequest> for StepInput {
    fn from(request: CreateStepRequest) -> Self {
        StepInput {
            id: None,
            step_template_id: request.step_template_id,
            order: request.order,
            description: request.description,
            notes: request.notes,
            parameter_values: Vec::new(),
            ingredients: Vec::new(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/steps",
    tag = "steps",
    request_body = CreateStepRequest,
    responses(
        (status = 201, description = "Step created with its template's default values", body = RecipeStepResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Predefined recipes cannot be modified", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_step(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateStepRequest>,
) -> impl IntoResponse {
    let recipe_id = request.recipe_id;
    let input = StepInput::from(request);

    let mut conn = get_conn!(pool);

    match recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::deleted_at.is_null())
        .select(Recipe::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(r)) if r.owner_id == user.id => {}
        Ok(Some(r)) if r.is_predefined => {
            return error_response(StatusCode::FORBIDDEN, "Predefined recipes cannot be modified")
        }
        Ok(_) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    }

    let libraries = match Libraries::load(&mut conn, std::slice::from_ref(&input)) {
        Ok(l) => l,
        Err(e) => return db_error_response(&e, "Failed to load step template"),
    };
    let step = match check_new_step(&libraries, &input) {
        Ok(s) => s,
        Err(errors) => return validation_error(errors),
    };

    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let step_id = insert_step(conn, recipe_id, &step)?;
        diesel::update(recipes::table.find(recipe_id))
            .set(recipes::updated_at.eq(diesel::dsl::now))
            .execute(conn)?;
        Ok(load_step(conn, step_id)?)
    });

    match result {
        Ok(step) => (StatusCode::CREATED, Json(step)).into_response(),
        Err(e) => e.into_response(),
    }
}
