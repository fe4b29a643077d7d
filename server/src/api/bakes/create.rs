use crate::api::meta::library::load_parameters;
use crate::api::recipes::full::{find_visible_recipe, load_full_recipe, FullRecipeResponse};
use crate::api::recipes::input::line_position;
use crate::api::{db_error_response, error_response, validation_error, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{
    Bake, NewBake, NewBakeStep, NewBakeStepIngredient, NewBakeStepParameterValue, StepParameter,
};
use crate::schema::{bake_step_ingredients, bake_step_parameter_values, bake_steps, bakes};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use loafly_core::parameters::typed_json;
use loafly_core::validation::validate_notes;
use loafly_core::{ParameterDataType, ValidationErrors};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::detail::{load_bake_detail, BakeResponse};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBakeRequest {
    pub recipe_id: Uuid,
    pub notes: Option<String>,
}

impl CreateBakeRequest {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_notes(&mut errors, "notes", self.notes.as_deref());
        errors
    }
}

fn default_notes(recipe_name: &str) -> String {
    format!("Bake of {recipe_name}")
}

/// Stored recipe values are text; bakes keep them as JSON of the
/// parameter's declared type.
fn planned_value(parameter: Option<&StepParameter>, stored: &str) -> Value {
    let data_type = parameter
        .and_then(|p| ParameterDataType::from_str(&p.parameter_type))
        .unwrap_or(ParameterDataType::Text);
    typed_json(data_type, stored)
}

/// Copy every step of the recipe, with its values and ingredients, into the bake.
fn snapshot_steps(
    conn: &mut PgConnection,
    bake_id: Uuid,
    recipe: &FullRecipeResponse,
    parameters: &HashMap<Uuid, StepParameter>,
) -> QueryResult<()> {
    for step in &recipe.steps {
        let bake_step_id: Uuid = diesel::insert_into(bake_steps::table)
            .values(&NewBakeStep {
                bake_id,
                recipe_step_id: Some(step.id),
                step_order: step.order,
                step_name: &step.template_name,
                description: step.description.as_deref(),
            })
            .returning(bake_steps::id)
            .get_result(conn)?;

        let values: Vec<NewBakeStepParameterValue> = step
            .fields
            .iter()
            .map(|field| NewBakeStepParameterValue {
                bake_step_id,
                parameter_id: field.field_id,
                planned_value: Some(planned_value(parameters.get(&field.field_id), &field.value)),
            })
            .collect();
        if !values.is_empty() {
            diesel::insert_into(bake_step_parameter_values::table)
                .values(&values)
                .execute(conn)?;
        }

        let lines: Vec<NewBakeStepIngredient> = step
            .ingredients
            .iter()
            .enumerate()
            .map(|(index, line)| NewBakeStepIngredient {
                bake_step_id,
                ingredient_id: line.ingredient_id,
                planned_amount: line.amount,
                calculation_mode: &line.calculation_mode,
                planned_preparation: line.preparation.as_deref(),
                position: line_position(index),
            })
            .collect();
        if !lines.is_empty() {
            diesel::insert_into(bake_step_ingredients::table)
                .values(&lines)
                .execute(conn)?;
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/bakes",
    tag = "bakes",
    request_body = CreateBakeRequest,
    responses(
        (status = 201, description = "Bake started from the recipe", body = BakeResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_bake(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Json(request): Json<CreateBakeRequest>,
) -> impl IntoResponse {
    let errors = request.validate();
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    let recipe = match find_visible_recipe(&mut conn, user.id, request.recipe_id) {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    };
    let recipe = match load_full_recipe(&mut conn, recipe) {
        Ok(r) => r,
        Err(e) => return db_error_response(&e, "Failed to fetch recipe steps"),
    };

    let parameter_ids: Vec<Uuid> = recipe
        .steps
        .iter()
        .flat_map(|s| s.fields.iter().map(|f| f.field_id))
        .collect();
    let parameters = match load_parameters(&mut conn, &parameter_ids) {
        Ok(p) => p,
        Err(e) => return db_error_response(&e, "Failed to load step parameters"),
    };

    let notes = request
        .notes
        .clone()
        .unwrap_or_else(|| default_notes(&recipe.name));

    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let bake: Bake = diesel::insert_into(bakes::table)
            .values(&NewBake {
                owner_id: user.id,
                recipe_id: recipe.id,
                notes: Some(notes.as_str()),
                recipe_total_weight_snapshot: recipe.total_weight,
                recipe_hydration_pct_snapshot: recipe.hydration_pct,
                recipe_salt_pct_snapshot: recipe.salt_pct,
            })
            .returning(Bake::as_returning())
            .get_result(conn)?;

        snapshot_steps(conn, bake.id, &recipe, &parameters)?;

        Ok(load_bake_detail(conn, bake)?)
    });

    match result {
        Ok(bake) => {
            tracing::info!(bake_id = %bake.id, recipe_id = %bake.recipe_id, steps = bake.steps.len(), "bake started");
            (StatusCode::CREATED, Json(bake)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parameter(parameter_type: &str) -> StepParameter {
        StepParameter {
            id: Uuid::new_v4(),
            name: "Water Temperature".to_string(),
            parameter_type: parameter_type.to_string(),
            help_text: None,
            default_value: None,
            advanced: false,
            min_value: None,
            max_value: None,
            options: vec![],
        }
    }

    #[test]
    fn test_long_notes_are_rejected() {
        let request = CreateBakeRequest {
            recipe_id: Uuid::nil(),
            notes: Some("x".repeat(5001)),
        };
        assert_eq!(request.validate().errors()[0].field, "notes");

        let request = CreateBakeRequest {
            recipe_id: Uuid::nil(),
            notes: None,
        };
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_default_notes() {
        assert_eq!(default_notes("Country Loaf"), "Bake of Country Loaf");
    }

    #[test]
    fn test_planned_value_follows_parameter_type() {
        assert_eq!(planned_value(Some(&parameter("NUMBER")), "24.5"), json!(24.5));
        assert_eq!(planned_value(Some(&parameter("DURATION")), "240"), json!(240));
        assert_eq!(planned_value(Some(&parameter("BOOLEAN")), "true"), json!(true));
        assert_eq!(planned_value(None, "240"), json!("240"));
    }
}
