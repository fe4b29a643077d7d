use crate::api::{
    db_error_response, error_response, nullable, validation_error, ApiError, ErrorResponse,
};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{Recipe, RecipeChanges, RecipeStepChanges};
use crate::schema::{recipe_step_ingredients, recipe_step_parameter_values, recipe_steps, recipes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use loafly_core::validation::{validate_recipe_fields, RecipeFields};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::full::{find_visible_recipe, load_full_recipe, FullRecipeResponse};
use super::input::{
    check_steps, insert_ingredient, insert_step, insert_value, line_position, CheckedStep,
    Libraries, StepInput,
};

/// Partial update. Absent keys are left alone; `null` clears a field.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub total_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub hydration_pct: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<f64>)]
    pub salt_pct: Option<Option<f64>>,
    /// The complete step list. Steps, values and ingredients without an id
    /// are created; existing ones missing from the list are deleted.
    pub steps: Option<Vec<StepInput>>,
}

impl UpdateRecipeRequest {
    fn fields(&self) -> RecipeFields<'_> {
        RecipeFields {
            name: self.name.as_deref(),
            notes: self.notes.as_ref().and_then(|n| n.as_deref()),
            total_weight: self.total_weight.flatten(),
            hydration_pct: self.hydration_pct.flatten(),
            salt_pct: self.salt_pct.flatten(),
        }
    }

    fn changes(&self) -> RecipeChanges<'_> {
        RecipeChanges {
            name: self.name.as_deref().map(str::trim),
            notes: self.notes.as_ref().map(|n| n.as_deref()),
            total_weight: self.total_weight,
            hydration_pct: self.hydration_pct,
            salt_pct: self.salt_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdateRecipeResponse {
    pub message: String,
    pub recipe: FullRecipeResponse,
}

/// The ids a request keeps. Each must already exist under the parent and be
/// listed only once.
fn kept_ids(
    ids: impl IntoIterator<Item = Option<Uuid>>,
    existing: &HashSet<Uuid>,
    label: &str,
    parent: &str,
) -> Result<Vec<Uuid>, ApiError> {
    let mut kept = Vec::new();
    for id in ids.into_iter().flatten() {
        if !existing.contains(&id) {
            return Err(ApiError::BadRequest(format!(
                "{label} {id} does not belong to this {parent}"
            )));
        }
        if kept.contains(&id) {
            return Err(ApiError::BadRequest(format!(
                "{label} {id} is listed more than once"
            )));
        }
        kept.push(id);
    }
    Ok(kept)
}

fn update_existing_step(
    conn: &mut PgConnection,
    step_id: Uuid,
    step: &CheckedStep,
) -> Result<(), ApiError> {
    diesel::update(recipe_steps::table.find(step_id))
        .set(&RecipeStepChanges {
            step_template_id: Some(step.step_template_id),
            step_order: Some(step.order),
            description: Some(step.description.as_deref()),
            notes: Some(step.notes.as_deref()),
        })
        .execute(conn)?;

    let existing: HashSet<Uuid> = recipe_step_parameter_values::table
        .filter(recipe_step_parameter_values::recipe_step_id.eq(step_id))
        .select(recipe_step_parameter_values::id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();
    let kept = kept_ids(
        step.values.iter().map(|v| v.id),
        &existing,
        "Parameter value",
        "step",
    )?;
    diesel::delete(
        recipe_step_parameter_values::table
            .filter(recipe_step_parameter_values::recipe_step_id.eq(step_id))
            .filter(recipe_step_parameter_values::id.ne_all(&kept)),
    )
    .execute(conn)?;

    for value in &step.values {
        match value.id {
            Some(id) => {
                diesel::update(recipe_step_parameter_values::table.find(id))
                    .set((
                        recipe_step_parameter_values::parameter_id.eq(value.parameter_id),
                        recipe_step_parameter_values::value.eq(&value.value),
                        recipe_step_parameter_values::notes.eq(value.notes.as_deref()),
                    ))
                    .execute(conn)?;
            }
            None => insert_value(
                conn,
                step_id,
                value.parameter_id,
                &value.value,
                value.notes.as_deref(),
            )?,
        }
    }

    let existing: HashSet<Uuid> = recipe_step_ingredients::table
        .filter(recipe_step_ingredients::recipe_step_id.eq(step_id))
        .select(recipe_step_ingredients::id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();
    let kept = kept_ids(
        step.ingredients.iter().map(|i| i.id),
        &existing,
        "Ingredient",
        "step",
    )?;
    diesel::delete(
        recipe_step_ingredients::table
            .filter(recipe_step_ingredients::recipe_step_id.eq(step_id))
            .filter(recipe_step_ingredients::id.ne_all(&kept)),
    )
    .execute(conn)?;

    for (index, ingredient) in step.ingredients.iter().enumerate() {
        let position = line_position(index);
        match ingredient.id {
            Some(id) => {
                diesel::update(recipe_step_ingredients::table.find(id))
                    .set((
                        recipe_step_ingredients::ingredient_id.eq(ingredient.ingredient_id),
                        recipe_step_ingredients::amount.eq(ingredient.amount),
                        recipe_step_ingredients::calculation_mode
                            .eq(ingredient.calculation_mode.as_str()),
                        recipe_step_ingredients::preparation.eq(ingredient.preparation.as_deref()),
                        recipe_step_ingredients::notes.eq(ingredient.notes.as_deref()),
                        recipe_step_ingredients::position.eq(position),
                    ))
                    .execute(conn)?;
            }
            None => insert_ingredient(conn, step_id, ingredient, position)?,
        }
    }

    Ok(())
}

/// Make the recipe's steps match `steps` exactly.
fn reconcile_steps(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    steps: &[CheckedStep],
) -> Result<(), ApiError> {
    let existing: HashSet<Uuid> = recipe_steps::table
        .filter(recipe_steps::recipe_id.eq(recipe_id))
        .select(recipe_steps::id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();
    let kept = kept_ids(steps.iter().map(|s| s.id), &existing, "Step", "recipe")?;

    let removed = diesel::delete(
        recipe_steps::table
            .filter(recipe_steps::recipe_id.eq(recipe_id))
            .filter(recipe_steps::id.ne_all(&kept)),
    )
    .execute(conn)?;
    if removed > 0 {
        tracing::debug!(%recipe_id, removed, "removed recipe steps");
    }

    for step in steps {
        match step.id {
            Some(step_id) => update_existing_step(conn, step_id, step)?,
            None => {
                insert_step(conn, recipe_id, step)?;
            }
        }
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = UpdateRecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Predefined recipes cannot be modified", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecipeRequest>,
) -> impl IntoResponse {
    let errors = validate_recipe_fields(&request.fields(), false);
    if !errors.is_empty() {
        return validation_error(errors);
    }

    let mut conn = get_conn!(pool);

    match find_visible_recipe(&mut conn, user.id, id) {
        Ok(Some(r)) if r.is_predefined => {
            return error_response(StatusCode::FORBIDDEN, "Predefined recipes cannot be modified")
        }
        Ok(Some(_)) => {}
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    }

    let steps = match &request.steps {
        Some(inputs) => {
            let libraries = match Libraries::load(&mut conn, inputs) {
                Ok(l) => l,
                Err(e) => return db_error_response(&e, "Failed to load step templates"),
            };
            match check_steps(&libraries, inputs) {
                Ok(s) => Some(s),
                Err(errors) => return validation_error(errors),
            }
        }
        None => None,
    };

    let changes = request.changes();
    let result = conn.transaction::<_, ApiError, _>(|conn| {
        if let Some(steps) = &steps {
            reconcile_steps(conn, id, steps)?;
        }

        if changes.is_empty() {
            diesel::update(recipes::table.find(id))
                .set(recipes::updated_at.eq(diesel::dsl::now))
                .execute(conn)?;
        } else {
            diesel::update(recipes::table.find(id))
                .set(&changes)
                .execute(conn)?;
        }

        let recipe: Recipe = recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(conn)?;
        Ok(load_full_recipe(conn, recipe)?)
    });

    match result {
        Ok(recipe) => (
            StatusCode::OK,
            Json(UpdateRecipeResponse {
                message: "Recipe updated successfully".to_string(),
                recipe,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_clears_and_absent_keeps() {
        let request: UpdateRecipeRequest =
            serde_json::from_str(r#"{"notes": null, "hydration_pct": 80}"#).unwrap();
        let changes = request.changes();
        assert_eq!(changes.notes, Some(None));
        assert_eq!(changes.hydration_pct, Some(Some(80.0)));
        assert_eq!(changes.total_weight, None);
        assert_eq!(changes.name, None);
        assert!(request.steps.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_empty_request_changes_nothing() {
        let request: UpdateRecipeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.changes().is_empty());
        assert!(validate_recipe_fields(&request.fields(), false).is_empty());
    }

    #[test]
    fn test_blank_name_is_still_validated() {
        let request: UpdateRecipeRequest =
            serde_json::from_str(r#"{"name": "   ", "salt_pct": 12}"#).unwrap();
        let errors = validate_recipe_fields(&request.fields(), false);
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "salt_pct"]);
    }

    #[test]
    fn test_kept_ids_rejects_foreign_and_repeated_ids() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let existing = HashSet::from([a, b]);

        let kept = kept_ids([Some(b), None, Some(a)], &existing, "Step", "recipe").unwrap();
        assert_eq!(kept, vec![b, a]);

        let foreign = Uuid::from_u128(9);
        let err = kept_ids([Some(foreign)], &existing, "Step", "recipe").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.ends_with("does not belong to this recipe")));

        let err = kept_ids([Some(a), Some(a)], &existing, "Ingredient", "step").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.ends_with("is listed more than once")));
    }
}
