use crate::api::{db_error_response, error_response, ApiError, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{
    NewRecipe, NewRecipeStep, NewRecipeStepIngredient, NewRecipeStepParameterValue, Recipe,
    RecipeStep, RecipeStepIngredient, RecipeStepParameterValue,
};
use crate::schema::{recipe_step_ingredients, recipe_step_parameter_values, recipe_steps, recipes};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use super::full::{load_full_recipe, FullRecipeResponse};
use super::input::line_position;

fn clone_name(name: &str) -> String {
    format!("{name} (Clone)")
}

/// Copy every step of `source` with its values and ingredients into `target`.
fn copy_steps(conn: &mut PgConnection, source: Uuid, target: Uuid) -> QueryResult<()> {
    let steps: Vec<RecipeStep> = recipe_steps::table
        .filter(recipe_steps::recipe_id.eq(source))
        .order(recipe_steps::step_order.asc())
        .select(RecipeStep::as_select())
        .load(conn)?;

    for step in steps {
        let new_step_id: Uuid = diesel::insert_into(recipe_steps::table)
            .values(&NewRecipeStep {
                recipe_id: target,
                step_template_id: step.step_template_id,
                step_order: step.step_order,
                description: step.description.as_deref(),
                notes: step.notes.as_deref(),
            })
            .returning(recipe_steps::id)
            .get_result(conn)?;

        let values: Vec<RecipeStepParameterValue> = recipe_step_parameter_values::table
            .filter(recipe_step_parameter_values::recipe_step_id.eq(step.id))
            .select(RecipeStepParameterValue::as_select())
            .load(conn)?;
        let new_values: Vec<NewRecipeStepParameterValue> = values
            .iter()
            .map(|v| NewRecipeStepParameterValue {
                recipe_step_id: new_step_id,
                parameter_id: v.parameter_id,
                value: &v.value,
                notes: v.notes.as_deref(),
            })
            .collect();
        diesel::insert_into(recipe_step_parameter_values::table)
            .values(&new_values)
            .execute(conn)?;

        let lines: Vec<RecipeStepIngredient> = recipe_step_ingredients::table
            .filter(recipe_step_ingredients::recipe_step_id.eq(step.id))
            .order((recipe_step_ingredients::position.asc(), recipe_step_ingredients::id.asc()))
            .select(RecipeStepIngredient::as_select())
            .load(conn)?;
        let new_lines: Vec<NewRecipeStepIngredient> = lines
            .iter()
            .enumerate()
            .map(|(index, l)| NewRecipeStepIngredient {
                recipe_step_id: new_step_id,
                ingredient_id: l.ingredient_id,
                amount: l.amount,
                calculation_mode: &l.calculation_mode,
                preparation: l.preparation.as_deref(),
                notes: l.notes.as_deref(),
                position: line_position(index),
            })
            .collect();
        diesel::insert_into(recipe_step_ingredients::table)
            .values(&new_lines)
            .execute(conn)?;
    }

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/clone",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "ID of the predefined recipe to copy")
    ),
    responses(
        (status = 201, description = "Copy created in the caller's account", body = FullRecipeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Predefined recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn clone_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let source: Recipe = match recipes::table
        .filter(recipes::id.eq(id))
        .filter(recipes::is_predefined.eq(true))
        .filter(recipes::deleted_at.is_null())
        .select(Recipe::as_select())
        .first(&mut conn)
        .optional()
    {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Predefined recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    };

    let name = clone_name(&source.name);
    let result = conn.transaction::<_, ApiError, _>(|conn| {
        let copy: Recipe = diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                owner_id: user.id,
                name: &name,
                notes: source.notes.as_deref(),
                total_weight: source.total_weight,
                hydration_pct: source.hydration_pct,
                salt_pct: source.salt_pct,
                is_predefined: false,
            })
            .returning(Recipe::as_returning())
            .get_result(conn)?;

        copy_steps(conn, source.id, copy.id)?;
        Ok(load_full_recipe(conn, copy)?)
    });

    match result {
        Ok(recipe) => {
            tracing::info!(source_id = %source.id, recipe_id = %recipe.id, "recipe cloned");
            (StatusCode::CREATED, Json(recipe)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
