//! Bake payloads and the queries that assemble them.

use crate::models::{
    Bake, BakeStep, BakeStepIngredient, BakeStepParameterValue, Ingredient, StepParameter,
};
use crate::schema::{
    bake_step_ingredients, bake_step_parameter_values, bake_steps, ingredients, recipes,
    step_parameters,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeParameterValueResponse {
    pub id: Uuid,
    pub bake_step_id: Uuid,
    pub parameter_id: Uuid,
    pub parameter_name: String,
    pub parameter_type: String,
    #[schema(value_type = Option<Object>)]
    pub planned_value: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub actual_value: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeIngredientResponse {
    pub id: Uuid,
    pub bake_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub planned_amount: f64,
    pub calculation_mode: String,
    pub planned_preparation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeStepResponse {
    pub id: Uuid,
    pub bake_id: Uuid,
    pub recipe_step_id: Option<Uuid>,
    pub order: i32,
    pub step_name: String,
    pub description: Option<String>,
    pub status: String,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub finish_timestamp: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub deviations: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub parameter_values: Vec<BakeParameterValueResponse>,
    pub ingredients: Vec<BakeIngredientResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BakeResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub active: bool,
    pub start_timestamp: DateTime<Utc>,
    pub finish_timestamp: Option<DateTime<Utc>>,
    pub recipe_total_weight_snapshot: Option<f64>,
    pub recipe_hydration_pct_snapshot: Option<f64>,
    pub recipe_salt_pct_snapshot: Option<f64>,
    pub steps: Vec<BakeStepResponse>,
}

/// Steps of the given bakes with their values and ingredients, in step order.
pub fn load_bake_steps(
    conn: &mut PgConnection,
    bake_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Vec<BakeStepResponse>>> {
    let steps: Vec<BakeStep> = bake_steps::table
        .filter(bake_steps::bake_id.eq_any(bake_ids))
        .order((bake_steps::step_order.asc(), bake_steps::id.asc()))
        .select(BakeStep::as_select())
        .load(conn)?;

    let mut by_bake: HashMap<Uuid, Vec<BakeStepResponse>> = HashMap::new();
    for step in assemble_bake_steps(conn, steps)? {
        by_bake.entry(step.bake_id).or_default().push(step);
    }
    Ok(by_bake)
}

pub fn assemble_bake_steps(
    conn: &mut PgConnection,
    steps: Vec<BakeStep>,
) -> QueryResult<Vec<BakeStepResponse>> {
    let step_ids: Vec<Uuid> = steps.iter().map(|s| s.id).collect();

    let values: Vec<(BakeStepParameterValue, StepParameter)> = bake_step_parameter_values::table
        .inner_join(step_parameters::table)
        .filter(bake_step_parameter_values::bake_step_id.eq_any(&step_ids))
        .order(step_parameters::name.asc())
        .select((BakeStepParameterValue::as_select(), StepParameter::as_select()))
        .load(conn)?;

    let lines: Vec<(BakeStepIngredient, Ingredient)> = bake_step_ingredients::table
        .inner_join(ingredients::table)
        .filter(bake_step_ingredients::bake_step_id.eq_any(&step_ids))
        .order((bake_step_ingredients::position.asc(), bake_step_ingredients::id.asc()))
        .select((BakeStepIngredient::as_select(), Ingredient::as_select()))
        .load(conn)?;

    let mut values_by_step: HashMap<Uuid, Vec<BakeParameterValueResponse>> = HashMap::new();
    for (value, parameter) in values {
        values_by_step
            .entry(value.bake_step_id)
            .or_default()
            .push(BakeParameterValueResponse {
                id: value.id,
                bake_step_id: value.bake_step_id,
                parameter_id: value.parameter_id,
                parameter_name: parameter.name,
                parameter_type: parameter.parameter_type,
                planned_value: value.planned_value,
                actual_value: value.actual_value,
                notes: value.notes,
            });
    }

    let mut lines_by_step: HashMap<Uuid, Vec<BakeIngredientResponse>> = HashMap::new();
    for (line, ingredient) in lines {
        lines_by_step
            .entry(line.bake_step_id)
            .or_default()
            .push(BakeIngredientResponse {
                id: line.id,
                bake_step_id: line.bake_step_id,
                ingredient_id: line.ingredient_id,
                ingredient_name: ingredient.name,
                planned_amount: line.planned_amount,
                calculation_mode: line.calculation_mode,
                planned_preparation: line.planned_preparation,
                notes: line.notes,
            });
    }

    Ok(steps
        .into_iter()
        .map(|step| BakeStepResponse {
            parameter_values: values_by_step.remove(&step.id).unwrap_or_default(),
            ingredients: lines_by_step.remove(&step.id).unwrap_or_default(),
            id: step.id,
            bake_id: step.bake_id,
            recipe_step_id: step.recipe_step_id,
            order: step.step_order,
            step_name: step.step_name,
            description: step.description,
            status: step.status,
            start_timestamp: step.start_timestamp,
            finish_timestamp: step.finish_timestamp,
            deviations: step.deviations,
            notes: step.notes,
        })
        .collect())
}

pub fn load_bake_step(conn: &mut PgConnection, step: BakeStep) -> QueryResult<BakeStepResponse> {
    assemble_bake_steps(conn, vec![step])?
        .pop()
        .ok_or(diesel::result::Error::NotFound)
}

pub fn bake_response(
    bake: Bake,
    recipe_name: String,
    steps: Vec<BakeStepResponse>,
) -> BakeResponse {
    BakeResponse {
        id: bake.id,
        owner_id: bake.owner_id,
        recipe_id: bake.recipe_id,
        recipe_name,
        notes: bake.notes,
        rating: bake.rating,
        active: bake.active,
        start_timestamp: bake.start_timestamp,
        finish_timestamp: bake.finish_timestamp,
        recipe_total_weight_snapshot: bake.recipe_total_weight_snapshot,
        recipe_hydration_pct_snapshot: bake.recipe_hydration_pct_snapshot,
        recipe_salt_pct_snapshot: bake.recipe_salt_pct_snapshot,
        steps,
    }
}

pub fn recipe_names(
    conn: &mut PgConnection,
    recipe_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, String>> {
    Ok(recipes::table
        .filter(recipes::id.eq_any(recipe_ids))
        .select((recipes::id, recipes::name))
        .load::<(Uuid, String)>(conn)?
        .into_iter()
        .collect())
}

pub fn load_bake_detail(conn: &mut PgConnection, bake: Bake) -> QueryResult<BakeResponse> {
    let recipe_name = recipe_names(conn, &[bake.recipe_id])?
        .remove(&bake.recipe_id)
        .unwrap_or_default();
    let steps = load_bake_steps(conn, &[bake.id])?
        .remove(&bake.id)
        .unwrap_or_default();
    Ok(bake_response(bake, recipe_name, steps))
}
