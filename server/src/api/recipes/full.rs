use crate::models::{
    Ingredient, Recipe, RecipeStep, RecipeStepIngredient, RecipeStepParameterValue,
    StepParameter, StepTemplate,
};
use crate::schema::{
    ingredients, recipe_step_ingredients, recipe_step_parameter_values, recipe_steps, recipes,
    step_parameters, step_templates,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepFieldResponse {
    pub id: Uuid,
    pub recipe_step_id: Uuid,
    /// The step parameter this value is for
    pub field_id: Uuid,
    pub name: String,
    pub value: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepIngredientResponse {
    pub id: Uuid,
    pub recipe_step_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub ingredient_category_id: Uuid,
    pub amount: f64,
    pub calculation_mode: String,
    pub preparation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeStepResponse {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub step_template_id: Uuid,
    pub template_name: String,
    pub role: String,
    pub order: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub fields: Vec<StepFieldResponse>,
    pub ingredients: Vec<StepIngredientResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FullRecipeResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
    pub is_predefined: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<RecipeStepResponse>,
}

/// A recipe the user may read: their own or a predefined one.
pub fn find_visible_recipe(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> QueryResult<Option<Recipe>> {
    recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::deleted_at.is_null())
        .filter(recipes::owner_id.eq(user_id).or(recipes::is_predefined.eq(true)))
        .select(Recipe::as_select())
        .first(conn)
        .optional()
}

pub fn find_owned_recipe(
    conn: &mut PgConnection,
    user_id: Uuid,
    recipe_id: Uuid,
) -> QueryResult<Option<Recipe>> {
    recipes::table
        .filter(recipes::id.eq(recipe_id))
        .filter(recipes::owner_id.eq(user_id))
        .filter(recipes::deleted_at.is_null())
        .select(Recipe::as_select())
        .first(conn)
        .optional()
}

/// Attach parameter values and ingredients to already loaded step rows.
pub fn assemble_steps(
    conn: &mut PgConnection,
    steps: Vec<(RecipeStep, StepTemplate)>,
) -> QueryResult<Vec<RecipeStepResponse>> {
    let step_ids: Vec<Uuid> = steps.iter().map(|(s, _)| s.id).collect();

    let values: Vec<(RecipeStepParameterValue, StepParameter)> =
        recipe_step_parameter_values::table
            .inner_join(step_parameters::table)
            .filter(recipe_step_parameter_values::recipe_step_id.eq_any(&step_ids))
            .order(step_parameters::name.asc())
            .select((
                RecipeStepParameterValue::as_select(),
                StepParameter::as_select(),
            ))
            .load(conn)?;

    let lines: Vec<(RecipeStepIngredient, Ingredient)> = recipe_step_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_step_ingredients::recipe_step_id.eq_any(&step_ids))
        .order((recipe_step_ingredients::position.asc(), recipe_step_ingredients::id.asc()))
        .select((RecipeStepIngredient::as_select(), Ingredient::as_select()))
        .load(conn)?;

    let mut fields_by_step: HashMap<Uuid, Vec<StepFieldResponse>> = HashMap::new();
    for (value, parameter) in values {
        fields_by_step
            .entry(value.recipe_step_id)
            .or_default()
            .push(StepFieldResponse {
                id: value.id,
                recipe_step_id: value.recipe_step_id,
                field_id: value.parameter_id,
                name: parameter.name,
                value: value.value,
                notes: value.notes,
            });
    }

    let mut ingredients_by_step: HashMap<Uuid, Vec<StepIngredientResponse>> = HashMap::new();
    for (line, ingredient) in lines {
        ingredients_by_step
            .entry(line.recipe_step_id)
            .or_default()
            .push(StepIngredientResponse {
                id: line.id,
                recipe_step_id: line.recipe_step_id,
                ingredient_id: line.ingredient_id,
                ingredient_name: ingredient.name,
                ingredient_category_id: ingredient.ingredient_category_id,
                amount: line.amount,
                calculation_mode: line.calculation_mode,
                preparation: line.preparation,
                notes: line.notes,
            });
    }

    Ok(steps
        .into_iter()
        .map(|(step, template)| RecipeStepResponse {
            fields: fields_by_step.remove(&step.id).unwrap_or_default(),
            ingredients: ingredients_by_step.remove(&step.id).unwrap_or_default(),
            id: step.id,
            recipe_id: step.recipe_id,
            step_template_id: step.step_template_id,
            template_name: template.name,
            role: template.role,
            order: step.step_order,
            description: step.description,
            notes: step.notes,
        })
        .collect())
}

pub fn load_recipe_steps(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> QueryResult<Vec<RecipeStepResponse>> {
    let steps: Vec<(RecipeStep, StepTemplate)> = recipe_steps::table
        .inner_join(step_templates::table)
        .filter(recipe_steps::recipe_id.eq(recipe_id))
        .order((recipe_steps::step_order.asc(), recipe_steps::id.asc()))
        .select((RecipeStep::as_select(), StepTemplate::as_select()))
        .load(conn)?;

    assemble_steps(conn, steps)
}

pub fn load_full_recipe(conn: &mut PgConnection, recipe: Recipe) -> QueryResult<FullRecipeResponse> {
    let steps = load_recipe_steps(conn, recipe.id)?;
    Ok(FullRecipeResponse {
        id: recipe.id,
        owner_id: recipe.owner_id,
        name: recipe.name,
        notes: recipe.notes,
        total_weight: recipe.total_weight,
        hydration_pct: recipe.hydration_pct,
        salt_pct: recipe.salt_pct,
        is_predefined: recipe.is_predefined,
        created_at: recipe.created_at,
        updated_at: recipe.updated_at,
        steps,
    })
}
