use crate::api::meta::library::load_ingredients;
use crate::api::{db_error_response, error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use loafly_core::formula::{
    calculate, PREFERMENT_CONTRIBUTION_PARAMETER, PREFERMENT_HYDRATION_PARAMETER,
};
use loafly_core::{
    CalculationMode, FormulaIngredient, FormulaStep, FormulaTable, FormulaTargets, IngredientKind,
    StepRole,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::full::{find_visible_recipe, load_full_recipe, FullRecipeResponse, RecipeStepResponse};

fn numeric_field(step: &RecipeStepResponse, name: &str) -> Option<f64> {
    step.fields
        .iter()
        .find(|f| f.name == name)
        .and_then(|f| f.value.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Turn a loaded recipe into calculator input. `kinds` maps ingredient ids to
/// their formula bucket; unknown ingredients count as "other".
pub fn formula_input(
    recipe: &FullRecipeResponse,
    kinds: &HashMap<Uuid, IngredientKind>,
) -> (FormulaTargets, Vec<FormulaStep>) {
    let targets = FormulaTargets {
        total_weight: recipe.total_weight,
        hydration_pct: recipe.hydration_pct,
        salt_pct: recipe.salt_pct,
    };

    let steps = recipe
        .steps
        .iter()
        .map(|step| FormulaStep {
            step_id: step.id,
            order: step.order,
            name: step.template_name.clone(),
            is_preferment: StepRole::from_str(&step.role) == Some(StepRole::Preferment),
            contribution_pct: numeric_field(step, PREFERMENT_CONTRIBUTION_PARAMETER),
            hydration_pct: numeric_field(step, PREFERMENT_HYDRATION_PARAMETER),
            ingredients: step
                .ingredients
                .iter()
                .filter_map(|line| {
                    Some(FormulaIngredient {
                        ingredient_id: line.ingredient_id,
                        name: line.ingredient_name.clone(),
                        kind: kinds
                            .get(&line.ingredient_id)
                            .copied()
                            .unwrap_or(IngredientKind::Other),
                        mode: CalculationMode::from_str(&line.calculation_mode)?,
                        amount: line.amount,
                    })
                })
                .collect(),
        })
        .collect();

    (targets, steps)
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/calculate",
    tag = "recipes",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Gram weights per step and totals", body = FormulaTable),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn calculate_recipe(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let recipe = match find_visible_recipe(&mut conn, user.id, id) {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Recipe not found"),
        Err(e) => return db_error_response(&e, "Failed to fetch recipe"),
    };
    let full = match load_full_recipe(&mut conn, recipe) {
        Ok(f) => f,
        Err(e) => return db_error_response(&e, "Failed to fetch recipe steps"),
    };

    let ingredient_ids: Vec<Uuid> = full
        .steps
        .iter()
        .flat_map(|s| s.ingredients.iter().map(|i| i.ingredient_id))
        .collect();
    let kinds: HashMap<Uuid, IngredientKind> = match load_ingredients(&mut conn, &ingredient_ids) {
        Ok(infos) => infos.iter().map(|(id, info)| (*id, info.kind())).collect(),
        Err(e) => return db_error_response(&e, "Failed to fetch ingredients"),
    };

    let (targets, steps) = formula_input(&full, &kinds);
    (StatusCode::OK, Json(calculate(&targets, &steps))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::recipes::full::{StepFieldResponse, StepIngredientResponse};
    use chrono::Utc;

    const LEVAIN: Uuid = Uuid::from_u128(0x5101);
    const MIX: Uuid = Uuid::from_u128(0x5102);
    const BREAD_FLOUR: Uuid = Uuid::from_u128(0x2001);
    const WATER: Uuid = Uuid::from_u128(0x2010);
    const SALT: Uuid = Uuid::from_u128(0x2020);

    fn field(step: Uuid, name: &str, value: &str) -> StepFieldResponse {
        StepFieldResponse {
            id: Uuid::new_v4(),
            recipe_step_id: step,
            field_id: Uuid::new_v4(),
            name: name.to_string(),
            value: value.to_string(),
            notes: None,
        }
    }

    fn line(step: Uuid, ingredient: Uuid, name: &str, amount: f64) -> StepIngredientResponse {
        StepIngredientResponse {
            id: Uuid::new_v4(),
            recipe_step_id: step,
            ingredient_id: ingredient,
            ingredient_name: name.to_string(),
            ingredient_category_id: Uuid::new_v4(),
            amount,
            calculation_mode: "PERCENTAGE".to_string(),
            preparation: None,
            notes: None,
        }
    }

    fn step(id: Uuid, order: i32, name: &str, role: &str) -> RecipeStepResponse {
        RecipeStepResponse {
            id,
            recipe_id: Uuid::from_u128(0x5001),
            step_template_id: Uuid::new_v4(),
            template_name: name.to_string(),
            role: role.to_string(),
            order,
            description: None,
            notes: None,
            fields: Vec::new(),
            ingredients: Vec::new(),
        }
    }

    fn basic_sourdough() -> FullRecipeResponse {
        let mut levain = step(LEVAIN, 1, "Levain Build", "PREFERMENT");
        levain.fields = vec![
            field(LEVAIN, PREFERMENT_CONTRIBUTION_PARAMETER, "20"),
            field(LEVAIN, PREFERMENT_HYDRATION_PARAMETER, "100"),
            field(LEVAIN, "Duration (minutes)", "480"),
        ];
        let mut mix = step(MIX, 2, "Mix Dough", "MIX");
        mix.ingredients = vec![
            line(MIX, BREAD_FLOUR, "Bread Flour", 80.0),
            line(MIX, WATER, "Water", 55.0),
            line(MIX, SALT, "Salt", 2.0),
        ];

        FullRecipeResponse {
            id: Uuid::from_u128(0x5001),
            owner_id: Uuid::from_u128(1),
            name: "Basic Sourdough".to_string(),
            notes: None,
            total_weight: Some(1000.0),
            hydration_pct: Some(75.0),
            salt_pct: Some(2.0),
            is_predefined: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            steps: vec![mix, levain],
        }
    }

    fn kinds() -> HashMap<Uuid, IngredientKind> {
        HashMap::from([
            (BREAD_FLOUR, IngredientKind::Flour),
            (WATER, IngredientKind::Water),
            (SALT, IngredientKind::Salt),
        ])
    }

    #[test]
    fn test_preferment_parameters_are_read_from_fields() {
        let (targets, steps) = formula_input(&basic_sourdough(), &kinds());
        assert_eq!(targets.total_weight, Some(1000.0));

        let levain = steps.iter().find(|s| s.step_id == LEVAIN).unwrap();
        assert!(levain.is_preferment);
        assert_eq!(levain.contribution_pct, Some(20.0));
        assert_eq!(levain.hydration_pct, Some(100.0));

        let mix = steps.iter().find(|s| s.step_id == MIX).unwrap();
        assert!(!mix.is_preferment);
        assert_eq!(mix.contribution_pct, None);
        assert_eq!(mix.ingredients[0].kind, IngredientKind::Flour);
        assert_eq!(mix.ingredients[2].mode, CalculationMode::Percentage);
    }

    #[test]
    fn test_unknown_ingredients_count_as_other() {
        let (_, steps) = formula_input(&basic_sourdough(), &HashMap::new());
        let mix = steps.iter().find(|s| s.step_id == MIX).unwrap();
        assert!(mix
            .ingredients
            .iter()
            .all(|i| i.kind == IngredientKind::Other));
    }

    #[test]
    fn test_table_covers_every_step_in_order() {
        let (targets, steps) = formula_input(&basic_sourdough(), &kinds());
        let table = calculate(&targets, &steps);
        let order: Vec<Uuid> = table.columns.iter().map(|c| c.step_id).collect();
        assert_eq!(order, vec![LEVAIN, MIX]);
        assert!(table.totals.total_flour > 0.0);
        assert_eq!(table.target_total_dough_weight, 1000.0);
    }
}
