use crate::api::meta::library::load_template_schemas;
use crate::api::{db_error_response, ErrorResponse};
use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::Recipe;
use crate::schema::{
    ingredients, recipe_step_ingredients, recipe_step_parameter_values, recipe_steps, recipes,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
    pub is_predefined: bool,
    /// Only set on predefined recipes: whether any step relies on advanced
    /// templates, parameters or ingredients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template_advanced: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
}

/// What one step of a predefined recipe uses, for the advanced check.
#[derive(Debug, Default)]
struct StepUsage {
    recipe_id: Uuid,
    template_advanced: bool,
    advanced_parameters: HashSet<Uuid>,
    parameters: Vec<Uuid>,
    uses_advanced_ingredient: bool,
}

impl StepUsage {
    fn is_advanced(&self) -> bool {
        self.template_advanced
            || self.uses_advanced_ingredient
            || self
                .parameters
                .iter()
                .any(|p| self.advanced_parameters.contains(p))
    }
}

fn advanced_recipes(usages: &[StepUsage]) -> HashSet<Uuid> {
    usages
        .iter()
        .filter(|u| u.is_advanced())
        .map(|u| u.recipe_id)
        .collect()
}

fn load_step_usage(conn: &mut PgConnection, recipe_ids: &[Uuid]) -> QueryResult<Vec<StepUsage>> {
    let steps: Vec<(Uuid, Uuid, Uuid)> = recipe_steps::table
        .filter(recipe_steps::recipe_id.eq_any(recipe_ids))
        .select((
            recipe_steps::id,
            recipe_steps::recipe_id,
            recipe_steps::step_template_id,
        ))
        .load(conn)?;
    let step_ids: Vec<Uuid> = steps.iter().map(|(id, _, _)| *id).collect();
    let template_ids: Vec<Uuid> = steps.iter().map(|(_, _, t)| *t).collect();

    let schemas = load_template_schemas(conn, &template_ids)?;

    let values: Vec<(Uuid, Uuid)> = recipe_step_parameter_values::table
        .filter(recipe_step_parameter_values::recipe_step_id.eq_any(&step_ids))
        .select((
            recipe_step_parameter_values::recipe_step_id,
            recipe_step_parameter_values::parameter_id,
        ))
        .load(conn)?;

    let advanced_ingredient_steps: HashSet<Uuid> = recipe_step_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_step_ingredients::recipe_step_id.eq_any(&step_ids))
        .filter(ingredients::advanced.eq(true))
        .select(recipe_step_ingredients::recipe_step_id)
        .load::<Uuid>(conn)?
        .into_iter()
        .collect();

    let mut parameters_by_step: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (step_id, parameter_id) in values {
        parameters_by_step.entry(step_id).or_default().push(parameter_id);
    }

    Ok(steps
        .into_iter()
        .map(|(step_id, recipe_id, template_id)| {
            let schema = schemas.get(&template_id);
            StepUsage {
                recipe_id,
                template_advanced: schema.is_some_and(|s| s.template.advanced),
                advanced_parameters: schema
                    .map(|s| s.advanced_parameters.clone())
                    .unwrap_or_default(),
                parameters: parameters_by_step.remove(&step_id).unwrap_or_default(),
                uses_advanced_ingredient: advanced_ingredient_steps.contains(&step_id),
            }
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    responses(
        (status = 200, description = "The caller's recipes and all predefined recipes", body = ListRecipesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(pool): State<Arc<DbPool>>,
) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let rows: Vec<Recipe> = match recipes::table
        .filter(recipes::deleted_at.is_null())
        .filter(recipes::owner_id.eq(user.id).or(recipes::is_predefined.eq(true)))
        .order((recipes::is_predefined.desc(), recipes::created_at.desc()))
        .select(Recipe::as_select())
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => return db_error_response(&e, "Failed to fetch recipes"),
    };

    let predefined: Vec<Uuid> = rows.iter().filter(|r| r.is_predefined).map(|r| r.id).collect();
    let advanced = match load_step_usage(&mut conn, &predefined) {
        Ok(usages) => advanced_recipes(&usages),
        Err(e) => return db_error_response(&e, "Failed to inspect predefined recipes"),
    };

    let recipes = rows
        .into_iter()
        .map(|r| RecipeSummary {
            is_template_advanced: r.is_predefined.then(|| advanced.contains(&r.id)),
            id: r.id,
            name: r.name,
            notes: r.notes,
            total_weight: r.total_weight,
            hydration_pct: r.hydration_pct,
            salt_pct: r.salt_pct,
            is_predefined: r.is_predefined,
            created_at: r.created_at,
        })
        .collect();

    (StatusCode::OK, Json(ListRecipesResponse { recipes })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(recipe: u128) -> StepUsage {
        StepUsage {
            recipe_id: Uuid::from_u128(recipe),
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_steps_are_not_advanced() {
        let mut step = usage(1);
        step.parameters = vec![Uuid::from_u128(0x3001)];
        step.advanced_parameters = HashSet::from([Uuid::from_u128(0x3007)]);
        assert!(advanced_recipes(&[step, usage(1)]).is_empty());
    }

    #[test]
    fn test_any_advanced_step_marks_its_recipe() {
        let mut template = usage(1);
        template.template_advanced = true;

        let mut parameter = usage(2);
        parameter.parameters = vec![Uuid::from_u128(0x3007)];
        parameter.advanced_parameters = HashSet::from([Uuid::from_u128(0x3007)]);

        let mut ingredient = usage(3);
        ingredient.uses_advanced_ingredient = true;

        let advanced = advanced_recipes(&[template, parameter, ingredient, usage(4)]);
        assert_eq!(
            advanced,
            HashSet::from([Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)])
        );
    }
}
