use crate::api::db_error_response;
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{
    IngredientCategory, StepParameter, StepTemplate, StepTemplateIngredientRule,
    StepTemplateParameter,
};
use crate::schema::{
    ingredient_categories, step_parameters, step_template_ingredient_rules,
    step_template_parameters, step_templates,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::categories::CategoryResponse;
use super::fields::ParameterResponse;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TemplateFieldResponse {
    pub id: Uuid,
    pub step_template_id: Uuid,
    pub parameter_id: Uuid,
    pub sort_order: i32,
    pub advanced: bool,
    pub visible: bool,
    pub help_text: Option<String>,
    pub default_value: Option<String>,
    pub parameter: ParameterResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngredientRuleResponse {
    pub id: Uuid,
    pub step_template_id: Uuid,
    pub ingredient_category_id: Uuid,
    pub required: bool,
    pub help_text: Option<String>,
    pub ingredient_category: CategoryResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepTemplateResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub role: String,
    pub sort_order: i32,
    pub advanced: bool,
    pub fields: Vec<TemplateFieldResponse>,
    pub ingredient_rules: Vec<IngredientRuleResponse>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepTemplatesResponse {
    pub templates: Vec<StepTemplateResponse>,
}

fn assemble(
    templates: Vec<StepTemplate>,
    fields: Vec<(StepTemplateParameter, StepParameter)>,
    rules: Vec<(StepTemplateIngredientRule, IngredientCategory)>,
) -> Vec<StepTemplateResponse> {
    let mut fields_by_template: HashMap<Uuid, Vec<TemplateFieldResponse>> = HashMap::new();
    for (field, parameter) in fields {
        fields_by_template
            .entry(field.step_template_id)
            .or_default()
            .push(TemplateFieldResponse {
                id: field.id,
                step_template_id: field.step_template_id,
                parameter_id: field.parameter_id,
                sort_order: field.sort_order,
                advanced: field.advanced,
                visible: field.visible,
                help_text: field.help_text,
                default_value: field.default_value,
                parameter: ParameterResponse::from(parameter),
            });
    }

    let mut rules_by_template: HashMap<Uuid, Vec<IngredientRuleResponse>> = HashMap::new();
    for (rule, category) in rules {
        rules_by_template
            .entry(rule.step_template_id)
            .or_default()
            .push(IngredientRuleResponse {
                id: rule.id,
                step_template_id: rule.step_template_id,
                ingredient_category_id: rule.ingredient_category_id,
                required: rule.required,
                help_text: rule.help_text,
                ingredient_category: CategoryResponse::from(category),
            });
    }

    templates
        .into_iter()
        .map(|t| StepTemplateResponse {
            fields: fields_by_template.remove(&t.id).unwrap_or_default(),
            ingredient_rules: rules_by_template.remove(&t.id).unwrap_or_default(),
            id: t.id,
            name: t.name,
            description: t.description,
            role: t.role,
            sort_order: t.sort_order,
            advanced: t.advanced,
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/meta/step-templates",
    tag = "meta",
    responses(
        (status = 200, description = "Step templates with their fields and ingredient rules", body = StepTemplatesResponse)
    )
)]
pub async fn list_step_templates(State(pool): State<Arc<DbPool>>) -> impl IntoResponse {
    let mut conn = get_conn!(pool);

    let templates = match step_templates::table
        .order((step_templates::sort_order.asc(), step_templates::name.asc()))
        .select(StepTemplate::as_select())
        .load(&mut conn)
    {
        Ok(t) => t,
        Err(e) => return db_error_response(&e, "Failed to fetch step templates"),
    };

    let fields = match step_template_parameters::table
        .inner_join(step_parameters::table)
        .order(step_template_parameters::sort_order.asc())
        .select((
            StepTemplateParameter::as_select(),
            StepParameter::as_select(),
        ))
        .load(&mut conn)
    {
        Ok(f) => f,
        Err(e) => return db_error_response(&e, "Failed to fetch template fields"),
    };

    let rules = match step_template_ingredient_rules::table
        .inner_join(ingredient_categories::table)
        .order(ingredient_categories::sort_order.asc())
        .select((
            StepTemplateIngredientRule::as_select(),
            IngredientCategory::as_select(),
        ))
        .load(&mut conn)
    {
        Ok(r) => r,
        Err(e) => return db_error_response(&e, "Failed to fetch ingredient rules"),
    };

    (
        StatusCode::OK,
        Json(StepTemplatesResponse {
            templates: assemble(templates, fields, rules),
        }),
    )
        .into_response()
}
