//! Lookups into the shared libraries used when validating and rendering
//! recipes, steps and bakes.

use crate::models::{
    Ingredient, IngredientCategory, StepParameter, StepTemplate, StepTemplateParameter,
};
use crate::schema::{
    ingredient_categories, ingredients, step_parameters, step_template_parameters, step_templates,
};
use diesel::prelude::*;
use loafly_core::parameters::ParameterDataType;
use loafly_core::{IngredientKind, ParameterSpec, StepRole, TemplateParameter};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A step template together with the parameters it accepts.
#[derive(Debug, Clone)]
pub struct TemplateSchema {
    pub template: StepTemplate,
    pub fields: Vec<TemplateParameter>,
    /// Parameters flagged advanced on the parameter itself or on the template field
    pub advanced_parameters: HashSet<Uuid>,
}

impl TemplateSchema {
    pub fn field(&self, parameter_id: Uuid) -> Option<&TemplateParameter> {
        self.fields.iter().find(|f| f.parameter_id == parameter_id)
    }

    pub fn role(&self) -> Option<StepRole> {
        StepRole::from_str(&self.template.role)
    }
}

#[derive(Debug, Clone)]
pub struct IngredientInfo {
    pub ingredient: Ingredient,
    pub category: IngredientCategory,
}

impl IngredientInfo {
    pub fn kind(&self) -> IngredientKind {
        IngredientKind::from_category_name(&self.category.name)
    }
}

/// The parameter's own definition, outside any template.
pub fn base_spec(parameter: &StepParameter) -> ParameterSpec {
    let data_type =
        ParameterDataType::from_str(&parameter.parameter_type).unwrap_or(ParameterDataType::Text);
    ParameterSpec {
        name: parameter.name.clone(),
        data_type,
        min_value: parameter.min_value,
        max_value: parameter.max_value,
        options: parameter.options.iter().flatten().cloned().collect(),
        default_value: parameter.default_value.clone(),
    }
}

pub fn parameter_spec(field: &StepTemplateParameter, parameter: &StepParameter) -> ParameterSpec {
    base_spec(parameter).with_template_default(field.default_value.clone())
}

/// Load the schemas of the given templates. Unknown ids are simply absent
/// from the result.
pub fn load_template_schemas(
    conn: &mut PgConnection,
    template_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, TemplateSchema>> {
    let templates: Vec<StepTemplate> = step_templates::table
        .filter(step_templates::id.eq_any(template_ids))
        .select(StepTemplate::as_select())
        .load(conn)?;

    let fields: Vec<(StepTemplateParameter, StepParameter)> = step_template_parameters::table
        .inner_join(step_parameters::table)
        .filter(step_template_parameters::step_template_id.eq_any(template_ids))
        .order(step_template_parameters::sort_order.asc())
        .select((
            StepTemplateParameter::as_select(),
            StepParameter::as_select(),
        ))
        .load(conn)?;

    let mut schemas: HashMap<Uuid, TemplateSchema> = templates
        .into_iter()
        .map(|template| {
            (
                template.id,
                TemplateSchema {
                    template,
                    fields: Vec::new(),
                    advanced_parameters: HashSet::new(),
                },
            )
        })
        .collect();

    for (field, parameter) in fields {
        let Some(schema) = schemas.get_mut(&field.step_template_id) else {
            continue;
        };
        if field.advanced || parameter.advanced {
            schema.advanced_parameters.insert(parameter.id);
        }
        schema.fields.push(TemplateParameter {
            parameter_id: parameter.id,
            spec: parameter_spec(&field, &parameter),
        });
    }

    Ok(schemas)
}

pub fn load_ingredients(
    conn: &mut PgConnection,
    ingredient_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, IngredientInfo>> {
    let rows: Vec<(Ingredient, IngredientCategory)> = ingredients::table
        .inner_join(ingredient_categories::table)
        .filter(ingredients::id.eq_any(ingredient_ids))
        .select((Ingredient::as_select(), IngredientCategory::as_select()))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(ingredient, category)| (ingredient.id, IngredientInfo { ingredient, category }))
        .collect())
}

/// Names and data types of parameters, for rendering stored values.
pub fn load_parameters(
    conn: &mut PgConnection,
    parameter_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, StepParameter>> {
    let rows: Vec<StepParameter> = step_parameters::table
        .filter(step_parameters::id.eq_any(parameter_ids))
        .select(StepParameter::as_select())
        .load(conn)?;
    Ok(rows.into_iter().map(|p| (p.id, p)).collect())
}
