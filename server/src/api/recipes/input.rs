//! Request bodies for recipe steps and the checks they must pass before
//! anything is written.

use crate::api::meta::library::{
    load_ingredients, load_template_schemas, IngredientInfo, TemplateSchema,
};
use crate::models::{NewRecipeStep, NewRecipeStepIngredient, NewRecipeStepParameterValue};
use crate::schema::{recipe_step_ingredients, recipe_step_parameter_values, recipe_steps};
use diesel::prelude::*;
use loafly_core::parameters::{missing_defaults, normalize_value};
use loafly_core::validation::{validate_step_amounts, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};
use loafly_core::{CalculationMode, IngredientAmount, IngredientKind, ValidationErrors};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ParameterValueInput {
    /// Existing value to update; omit to add a new one
    pub id: Option<Uuid>,
    pub parameter_id: Uuid,
    /// A string, number or boolean matching the parameter's data type
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientInput {
    /// Existing ingredient line to update; omit to add a new one
    pub id: Option<Uuid>,
    pub ingredient_id: Uuid,
    pub amount: f64,
    pub calculation_mode: CalculationMode,
    pub preparation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StepInput {
    /// Existing step to update; omit to add a new one
    pub id: Option<Uuid>,
    pub step_template_id: Uuid,
    pub order: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub parameter_values: Vec<ParameterValueInput>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

/// A parameter value that passed its template's checks.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedValue {
    pub id: Option<Uuid>,
    pub parameter_id: Uuid,
    /// Canonical stored text
    pub value: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckedStep {
    pub id: Option<Uuid>,
    pub step_template_id: Uuid,
    pub order: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub values: Vec<CheckedValue>,
    /// Template defaults for parameters that were not submitted
    pub defaults: Vec<(Uuid, String)>,
    pub ingredients: Vec<IngredientInput>,
}

/// The templates and ingredients a batch of steps refers to.
#[derive(Debug, Default)]
pub struct Libraries {
    pub templates: HashMap<Uuid, TemplateSchema>,
    pub ingredients: HashMap<Uuid, IngredientInfo>,
}

impl Libraries {
    pub fn load(conn: &mut PgConnection, steps: &[StepInput]) -> QueryResult<Self> {
        let template_ids: Vec<Uuid> = steps.iter().map(|s| s.step_template_id).collect();
        let ingredient_ids: Vec<Uuid> = steps
            .iter()
            .flat_map(|s| s.ingredients.iter().map(|i| i.ingredient_id))
            .collect();

        Ok(Libraries {
            templates: load_template_schemas(conn, &template_ids)?,
            ingredients: load_ingredients(conn, &ingredient_ids)?,
        })
    }
}

fn check_optional_text(
    errors: &mut ValidationErrors,
    field: String,
    label: &str,
    value: Option<&str>,
    max_len: usize,
) {
    if value.is_some_and(|v| v.chars().count() > max_len) {
        errors.add(field, format!("{label} must not exceed {max_len} characters"));
    }
}

fn check_step(
    libraries: &Libraries,
    prefix: &str,
    step: &StepInput,
) -> (CheckedStep, ValidationErrors) {
    let mut errors = ValidationErrors::new();
    let schema = libraries.templates.get(&step.step_template_id);
    if schema.is_none() {
        errors.add(format!("{prefix}.step_template_id"), "Unknown step template");
    }

    check_optional_text(
        &mut errors,
        format!("{prefix}.description"),
        "Description",
        step.description.as_deref(),
        MAX_NOTES_LENGTH,
    );
    check_optional_text(
        &mut errors,
        format!("{prefix}.notes"),
        "Notes",
        step.notes.as_deref(),
        MAX_NOTES_LENGTH,
    );

    let mut values = Vec::with_capacity(step.parameter_values.len());
    let mut submitted = HashSet::new();
    for (idx, input) in step.parameter_values.iter().enumerate() {
        let field = format!("{prefix}.parameter_values[{idx}]");
        if !submitted.insert(input.parameter_id) {
            errors.add(
                format!("{field}.parameter_id"),
                "Parameter is listed more than once",
            );
            continue;
        }
        check_optional_text(
            &mut errors,
            format!("{field}.notes"),
            "Notes",
            input.notes.as_deref(),
            MAX_NOTES_LENGTH,
        );

        let Some(schema) = schema else { continue };
        let Some(template_field) = schema.field(input.parameter_id) else {
            errors.add(
                format!("{field}.parameter_id"),
                "Parameter does not belong to this step template",
            );
            continue;
        };
        match normalize_value(&template_field.spec, &input.value) {
            Ok(value) => values.push(CheckedValue {
                id: input.id,
                parameter_id: input.parameter_id,
                value,
                notes: input.notes.clone(),
            }),
            Err(e) => errors.add(
                format!("{field}.value"),
                format!("{}: {}", template_field.spec.name, e),
            ),
        }
    }

    let mut amounts = Vec::with_capacity(step.ingredients.len());
    for (idx, input) in step.ingredients.iter().enumerate() {
        let field = format!("{prefix}.ingredients[{idx}]");
        let kind = match libraries.ingredients.get(&input.ingredient_id) {
            Some(info) => info.kind(),
            None => {
                errors.add(format!("{field}.ingredient_id"), "Unknown ingredient");
                IngredientKind::Other
            }
        };
        check_optional_text(
            &mut errors,
            format!("{field}.preparation"),
            "Preparation",
            input.preparation.as_deref(),
            MAX_NAME_LENGTH,
        );
        check_optional_text(
            &mut errors,
            format!("{field}.notes"),
            "Notes",
            input.notes.as_deref(),
            MAX_NOTES_LENGTH,
        );
        amounts.push(IngredientAmount {
            amount: input.amount,
            kind,
            mode: input.calculation_mode,
        });
    }
    errors.extend(validate_step_amounts(prefix, step.order, &amounts));

    let defaults = schema
        .map(|s| missing_defaults(&s.fields, &submitted))
        .unwrap_or_default();

    let checked = CheckedStep {
        id: step.id,
        step_template_id: step.step_template_id,
        order: step.order,
        description: step.description.clone(),
        notes: step.notes.clone(),
        values,
        defaults,
        ingredients: step.ingredients.clone(),
    };
    (checked, errors)
}

/// Check every step against the libraries, collecting all problems.
pub fn check_steps(
    libraries: &Libraries,
    steps: &[StepInput],
) -> Result<Vec<CheckedStep>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut checked = Vec::with_capacity(steps.len());

    for (idx, step) in steps.iter().enumerate() {
        let (step, step_errors) = check_step(libraries, &format!("steps[{idx}]"), step);
        errors.extend(step_errors);
        checked.push(step);
    }

    errors.into_result().map(|_| checked)
}

/// Check a single step submitted on its own; fields are reported under `step`.
pub fn check_new_step(
    libraries: &Libraries,
    step: &StepInput,
) -> Result<CheckedStep, ValidationErrors> {
    let (checked, errors) = check_step(libraries, "step", step);
    errors.into_result().map(|_| checked)
}

pub fn insert_value(
    conn: &mut PgConnection,
    recipe_step_id: Uuid,
    parameter_id: Uuid,
    value: &str,
    notes: Option<&str>,
) -> QueryResult<()> {
    diesel::insert_into(recipe_step_parameter_values::table)
        .values(&NewRecipeStepParameterValue {
            recipe_step_id,
            parameter_id,
            value,
            notes,
        })
        .execute(conn)?;
    Ok(())
}

/// Ingredient lines keep the order they were submitted in.
pub fn line_position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

pub fn insert_ingredient(
    conn: &mut PgConnection,
    recipe_step_id: Uuid,
    input: &IngredientInput,
    position: i32,
) -> QueryResult<()> {
    diesel::insert_into(recipe_step_ingredients::table)
        .values(&NewRecipeStepIngredient {
            recipe_step_id,
            ingredient_id: input.ingredient_id,
            amount: input.amount,
            calculation_mode: input.calculation_mode.as_str(),
            preparation: input.preparation.as_deref(),
            notes: input.notes.as_deref(),
            position,
        })
        .execute(conn)?;
    Ok(())
}

/// Insert a new step with its values, template defaults and ingredients.
pub fn insert_step(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    step: &CheckedStep,
) -> QueryResult<Uuid> {
    let step_id: Uuid = diesel::insert_into(recipe_steps::table)
        .values(&NewRecipeStep {
            recipe_id,
            step_template_id: step.step_template_id,
            step_order: step.order,
            description: step.description.as_deref(),
            notes: step.notes.as_deref(),
        })
        .returning(recipe_steps::id)
        .get_result(conn)?;

    for value in &step.values {
        insert_value(conn, step_id, value.parameter_id, &value.value, value.notes.as_deref())?;
    }
    for (parameter_id, value) in &step.defaults {
        insert_value(conn, step_id, *parameter_id, value, None)?;
    }
    for (index, ingredient) in step.ingredients.iter().enumerate() {
        insert_ingredient(conn, step_id, ingredient, line_position(index))?;
    }

    Ok(step_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, IngredientCategory, StepTemplate};
    use loafly_core::{ParameterDataType, ParameterSpec, TemplateParameter};
    use serde_json::json;

    const BULK: Uuid = Uuid::from_u128(0x4005);
    const DURATION: Uuid = Uuid::from_u128(0x3001);
    const FOLDS: Uuid = Uuid::from_u128(0x3003);
    const BREAD_FLOUR: Uuid = Uuid::from_u128(0x2001);
    const RYE: Uuid = Uuid::from_u128(0x2002);
    const WATER: Uuid = Uuid::from_u128(0x2010);

    fn libraries() -> Libraries {
        let mut duration = ParameterSpec::new("Duration (minutes)", ParameterDataType::Duration);
        duration.min_value = Some(0.0);
        duration.max_value = Some(4320.0);
        let folds = ParameterSpec::new("Number of Folds", ParameterDataType::Integer)
            .with_template_default(Some("4".to_string()));

        let template = TemplateSchema {
            template: StepTemplate {
                id: BULK,
                name: "Bulk Fermentation".to_string(),
                description: None,
                role: "BULK".to_string(),
                sort_order: 5,
                advanced: false,
            },
            fields: vec![
                TemplateParameter {
                    parameter_id: DURATION,
                    spec: duration,
                },
                TemplateParameter {
                    parameter_id: FOLDS,
                    spec: folds,
                },
            ],
            advanced_parameters: HashSet::new(),
        };

        let flour = IngredientCategory {
            id: Uuid::from_u128(0x1001),
            name: "Flour".to_string(),
            sort_order: 1,
            description: None,
        };
        let liquid = IngredientCategory {
            id: Uuid::from_u128(0x1002),
            name: "Liquid".to_string(),
            sort_order: 2,
            description: None,
        };
        let ingredient = |id: Uuid, name: &str, category: &IngredientCategory| {
            (
                id,
                IngredientInfo {
                    ingredient: Ingredient {
                        id,
                        name: name.to_string(),
                        ingredient_category_id: category.id,
                        advanced: false,
                        help_text: None,
                    },
                    category: category.clone(),
                },
            )
        };

        Libraries {
            templates: HashMap::from([(BULK, template)]),
            ingredients: HashMap::from([
                ingredient(BREAD_FLOUR, "Bread Flour", &flour),
                ingredient(RYE, "Rye Flour", &flour),
                ingredient(WATER, "Water", &liquid),
            ]),
        }
    }

    fn step(body: serde_json::Value) -> StepInput {
        serde_json::from_value(body).unwrap()
    }

    fn fields(errors: &ValidationErrors) -> Vec<&str> {
        errors.errors().iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_step_gets_normalized_values_and_defaults() {
        let steps = vec![step(json!({
            "step_template_id": BULK,
            "order": 1,
            "parameter_values": [{"parameter_id": DURATION, "value": "4h"}],
            "ingredients": [
                {"ingredient_id": BREAD_FLOUR, "amount": 90, "calculation_mode": "PERCENTAGE"},
                {"ingredient_id": WATER, "amount": 350, "calculation_mode": "FIXED_WEIGHT"}
            ]
        }))];

        let checked = check_steps(&libraries(), &steps).unwrap();
        assert_eq!(checked.len(), 1);
        assert_eq!(checked[0].values[0].value, "240");
        assert_eq!(checked[0].defaults, vec![(FOLDS, "4".to_string())]);
        assert_eq!(checked[0].ingredients.len(), 2);
    }

    #[test]
    fn test_ingredients_keep_submitted_order() {
        let steps = vec![step(json!({
            "step_template_id": BULK,
            "order": 0,
            "ingredients": [
                {"ingredient_id": WATER, "amount": 350, "calculation_mode": "FIXED_WEIGHT"},
                {"ingredient_id": RYE, "amount": 10, "calculation_mode": "PERCENTAGE"},
                {"ingredient_id": BREAD_FLOUR, "amount": 90, "calculation_mode": "PERCENTAGE"}
            ]
        }))];

        let checked = check_steps(&libraries(), &steps).unwrap();
        let placed: Vec<(i32, Uuid)> = checked[0]
            .ingredients
            .iter()
            .enumerate()
            .map(|(index, line)| (line_position(index), line.ingredient_id))
            .collect();
        assert_eq!(placed, vec![(0, WATER), (1, RYE), (2, BREAD_FLOUR)]);
        assert_eq!(line_position(usize::MAX), i32::MAX);
    }

    #[test]
    fn test_submitted_value_suppresses_default() {
        let steps = vec![step(json!({
            "step_template_id": BULK,
            "order": 0,
            "parameter_values": [{"parameter_id": FOLDS, "value": 6}]
        }))];

        let checked = check_steps(&libraries(), &steps).unwrap();
        assert!(checked[0].defaults.is_empty());
        assert_eq!(checked[0].values[0].value, "6");
    }

    #[test]
    fn test_unknown_references_are_reported_per_field() {
        let steps = vec![step(json!({
            "step_template_id": Uuid::from_u128(0xdead),
            "order": 0,
            "ingredients": [
                {"ingredient_id": Uuid::from_u128(0xbeef), "amount": 10, "calculation_mode": "PERCENTAGE"}
            ]
        }))];

        let errors = check_steps(&libraries(), &steps).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["steps[0].step_template_id", "steps[0].ingredients[0].ingredient_id"]
        );
    }

    #[test]
    fn test_parameter_errors() {
        let foreign = Uuid::from_u128(0x3099);
        let steps = vec![step(json!({
            "step_template_id": BULK,
            "order": 2,
            "parameter_values": [
                {"parameter_id": DURATION, "value": "forever"},
                {"parameter_id": foreign, "value": 1},
                {"parameter_id": DURATION, "value": 30}
            ]
        }))];

        let errors = check_steps(&libraries(), &steps).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "steps[0].parameter_values[0].value",
                "steps[0].parameter_values[1].parameter_id",
                "steps[0].parameter_values[2].parameter_id",
            ]
        );
        assert!(errors.errors()[0].message.starts_with("Duration (minutes): must be"));
    }

    #[test]
    fn test_flour_over_100_percent_in_one_step() {
        let steps = vec![
            step(json!({"step_template_id": BULK, "order": 0})),
            step(json!({
                "step_template_id": BULK,
                "order": -1,
                "ingredients": [
                    {"ingredient_id": BREAD_FLOUR, "amount": 80, "calculation_mode": "PERCENTAGE"},
                    {"ingredient_id": RYE, "amount": 30, "calculation_mode": "PERCENTAGE"}
                ]
            })),
        ];

        let errors = check_steps(&libraries(), &steps).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["steps[1].order", "steps[1].ingredients"]
        );
    }

    #[test]
    fn test_missing_value_is_rejected() {
        let steps = vec![step(json!({
            "step_template_id": BULK,
            "order": 0,
            "parameter_values": [{"parameter_id": FOLDS}]
        }))];

        let errors = check_steps(&libraries(), &steps).unwrap_err();
        assert_eq!(fields(&errors), vec!["steps[0].parameter_values[0].value"]);
    }
}
