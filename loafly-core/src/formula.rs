//! Recipe calculator: turns a recipe's targets and its steps' ingredient
//! lines into gram weights per step.
//!
//! The recipe targets fix the overall flour, water and salt. Steps claim
//! their share explicitly (percentages of flour or fixed weights), a
//! parameter-driven preferment claims a share through its contribution and
//! hydration parameters, and whatever is still unclaimed lands in the first
//! step that lists no flour of its own.

use crate::bakers_math::{flour_for_dough_weight, round_to};
use crate::types::{CalculationMode, IngredientKind};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const PREFERMENT_CONTRIBUTION_PARAMETER: &str = "Contribution (pct)";
pub const PREFERMENT_HYDRATION_PARAMETER: &str = "Hydration";

/// Amounts below this are treated as fully absorbed.
const ABSORB_THRESHOLD: f64 = 0.001;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormulaTargets {
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaIngredient {
    pub ingredient_id: Uuid,
    pub name: String,
    pub kind: IngredientKind,
    pub mode: CalculationMode,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaStep {
    pub step_id: Uuid,
    pub order: i32,
    pub name: String,
    pub is_preferment: bool,
    /// Parsed `Contribution (pct)` value, if the step has one
    pub contribution_pct: Option<f64>,
    /// Parsed `Hydration` value, if the step has one
    pub hydration_pct: Option<f64>,
    pub ingredients: Vec<FormulaIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FlourComponent {
    pub ingredient_id: Uuid,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StepColumn {
    pub step_id: Uuid,
    pub order: i32,
    pub name: String,
    pub is_preferment: bool,
    pub preferment_contribution_pct: Option<f64>,
    pub preferment_hydration_pct: Option<f64>,
    pub flour_components: Vec<FlourComponent>,
    /// Flour not tied to a specific ingredient line
    pub generic_flour_weight: f64,
    pub water_weight: f64,
    pub salt_weight: f64,
    pub other_weight: f64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FlourTotal {
    pub ingredient_id: Uuid,
    pub name: String,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FormulaTotals {
    pub total_flour: f64,
    pub flour_details: Vec<FlourTotal>,
    pub water: f64,
    pub salt: f64,
    pub other: f64,
    pub grand_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FormulaTable {
    pub columns: Vec<StepColumn>,
    pub totals: FormulaTotals,
    pub target_total_dough_weight: f64,
}

struct StepWork<'a> {
    step: &'a FormulaStep,
    flour_components: Vec<FlourComponent>,
    explicit_water: f64,
    explicit_salt: f64,
    other: f64,
    preferment: Option<(f64, f64)>,
    flour: f64,
    water: f64,
}

/// Compute the per-step weight table for a recipe.
pub fn calculate(targets: &FormulaTargets, steps: &[FormulaStep]) -> FormulaTable {
    let target_weight = targets.total_weight.unwrap_or(0.0);
    let empty = FormulaTable {
        columns: Vec::new(),
        totals: FormulaTotals::default(),
        target_total_dough_weight: target_weight,
    };
    if target_weight <= 0.0 || steps.is_empty() {
        return empty;
    }

    let (overall_flour, overall_water, overall_salt) =
        match (targets.hydration_pct, targets.salt_pct) {
            (Some(hydration), Some(salt)) => {
                let flour = flour_for_dough_weight(target_weight, hydration, salt);
                (flour, flour * hydration / 100.0, flour * salt / 100.0)
            }
            _ => (0.0, 0.0, 0.0),
        };

    let mut ordered: Vec<&FormulaStep> = steps.iter().collect();
    ordered.sort_by_key(|s| s.order);

    let mut pending_flour = overall_flour;
    let mut pending_water = overall_water;
    let mut pending_salt = overall_salt;

    // Pass 1: explicit ingredients and parameter-driven preferments
    let mut work: Vec<StepWork<'_>> = Vec::with_capacity(ordered.len());
    for step in ordered {
        let preferment = match (step.is_preferment, step.contribution_pct, step.hydration_pct) {
            (true, Some(contribution), Some(hydration)) => Some((contribution, hydration)),
            _ => None,
        };
        let preferment_flour = preferment.map(|(contribution, _)| overall_flour * contribution / 100.0);

        let mut flour_components = Vec::new();
        let mut explicit_water = 0.0;
        let mut explicit_salt = 0.0;
        let mut other = 0.0;

        for ing in &step.ingredients {
            let weight = match ing.mode {
                CalculationMode::FixedWeight => ing.amount,
                CalculationMode::Percentage => match (ing.kind, preferment_flour) {
                    (IngredientKind::Flour, Some(base)) => ing.amount / 100.0 * base,
                    _ => ing.amount / 100.0 * overall_flour,
                },
            };

            match ing.kind {
                IngredientKind::Flour => flour_components.push(FlourComponent {
                    ingredient_id: ing.ingredient_id,
                    name: ing.name.clone(),
                    weight: round_to(weight, 2),
                }),
                IngredientKind::Water => explicit_water += weight,
                IngredientKind::Salt => explicit_salt += weight,
                IngredientKind::Other => other += weight,
            }
        }

        let mut flour: f64 = flour_components.iter().map(|c| c.weight).sum();
        let mut water = explicit_water;
        if let (Some((_, hydration)), Some(base)) = (preferment, preferment_flour) {
            if flour_components.is_empty() {
                flour = base;
            }
            if explicit_water == 0.0 {
                water = flour * hydration / 100.0;
            }
        }

        pending_flour -= flour;
        pending_water -= water;
        pending_salt -= explicit_salt;

        work.push(StepWork {
            step,
            flour_components,
            explicit_water,
            explicit_salt,
            other,
            preferment,
            flour,
            water,
        });
    }

    // Pass 2: hand whatever is unclaimed to the first step without flour
    let mut columns = Vec::with_capacity(work.len());
    for item in work {
        let mut generic_flour = 0.0;
        let mut water = item.water;
        let mut salt = item.explicit_salt;

        if item.flour_components.is_empty() {
            if item.preferment.is_some() {
                generic_flour = item.flour;
            } else {
                if pending_flour > ABSORB_THRESHOLD {
                    generic_flour = pending_flour.max(0.0);
                    pending_flour = 0.0;
                }
                if item.explicit_water == 0.0 && pending_water > ABSORB_THRESHOLD {
                    water = pending_water.max(0.0);
                    pending_water = 0.0;
                }
                if item.explicit_salt == 0.0 && pending_salt > ABSORB_THRESHOLD {
                    salt = pending_salt.max(0.0);
                    pending_salt = 0.0;
                }
            }
        }

        let flour_total: f64 =
            item.flour_components.iter().map(|c| c.weight).sum::<f64>() + generic_flour;
        let total = flour_total + water + salt + item.other;

        columns.push(StepColumn {
            step_id: item.step.step_id,
            order: item.step.order,
            name: item.step.name.clone(),
            is_preferment: item.step.is_preferment,
            preferment_contribution_pct: item.preferment.map(|(c, _)| c),
            preferment_hydration_pct: item.preferment.map(|(_, h)| h),
            flour_components: item.flour_components,
            generic_flour_weight: round_to(generic_flour, 2),
            water_weight: round_to(water, 2),
            salt_weight: round_to(salt, 2),
            other_weight: round_to(item.other, 2),
            total_weight: round_to(total, 2),
        });
    }

    let totals = summarize(&columns);
    FormulaTable {
        columns,
        totals,
        target_total_dough_weight: target_weight,
    }
}

fn summarize(columns: &[StepColumn]) -> FormulaTotals {
    let mut totals = FormulaTotals::default();
    let mut flours: BTreeMap<Uuid, FlourTotal> = BTreeMap::new();

    for column in columns {
        totals.total_flour += column.generic_flour_weight;
        for component in &column.flour_components {
            totals.total_flour += component.weight;
            flours
                .entry(component.ingredient_id)
                .and_modify(|f| f.total_weight += component.weight)
                .or_insert_with(|| FlourTotal {
                    ingredient_id: component.ingredient_id,
                    name: component.name.clone(),
                    total_weight: component.weight,
                });
        }
        totals.water += column.water_weight;
        totals.salt += column.salt_weight;
        totals.other += column.other_weight;
        totals.grand_total += column.total_weight;
    }

    let mut flour_details: Vec<FlourTotal> = flours
        .into_values()
        .map(|mut f| {
            f.total_weight = round_to(f.total_weight, 2);
            f
        })
        .collect();
    flour_details.sort_by(|a, b| a.name.cmp(&b.name));

    FormulaTotals {
        total_flour: round_to(totals.total_flour, 2),
        flour_details,
        water: round_to(totals.water, 2),
        salt: round_to(totals.salt, 2),
        other: round_to(totals.other, 2),
        grand_total: round_to(totals.grand_total, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> FormulaTargets {
        FormulaTargets {
            total_weight: Some(1770.0),
            hydration_pct: Some(75.0),
            salt_pct: Some(2.0),
        }
    }

    fn step(order: i32, name: &str, ingredients: Vec<FormulaIngredient>) -> FormulaStep {
        FormulaStep {
            step_id: Uuid::new_v4(),
            order,
            name: name.to_string(),
            is_preferment: false,
            contribution_pct: None,
            hydration_pct: None,
            ingredients,
        }
    }

    fn ingredient(name: &str, kind: IngredientKind, mode: CalculationMode, amount: f64) -> FormulaIngredient {
        FormulaIngredient {
            ingredient_id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            mode,
            amount,
        }
    }

    #[test]
    fn test_missing_targets_produce_empty_table() {
        let table = calculate(&FormulaTargets::default(), &[step(1, "Final Mix", vec![])]);
        assert!(table.columns.is_empty());
        assert_eq!(table.target_total_dough_weight, 0.0);
    }

    #[test]
    fn test_first_step_without_flour_absorbs_everything() {
        let steps = vec![step(1, "Final Mix", vec![]), step(2, "Bulk Ferment", vec![])];
        let table = calculate(&targets(), &steps);

        let mix = &table.columns[0];
        assert_eq!(mix.generic_flour_weight, 1000.0);
        assert_eq!(mix.water_weight, 750.0);
        assert_eq!(mix.salt_weight, 20.0);
        assert_eq!(mix.total_weight, 1770.0);

        let bulk = &table.columns[1];
        assert_eq!(bulk.total_weight, 0.0);
        assert_eq!(table.totals.grand_total, 1770.0);
    }

    #[test]
    fn test_param_driven_preferment_claims_its_share() {
        let mut levain = step(1, "Preferment", vec![]);
        levain.is_preferment = true;
        levain.contribution_pct = Some(20.0);
        levain.hydration_pct = Some(100.0);

        let steps = vec![levain, step(2, "Final Mix", vec![])];
        let table = calculate(&targets(), &steps);

        let pre = &table.columns[0];
        assert_eq!(pre.generic_flour_weight, 200.0);
        assert_eq!(pre.water_weight, 200.0);
        assert_eq!(pre.preferment_contribution_pct, Some(20.0));

        let mix = &table.columns[1];
        assert_eq!(mix.generic_flour_weight, 800.0);
        assert_eq!(mix.water_weight, 550.0);
        assert_eq!(mix.salt_weight, 20.0);
        assert_eq!(table.totals.total_flour, 1000.0);
        assert_eq!(table.totals.water, 750.0);
    }

    #[test]
    fn test_preferment_flour_percentages_are_of_preferment_flour() {
        let mut levain = step(
            1,
            "Preferment",
            vec![
                ingredient("Whole Wheat Flour", IngredientKind::Flour, CalculationMode::Percentage, 50.0),
                ingredient("Bread Flour", IngredientKind::Flour, CalculationMode::Percentage, 50.0),
            ],
        );
        levain.is_preferment = true;
        levain.contribution_pct = Some(20.0);
        levain.hydration_pct = Some(80.0);

        let mix = step(
            2,
            "Final Mix",
            vec![ingredient("Bread Flour", IngredientKind::Flour, CalculationMode::Percentage, 80.0)],
        );
        let table = calculate(&targets(), &[mix, levain]);

        // Columns follow step order regardless of input order
        assert_eq!(table.columns[0].name, "Preferment");
        let pre = &table.columns[0];
        assert_eq!(pre.flour_components[0].weight, 100.0);
        assert_eq!(pre.flour_components[1].weight, 100.0);
        assert_eq!(pre.water_weight, 160.0);

        // Neither step is flour-free, so pending water and salt are not placed
        assert_eq!(table.columns[1].flour_components[0].weight, 800.0);
        assert_eq!(table.columns[1].water_weight, 0.0);

        let names: Vec<&str> = table.totals.flour_details.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Bread Flour", "Bread Flour", "Whole Wheat Flour"]);
    }

    #[test]
    fn test_fixed_weights_and_other_ingredients() {
        let steps = vec![
            step(
                1,
                "Final Mix",
                vec![
                    ingredient("Water", IngredientKind::Water, CalculationMode::FixedWeight, 700.0),
                    ingredient("Walnuts", IngredientKind::Other, CalculationMode::Percentage, 10.0),
                ],
            ),
        ];
        let table = calculate(&targets(), &steps);
        let mix = &table.columns[0];

        assert_eq!(mix.water_weight, 700.0);
        assert_eq!(mix.generic_flour_weight, 1000.0);
        assert_eq!(mix.salt_weight, 20.0);
        assert_eq!(mix.other_weight, 100.0);
        assert_eq!(mix.total_weight, 1820.0);
        assert_eq!(table.totals.other, 100.0);
    }
}
