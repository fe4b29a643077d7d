//! Baker's-percentage arithmetic.
//!
//! Percentages are always relative to total flour weight, so a formula with
//! 1000g flour and 750g water is at 75% hydration.

use crate::types::{CalculationMode, IngredientKind};

/// The flour share that all percentage flours of one step must add up to.
pub const FULL_FLOUR_PERCENTAGE: f64 = 100.0;

const FLOUR_TOTAL_TOLERANCE: f64 = 0.01;

/// Minimal view of an ingredient line needed for percentage bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngredientAmount {
    pub amount: f64,
    pub kind: IngredientKind,
    pub mode: CalculationMode,
}

impl IngredientAmount {
    fn is_percentage_flour(&self) -> bool {
        self.kind == IngredientKind::Flour && self.mode == CalculationMode::Percentage
    }
}

/// Normalize an edited flour percentage so the step's flours never exceed 100%.
///
/// `changed_index` is the position of the edited line within `ingredients`;
/// its current amount is ignored in favour of `new_value`. When the step has
/// several percentage flours and the edited one is the last of them, it is
/// auto-filled with whatever share the other flours leave over.
pub fn enforce_flour_percentage(
    ingredients: &[IngredientAmount],
    changed_index: usize,
    new_value: f64,
) -> f64 {
    let flour_indices: Vec<usize> = ingredients
        .iter()
        .enumerate()
        .filter(|(_, ing)| ing.is_percentage_flour())
        .map(|(idx, _)| idx)
        .collect();

    let sum_others: f64 = flour_indices
        .iter()
        .filter(|&&idx| idx != changed_index)
        .map(|&idx| finite_or_zero(ingredients[idx].amount))
        .sum();

    let mut value = if new_value.is_nan() { 0.0 } else { new_value };
    if value < 0.0 {
        value = 0.0;
    }
    if value + sum_others > FULL_FLOUR_PERCENTAGE {
        value = (FULL_FLOUR_PERCENTAGE - sum_others).max(0.0);
    }

    if flour_indices.len() > 1 && flour_indices.last() == Some(&changed_index) {
        value = (FULL_FLOUR_PERCENTAGE - sum_others).max(0.0);
    }

    value
}

/// Sum of all percentage-mode flour amounts.
pub fn total_flour_percentage(ingredients: &[IngredientAmount]) -> f64 {
    ingredients
        .iter()
        .filter(|ing| ing.is_percentage_flour())
        .map(|ing| finite_or_zero(ing.amount))
        .sum()
}

pub fn is_valid_flour_total(ingredients: &[IngredientAmount]) -> bool {
    (total_flour_percentage(ingredients) - FULL_FLOUR_PERCENTAGE).abs() < FLOUR_TOTAL_TOLERANCE
}

/// True when the flours do not exceed 100% (within tolerance). Partial totals are fine.
pub fn flour_total_within_limit(ingredients: &[IngredientAmount]) -> bool {
    total_flour_percentage(ingredients) <= FULL_FLOUR_PERCENTAGE + FLOUR_TOTAL_TOLERANCE
}

/// Hydration percentage from flour and water weights, rounded to 2 decimals.
pub fn hydration(flour_weight: f64, water_weight: f64) -> f64 {
    bakers_percentage(water_weight, flour_weight)
}

pub fn water_for_hydration(flour_weight: f64, hydration_pct: f64) -> f64 {
    (flour_weight * hydration_pct / 100.0).round()
}

/// Ingredient weight as a percentage of flour weight, rounded to 2 decimals.
pub fn bakers_percentage(ingredient_weight: f64, flour_weight: f64) -> f64 {
    if flour_weight <= 0.0 {
        return 0.0;
    }
    round_to(ingredient_weight / flour_weight * 100.0, 2)
}

/// Whole grams for a baker's percentage of the given flour weight.
pub fn weight_from_percentage(percentage: f64, flour_weight: f64) -> f64 {
    (percentage * flour_weight / 100.0).round()
}

pub fn total_dough_weight(ingredients: &[IngredientAmount], flour_weight: f64) -> f64 {
    ingredients
        .iter()
        .map(|ing| match ing.mode {
            CalculationMode::Percentage => weight_from_percentage(ing.amount, flour_weight),
            CalculationMode::FixedWeight => ing.amount,
        })
        .sum()
}

/// Flour weight implied by a target dough weight at the given hydration and salt.
pub fn flour_for_dough_weight(total_weight: f64, hydration_pct: f64, salt_pct: f64) -> f64 {
    let divisor = 1.0 + hydration_pct / 100.0 + salt_pct / 100.0;
    if divisor <= 0.0 {
        return 0.0;
    }
    total_weight / divisor
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let multiplier = 10f64.powi(decimals);
    (value * multiplier).round() / multiplier
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn format_weight(weight: f64) -> String {
    format!("{}g", weight.round())
}

pub fn format_percentage(percentage: f64, decimals: i32) -> String {
    format!("{}%", round_to(percentage, decimals))
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flour(amount: f64) -> IngredientAmount {
        IngredientAmount {
            amount,
            kind: IngredientKind::Flour,
            mode: CalculationMode::Percentage,
        }
    }

    fn water(amount: f64) -> IngredientAmount {
        IngredientAmount {
            amount,
            kind: IngredientKind::Water,
            mode: CalculationMode::Percentage,
        }
    }

    #[test]
    fn test_enforce_single_flour_is_clamped() {
        let ingredients = vec![flour(100.0), water(75.0)];
        assert_eq!(enforce_flour_percentage(&ingredients, 0, 80.0), 80.0);
        assert_eq!(enforce_flour_percentage(&ingredients, 0, 140.0), 100.0);
        assert_eq!(enforce_flour_percentage(&ingredients, 0, -5.0), 0.0);
        assert_eq!(enforce_flour_percentage(&ingredients, 0, f64::NAN), 0.0);
    }

    #[test]
    fn test_enforce_clamps_against_other_flours() {
        let ingredients = vec![flour(70.0), flour(20.0), flour(10.0)];
        // Editing the first flour cannot push the total past 100
        assert_eq!(enforce_flour_percentage(&ingredients, 0, 90.0), 70.0);
        assert_eq!(enforce_flour_percentage(&ingredients, 0, 50.0), 50.0);
    }

    #[test]
    fn test_enforce_last_flour_auto_fills() {
        let ingredients = vec![flour(70.0), water(75.0), flour(5.0)];
        // Whatever is typed, the last flour takes the remainder
        assert_eq!(enforce_flour_percentage(&ingredients, 2, 5.0), 30.0);
        assert_eq!(enforce_flour_percentage(&ingredients, 2, 99.0), 30.0);
    }

    #[test]
    fn test_enforce_ignores_fixed_weight_flour() {
        let fixed = IngredientAmount {
            amount: 500.0,
            kind: IngredientKind::Flour,
            mode: CalculationMode::FixedWeight,
        };
        let ingredients = vec![flour(60.0), fixed];
        assert_eq!(enforce_flour_percentage(&ingredients, 0, 100.0), 100.0);
    }

    #[test]
    fn test_flour_totals() {
        let ingredients = vec![flour(80.0), flour(20.0), water(70.0)];
        assert_eq!(total_flour_percentage(&ingredients), 100.0);
        assert!(is_valid_flour_total(&ingredients));
        assert!(flour_total_within_limit(&ingredients));

        let over = vec![flour(80.0), flour(30.0)];
        assert!(!is_valid_flour_total(&over));
        assert!(!flour_total_within_limit(&over));
    }

    #[test]
    fn test_percentages_and_weights() {
        assert_eq!(hydration(1000.0, 750.0), 75.0);
        assert_eq!(hydration(0.0, 750.0), 0.0);
        assert_eq!(bakers_percentage(21.0, 1000.0), 2.1);
        assert_eq!(water_for_hydration(500.0, 72.5), 363.0);
        assert_eq!(weight_from_percentage(2.0, 555.0), 11.0);
        assert_eq!(
            total_dough_weight(&[flour(100.0), water(75.0)], 1000.0),
            1750.0
        );
    }

    #[test]
    fn test_flour_for_dough_weight() {
        let flour_weight = flour_for_dough_weight(1770.0, 75.0, 2.0);
        assert!((flour_weight - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_formatting_and_rounding() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(clamp(12.0, 0.0, 10.0), 10.0);
        assert_eq!(format_weight(949.6), "950g");
        assert_eq!(format_percentage(75.46, 1), "75.5%");
    }
}
