//! End-to-end checks of the baker's-percentage helpers working together the
//! way a recipe editor uses them.

use loafly_core::bakers_math::{
    enforce_flour_percentage, is_valid_flour_total, total_flour_percentage, IngredientAmount,
};
use loafly_core::formula::{calculate, FormulaIngredient, FormulaStep, FormulaTargets};
use loafly_core::{CalculationMode, IngredientKind};
use uuid::Uuid;

fn line(kind: IngredientKind, amount: f64) -> IngredientAmount {
    IngredientAmount {
        amount,
        kind,
        mode: CalculationMode::Percentage,
    }
}

/// Apply an edit the way the editor does: normalize, then store.
fn edit(lines: &mut [IngredientAmount], index: usize, value: f64) {
    let normalized = enforce_flour_percentage(lines, index, value);
    lines[index].amount = normalized;
}

#[test]
fn test_editing_flours_keeps_step_at_one_hundred_percent() {
    let mut lines = vec![
        line(IngredientKind::Flour, 100.0),
        line(IngredientKind::Water, 75.0),
        line(IngredientKind::Flour, 0.0),
        line(IngredientKind::Flour, 0.0),
    ];

    edit(&mut lines, 0, 70.0);
    edit(&mut lines, 2, 20.0);
    assert_eq!(total_flour_percentage(&lines), 90.0);

    // Last flour auto-fills to close the gap
    edit(&mut lines, 3, 1.0);
    assert_eq!(lines[3].amount, 10.0);
    assert!(is_valid_flour_total(&lines));

    // Raising the first flour now cannot overflow
    edit(&mut lines, 0, 95.0);
    assert_eq!(lines[0].amount, 70.0);
    assert!(is_valid_flour_total(&lines));
}

#[test]
fn test_formula_matches_recipe_targets() {
    let targets = FormulaTargets {
        total_weight: Some(1000.0),
        hydration_pct: Some(70.0),
        salt_pct: Some(2.0),
    };

    let flour_id = Uuid::new_v4();
    let steps = vec![
        FormulaStep {
            step_id: Uuid::new_v4(),
            order: 0,
            name: "Preferment".to_string(),
            is_preferment: true,
            contribution_pct: Some(10.0),
            hydration_pct: Some(100.0),
            ingredients: vec![],
        },
        FormulaStep {
            step_id: Uuid::new_v4(),
            order: 1,
            name: "Final Mix".to_string(),
            is_preferment: false,
            contribution_pct: None,
            hydration_pct: None,
            ingredients: vec![],
        },
        FormulaStep {
            step_id: Uuid::new_v4(),
            order: 2,
            name: "Lamination".to_string(),
            is_preferment: false,
            contribution_pct: None,
            hydration_pct: None,
            ingredients: vec![FormulaIngredient {
                ingredient_id: flour_id,
                name: "Rye Flour".to_string(),
                kind: IngredientKind::Flour,
                mode: CalculationMode::FixedWeight,
                amount: 0.0,
            }],
        },
    ];

    let table = calculate(&targets, &steps);
    let totals = &table.totals;

    assert_eq!(table.target_total_dough_weight, 1000.0);
    assert!((totals.grand_total - 1000.0).abs() < 0.05);
    assert!((totals.water / totals.total_flour * 100.0 - 70.0).abs() < 0.01);
    assert!((totals.salt / totals.total_flour * 100.0 - 2.0).abs() < 0.01);
    assert_eq!(totals.flour_details.len(), 1);
    assert_eq!(totals.flour_details[0].ingredient_id, flour_id);
}
