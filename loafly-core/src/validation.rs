//! Field-level validation that reports every problem at once.

use crate::bakers_math::{flour_total_within_limit, IngredientAmount};
use crate::types::CalculationMode;
use serde::Serialize;

pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_NOTES_LENGTH: usize = 5000;
pub const MAX_TOTAL_WEIGHT: f64 = 100_000.0;
pub const MAX_HYDRATION_PCT: f64 = 500.0;
pub const MAX_SALT_PCT: f64 = 10.0;
pub const MAX_INGREDIENT_PERCENTAGE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `steps[1].ingredients[0].amount`
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// One-line summary joining every message.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Recipe-level fields as submitted by a client.
///
/// For partial updates `name` is `None` when the client left it out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecipeFields<'a> {
    pub name: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub total_weight: Option<f64>,
    pub hydration_pct: Option<f64>,
    pub salt_pct: Option<f64>,
}

pub fn validate_recipe_fields(fields: &RecipeFields<'_>, name_required: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    match fields.name {
        Some(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                errors.add("name", "Recipe name is required");
            } else if trimmed.chars().count() > MAX_NAME_LENGTH {
                errors.add("name", "Recipe name must not exceed 255 characters");
            }
        }
        None if name_required => errors.add("name", "Recipe name is required"),
        None => {}
    }

    if let Some(weight) = fields.total_weight {
        if !weight.is_finite() || weight <= 0.0 {
            errors.add("total_weight", "Total weight must be a positive number");
        } else if weight > MAX_TOTAL_WEIGHT {
            errors.add("total_weight", "Total weight must not exceed 100,000 grams");
        }
    }

    if let Some(hydration) = fields.hydration_pct {
        if !hydration.is_finite() || hydration < 0.0 {
            errors.add("hydration_pct", "Hydration percentage cannot be negative");
        } else if hydration > MAX_HYDRATION_PCT {
            errors.add("hydration_pct", "Hydration percentage must not exceed 500%");
        }
    }

    if let Some(salt) = fields.salt_pct {
        if !salt.is_finite() || salt < 0.0 {
            errors.add("salt_pct", "Salt percentage cannot be negative");
        } else if salt > MAX_SALT_PCT {
            errors.add("salt_pct", "Salt percentage must not exceed 10%");
        }
    }

    if let Some(notes) = fields.notes {
        if notes.chars().count() > MAX_NOTES_LENGTH {
            errors.add("notes", "Notes must not exceed 5,000 characters");
        }
    }

    errors
}

/// Check a step's order and ingredient amounts. `prefix` is the step's field path.
pub fn validate_step_amounts(
    prefix: &str,
    order: i32,
    ingredients: &[IngredientAmount],
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if order < 0 {
        errors.add(format!("{prefix}.order"), "Step order cannot be negative");
    }

    for (idx, ing) in ingredients.iter().enumerate() {
        let field = format!("{prefix}.ingredients[{idx}].amount");
        if !ing.amount.is_finite() || ing.amount < 0.0 {
            errors.add(field, "Amount must be zero or a positive number");
        } else if ing.mode == CalculationMode::Percentage
            && ing.amount > MAX_INGREDIENT_PERCENTAGE
        {
            errors.add(field, "Percentage amounts must not exceed 1000%");
        }
    }

    if !flour_total_within_limit(ingredients) {
        errors.add(
            format!("{prefix}.ingredients"),
            "Flour percentages in a step must not add up to more than 100%",
        );
    }

    errors
}

/// Generic bounded, required text field.
pub fn validate_required_text(
    errors: &mut ValidationErrors,
    field: &str,
    label: &str,
    value: &str,
    max_len: usize,
) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("{label} must not exceed {max_len} characters"));
    }
}

/// Optional free text capped at `MAX_NOTES_LENGTH` characters.
pub fn validate_notes(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if value.is_some_and(|text| text.chars().count() > MAX_NOTES_LENGTH) {
        errors.add(field, "Must not exceed 5,000 characters");
    }
}
