use serde::{Deserialize, Serialize};

/// How an ingredient amount on a recipe step is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationMode {
    /// Baker's percentage of the relevant flour weight
    Percentage,
    /// Absolute weight in grams
    FixedWeight,
}

impl CalculationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMode::Percentage => "PERCENTAGE",
            CalculationMode::FixedWeight => "FIXED_WEIGHT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PERCENTAGE" => Some(CalculationMode::Percentage),
            "FIXED_WEIGHT" => Some(CalculationMode::FixedWeight),
            _ => None,
        }
    }
}

/// The role a step template plays in the bread-making process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepRole {
    Preferment,
    Autolyse,
    Mix,
    Enrich,
    Bulk,
    Inclusion,
    Shape,
    Proof,
    Bake,
    Rest,
}

impl StepRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRole::Preferment => "PREFERMENT",
            StepRole::Autolyse => "AUTOLYSE",
            StepRole::Mix => "MIX",
            StepRole::Enrich => "ENRICH",
            StepRole::Bulk => "BULK",
            StepRole::Inclusion => "INCLUSION",
            StepRole::Shape => "SHAPE",
            StepRole::Proof => "PROOF",
            StepRole::Bake => "BAKE",
            StepRole::Rest => "REST",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PREFERMENT" => Some(StepRole::Preferment),
            "AUTOLYSE" => Some(StepRole::Autolyse),
            "MIX" => Some(StepRole::Mix),
            "ENRICH" => Some(StepRole::Enrich),
            "BULK" => Some(StepRole::Bulk),
            "INCLUSION" => Some(StepRole::Inclusion),
            "SHAPE" => Some(StepRole::Shape),
            "PROOF" => Some(StepRole::Proof),
            "BAKE" => Some(StepRole::Bake),
            "REST" => Some(StepRole::Rest),
            _ => None,
        }
    }
}

/// Execution status of a single step inside a bake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Failed,
}

impl StepExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepExecutionStatus::Pending => "PENDING",
            StepExecutionStatus::InProgress => "IN_PROGRESS",
            StepExecutionStatus::Completed => "COMPLETED",
            StepExecutionStatus::Skipped => "SKIPPED",
            StepExecutionStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(StepExecutionStatus::Pending),
            "IN_PROGRESS" => Some(StepExecutionStatus::InProgress),
            "COMPLETED" => Some(StepExecutionStatus::Completed),
            "SKIPPED" => Some(StepExecutionStatus::Skipped),
            "FAILED" => Some(StepExecutionStatus::Failed),
            _ => None,
        }
    }

    /// Completed, skipped and failed steps never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepExecutionStatus::Completed
                | StepExecutionStatus::Skipped
                | StepExecutionStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: StepExecutionStatus) -> bool {
        use StepExecutionStatus::*;
        match (self, next) {
            (Pending, InProgress) => true,
            (Pending | InProgress, Completed | Skipped | Failed) => true,
            _ => false,
        }
    }

    /// Every status a step may be in when it moves to `next`.
    pub fn sources_for(next: StepExecutionStatus) -> Vec<StepExecutionStatus> {
        use StepExecutionStatus::*;
        [Pending, InProgress, Completed, Skipped, Failed]
            .into_iter()
            .filter(|status| status.can_transition_to(next))
            .collect()
    }
}

/// Which bucket of the formula an ingredient falls into, derived from its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientKind {
    Flour,
    Water,
    Salt,
    Other,
}

impl IngredientKind {
    /// Category names used by the seeded ingredient library.
    pub fn from_category_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "flour" => IngredientKind::Flour,
            "liquid" | "water" => IngredientKind::Water,
            "salt" => IngredientKind::Salt,
            _ => IngredientKind::Other,
        }
    }
}
