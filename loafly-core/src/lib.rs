pub mod bakers_math;
pub mod error;
pub mod experience;
pub mod formula;
pub mod parameters;
pub mod timeline;
pub mod timing;
pub mod types;
pub mod validation;

pub use bakers_math::{enforce_flour_percentage, IngredientAmount};
pub use error::ParameterError;
pub use experience::{ActivityCounters, ExperienceLevel, TrackedAction};
pub use formula::{FormulaIngredient, FormulaStep, FormulaTable, FormulaTargets};
pub use parameters::{ParameterDataType, ParameterSpec, TemplateParameter};
pub use timeline::{BakeTimeline, StepProgress, TimelineStep};
pub use timing::{parse_timing_plan, TimingEvent, TimingSchedule};
pub use types::{CalculationMode, IngredientKind, StepExecutionStatus, StepRole};
pub use validation::{FieldError, ValidationErrors};
