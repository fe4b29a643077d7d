//! Baker experience levels and the activity counters that drive them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Combined recipes + bakes needed to leave the beginner level.
pub const INTERMEDIATE_ACTIVITY: i32 = 5;
/// Combined recipes + bakes needed to reach the advanced level.
pub const ADVANCED_ACTIVITY: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(ExperienceLevel::Beginner),
            "intermediate" => Some(ExperienceLevel::Intermediate),
            "advanced" => Some(ExperienceLevel::Advanced),
            _ => None,
        }
    }

    /// The level earned by a given amount of activity.
    pub fn for_activity(total_activity: i32) -> Self {
        if total_activity >= ADVANCED_ACTIVITY {
            ExperienceLevel::Advanced
        } else if total_activity >= INTERMEDIATE_ACTIVITY {
            ExperienceLevel::Intermediate
        } else {
            ExperienceLevel::Beginner
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCounters {
    pub recipes_created: i32,
    pub bakes_completed: i32,
    pub total_bake_time_minutes: i32,
    pub advanced_features_used: Vec<String>,
}

impl ActivityCounters {
    pub fn total_activity(&self) -> i32 {
        self.recipes_created.saturating_add(self.bakes_completed)
    }
}

/// A user action as reported to the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedAction {
    RecipeCreated,
    BakeCompleted { duration_minutes: Option<i32> },
    AdvancedFeature { feature: Option<String> },
    /// Stored for history but does not touch any counter
    Other(String),
}

impl TrackedAction {
    pub fn parse(action: &str, details: Option<&Value>) -> Self {
        let detail = |key: &str| details.and_then(|d| d.get(key));
        match action {
            "recipe_created" => TrackedAction::RecipeCreated,
            "bake_completed" => TrackedAction::BakeCompleted {
                duration_minutes: detail("duration_minutes")
                    .and_then(Value::as_f64)
                    .filter(|m| m.is_finite() && *m >= 0.0)
                    .map(|m| m.round() as i32),
            },
            "advanced_feature" => TrackedAction::AdvancedFeature {
                feature: detail("feature")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            },
            other => TrackedAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TrackedAction::RecipeCreated => "recipe_created",
            TrackedAction::BakeCompleted { .. } => "bake_completed",
            TrackedAction::AdvancedFeature { .. } => "advanced_feature",
            TrackedAction::Other(name) => name,
        }
    }
}

/// Apply an action to the counters and return the resulting level.
///
/// Levels only ever go up.
pub fn apply_action(
    counters: &mut ActivityCounters,
    current: ExperienceLevel,
    action: &TrackedAction,
) -> ExperienceLevel {
    match action {
        TrackedAction::RecipeCreated => {
            counters.recipes_created = counters.recipes_created.saturating_add(1)
        }
        TrackedAction::BakeCompleted { duration_minutes } => {
            counters.bakes_completed = counters.bakes_completed.saturating_add(1);
            counters.total_bake_time_minutes = counters
                .total_bake_time_minutes
                .saturating_add(duration_minutes.unwrap_or(0));
        }
        TrackedAction::AdvancedFeature { feature: Some(feature) } => {
            if !counters.advanced_features_used.contains(feature) {
                counters.advanced_features_used.push(feature.clone());
            }
        }
        TrackedAction::AdvancedFeature { feature: None } | TrackedAction::Other(_) => {}
    }

    current.max(ExperienceLevel::for_activity(counters.total_activity()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ExperienceLevel::for_activity(0), ExperienceLevel::Beginner);
        assert_eq!(ExperienceLevel::for_activity(4), ExperienceLevel::Beginner);
        assert_eq!(ExperienceLevel::for_activity(5), ExperienceLevel::Intermediate);
        assert_eq!(ExperienceLevel::for_activity(19), ExperienceLevel::Intermediate);
        assert_eq!(ExperienceLevel::for_activity(20), ExperienceLevel::Advanced);
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            TrackedAction::parse("bake_completed", Some(&json!({"duration_minutes": 412.4}))),
            TrackedAction::BakeCompleted {
                duration_minutes: Some(412)
            }
        );
        assert_eq!(
            TrackedAction::parse("advanced_feature", Some(&json!({"feature": " lamination "}))),
            TrackedAction::AdvancedFeature {
                feature: Some("lamination".to_string())
            }
        );
        assert_eq!(
            TrackedAction::parse("viewed_recipe", None),
            TrackedAction::Other("viewed_recipe".to_string())
        );
    }

    #[test]
    fn test_progression_through_levels() {
        let mut counters = ActivityCounters::default();
        let mut level = ExperienceLevel::Beginner;

        for _ in 0..4 {
            level = apply_action(&mut counters, level, &TrackedAction::RecipeCreated);
        }
        assert_eq!(level, ExperienceLevel::Beginner);

        level = apply_action(
            &mut counters,
            level,
            &TrackedAction::BakeCompleted {
                duration_minutes: Some(300),
            },
        );
        assert_eq!(level, ExperienceLevel::Intermediate);
        assert_eq!(counters.total_bake_time_minutes, 300);

        for _ in 0..15 {
            level = apply_action(&mut counters, level, &TrackedAction::RecipeCreated);
        }
        assert_eq!(level, ExperienceLevel::Advanced);
    }

    #[test]
    fn test_huge_bake_durations_saturate() {
        let action =
            TrackedAction::parse("bake_completed", Some(&json!({"duration_minutes": 1e12})));
        assert_eq!(
            action,
            TrackedAction::BakeCompleted {
                duration_minutes: Some(i32::MAX)
            }
        );

        let mut counters = ActivityCounters {
            total_bake_time_minutes: 10,
            ..ActivityCounters::default()
        };
        apply_action(&mut counters, ExperienceLevel::Beginner, &action);
        apply_action(&mut counters, ExperienceLevel::Beginner, &action);
        assert_eq!(counters.total_bake_time_minutes, i32::MAX);
        assert_eq!(counters.bakes_completed, 2);
    }

    #[test]
    fn test_level_never_drops_and_features_are_unique() {
        let mut counters = ActivityCounters::default();
        let action = TrackedAction::AdvancedFeature {
            feature: Some("preferment_params".to_string()),
        };
        let level = apply_action(&mut counters, ExperienceLevel::Advanced, &action);
        apply_action(&mut counters, level, &action);

        assert_eq!(level, ExperienceLevel::Advanced);
        assert_eq!(counters.advanced_features_used, vec!["preferment_params"]);
    }
}
