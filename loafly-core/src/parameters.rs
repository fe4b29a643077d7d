//! Typed step parameters.
//!
//! Parameter values are stored as canonical text. A step template decides
//! which parameters a step accepts and what their defaults are; the
//! parameter's data type decides what text is acceptable.

use crate::error::ParameterError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;
use uuid::Uuid;

pub const MAX_TEXT_LENGTH: usize = 5000;

// i64::MAX is not representable as f64; this is the first float past it.
const I64_MAX_F64: f64 = 9_223_372_036_854_775_808.0;
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+(?:\.\d+)?)\s*(?:h|hr|hrs|hour|hours))?\s*(?:(\d+)\s*(?:m|min|mins|minute|minutes))?$",
    )
    .unwrap()
});

static CLOCK_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}):([0-5]\d)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterDataType {
    Text,
    Number,
    Integer,
    Boolean,
    /// Whole minutes
    Duration,
    /// One of a fixed list of options
    Select,
}

impl ParameterDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterDataType::Text => "TEXT",
            ParameterDataType::Number => "NUMBER",
            ParameterDataType::Integer => "INTEGER",
            ParameterDataType::Boolean => "BOOLEAN",
            ParameterDataType::Duration => "DURATION",
            ParameterDataType::Select => "SELECT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TEXT" => Some(ParameterDataType::Text),
            "NUMBER" => Some(ParameterDataType::Number),
            "INTEGER" => Some(ParameterDataType::Integer),
            "BOOLEAN" => Some(ParameterDataType::Boolean),
            "DURATION" => Some(ParameterDataType::Duration),
            "SELECT" => Some(ParameterDataType::Select),
            _ => None,
        }
    }
}

/// Effective definition of a parameter as seen through one step template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub data_type: ParameterDataType,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub options: Vec<String>,
    pub default_value: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, data_type: ParameterDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            min_value: None,
            max_value: None,
            options: Vec::new(),
            default_value: None,
        }
    }

    /// A template-level default wins over the parameter's own default.
    pub fn with_template_default(mut self, template_default: Option<String>) -> Self {
        if let Some(default) = template_default.filter(|d| !d.trim().is_empty()) {
            self.default_value = Some(default);
        }
        self
    }
}

/// A parameter attached to a step template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParameter {
    pub parameter_id: Uuid,
    pub spec: ParameterSpec,
}

/// Convert a submitted JSON scalar into the canonical stored text for `spec`.
pub fn normalize_value(spec: &ParameterSpec, value: &Value) -> Result<String, ParameterError> {
    let raw = match value {
        Value::Null => return Err(ParameterError::Missing),
        Value::Array(_) | Value::Object(_) => return Err(ParameterError::NotAScalar),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    };

    match spec.data_type {
        ParameterDataType::Text => {
            if raw.chars().count() > MAX_TEXT_LENGTH {
                return Err(ParameterError::TooLong(MAX_TEXT_LENGTH));
            }
            Ok(raw)
        }
        ParameterDataType::Number => {
            if raw.is_empty() {
                return Err(ParameterError::Missing);
            }
            let number = parse_number(value, &raw).ok_or(ParameterError::NotANumber)?;
            check_bounds(spec, number)?;
            Ok(number.to_string())
        }
        ParameterDataType::Integer => {
            if raw.is_empty() {
                return Err(ParameterError::Missing);
            }
            let number = parse_number(value, &raw).ok_or(ParameterError::NotANumber)?;
            if number.fract() != 0.0 {
                return Err(ParameterError::NotAnInteger);
            }
            if !(I64_MIN_F64..I64_MAX_F64).contains(&number) {
                return Err(ParameterError::OutOfRange);
            }
            check_bounds(spec, number)?;
            Ok((number as i64).to_string())
        }
        ParameterDataType::Boolean => match raw.to_lowercase().as_str() {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            _ => Err(ParameterError::NotABoolean),
        },
        ParameterDataType::Duration => {
            if raw.is_empty() {
                return Err(ParameterError::Missing);
            }
            let minutes = parse_duration_minutes(&raw).ok_or(ParameterError::InvalidDuration)?;
            check_bounds(spec, minutes as f64)?;
            Ok(minutes.to_string())
        }
        ParameterDataType::Select => spec
            .options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(&raw))
            .cloned()
            .ok_or_else(|| ParameterError::NotAnOption(spec.options.clone())),
    }
}

/// Turn stored text back into a typed JSON value.
///
/// Text that no longer parses under the data type is returned as a string.
pub fn typed_json(data_type: ParameterDataType, stored: &str) -> Value {
    let fallback = || Value::String(stored.to_string());
    match data_type {
        ParameterDataType::Text | ParameterDataType::Select => fallback(),
        ParameterDataType::Number => stored
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        ParameterDataType::Integer | ParameterDataType::Duration => stored
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| fallback()),
        ParameterDataType::Boolean => match stored.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => fallback(),
        },
    }
}

/// Default values for template parameters the caller did not submit.
pub fn missing_defaults(
    template: &[TemplateParameter],
    submitted: &HashSet<Uuid>,
) -> Vec<(Uuid, String)> {
    template
        .iter()
        .filter(|field| !submitted.contains(&field.parameter_id))
        .filter_map(|field| {
            field
                .spec
                .default_value
                .as_ref()
                .map(|default| (field.parameter_id, default.clone()))
        })
        .collect()
}

/// Parse durations like `90`, `1:30`, `1h30m`, `1h 30min`, `2 hours` or `45 min` into minutes.
pub fn parse_duration_minutes(input: &str) -> Option<i64> {
    let text = input.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Ok(minutes) = text.parse::<f64>() {
        return whole_minutes(minutes);
    }

    if let Some(caps) = CLOCK_DURATION_RE.captures(&text) {
        let hours: i64 = caps[1].parse().ok()?;
        let minutes: i64 = caps[2].parse().ok()?;
        return (hours * 60).checked_add(minutes);
    }

    let caps = DURATION_RE.captures(&text)?;
    let hours = caps.get(1);
    let minutes = caps.get(2);
    if hours.is_none() && minutes.is_none() {
        return None;
    }

    let hours: f64 = match hours {
        Some(h) => h.as_str().parse().ok()?,
        None => 0.0,
    };
    let minutes: i64 = match minutes {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    whole_minutes(hours * 60.0)?.checked_add(minutes)
}

/// Round non-negative minutes, rejecting values an i64 cannot hold.
fn whole_minutes(minutes: f64) -> Option<i64> {
    (minutes.is_finite() && (0.0..I64_MAX_F64).contains(&minutes)).then(|| minutes.round() as i64)
}

fn parse_number(value: &Value, raw: &str) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        _ => raw.parse::<f64>().ok()?,
    };
    number.is_finite().then_some(number)
}

fn check_bounds(spec: &ParameterSpec, value: f64) -> Result<(), ParameterError> {
    if let Some(min) = spec.min_value {
        if value < min {
            return Err(ParameterError::BelowMinimum(min));
        }
    }
    if let Some(max) = spec.max_value {
        if value > max {
            return Err(ParameterError::AboveMaximum(max));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(data_type: ParameterDataType) -> ParameterSpec {
        ParameterSpec::new("Test", data_type)
    }

    #[test]
    fn test_number_values() {
        let mut s = spec(ParameterDataType::Number);
        s.min_value = Some(0.0);
        s.max_value = Some(100.0);

        assert_eq!(normalize_value(&s, &json!(20)).unwrap(), "20");
        assert_eq!(normalize_value(&s, &json!("22.5")).unwrap(), "22.5");
        assert_eq!(
            normalize_value(&s, &json!("warm")),
            Err(ParameterError::NotANumber)
        );
        assert_eq!(
            normalize_value(&s, &json!(120)),
            Err(ParameterError::AboveMaximum(100.0))
        );
        assert_eq!(
            normalize_value(&s, &json!(-1)),
            Err(ParameterError::BelowMinimum(0.0))
        );
    }

    #[test]
    fn test_integer_values() {
        let s = spec(ParameterDataType::Integer);
        assert_eq!(normalize_value(&s, &json!(4)).unwrap(), "4");
        assert_eq!(normalize_value(&s, &json!("4")).unwrap(), "4");
        assert_eq!(normalize_value(&s, &json!(4.0)).unwrap(), "4");
        assert_eq!(
            normalize_value(&s, &json!(4.5)),
            Err(ParameterError::NotAnInteger)
        );
    }

    #[test]
    fn test_boolean_and_select_values() {
        let b = spec(ParameterDataType::Boolean);
        assert_eq!(normalize_value(&b, &json!(true)).unwrap(), "true");
        assert_eq!(normalize_value(&b, &json!("FALSE")).unwrap(), "false");
        assert_eq!(
            normalize_value(&b, &json!("yes")),
            Err(ParameterError::NotABoolean)
        );

        let mut sel = spec(ParameterDataType::Select);
        sel.options = vec!["None".into(), "Basic".into(), "Custom".into()];
        assert_eq!(normalize_value(&sel, &json!("basic")).unwrap(), "Basic");
        assert!(matches!(
            normalize_value(&sel, &json!("Coil")),
            Err(ParameterError::NotAnOption(_))
        ));
    }

    #[test]
    fn test_text_and_rejected_shapes() {
        let t = spec(ParameterDataType::Text);
        assert_eq!(
            normalize_value(&t, &json!("  S&F at 30, 60  ")).unwrap(),
            "S&F at 30, 60"
        );
        assert_eq!(normalize_value(&t, &json!(null)), Err(ParameterError::Missing));
        assert_eq!(
            normalize_value(&t, &json!([1, 2])),
            Err(ParameterError::NotAScalar)
        );
        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert_eq!(
            normalize_value(&t, &json!(long)),
            Err(ParameterError::TooLong(MAX_TEXT_LENGTH))
        );
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_minutes("90"), Some(90));
        assert_eq!(parse_duration_minutes("1:30"), Some(90));
        assert_eq!(parse_duration_minutes("1h30m"), Some(90));
        assert_eq!(parse_duration_minutes("1h 30min"), Some(90));
        assert_eq!(parse_duration_minutes("2 hours"), Some(120));
        assert_eq!(parse_duration_minutes("1.5h"), Some(90));
        assert_eq!(parse_duration_minutes("45 min"), Some(45));
        assert_eq!(parse_duration_minutes("overnight"), None);
        assert_eq!(parse_duration_minutes("-5"), None);
        assert_eq!(parse_duration_minutes(""), None);

        let d = spec(ParameterDataType::Duration);
        assert_eq!(normalize_value(&d, &json!("4h")).unwrap(), "240");
    }

    #[test]
    fn test_oversized_durations_are_rejected() {
        assert_eq!(parse_duration_minutes("99999999999999999999h 5m"), None);
        assert_eq!(parse_duration_minutes("1e300"), None);
        assert_eq!(parse_duration_minutes("5h 99999999999999999999m"), None);

        let d = spec(ParameterDataType::Duration);
        assert_eq!(
            normalize_value(&d, &json!("99999999999999999999h 5m")),
            Err(ParameterError::InvalidDuration)
        );
    }

    #[test]
    fn test_integer_outside_i64_is_rejected() {
        let s = spec(ParameterDataType::Integer);
        assert_eq!(normalize_value(&s, &json!(1e19)), Err(ParameterError::OutOfRange));
        assert_eq!(normalize_value(&s, &json!(-1e19)), Err(ParameterError::OutOfRange));
        assert_eq!(
            normalize_value(&s, &json!(-9_000_000_000_000_000_000i64)).unwrap(),
            "-9000000000000000000"
        );
    }

    #[test]
    fn test_typed_json() {
        assert_eq!(typed_json(ParameterDataType::Number, "22.5"), json!(22.5));
        assert_eq!(typed_json(ParameterDataType::Integer, "4"), json!(4));
        assert_eq!(typed_json(ParameterDataType::Boolean, "true"), json!(true));
        assert_eq!(typed_json(ParameterDataType::Text, "warm"), json!("warm"));
        assert_eq!(typed_json(ParameterDataType::Number, "warm"), json!("warm"));
    }

    #[test]
    fn test_missing_defaults() {
        let temp = Uuid::new_v4();
        let folds = Uuid::new_v4();
        let plan = Uuid::new_v4();
        let template = vec![
            TemplateParameter {
                parameter_id: temp,
                spec: spec(ParameterDataType::Number).with_template_default(Some("24".into())),
            },
            TemplateParameter {
                parameter_id: folds,
                spec: spec(ParameterDataType::Integer).with_template_default(Some("4".into())),
            },
            TemplateParameter {
                parameter_id: plan,
                spec: spec(ParameterDataType::Text),
            },
        ];
        let submitted: HashSet<Uuid> = [temp].into_iter().collect();

        let defaults = missing_defaults(&template, &submitted);
        assert_eq!(defaults, vec![(folds, "4".to_string())]);
    }

    #[test]
    fn test_template_default_overrides_parameter_default() {
        let mut s = spec(ParameterDataType::Number);
        s.default_value = Some("60".into());
        assert_eq!(
            s.clone().with_template_default(Some("240".into())).default_value,
            Some("240".into())
        );
        assert_eq!(
            s.with_template_default(Some("  ".into())).default_value,
            Some("60".into())
        );
    }
}
