use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("a value is required")]
    Missing,

    #[error("must be a number")]
    NotANumber,

    #[error("must be a whole number")]
    NotAnInteger,

    #[error("is too large")]
    OutOfRange,

    #[error("must be true or false")]
    NotABoolean,

    #[error("must be a duration such as 90, \"1h30m\" or \"45 min\"")]
    InvalidDuration,

    #[error("must be one of: {}", .0.join(", "))]
    NotAnOption(Vec<String>),

    #[error("must be at least {0}")]
    BelowMinimum(f64),

    #[error("must be at most {0}")]
    AboveMaximum(f64),

    #[error("must be at most {0} characters")]
    TooLong(usize),

    #[error("must be a plain value, not a list or object")]
    NotAScalar,
}

