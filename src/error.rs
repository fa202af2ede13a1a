use thiserror::Error;

/// Failures surfaced by the scheduling core.
///
/// The core never logs or retries; callers decide how to present these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("task {0} not found")]
    NotFound(i32),
    #[error("empty input: {0}")]
    EmptyInput(String),
}

impl PlannerError {
    pub fn validation(message: impl Into<String>) -> Self {
        PlannerError::Validation(message.into())
    }

    pub fn empty_input(message: impl Into<String>) -> Self {
        PlannerError::EmptyInput(message.into())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
