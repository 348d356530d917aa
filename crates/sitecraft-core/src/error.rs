use sitecraft_critic::{EvaluationError, RefinementError};
use thiserror::Error;

/// Errors surfaced to the caller of the refinement loop
#[derive(Error, Debug)]
pub enum RefineError {
    #[error("Invalid threshold {value}: {violation}")]
    InvalidThreshold { value: f64, violation: String },

    #[error("Invalid iteration cap {value}: {violation}")]
    InvalidIterationCap { value: usize, violation: String },

    #[error("Initial evaluation failed: {0}")]
    InitialEvaluation(#[source] EvaluationError),
}

impl RefineError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RefineError::InvalidThreshold { .. } | RefineError::InvalidIterationCap { .. }
        )
    }
}

/// A failed refinement pass. Absorbed by the loop up to the
/// consecutive-failure cap.
#[derive(Error, Debug)]
pub enum IterationFailure {
    #[error("refinement failed: {0}")]
    Refinement(#[from] RefinementError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}
