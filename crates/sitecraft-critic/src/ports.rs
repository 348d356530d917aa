use async_trait::async_trait;
use sitecraft_llm::LlmError;

use crate::{Criterion, Evaluation, EvaluationParseError, RefinementContext};

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Judge provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("Invalid judge response: {0}")]
    ResponseValidation(#[from] EvaluationParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum RefinementError {
    #[error("Refiner provider error: {0}")]
    Provider(#[from] LlmError),

    #[error("Refiner returned empty output")]
    EmptyOutput,

    #[error("Refiner returned invalid output: {0}")]
    InvalidOutput(String),
}

/// Inputs for one refinement pass.
#[derive(Clone, Copy)]
pub struct RefinementInput<'a> {
    pub artifact: &'a str,
    pub evaluation: &'a Evaluation,
    /// Weakest criteria, ascending by score
    pub focus: &'a [Criterion],
    pub context: &'a RefinementContext,
    /// 1-based refinement pass
    pub iteration: usize,
}

/// Scores an artifact against the rubric
#[async_trait]
pub trait Judge: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        artifact: &str,
        context: &RefinementContext,
    ) -> Result<Evaluation, EvaluationError>;
}

/// Produces an improved artifact from feedback
#[async_trait]
pub trait Refiner: Send + Sync {
    fn name(&self) -> &str;

    async fn refine(&self, input: RefinementInput<'_>) -> Result<String, RefinementError>;
}
