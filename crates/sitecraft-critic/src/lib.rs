//! # sitecraft-critic
//!
//! The two ports the refinement loop talks to, and their LLM-backed
//! implementations.
//!
//! - [`Judge`] scores an HTML artifact into a validated [`Evaluation`]
//! - [`Refiner`] rewrites an artifact given the current evaluation
//!
//! Judge replies are parsed into typed values here; nothing untyped crosses
//! into the loop.

pub mod cleanup;
mod context;
mod evaluation;
pub mod evaluator;
mod ports;
mod prompts;

pub use context::RefinementContext;
pub use evaluation::{
    Criterion, CriterionAssessment, Evaluation, EvaluationParseError, MAX_SCORE, MIN_SCORE,
};
pub use evaluator::{LlmJudge, LlmRefiner};
pub use ports::{EvaluationError, Judge, RefinementError, RefinementInput, Refiner};
pub use prompts::CriticPrompts;
