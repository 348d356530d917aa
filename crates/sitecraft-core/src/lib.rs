mod config;
mod error;
mod outcome;
mod runner;
mod state;

pub use config::{
    RefinementConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_THRESHOLD, MAX_ITERATIONS, MAX_THRESHOLD,
    MIN_ITERATIONS, MIN_THRESHOLD,
};
pub use error::{IterationFailure, RefineError};
pub use outcome::{IterationRecord, RefinementResult, StopReason, IMPROVEMENT_EPSILON};
pub use runner::{RefinementRunner, FOCUS_CRITERIA};
pub use state::MAX_CONSECUTIVE_FAILURES;
