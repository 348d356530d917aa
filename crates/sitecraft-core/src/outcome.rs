use chrono::{DateTime, Utc};
use serde::Serialize;
use sitecraft_critic::Evaluation;
use std::time::Duration;

/// Score differences at or below this are treated as noise
pub const IMPROVEMENT_EPSILON: f64 = 0.001;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The initial artifact or a candidate reached the threshold
    ThresholdMet,
    /// Every allowed pass ran without reaching the threshold
    MaxIterationsReached,
    /// Too many passes failed in a row
    ConsecutiveFailures,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::ThresholdMet => "threshold_met",
            StopReason::MaxIterationsReached => "max_iterations_reached",
            StopReason::ConsecutiveFailures => "consecutive_failures",
        }
    }
}

/// Record of a single refinement pass
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    /// 1-based pass number
    pub iteration: usize,
    /// Candidate score, None when the pass failed
    pub score: Option<f64>,
    pub became_best: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The final outcome of a refinement run
#[derive(Debug, Clone, Serialize)]
pub struct RefinementResult {
    /// Best artifact found
    #[serde(skip)]
    pub artifact: String,
    /// Refinement passes performed, failed ones included
    pub iterations: usize,
    pub initial_evaluation: Evaluation,
    /// Evaluation of `artifact`
    pub final_evaluation: Evaluation,
    pub improved: bool,
    pub score_improvement: f64,
    pub stop_reason: StopReason,
    pub history: Vec<IterationRecord>,
    pub total_duration_secs: f64,
}

impl RefinementResult {
    /// Result for an artifact that already met the threshold
    pub fn unchanged(artifact: String, evaluation: Evaluation, duration: Duration) -> Self {
        Self {
            artifact,
            iterations: 0,
            initial_evaluation: evaluation.clone(),
            final_evaluation: evaluation,
            improved: false,
            score_improvement: 0.0,
            stop_reason: StopReason::ThresholdMet,
            history: Vec::new(),
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn refined(
        artifact: String,
        initial_evaluation: Evaluation,
        final_evaluation: Evaluation,
        stop_reason: StopReason,
        history: Vec<IterationRecord>,
        duration: Duration,
    ) -> Self {
        let score_improvement = final_evaluation.overall_score - initial_evaluation.overall_score;
        Self {
            artifact,
            iterations: history.len(),
            initial_evaluation,
            final_evaluation,
            improved: score_improvement > IMPROVEMENT_EPSILON,
            score_improvement,
            stop_reason,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn initial_score(&self) -> f64 {
        self.initial_evaluation.overall_score
    }

    pub fn final_score(&self) -> f64 {
        self.final_evaluation.overall_score
    }

    pub fn is_success(&self) -> bool {
        self.stop_reason == StopReason::ThresholdMet
    }

    pub fn exit_code(&self) -> i32 {
        match self.stop_reason {
            StopReason::ThresholdMet => 0,
            StopReason::MaxIterationsReached => 1,
            StopReason::ConsecutiveFailures => 2,
        }
    }
}
