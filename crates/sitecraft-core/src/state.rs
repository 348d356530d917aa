use chrono::Utc;
use sitecraft_critic::Evaluation;
use std::time::{Duration, Instant};

use crate::outcome::{IterationRecord, RefinementResult, StopReason};

/// Consecutive failed passes that end the loop early
pub const MAX_CONSECUTIVE_FAILURES: usize = 2;

/// Mutable state of one refinement run
#[derive(Debug)]
pub(crate) struct RefinementState {
    initial_evaluation: Evaluation,
    /// Artifact fed to the next refinement pass
    pub current_artifact: String,
    pub current_evaluation: Evaluation,
    best_artifact: String,
    best_evaluation: Evaluation,
    pub consecutive_failures: usize,
    history: Vec<IterationRecord>,
    started_at: Instant,
}

impl RefinementState {
    pub fn new(artifact: String, evaluation: Evaluation, started_at: Instant) -> Self {
        Self {
            initial_evaluation: evaluation.clone(),
            current_artifact: artifact.clone(),
            current_evaluation: evaluation.clone(),
            best_artifact: artifact,
            best_evaluation: evaluation,
            consecutive_failures: 0,
            history: Vec::new(),
            started_at,
        }
    }

    pub fn best_score(&self) -> f64 {
        self.best_evaluation.overall_score
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    /// Take a successfully evaluated candidate.
    ///
    /// The candidate always becomes current; it replaces the best only on a
    /// strictly higher score. Returns whether it became the best.
    pub fn accept(&mut self, iteration: usize, artifact: String, evaluation: Evaluation) -> bool {
        let score = evaluation.overall_score;
        let became_best = score > self.best_evaluation.overall_score;
        if became_best {
            self.best_artifact = artifact.clone();
            self.best_evaluation = evaluation.clone();
        }
        self.current_artifact = artifact;
        self.current_evaluation = evaluation;
        self.consecutive_failures = 0;

        self.history.push(IterationRecord {
            iteration,
            score: Some(score),
            became_best,
            error: None,
            timestamp: Utc::now(),
        });
        became_best
    }

    /// Record a failed pass, leaving current and best untouched
    pub fn reject(&mut self, iteration: usize, error: String) {
        self.consecutive_failures += 1;
        self.history.push(IterationRecord {
            iteration,
            score: None,
            became_best: false,
            error: Some(error),
            timestamp: Utc::now(),
        });
    }

    pub fn failure_cap_reached(&self) -> bool {
        self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn into_result(self, stop_reason: StopReason) -> RefinementResult {
        let duration = self.elapsed();
        RefinementResult::refined(
            self.best_artifact,
            self.initial_evaluation,
            self.best_evaluation,
            stop_reason,
            self.history,
            duration,
        )
    }
}
