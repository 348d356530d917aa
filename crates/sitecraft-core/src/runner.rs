use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use sitecraft_critic::{
    Criterion, Evaluation, Judge, RefinementContext, RefinementError, RefinementInput, Refiner,
};
use sitecraft_logging::{LogEvent, Logger, RunRecorder};

use crate::config::RefinementConfig;
use crate::error::{IterationFailure, RefineError};
use crate::outcome::{RefinementResult, StopReason};
use crate::state::{RefinementState, MAX_CONSECUTIVE_FAILURES};

/// Number of weakest criteria handed to the refiner
pub const FOCUS_CRITERIA: usize = 3;

/// Orchestrates the evaluate → refine → compare loop.
///
/// Holds only injected collaborators; every call to [`refine`](Self::refine)
/// starts from fresh state.
pub struct RefinementRunner<'a> {
    judge: &'a dyn Judge,
    refiner: &'a dyn Refiner,
    logger: Arc<Logger>,
    recorder: Option<Arc<RunRecorder>>,
}

impl<'a> RefinementRunner<'a> {
    pub fn new(judge: &'a dyn Judge, refiner: &'a dyn Refiner, logger: Arc<Logger>) -> Self {
        Self {
            judge,
            refiner,
            logger,
            recorder: None,
        }
    }

    /// Also write a JSONL record of each run
    pub fn with_recorder(mut self, recorder: Arc<RunRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn emit(&self, config: &RefinementConfig, event: LogEvent) {
        if config.verbose {
            self.logger.log(&event);
        }
    }

    /// Run the loop until the threshold is met, the pass cap is hit, or
    /// refinement keeps failing.
    ///
    /// Only invalid configuration and a failed initial evaluation are
    /// returned as errors; mid-loop failures end in a result holding the
    /// best artifact seen.
    pub async fn refine(
        &self,
        initial_artifact: &str,
        context: &RefinementContext,
        config: &RefinementConfig,
    ) -> Result<RefinementResult, RefineError> {
        let config = config.validate()?;
        let started_at = Instant::now();

        self.emit(
            &config,
            LogEvent::RefinementStarted {
                subject: context.subject_name.clone(),
                threshold: config.threshold,
                max_iterations: config.max_iterations,
            },
        );
        if let Some(recorder) = &self.recorder {
            recorder.write_start(
                &context.subject_name,
                self.judge.name(),
                self.refiner.name(),
                config.threshold,
                config.max_iterations,
            );
        }

        let initial_evaluation = self
            .judge
            .evaluate(initial_artifact, context)
            .await
            .map_err(RefineError::InitialEvaluation)?;

        info!(
            score = initial_evaluation.overall_score,
            threshold = config.threshold,
            "Initial evaluation"
        );
        self.emit(
            &config,
            LogEvent::InitialEvaluation {
                score: initial_evaluation.overall_score,
                summary: initial_evaluation.short_description(),
            },
        );

        if initial_evaluation.overall_score >= config.threshold {
            self.emit(
                &config,
                LogEvent::ThresholdAlreadyMet {
                    score: initial_evaluation.overall_score,
                    threshold: config.threshold,
                },
            );
            let result = RefinementResult::unchanged(
                initial_artifact.to_string(),
                initial_evaluation,
                started_at.elapsed(),
            );
            self.finish(&config, &result);
            return Ok(result);
        }

        let mut state =
            RefinementState::new(initial_artifact.to_string(), initial_evaluation, started_at);
        let mut stop_reason = StopReason::MaxIterationsReached;

        for iteration in 1..=config.max_iterations {
            let focus = state.current_evaluation.weakest_criteria(FOCUS_CRITERIA);
            self.emit(
                &config,
                LogEvent::IterationStarted {
                    iteration,
                    current_score: state.current_evaluation.overall_score,
                    focus: focus.iter().map(|c| c.to_string()).collect(),
                },
            );

            match self.run_iteration(&state, &focus, context, iteration).await {
                Ok((artifact, evaluation)) => {
                    let score = evaluation.overall_score;
                    let previous_best = state.best_score();
                    let became_best = state.accept(iteration, artifact, evaluation);

                    debug!(iteration, score, became_best, "Refinement pass evaluated");
                    if let Some(recorder) = &self.recorder {
                        recorder.write_iteration(iteration, Some(score), became_best, None);
                    }
                    if became_best {
                        self.emit(
                            &config,
                            LogEvent::NewBest {
                                iteration,
                                previous: previous_best,
                                score,
                            },
                        );
                    }
                    self.emit(
                        &config,
                        LogEvent::IterationCompleted {
                            iteration,
                            score,
                            best_score: state.best_score(),
                        },
                    );

                    if score >= config.threshold {
                        info!(iteration, score, "Threshold met");
                        self.emit(&config, LogEvent::ThresholdMet { iteration, score });
                        stop_reason = StopReason::ThresholdMet;
                        break;
                    }
                }
                Err(failure) => {
                    let error = failure.to_string();
                    state.reject(iteration, error.clone());

                    warn!(
                        iteration,
                        consecutive_failures = state.consecutive_failures,
                        error = %error,
                        "Refinement pass failed"
                    );
                    if let Some(recorder) = &self.recorder {
                        recorder.write_iteration(iteration, None, false, Some(&error));
                    }
                    self.emit(
                        &config,
                        LogEvent::IterationFailed {
                            iteration,
                            consecutive_failures: state.consecutive_failures,
                            error,
                        },
                    );

                    if state.failure_cap_reached() {
                        warn!(
                            iteration,
                            cap = MAX_CONSECUTIVE_FAILURES,
                            "Too many consecutive failures, keeping best artifact"
                        );
                        self.emit(
                            &config,
                            LogEvent::EarlyTermination {
                                iteration,
                                consecutive_failures: state.consecutive_failures,
                                best_score: state.best_score(),
                            },
                        );
                        stop_reason = StopReason::ConsecutiveFailures;
                        break;
                    }
                }
            }
        }

        if stop_reason == StopReason::MaxIterationsReached {
            self.emit(
                &config,
                LogEvent::MaxIterationsReached {
                    iterations: state.iterations(),
                    best_score: state.best_score(),
                },
            );
        }

        let result = state.into_result(stop_reason);
        self.finish(&config, &result);
        Ok(result)
    }

    /// Run one refine → evaluate pass against the current artifact
    async fn run_iteration(
        &self,
        state: &RefinementState,
        focus: &[Criterion],
        context: &RefinementContext,
        iteration: usize,
    ) -> Result<(String, Evaluation), IterationFailure> {
        let candidate = self
            .refiner
            .refine(RefinementInput {
                artifact: &state.current_artifact,
                evaluation: &state.current_evaluation,
                focus,
                context,
                iteration,
            })
            .await?;

        if candidate.trim().is_empty() {
            return Err(RefinementError::EmptyOutput.into());
        }

        let evaluation = self.judge.evaluate(&candidate, context).await?;
        Ok((candidate, evaluation))
    }

    fn finish(&self, config: &RefinementConfig, result: &RefinementResult) {
        info!(
            iterations = result.iterations,
            initial = result.initial_score(),
            final_score = result.final_score(),
            improved = result.improved,
            stop_reason = result.stop_reason.as_str(),
            "Refinement finished"
        );
        if let Some(recorder) = &self.recorder {
            recorder.write_end(
                result.stop_reason.as_str(),
                result.iterations,
                result.initial_score(),
                result.final_score(),
                result.improved,
                result.total_duration_secs,
            );
        }
        self.emit(
            config,
            LogEvent::RefinementCompleted {
                iterations: result.iterations,
                initial_score: result.initial_score(),
                final_score: result.final_score(),
                improved: result.improved,
                duration_secs: result.total_duration_secs,
            },
        );
    }
}
