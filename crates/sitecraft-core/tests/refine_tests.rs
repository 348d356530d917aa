use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sitecraft_core::{
    RefineError, RefinementConfig, RefinementRunner, StopReason, MAX_CONSECUTIVE_FAILURES,
};
use sitecraft_critic::{
    Criterion, CriterionAssessment, Evaluation, EvaluationError, EvaluationParseError, Judge,
    RefinementContext, RefinementError, RefinementInput, Refiner,
};
use sitecraft_llm::LlmError;
use sitecraft_logging::{LogFormat, Logger, RunRecorder};

// ============================================================
// Fakes
// ============================================================

fn eval_with(overall: f64, scores: [f64; 5]) -> Evaluation {
    let criteria: BTreeMap<_, _> = Criterion::ALL
        .iter()
        .zip(scores)
        .map(|(c, score)| {
            (
                *c,
                CriterionAssessment {
                    score,
                    reasoning: format!("{} reasoning", c),
                },
            )
        })
        .collect();
    Evaluation {
        overall_score: overall,
        criteria,
        reasoning: "overall".to_string(),
        suggestions: vec!["tighten spacing".to_string()],
    }
}

fn eval(overall: f64) -> Evaluation {
    eval_with(overall, [overall; 5])
}

fn transport_error() -> EvaluationError {
    EvaluationError::Provider(LlmError::Transport("connection reset".into()))
}

/// Judge that replays a fixed script of verdicts
#[derive(Default)]
struct ScriptedJudge {
    script: Mutex<VecDeque<Result<Evaluation, EvaluationError>>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    fn new(script: Vec<Result<Evaluation, EvaluationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn scores(scores: &[f64]) -> Self {
        Self::new(scores.iter().map(|s| Ok(eval(*s))).collect())
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted-judge"
    }

    async fn evaluate(
        &self,
        artifact: &str,
        _context: &RefinementContext,
    ) -> Result<Evaluation, EvaluationError> {
        self.seen.lock().unwrap().push(artifact.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("judge called more often than scripted")
    }
}

struct SeenInput {
    artifact: String,
    score: f64,
    focus: Vec<Criterion>,
    iteration: usize,
}

/// Refiner that returns `v1`, `v2`, ... or scripted failures
#[derive(Default)]
struct ScriptedRefiner {
    script: Mutex<VecDeque<Result<String, RefinementError>>>,
    seen: Mutex<Vec<SeenInput>>,
}

impl ScriptedRefiner {
    fn new(script: Vec<Result<String, RefinementError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn versions(n: usize) -> Self {
        Self::new((1..=n).map(|i| Ok(format!("v{}", i))).collect())
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Refiner for ScriptedRefiner {
    fn name(&self) -> &str {
        "scripted-refiner"
    }

    async fn refine(&self, input: RefinementInput<'_>) -> Result<String, RefinementError> {
        self.seen.lock().unwrap().push(SeenInput {
            artifact: input.artifact.to_string(),
            score: input.evaluation.overall_score,
            focus: input.focus.to_vec(),
            iteration: input.iteration,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("refiner called more often than scripted")
    }
}

fn quiet_logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

fn context() -> RefinementContext {
    RefinementContext::new("ripgrep", "Recursively search directories for a regex pattern")
}

// ============================================================
// Fast path
// ============================================================

#[tokio::test]
async fn test_fast_path_returns_input_unchanged() {
    let judge = ScriptedJudge::scores(&[4.5]);
    let refiner = ScriptedRefiner::default();
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("<html>original</html>", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap();

    assert_eq!(result.iterations, 0);
    assert_eq!(result.artifact, "<html>original</html>");
    assert!(!result.improved);
    assert_eq!(result.score_improvement, 0.0);
    assert_eq!(result.stop_reason, StopReason::ThresholdMet);
    assert_eq!(judge.calls(), 1);
    assert_eq!(refiner.calls(), 0);
}

#[tokio::test]
async fn test_fast_path_at_exact_threshold() {
    let judge = ScriptedJudge::scores(&[3.5]);
    let refiner = ScriptedRefiner::default();
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(3.5, 3))
        .await
        .unwrap();

    assert_eq!(result.iterations, 0);
    assert_eq!(refiner.calls(), 0);
}

// ============================================================
// Scenarios
// ============================================================

#[tokio::test]
async fn test_single_pass_reaches_threshold() {
    let judge = ScriptedJudge::scores(&[2.5, 4.0]);
    let refiner = ScriptedRefiner::versions(1);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(3.5, 3))
        .await
        .unwrap();

    assert_eq!(result.iterations, 1);
    assert!(result.improved);
    assert!((result.score_improvement - 1.5).abs() < 1e-9);
    assert_eq!(result.final_evaluation.overall_score, 4.0);
    assert_eq!(result.artifact, "v1");
    assert_eq!(result.stop_reason, StopReason::ThresholdMet);
    assert!(result.is_success());
}

#[tokio::test]
async fn test_regression_keeps_earlier_best() {
    let judge = ScriptedJudge::scores(&[2.0, 3.5, 2.5]);
    let refiner = ScriptedRefiner::versions(2);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(5.0, 2))
        .await
        .unwrap();

    assert_eq!(result.iterations, 2);
    assert_eq!(result.final_evaluation.overall_score, 3.5);
    assert_eq!(result.artifact, "v1");
    assert_eq!(result.stop_reason, StopReason::MaxIterationsReached);
    assert!(result.history[0].became_best);
    assert!(!result.history[1].became_best);
}

#[tokio::test]
async fn test_repeated_refiner_failures_return_initial() {
    let judge = ScriptedJudge::scores(&[2.0]);
    let refiner = ScriptedRefiner::new(vec![
        Err(RefinementError::Provider(LlmError::Transport("timeout".into()))),
        Err(RefinementError::Provider(LlmError::Api {
            status: 500,
            body: "overloaded".into(),
        })),
    ]);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("<html>v0</html>", &context(), &RefinementConfig::new(4.0, 5))
        .await
        .unwrap();

    assert_eq!(result.iterations, MAX_CONSECUTIVE_FAILURES);
    assert_eq!(result.artifact, "<html>v0</html>");
    assert_eq!(result.final_evaluation, result.initial_evaluation);
    assert!(!result.improved);
    assert_eq!(result.stop_reason, StopReason::ConsecutiveFailures);
    assert_eq!(judge.calls(), 1);
    assert!(result.history.iter().all(|r| r.error.is_some()));
}

// ============================================================
// Loop behavior
// ============================================================

#[tokio::test]
async fn test_candidate_becomes_current_after_regression() {
    let judge = ScriptedJudge::scores(&[2.0, 3.5, 2.5, 3.0]);
    let refiner = ScriptedRefiner::versions(3);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(5.0, 3))
        .await
        .unwrap();

    let seen = refiner.seen.lock().unwrap();
    assert_eq!(seen[0].artifact, "v0");
    assert_eq!(seen[1].artifact, "v1");
    // The regressed v2 is still refined from
    assert_eq!(seen[2].artifact, "v2");
    assert_eq!(seen[2].score, 2.5);
    assert_eq!(
        seen.iter().map(|s| s.iteration).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(result.artifact, "v1");
}

#[tokio::test]
async fn test_iterations_bounded_by_cap() {
    let judge = ScriptedJudge::scores(&[1.0, 1.5, 2.0, 2.5, 3.0]);
    let refiner = ScriptedRefiner::versions(4);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(5.0, 4))
        .await
        .unwrap();

    assert_eq!(result.iterations, 4);
    assert_eq!(refiner.calls(), 4);
    assert_eq!(judge.calls(), 5);
    assert_eq!(result.artifact, "v4");
    assert_eq!(result.stop_reason, StopReason::MaxIterationsReached);
}

#[tokio::test]
async fn test_best_never_drops_below_initial() {
    let judge = ScriptedJudge::scores(&[2.0, 1.5, 1.2, 1.8]);
    let refiner = ScriptedRefiner::versions(3);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap();

    assert_eq!(result.artifact, "v0");
    assert_eq!(result.final_evaluation.overall_score, 2.0);
    assert_eq!(result.score_improvement, 0.0);
    assert!(!result.improved);
    assert!(result.final_score() >= result.initial_score());
}

#[tokio::test]
async fn test_failed_pass_keeps_current_artifact() {
    let judge = ScriptedJudge::scores(&[2.0, 2.8, 3.1]);
    let refiner = ScriptedRefiner::new(vec![
        Ok("v1".into()),
        Err(RefinementError::InvalidOutput("not html".into())),
        Ok("v3".into()),
    ]);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(5.0, 3))
        .await
        .unwrap();

    let seen = refiner.seen.lock().unwrap();
    assert_eq!(seen[1].artifact, "v1");
    assert_eq!(seen[2].artifact, "v1");
    assert_eq!(seen[2].score, 2.8);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.artifact, "v3");
    assert_eq!(result.history[1].score, None);
}

#[tokio::test]
async fn test_success_resets_failure_counter() {
    let judge = ScriptedJudge::scores(&[2.0, 2.5]);
    let refiner = ScriptedRefiner::new(vec![
        Err(RefinementError::EmptyOutput),
        Ok("v2".into()),
        Err(RefinementError::EmptyOutput),
        Err(RefinementError::EmptyOutput),
    ]);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(5.0, 10))
        .await
        .unwrap();

    assert_eq!(result.iterations, 4);
    assert_eq!(result.artifact, "v2");
    assert_eq!(result.stop_reason, StopReason::ConsecutiveFailures);
}

#[tokio::test]
async fn test_mid_loop_judge_failures_are_absorbed() {
    let judge = ScriptedJudge::new(vec![
        Ok(eval(2.0)),
        Err(transport_error()),
        Err(EvaluationError::ResponseValidation(
            EvaluationParseError::ScoreOutOfRange {
                field: "overall_score".into(),
                value: 8.0,
            },
        )),
    ]);
    let refiner = ScriptedRefiner::versions(2);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 5))
        .await
        .unwrap();

    assert_eq!(result.iterations, 2);
    assert_eq!(result.artifact, "v0");
    assert_eq!(result.stop_reason, StopReason::ConsecutiveFailures);
    assert!(result.history[1]
        .error
        .as_deref()
        .unwrap()
        .contains("evaluation failed"));
}

#[tokio::test]
async fn test_blank_refiner_output_is_a_failure() {
    let judge = ScriptedJudge::scores(&[2.0]);
    let refiner = ScriptedRefiner::new(vec![Ok("   \n".into()), Ok(String::new())]);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let result = runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 5))
        .await
        .unwrap();

    assert_eq!(result.iterations, 2);
    assert_eq!(judge.calls(), 1);
    assert_eq!(result.artifact, "v0");
}

#[tokio::test]
async fn test_refiner_receives_three_weakest_criteria() {
    let judge = ScriptedJudge::new(vec![
        Ok(eval_with(3.0, [3.0, 2.0, 4.0, 3.0, 2.0])),
        Ok(eval(4.5)),
    ]);
    let refiner = ScriptedRefiner::versions(1);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap();

    let seen = refiner.seen.lock().unwrap();
    assert_eq!(
        seen[0].focus,
        vec![
            Criterion::Modernity,
            Criterion::Consistency,
            Criterion::Aesthetics
        ]
    );
}

#[tokio::test]
async fn test_logged_focus_matches_refiner_focus() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let logger = Arc::new(Logger::file_only(&path).unwrap());
    let judge = ScriptedJudge::new(vec![
        Ok(eval_with(2.0, [3.0, 2.0, 4.0, 3.0, 2.0])),
        Ok(eval_with(2.5, [2.0, 4.0, 3.0, 1.0, 4.0])),
        Ok(eval(4.5)),
    ]);
    let refiner = ScriptedRefiner::versions(2);
    let runner = RefinementRunner::new(&judge, &refiner, logger);

    let config = RefinementConfig::new(4.0, 3).with_verbose(true);
    runner.refine("v0", &context(), &config).await.unwrap();

    let logged: Vec<Vec<String>> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
        .filter(|v| v["event"] == "iteration_started")
        .map(|v| serde_json::from_value(v["focus"].clone()).unwrap())
        .collect();
    let sent: Vec<Vec<String>> = refiner
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.focus.iter().map(|c| c.key().to_string()).collect())
        .collect();

    assert_eq!(sent.len(), 2);
    assert_eq!(logged, sent);
    assert_eq!(logged[1], vec!["usability", "aesthetics", "fit_to_subject"]);
}

#[tokio::test]
async fn test_runner_holds_no_state_between_runs() {
    let judge = ScriptedJudge::scores(&[2.0, 3.0, 4.5]);
    let refiner = ScriptedRefiner::versions(1);
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());
    let config = RefinementConfig::new(4.0, 1);

    let first = runner.refine("a0", &context(), &config).await.unwrap();
    let second = runner.refine("b0", &context(), &config).await.unwrap();

    assert_eq!(first.iterations, 1);
    assert_eq!(first.artifact, "v1");
    assert_eq!(second.iterations, 0);
    assert_eq!(second.artifact, "b0");
    assert_eq!(second.initial_score(), 4.5);
}

// ============================================================
// Errors
// ============================================================

#[tokio::test]
async fn test_invalid_config_makes_no_calls() {
    let judge = ScriptedJudge::scores(&[2.0]);
    let refiner = ScriptedRefiner::default();
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    for config in [
        RefinementConfig::new(0.999, 3),
        RefinementConfig::new(5.001, 3),
        RefinementConfig::new(4.0, 0),
        RefinementConfig::new(4.0, 11),
    ] {
        let err = runner.refine("v0", &context(), &config).await.unwrap_err();
        assert!(err.is_configuration(), "unexpected error: {err}");
    }
    assert_eq!(judge.calls(), 0);
    assert_eq!(refiner.calls(), 0);
}

#[tokio::test]
async fn test_initial_evaluation_failure_is_fatal() {
    let judge = ScriptedJudge::new(vec![Err(transport_error())]);
    let refiner = ScriptedRefiner::default();
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let err = runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RefineError::InitialEvaluation(EvaluationError::Provider(_))
    ));
    assert_eq!(refiner.calls(), 0);
}

#[tokio::test]
async fn test_initial_validation_failure_is_fatal() {
    let judge = ScriptedJudge::new(vec![Err(EvaluationError::ResponseValidation(
        EvaluationParseError::MissingCriterion(Criterion::Usability),
    ))]);
    let refiner = ScriptedRefiner::default();
    let runner = RefinementRunner::new(&judge, &refiner, quiet_logger());

    let err = runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("usability"));
}

// ============================================================
// Logging and run records
// ============================================================

#[tokio::test]
async fn test_verbose_controls_event_logging_only() {
    let dir = tempfile::tempdir().unwrap();

    let mut results = Vec::new();
    for verbose in [false, true] {
        let path = dir.path().join(format!("events-{}.jsonl", verbose));
        let logger = Arc::new(Logger::file_only(&path).unwrap());
        let judge = ScriptedJudge::scores(&[2.0, 3.5, 2.5]);
        let refiner = ScriptedRefiner::versions(2);
        let runner = RefinementRunner::new(&judge, &refiner, logger);

        let config = RefinementConfig::new(5.0, 2).with_verbose(verbose);
        let result = runner.refine("v0", &context(), &config).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        results.push((result, content));
    }

    let (quiet, quiet_log) = &results[0];
    let (loud, loud_log) = &results[1];
    assert!(quiet_log.is_empty());

    let events: Vec<String> = loud_log
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["event"].to_string())
        .collect();
    assert!(events.contains(&"\"initial_evaluation\"".to_string()));
    assert!(events.contains(&"\"new_best\"".to_string()));
    assert!(events.contains(&"\"max_iterations_reached\"".to_string()));
    assert_eq!(events.last().unwrap(), "\"refinement_completed\"");

    assert_eq!(quiet.artifact, loud.artifact);
    assert_eq!(quiet.iterations, loud.iterations);
}

#[tokio::test]
async fn test_recorder_writes_run_file() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(RunRecorder::in_dir(dir.path(), "ripgrep").unwrap());
    let judge = ScriptedJudge::scores(&[2.0, 4.2]);
    let refiner = ScriptedRefiner::new(vec![Err(RefinementError::EmptyOutput), Ok("v2".into())]);
    let runner =
        RefinementRunner::new(&judge, &refiner, quiet_logger()).with_recorder(recorder.clone());

    runner
        .refine("v0", &context(), &RefinementConfig::new(4.0, 3))
        .await
        .unwrap();

    let content = std::fs::read_to_string(recorder.path()).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["type"], "run_start");
    assert_eq!(lines[0]["judge"], "scripted-judge");
    assert!(lines[1]["error"].is_string());
    assert_eq!(lines[2]["became_best"], true);
    assert_eq!(lines[3]["stop_reason"], "threshold_met");
    assert_eq!(lines[3]["iterations"], 2);
}
