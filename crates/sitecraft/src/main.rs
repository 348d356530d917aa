mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use sitecraft_core::{RefinementConfig, RefinementResult, RefinementRunner, StopReason};
use sitecraft_critic::{Evaluation, Judge, LlmJudge, LlmRefiner, RefinementContext};
use sitecraft_llm::{api_key_from_env, create_client, LlmClient, ProviderType};
use sitecraft_logging::{init_tracing, LogFormat, Logger, RunRecorder};

use crate::config::ProjectConfig;

#[derive(Parser, Debug)]
#[command(
    name = "sitecraft",
    about = "Judge-driven refinement for generated project websites",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also write diagnostics to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a page and refine it until it meets the threshold
    Refine(RefineArgs),
    /// Score a page once and print the evaluation
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct SubjectArgs {
    /// Subject name (default: [subject].name in sitecraft.toml)
    #[arg(long)]
    name: Option<String>,

    /// Subject description
    #[arg(long)]
    description: Option<String>,

    /// File holding the style system / design tokens
    #[arg(long)]
    style_file: Option<PathBuf>,

    /// Provider for both roles
    #[arg(long, value_enum)]
    provider: Option<ProviderChoice>,

    /// Model for both roles
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args, Debug)]
struct RefineArgs {
    /// HTML page to refine
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the best page (default: overwrite input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target overall score, 1-5
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum refinement passes, 1-10
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Log each loop step
    #[arg(short, long)]
    verbose: bool,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Record the run under the user data directory
    #[arg(long)]
    report: bool,

    /// Dry run: show what would happen without calling any provider
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    subject: SubjectArgs,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// HTML page to score
    #[arg(short, long)]
    input: PathBuf,

    /// Output the evaluation as JSON
    #[arg(long)]
    json_output: bool,

    #[command(flatten)]
    subject: SubjectArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Anthropic,
    Openai,
}

impl From<ProviderChoice> for ProviderType {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Anthropic => ProviderType::Anthropic,
            ProviderChoice::Openai => ProviderType::OpenAi,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Provider and model resolved for one role
struct RoleSelection {
    provider: ProviderType,
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let guard = init_tracing(&cli.log_level, log_format, cli.log_file.as_deref());

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let code = match cli.command {
        Command::Refine(args) => run_refine(args, &working_dir, &project, log_format).await?,
        Command::Evaluate(args) => {
            run_evaluate(args, &working_dir, &project).await?;
            0
        }
    };

    // Flush the file writer before exiting
    drop(guard);
    std::process::exit(code);
}

async fn run_refine(
    args: RefineArgs,
    working_dir: &Path,
    project: &ProjectConfig,
    log_format: LogFormat,
) -> Result<i32> {
    let input_path = resolve(working_dir, &args.input);
    let output_path = args
        .output
        .as_ref()
        .map(|p| resolve(working_dir, p))
        .unwrap_or_else(|| input_path.clone());

    let artifact = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let context = build_context(&args.subject, working_dir, project)?;

    let config = RefinementConfig::new(
        args.threshold
            .or(project.refinement.threshold)
            .unwrap_or(sitecraft_core::DEFAULT_THRESHOLD),
        args.max_iterations
            .or(project.refinement.max_iterations)
            .unwrap_or(sitecraft_core::DEFAULT_MAX_ITERATIONS),
    )
    .with_verbose(args.verbose)
    .validate()?;

    let judge_role = judge_selection(&args.subject, project)?;
    let refiner_role = refiner_selection(&args.subject, project)?;

    if args.dry_run {
        println!("=== Dry Run ===");
        println!("Input: {}", input_path.display());
        println!("Output: {}", output_path.display());
        println!("Subject: {}", context.subject_name);
        println!("Judge: {} ({})", judge_role.provider, model_label(&judge_role));
        println!(
            "Refiner: {} ({})",
            refiner_role.provider,
            model_label(&refiner_role)
        );
        println!("Threshold: {:.2}", config.threshold);
        println!("Max iterations: {}", config.max_iterations);
        return Ok(0);
    }

    let judge_client = build_client(&judge_role)?;
    let refiner_client = build_client(&refiner_role)?;
    let judge = LlmJudge::new(judge_client.as_ref());
    let refiner = LlmRefiner::new(refiner_client.as_ref());

    let logger = Arc::new(Logger::new(log_format));
    let mut runner = RefinementRunner::new(&judge, &refiner, logger);
    if args.report {
        let recorder = RunRecorder::new(&context.subject_name)
            .context("Failed to create run record")?;
        eprintln!("Recording run to {}", recorder.path().display());
        runner = runner.with_recorder(Arc::new(recorder));
    }

    let result = runner.refine(&artifact, &context, &config).await?;

    let wrote = result.artifact != artifact || output_path != input_path;
    if wrote {
        std::fs::write(&output_path, &result.artifact)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    }

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, wrote.then_some(output_path.as_path()));
    }

    Ok(result.exit_code())
}

async fn run_evaluate(args: EvaluateArgs, working_dir: &Path, project: &ProjectConfig) -> Result<()> {
    let input_path = resolve(working_dir, &args.input);
    let artifact = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;
    let context = build_context(&args.subject, working_dir, project)?;

    let role = judge_selection(&args.subject, project)?;
    let client = build_client(&role)?;
    let judge = LlmJudge::new(client.as_ref());

    let evaluation = judge
        .evaluate(&artifact, &context)
        .await
        .context("Evaluation failed")?;

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_evaluation(&evaluation);
    }
    Ok(())
}

fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Flags take priority over sitecraft.toml
fn build_context(
    subject: &SubjectArgs,
    working_dir: &Path,
    project: &ProjectConfig,
) -> Result<RefinementContext> {
    let name = subject
        .name
        .clone()
        .or_else(|| project.subject.name.clone())
        .or_else(|| {
            working_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let description = subject
        .description
        .clone()
        .or_else(|| project.subject.description.clone())
        .unwrap_or_default();

    let style = match &subject.style_file {
        Some(path) => {
            let path = resolve(working_dir, path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read style file {}", path.display()))?
        }
        None => project.subject.style.clone().unwrap_or_default(),
    };

    let mut context = RefinementContext::new(name, description).with_style(style);
    context.metadata = project.subject.metadata.clone();
    Ok(context)
}

fn judge_selection(subject: &SubjectArgs, project: &ProjectConfig) -> Result<RoleSelection> {
    role_selection(subject, project.judge_provider(), project.judge_model())
}

fn refiner_selection(subject: &SubjectArgs, project: &ProjectConfig) -> Result<RoleSelection> {
    role_selection(subject, project.refiner_provider(), project.refiner_model())
}

fn role_selection(
    subject: &SubjectArgs,
    file_provider: Option<&str>,
    file_model: Option<&str>,
) -> Result<RoleSelection> {
    let provider = match (subject.provider, file_provider) {
        (Some(choice), _) => choice.into(),
        (None, Some(name)) => name
            .parse::<ProviderType>()
            .map_err(|e| anyhow::anyhow!("Invalid provider in sitecraft.toml: {}", e))?,
        (None, None) => ProviderType::Anthropic,
    };
    let model = subject
        .model
        .clone()
        .or_else(|| file_model.map(String::from));
    Ok(RoleSelection { provider, model })
}

fn build_client(role: &RoleSelection) -> Result<Box<dyn LlmClient>> {
    let api_key = api_key_from_env(role.provider)?;
    let client = create_client(role.provider, api_key, role.model.as_deref())
        .with_context(|| format!("Failed to create {} client", role.provider))?;
    Ok(client)
}

fn model_label(role: &RoleSelection) -> &str {
    role.model
        .as_deref()
        .unwrap_or_else(|| role.provider.default_model())
}

fn print_evaluation(evaluation: &Evaluation) {
    eprintln!();
    eprintln!("Overall: {:.2}/5", evaluation.overall_score);
    for (criterion, assessment) in &evaluation.criteria {
        eprintln!(
            "  {:<15} {:.1}  {}",
            criterion.label(),
            assessment.score,
            assessment.reasoning.dimmed()
        );
    }
    eprintln!();
    eprintln!("{}", evaluation.reasoning);
    if !evaluation.suggestions.is_empty() {
        eprintln!();
        eprintln!("Suggestions:");
        for suggestion in &evaluation.suggestions {
            eprintln!("  - {}", suggestion);
        }
    }
}

fn print_result(result: &RefinementResult, written: Option<&Path>) {
    eprintln!();
    match result.stop_reason {
        StopReason::ThresholdMet if result.iterations == 0 => {
            eprintln!("{}", "=== ALREADY GOOD ===".bright_green());
        }
        StopReason::ThresholdMet => eprintln!("{}", "=== SUCCESS ===".bright_green()),
        StopReason::MaxIterationsReached => eprintln!("{}", "=== INCOMPLETE ===".bright_yellow()),
        StopReason::ConsecutiveFailures => eprintln!("{}", "=== GAVE UP ===".bright_red()),
    }
    eprintln!("Iterations: {}", result.iterations);
    eprintln!(
        "Score: {:.2} -> {:.2} ({:+.2})",
        result.initial_score(),
        result.final_score(),
        result.score_improvement
    );
    eprintln!("Duration: {:.1}s", result.total_duration_secs);
    match written {
        Some(path) => eprintln!("Wrote: {}", path.display()),
        None => eprintln!("Page unchanged"),
    }
}
