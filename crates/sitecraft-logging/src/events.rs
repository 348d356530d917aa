use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the refinement loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RefinementStarted {
        subject: String,
        threshold: f64,
        max_iterations: usize,
    },
    InitialEvaluation {
        score: f64,
        summary: String,
    },
    ThresholdAlreadyMet {
        score: f64,
        threshold: f64,
    },
    IterationStarted {
        iteration: usize,
        current_score: f64,
        focus: Vec<String>,
    },
    IterationCompleted {
        iteration: usize,
        score: f64,
        best_score: f64,
    },
    NewBest {
        iteration: usize,
        previous: f64,
        score: f64,
    },
    IterationFailed {
        iteration: usize,
        consecutive_failures: usize,
        error: String,
    },
    ThresholdMet {
        iteration: usize,
        score: f64,
    },
    EarlyTermination {
        iteration: usize,
        consecutive_failures: usize,
        best_score: f64,
    },
    MaxIterationsReached {
        iterations: usize,
        best_score: f64,
    },
    RefinementCompleted {
        iterations: usize,
        initial_score: f64,
        final_score: f64,
        improved: bool,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

/// Logger for refinement events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Create a logger that only appends JSON lines to a file
    pub fn file_only(log_path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            format: LogFormat::Json,
            console: false,
            file_writer: Some(Mutex::new(open_append(log_path)?)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RefinementStarted {
                subject,
                threshold,
                max_iterations,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "sitecraft".bold().bright_white(),
                    " ".repeat(58) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Subject:".dimmed(),
                    Self::truncate_with_padding(subject, 57, 67).dimmed()
                );
                let target = format!("threshold {:.2}, up to {} passes", threshold, max_iterations);
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Target:".dimmed(),
                    Self::truncate_with_padding(&target, 58, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::InitialEvaluation { summary, .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold(),
                    summary
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ThresholdAlreadyMet { score, threshold } => {
                let _ = writeln!(
                    stderr,
                    "  {} Initial score {:.2} meets threshold {:.2}, nothing to refine",
                    "✓".bright_green(),
                    score,
                    threshold
                );
            }
            LogEvent::IterationStarted {
                iteration,
                current_score,
                focus,
            } => {
                let iter_text = format!("─ Pass {} ", iteration);
                let padding = "─".repeat(67 - iter_text.chars().count());
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "  {} {} from {:.2}, focus: {}",
                    "▶".bright_cyan(),
                    "REFINER".bright_cyan().bold(),
                    current_score,
                    focus.join(", ")
                );
            }
            LogEvent::IterationCompleted {
                score, best_score, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {:.2} (best {:.2})",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold(),
                    score,
                    best_score
                );
            }
            LogEvent::NewBest { previous, score, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} New best: {:.2} → {:.2}",
                    "★".bright_yellow(),
                    previous,
                    score
                );
            }
            LogEvent::IterationFailed {
                iteration,
                consecutive_failures,
                error,
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Pass {} failed ({} in a row): {}",
                    "✗".bright_red(),
                    iteration,
                    consecutive_failures,
                    error.bright_red()
                );
            }
            LogEvent::ThresholdMet { score, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Threshold met at {:.2}",
                    "✓".bright_green(),
                    score
                );
            }
            LogEvent::EarlyTermination {
                consecutive_failures,
                best_score,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Stopping after {} consecutive failures, keeping best ({:.2})",
                    "⚠".bright_yellow(),
                    consecutive_failures,
                    best_score
                );
            }
            LogEvent::MaxIterationsReached {
                iterations,
                best_score,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Maximum passes reached ({}), best score {:.2}",
                    "⚠".bright_yellow(),
                    iterations,
                    best_score
                );
            }
            LogEvent::RefinementCompleted { .. } => {
                // Summary is printed by the binary
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RefinementStarted {
                threshold,
                max_iterations,
                ..
            } => format!(
                "[{}] refine:start threshold={:.2} max={}",
                timestamp, threshold, max_iterations
            ),
            LogEvent::InitialEvaluation { score, .. } => {
                format!("[{}] judge:initial {:.2}", timestamp, score)
            }
            LogEvent::ThresholdAlreadyMet { score, .. } => {
                format!("[{}] refine:skip {:.2}", timestamp, score)
            }
            LogEvent::IterationStarted { iteration, .. } => {
                format!("[{}] refine:start:{}", timestamp, iteration)
            }
            LogEvent::IterationCompleted {
                iteration,
                score,
                best_score,
            } => format!(
                "[{}] judge:{} {:.2} best={:.2}",
                timestamp, iteration, score, best_score
            ),
            LogEvent::NewBest {
                iteration, score, ..
            } => format!("[{}] best:{} {:.2}", timestamp, iteration, score),
            LogEvent::IterationFailed {
                iteration, error, ..
            } => format!("[{}] error:{}:{}", timestamp, iteration, error),
            LogEvent::ThresholdMet { iteration, score } => {
                format!("[{}] refine:met:{} {:.2}", timestamp, iteration, score)
            }
            LogEvent::EarlyTermination { iteration, .. } => {
                format!("[{}] refine:abort:{}", timestamp, iteration)
            }
            LogEvent::MaxIterationsReached { iterations, .. } => {
                format!("[{}] refine:limit:{}", timestamp, iterations)
            }
            LogEvent::RefinementCompleted {
                iterations,
                final_score,
                duration_secs,
                ..
            } => format!(
                "[{}] refine:done:{} {:.2} {:.1}s",
                timestamp, iterations, final_score, duration_secs
            ),
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

fn open_append(log_path: &Path) -> std::io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
}
