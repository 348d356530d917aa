use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Represents each line type in the run JSONL file.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunLine {
    RunStart {
        timestamp: DateTime<Utc>,
        subject: String,
        judge: String,
        refiner: String,
        threshold: f64,
        max_iterations: usize,
    },
    Iteration {
        iteration: usize,
        score: Option<f64>,
        became_best: bool,
        error: Option<String>,
    },
    RunEnd {
        stop_reason: String,
        iterations: usize,
        initial_score: f64,
        final_score: f64,
        improved: bool,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Writes one refinement run as JSONL, by default under
/// `~/.local/share/sitecraft/runs/`.
pub struct RunRecorder {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl RunRecorder {
    /// Create a recorder in the default runs directory
    pub fn new(subject: &str) -> io::Result<Self> {
        Self::in_dir(&Self::runs_dir()?, subject)
    }

    /// Create a recorder in `dir`. The file name is the UTC start time plus a
    /// short hash of the subject.
    pub fn in_dir(dir: &Path, subject: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp_str = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(subject.as_bytes());
        let hash = hex::encode(hasher.finalize());

        let path = dir.join(format!("{}_{}.jsonl", timestamp_str, &hash[..6]));
        let file = File::create(&path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    /// Returns the path to the run file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_start(
        &self,
        subject: &str,
        judge: &str,
        refiner: &str,
        threshold: f64,
        max_iterations: usize,
    ) {
        self.write_line(&RunLine::RunStart {
            timestamp: Utc::now(),
            subject: subject.to_string(),
            judge: judge.to_string(),
            refiner: refiner.to_string(),
            threshold,
            max_iterations,
        });
    }

    /// Write an iteration line. Takes plain fields so this crate does not
    /// depend on sitecraft-core.
    pub fn write_iteration(
        &self,
        iteration: usize,
        score: Option<f64>,
        became_best: bool,
        error: Option<&str>,
    ) {
        self.write_line(&RunLine::Iteration {
            iteration,
            score,
            became_best,
            error: error.map(String::from),
        });
    }

    pub fn write_end(
        &self,
        stop_reason: &str,
        iterations: usize,
        initial_score: f64,
        final_score: f64,
        improved: bool,
        duration_secs: f64,
    ) {
        self.write_line(&RunLine::RunEnd {
            stop_reason: stop_reason.to_string(),
            iterations,
            initial_score,
            final_score,
            improved,
            duration_secs,
            timestamp: Utc::now(),
        });
    }

    fn write_line(&self, line: &RunLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn runs_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("sitecraft").join("runs"))
    }
}
