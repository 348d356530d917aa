use serde::{Deserialize, Serialize};

use crate::error::RefineError;

pub const MIN_THRESHOLD: f64 = 1.0;
pub const MAX_THRESHOLD: f64 = 5.0;
pub const MIN_ITERATIONS: usize = 1;
pub const MAX_ITERATIONS: usize = 10;

pub const DEFAULT_THRESHOLD: f64 = 4.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Settings for one refinement run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Target overall score in [1, 5]
    pub threshold: f64,
    /// Cap on refinement passes in [1, 10]
    pub max_iterations: usize,
    /// Emit loop events through the logger. No effect on control flow.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            verbose: false,
        }
    }
}

impl RefinementConfig {
    pub fn new(threshold: f64, max_iterations: usize) -> Self {
        Self {
            threshold,
            max_iterations,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check both numeric fields, returning the configuration unchanged
    pub fn validate(self) -> Result<Self, RefineError> {
        if self.threshold.is_nan() {
            return Err(RefineError::InvalidThreshold {
                value: self.threshold,
                violation: "not a number".to_string(),
            });
        }
        if self.threshold < MIN_THRESHOLD {
            return Err(RefineError::InvalidThreshold {
                value: self.threshold,
                violation: format!("below minimum {}", MIN_THRESHOLD),
            });
        }
        if self.threshold > MAX_THRESHOLD {
            return Err(RefineError::InvalidThreshold {
                value: self.threshold,
                violation: format!("above maximum {}", MAX_THRESHOLD),
            });
        }
        if self.max_iterations < MIN_ITERATIONS {
            return Err(RefineError::InvalidIterationCap {
                value: self.max_iterations,
                violation: format!("below minimum {}", MIN_ITERATIONS),
            });
        }
        if self.max_iterations > MAX_ITERATIONS {
            return Err(RefineError::InvalidIterationCap {
                value: self.max_iterations,
                violation: format!("above maximum {}", MAX_ITERATIONS),
            });
        }
        Ok(self)
    }
}
