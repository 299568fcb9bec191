//! Solver settings, loadable from YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Relative optimality gap at which the search may stop.
    #[serde(default = "default_mip_gap")]
    pub mip_gap: f64,
    /// Wall-clock budget for the search, in seconds.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u64,
    /// Search threads. Left to the solver when unset.
    #[serde(default)]
    pub threads: Option<u32>,
    /// Let the solver print its own progress log.
    #[serde(default)]
    pub solver_log: bool,
}

fn default_mip_gap() -> f64 {
    0.005
}

fn default_time_limit_secs() -> u64 {
    300
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mip_gap: default_mip_gap(),
            time_limit_secs: default_time_limit_secs(),
            threads: None,
            solver_log: false,
        }
    }
}

impl SolverConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let buf = std::fs::read_to_string(path)?;
        Self::from_yaml(&buf)
    }

    pub fn from_yaml(buf: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_yaml::from_str(buf)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mip_gap.is_finite() || self.mip_gap < 0.0 {
            return Err(ConfigError::Validation(format!(
                "mip_gap must be a non-negative number, got {}",
                self.mip_gap
            )));
        }
        if self.time_limit_secs == 0 {
            return Err(ConfigError::Validation(
                "time_limit_secs must be positive".into(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Validation("threads must be at least 1".into()));
        }
        Ok(())
    }
}
