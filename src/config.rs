//! Runtime configuration for the vanity key search.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::matcher::SearchCondition;

/// OpenSSH ed25519 Vanity Key Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Regular expression matched against the base64 public key blob
    pub condition: String,

    /// Comment for the key (default: <user>@<host>)
    #[arg(short, long)]
    pub comment: Option<String>,

    /// Stop after finding N key pairs
    #[arg(short, long, default_value = "1")]
    pub limited: usize,

    /// Search until interrupted with Ctrl+C
    #[arg(short, long, default_value = "false")]
    pub unlimited: bool,

    /// Number of worker threads (0 = number of CPU cores)
    #[arg(short, long, default_value = "1")]
    pub parallel: usize,

    /// Directory the key files are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Capacity of the worker report channel
    #[arg(long, default_value = "64")]
    pub report_capacity: usize,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        match self.parallel {
            0 => num_cpus::get(),
            n => n,
        }
    }

    /// Returns the key comment, falling back to `<user>@<host>`.
    pub fn comment(&self) -> String {
        self.comment.clone().unwrap_or_else(default_comment)
    }

    /// Validates the flags and builds the immutable search configuration.
    pub fn search_config(&self) -> Result<SearchConfig, ConfigError> {
        let condition = SearchCondition::new(&self.condition)?;

        if self.limited == 0 && !self.unlimited {
            return Err(ConfigError::ZeroQuota);
        }

        if self.report_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        if !self.output_dir.is_dir() {
            return Err(ConfigError::OutputDir(self.output_dir.clone()));
        }

        Ok(SearchConfig {
            condition: Arc::new(condition),
            comment: self.comment(),
            quota: self.limited.max(1),
            unlimited: self.unlimited,
            workers: self.worker_count(),
            report_capacity: self.report_capacity,
            output_dir: self.output_dir.clone(),
        })
    }
}

/// Validated settings for one search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Compiled condition shared by all workers
    pub condition: Arc<SearchCondition>,
    /// Comment stored in both key files
    pub comment: String,
    /// Number of matches to find; also the result channel capacity
    pub quota: usize,
    /// Ignore the quota and search until interrupted
    pub unlimited: bool,
    /// Number of search workers
    pub workers: usize,
    /// Capacity of the report channel
    pub report_capacity: usize,
    /// Directory for the key files
    pub output_dir: PathBuf,
}

impl SearchConfig {
    /// Creates a limited search with defaults for everything but the condition.
    pub fn new(condition: SearchCondition) -> Self {
        Self {
            condition: Arc::new(condition),
            comment: default_comment(),
            quota: 1,
            unlimited: false,
            workers: 1,
            report_capacity: 64,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Returns `<user>@<host>` for the current process.
pub fn default_comment() -> String {
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "user".into());
    let host = env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "localhost".into());
    format!("{}@{}", user, host)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid condition: {0}")]
    InvalidCondition(#[from] regex::Error),
    #[error("--limited must be at least 1 unless --unlimited is set")]
    ZeroQuota,
    #[error("--report-capacity must be at least 1")]
    ZeroCapacity,
    #[error("Output directory {} does not exist", .0.display())]
    OutputDir(PathBuf),
}
