//! Error types for tikiblocks.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Top-level error type. Anything that reaches it is fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory (set XDG_CONFIG_HOME or HOME)")]
    NoConfigDir,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failure of a single command activation. Local to one block.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` produced non UTF-8 output")]
    InvalidOutput { command: String },
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => format!(": {line}"),
        None => String::new(),
    }
}

/// Malformed timer duration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Improper time format {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },
}

/// Sink setup and write errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Failed to write to sink {name}: {reason}")]
    Write { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signal handler installation errors.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Failed to install handler for signal {signo}: {source}")]
    Install {
        signo: i32,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tikiblocks.
pub type Result<T> = std::result::Result<T, Error>;
