//! Error types for repack operations.
//!
//! This module defines all error types with actionable error messages. Every
//! failure in the pipeline is fatal and user-visible; there is no partial
//! recovery once a step has failed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repack operations
pub type Result<T> = std::result::Result<T, RepackError>;

/// Main error type for all repack operations
#[derive(Error, Debug)]
pub enum RepackError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// External tool errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (package.json) serialization errors
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest file missing or not a JSON object
    #[error("Invalid manifest at {path}: {reason}")]
    InvalidManifest {
        /// Manifest location
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Dependency range string contains no resolvable numeric version
    #[error(
        "No resolvable version for dependency `{name}` (declared range: {range:?}). \
         The native rebuild needs an exact version to install against."
    )]
    MissingDependencyVersion {
        /// Dependency name as declared in the manifest
        name: String,
        /// Raw range string, or None when the dependency is not declared at all
        range: Option<String>,
    },

    /// Expected file not found in the extracted application
    #[error("Expected file not found: {path} ({context})")]
    MissingFile {
        /// Path that was probed
        path: PathBuf,
        /// What the file was needed for
        context: String,
    },

    /// Ambiguous auto-detection result
    #[error("Multiple app.asar files found; pass --asar to choose one: {candidates:?}")]
    AmbiguousAsar {
        /// All candidate paths discovered
        candidates: Vec<PathBuf>,
    },

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

/// External tool invocation errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// Required tool is not installed / not in PATH
    #[error("`{tool}` not found in PATH. {hint}")]
    NotFound {
        /// Tool binary name
        tool: String,
        /// Installation hint shown to the user
        hint: String,
    },

    /// Tool ran but exited non-zero
    #[error("Command failed ({code:?}): {command}\n{output}")]
    ExecutionFailed {
        /// Full command line that failed
        command: String,
        /// Exit code, if any
        code: Option<i32>,
        /// Combined stdout/stderr captured from the tool
        output: String,
    },
}

impl RepackError {
    /// File not found with context, for probe-style checks.
    pub fn missing_file(path: impl Into<PathBuf>, context: impl Into<String>) -> Self {
        Self::MissingFile {
            path: path.into(),
            context: context.into(),
        }
    }
}
