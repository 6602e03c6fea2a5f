//! Error types for Stagecraft
//!
//! The solver reports graph problems through [`SolveError`]; everything else
//! returns `StagecraftResult<T>`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Stagecraft operations
pub type StagecraftResult<T> = Result<T, StagecraftError>;

/// Failures detected while resolving a stage graph into a manifest.
///
/// Any of these aborts the solve call; no partial manifest is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Dependency cycle detected at stage {stage}")]
    Cycle { stage: String },

    #[error("Stage name {name} is assigned to two different stage definitions")]
    NameCollision { name: String },
}

/// All errors that can occur in Stagecraft
#[derive(Error, Debug)]
pub enum StagecraftError {
    // Graph errors
    #[error(transparent)]
    Solve(#[from] SolveError),

    // Plan errors
    #[error("Build file not found: {0}")]
    PlanNotFound(PathBuf),

    #[error("Invalid build file {path}: {reason}")]
    PlanInvalid { path: PathBuf, reason: String },

    #[error("Unknown stage `{name}` referenced by `{referenced_by}`")]
    UnknownStage { name: String, referenced_by: String },

    #[error("Stage `{0}` refers to itself through its base or artifacts")]
    CircularStage(String),

    #[error("Target `{target}` not found in {file}")]
    TargetNotFound { target: String, file: PathBuf },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Engine errors
    #[error("Build engine not found: {0}")]
    EngineNotFound(String),

    #[error("Build failed for {target}:\n{output}")]
    BuildFailed { target: String, output: String },

    #[error("Push failed for {tag}: {reason}")]
    PushFailed { tag: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl StagecraftError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PlanNotFound(_) => Some("Pass the build file explicitly: stagecraft ls <FILE>"),
            Self::TargetNotFound { .. } => Some("Run: stagecraft ls to list the available targets"),
            Self::EngineNotFound(_) => {
                Some("Install Docker with buildx, or set [engine] kind in stagecraft.toml")
            }
            Self::Solve(SolveError::NameCollision { .. }) => {
                Some("Derive each stage from its own from_base call instead of reusing a prefix")
            }
            _ => None,
        }
    }
}
