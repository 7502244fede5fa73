//! Error types for build pipeline operations

use crate::core::state::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required setting was left empty
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A path was rejected by the active path policy
    #[error("Invalid {field} path (only ASCII characters are allowed): {}", .path.display())]
    InvalidPath { field: String, path: PathBuf },

    #[error("Project file not found: {}", .0.display())]
    ProjectFileNotFound(PathBuf),

    #[error("Failed to read project file {}: {source}", .path.display())]
    ProjectRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tool executable did not resolve to an existing file
    #[error("Required tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("Executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("QML directory not found: {}", .0.display())]
    QmlDirectoryNotFound(PathBuf),

    /// One of the three main stages exited with a non-zero code
    #[error("{} failed with exit code {code}", .stage.label())]
    StageFailed { stage: Stage, code: i32 },

    #[error("Process exited abnormally, code: {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    AbnormalExit { code: Option<i32> },

    #[error("Failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {} to {}: {error}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was aborted
    #[error("Background task failed: {0}")]
    Join(String),

    #[error("Build stopped by user")]
    Cancelled,
}

impl PipelineError {
    /// Whether this error represents a user-initiated stop rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Join(err.to_string())
    }
}
