//! Error types for talkforge-av.

use std::time::Duration;
use talkforge_common::StageError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running external tools or managing workspaces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool could not be started or waited on.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An external tool ran and exited unsuccessfully.
    #[error("{tool} exited with {status}: {tail}")]
    ExitFailure {
        tool: String,
        status: String,
        tail: String,
    },

    /// An external tool exceeded its time budget and was killed.
    #[error("{tool} timed out after {timeout:?}: {tail}")]
    TimedOut {
        tool: String,
        timeout: Duration,
        tail: String,
    },

    /// Execution was cancelled and the tool was killed.
    #[error("{tool} cancelled")]
    Cancelled { tool: String },

    /// Workspace error.
    #[error("workspace error: {0}")]
    Workspace(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convert into the stage error of the calling stage.
    ///
    /// Cancellation keeps its own kind; everything else becomes `make`'s
    /// variant with this error's message as detail.
    pub fn into_stage_error(self, make: fn(String) -> StageError) -> StageError {
        match self {
            Self::Cancelled { .. } => StageError::Cancelled,
            other => make(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_failure_message_contains_tail() {
        let err = Error::ExitFailure {
            tool: "ffmpeg".into(),
            status: "exit status: 1".into(),
            tail: "Invalid data found when processing input".into(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg exited with exit status: 1: Invalid data found when processing input"
        );
    }

    #[test]
    fn test_into_stage_error_maps_kind() {
        let err = Error::tool_failed("ffmpeg", "failed to spawn");
        let stage = err.into_stage_error(StageError::Transcode);
        assert_eq!(stage.kind(), "TranscodeError");
        assert!(stage.to_string().contains("failed to spawn"));
    }

    #[test]
    fn test_into_stage_error_keeps_cancellation() {
        let err = Error::Cancelled {
            tool: "python".into(),
        };
        assert_eq!(
            err.into_stage_error(StageError::Synthesis),
            StageError::Cancelled
        );
    }
}
