//! Stage error taxonomy shared by every pipeline stage.
//!
//! Each stage returns a [`StageOutcome`]. The orchestrator tags a failure with
//! the [`Stage`] that produced it and turns it into the external error
//! response; stages never see each other's errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default bound for diagnostic excerpts captured from external processes.
pub const DEFAULT_TAIL_BYTES: usize = 4000;

/// Hard upper bound for any detail string carried by a [`StageError`].
pub const MAX_DETAIL_BYTES: usize = 16 * 1024;

/// Result type returned by every pipeline stage.
pub type StageOutcome<T> = std::result::Result<T, StageError>;

/// Pipeline stage identifiers, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Scratch directory allocation.
    Workspace,
    /// Downloading the image and audio inputs.
    Fetch,
    /// Converting the audio to the engine's canonical format.
    Normalize,
    /// Running the external synthesis engine.
    Synthesize,
    /// Finding the engine's output file.
    Locate,
    /// Optional upscale of the rendered video.
    Enhance,
    /// Uploading the final artifact.
    Publish,
}

impl Stage {
    /// Stable lowercase tag used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Fetch => "fetch",
            Self::Normalize => "normalize",
            Self::Synthesize => "synthesize",
            Self::Locate => "locate",
            Self::Enhance => "enhance",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Network failure, timeout, or non-success HTTP status while fetching.
    #[error("transport error: {0}")]
    Transport(String),

    /// A destination file or directory could not be created or written.
    #[error("write error: {0}")]
    Write(String),

    /// The transcoding tool exited unsuccessfully.
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// The synthesis engine exited unsuccessfully.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// No output video could be found in the workspace.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The upscale filter exited unsuccessfully.
    #[error("enhance failed: {0}")]
    Enhance(String),

    /// The artifact could not be delivered to the hosting endpoint.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The hosting endpoint answered without the expected link field.
    #[error("unexpected upload response: {0}")]
    ResponseParse(String),

    /// The caller went away or the server is shutting down.
    #[error("cancelled")]
    Cancelled,
}

impl StageError {
    /// Create a transport error.
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(bounded(detail))
    }

    /// Create a write error.
    pub fn write(detail: impl Into<String>) -> Self {
        Self::Write(bounded(detail))
    }

    /// Create a transcode error.
    pub fn transcode(detail: impl Into<String>) -> Self {
        Self::Transcode(bounded(detail))
    }

    /// Create a synthesis error.
    pub fn synthesis(detail: impl Into<String>) -> Self {
        Self::Synthesis(bounded(detail))
    }

    /// Create an artifact-not-found error.
    pub fn artifact_not_found(detail: impl Into<String>) -> Self {
        Self::ArtifactNotFound(bounded(detail))
    }

    /// Create an enhance error.
    pub fn enhance(detail: impl Into<String>) -> Self {
        Self::Enhance(bounded(detail))
    }

    /// Create an upload error.
    pub fn upload(detail: impl Into<String>) -> Self {
        Self::Upload(bounded(detail))
    }

    /// Create a response parse error.
    pub fn response_parse(detail: impl Into<String>) -> Self {
        Self::ResponseParse(bounded(detail))
    }

    /// Name of the error kind, as used in job records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TransportError",
            Self::Write(_) => "WriteError",
            Self::Transcode(_) => "TranscodeError",
            Self::Synthesis(_) => "SynthesisError",
            Self::ArtifactNotFound(_) => "ArtifactNotFoundError",
            Self::Enhance(_) => "EnhanceError",
            Self::Upload(_) => "UploadError",
            Self::ResponseParse(_) => "ResponseParseError",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether this error was caused by cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn bounded(detail: impl Into<String>) -> String {
    let detail = detail.into();
    if detail.len() <= MAX_DETAIL_BYTES {
        detail
    } else {
        truncate_tail(&detail, MAX_DETAIL_BYTES).to_string()
    }
}

/// Keep at most `max_bytes` from the end of `text`, on a UTF-8 boundary.
///
/// External tools print their actual error last, so the tail is the part
/// worth keeping.
pub fn truncate_tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
