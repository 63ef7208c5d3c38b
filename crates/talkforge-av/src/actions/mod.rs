//! ffmpeg-backed media stages.
//!
//! This module provides the two transcoding steps of a render job:
//! - Audio normalization to the engine's canonical WAV format
//! - Lanczos upscale of the rendered video

mod audio;
mod upscale;

pub use audio::{normalize_args, normalize_audio, NORMALIZED_SAMPLE_RATE};
pub use upscale::{upscale, upscale_args};

use std::time::Duration;
use talkforge_common::DEFAULT_TAIL_BYTES;
use tokio_util::sync::CancellationToken;

use crate::ToolCommand;

/// Execution limits shared by the ffmpeg stages.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    /// Maximum run time before the tool is killed.
    pub timeout: Duration,
    /// Bytes of trailing output kept for error messages.
    pub tail_bytes: usize,
    /// Token that aborts the tool when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            tail_bytes: DEFAULT_TAIL_BYTES,
            cancel: None,
        }
    }
}

impl ToolOptions {
    pub(crate) fn apply(&self, cmd: &mut ToolCommand) {
        cmd.timeout(self.timeout).tail_bytes(self.tail_bytes);
        if let Some(token) = &self.cancel {
            cmd.cancel_on(token.clone());
        }
    }
}
