//! Video upscale.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use talkforge_common::{Resolution, StageError, StageOutcome};

use super::ToolOptions;
use crate::ToolCommand;

const VIDEO_CODEC: &str = "libx264";
const PRESET: &str = "medium";
const CRF: &str = "17";

/// Build the ffmpeg arguments for a lanczos upscale to `target`.
///
/// The audio stream is copied untouched.
pub fn upscale_args(input: &Path, output: &Path, target: Resolution) -> Vec<OsString> {
    let filter = format!("scale={}:{}:flags=lanczos", target.width, target.height);
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    args.extend(
        [
            "-vf",
            filter.as_str(),
            "-c:v",
            VIDEO_CODEC,
            "-preset",
            PRESET,
            "-crf",
            CRF,
            "-c:a",
            "copy",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Upscale `input` to `target`, writing `output`.
///
/// # Errors
///
/// Any failure is [`StageError::Enhance`]; the caller never falls back to the
/// source video.
pub async fn upscale(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    target: Resolution,
    opts: &ToolOptions,
) -> StageOutcome<PathBuf> {
    #[cfg(feature = "tracing")]
    tracing::info!("Upscaling {:?} to {}", input, target);

    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(upscale_args(input, output, target));
    opts.apply(&mut cmd);

    cmd.execute()
        .await
        .map_err(|e| e.into_stage_error(StageError::Enhance))?;

    if !output.is_file() {
        return Err(StageError::enhance(format!(
            "ffmpeg reported success but {} was not written",
            output.display()
        )));
    }

    Ok(output.to_path_buf())
}
