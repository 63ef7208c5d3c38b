//! Audio normalization.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use talkforge_common::{StageError, StageOutcome};

use super::ToolOptions;
use crate::ToolCommand;

/// Sample rate the synthesis engine's audio encoder expects.
pub const NORMALIZED_SAMPLE_RATE: u32 = 16_000;

/// Build the ffmpeg arguments that convert `input` to 16 kHz mono PCM WAV.
pub fn normalize_args(input: &Path, output: &Path) -> Vec<OsString> {
    let rate = NORMALIZED_SAMPLE_RATE.to_string();
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    args.extend(
        [
            "-ar",
            rate.as_str(),
            "-ac",
            "1",
            "-c:a",
            "pcm_s16le",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Convert a fetched audio file of any format to the engine's canonical
/// WAV representation.
///
/// # Errors
///
/// Returns [`StageError::Transcode`] with the tail of ffmpeg's output if the
/// tool cannot be started, exits unsuccessfully, times out, or leaves no
/// output behind. Cancellation is reported as [`StageError::Cancelled`].
pub async fn normalize_audio(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    opts: &ToolOptions,
) -> StageOutcome<PathBuf> {
    #[cfg(feature = "tracing")]
    tracing::info!("Normalizing audio {:?} -> {:?}", input, output);

    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(normalize_args(input, output));
    opts.apply(&mut cmd);

    cmd.execute()
        .await
        .map_err(|e| e.into_stage_error(StageError::Transcode))?;

    if !output.is_file() {
        return Err(StageError::transcode(format!(
            "ffmpeg reported success but {} was not written",
            output.display()
        )));
    }

    Ok(output.to_path_buf())
}
