//! Discovery of the video an external engine wrote into a workspace.
//!
//! The engine only loosely follows its `--save_file` prefix (suffixes and
//! numbering vary between versions), so discovery is two-tier: files with the
//! expected prefix first, then any video file.

use std::path::{Path, PathBuf};
use talkforge_common::paths::is_video_file;
use talkforge_common::{StageError, StageOutcome};
use walkdir::WalkDir;

/// Resolve the authoritative output video in `dir`.
///
/// Only the top level of the workspace is searched. Candidates are visited
/// in file-name order so the choice is deterministic.
///
/// # Errors
///
/// Returns [`StageError::ArtifactNotFound`] when the directory holds no video
/// file or cannot be read.
pub fn locate_artifact(dir: &Path, prefix: &str) -> StageOutcome<PathBuf> {
    let videos = video_files(dir)?;

    let primary = videos.iter().find(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().starts_with(prefix))
            .unwrap_or(false)
    });
    if let Some(found) = primary {
        #[cfg(feature = "tracing")]
        tracing::debug!("Located artifact {:?} by prefix '{}'", found, prefix);
        return Ok(found.clone());
    }

    match videos.into_iter().next() {
        Some(fallback) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "No video matching prefix '{}' in {:?}; falling back to {:?}",
                prefix,
                dir,
                fallback
            );
            Ok(fallback)
        }
        None => Err(StageError::artifact_not_found(format!(
            "no video file in {}",
            dir.display()
        ))),
    }
}

fn video_files(dir: &Path) -> StageOutcome<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            StageError::artifact_not_found(format!("cannot read {}: {e}", dir.display()))
        })?;
        if entry.file_type().is_file() && is_video_file(entry.path()) {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}
