use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use talkforge_av::Workspace;
use talkforge_common::{StageError, StageOutcome};

/// File name of the descriptor inside the workspace.
pub const DESCRIPTOR_FILE: &str = "request.json";

/// Input document read by the synthesis engine via `--input_json`.
///
/// Both media paths are absolute and point into the job's own workspace;
/// [`SynthesisDescriptor::new`] refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisDescriptor {
    /// Portrait image.
    pub image: PathBuf,
    /// Normalized 16 kHz mono WAV.
    pub audio: PathBuf,
    pub seed: u64,
}

impl SynthesisDescriptor {
    pub fn new(
        workspace: &Workspace,
        image: &Path,
        audio: &Path,
        seed: u64,
    ) -> StageOutcome<Self> {
        for (label, path) in [("image", image), ("audio", audio)] {
            if !workspace.contains(path) {
                return Err(StageError::synthesis(format!(
                    "{label} path {} is not inside the job workspace {}",
                    path.display(),
                    workspace.path().display()
                )));
            }
        }

        Ok(Self {
            image: image.to_path_buf(),
            audio: audio.to_path_buf(),
            seed,
        })
    }

    /// Serialize into `<workspace>/request.json`, returning its path.
    pub async fn write_to(&self, workspace: &Workspace) -> StageOutcome<PathBuf> {
        let path = workspace.file(DESCRIPTOR_FILE);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StageError::synthesis(format!("failed to encode descriptor: {e}")))?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            StageError::synthesis(format!("failed to write {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}
