use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use talkforge_common::{StageError, StageOutcome};
use uuid::Uuid;

use super::Publisher;

/// Mount point of the published directory on the HTTP server.
pub const VIDEOS_ROUTE: &str = "/videos";

/// Copies videos into a directory the server exposes under [`VIDEOS_ROUTE`].
pub struct LocalPublisher {
    dir: PathBuf,
    base_url: String,
}

impl LocalPublisher {
    pub fn new(dir: &Path, base_url: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create publish directory: {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Publisher for LocalPublisher {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn publish(&self, path: &Path) -> StageOutcome<String> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "mp4".to_string());
        let name = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let target = self.dir.join(&name);

        tokio::fs::copy(path, &target).await.map_err(|e| {
            StageError::upload(format!(
                "copy {} -> {}: {e}",
                path.display(),
                target.display()
            ))
        })?;

        tracing::info!("Published {:?} as {:?}", path, target);
        Ok(format!("{}/{}", self.base_url, name))
    }
}
