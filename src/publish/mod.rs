//! Result publication: deliver the final video somewhere retrievable.

mod file_host;
mod local;

pub use file_host::FileHostPublisher;
pub use local::{LocalPublisher, VIDEOS_ROUTE};

use crate::config::{PublishBackend, PublishConfig};
use anyhow::Result;
use std::path::Path;
use talkforge_common::StageOutcome;

/// A destination for finished videos.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Short backend name for logs and `/api/stats`.
    fn name(&self) -> &'static str;

    /// Publish the file at `path`, returning its public URL.
    async fn publish(&self, path: &Path) -> StageOutcome<String>;
}

/// Create the publisher selected by config.
///
/// `tail_bytes` bounds how much of a hosting endpoint's answer ends up in
/// error details.
pub fn create_publisher(config: &PublishConfig, tail_bytes: usize) -> Result<Box<dyn Publisher>> {
    match config.backend {
        PublishBackend::FileHost => Ok(Box::new(FileHostPublisher::new(config, tail_bytes))),
        PublishBackend::Local => {
            let dir = config.local_dir.as_deref().ok_or_else(|| {
                anyhow::anyhow!("publish.backend = \"local\" requires publish.local_dir")
            })?;
            Ok(Box::new(LocalPublisher::new(dir, &config.public_base_url)?))
        }
    }
}
