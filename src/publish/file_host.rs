use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use talkforge_common::{truncate_tail, StageError, StageOutcome};
use tokio_util::io::ReaderStream;

use super::Publisher;
use crate::config::PublishConfig;

/// Uploads to an anonymous file host (file.io style): one multipart POST,
/// public URL read from a JSON field of the answer.
pub struct FileHostPublisher {
    client: Client,
    endpoint: String,
    form_field: String,
    link_field: String,
    /// Bound for the response-body excerpt carried by error details.
    tail_bytes: usize,
}

impl FileHostPublisher {
    pub fn new(config: &PublishConfig, tail_bytes: usize) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            endpoint: config.endpoint.clone(),
            form_field: config.form_field.clone(),
            link_field: config.link_field.clone(),
            tail_bytes,
        }
    }

    fn excerpt<'a>(&self, body: &'a str) -> &'a str {
        truncate_tail(body, self.tail_bytes)
    }

    async fn file_part(path: &Path) -> StageOutcome<Part> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| StageError::upload(format!("cannot open {}: {e}", path.display())))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| StageError::upload(format!("cannot stat {}: {e}", path.display())))?
            .len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());

        Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(|e| StageError::upload(format!("invalid content type: {e}")))
    }

    fn extract_link(&self, body: &[u8]) -> StageOutcome<String> {
        let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
            StageError::response_parse(format!(
                "body is not JSON ({e}): {}",
                self.excerpt(&String::from_utf8_lossy(body))
            ))
        })?;

        match value.get(&self.link_field) {
            Some(serde_json::Value::String(link)) if !link.is_empty() => Ok(link.clone()),
            _ => Err(StageError::response_parse(format!(
                "missing '{}' in {}",
                self.link_field,
                self.excerpt(&value.to_string())
            ))),
        }
    }
}

#[async_trait::async_trait]
impl Publisher for FileHostPublisher {
    fn name(&self) -> &'static str {
        "file_host"
    }

    async fn publish(&self, path: &Path) -> StageOutcome<String> {
        let form = Form::new().part(self.form_field.clone(), Self::file_part(path).await?);

        tracing::info!("Uploading {:?} to {}", path, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StageError::upload(format!("POST {}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StageError::upload(format!("POST {}: body: {e}", self.endpoint)))?;

        if !status.is_success() {
            return Err(StageError::upload(format!(
                "POST {}: HTTP {status}: {}",
                self.endpoint,
                self.excerpt(&String::from_utf8_lossy(&body))
            )));
        }

        let link = self.extract_link(&body)?;
        tracing::info!("Published {:?} as {}", path, link);
        Ok(link)
    }
}
