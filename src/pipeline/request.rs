use serde::{Deserialize, Serialize};
use std::str::FromStr;
use talkforge_common::{JobId, QualityTier};

use crate::fetch::is_fetchable_url;
use crate::state::JobResult;

/// Body of `POST /render`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderRequest {
    pub image_url: String,
    pub audio_url: String,
    #[serde(default)]
    pub quality: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInput {
    pub image_url: String,
    pub audio_url: String,
    pub tier: QualityTier,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("{field} must be an absolute http(s) URL, got {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("unknown quality {0:?}; expected one of low, standard, high (or 480p, 720p, 1080p)")]
    UnknownQuality(String),
}

impl RenderRequest {
    pub fn validate(&self) -> Result<RenderInput, RequestError> {
        for (field, value) in [("image_url", &self.image_url), ("audio_url", &self.audio_url)] {
            if !is_fetchable_url(value.trim()) {
                return Err(RequestError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }

        let tier = match self.quality.as_deref().map(str::trim) {
            None | Some("") => QualityTier::default(),
            Some(q) => {
                QualityTier::from_str(q).map_err(|_| RequestError::UnknownQuality(q.to_string()))?
            }
        };

        Ok(RenderInput {
            image_url: self.image_url.trim().to_string(),
            audio_url: self.audio_url.trim().to_string(),
            tier,
        })
    }
}

/// External result contract of a render.
///
/// `video_url` is present iff `status` is `"done"`, `error` iff it is `"error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResponse {
    pub fn from_result(job_id: &JobId, result: &JobResult) -> Self {
        match result {
            JobResult::Done { video_url } => Self {
                job_id: job_id.to_string(),
                status: "done".to_string(),
                video_url: Some(video_url.clone()),
                error: None,
            },
            JobResult::Failed { message, .. } => Self::error(job_id, message.clone()),
        }
    }

    pub fn error(job_id: &JobId, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: "error".to_string(),
            video_url: None,
            error: Some(message.into()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == "done"
    }
}
