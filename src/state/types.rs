use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use talkforge_common::{JobId, QualityTier, Stage, StageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tier: QualityTier,
    pub workspace: Option<PathBuf>,
    pub state: JobState,
    pub result: Option<JobResult>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a render job.
///
/// `Done` and `Failed` are absorbing: once reached, no transition leaves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobState {
    Created,
    Fetching,
    Normalizing,
    Synthesizing,
    Locating,
    Enhancing,
    Publishing,
    Done,
    Failed { stage: Stage, detail: String },
}

impl JobState {
    /// State a job is in while `stage` runs.
    pub fn running(stage: Stage) -> Self {
        match stage {
            Stage::Workspace => Self::Created,
            Stage::Fetch => Self::Fetching,
            Stage::Normalize => Self::Normalizing,
            Stage::Synthesize => Self::Synthesizing,
            Stage::Locate => Self::Locating,
            Stage::Enhance => Self::Enhancing,
            Stage::Publish => Self::Publishing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Position in the pipeline order; `None` for terminal states.
    fn position(&self) -> Option<u8> {
        match self {
            Self::Created => Some(0),
            Self::Fetching => Some(1),
            Self::Normalizing => Some(2),
            Self::Synthesizing => Some(3),
            Self::Locating => Some(4),
            Self::Enhancing => Some(5),
            Self::Publishing => Some(6),
            Self::Done | Self::Failed { .. } => None,
        }
    }

    /// Coarse status as reported by `/status`: running, done or error.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed { .. } => "error",
            _ => "running",
        }
    }
}

/// Final outcome of a job, written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobResult {
    Done {
        video_url: String,
    },
    Failed {
        stage: Stage,
        kind: String,
        message: String,
    },
}

impl JobResult {
    pub fn done(video_url: impl Into<String>) -> Self {
        Self::Done {
            video_url: video_url.into(),
        }
    }

    /// Failure of `stage`; the message reads `"<stage>: <error>"`.
    pub fn failed(stage: Stage, error: &StageError) -> Self {
        Self::Failed {
            stage,
            kind: error.kind().to_string(),
            message: format!("{stage}: {error}"),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            Self::Done { video_url } => Some(video_url),
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Done { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }
}

impl Job {
    pub fn new(id: JobId, tier: QualityTier) -> Self {
        Self {
            id,
            tier,
            workspace: None,
            state: JobState::Created,
            result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Move forward to a later non-terminal state.
    ///
    /// Returns false, leaving the job untouched, if the job already finished,
    /// `next` is terminal, or `next` does not come after the current state.
    /// Stages may be skipped.
    pub fn advance(&mut self, next: JobState) -> bool {
        match (self.state.position(), next.position()) {
            (Some(current), Some(target)) if target > current => {
                self.state = next;
                true
            }
            _ => false,
        }
    }

    /// Record the final result. Returns false, leaving the job untouched, if a
    /// result was already recorded.
    pub fn finish(&mut self, result: JobResult) -> bool {
        if self.result.is_some() || self.state.is_terminal() {
            return false;
        }
        self.state = match &result {
            JobResult::Done { .. } => JobState::Done,
            JobResult::Failed { stage, message, .. } => JobState::Failed {
                stage: *stage,
                detail: message.clone(),
            },
        };
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.created_at).num_milliseconds() as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobStats {
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub failures_by_stage: HashMap<Stage, u64>,
}

impl JobStats {
    pub fn success_rate(&self) -> f32 {
        if self.total_processed == 0 {
            return 0.0;
        }
        (self.successful as f32 / self.total_processed as f32) * 100.0
    }

    pub fn record(&mut self, result: &JobResult) {
        self.total_processed += 1;
        match result {
            JobResult::Done { .. } => self.successful += 1,
            JobResult::Failed { stage, kind, .. } => {
                if kind == "Cancelled" {
                    self.cancelled += 1;
                } else {
                    self.failed += 1;
                    *self.failures_by_stage.entry(*stage).or_insert(0) += 1;
                }
            }
        }
    }
}
