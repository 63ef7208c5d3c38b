//! The render pipeline: request validation and the job orchestrator.

mod orchestrator;
mod request;

pub use orchestrator::JobOrchestrator;
pub use request::{JobResponse, RenderInput, RenderRequest, RequestError};

use crate::state::{JobResult, JobState};
use std::path::Path;
use talkforge_common::JobId;

/// Receives every state change of a job from the orchestrator.
pub trait StageReporter: Send + Sync {
    fn workspace_acquired(&self, id: &JobId, path: &Path);

    fn transition(&self, id: &JobId, state: JobState);

    fn finished(&self, id: &JobId, result: &JobResult);
}
