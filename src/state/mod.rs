mod types;

pub use types::*;

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use talkforge_common::{JobId, QualityTier};

use crate::pipeline::StageReporter;

pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// In-memory registry of running and recently finished jobs.
///
/// Nothing here is persisted; a restart starts with an empty registry.
pub struct AppState {
    jobs: RwLock<HashMap<JobId, Job>>,
    history: RwLock<VecDeque<Job>>,
    stats: RwLock<JobStats>,
    max_history: usize,
}

impl AppState {
    pub fn new(max_history: usize) -> Arc<Self> {
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            stats: RwLock::new(JobStats::default()),
            max_history,
        })
    }

    /// Register a new job in the `Created` state.
    pub fn create_job(&self, tier: QualityTier) -> Job {
        let job = Job::new(JobId::new(), tier);
        self.jobs.write().insert(job.id, job.clone());
        tracing::debug!("Registered job {} ({})", job.id, tier);
        job
    }

    fn add_to_history(&self, job: Job) {
        let mut history = self.history.write();
        history.push_front(job);
        while history.len() > self.max_history {
            history.pop_back();
        }
    }

    /// Get a job by ID, active or finished
    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        if let Some(job) = self.jobs.read().get(id) {
            return Some(job.clone());
        }
        let history = self.history.read();
        history.iter().find(|j| j.id == *id).cloned()
    }

    /// Get all active jobs
    pub fn get_active_jobs(&self) -> Vec<Job> {
        let jobs = self.jobs.read();
        let mut active: Vec<Job> = jobs.values().cloned().collect();
        active.sort_by_key(|j| j.created_at);
        active
    }

    /// Get job history, newest first
    pub fn get_history(&self, limit: usize) -> Vec<Job> {
        let history = self.history.read();
        history.iter().take(limit).cloned().collect()
    }

    /// Get stats
    pub fn get_stats(&self) -> JobStats {
        self.stats.read().clone()
    }
}

impl StageReporter for AppState {
    fn workspace_acquired(&self, id: &JobId, path: &Path) {
        if let Some(job) = self.jobs.write().get_mut(id) {
            job.workspace = Some(path.to_path_buf());
        }
    }

    fn transition(&self, id: &JobId, state: JobState) {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(id) {
            Some(job) => {
                let target = state.clone();
                if !job.advance(state) {
                    tracing::warn!(
                        "Ignoring transition of job {} from {:?} to {:?}",
                        id,
                        job.state,
                        target
                    );
                }
            }
            None => tracing::debug!("Transition for unknown job {}", id),
        }
    }

    fn finished(&self, id: &JobId, result: &JobResult) {
        let job = {
            let mut jobs = self.jobs.write();
            let accepted = match jobs.get_mut(id) {
                Some(job) => job.finish(result.clone()),
                None => {
                    tracing::warn!("Result for unknown or finished job {}", id);
                    false
                }
            };
            if accepted {
                jobs.remove(id)
            } else {
                None
            }
        };

        if let Some(job) = job {
            self.stats.write().record(result);
            self.add_to_history(job);
        }
    }
}
