use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use talkforge_av::actions::{normalize_audio, upscale, ToolOptions};
use talkforge_av::{locate_artifact, Workspace};
use talkforge_common::paths::image_extension_from_url;
use talkforge_common::{JobId, Stage, StageError, StageOutcome};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{RenderInput, StageReporter};
use crate::config::Config;
use crate::engine::{SynthesisDescriptor, SynthesisInvoker};
use crate::fetch::Fetcher;
use crate::publish::Publisher;
use crate::state::{JobResult, JobState};

const RAW_AUDIO_FILE: &str = "input_audio";
const NORMALIZED_AUDIO_FILE: &str = "input.wav";
const UPSCALED_FILE: &str = "upscaled.mp4";

type Failure = (Stage, StageError);

fn at(stage: Stage) -> impl Fn(StageError) -> Failure {
    move |error| (stage, error)
}

/// Sequences the stages of one render job.
///
/// Shared between jobs; everything per-job lives in the job's workspace.
pub struct JobOrchestrator {
    config: Arc<Config>,
    ffmpeg: PathBuf,
    fetcher: Fetcher,
    invoker: SynthesisInvoker,
    publisher: Arc<dyn Publisher>,
    reporter: Arc<dyn StageReporter>,
}

impl JobOrchestrator {
    pub fn new(
        config: Arc<Config>,
        publisher: Arc<dyn Publisher>,
        reporter: Arc<dyn StageReporter>,
    ) -> Self {
        let ffmpeg = config
            .tools
            .ffmpeg_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        let fetcher = Fetcher::new(config.fetch.timeout());
        let invoker = SynthesisInvoker::new(
            config.engine.clone(),
            config.weights.clone(),
            config.limits.diagnostic_tail_bytes,
            config.limits.max_concurrent_synthesis,
        );

        Self {
            config,
            ffmpeg,
            fetcher,
            invoker,
            publisher,
            reporter,
        }
    }

    pub fn invoker(&self) -> &SynthesisInvoker {
        &self.invoker
    }

    pub fn publisher_name(&self) -> &'static str {
        self.publisher.name()
    }

    /// Run the job to a terminal result and report it.
    ///
    /// Never panics on stage failure; every failure is folded into the
    /// returned [`JobResult`]. The workspace is gone when this returns.
    pub async fn run(
        &self,
        job_id: JobId,
        input: &RenderInput,
        cancel: CancellationToken,
    ) -> JobResult {
        let span = tracing::info_span!("job", id = %job_id, tier = %input.tier);
        async {
            let started = Instant::now();
            tracing::info!(
                "Starting render of {} with {}",
                input.image_url,
                input.audio_url
            );

            let result = match self.execute(&job_id, input, &cancel).await {
                Ok(video_url) => {
                    tracing::info!(
                        "Job done in {:.1}s: {}",
                        started.elapsed().as_secs_f64(),
                        video_url
                    );
                    JobResult::done(video_url)
                }
                Err((stage, error)) => {
                    if error.is_cancelled() {
                        tracing::info!("Job cancelled during {}", stage);
                    } else {
                        tracing::warn!("Job failed in {}: {}", stage, error);
                    }
                    JobResult::failed(stage, &error)
                }
            };

            self.reporter.finished(&job_id, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job_id: &JobId,
        input: &RenderInput,
        cancel: &CancellationToken,
    ) -> Result<String, Failure> {
        let workspace = Workspace::acquire(&self.config.workspace.root, job_id)
            .map_err(|e| (Stage::Workspace, StageError::write(e.to_string())))?;
        self.reporter.workspace_acquired(job_id, workspace.path());

        let outcome = self.run_stages(job_id, input, &workspace, cancel).await;

        if let Err(e) = workspace.release() {
            tracing::warn!("Failed to release workspace: {}", e);
        }
        outcome
    }

    async fn run_stages(
        &self,
        job_id: &JobId,
        input: &RenderInput,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> Result<String, Failure> {
        let preset = input.tier.preset();

        self.enter(job_id, Stage::Fetch, cancel)?;
        let image = workspace.file(&format!(
            "input.{}",
            image_extension_from_url(&input.image_url)
        ));
        let raw_audio = workspace.file(RAW_AUDIO_FILE);
        or_cancel(cancel, self.fetcher.fetch(&input.image_url, &image))
            .await
            .map_err(at(Stage::Fetch))?;
        or_cancel(cancel, self.fetcher.fetch(&input.audio_url, &raw_audio))
            .await
            .map_err(at(Stage::Fetch))?;

        self.enter(job_id, Stage::Normalize, cancel)?;
        let transcode = self.tool_options(self.config.limits.transcode_timeout_secs, cancel);
        let wav = normalize_audio(
            &self.ffmpeg,
            &raw_audio,
            &workspace.file(NORMALIZED_AUDIO_FILE),
            &transcode,
        )
        .await
        .map_err(at(Stage::Normalize))?;

        self.enter(job_id, Stage::Synthesize, cancel)?;
        let descriptor = SynthesisDescriptor::new(workspace, &image, &wav, self.invoker.seed())
            .map_err(at(Stage::Synthesize))?;
        self.invoker
            .synthesize(&descriptor, workspace, &preset, cancel)
            .await
            .map_err(at(Stage::Synthesize))?;

        self.enter(job_id, Stage::Locate, cancel)?;
        let mut video = locate_artifact(workspace.path(), self.invoker.output_prefix())
            .map_err(at(Stage::Locate))?;
        tracing::debug!("Engine output: {:?}", video);

        if let Some(target) = preset.upscale {
            self.enter(job_id, Stage::Enhance, cancel)?;
            let enhance = self.tool_options(self.config.limits.enhance_timeout_secs, cancel);
            video = upscale(
                &self.ffmpeg,
                &video,
                &workspace.file(UPSCALED_FILE),
                target,
                &enhance,
            )
            .await
            .map_err(at(Stage::Enhance))?;
        }

        self.enter(job_id, Stage::Publish, cancel)?;
        or_cancel(cancel, self.publisher.publish(&video))
            .await
            .map_err(at(Stage::Publish))
    }

    /// Report entry into `stage`, refusing to start it once cancelled.
    fn enter(
        &self,
        job_id: &JobId,
        stage: Stage,
        cancel: &CancellationToken,
    ) -> Result<(), Failure> {
        if cancel.is_cancelled() {
            return Err((stage, StageError::Cancelled));
        }
        tracing::info!("Entering stage {}", stage);
        self.reporter.transition(job_id, JobState::running(stage));
        Ok(())
    }

    fn tool_options(&self, timeout_secs: u64, cancel: &CancellationToken) -> ToolOptions {
        ToolOptions {
            timeout: Duration::from_secs(timeout_secs),
            tail_bytes: self.config.limits.diagnostic_tail_bytes,
            cancel: Some(cancel.clone()),
        }
    }
}

/// Race an in-process stage against cancellation.
async fn or_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = StageOutcome<T>>,
) -> StageOutcome<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StageError::Cancelled),
        res = fut => res,
    }
}
