use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use talkforge_av::{ToolCommand, Workspace};
use talkforge_common::{StageError, StageOutcome, TierPreset};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::SynthesisDescriptor;
use crate::config::{EngineConfig, WeightsConfig};

/// Runs the external synthesis engine for one job at a time per GPU slot.
#[derive(Debug, Clone)]
pub struct SynthesisInvoker {
    engine: EngineConfig,
    weights: WeightsConfig,
    tail_bytes: usize,
    slots: Arc<Semaphore>,
}

impl SynthesisInvoker {
    pub fn new(
        engine: EngineConfig,
        weights: WeightsConfig,
        tail_bytes: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            engine,
            weights,
            tail_bytes,
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Prefix of the file name the engine writes its video under.
    pub fn output_prefix(&self) -> &str {
        &self.engine.output_prefix
    }

    pub fn seed(&self) -> u64 {
        self.engine.seed
    }

    /// Synthesis slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Engine arguments for a run, excluding the program itself.
    pub fn build_args(
        &self,
        workspace: &Workspace,
        descriptor_path: &Path,
        preset: &TierPreset,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(script) = &self.engine.script {
            args.push(script.into());
        }
        args.push("--ckpt_dir".into());
        args.push((&self.weights.checkpoint_dir).into());
        args.push("--wav2vec_dir".into());
        args.push((&self.weights.audio_encoder_dir).into());
        args.push("--infinitetalk_dir".into());
        args.push((&self.weights.adapter_path).into());
        args.push("--input_json".into());
        args.push(descriptor_path.into());
        args.push("--size".into());
        args.push(preset.engine_size.into());
        args.push("--sample_steps".into());
        args.push(self.engine.sample_steps.to_string().into());
        args.push("--mode".into());
        args.push((&self.engine.mode).into());
        args.push("--motion_frame".into());
        args.push(self.engine.motion_frame.to_string().into());
        args.push("--save_file".into());
        args.push(workspace.file(&self.engine.output_prefix).into());
        args
    }

    /// Write the descriptor and run the engine to completion.
    ///
    /// Waits for a free synthesis slot first; cancellation is honoured while
    /// waiting as well as while the engine runs.
    pub async fn synthesize(
        &self,
        descriptor: &SynthesisDescriptor,
        workspace: &Workspace,
        preset: &TierPreset,
        cancel: &CancellationToken,
    ) -> StageOutcome<()> {
        let descriptor_path = descriptor.write_to(workspace).await?;

        let _permit = tokio::select! {
            permit = self.slots.acquire() => permit
                .map_err(|_| StageError::synthesis("synthesis slots closed"))?,
            _ = cancel.cancelled() => return Err(StageError::Cancelled),
        };

        let mut cmd = ToolCommand::new(&self.engine.program);
        cmd.args(self.build_args(workspace, &descriptor_path, preset))
            .current_dir(workspace.path())
            .timeout(self.timeout())
            .tail_bytes(self.tail_bytes)
            .cancel_on(cancel.clone());

        tracing::info!(
            "Running synthesis engine at {} in {:?}",
            preset.engine_size,
            workspace.path()
        );

        let output = cmd
            .execute()
            .await
            .map_err(|e| e.into_stage_error(StageError::Synthesis))?;

        tracing::debug!("Synthesis engine finished: {}", output.status);
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.engine.timeout()
    }
}
