use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub weights: WeightsConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory under which per-job workspaces are created (default: system temp dir)
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

/// Locations of the model weights. Downloading them is out of scope;
/// `talkforge check-weights` only verifies they are present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightsConfig {
    /// Base image-to-video checkpoint directory
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    /// Speech feature encoder directory
    #[serde(default = "default_audio_encoder_dir")]
    pub audio_encoder_dir: PathBuf,

    /// Talking-head adapter weights file
    #[serde(default = "default_adapter_path")]
    pub adapter_path: PathBuf,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("/app/weights/Wan2.1-I2V-14B-480P")
}

fn default_audio_encoder_dir() -> PathBuf {
    PathBuf::from("/app/weights/chinese-wav2vec2-base")
}

fn default_adapter_path() -> PathBuf {
    PathBuf::from("/app/weights/InfiniteTalk/single/infinitetalk.safetensors")
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            audio_encoder_dir: default_audio_encoder_dir(),
            adapter_path: default_adapter_path(),
        }
    }
}

impl WeightsConfig {
    /// All configured weight paths with a short label each.
    pub fn entries(&self) -> [(&'static str, &PathBuf); 3] {
        [
            ("checkpoint_dir", &self.checkpoint_dir),
            ("audio_encoder_dir", &self.audio_encoder_dir),
            ("adapter_path", &self.adapter_path),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Interpreter or executable that runs the engine (default: "python")
    #[serde(default = "default_engine_program")]
    pub program: PathBuf,

    /// Script passed as first argument to `program`, if any
    #[serde(default = "default_engine_script")]
    pub script: Option<PathBuf>,

    #[serde(default = "default_sample_steps")]
    pub sample_steps: u32,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_motion_frame")]
    pub motion_frame: u32,

    /// File name prefix the engine writes its video under
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Seed written into the job descriptor
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Hard limit for one synthesis run (default: 2 hours)
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

fn default_engine_program() -> PathBuf {
    PathBuf::from("python")
}

fn default_engine_script() -> Option<PathBuf> {
    Some(PathBuf::from("/app/InfiniteTalk/generate_infinitetalk.py"))
}

fn default_sample_steps() -> u32 {
    40
}

fn default_mode() -> String {
    "streaming".to_string()
}

fn default_motion_frame() -> u32 {
    9
}

fn default_output_prefix() -> String {
    "infinitetalk_res".to_string()
}

fn default_seed() -> u64 {
    1
}

fn default_engine_timeout() -> u64 {
    7200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            script: default_engine_script(),
            sample_steps: default_sample_steps(),
            mode: default_mode(),
            motion_frame: default_motion_frame(),
            output_prefix: default_output_prefix(),
            seed: default_seed(),
            timeout_secs: default_engine_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Per-download timeout (default: 300)
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    300
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishBackend {
    /// Multipart upload to an anonymous file host
    #[default]
    FileHost,
    /// Copy into a directory served under `/videos`
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub backend: PublishBackend,

    #[serde(default = "default_publish_endpoint")]
    pub endpoint: String,

    /// Multipart field carrying the file
    #[serde(default = "default_form_field")]
    pub form_field: String,

    /// JSON field holding the public URL in the host's answer
    #[serde(default = "default_link_field")]
    pub link_field: String,

    #[serde(default = "default_publish_timeout")]
    pub timeout_secs: u64,

    /// Target directory of the local backend
    #[serde(default)]
    pub local_dir: Option<PathBuf>,

    /// Base URL prepended to file names by the local backend
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_publish_endpoint() -> String {
    "https://file.io".to_string()
}

fn default_form_field() -> String {
    "file".to_string()
}

fn default_link_field() -> String {
    "link".to_string()
}

fn default_publish_timeout() -> u64 {
    600
}

fn default_public_base_url() -> String {
    "http://localhost:8000/videos".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            backend: PublishBackend::default(),
            endpoint: default_publish_endpoint(),
            form_field: default_form_field(),
            link_field: default_link_field(),
            timeout_secs: default_publish_timeout(),
            local_dir: None,
            public_base_url: default_public_base_url(),
        }
    }
}

impl PublishConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Synthesis runs allowed at once (default: 1, one GPU)
    #[serde(default = "default_max_concurrent_synthesis")]
    pub max_concurrent_synthesis: usize,

    /// Bytes of trailing tool output kept in error messages (default: 4000)
    #[serde(default = "default_diagnostic_tail_bytes")]
    pub diagnostic_tail_bytes: usize,

    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,

    #[serde(default = "default_enhance_timeout")]
    pub enhance_timeout_secs: u64,
}

fn default_max_concurrent_synthesis() -> usize {
    1
}

fn default_diagnostic_tail_bytes() -> usize {
    talkforge_common::DEFAULT_TAIL_BYTES
}

fn default_transcode_timeout() -> u64 {
    600
}

fn default_enhance_timeout() -> u64 {
    3600
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_synthesis: default_max_concurrent_synthesis(),
            diagnostic_tail_bytes: default_diagnostic_tail_bytes(),
            transcode_timeout_secs: default_transcode_timeout(),
            enhance_timeout_secs: default_enhance_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Finished jobs kept in memory for `/status` and `/api/history`
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    1000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}
