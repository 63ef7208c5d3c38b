//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] whose external tools are
//! small shell scripts: a fake `ffmpeg` that copies its input to its output
//! and a fake synthesis engine that writes a video into the workspace. Inputs
//! are served and uploads accepted by a [`MockServer`].

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use talkforge::config::{Config, PublishBackend};
use talkforge::pipeline::{RenderInput, RenderRequest};
use talkforge::server::{create_router, AppContext};
use talkforge::state::JobResult;
use talkforge_common::JobId;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake portrait";
pub const AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake voice clip";
pub const UPLOAD_LINK: &str = "https://files.example/v/abc123";

/// Behaviour of the fake synthesis engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FakeEngine {
    /// Writes `<save_file>.mp4`.
    #[default]
    Succeed,
    /// Writes a video under a name that does not carry the output prefix.
    OddName,
    /// Exits 0 without writing anything.
    NoOutput,
    /// Prints a traceback to stderr and exits 1.
    Fail,
    /// Records its pid and sleeps.
    Hang,
}

/// Behaviour of the fake transcoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FakeFfmpeg {
    #[default]
    Succeed,
    Fail,
    /// Normalizes audio but fails the upscale filter.
    FailUpscale,
}

/// How finished videos are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Upload {
    /// File host answering with a link.
    #[default]
    Link,
    /// File host answering without a link field.
    MissingLink,
    /// Local directory backend.
    Local,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fakes {
    pub engine: FakeEngine,
    pub ffmpeg: FakeFfmpeg,
    pub upload: Upload,
    pub synthesis_slots: Option<usize>,
}

/// Test harness wrapping a fully-constructed [`AppContext`] with fake tools.
pub struct TestHarness {
    pub ctx: AppContext,
    pub server: MockServer,
    dir: TempDir,
}

impl TestHarness {
    /// Harness whose tools and upload all succeed.
    pub async fn new() -> Self {
        Self::with(Fakes::default()).await
    }

    pub async fn with(fakes: Fakes) -> Self {
        let server = MockServer::start().await;
        mount_media(&server).await;
        mount_upload(&server, fakes.upload).await;

        let dir = tempfile::tempdir().expect("failed to create harness dir");
        for sub in ["tools", "work", "published"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("failed to create harness dir");
        }

        let config = build_config(dir.path(), &server, &fakes);
        write_fake_ffmpeg(dir.path(), fakes.ffmpeg);
        write_fake_engine(dir.path(), fakes.engine);

        let ctx = AppContext::new(config).expect("failed to build app context");
        Self { ctx, server, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(fakes: Fakes) -> (Self, SocketAddr) {
        let harness = Self::with(fakes).await;
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn image_url(&self) -> String {
        format!("{}/portrait.png", self.server.uri())
    }

    pub fn audio_url(&self) -> String {
        format!("{}/voice.mp3", self.server.uri())
    }

    pub fn request(&self, quality: Option<&str>) -> RenderRequest {
        RenderRequest {
            image_url: self.image_url(),
            audio_url: self.audio_url(),
            quality: quality.map(String::from),
        }
    }

    pub fn input(&self, quality: Option<&str>) -> RenderInput {
        self.request(quality).validate().expect("harness request is valid")
    }

    /// Register a job and run it to completion.
    pub async fn render(&self, quality: Option<&str>) -> (JobId, JobResult) {
        self.render_input(&self.input(quality)).await
    }

    pub async fn render_input(&self, input: &RenderInput) -> (JobId, JobResult) {
        let job = self.ctx.state.create_job(input.tier);
        let result = self
            .ctx
            .orchestrator
            .run(job.id, input, CancellationToken::new())
            .await;
        (job.id, result)
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.workspace_root())
            .expect("workspace root exists")
            .map(|e| e.expect("readable entry").path())
            .collect()
    }

    pub fn published_dir(&self) -> PathBuf {
        self.dir.path().join("published")
    }

    /// Argument lines of every fake ffmpeg invocation.
    pub fn ffmpeg_calls(&self) -> Vec<String> {
        read_lines(&self.tools_dir().join("ffmpeg.log"))
    }

    /// Argument lines of every fake engine invocation.
    pub fn engine_calls(&self) -> Vec<String> {
        read_lines(&self.tools_dir().join("engine.log"))
    }

    /// Pid recorded by a [`FakeEngine::Hang`] engine, once it is running.
    pub fn engine_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.tools_dir().join("engine.pid"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn tools_dir(&self) -> PathBuf {
        self.dir.path().join("tools")
    }
}

fn build_config(dir: &Path, server: &MockServer, fakes: &Fakes) -> Config {
    let tools = dir.join("tools");
    let mut config = Config::default();

    config.workspace.root = dir.join("work");
    config.tools.ffmpeg_path = Some(tools.join("ffmpeg"));
    config.engine.program = PathBuf::from("sh");
    config.engine.script = Some(tools.join("engine.sh"));
    config.engine.timeout_secs = 60;
    config.fetch.timeout_secs = 10;
    config.limits.transcode_timeout_secs = 30;
    config.limits.enhance_timeout_secs = 30;
    if let Some(slots) = fakes.synthesis_slots {
        config.limits.max_concurrent_synthesis = slots;
    }

    config.publish.endpoint = format!("{}/upload", server.uri());
    config.publish.timeout_secs = 10;
    if fakes.upload == Upload::Local {
        config.publish.backend = PublishBackend::Local;
        config.publish.local_dir = Some(dir.join("published"));
        config.publish.public_base_url = "http://localhost:8000/videos".to_string();
    }

    config
}

async fn mount_media(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/portrait.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES.to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/voice.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO_BYTES.to_vec()))
        .mount(server)
        .await;
}

async fn mount_upload(server: &MockServer, upload: Upload) {
    let body = match upload {
        Upload::Link => serde_json::json!({ "success": true, "link": UPLOAD_LINK }),
        Upload::MissingLink => serde_json::json!({ "success": false, "message": "quota exceeded" }),
        Upload::Local => return,
    };
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn write_fake_ffmpeg(dir: &Path, behaviour: FakeFfmpeg) {
    let tools = dir.join("tools");
    let log = tools.join("ffmpeg.log");
    let copy = r#"in=""
prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "-i" ]; then in="$arg"; fi
  prev="$arg"
  out="$arg"
done
cp "$in" "$out""#;
    let body = match behaviour {
        FakeFfmpeg::Succeed => copy.to_string(),
        FakeFfmpeg::Fail => r#"echo "input_audio: Invalid data found when processing input" >&2
exit 1"#
            .to_string(),
        FakeFfmpeg::FailUpscale => format!(
            r#"case "$*" in
  *scale=*) echo "Error while filtering: Cannot allocate memory" >&2; exit 1 ;;
esac
{copy}"#
        ),
    };
    let script = format!("#!/bin/sh\necho \"$*\" >> \"{}\"\n{}\n", log.display(), body);
    write_executable(&tools.join("ffmpeg"), &script);
}

fn write_fake_engine(dir: &Path, behaviour: FakeEngine) {
    let tools = dir.join("tools");
    let log = tools.join("engine.log");
    let pid = tools.join("engine.pid");
    let body = match behaviour {
        FakeEngine::Succeed => r#"printf 'video %s' "$size" > "$save.mp4""#.to_string(),
        FakeEngine::OddName => {
            r#"printf 'video %s' "$size" > "$(dirname "$save")/render_final.mp4""#.to_string()
        }
        FakeEngine::NoOutput => r#"echo "generation finished""#.to_string(),
        FakeEngine::Fail => r#"echo "loading weights"
echo "RuntimeError: CUDA out of memory" >&2
exit 1"#
            .to_string(),
        FakeEngine::Hang => format!("echo $$ > \"{}\"\nexec sleep 30", pid.display()),
    };
    let script = format!(
        r#"#!/bin/sh
echo "$*" >> "{log}"
save=""
size=""
descriptor=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--save_file" ]; then save="$arg"; fi
  if [ "$prev" = "--size" ]; then size="$arg"; fi
  if [ "$prev" = "--input_json" ]; then descriptor="$arg"; fi
  prev="$arg"
done
if [ ! -f "$descriptor" ]; then
  echo "missing descriptor $descriptor" >&2
  exit 2
fi
{body}
"#,
        log = log.display(),
        body = body,
    );
    write_executable(&tools.join("engine.sh"), &script);
}

fn write_executable(path: &Path, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, script).expect("failed to write fake tool");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake tool executable");
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(String::from).collect())
        .unwrap_or_default()
}
