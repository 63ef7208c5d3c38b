//! Builder for executing external tool commands with timeout, cancellation,
//! and bounded diagnostic capture.
//!
//! The child runs in its own process group (on unix). Timeout, cancellation,
//! and dropping the `execute` future all kill the whole group, so helpers the
//! tool forked do not outlive the job.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use talkforge_common::{truncate_tail, DEFAULT_TAIL_BYTES};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How long to wait for the output pipes to drain after the process exits.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Last bytes of combined stdout and stderr (lossy UTF-8).
    pub tail: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// Arguments are passed as a vector, never through a shell.
///
/// # Example
///
/// ```no_run
/// use talkforge_av::ToolCommand;
/// use std::time::Duration;
///
/// # async fn example() -> talkforge_av::Result<()> {
/// let output = ToolCommand::new("ffmpeg")
///     .args(["-y", "-i", "in.mp3", "-ar", "16000", "out.wav"])
///     .timeout(Duration::from_secs(600))
///     .execute()
///     .await?;
/// println!("{}", output.tail);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Duration,
    tail_bytes: usize,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: DEFAULT_TIMEOUT,
            tail_bytes: DEFAULT_TAIL_BYTES,
            cancel: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(iter.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Run the tool with the given working directory.
    pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Set how many trailing bytes of output to keep for diagnostics.
    pub fn tail_bytes(&mut self, n: usize) -> &mut Self {
        self.tail_bytes = n;
        self
    }

    /// Kill the tool when the token is cancelled.
    pub fn cancel_on(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing the tail of its output.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::ToolFailed`] if spawning or waiting fails.
    /// - [`Error::ExitFailure`] on a non-zero exit (includes the output tail).
    /// - [`Error::TimedOut`] if the timeout elapsed; the process group is killed.
    /// - [`Error::Cancelled`] if the token fired; the process group is killed.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        #[cfg(feature = "tracing")]
        tracing::debug!("Spawning {} {:?}", self.program.display(), self.args);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(tool.clone())
            } else {
                Error::tool_failed(tool.clone(), format!("failed to spawn: {e}"))
            }
        })?;

        let mut group = ProcessGroupGuard::new(child.id());
        let tail = Arc::new(Mutex::new(TailBuffer::new(self.tail_bytes)));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, tail.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, tail.clone())));
        }

        let cancel = self.cancel.clone().unwrap_or_default();
        let exit = tokio::select! {
            res = child.wait() => Exit::Finished(res),
            _ = tokio::time::sleep(self.timeout) => Exit::TimedOut,
            _ = cancel.cancelled() => Exit::Cancelled,
        };

        match exit {
            Exit::Finished(Ok(status)) => {
                group.disarm();
                finish_readers(readers).await;
                let tail = tail.lock().render();
                if status.success() {
                    Ok(ToolOutput { status, tail })
                } else {
                    Err(Error::ExitFailure {
                        tool,
                        status: status.to_string(),
                        tail,
                    })
                }
            }
            Exit::Finished(Err(e)) => {
                group.kill();
                finish_readers(readers).await;
                Err(Error::tool_failed(
                    tool,
                    format!("I/O error waiting for process: {e}"),
                ))
            }
            Exit::TimedOut => {
                #[cfg(feature = "tracing")]
                tracing::warn!("{} timed out after {:?}, killing", tool, self.timeout);
                group.kill();
                let _ = child.kill().await;
                finish_readers(readers).await;
                let tail = tail.lock().render();
                Err(Error::TimedOut {
                    tool,
                    timeout: self.timeout,
                    tail,
                })
            }
            Exit::Cancelled => {
                #[cfg(feature = "tracing")]
                tracing::info!("{} cancelled, killing", tool);
                group.kill();
                let _ = child.kill().await;
                finish_readers(readers).await;
                Err(Error::Cancelled { tool })
            }
        }
    }
}

enum Exit {
    Finished(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Kills the child's process group when dropped while armed.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            #[cfg(unix)]
            {
                use nix::sys::signal::{killpg, Signal};
                use nix::unistd::Pid;
                if let Ok(raw) = i32::try_from(pgid) {
                    // ESRCH just means the group is already gone.
                    let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
                }
            }
            #[cfg(not(unix))]
            let _ = pgid;
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Ring buffer holding the last `cap` bytes written to it.
struct TailBuffer {
    bytes: VecDeque<u8>,
    cap: usize,
}

impl TailBuffer {
    fn new(cap: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(cap.min(64 * 1024)),
            cap,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.cap == 0 {
            return;
        }
        let chunk = if chunk.len() > self.cap {
            &chunk[chunk.len() - self.cap..]
        } else {
            chunk
        };
        let overflow = (self.bytes.len() + chunk.len()).saturating_sub(self.cap);
        self.bytes.drain(..overflow);
        self.bytes.extend(chunk);
    }

    fn render(&self) -> String {
        let (a, b) = self.bytes.as_slices();
        let mut raw = Vec::with_capacity(a.len() + b.len());
        raw.extend_from_slice(a);
        raw.extend_from_slice(b);
        let text = String::from_utf8_lossy(&raw);
        truncate_tail(text.trim_end(), self.cap).to_string()
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, tail: Arc<Mutex<TailBuffer>>) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => tail.lock().push(&buf[..n]),
        }
    }
}

/// Wait briefly for the pipe readers; a grandchild may still hold the pipes.
async fn finish_readers(readers: Vec<JoinHandle<()>>) {
    for mut handle in readers {
        if tokio::time::timeout(DRAIN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}
