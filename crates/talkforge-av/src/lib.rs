//! # talkforge-av
//!
//! Filesystem and subprocess plumbing for the talkforge render pipeline.
//!
//! This crate provides functionality for:
//! - Allocating an exclusive, self-cleaning scratch directory per job
//! - Running external tools from argument vectors with a timeout, a bounded
//!   diagnostic tail, and cancellation that kills the whole process group
//! - Normalizing audio and upscaling video with ffmpeg
//! - Locating the video an external engine wrote into a workspace
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use talkforge_av::{locate_artifact, Workspace};
//! use talkforge_common::JobId;
//!
//! let workspace = Workspace::acquire(std::path::Path::new("/tmp"), &JobId::new())?;
//! let video = locate_artifact(workspace.path(), "infinitetalk_res");
//! workspace.release()?;
//! # let _ = video;
//! # Ok::<(), talkforge_av::Error>(())
//! ```

mod error;
pub mod actions;
pub mod command;
pub mod locate;
pub mod tools;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use locate::locate_artifact;
pub use tools::{check_tool, check_tool_with_arg, check_tools, ToolInfo};
pub use workspace::Workspace;
