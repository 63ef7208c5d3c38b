//! Talkforge-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across talkforge:
//!
//! - **Typed IDs**: Type-safe UUID wrapper for render jobs
//! - **Quality tiers**: The tier enum and the tier-to-engine-preset table
//! - **Path Utilities**: Functions to detect file types by extension
//! - **Error Handling**: The stage error taxonomy and the stage outcome alias
//!
//! # Examples
//!
//! ```
//! use talkforge_common::{JobId, QualityTier, Stage, StageError, StageOutcome};
//! use talkforge_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let job_id = JobId::new();
//! let preset = QualityTier::High.preset();
//! assert!(preset.needs_upscale());
//!
//! assert!(is_video_file(Path::new("render.mp4")));
//!
//! fn locate() -> StageOutcome<()> {
//!     Err(StageError::artifact_not_found("no video in workspace"))
//! }
//! assert!(locate().is_err());
//! # let _ = (job_id, Stage::Locate);
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{truncate_tail, Stage, StageError, StageOutcome, DEFAULT_TAIL_BYTES};
pub use ids::*;
pub use types::*;
