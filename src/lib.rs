//! Talkforge - portrait plus voice clip to talking-head video
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod engine;
pub mod fetch;
pub mod pipeline;
pub mod publish;
pub mod server;
pub mod state;
