//! Video Analyzer - Gemini video understanding library
//!
//! Uploads a local video to the Gemini Files API, waits for it to become
//! ACTIVE, runs one of four fixed analysis tasks and estimates the cost of
//! the call from its token usage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    agent::{AnalysisOutcome, VideoAgent},
    client::{GeminiClient, VideoService},
    config::AgentConfig,
    errors::{AnalysisError, Result},
    models::{AnalysisRequest, AnalysisResponse, FileState, RemoteFile, UsageStats},
    poller::{PollProgress, PollSettings, ProgressObserver},
    pricing::extract_usage,
    prompts::{Task, TaskKind},
    uploader::Uploader,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
