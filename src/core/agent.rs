//! Video agent: upload -> analyze -> usage, one logical task per request

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::core::client::{GeminiClient, VideoService};
use crate::core::config::AgentConfig;
use crate::core::errors::Result;
use crate::core::models::{AnalysisRequest, AnalysisResponse, RemoteFile, UsageStats};
use crate::core::poller::{PollSettings, ProgressObserver};
use crate::core::pricing::extract_usage;
use crate::core::prompts::{Task, TaskKind};
use crate::core::uploader::Uploader;

/// Everything a caller needs to show the result of one run
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Task that produced `text`
    pub task: TaskKind,
    /// Generated answer
    pub text: String,
    /// Token counts and estimated cost
    pub usage: UsageStats,
    /// Wall time from staging to answer
    pub elapsed: Duration,
    /// Resolved model id
    pub model_id: String,
    /// Remote file the task ran against
    pub remote_name: String,
}

/// Runs analysis tasks against uploaded videos
#[derive(Clone)]
pub struct VideoAgent {
    service: Arc<dyn VideoService>,
    model_id: String,
    poll: PollSettings,
    staging_dir: Option<PathBuf>,
}

impl std::fmt::Debug for VideoAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoAgent")
            .field("model_id", &self.model_id)
            .field("poll", &self.poll)
            .finish()
    }
}

impl VideoAgent {
    /// Create an agent over any remote service implementation
    pub fn new(service: Arc<dyn VideoService>, model_id: impl Into<String>, poll: PollSettings) -> Self {
        Self {
            service,
            model_id: model_id.into(),
            poll,
            staging_dir: None,
        }
    }

    /// Create an agent backed by the Gemini HTTP client
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            config.model_id.clone(),
            PollSettings {
                interval: config.poll_interval(),
                max_attempts: config.max_poll_attempts,
            },
        ))
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(&AgentConfig::from_env()?)
    }

    /// Stage copies under `dir` instead of the system temp dir
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Model id used for generation
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Upload a local video and wait until it is ACTIVE
    pub async fn upload(
        &self,
        video_path: &Path,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<RemoteFile> {
        let mut uploader = Uploader::new(self.service.as_ref(), self.poll);
        if let Some(dir) = &self.staging_dir {
            uploader = uploader.with_staging_dir(dir);
        }
        uploader.upload(video_path, observer).await
    }

    /// Run one task against a ready remote file
    pub async fn analyze(&self, remote_file: &RemoteFile, task: &Task) -> Result<AnalysisResponse> {
        let prompt = task.prompt();
        let request = AnalysisRequest::new(remote_file.clone(), prompt)?;

        info!("Analyzing video {} with task {}", remote_file.name, task.kind());
        self.service.generate(&self.model_id, &request).await
    }

    /// Parse a task identifier and question, then analyze
    pub async fn analyze_kind(
        &self,
        remote_file: &RemoteFile,
        kind: TaskKind,
        question: Option<&str>,
    ) -> Result<AnalysisResponse> {
        let task = Task::new(kind, question)?;
        self.analyze(remote_file, &task).await
    }

    /// Summarize the video
    pub async fn get_summary(&self, remote_file: &RemoteFile) -> Result<AnalysisResponse> {
        self.analyze(remote_file, &Task::Summarize).await
    }

    /// Answer a free-form question; blank questions are rejected
    pub async fn ask_question(&self, remote_file: &RemoteFile, question: &str) -> Result<AnalysisResponse> {
        self.analyze(remote_file, &Task::ask(question)?).await
    }

    /// List notable events with timestamps
    pub async fn detect_events(&self, remote_file: &RemoteFile) -> Result<AnalysisResponse> {
        self.analyze(remote_file, &Task::DetectEvents).await
    }

    /// Transcript with speaker labels
    pub async fn transcribe_and_diarize(&self, remote_file: &RemoteFile) -> Result<AnalysisResponse> {
        self.analyze(remote_file, &Task::TranscribeDiarize).await
    }

    /// Full pipeline for one video and one task
    ///
    /// The task is validated by construction, so a bad request never
    /// reaches the network.
    pub async fn run_task(
        &self,
        video_path: &Path,
        task: &Task,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<AnalysisOutcome> {
        let started = Instant::now();

        let remote = self.upload(video_path, observer).await?;
        let response = self.analyze(&remote, task).await?;
        let usage = extract_usage(&response, &self.model_id);

        let elapsed = started.elapsed();
        if response.usage_metadata.is_none() {
            warn!("Response carried no usage metadata; cost reported as 0");
        }
        info!(
            "Task {} finished in {:.2}s: {} tokens, ${:.4}",
            task.kind(),
            elapsed.as_secs_f64(),
            usage.total_tokens,
            usage.estimated_cost
        );

        Ok(AnalysisOutcome {
            task: task.kind(),
            text: response.text,
            usage,
            elapsed,
            model_id: self.model_id.clone(),
            remote_name: remote.name,
        })
    }
}
