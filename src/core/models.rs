//! Core data models for video analysis

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{AnalysisError, Result};

/// Server-reported lifecycle stage of an uploaded video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// The service has not assigned a state yet
    StateUnspecified,
    /// Bytes are still being received
    Uploading,
    /// Upload finished, the service is decoding the video
    Processing,
    /// Ready for analysis
    Active,
    /// Processing failed, the file is unusable
    Failed,
    /// Any state string this client does not know about
    #[serde(other)]
    Unknown,
}

impl FileState {
    /// Whether polling should continue
    pub fn is_pending(&self) -> bool {
        matches!(self, FileState::Uploading | FileState::Processing)
    }

    /// ACTIVE and FAILED never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Active | FileState::Failed)
    }

    /// Position in the UPLOADING -> PROCESSING -> terminal order
    fn rank(&self) -> Option<u8> {
        match self {
            FileState::Uploading => Some(0),
            FileState::Processing => Some(1),
            FileState::Active | FileState::Failed => Some(2),
            FileState::StateUnspecified | FileState::Unknown => None,
        }
    }

    /// Check that moving from `self` to `next` only goes forward
    pub fn can_transition_to(&self, next: FileState) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to >= from,
            _ => false,
        }
    }
}

impl Default for FileState {
    fn default() -> Self {
        FileState::StateUnspecified
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::StateUnspecified => "STATE_UNSPECIFIED",
            FileState::Uploading => "UPLOADING",
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// The service's handle to an uploaded video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Service-assigned identifier, e.g. `files/abc123`
    pub name: String,
    /// URI referenced by generation requests once ACTIVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Last state reported by the service
    #[serde(default)]
    pub state: FileState,
    /// ASCII-safe name given at upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// MIME type recorded by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Uploaded files are deleted by the service after this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl RemoteFile {
    /// File handle with no URI or metadata
    pub fn new(name: impl Into<String>, state: FileState) -> Self {
        Self {
            name: name.into(),
            uri: None,
            state,
            display_name: None,
            mime_type: None,
            expiration_time: None,
        }
    }

    /// Set the URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Whether the file can be analyzed
    pub fn is_active(&self) -> bool {
        self.state == FileState::Active
    }
}

/// A ready remote file paired with the literal prompt to run against it
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    remote_file: RemoteFile,
    prompt_text: String,
}

impl AnalysisRequest {
    /// Refuses to pair a prompt with a file that is not ACTIVE
    pub fn new(remote_file: RemoteFile, prompt_text: impl Into<String>) -> Result<Self> {
        if !remote_file.is_active() {
            return Err(AnalysisError::FileNotReady {
                name: remote_file.name,
                state: remote_file.state,
            });
        }

        Ok(Self {
            remote_file,
            prompt_text: prompt_text.into(),
        })
    }

    /// File to analyze
    pub fn remote_file(&self) -> &RemoteFile {
        &self.remote_file
    }

    /// Prompt sent with the file
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }
}

/// Token accounting as reported by the generation endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, video included
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    /// Tokens in the generated answer
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
    /// Prompt plus completion as counted by the service
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

/// The service's reply to an analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Concatenated text parts of the first candidate
    pub text: String,
    /// Absent when the service reports no usage
    pub usage_metadata: Option<UsageMetadata>,
}

impl AnalysisResponse {
    /// Response with no usage metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage_metadata: None,
        }
    }

    /// Attach usage counts
    pub fn with_usage(mut self, prompt: u64, completion: u64, total: u64) -> Self {
        self.usage_metadata = Some(UsageMetadata {
            prompt_token_count: Some(prompt),
            candidates_token_count: Some(completion),
            total_token_count: Some(total),
        });
        self
    }

    /// Prompt tokens, 0 when unreported
    pub fn prompt_tokens(&self) -> u64 {
        self.usage_metadata
            .and_then(|u| u.prompt_token_count)
            .unwrap_or(0)
    }

    /// Completion tokens, 0 when unreported
    pub fn completion_tokens(&self) -> u64 {
        self.usage_metadata
            .and_then(|u| u.candidates_token_count)
            .unwrap_or(0)
    }

    /// Total tokens, 0 when unreported
    pub fn total_tokens(&self) -> u64 {
        self.usage_metadata
            .and_then(|u| u.total_token_count)
            .unwrap_or(0)
    }
}

/// Derived token counts and estimated spend for one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Total tokens
    pub total_tokens: u64,
    /// Estimated cost in `currency`
    pub estimated_cost: f64,
    /// ISO currency code
    pub currency: String,
}

impl UsageStats {
    /// Usage priced in USD
    pub fn new(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64, estimated_cost: f64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
            estimated_cost,
            currency: "USD".to_string(),
        }
    }
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new(0, 0, 0, 0.0)
    }
}
