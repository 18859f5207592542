//! Remote video-analysis service: the trait seam and the Gemini HTTP client

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::core::config::AgentConfig;
use crate::core::errors::{AnalysisError, Result};
use crate::core::models::{AnalysisRequest, AnalysisResponse, RemoteFile, UsageMetadata};

/// Operations the pipeline needs from the remote service
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Send the bytes at `path` under `display_name`
    async fn upload(&self, path: &Path, display_name: &str, mime_type: &str) -> Result<RemoteFile>;

    /// Re-fetch a remote file's current state by name
    async fn get_status(&self, name: &str) -> Result<RemoteFile>;

    /// Run one prompt against one ready file
    async fn generate(&self, model_id: &str, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

/// Gemini Files API + generateContent client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(config: &AgentConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AnalysisError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = AgentConfig::from_env()?;
        Self::new(&config)
    }

    /// Turn a non-2xx reply into a `Service` error
    async fn check_status(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(AnalysisError::Service {
            operation,
            status: Some(status.as_u16()),
            message: error_text,
        })
    }

    /// Body for a single-request `multipart/related` upload
    ///
    /// The video is read straight into the body buffer, which is sized up
    /// front from the file's metadata, so it is held in memory once.
    async fn multipart_body(path: &Path, boundary: &str, display_name: &str, mime_type: &str) -> Result<Vec<u8>> {
        let metadata = serde_json::json!({ "file": { "display_name": display_name } });

        let mut head = Vec::with_capacity(256);
        head.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        head.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        head.extend_from_slice(&serde_json::to_vec(&metadata)?);
        head.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
        head.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
        let tail = format!("\r\n--{}--\r\n", boundary);

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| AnalysisError::io(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| AnalysisError::io(path, e))?
            .len() as usize;

        let mut body = Vec::with_capacity(head.len() + size + tail.len());
        body.extend_from_slice(&head);
        file.read_to_end(&mut body)
            .await
            .map_err(|e| AnalysisError::io(path, e))?;
        body.extend_from_slice(tail.as_bytes());
        Ok(body)
    }
}

#[async_trait]
impl VideoService for GeminiClient {
    async fn upload(&self, path: &Path, display_name: &str, mime_type: &str) -> Result<RemoteFile> {
        let boundary = format!("video-analyzer-{}", uuid::Uuid::new_v4().simple());
        let body = Self::multipart_body(path, &boundary, display_name, mime_type).await?;

        info!("Uploading video from safe path: {} ({} bytes)", path.display(), body.len());

        let response = self
            .client
            .post(format!("{}/upload/v1beta/files", self.api_base))
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "multipart")
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AnalysisError::service("upload", e))?;

        let response = Self::check_status("upload", response).await?;
        let envelope: UploadEnvelope = response
            .json()
            .await
            .map_err(|e| AnalysisError::service("upload", format!("invalid response: {}", e)))?;

        debug!("Upload accepted: {} ({})", envelope.file.name, envelope.file.state);
        Ok(envelope.file)
    }

    async fn get_status(&self, name: &str) -> Result<RemoteFile> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.api_base, name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| AnalysisError::service("get_status", e))?;

        let response = Self::check_status("get_status", response).await?;
        response
            .json::<RemoteFile>()
            .await
            .map_err(|e| AnalysisError::service("get_status", format!("invalid response: {}", e)))
    }

    async fn generate(&self, model_id: &str, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        let file = request.remote_file();
        let file_uri = file.uri.as_deref().ok_or_else(|| AnalysisError::Service {
            operation: "generate",
            status: None,
            message: format!("remote file {} has no uri", file.name),
        })?;
        let mime_type = file.mime_type.as_deref().unwrap_or("video/mp4");

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "file_data": { "mime_type": mime_type, "file_uri": file_uri } },
                    { "text": request.prompt_text() }
                ]
            }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_base, model_id
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::service("generate", e))?;

        let response = Self::check_status("generate", response).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::service("generate", format!("invalid response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| AnalysisError::Service {
                operation: "generate",
                status: None,
                message: "No content in response".to_string(),
            })?;

        Ok(AnalysisResponse {
            text,
            usage_metadata: parsed.usage_metadata,
        })
    }
}
