//! ASCII-safe display names and staged upload copies

use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::core::errors::{AnalysisError, Result};

/// Fallback when the extension does not map to a known type
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Make a display name the remote API can carry in headers
///
/// Every run of non-ASCII code points collapses to a single `_`.
pub fn sanitize_display_name(source: &Path) -> String {
    static NON_ASCII: OnceLock<Regex> = OnceLock::new();
    let pattern = NON_ASCII.get_or_init(|| Regex::new(r"[^\x00-\x7F]+").expect("valid regex"));

    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    pattern.replace_all(&base, "_").into_owned()
}

/// Guess the upload content type from the file extension
pub fn detect_mime_type(source: &Path) -> String {
    mime_guess::from_path(source)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string())
}

/// A uniquely named temporary copy of a source video
///
/// The copy is removed when this value is dropped, so it can never
/// outlive the scope that staged it.
#[derive(Debug)]
pub struct StagedVideo {
    source: PathBuf,
    display_name: String,
    mime_type: String,
    file: NamedTempFile,
}

impl StagedVideo {
    /// Location of the staged copy
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Original file the copy was made from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Name to register with the service
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Detected MIME type
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Delete the staged copy now, logging rather than failing on error
    pub fn cleanup(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => info!("Removed staged copy: {}", path.display()),
            Err(e) => warn!("Failed to remove staged copy {}: {}", path.display(), e),
        }
    }
}

/// Stage `source` in the system temp directory
pub async fn stage_video(source: &Path) -> Result<StagedVideo> {
    stage_video_in(source, &std::env::temp_dir()).await
}

/// Stage `source` in `dir`, keeping its extension
pub async fn stage_video_in(source: &Path, dir: &Path) -> Result<StagedVideo> {
    let metadata = tokio::fs::metadata(source)
        .await
        .map_err(|e| AnalysisError::io(source, e))?;

    if !metadata.is_file() {
        return Err(AnalysisError::io(
            source,
            std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let file = tempfile::Builder::new()
        .prefix("video-upload-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| AnalysisError::io(dir, e))?;

    info!("Copying video to temporary safe path: {}", file.path().display());

    // On failure `file` is dropped here and the partial copy goes with it.
    tokio::fs::copy(source, file.path())
        .await
        .map_err(|e| AnalysisError::io(file.path(), e))?;

    Ok(StagedVideo {
        source: source.to_path_buf(),
        display_name: sanitize_display_name(source),
        mime_type: detect_mime_type(source),
        file,
    })
}
