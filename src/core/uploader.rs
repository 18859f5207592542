//! Upload orchestrator: stage, upload, clean up, wait for ACTIVE

use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::client::VideoService;
use crate::core::errors::Result;
use crate::core::models::RemoteFile;
use crate::core::poller::{wait_until_ready, PollOutcome, PollSettings, ProgressObserver};
use crate::core::sanitizer::stage_video_in;

/// Uploads one local video and waits until the service can analyze it
pub struct Uploader<'a> {
    service: &'a dyn VideoService,
    settings: PollSettings,
    staging_dir: PathBuf,
}

impl<'a> Uploader<'a> {
    /// Uploader over `service` with the given polling
    pub fn new(service: &'a dyn VideoService, settings: PollSettings) -> Self {
        Self {
            service,
            settings,
            staging_dir: std::env::temp_dir(),
        }
    }

    /// Stage copies somewhere other than the system temp directory
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Upload `source` and return the ACTIVE remote file
    pub async fn upload(
        &self,
        source: &Path,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<RemoteFile> {
        Ok(self.upload_with_outcome(source, observer).await?.file)
    }

    /// Like [`Uploader::upload`], also reporting how many polls it took
    pub async fn upload_with_outcome(
        &self,
        source: &Path,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<PollOutcome> {
        let staged = stage_video_in(source, &self.staging_dir).await?;

        let uploaded = self
            .service
            .upload(staged.path(), staged.display_name(), staged.mime_type())
            .await;

        // The staged copy goes away before we look at the result, so
        // neither an upload error nor a long poll keeps it on disk.
        staged.cleanup();
        let remote = uploaded?;

        info!(
            "Uploaded {} as {} ({})",
            source.display(),
            remote.name,
            remote.state
        );

        let outcome = wait_until_ready(self.service, remote, self.settings, observer).await?;

        if let Some(expires) = outcome.file.expiration_time {
            info!("Remote file {} expires at {}", outcome.file.name, expires);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::AnalysisError;
    use crate::core::models::FileState;
    use crate::core::poller::tests::{fast, ScriptedService};

    fn source_video(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"fake video bytes").unwrap();
        path
    }

    fn staging_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_upload_reaches_active_and_removes_staged_copy() {
        let src = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = source_video(src.path(), "réunion.mp4");
        let service = ScriptedService::new(
            FileState::Processing,
            vec![FileState::Processing, FileState::Active],
        );

        let outcome = Uploader::new(service.as_ref(), fast())
            .with_staging_dir(staging.path())
            .upload_with_outcome(&source, None)
            .await
            .unwrap();

        assert_eq!(outcome.file.state, FileState::Active);
        assert_eq!(outcome.polls, 2);

        let staged = service.staged_paths.lock().unwrap().clone();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].1, "staged copy must exist while uploading");
        assert_ne!(staged[0].0, source);
        assert!(!staged[0].0.exists());
        assert!(staging_is_empty(staging.path()));
        assert!(source.exists());

        assert_eq!(*service.display_names.lock().unwrap(), vec!["r_union.mp4"]);
    }

    #[tokio::test]
    async fn test_failed_processing_leaves_no_temp_file() {
        let src = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = source_video(src.path(), "clip.mp4");
        let service = ScriptedService::new(
            FileState::Processing,
            vec![FileState::Processing, FileState::Failed],
        );

        let err = Uploader::new(service.as_ref(), fast())
            .with_staging_dir(staging.path())
            .upload(&source, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::RemoteProcessing { ref name } if name == "files/scripted"));
        assert!(staging_is_empty(staging.path()));
    }

    #[tokio::test]
    async fn test_upload_error_leaves_no_temp_file() {
        let src = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = source_video(src.path(), "clip.mp4");
        let service = ScriptedService::new(FileState::Processing, vec![]);
        *service.upload_error.lock().unwrap() =
            Some(AnalysisError::service("upload", "connection refused"));

        let err = Uploader::new(service.as_ref(), fast())
            .with_staging_dir(staging.path())
            .upload(&source, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Service { operation: "upload", .. }));
        assert_eq!(service.status_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(staging_is_empty(staging.path()));
    }

    #[tokio::test]
    async fn test_poll_timeout_leaves_no_temp_file() {
        let src = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = source_video(src.path(), "clip.mp4");
        let service = ScriptedService::new(FileState::Processing, vec![]);
        let settings = PollSettings {
            interval: std::time::Duration::from_millis(1),
            max_attempts: Some(2),
        };

        let err = Uploader::new(service.as_ref(), settings)
            .with_staging_dir(staging.path())
            .upload(&source, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::PollTimeout { .. }));
        assert!(staging_is_empty(staging.path()));
    }

    #[tokio::test]
    async fn test_missing_source_never_reaches_service() {
        let staging = tempfile::tempdir().unwrap();
        let service = ScriptedService::new(FileState::Processing, vec![]);

        let err = Uploader::new(service.as_ref(), fast())
            .with_staging_dir(staging.path())
            .upload(Path::new("/definitely/not/here.mp4"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Io { .. }));
        assert!(service.staged_paths.lock().unwrap().is_empty());
        assert!(staging_is_empty(staging.path()));
    }
}
