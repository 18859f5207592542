//! Processing state poller

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::client::VideoService;
use crate::core::errors::{AnalysisError, Result};
use crate::core::models::{FileState, RemoteFile};

/// Snapshot handed to a [`ProgressObserver`] once per poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PollProgress {
    /// Remote file identifier
    pub name: String,
    /// State seen before this cycle's fetch
    pub state: FileState,
    /// 1-based number of the status fetch about to be issued
    pub attempt: u32,
    /// Time spent waiting so far
    pub elapsed: Duration,
}

/// Receives one notification per poll cycle
///
/// Called on the polling task itself, so implementations must return
/// quickly and must not panic.
pub trait ProgressObserver: Send + Sync {
    /// Called before each sleep
    fn on_poll(&self, progress: &PollProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&PollProgress) + Send + Sync,
{
    fn on_poll(&self, progress: &PollProgress) {
        self(progress)
    }
}

/// Polling cadence and bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Fixed sleep between status fetches
    pub interval: Duration,
    /// Most status fetches allowed; `None` keeps polling for as long as
    /// the file is pending
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: Some(900),
        }
    }
}

/// How a file reached its terminal state
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// The file in its ACTIVE state
    pub file: RemoteFile,
    /// Fetches issued while the file was PROCESSING
    pub polls: u32,
    /// Time spent in the loop
    pub elapsed: Duration,
}

/// Drive `file` until the service stops reporting it as pending
///
/// Returns the ACTIVE file; FAILED becomes `RemoteProcessing`, and an
/// unspecified or unknown state becomes `UnexpectedState`, as does any
/// step backwards through the lifecycle.
///
/// Cycles that start in UPLOADING wait like any other but are not counted
/// in [`PollOutcome::polls`]; the bound applies to every status fetch.
pub async fn wait_until_ready(
    service: &dyn VideoService,
    mut file: RemoteFile,
    settings: PollSettings,
    observer: Option<&dyn ProgressObserver>,
) -> Result<PollOutcome> {
    let started = Instant::now();
    let mut fetches = 0_u32;
    let mut polls = 0_u32;

    while file.state.is_pending() {
        if let Some(max) = settings.max_attempts {
            if fetches >= max {
                warn!("Gave up on {} after {} polls", file.name, fetches);
                return Err(AnalysisError::PollTimeout {
                    name: file.name,
                    attempts: fetches,
                });
            }
        }

        let progress = PollProgress {
            name: file.name.clone(),
            state: file.state,
            attempt: fetches + 1,
            elapsed: started.elapsed(),
        };
        match observer {
            Some(observer) => observer.on_poll(&progress),
            None => debug!("Waiting for video to be processed... ({})", progress.attempt),
        }

        sleep(settings.interval).await;

        let refreshed = service.get_status(&file.name).await?;
        fetches += 1;
        if file.state == FileState::Processing {
            polls += 1;
        }

        if !file.state.can_transition_to(refreshed.state) {
            warn!(
                "Remote file {} moved from {} to {}",
                file.name, file.state, refreshed.state
            );
            return Err(AnalysisError::UnexpectedState {
                name: file.name,
                state: refreshed.state,
            });
        }
        file = refreshed;
    }

    let elapsed = started.elapsed();
    match file.state {
        FileState::Active => {
            info!(
                "Video ready after {} polls ({:.1}s): {}",
                polls,
                elapsed.as_secs_f64(),
                file.uri.as_deref().unwrap_or(&file.name)
            );
            Ok(PollOutcome {
                file,
                polls,
                elapsed,
            })
        }
        FileState::Failed => Err(AnalysisError::RemoteProcessing { name: file.name }),
        state => Err(AnalysisError::UnexpectedState {
            name: file.name,
            state,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::{AnalysisRequest, AnalysisResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory service that replays a fixed sequence of states
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        pub upload_state: Mutex<Option<FileState>>,
        pub upload_error: Mutex<Option<AnalysisError>>,
        pub statuses: Mutex<VecDeque<Result<FileState>>>,
        pub history: Mutex<Vec<FileState>>,
        pub staged_paths: Mutex<Vec<(PathBuf, bool)>>,
        pub display_names: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<String>>,
        pub status_calls: AtomicUsize,
        pub generate_calls: AtomicUsize,
        pub reply: Mutex<Option<AnalysisResponse>>,
    }

    impl ScriptedService {
        pub fn new(upload_state: FileState, statuses: Vec<FileState>) -> Arc<Self> {
            Arc::new(Self {
                upload_state: Mutex::new(Some(upload_state)),
                statuses: Mutex::new(statuses.into_iter().map(Ok).collect()),
                ..Default::default()
            })
        }

        pub fn with_reply(self: Arc<Self>, reply: AnalysisResponse) -> Arc<Self> {
            *self.reply.lock().unwrap() = Some(reply);
            self
        }

        pub fn file(name: &str, state: FileState) -> RemoteFile {
            let file = RemoteFile::new(name, state);
            if state == FileState::Active {
                file.with_uri(format!("https://example.test/v1beta/{}", name))
            } else {
                file
            }
        }
    }

    #[async_trait]
    impl VideoService for ScriptedService {
        async fn upload(&self, path: &Path, display_name: &str, _mime: &str) -> Result<RemoteFile> {
            self.staged_paths
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.exists()));
            self.display_names.lock().unwrap().push(display_name.to_string());

            if let Some(err) = self.upload_error.lock().unwrap().take() {
                return Err(err);
            }

            let state = self.upload_state.lock().unwrap().unwrap_or(FileState::Processing);
            self.history.lock().unwrap().push(state);
            Ok(Self::file("files/scripted", state).with_display_name(display_name))
        }

        async fn get_status(&self, name: &str) -> Result<RemoteFile> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(FileState::Processing))?;
            self.history.lock().unwrap().push(next);
            Ok(Self::file(name, next))
        }

        async fn generate(&self, _model_id: &str, request: &AnalysisRequest) -> Result<AnalysisResponse> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push(request.prompt_text().to_string());
            Ok(self
                .reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| AnalysisResponse::new("scripted reply")))
        }
    }

    pub(crate) fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(5),
            max_attempts: Some(50),
        }
    }

    #[tokio::test]
    async fn test_uploading_then_processing_twice_takes_two_polls() {
        let service = ScriptedService::new(
            FileState::Uploading,
            vec![FileState::Processing, FileState::Processing, FileState::Active],
        );
        let initial = service
            .upload(Path::new("/tmp/x.mp4"), "x.mp4", "video/mp4")
            .await
            .unwrap();

        let outcome = wait_until_ready(service.as_ref(), initial, fast(), None)
            .await
            .unwrap();

        assert_eq!(outcome.polls, 2);
        assert_eq!(outcome.file.state, FileState::Active);
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *service.history.lock().unwrap(),
            vec![
                FileState::Uploading,
                FileState::Processing,
                FileState::Processing,
                FileState::Active
            ]
        );
    }

    #[tokio::test]
    async fn test_processing_then_active_takes_two_polls() {
        let service = ScriptedService::new(
            FileState::Processing,
            vec![FileState::Processing, FileState::Active],
        );
        let file = ScriptedService::file("files/clip", FileState::Processing);

        let outcome = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap();

        assert_eq!(outcome.polls, 2);
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backward_transition_fails_loudly() {
        let service = ScriptedService::new(
            FileState::Processing,
            vec![FileState::Uploading, FileState::Active],
        );
        let file = ScriptedService::file("files/rewound", FileState::Processing);

        let err = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap_err();

        match err {
            AnalysisError::UnexpectedState { name, state } => {
                assert_eq!(name, "files/rewound");
                assert_eq!(state, FileState::Uploading);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unspecified_state_mid_poll_fails_loudly() {
        let service = ScriptedService::new(FileState::Processing, vec![FileState::StateUnspecified]);
        let file = ScriptedService::file("files/blank", FileState::Processing);

        let err = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::UnexpectedState {
                state: FileState::StateUnspecified,
                ..
            }
        ));
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_active_file_is_not_polled() {
        let service = ScriptedService::new(FileState::Active, vec![]);
        let file = ScriptedService::file("files/ready", FileState::Active);

        let outcome = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap();

        assert_eq!(outcome.polls, 0);
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_state_is_remote_processing_error() {
        let service = ScriptedService::new(FileState::Processing, vec![FileState::Failed]);
        let file = ScriptedService::file("files/broken", FileState::Processing);

        let err = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap_err();

        match err {
            AnalysisError::RemoteProcessing { name } => assert_eq!(name, "files/broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_state_fails_loudly() {
        let service = ScriptedService::new(FileState::Processing, vec![FileState::Unknown]);
        let file = ScriptedService::file("files/odd", FileState::Processing);

        let err = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::UnexpectedState {
                state: FileState::Unknown,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_poll_bound_is_enforced() {
        let service = ScriptedService::new(FileState::Processing, vec![]);
        let file = ScriptedService::file("files/stuck", FileState::Processing);
        let settings = PollSettings {
            interval: Duration::from_millis(1),
            max_attempts: Some(3),
        };

        let err = wait_until_ready(service.as_ref(), file, settings, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::PollTimeout { attempts: 3, .. }));
        assert_eq!(service.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_observer_notified_once_per_cycle() {
        let service = ScriptedService::new(
            FileState::Processing,
            vec![FileState::Processing, FileState::Processing, FileState::Active],
        );
        let file = ScriptedService::file("files/watched", FileState::Processing);
        let seen = Mutex::new(Vec::new());
        let observer = |p: &PollProgress| seen.lock().unwrap().push(p.attempt);

        let outcome = wait_until_ready(service.as_ref(), file, fast(), Some(&observer))
            .await
            .unwrap();

        assert_eq!(outcome.polls, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_status_errors_propagate() {
        let service = ScriptedService::new(FileState::Processing, vec![]);
        service
            .statuses
            .lock()
            .unwrap()
            .push_back(Err(AnalysisError::service("get_status", "connection reset")));
        let file = ScriptedService::file("files/net", FileState::Processing);

        let err = wait_until_ready(service.as_ref(), file, fast(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Service { operation: "get_status", .. }));
    }
}
