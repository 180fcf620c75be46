//! Generate-then-save flow for message audio.
//!
//! Each entry has its own task state. While an entry is generating, further
//! triggers for it are rejected; other entries are independent. The guard
//! inside every spawned task reports back when the task ends however it ends,
//! so an entry can never stay stuck in `Generating`.

use std::collections::HashMap;

use mailcast_proto::message::audio_file_name;
use mailcast_proto::MailApi;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::save::SaveAs;

pub const DOWNLOAD_LABEL: &str = "⬇ download";
pub const BUSY_LABEL: &str = "downloading…";

/// Per-entry download task state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    /// Control enabled, nothing running
    Idle,
    /// Waiting for the backend to generate the merged file
    Generating,
    /// Save was handed off; returns to Idle immediately
    Ready,
    /// Generation or hand-off failed; returns to Idle immediately
    Failed(String),
}

/// What an entry's download control should look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadControl {
    pub enabled: bool,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { url: String, file_name: String },
    Failed(String),
}

/// Sent by a download task when it ends.
#[derive(Debug)]
pub struct DownloadEvent {
    pub message_id: String,
    pub outcome: DownloadOutcome,
}

/// Reports the task's outcome on drop, including when the task is aborted.
struct CompletionGuard {
    message_id: String,
    outcome: Option<DownloadOutcome>,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl CompletionGuard {
    fn finish(mut self, outcome: DownloadOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| DownloadOutcome::Failed("download task ended unexpectedly".into()));
        let _ = self.events.send(DownloadEvent {
            message_id: std::mem::take(&mut self.message_id),
            outcome,
        });
    }
}

pub struct DownloadController<S> {
    api: MailApi,
    saver: S,
    tasks: HashMap<String, DownloadState>,
    events: mpsc::UnboundedSender<DownloadEvent>,
}

impl<S: SaveAs> DownloadController<S> {
    pub fn new(api: MailApi, saver: S, events: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        Self {
            api,
            saver,
            tasks: HashMap::new(),
            events,
        }
    }

    pub fn state(&self, message_id: &str) -> DownloadState {
        self.tasks
            .get(message_id)
            .cloned()
            .unwrap_or(DownloadState::Idle)
    }

    pub fn control(&self, message_id: &str) -> DownloadControl {
        match self.state(message_id) {
            DownloadState::Generating => DownloadControl {
                enabled: false,
                label: BUSY_LABEL,
            },
            _ => DownloadControl {
                enabled: true,
                label: DOWNLOAD_LABEL,
            },
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks
            .values()
            .filter(|s| **s == DownloadState::Generating)
            .count()
    }

    /// Start generating audio for `message_id`. Returns false if a task for
    /// this entry is already running.
    pub fn trigger(&mut self, message_id: &str) -> bool {
        if self.state(message_id) == DownloadState::Generating {
            debug!("[download] {} already generating, ignoring", message_id);
            return false;
        }
        self.tasks
            .insert(message_id.to_string(), DownloadState::Generating);
        info!("[download] generating audio for {}", message_id);

        let guard = CompletionGuard {
            message_id: message_id.to_string(),
            outcome: None,
            events: self.events.clone(),
        };
        let api = self.api.clone();
        let saver = self.saver.clone();
        let id = message_id.to_string();
        tokio::spawn(async move {
            let outcome = generate_and_save(&api, &saver, &id).await;
            guard.finish(outcome);
        });
        true
    }

    /// Record a finished task. The entry goes back to Idle and the outcome is
    /// returned for the UI to surface.
    pub fn apply(&mut self, event: DownloadEvent) -> DownloadOutcome {
        let transient = match &event.outcome {
            DownloadOutcome::Saved { .. } => DownloadState::Ready,
            DownloadOutcome::Failed(reason) => DownloadState::Failed(reason.clone()),
        };
        debug!("[download] {} {:?} → Idle", event.message_id, transient);
        self.tasks.remove(&event.message_id);
        event.outcome
    }
}

async fn generate_and_save<S: SaveAs>(api: &MailApi, saver: &S, id: &str) -> DownloadOutcome {
    if let Err(e) = api.generate_audio(id).await {
        error!("[download] generating {} failed: {}", id, e);
        return DownloadOutcome::Failed(e.to_string());
    }

    let url = api.download_url(id);
    let file_name = audio_file_name(id);
    info!("[download] {} ready, saving as {}", id, file_name);
    match saver.save_as(&url, &file_name) {
        Ok(()) => DownloadOutcome::Saved { url, file_name },
        Err(e) => {
            error!("[download] save for {} failed: {:#}", id, e);
            DownloadOutcome::Failed(format!("{:#}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSaver;
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn controller(
        server: &MockServer,
        saver: RecordingSaver,
    ) -> (
        DownloadController<RecordingSaver>,
        mpsc::UnboundedReceiver<DownloadEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = MailApi::new(&server.uri()).unwrap();
        (DownloadController::new(api, saver, tx), rx)
    }

    #[tokio::test]
    async fn test_success_saves_with_suggested_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/18c2f/tts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let saver = RecordingSaver::default();
        let (mut downloads, mut rx) = controller(&server, saver.clone());

        assert!(downloads.trigger("18c2f"));
        assert_eq!(
            downloads.control("18c2f"),
            DownloadControl {
                enabled: false,
                label: BUSY_LABEL
            }
        );

        let event = rx.recv().await.unwrap();
        let outcome = downloads.apply(event);
        assert_eq!(
            outcome,
            DownloadOutcome::Saved {
                url: format!("{}/audios/merged/18c2f.mp3", server.uri()),
                file_name: "18c2f.mp3".to_string(),
            }
        );
        assert_eq!(downloads.state("18c2f"), DownloadState::Idle);
        assert_eq!(saver.saved().len(), 1);
        assert_eq!(saver.saved()[0].1, "18c2f.mp3");
    }

    #[tokio::test]
    async fn test_rapid_triggers_issue_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/a/tts"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let saver = RecordingSaver::default();
        let (mut downloads, mut rx) = controller(&server, saver.clone());

        assert!(downloads.trigger("a"));
        assert!(!downloads.trigger("a"));
        assert_eq!(downloads.in_flight(), 1);

        let event = rx.recv().await.unwrap();
        downloads.apply(event);
        assert_eq!(saver.saved().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_entries_are_independent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
            .expect(2)
            .mount(&server)
            .await;

        let (mut downloads, mut rx) = controller(&server, RecordingSaver::default());

        assert!(downloads.trigger("a"));
        assert!(downloads.trigger("b"));
        assert_eq!(downloads.in_flight(), 2);

        let mut finished = vec![rx.recv().await.unwrap().message_id, rx.recv().await.unwrap().message_id];
        finished.sort();
        assert_eq!(finished, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_failure_restores_control() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/a/tts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let saver = RecordingSaver::default();
        let (mut downloads, mut rx) = controller(&server, saver.clone());

        downloads.trigger("a");
        let event = rx.recv().await.unwrap();
        assert!(matches!(downloads.apply(event), DownloadOutcome::Failed(_)));

        assert_eq!(
            downloads.control("a"),
            DownloadControl {
                enabled: true,
                label: DOWNLOAD_LABEL
            }
        );
        assert!(saver.saved().is_empty());

        // Retrying is allowed once the control is back.
        assert!(downloads.trigger("a"));
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let saver = RecordingSaver {
            fail: true,
            ..Default::default()
        };
        let (mut downloads, mut rx) = controller(&server, saver);

        downloads.trigger("a");
        let outcome = downloads.apply(rx.recv().await.unwrap());
        assert!(matches!(outcome, DownloadOutcome::Failed(reason) if reason.contains("save dialog")));
        assert_eq!(downloads.state("a"), DownloadState::Idle);
    }

    #[test]
    fn test_guard_reports_when_dropped_unfinished() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = CompletionGuard {
            message_id: "a".into(),
            outcome: None,
            events: tx,
        };
        drop(guard);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.message_id, "a");
        assert!(matches!(event.outcome, DownloadOutcome::Failed(_)));
    }
}
