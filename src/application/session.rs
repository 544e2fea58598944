use futures::stream::BoxStream;

use super::status_poller::{PollEvent, PollHandle, PollTag, PollUpdate, StatusPoller};
use crate::domain::{DownloadRequest, Job, SessionState, SubmissionError};

/// Owns the [`SessionState`] of the single active job.
///
/// Every submission gets a fresh tag. Starting a new submission cancels and
/// forgets the previous poller, so results carrying an older tag (a late
/// submission answer, a tick that was already in flight) are ignored.
#[derive(Debug, Default)]
pub struct DownloadSession {
    state: SessionState,
    active_tag: Option<PollTag>,
    poller: Option<PollHandle>,
    next_tag: PollTag,
}

impl DownloadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Resets the session for a new submission and returns its tag.
    ///
    /// Fails locally, without issuing a tag, when the request is invalid.
    pub fn begin_submission(&mut self, request: &DownloadRequest) -> Result<PollTag, SubmissionError> {
        self.stop_polling();
        self.active_tag = None;
        self.state = SessionState::default();

        if let Err(e) = request.validate() {
            self.state.last_message = e.to_string();
            return Err(e);
        }

        self.next_tag += 1;
        let tag = self.next_tag;
        self.active_tag = Some(tag);
        self.state.is_submitting = true;
        tracing::debug!(tag, url = %request.source_url, "Submission started");
        Ok(tag)
    }

    /// Records the submission result. On success returns the stream of poll
    /// events for the new job; the caller drives it and feeds it to [`apply`].
    ///
    /// [`apply`]: DownloadSession::apply
    pub fn submission_finished(
        &mut self,
        tag: PollTag,
        result: Result<Job, SubmissionError>,
        poller: &StatusPoller,
    ) -> Option<BoxStream<'static, PollEvent>> {
        if self.active_tag != Some(tag) {
            tracing::debug!(tag, "Ignoring stale submission result");
            return None;
        }
        self.state.is_submitting = false;

        match result {
            Ok(job) => {
                let (handle, stream) = poller.watch(job.id.clone(), tag);
                self.state.last_message = format!("Download started (job {})", job.id);
                self.state.current_job = Some(job);
                self.state.is_polling = true;
                self.poller = Some(handle);
                Some(stream)
            }
            Err(e) => {
                self.state.last_message = e.to_string();
                self.active_tag = None;
                None
            }
        }
    }

    pub fn apply(&mut self, event: PollEvent) {
        if !self.is_current(event.tag) {
            tracing::debug!(tag = event.tag, "Ignoring stale poll event");
            return;
        }

        match event.update {
            PollUpdate::Status(status) => {
                // A fetched full log is a snapshot; newer output supersedes it.
                self.state.full_log = None;
                self.state.last_log_tail = status.log_tail;
            }
            PollUpdate::Finished(outcome) => {
                self.stop_polling();
                if let Some(job) = &self.state.current_job {
                    tracing::info!(
                        job_id = %job.id,
                        elapsed_ms = job.created_at.elapsed().as_millis() as u64,
                        %outcome,
                        "Job resolved"
                    );
                }
                self.state.last_message = outcome.to_string();
                self.state.outcome = Some(outcome);
            }
        }
    }

    /// Stores a full log fetched on demand for the job tagged `tag`.
    pub fn log_fetched(&mut self, tag: PollTag, result: Result<String, String>) {
        if self.active_tag != Some(tag) {
            return;
        }
        match result {
            Ok(log) => self.state.full_log = Some(log),
            Err(e) => self.state.last_message = format!("Error fetching log: {}", e),
        }
    }

    /// Tag and job id of the current job, if any.
    pub fn current(&self) -> Option<(PollTag, &str)> {
        let tag = self.active_tag?;
        let job = self.state.current_job.as_ref()?;
        Some((tag, job.id.as_str()))
    }

    pub fn teardown(&mut self) {
        self.stop_polling();
        self.active_tag = None;
        self.state.is_submitting = false;
    }

    fn is_current(&self, tag: PollTag) -> bool {
        self.poller.as_ref().map(PollHandle::tag) == Some(tag)
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.cancel();
        }
        self.state.is_polling = false;
    }
}

impl Drop for DownloadSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::{
        api::{ApiClient, ApiConfig},
        application::JobSubmitter,
        domain::{JobOutcome, JobStatus},
    };

    fn services(base_url: String) -> (JobSubmitter, StatusPoller) {
        let client = ApiClient::new(
            ApiConfig::default()
                .with_base_url(base_url)
                .with_poll_interval(Duration::from_millis(20)),
        );
        let interval = client.config().poll_interval;
        (
            JobSubmitter::new(client.clone()),
            StatusPoller::new(client, interval),
        )
    }

    async fn run(
        session: &mut DownloadSession,
        submitter: &JobSubmitter,
        poller: &StatusPoller,
        request: DownloadRequest,
    ) {
        let Ok(tag) = session.begin_submission(&request) else {
            return;
        };
        let result = submitter.submit(&request).await;
        if let Some(mut stream) = session.submission_finished(tag, result, poller) {
            while let Some(event) = stream.next().await {
                session.apply(event);
            }
        }
    }

    #[tokio::test]
    async fn test_successful_job() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"url": "https://x/y", "output": "/tmp"}),
            ))
            .with_status(202)
            .with_body(r#"{"job_id":"42"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/status/42")
            .with_status(200)
            .with_body(r#"{"running":true,"log_tail":"a"}"#)
            .expect(1)
            .create_async()
            .await;
        let last = server
            .mock("GET", "/status/42")
            .with_status(200)
            .with_body(r#"{"running":false,"log_tail":"ab","returncode":0}"#)
            .expect(1)
            .create_async()
            .await;

        let (submitter, poller) = services(server.url());
        let mut session = DownloadSession::new();
        run(
            &mut session,
            &submitter,
            &poller,
            DownloadRequest::new("https://x/y", "/tmp"),
        )
        .await;

        let state = session.state();
        assert_eq!(state.last_message, "Job finished successfully");
        assert_eq!(state.last_log_tail, "ab");
        assert_eq!(state.outcome, Some(JobOutcome::Success));
        assert_eq!(state.current_job.as_ref().map(|j| j.id.as_str()), Some("42"));
        assert!(!state.is_busy());
        last.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_url_prompts_without_network() {
        let mut server = mockito::Server::new_async().await;
        let submit = server
            .mock("POST", "/download")
            .expect(0)
            .create_async()
            .await;

        let (submitter, poller) = services(server.url());
        let mut session = DownloadSession::new();
        run(
            &mut session,
            &submitter,
            &poller,
            DownloadRequest::new("", "/tmp"),
        )
        .await;

        assert_eq!(session.state().last_message, "Please provide a YouTube URL");
        assert!(!session.state().is_busy());
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_submission_does_not_poll() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(500)
            .with_body(r#"{"error":"disk full"}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (submitter, poller) = services(server.url());
        let mut session = DownloadSession::new();
        run(
            &mut session,
            &submitter,
            &poller,
            DownloadRequest::new("https://x/y", "/tmp"),
        )
        .await;

        assert_eq!(session.state().last_message, "disk full");
        assert!(session.state().current_job.is_none());
        assert!(!session.state().is_busy());
        status.assert_async().await;
    }

    #[tokio::test]
    async fn test_poll_transport_failure_stops_polling() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(202)
            .with_body(r#"{"job_id":"42"}"#)
            .create_async()
            .await;
        let submitter = services(server.url()).0;

        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let poller = services(format!("http://127.0.0.1:{}", port)).1;

        let mut session = DownloadSession::new();
        run(
            &mut session,
            &submitter,
            &poller,
            DownloadRequest::new("https://x/y", "/tmp"),
        )
        .await;

        let state = session.state();
        assert!(state.last_message.starts_with("Error polling status: "));
        assert!(matches!(state.outcome, Some(JobOutcome::PollError(_))));
        assert!(!state.is_polling);
    }

    #[tokio::test]
    async fn test_new_submission_supersedes_old_poller() {
        let mut server = mockito::Server::new_async().await;
        let (_, poller) = services(server.url());
        let old_status = server
            .mock("GET", "/status/old")
            .expect(0)
            .create_async()
            .await;

        let mut session = DownloadSession::new();
        let request = DownloadRequest::new("https://x/y", "/tmp");

        let first = session.begin_submission(&request).unwrap();
        let mut old_stream = session
            .submission_finished(first, Ok(Job::new("old", None)), &poller)
            .unwrap();

        let second = session.begin_submission(&request).unwrap();
        assert_ne!(first, second);
        assert_eq!(session.state().last_message, "");
        assert!(session.state().current_job.is_none());

        // The superseded poller is cancelled and ends without querying.
        assert_eq!(old_stream.next().await, None);

        // Late events from the old poller are dropped.
        session.apply(PollEvent {
            tag: first,
            update: PollUpdate::Status(JobStatus {
                running: true,
                log_tail: "stale".into(),
                return_code: None,
            }),
        });
        assert_eq!(session.state().last_log_tail, "");

        // So is a late answer to the old submission.
        assert!(session
            .submission_finished(first, Ok(Job::new("late", None)), &poller)
            .is_none());
        assert!(session.state().current_job.is_none());
        assert!(session.state().is_submitting);

        tokio::time::sleep(Duration::from_millis(100)).await;
        old_status.assert_async().await;
    }

    #[tokio::test]
    async fn test_teardown_cancels_polling() {
        let server = mockito::Server::new_async().await;
        let (_, poller) = services(server.url());

        let mut session = DownloadSession::new();
        let tag = session
            .begin_submission(&DownloadRequest::new("https://x/y", "/tmp"))
            .unwrap();
        let mut stream = session
            .submission_finished(tag, Ok(Job::new("42", None)), &poller)
            .unwrap();
        assert!(session.state().is_polling);

        session.teardown();
        session.teardown();
        assert!(!session.state().is_busy());
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_status_update_replaces_full_log_snapshot() {
        let server = mockito::Server::new_async().await;
        let (_, poller) = services(server.url());

        let mut session = DownloadSession::new();
        let tag = session
            .begin_submission(&DownloadRequest::new("https://x/y", "/tmp"))
            .unwrap();
        let _stream = session
            .submission_finished(tag, Ok(Job::new("42", None)), &poller)
            .unwrap();

        session.log_fetched(tag, Ok("snapshot".into()));
        assert_eq!(session.state().full_log.as_deref(), Some("snapshot"));

        session.apply(PollEvent {
            tag,
            update: PollUpdate::Status(JobStatus {
                running: false,
                log_tail: "ab".into(),
                return_code: Some(0),
            }),
        });
        assert_eq!(session.state().full_log, None);
        assert_eq!(session.state().last_log_tail, "ab");
    }

    #[tokio::test]
    async fn test_superseding_during_in_flight_query_applies_nothing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();
        let backend = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let _ = accepted_tx.send(());
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let (_, poller) = services(format!("http://{}", addr));
        let mut session = DownloadSession::new();
        let request = DownloadRequest::new("https://x/y", "/tmp");
        let first = session.begin_submission(&request).unwrap();
        let stream = session
            .submission_finished(first, Ok(Job::new("42", None)), &poller)
            .unwrap();
        let pending = tokio::spawn(stream.collect::<Vec<PollEvent>>());

        tokio::time::timeout(Duration::from_secs(5), accepted_rx)
            .await
            .unwrap()
            .unwrap();
        session.begin_submission(&request).unwrap();

        let late = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(late.is_empty());
        assert_eq!(session.state().last_log_tail, "");
        assert_eq!(session.state().outcome, None);
        backend.abort();
    }

    #[test]
    fn test_log_fetch_for_stale_job_is_ignored() {
        let mut session = DownloadSession::new();
        let tag = session
            .begin_submission(&DownloadRequest::new("https://x/y", "/tmp"))
            .unwrap();

        session.log_fetched(tag + 1, Ok("other".into()));
        assert_eq!(session.state().full_log, None);

        session.log_fetched(tag, Ok("full".into()));
        assert_eq!(session.state().full_log.as_deref(), Some("full"));
    }
}
