use crate::api::{ApiClient, ApiConfig};
use crate::application::{DownloadSession, JobSubmitter, PollEvent, PollTag, StatusPoller};
use crate::domain::{Job, SubmissionError};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::clean_log_tail;
use futures::StreamExt;
use iced::Task;
use std::path::PathBuf;

pub struct DownloadApp {
    view: DownloadView,
    session: DownloadSession,
    api_client: ApiClient,
    submitter: JobSubmitter,
    poller: StatusPoller,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new(ApiConfig::from_env())
    }
}

impl DownloadApp {
    pub fn new(config: ApiConfig) -> Self {
        tracing::info!(backend = %config.base_url, "Using backend");

        let view = DownloadView::new(
            config.output_dir.display().to_string(),
            config.base_url.clone(),
        );
        let poll_interval = config.poll_interval;
        let api_client = ApiClient::new(config);

        Self {
            view,
            session: DownloadSession::new(),
            submitter: JobSubmitter::new(api_client.clone()),
            poller: StatusPoller::new(api_client.clone(), poll_interval),
            api_client,
        }
    }

    /// Copies what the session knows into the view.
    fn sync_view(&mut self) {
        let state = self.session.state();
        self.view.status_message = state.last_message.clone();
        self.view.job_id = state.current_job.as_ref().map(|job| job.id.clone());
        self.view.log = clean_log_tail(&state.last_log_tail);
        self.view.full_log = state.full_log.as_deref().map(clean_log_tail);
        self.view.is_busy = state.is_busy();
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    Submitted(PollTag, Result<Job, SubmissionError>),
    Poll(PollEvent),
    FolderSelected(Option<PathBuf>),
    LogFetched(PollTag, Result<String, String>),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::DownloadPressed if !app.view.is_busy => {
                    let request = app.view.request();
                    let started = app.session.begin_submission(&request);
                    app.sync_view();

                    if let Ok(tag) = started {
                        let submitter = app.submitter.clone();
                        return Task::perform(
                            async move { submitter.submit(&request).await },
                            move |result| Message::Submitted(tag, result),
                        );
                    }
                }
                DownloadMessage::BrowsePressed => {
                    return Task::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .set_title("Target folder")
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderSelected,
                    );
                }
                DownloadMessage::FullLogPressed => {
                    if let Some((tag, job_id)) = app.session.current() {
                        let client = app.api_client.clone();
                        let job_id = job_id.to_string();
                        return Task::perform(
                            async move { client.fetch_log(&job_id).await.map_err(|e| e.to_string()) },
                            move |result| Message::LogFetched(tag, result),
                        );
                    }
                }
                _ => {}
            }
        }
        Message::Submitted(tag, result) => {
            let stream = app.session.submission_finished(tag, result, &app.poller);
            app.sync_view();

            if let Some(stream) = stream {
                return Task::stream(stream.map(Message::Poll));
            }
        }
        Message::Poll(event) => {
            app.session.apply(event);
            app.sync_view();
        }
        Message::FolderSelected(path) => {
            // None means the user closed the dialog
            if let Some(path) = path {
                app.view.target_directory = path.display().to_string();
            }
        }
        Message::LogFetched(tag, result) => {
            app.session.log_fetched(tag, result);
            app.sync_view();
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
