use iced::{
    widget::{button, column, row, scrollable, text, text_input, Space},
    Element, Font, Length,
};

use crate::domain::DownloadRequest;

/// Main view state
pub struct DownloadView {
    pub source_url: String,
    pub target_directory: String,
    pub status_message: String,
    pub job_id: Option<String>,
    pub log: String,
    pub full_log: Option<String>,
    pub is_busy: bool,
    pub backend_url: String,
}

impl DownloadView {
    pub fn new(target_directory: String, backend_url: String) -> Self {
        Self {
            source_url: String::new(),
            target_directory,
            status_message: String::new(),
            job_id: None,
            log: String::new(),
            full_log: None,
            is_busy: false,
            backend_url,
        }
    }

    pub fn request(&self) -> DownloadRequest {
        DownloadRequest::new(self.source_url.trim(), self.target_directory.trim())
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    SourceUrlChanged(String),
    TargetDirectoryChanged(String),
    BrowsePressed,
    DownloadPressed,
    FullLogPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::SourceUrlChanged(url) => {
                self.source_url = url;
            }
            DownloadMessage::TargetDirectoryChanged(dir) => {
                self.target_directory = dir;
            }
            DownloadMessage::BrowsePressed
            | DownloadMessage::DownloadPressed
            | DownloadMessage::FullLogPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let download = button("Download")
            .on_press_maybe((!self.is_busy).then_some(DownloadMessage::DownloadPressed))
            .padding([10, 20]);

        let actions = if self.is_busy {
            row![download, text("Downloading...").size(14)]
        } else {
            row![download]
        }
        .spacing(10);

        let job = match &self.job_id {
            Some(id) => row![
                text(format!("Job: {}", id)).size(14),
                Space::new().width(Length::Fill),
                button("Full log")
                    .on_press(DownloadMessage::FullLogPressed)
                    .padding([4, 10]),
            ],
            None => row![],
        };

        let log = self.full_log.as_deref().unwrap_or(&self.log);

        column![
            text("MP3 Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("YouTube URL").size(16),
            text_input("https://...", &self.source_url)
                .on_input(DownloadMessage::SourceUrlChanged)
                .padding(10),
            text("Target folder").size(16),
            row![
                text_input("", &self.target_directory)
                    .on_input(DownloadMessage::TargetDirectoryChanged)
                    .padding(10),
                button("Browse...")
                    .on_press(DownloadMessage::BrowsePressed)
                    .padding(10),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            actions,
            text(format!("Status: {}", self.status_message)).size(14),
            job,
            scrollable(text(log).font(Font::MONOSPACE).size(12))
                .height(Length::Fixed(240.0))
                .width(Length::Fill),
            Space::new().height(Length::Fill),
            text(format!("Backend: {}", self.backend_url)).size(12),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}
