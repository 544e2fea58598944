mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::{window, Size};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> iced::Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mp3_job_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    iced::application(app::DownloadApp::default, app::update, app::view)
        .title("MP3 Downloader")
        .window(window::Settings {
            size: Size::new(560.0, 720.0),
            ..Default::default()
        })
        .run()
}
