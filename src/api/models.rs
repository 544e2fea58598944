use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::default_output_dir;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Body of `POST /download`
#[derive(Debug, Clone, Serialize)]
pub struct DownloadBody<'a> {
    pub url: &'a str,
    pub output: &'a str,
}

/// Body of a `202 Accepted` answer to `POST /download`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    #[serde(default)]
    pub pid: Option<u32>,
}

/// Structured rejection the backend sends with non-202 answers
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn reason(&self) -> String {
        if self.details.is_empty() {
            self.error.clone()
        } else {
            format!("{}: {}", self.error, self.details.join(", "))
        }
    }
}

/// Response from `GET /status/{job_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    #[serde(default)]
    pub log_tail: Option<String>,
    #[serde(default)]
    pub returncode: Option<i32>,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub output_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            output_dir: default_output_dir(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `MP3_BACKEND_URL`      | `http://localhost:5000`  |
    /// | `MP3_POLL_INTERVAL_MS` | `2000`                   |
    /// | `MP3_OUTPUT_DIR`       | platform default folder  |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("MP3_BACKEND_URL") {
            config = config.with_base_url(base_url);
        }

        if let Ok(raw) = std::env::var("MP3_POLL_INTERVAL_MS") {
            match parse_interval_ms(&raw) {
                Some(ms) => config = config.with_poll_interval(Duration::from_millis(ms)),
                None => tracing::warn!(value = %raw, "Ignoring invalid MP3_POLL_INTERVAL_MS"),
            }
        }

        if let Ok(output_dir) = std::env::var("MP3_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(output_dir);
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn parse_interval_ms(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|ms| *ms > 0)
}
