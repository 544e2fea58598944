use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use super::models::{ApiConfig, DownloadBody, ErrorResponse, StatusResponse, SubmitResponse};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Non-success answer; `reason` is what the backend said about it.
    #[error("{reason}")]
    Rejected { status: u16, reason: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid backend address: {0}")]
    InvalidUrl(String),
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Builds `{base_url}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /download`. Only a 202 with a job id counts as accepted.
    pub async fn submit_download(&self, url: &str, output: &str) -> Result<SubmitResponse> {
        let endpoint = self.endpoint(&["download"])?;
        tracing::debug!(%endpoint, "Submitting download");

        let response = self
            .http
            .post(endpoint)
            .json(&DownloadBody { url, output })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::ACCEPTED {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.reason())
                .unwrap_or_else(|_| fallback_reason(status, &body));
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// `GET /status/{job_id}`. A non-success answer carries its body text verbatim.
    pub async fn get_status(&self, job_id: &str) -> Result<StatusResponse> {
        let endpoint = self.endpoint(&["status", job_id])?;

        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                reason: body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// `GET /logs/{job_id}`: the whole job log as plain text.
    pub async fn fetch_log(&self, job_id: &str) -> Result<String> {
        let endpoint = self.endpoint(&["logs", job_id])?;

        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.reason())
                .unwrap_or_else(|_| fallback_reason(status, &body));
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(body)
    }
}

fn fallback_reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("Backend responded with {}", status)
    } else {
        body.to_string()
    }
}
