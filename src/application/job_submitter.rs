use crate::{
    api::{ApiClient, ApiError},
    domain::{DownloadRequest, Job, SubmissionError},
};

/// Turns a [`DownloadRequest`] into a backend [`Job`]. Does not start polling.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    api_client: ApiClient,
}

impl JobSubmitter {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    pub async fn submit(&self, request: &DownloadRequest) -> Result<Job, SubmissionError> {
        request.validate()?;

        let output = request.target_directory.to_string_lossy();
        let response = self
            .api_client
            .submit_download(&request.source_url, &output)
            .await
            .map_err(|e| match e {
                ApiError::Rejected { status, reason } => {
                    tracing::warn!(status, %reason, "Backend rejected submission");
                    SubmissionError::Rejected { status, reason }
                }
                other => {
                    tracing::warn!(error = %other, "Submission failed");
                    SubmissionError::Transport(other.to_string())
                }
            })?;

        tracing::info!(job_id = %response.job_id, pid = ?response.pid, "Job accepted");
        Ok(Job::new(response.job_id, response.pid))
    }
}
