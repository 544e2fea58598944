use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use super::error::SubmissionError;

/// What the user asked for: a source URL and the folder the backend writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub target_directory: PathBuf,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, target_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            target_directory: target_directory.into(),
        }
    }

    /// Rejects the request locally, before anything touches the network.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.source_url.trim().is_empty() {
            return Err(SubmissionError::Validation);
        }
        Ok(())
    }
}

/// A backend job. Only ever built from an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub pid: Option<u32>,
    pub created_at: Instant,
}

impl Job {
    pub fn new(id: impl Into<String>, pid: Option<u32>) -> Self {
        Self {
            id: id.into(),
            pid,
            created_at: Instant::now(),
        }
    }
}

/// One status sample as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobStatus {
    pub running: bool,
    pub log_tail: String,
    pub return_code: Option<i32>,
}

/// How a watched job ended, from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(i32),
    FinishedUnknown,
    /// The status endpoint answered with a non-success response.
    QueryError(String),
    /// The status query never got a usable answer.
    PollError(String),
}

impl JobOutcome {
    pub fn from_return_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => JobOutcome::Success,
            Some(code) => JobOutcome::Failed(code),
            None => JobOutcome::FinishedUnknown,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "Job finished successfully"),
            JobOutcome::Failed(code) => write!(f, "Job finished with return code {}", code),
            JobOutcome::FinishedUnknown => write!(f, "Job finished"),
            JobOutcome::QueryError(text) => write!(f, "Error getting status: {}", text),
            JobOutcome::PollError(cause) => write!(f, "Error polling status: {}", cause),
        }
    }
}

/// Client-local view of the current job. Read by the UI, written by the session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub current_job: Option<Job>,
    pub is_submitting: bool,
    pub is_polling: bool,
    pub last_message: String,
    pub last_log_tail: String,
    pub outcome: Option<JobOutcome>,
    pub full_log: Option<String>,
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        self.is_submitting || self.is_polling
    }
}
