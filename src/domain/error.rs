use thiserror::Error;

/// Why a submission did not produce a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Please provide a YouTube URL")]
    Validation,

    /// The backend answered, but not with "accepted".
    #[error("{reason}")]
    Rejected { status: u16, reason: String },

    #[error("Error: {0}")]
    Transport(String),
}
