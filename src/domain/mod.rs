pub mod error;
pub mod model;

pub use error::SubmissionError;
pub use model::{DownloadRequest, Job, JobOutcome, JobStatus, SessionState};
