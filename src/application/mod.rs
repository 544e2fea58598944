pub mod job_submitter;
pub mod session;
pub mod status_poller;

pub use job_submitter::JobSubmitter;
pub use session::DownloadSession;
pub use status_poller::{PollEvent, PollTag, StatusPoller};
