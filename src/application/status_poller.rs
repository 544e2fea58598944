use std::time::Duration;

use futures::{stream::BoxStream, StreamExt};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiClient, ApiError},
    domain::{JobOutcome, JobStatus},
};

/// Shortest period a poller ticks at; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies one poller instance. Events from a superseded poller carry a stale tag.
pub type PollTag = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollUpdate {
    Status(JobStatus),
    /// Always the last update of a stream that was not cancelled.
    Finished(JobOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    pub tag: PollTag,
    pub update: PollUpdate,
}

/// Stops the ticking of one poller. Cloning shares the same cancellation.
#[derive(Debug, Clone)]
pub struct PollHandle {
    tag: PollTag,
    job_id: String,
    cancel: CancellationToken,
}

impl PollHandle {
    pub fn tag(&self) -> PollTag {
        self.tag
    }

    /// No further status queries happen after this returns. Safe to repeat.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(job_id = %self.job_id, tag = self.tag, "Polling cancelled");
        }
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Repeatedly asks the backend for a job's status on a fixed interval.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    api_client: ApiClient,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(api_client: ApiClient, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                interval_ms = interval.as_millis() as u64,
                "Poll interval too short, clamping"
            );
        }
        Self {
            api_client,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Starts watching `job_id`.
    ///
    /// The stream is lazy: the first query happens one interval after it is
    /// first polled, then once per interval. Queries never overlap; ticks missed
    /// while a slow query was in flight are skipped. The stream ends after
    /// emitting [`PollUpdate::Finished`], or silently once the handle is
    /// cancelled (an in-flight query is dropped).
    pub fn watch(
        &self,
        job_id: impl Into<String>,
        tag: PollTag,
    ) -> (PollHandle, BoxStream<'static, PollEvent>) {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();

        let handle = PollHandle {
            tag,
            job_id: job_id.clone(),
            cancel: cancel.clone(),
        };

        tracing::info!(
            %job_id,
            tag,
            interval_ms = self.interval.as_millis() as u64,
            "Polling started"
        );

        let stream = futures::stream::unfold(
            PollState::Start {
                client: self.api_client.clone(),
                job_id,
                period: self.interval,
                cancel,
                tag,
            },
            |state| async move {
                match state {
                    PollState::Start {
                        client,
                        job_id,
                        period,
                        cancel,
                        tag,
                    } => {
                        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        tick(client, job_id, ticker, cancel, tag).await
                    }
                    PollState::Ticking {
                        client,
                        job_id,
                        ticker,
                        cancel,
                        tag,
                    } => tick(client, job_id, ticker, cancel, tag).await,
                    PollState::Resolving { outcome, tag } => Some((
                        PollEvent {
                            tag,
                            update: PollUpdate::Finished(outcome),
                        },
                        PollState::Finished,
                    )),
                    PollState::Finished => None,
                }
            },
        );

        (handle, stream.boxed())
    }
}

enum PollState {
    Start {
        client: ApiClient,
        job_id: String,
        period: Duration,
        cancel: CancellationToken,
        tag: PollTag,
    },
    Ticking {
        client: ApiClient,
        job_id: String,
        ticker: Interval,
        cancel: CancellationToken,
        tag: PollTag,
    },
    /// Terminal status already emitted; the outcome follows.
    Resolving { outcome: JobOutcome, tag: PollTag },
    Finished,
}

async fn tick(
    client: ApiClient,
    job_id: String,
    mut ticker: Interval,
    cancel: CancellationToken,
    tag: PollTag,
) -> Option<(PollEvent, PollState)> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        _ = ticker.tick() => {}
    }

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(%job_id, tag, "Dropping in-flight status query");
            return None;
        }
        result = client.get_status(&job_id) => result,
    };

    match result {
        Ok(response) => {
            let status = JobStatus {
                running: response.running,
                log_tail: response.log_tail.unwrap_or_default(),
                return_code: response.returncode,
            };

            if status.running {
                tracing::debug!(%job_id, tag, "Job still running");
                return Some((
                    PollEvent {
                        tag,
                        update: PollUpdate::Status(status),
                    },
                    PollState::Ticking {
                        client,
                        job_id,
                        ticker,
                        cancel,
                        tag,
                    },
                ));
            }

            cancel.cancel();
            let outcome = JobOutcome::from_return_code(status.return_code);
            tracing::info!(%job_id, tag, return_code = ?status.return_code, "Job finished");
            Some((
                PollEvent {
                    tag,
                    update: PollUpdate::Status(status),
                },
                PollState::Resolving { outcome, tag },
            ))
        }
        Err(ApiError::Rejected { status, reason }) => {
            cancel.cancel();
            tracing::warn!(%job_id, tag, status, "Status query rejected");
            Some((
                PollEvent {
                    tag,
                    update: PollUpdate::Finished(JobOutcome::QueryError(reason)),
                },
                PollState::Finished,
            ))
        }
        Err(e) => {
            cancel.cancel();
            tracing::warn!(%job_id, tag, error = %e, "Status query failed");
            Some((
                PollEvent {
                    tag,
                    update: PollUpdate::Finished(JobOutcome::PollError(e.to_string())),
                },
                PollState::Finished,
            ))
        }
    }
}
