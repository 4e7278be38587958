use std::time::Duration;

use encoding_api::{EncodingApi, Transport, models::Status};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, RemoteStep, Result};

/// How often, and for how long, to ask the service about a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the first poll.
    pub interval: Duration,
    /// Upper bound for the delay once backoff kicks in.
    pub max_interval: Duration,
    /// Factor applied to the delay after every non-terminal poll.
    pub multiplier: u32,
    /// None = wait until the job reaches a terminal state.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1,
            timeout: None,
        }
    }

    /// Doubles the delay after every poll, up to `max_interval`.
    pub fn backoff(interval: Duration, max_interval: Duration) -> Self {
        Self {
            interval,
            max_interval: max_interval.max(interval),
            multiplier: 2,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(self.multiplier).min(self.max_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

/// Blocks until an encoding reaches `FINISHED`, `ERROR` or `CANCELED`.
pub struct CompletionWaiter<'a, T> {
    api: &'a EncodingApi<T>,
    policy: PollPolicy,
}

impl<'a, T: Transport> CompletionWaiter<'a, T> {
    pub fn new(api: &'a EncodingApi<T>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Sleeps, then polls, until the status is terminal.
    ///
    /// `ERROR` becomes [`PipelineError::JobFailed`]. `CANCELED` is handed back
    /// as a normal outcome.
    pub async fn wait(&self, encoding_id: &str, cancel: &CancellationToken) -> Result<Status> {
        let started = Instant::now();
        let deadline = self.policy.timeout.map(|timeout| started + timeout);
        let mut delay = self.policy.interval;
        let mut polls = 0u32;

        let cancelled = || PipelineError::WaitCancelled {
            encoding_id: encoding_id.to_string(),
        };

        loop {
            let wake = match deadline {
                Some(deadline) => deadline.min(Instant::now() + delay),
                None => Instant::now() + delay,
            };
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep_until(wake) => {}
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(PipelineError::WaitTimedOut {
                    encoding_id: encoding_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            let task = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                task = self.api.encoding_status(encoding_id) => {
                    task.during("poll encoding status")?
                }
            };
            polls += 1;
            log::debug!(
                "encoding {}: {} (poll #{}, progress {:?})",
                encoding_id,
                task.status,
                polls,
                task.progress
            );

            match task.status {
                Status::Finished => {
                    log::info!("encoding {} finished after {:?}", encoding_id, started.elapsed());
                    return Ok(Status::Finished);
                }
                Status::Error => {
                    log::error!("encoding {} ended in ERROR", encoding_id);
                    return Err(PipelineError::JobFailed {
                        encoding_id: encoding_id.to_string(),
                    });
                }
                Status::Canceled => {
                    log::warn!("encoding {} was canceled on the service side", encoding_id);
                    return Ok(Status::Canceled);
                }
                _ => {}
            }

            delay = self.policy.next_delay(delay);
        }
    }
}
