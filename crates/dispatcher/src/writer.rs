//! Durable writer - one insert plus bounded failover
//!
//! A write is keyed by `Event::id`, so retrying after an ambiguous failure is
//! safe: if the earlier attempt landed, the retry sees `Duplicate` and the
//! write still counts as successful.

use std::time::Duration;

use contracts::{Event, FailoverConfig, InsertError, ShardBackend};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::handle::ShardHandle;

/// Terminal result of writing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Inserted by this write
    Stored { attempts: u32 },
    /// Backend already held the id
    AlreadyStored { attempts: u32 },
    /// Given up: failover exhausted or the backend rejected the document
    Abandoned { attempts: u32, error: InsertError },
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Abandoned { .. })
    }

    /// Total insert attempts, the first one included
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Stored { attempts }
            | Self::AlreadyStored { attempts }
            | Self::Abandoned { attempts, .. } => *attempts,
        }
    }

    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stored { .. } => "stored",
            Self::AlreadyStored { .. } => "duplicate",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}

/// Retry schedule for transient backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Attempts per round
    pub max_attempts: u32,
    /// Delay between attempts within a round
    pub retry_delay: Duration,
    /// Pause before each round
    pub round_pause: Duration,
    /// `None` retries forever
    pub max_rounds: Option<u32>,
}

impl From<&FailoverConfig> for FailoverPolicy {
    fn from(config: &FailoverConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            round_pause: config.round_pause(),
            max_rounds: config.round_limit(),
        }
    }
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self::from(&FailoverConfig::default())
    }
}

/// Writes events to a shard, retrying while the shard is unavailable
#[derive(Debug, Clone, Default)]
pub struct DurableWriter {
    policy: FailoverPolicy,
}

impl DurableWriter {
    pub fn new(policy: FailoverPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FailoverPolicy {
        &self.policy
    }

    /// Write one event and update the shard's counters.
    ///
    /// Never fails: every error ends up inside the returned outcome.
    #[instrument(
        name = "writer_write",
        skip(self, shard, event),
        fields(shard = %shard.name(), event_id = %event.id)
    )]
    pub async fn write<B: ShardBackend + Sync>(
        &self,
        shard: &ShardHandle<B>,
        event: &Event,
    ) -> WriteOutcome {
        let outcome = match shard.backend().insert_unique(event).await {
            Ok(()) => WriteOutcome::Stored { attempts: 1 },
            Err(InsertError::Duplicate { .. }) => WriteOutcome::AlreadyStored { attempts: 1 },
            Err(error @ InsertError::Rejected { .. }) => {
                WriteOutcome::Abandoned { attempts: 1, error }
            }
            Err(error @ InsertError::Unavailable { .. }) => {
                warn!(error = %error, "Shard unavailable, entering failover");
                self.failover(shard, event, error).await
            }
        };

        self.record(shard, &outcome);
        outcome
    }

    async fn failover<B: ShardBackend + Sync>(
        &self,
        shard: &ShardHandle<B>,
        event: &Event,
        first_error: InsertError,
    ) -> WriteOutcome {
        let mut attempts: u32 = 1;
        let mut last_error = first_error;
        let mut round: u32 = 0;

        loop {
            if self.policy.max_rounds.is_some_and(|limit| round >= limit) {
                return WriteOutcome::Abandoned {
                    attempts,
                    error: last_error,
                };
            }
            round += 1;
            sleep(self.policy.round_pause).await;

            for attempt in 1..=self.policy.max_attempts {
                attempts = attempts.saturating_add(1);
                shard.metrics().inc_retry_count();
                observability::record_failover_attempt(shard.name().as_str());

                match shard.backend().insert_unique(event).await {
                    Ok(()) => return WriteOutcome::Stored { attempts },
                    Err(InsertError::Duplicate { .. }) => {
                        return WriteOutcome::AlreadyStored { attempts }
                    }
                    Err(error @ InsertError::Rejected { .. }) => {
                        return WriteOutcome::Abandoned { attempts, error }
                    }
                    Err(error) => {
                        debug!(round, attempt, error = %error, "Shard still unavailable");
                        last_error = error;
                    }
                }

                if attempt < self.policy.max_attempts {
                    sleep(self.policy.retry_delay).await;
                }
            }

            warn!(
                round,
                attempts = self.policy.max_attempts,
                "Failover round exhausted"
            );
        }
    }

    fn record<B>(&self, shard: &ShardHandle<B>, outcome: &WriteOutcome) {
        let metrics = shard.metrics();
        match outcome {
            WriteOutcome::Stored { .. } => metrics.inc_stored_count(),
            WriteOutcome::AlreadyStored { .. } => metrics.inc_duplicate_count(),
            WriteOutcome::Abandoned { error, .. } => {
                metrics.inc_abandoned_count();
                if error.is_transient() {
                    observability::record_failover_exhausted(shard.name().as_str());
                }
            }
        }
        observability::record_write_outcome(shard.name().as_str(), outcome.label());
    }
}
