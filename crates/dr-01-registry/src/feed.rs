//! # Registry Feed
//!
//! History replay followed by the live subscription, delivering every
//! matching event exactly once and in commit order.
//!
//! The feed is opened while the registry lock is held, so no commit can fall
//! between the replayed backlog and the subscription. Duplicates are dropped
//! by sequence number; if the broadcast channel overruns the subscriber, the
//! gap is refilled from the log.

use crate::domain::state::RegistryState;
use shared_bus::{EventFilter, EventRecord, Subscription, SubscriptionError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Exactly-once event feed.
pub struct RegistryFeed {
    backlog: VecDeque<EventRecord>,
    subscription: Subscription,
    filter: EventFilter,
    next_sequence: u64,
    state: Arc<Mutex<RegistryState>>,
}

impl RegistryFeed {
    /// Assemble a feed. The caller must hold the registry lock while taking
    /// both `backlog` and `subscription`.
    pub(crate) fn new(
        backlog: Vec<EventRecord>,
        subscription: Subscription,
        filter: EventFilter,
        from: u64,
        state: Arc<Mutex<RegistryState>>,
    ) -> Self {
        Self {
            backlog: backlog.into(),
            subscription,
            filter,
            next_sequence: from,
            state,
        }
    }

    /// Next event, waiting for a commit if the replay is exhausted.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::Closed` once the registry is gone and the backlog
    /// is drained. Lag never surfaces; it is repaired from the log.
    pub async fn next(&mut self) -> Result<EventRecord, SubscriptionError> {
        loop {
            if let Some(record) = self.backlog.pop_front() {
                self.next_sequence = record.sequence + 1;
                return Ok(record);
            }

            match self.subscription.recv().await {
                Ok(record) if record.sequence < self.next_sequence => {
                    debug!(sequence = record.sequence, "Feed skipped duplicate");
                }
                Ok(record) => {
                    self.next_sequence = record.sequence + 1;
                    return Ok(record);
                }
                Err(SubscriptionError::Lagged(skipped)) => {
                    debug!(
                        skipped = skipped,
                        from = self.next_sequence,
                        "Feed lagged, backfilling from log"
                    );
                    let state = self.state.lock().await;
                    self.backlog.extend(
                        state
                            .log()
                            .query(&self.filter, self.next_sequence)
                            .cloned(),
                    );
                }
                Err(SubscriptionError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Next event if one is ready, without waiting.
    ///
    /// # Errors
    ///
    /// As [`RegistryFeed::next`].
    pub async fn try_next(&mut self) -> Result<Option<EventRecord>, SubscriptionError> {
        loop {
            if let Some(record) = self.backlog.pop_front() {
                self.next_sequence = record.sequence + 1;
                return Ok(Some(record));
            }

            match self.subscription.try_recv() {
                Ok(None) => return Ok(None),
                Ok(Some(record)) if record.sequence < self.next_sequence => {}
                Ok(Some(record)) => {
                    self.next_sequence = record.sequence + 1;
                    return Ok(Some(record));
                }
                Err(SubscriptionError::Lagged(_)) => {
                    let state = self.state.lock().await;
                    self.backlog.extend(
                        state
                            .log()
                            .query(&self.filter, self.next_sequence)
                            .cloned(),
                    );
                }
                Err(SubscriptionError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Sequence number the feed expects next.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.next_sequence
    }

    /// The feed's filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
