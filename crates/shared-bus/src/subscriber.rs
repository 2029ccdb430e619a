//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{EventFilter, EventRecord};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The subscriber fell behind; carries the number of overwritten events.
    ///
    /// The subscription stays usable; the caller decides whether to backfill.
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),
}

/// A subscription handle for receiving events.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<EventRecord>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Key for this subscription in the tracking map.
    filter_key: String,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<EventRecord>,
        filter: EventFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        filter_key: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            subscriptions,
            filter_key,
        }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Errors
    ///
    /// - `SubscriptionError::Closed` - the bus was dropped
    /// - `SubscriptionError::Lagged` - events were overwritten before being read
    pub async fn recv(&mut self) -> Result<EventRecord, SubscriptionError> {
        loop {
            let record = match self.receiver.recv().await {
                Ok(r) => r,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                    return Err(SubscriptionError::Lagged(count));
                }
            };

            if self.filter.matches(&record.event) {
                return Ok(record);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    ///
    /// # Errors
    ///
    /// Same as [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Result<Option<EventRecord>, SubscriptionError> {
        loop {
            let record = match self.receiver.try_recv() {
                Ok(r) => r,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    return Err(SubscriptionError::Lagged(count))
                }
            };

            if self.filter.matches(&record.event) {
                return Ok(Some(record));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.filter_key) else {
            debug!(filter = %self.filter_key, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.filter_key);
        }
        debug!(filter = %self.filter_key, "Subscription dropped");
    }
}

/// A filtered stream over the bus.
///
/// Implements `tokio_stream::Stream`. Lagged gaps are skipped; consumers that
/// need exactly-once delivery should use the registry's feed instead.
pub struct EventStream {
    inner: BroadcastStream<EventRecord>,
    filter: EventFilter,
}

impl EventStream {
    /// Create a new event stream from a raw receiver.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<EventRecord>, filter: EventFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = EventRecord;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(record))) => {
                    if self.filter.matches(&record.event) {
                        return Poll::Ready(Some(record));
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    debug!(error = %err, "Event stream lagged, some events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
