//! # Registry Events
//!
//! Defines the notifications that flow through the shared bus. Every event is
//! wrapped in an [`EventRecord`] carrying its position in the registry's
//! append-only log, so consumers can stitch a history replay and a live
//! subscription together without gaps or duplicates.

use serde::{Deserialize, Serialize};
use shared_types::{Address, StableAmount};

/// All events the registry commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A domain was registered.
    DomainRegistered {
        /// Account that submitted and paid for the registration.
        registrant: Address,
        /// Account recorded as the domain's owner.
        owner: Address,
        /// Full dotted name.
        domain: String,
        /// Price, in stablecoin units, for registering a direct child.
        child_price_stable: StableAmount,
    },

    /// A price (the global default or one domain's child price) changed.
    PriceChanged {
        /// Price after the update.
        new_price: StableAmount,
        /// Price before the update.
        old_price: StableAmount,
    },
}

impl RegistryEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::DomainRegistered { .. } => EventTopic::Registration,
            Self::PriceChanged { .. } => EventTopic::Pricing,
        }
    }

    /// Owner carried by the event, if it names one.
    #[must_use]
    pub fn owner(&self) -> Option<Address> {
        match self {
            Self::DomainRegistered { owner, .. } => Some(*owner),
            Self::PriceChanged { .. } => None,
        }
    }
}

/// A committed event with its log position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Zero-based position in the registry log. Strictly increasing.
    pub sequence: u64,
    /// Commit time, unix seconds.
    pub committed_at: u64,
    /// The event itself.
    pub event: RegistryEvent,
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// `DomainRegistered` events.
    Registration,
    /// `PriceChanged` events.
    Pricing,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Only events naming this owner. `None` means any.
    pub owner: Option<Address>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            owner: None,
        }
    }

    /// Registrations of a single owner.
    #[must_use]
    pub fn registrations_of(owner: Address) -> Self {
        Self {
            topics: vec![EventTopic::Registration],
            owner: Some(owner),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RegistryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let owner_match = match self.owner {
            None => true,
            Some(wanted) => event.owner() == Some(wanted),
        };

        topic_match && owner_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(owner: Address, domain: &str) -> RegistryEvent {
        RegistryEvent::DomainRegistered {
            registrant: owner,
            owner,
            domain: domain.to_string(),
            child_price_stable: StableAmount::from(6u64),
        }
    }

    fn price_changed() -> RegistryEvent {
        RegistryEvent::PriceChanged {
            new_price: StableAmount::from(99u64),
            old_price: StableAmount::from(6u64),
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(
            registered(Address::repeat_byte(1), "dom").topic(),
            EventTopic::Registration
        );
        assert_eq!(price_changed().topic(), EventTopic::Pricing);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&registered(Address::repeat_byte(1), "dom")));
        assert!(filter.matches(&price_changed()));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Pricing]);
        assert!(filter.matches(&price_changed()));
        assert!(!filter.matches(&registered(Address::repeat_byte(1), "dom")));
    }

    #[test]
    fn test_filter_by_owner() {
        let alice = Address::repeat_byte(1);
        let bob = Address::repeat_byte(2);
        let filter = EventFilter::registrations_of(alice);

        assert!(filter.matches(&registered(alice, "a")));
        assert!(!filter.matches(&registered(bob, "b")));
        // Price changes name no owner.
        assert!(!filter.matches(&price_changed()));
    }
}
