//! # Event Log
//!
//! Append-only record of every committed event, numbered from zero in commit
//! order. The log alone is enough to rebuild the owner of every domain and
//! each owner's domains in registration order.

use shared_bus::{EventFilter, EventRecord, RegistryEvent};
use shared_types::Address;
use std::collections::HashMap;

/// Ordered, append-only event history.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records.
    ///
    /// Returns `None` unless sequences run 0, 1, 2, ... without gaps.
    #[must_use]
    pub fn from_records(records: Vec<EventRecord>) -> Option<Self> {
        let contiguous = records
            .iter()
            .enumerate()
            .all(|(i, r)| r.sequence == i as u64);
        contiguous.then_some(Self { records })
    }

    /// Sequence the next event will get.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Append an event and return its record.
    pub fn append(&mut self, event: RegistryEvent, committed_at: u64) -> EventRecord {
        let record = EventRecord {
            sequence: self.next_sequence(),
            committed_at,
            event,
        };
        self.records.push(record.clone());
        record
    }

    /// Every record with `sequence >= from`.
    #[must_use]
    pub fn events_from(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from).map_or(self.records.len(), |s| s.min(self.records.len()));
        &self.records[start..]
    }

    /// Records from `from` onward that pass `filter`.
    pub fn query<'a>(
        &'a self,
        filter: &'a EventFilter,
        from: u64,
    ) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.events_from(from)
            .iter()
            .filter(move |r| filter.matches(&r.event))
    }

    /// Registrations naming `owner`, from `from` onward.
    #[must_use]
    pub fn registrations_by_owner(&self, owner: Address, from: u64) -> Vec<EventRecord> {
        let filter = EventFilter::registrations_of(owner);
        self.query(&filter, from).cloned().collect()
    }

    /// All records.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Ownership view rebuilt purely from events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipProjection {
    /// Owner of each domain.
    pub owners: HashMap<String, Address>,
    /// Each owner's domains in registration order.
    pub domains_by_owner: HashMap<Address, Vec<String>>,
}

impl OwnershipProjection {
    /// Fold a sequence of records.
    #[must_use]
    pub fn replay<'a>(records: impl IntoIterator<Item = &'a EventRecord>) -> Self {
        let mut projection = Self::default();
        for record in records {
            if let RegistryEvent::DomainRegistered { owner, domain, .. } = &record.event {
                projection.owners.insert(domain.clone(), *owner);
                projection
                    .domains_by_owner
                    .entry(*owner)
                    .or_default()
                    .push(domain.clone());
            }
        }
        projection
    }
}
