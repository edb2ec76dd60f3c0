//! External data seams feeding the capture table.
//!
//! The table itself only renders and caches facts computed elsewhere; these
//! traits are the two places it reads them from. Implementations may be
//! backed by a database, the scanner core, or in-memory maps.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{CaptureRecord, RecordId, Severity};

/// Source of the freshest known copy of a captured record.
///
/// Used once per append to swap the producer's snapshot for the most
/// recently stored one. When no source is wired, the snapshot passed to
/// append is used as-is.
pub trait RecordSource: Send + Sync {
    fn resolve(&self, id: RecordId) -> Option<CaptureRecord>;
}

/// Source of the externally tracked findings associated with records.
///
/// Backs the volatile "highest finding" column; consulted only when an
/// entry's cached values are explicitly refreshed, never on read.
pub trait FindingStore: Send + Sync {
    /// Highest severity currently associated with the record, if any.
    fn highest_severity(&self, id: RecordId) -> Option<Severity>;
}

/// In-memory [`RecordSource`] for wiring demos and tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, CaptureRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or replaces the record under its own id.
    pub fn insert(&self, record: CaptureRecord) {
        self.records.write().insert(record.id, record);
    }
}

impl RecordSource for InMemoryRecordStore {
    fn resolve(&self, id: RecordId) -> Option<CaptureRecord> {
        self.records.read().get(&id).cloned()
    }
}

/// In-memory [`FindingStore`] for wiring demos and tests.
///
/// Counts lookups so tests can assert how often cached values were
/// recomputed.
#[derive(Default)]
pub struct InMemoryFindingStore {
    severities: RwLock<HashMap<RecordId, Severity>>,
    lookups: AtomicU64,
}

impl InMemoryFindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the highest severity for a record, keeping the larger of the
    /// stored and given values.
    pub fn raise(&self, id: RecordId, severity: Severity) {
        let mut severities = self.severities.write();
        let entry = severities.entry(id).or_insert(severity);
        if severity > *entry {
            *entry = severity;
        }
    }

    /// Drops all findings for the record.
    pub fn clear(&self, id: RecordId) {
        self.severities.write().remove(&id);
    }

    /// Drops every finding.
    pub fn clear_all(&self) {
        self.severities.write().clear();
    }

    /// Number of `highest_severity` lookups served so far.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl FindingStore for InMemoryFindingStore {
    fn highest_severity(&self, id: RecordId) -> Option<Severity> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.severities.read().get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_store_returns_latest_copy() {
        let store = InMemoryRecordStore::new();
        assert!(store.resolve(1).is_none());

        let mut record = CaptureRecord::new(1, "GET", "http://example.com");
        store.insert(record.clone());

        record.status_code = 200;
        store.insert(record);

        let resolved = store.resolve(1).unwrap();
        assert_eq!(resolved.status_code, 200);
    }

    #[test]
    fn finding_store_keeps_highest_severity() {
        let store = InMemoryFindingStore::new();
        store.raise(1, Severity::High);
        store.raise(1, Severity::Low);
        assert_eq!(store.highest_severity(1), Some(Severity::High));

        store.raise(2, Severity::Low);
        store.raise(2, Severity::Medium);
        assert_eq!(store.highest_severity(2), Some(Severity::Medium));
    }

    #[test]
    fn finding_store_counts_lookups() {
        let store = InMemoryFindingStore::new();
        store.raise(1, Severity::Info);
        let _ = store.highest_severity(1);
        let _ = store.highest_severity(2);
        assert_eq!(store.lookups(), 2);
    }

    #[test]
    fn finding_store_clear_all_empties_every_record() {
        let store = InMemoryFindingStore::new();
        store.raise(1, Severity::High);
        store.raise(2, Severity::Low);
        store.clear_all();
        assert_eq!(store.highest_severity(1), None);
        assert_eq!(store.highest_severity(2), None);
    }
}
