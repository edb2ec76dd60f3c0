//! Table entries and the synthetic processed-status column.

use std::cmp::Ordering;

use crate::sources::FindingStore;
use crate::types::{CaptureRecord, RecordId, Severity};

/// Outcome of processing a captured transaction, shown in the synthetic
/// "Processed" column.
///
/// Two fixed states with fixed display labels. Ordering is explicit:
/// `Successful` sorts after `IoError`; states with the same success flag
/// fall back to label comparison (always equal for these two).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessedStatus {
    IoError,
    Successful,
}

impl ProcessedStatus {
    pub fn from_io_failed(io_failed: bool) -> Self {
        if io_failed {
            ProcessedStatus::IoError
        } else {
            ProcessedStatus::Successful
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, ProcessedStatus::Successful)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessedStatus::IoError => "I/O Error",
            ProcessedStatus::Successful => "Successful",
        }
    }
}

impl std::fmt::Display for ProcessedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl PartialOrd for ProcessedStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcessedStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_successful(), other.is_successful()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => self.label().cmp(other.label()),
        }
    }
}

/// Cell values derived from the record and the external finding store.
///
/// Refreshed only through [`TableEntry::refresh_cached_values`].
#[derive(Clone, Debug)]
pub(crate) struct CachedCells {
    pub request_timestamp: u64,
    pub response_timestamp: u64,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub status_reason: String,
    pub round_trip_ms: u64,
    pub request_header_size: u64,
    pub request_body_size: u64,
    pub response_header_size: u64,
    pub response_body_size: u64,
    pub highest_finding: Option<Severity>,
    pub tags: Vec<String>,
}

impl CachedCells {
    fn from_record(record: &CaptureRecord) -> Self {
        Self {
            request_timestamp: record.request_timestamp,
            response_timestamp: record.response_timestamp,
            method: record.method.clone(),
            url: record.url.clone(),
            status_code: record.status_code,
            status_reason: record.status_reason.clone(),
            round_trip_ms: record.round_trip_ms,
            request_header_size: record.request_header_size,
            request_body_size: record.request_body_size,
            response_header_size: record.response_header_size,
            response_body_size: record.response_body_size,
            highest_finding: record.highest_severity,
            tags: record.tags.clone(),
        }
    }
}

/// One row of the capture table: a record's identity plus entry-local
/// derived state.
///
/// The record id and the I/O-failure flag are fixed for the lifetime of the
/// entry; only the cached cell values change, and only via an explicit
/// refresh.
#[derive(Clone, Debug)]
pub struct TableEntry {
    record_id: RecordId,
    io_failed: bool,
    pub(crate) cells: CachedCells,
}

impl TableEntry {
    /// Wraps a record snapshot. `io_failed` marks transactions that ended in
    /// an I/O failure instead of a response.
    pub fn new(record: &CaptureRecord, io_failed: bool) -> Self {
        Self {
            record_id: record.id,
            io_failed,
            cells: CachedCells::from_record(record),
        }
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    pub fn is_io_failed(&self) -> bool {
        self.io_failed
    }

    pub fn processed_status(&self) -> ProcessedStatus {
        ProcessedStatus::from_io_failed(self.io_failed)
    }

    /// Current cached highest finding; stale until the next refresh.
    pub fn highest_finding(&self) -> Option<Severity> {
        self.cells.highest_finding
    }

    pub fn url(&self) -> &str {
        &self.cells.url
    }

    /// Re-reads the external state backing the volatile columns and replaces
    /// the cached values. Idempotent; never changes the entry's identity or
    /// failure flag.
    pub fn refresh_cached_values(&mut self, findings: &dyn FindingStore) {
        self.cells.highest_finding = findings.highest_severity(self.record_id);
    }
}
