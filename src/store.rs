use crate::bus::registry::SubscriptionGuard;
use crate::entry::{ProcessedStatus, TableEntry};
use crate::sources::FindingStore;
use crate::types::{RecordId, Severity};
/// Implements the row store backing the capture table view.
///
/// The RowStore keeps the ordered sequence of table entries plus a
/// bidirectional id↔row mapping, and is the single place rows are appended
/// and cached values invalidated.
///
/// # Architecture
/// - Append-only: rows are never removed or reordered, except by a full reset
/// - O(1) id→row lookup via an inverse index kept exactly in sync
/// - Change notifications are pushed to registered observers synchronously,
///   so an observer always sees a store state consistent with the update
/// - No internal locking: mutation entry points are crate-private and only
///   reachable from the owning-thread dispatch path in [`crate::executor`]
use std::collections::HashMap;
use std::sync::Arc;

// ================================================================================================
// COLUMNS
// ================================================================================================

/// Columns of the capture table, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// Synthetic column derived from the entry's I/O-failure flag.
    Processed,
    Id,
    RequestTimestamp,
    ResponseTimestamp,
    Method,
    Url,
    StatusCode,
    StatusReason,
    RoundTrip,
    RequestHeaderSize,
    RequestBodySize,
    ResponseHeaderSize,
    ResponseBodySize,
    HighestFinding,
    Tags,
}

/// Fixed column layout of this table.
pub const COLUMNS: [Column; 15] = [
    Column::Processed,
    Column::Id,
    Column::RequestTimestamp,
    Column::ResponseTimestamp,
    Column::Method,
    Column::Url,
    Column::StatusCode,
    Column::StatusReason,
    Column::RoundTrip,
    Column::RequestHeaderSize,
    Column::RequestBodySize,
    Column::ResponseHeaderSize,
    Column::ResponseBodySize,
    Column::HighestFinding,
    Column::Tags,
];

impl Column {
    /// Header label for the column.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Processed => "Processed",
            Column::Id => "Id",
            Column::RequestTimestamp => "Request Timestamp",
            Column::ResponseTimestamp => "Response Timestamp",
            Column::Method => "Method",
            Column::Url => "URL",
            Column::StatusCode => "Status Code",
            Column::StatusReason => "Status Reason",
            Column::RoundTrip => "RTT",
            Column::RequestHeaderSize => "Request Header Size",
            Column::RequestBodySize => "Request Body Size",
            Column::ResponseHeaderSize => "Response Header Size",
            Column::ResponseBodySize => "Response Body Size",
            Column::HighestFinding => "Highest Finding",
            Column::Tags => "Tags",
        }
    }
}

/// A single cell value as handed to the rendering layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellValue {
    Processed(ProcessedStatus),
    Id(RecordId),
    /// Unix ms; zero means "not recorded".
    Timestamp(u64),
    Number(u64),
    Text(String),
    Severity(Option<Severity>),
    Tags(Vec<String>),
}

// ================================================================================================
// CHANGE NOTIFICATIONS
// ================================================================================================

/// Change notification pushed to table observers.
///
/// Row ranges are inclusive `{first, last}` pairs; a bulk refresh of an
/// N-row table arrives as `RowsUpdated { first: 0, last: N - 1 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableUpdate {
    RowsInserted { first: usize, last: usize },
    RowsUpdated { first: usize, last: usize },
    AllRowsChanged,
}

/// Observer of table changes. Called synchronously on the owning thread.
pub trait TableObserver: Send {
    fn table_changed(&mut self, update: &TableUpdate);
}

impl<F: FnMut(&TableUpdate) + Send> TableObserver for F {
    fn table_changed(&mut self, update: &TableUpdate) {
        self(update)
    }
}

// ================================================================================================
// ROW STORE
// ================================================================================================

/// Ordered, id-indexed collection of table entries.
///
/// # Invariants
/// - Row order equals insertion order; rows are never removed or reordered
/// - `rows_by_id` is the exact inverse of `entries[row].record_id()`
/// - Row count only grows, except for [`reset`](Self::reset)
///
/// # Thread Safety
/// None by itself: the store is moved into the owner thread of a
/// [`SerialExecutor`](crate::executor::SerialExecutor) and every mutation is
/// routed through it. Mutating methods are crate-private so no path outside
/// the dispatch mechanism can reach them.
pub struct RowStore {
    entries: Vec<TableEntry>,
    rows_by_id: HashMap<RecordId, usize>,
    /// Backing store for the volatile finding column.
    findings: Arc<dyn FindingStore>,
    observers: Vec<Box<dyn TableObserver>>,
    /// Live bus subscription; dropped (and thereby unregistered) on reset.
    subscription: Option<SubscriptionGuard>,
    refreshes: u64,
    resets: u64,
}

impl RowStore {
    /// Creates an empty store reading volatile columns from `findings`.
    pub fn new(findings: Arc<dyn FindingStore>) -> Self {
        Self {
            entries: Vec::new(),
            rows_by_id: HashMap::new(),
            findings,
            observers: Vec::new(),
            subscription: None,
            refreshes: 0,
            resets: 0,
        }
    }

    // ============================================================================================
    // READ SURFACE
    // ============================================================================================

    /// Current number of rows.
    pub fn row_count(&self) -> usize {
        self.entries.len()
    }

    /// Row index of the record, if it is tracked.
    ///
    /// Misses are normal: external notifications routinely reference ids the
    /// store has not seen.
    pub fn row_index_of(&self, id: RecordId) -> Option<usize> {
        self.rows_by_id.get(&id).copied()
    }

    /// Entry at the row.
    ///
    /// # Panics
    /// On an out-of-range row; callers are expected to check
    /// [`row_count`](Self::row_count) first.
    pub fn entry_at(&self, row: usize) -> &TableEntry {
        &self.entries[row]
    }

    /// Entry for the record id, if tracked.
    pub fn entry_for(&self, id: RecordId) -> Option<&TableEntry> {
        self.row_index_of(id).map(|row| &self.entries[row])
    }

    /// Cell value for the rendering layer. Row-level "whole entry" queries go
    /// through [`entry_at`](Self::entry_at) instead.
    ///
    /// # Panics
    /// On an out-of-range row.
    pub fn value_at(&self, row: usize, column: Column) -> CellValue {
        let entry = self.entry_at(row);
        match column {
            Column::Processed => CellValue::Processed(entry.processed_status()),
            Column::Id => CellValue::Id(entry.record_id()),
            Column::RequestTimestamp => CellValue::Timestamp(entry.cells.request_timestamp),
            Column::ResponseTimestamp => CellValue::Timestamp(entry.cells.response_timestamp),
            Column::Method => CellValue::Text(entry.cells.method.clone()),
            Column::Url => CellValue::Text(entry.cells.url.clone()),
            Column::StatusCode => CellValue::Number(entry.cells.status_code as u64),
            Column::StatusReason => CellValue::Text(entry.cells.status_reason.clone()),
            Column::RoundTrip => CellValue::Number(entry.cells.round_trip_ms),
            Column::RequestHeaderSize => CellValue::Number(entry.cells.request_header_size),
            Column::RequestBodySize => CellValue::Number(entry.cells.request_body_size),
            Column::ResponseHeaderSize => CellValue::Number(entry.cells.response_header_size),
            Column::ResponseBodySize => CellValue::Number(entry.cells.response_body_size),
            Column::HighestFinding => CellValue::Severity(entry.cells.highest_finding),
            Column::Tags => CellValue::Tags(entry.cells.tags.clone()),
        }
    }

    /// Returns statistics about the store.
    pub fn stats(&self) -> TableStats {
        let io_error_rows = self.entries.iter().filter(|e| e.is_io_failed()).count();

        TableStats {
            rows: self.entries.len(),
            successful_rows: self.entries.len() - io_error_rows,
            io_error_rows,
            refreshes: self.refreshes,
            resets: self.resets,
            subscribed: self.subscription.is_some(),
        }
    }

    // ============================================================================================
    // MUTATION (owning-thread dispatch path only)
    // ============================================================================================

    /// Appends the entry at the next row and indexes it.
    ///
    /// Returns the assigned row, or `None` when the entry's id is already
    /// tracked: duplicate appends are rejected, leaving rows and index
    /// untouched and emitting no notification.
    pub(crate) fn append(&mut self, entry: TableEntry) -> Option<usize> {
        let id = entry.record_id();
        if self.rows_by_id.contains_key(&id) {
            log::warn!("rejected append of duplicate record id {}", id);
            return None;
        }

        let row = self.entries.len();
        self.rows_by_id.insert(id, row);
        self.entries.push(entry);
        self.notify(TableUpdate::RowsInserted { first: row, last: row });
        Some(row)
    }

    /// Refreshes the cached values of the record's entry and notifies for
    /// that single row. Unknown ids are a silent no-op.
    pub(crate) fn invalidate(&mut self, id: RecordId) {
        let row = match self.row_index_of(id) {
            Some(row) => row,
            None => return,
        };

        self.entries[row].refresh_cached_values(&*self.findings);
        self.refreshes += 1;
        self.notify(TableUpdate::RowsUpdated { first: row, last: row });
    }

    /// Refreshes every entry in row order, then emits one bulk update
    /// covering all rows. Deliberately a single notification: a per-row
    /// event storm would force O(n) redraws on bulk finding changes.
    pub(crate) fn invalidate_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        let findings = Arc::clone(&self.findings);
        for entry in &mut self.entries {
            entry.refresh_cached_values(&*findings);
        }
        self.refreshes += self.entries.len() as u64;

        let last = self.entries.len() - 1;
        self.notify(TableUpdate::RowsUpdated { first: 0, last });
    }

    /// Empties the store and its index, notifies observers that every row is
    /// gone, and tears down the bus subscription.
    ///
    /// After a reset the table no longer reacts to externally delivered
    /// finding events; a new table must be built to resume live updates.
    pub(crate) fn reset(&mut self) {
        self.entries = Vec::new();
        self.rows_by_id = HashMap::new();
        self.resets += 1;
        self.notify(TableUpdate::AllRowsChanged);

        if let Some(subscription) = self.subscription.take() {
            log::debug!("table reset, dropping bus subscription {}", subscription.id());
            drop(subscription);
        }
    }

    /// Registers an observer for subsequent updates.
    pub(crate) fn add_observer(&mut self, observer: Box<dyn TableObserver>) {
        self.observers.push(observer);
    }

    /// Installs the live bus subscription torn down by [`reset`](Self::reset).
    pub(crate) fn set_subscription(&mut self, subscription: SubscriptionGuard) {
        self.subscription = Some(subscription);
    }

    fn notify(&mut self, update: TableUpdate) {
        for observer in &mut self.observers {
            observer.table_changed(&update);
        }
    }
}

// ================================================================================================
// STATISTICS
// ================================================================================================

/// Store-level statistics.
#[derive(Clone, Debug)]
pub struct TableStats {
    /// Current number of rows
    pub rows: usize,

    /// Rows for completed transactions
    pub successful_rows: usize,

    /// Rows for transactions that ended in an I/O failure
    pub io_error_rows: usize,

    /// Total entry refreshes performed, bulk refreshes included
    pub refreshes: u64,

    /// Total full resets performed
    pub resets: u64,

    /// Whether a live bus subscription is installed
    pub subscribed: bool,
}

// ================================================================================================
// TESTS
// ================================================================================================
