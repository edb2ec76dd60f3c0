//! Capture table service: assembly of store, executor, and bus consumer.

use std::sync::Arc;

use crate::bus::consumer::AlertEventConsumer;
use crate::bus::registry::AlertBus;
use crate::bus::FINDINGS_PUBLISHER;
use crate::entry::TableEntry;
use crate::executor::{ExecutorHandle, SerialExecutor};
use crate::sources::{FindingStore, RecordSource};
use crate::store::{CellValue, Column, RowStore, TableObserver, TableStats};
use crate::types::{CaptureRecord, RecordId};

/// Configuration for a capture table.
#[derive(Clone, Debug)]
pub struct TableConfig {
    /// Subscribe to the findings publisher for live cache invalidation.
    ///
    /// When false the table behaves as a static, externally fed list: no
    /// consumer is created and published finding events never reach it.
    pub live_updates: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { live_updates: true }
    }
}

/// The capture table: an append-only, row-indexed view over captured
/// transactions, kept consistent with the findings event stream.
///
/// Construction spawns the owner thread and, in live mode, registers the
/// alert consumer with the bus. All interaction goes through cloned
/// [`TableHandle`]s. The owner thread stops once every handle is gone; in
/// live mode the bus subscription counts as a handle until a reset (or the
/// bus itself) tears it down.
pub struct CaptureTable {
    _executor: SerialExecutor,
    handle: TableHandle,
}

impl CaptureTable {
    /// Builds a table reading volatile columns from `findings`, optionally
    /// re-resolving appended records through `records`.
    pub fn new(
        config: TableConfig,
        bus: &Arc<AlertBus>,
        records: Option<Arc<dyn RecordSource>>,
        findings: Arc<dyn FindingStore>,
    ) -> Self {
        let store = RowStore::new(findings);
        let executor = SerialExecutor::spawn(store);
        let handle = TableHandle {
            exec: executor.handle(),
            records,
        };

        if config.live_updates {
            let consumer = Arc::new(AlertEventConsumer::new(handle.clone()));
            let subscription = bus.subscribe(FINDINGS_PUBLISHER, consumer);
            log::debug!(
                "capture table subscribed to '{}' as {}",
                FINDINGS_PUBLISHER,
                subscription.id()
            );
            handle.exec.execute(Box::new(move |store| {
                store.set_subscription(subscription);
            }));
        }

        Self {
            _executor: executor,
            handle,
        }
    }

    /// A clonable handle for producers and the rendering layer.
    pub fn handle(&self) -> TableHandle {
        self.handle.clone()
    }
}

/// Producer- and view-facing surface of a [`CaptureTable`].
///
/// Mutations are fire-and-forget when called off the owner thread; reads
/// rendezvous with it. Clones share the same table.
#[derive(Clone)]
pub struct TableHandle {
    exec: ExecutorHandle,
    records: Option<Arc<dyn RecordSource>>,
}

impl TableHandle {
    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Appends the record as the next row.
    ///
    /// When a record source is wired, the freshest stored copy of the record
    /// replaces the given snapshot first. `io_failed` marks transactions
    /// that ended in an I/O failure; the flag is permanent for the row.
    pub fn append(&self, record: CaptureRecord, io_failed: bool) {
        let record = match &self.records {
            Some(source) => source.resolve(record.id).unwrap_or(record),
            None => record,
        };
        let entry = TableEntry::new(&record, io_failed);
        self.exec.execute(Box::new(move |store| {
            store.append(entry);
        }));
    }

    /// Refreshes the cached values of one record's row, if tracked.
    pub fn invalidate(&self, id: RecordId) {
        self.exec.execute(Box::new(move |store| {
            store.invalidate(id);
        }));
    }

    /// Refreshes every row, emitting a single bulk update.
    pub fn invalidate_all(&self) {
        self.exec.execute(Box::new(|store| {
            store.invalidate_all();
        }));
    }

    /// Empties the table and tears down its bus subscription. The table
    /// stays static afterwards; build a new one to resume live updates.
    pub fn reset(&self) {
        self.exec.execute(Box::new(|store| {
            store.reset();
        }));
    }

    /// Registers an observer for subsequent table updates. Observers run
    /// synchronously on the owner thread.
    pub fn observe(&self, observer: Box<dyn TableObserver>) {
        self.exec.execute(Box::new(move |store| {
            store.add_observer(observer);
        }));
    }

    // ------------------------------------------------------------------
    // Read contract
    // ------------------------------------------------------------------

    /// Runs an arbitrary read against a consistent store snapshot.
    pub fn query<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&RowStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.exec.query(f)
    }

    /// Current number of rows.
    pub fn row_count(&self) -> usize {
        self.query(|store| store.row_count())
    }

    /// Row index of the record, if tracked.
    pub fn row_index_of(&self, id: RecordId) -> Option<usize> {
        self.query(move |store| store.row_index_of(id))
    }

    /// Cell value at the row.
    ///
    /// # Panics
    /// On an out-of-range row; check [`row_count`](Self::row_count) first.
    pub fn value_at(&self, row: usize, column: Column) -> CellValue {
        self.query(move |store| store.value_at(row, column))
    }

    /// A clone of the whole entry at the row.
    ///
    /// # Panics
    /// On an out-of-range row.
    pub fn entry(&self, row: usize) -> TableEntry {
        self.query(move |store| store.entry_at(row).clone())
    }

    /// Store-level statistics.
    pub fn stats(&self) -> TableStats {
        self.query(|store| store.stats())
    }
}
