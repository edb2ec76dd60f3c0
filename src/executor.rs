//! Owning-thread executor for all row store mutations.
//!
//! Every mutation of the [`RowStore`] runs on one dedicated OS thread, no
//! matter which thread asked for it. Producers and bus delivery threads hand
//! boxed jobs to the owner's FIFO channel and return immediately; the store
//! itself is moved into the owner thread at spawn time and is never shared,
//! so it needs no locking.
//!
//! # Dispatch discipline
//! - Off the owner thread: jobs are enqueued fire-and-forget. Jobs submitted
//!   by one producer run in submission order.
//! - On the owner thread: jobs run synchronously. A job submitted while
//!   another is already running (an observer re-entering the table) is
//!   parked on a local queue and drained immediately after the running job
//!   completes, so recursive scheduling cannot deadlock or interleave inside
//!   an operation.
//! - Reads rendezvous: [`ExecutorHandle::query`] blocks off-thread callers
//!   on a reply channel so the result reflects every job that producer
//!   already submitted.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::store::RowStore;

/// A deferred mutation running against the store on the owner thread.
pub(crate) type Job = Box<dyn FnOnce(&mut RowStore) + Send + 'static>;

/// Distinguishes owner threads when several tables live in one process.
static NEXT_EXECUTOR_ID: AtomicU64 = AtomicU64::new(1);

struct OwnedContext {
    executor_id: u64,
    store: Rc<RefCell<RowStore>>,
}

thread_local! {
    /// The owned store, populated only on its owner thread for the lifetime
    /// of the worker loop. A matching executor id is the "am I the owning
    /// context" check.
    static OWNED: RefCell<Option<OwnedContext>> = const { RefCell::new(None) };

    /// Jobs submitted from the owner thread while another job is running.
    static PARKED_JOBS: RefCell<VecDeque<Job>> = const { RefCell::new(VecDeque::new()) };

    /// Whether the owner thread is currently draining jobs.
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Spawns and owns the dedicated mutation thread for one table.
///
/// Dropping the executor closes its end of the job channel; the owner thread
/// exits once every outstanding [`ExecutorHandle`] is gone and the queue has
/// drained.
pub struct SerialExecutor {
    tx: Sender<Job>,
    executor_id: u64,
}

/// Cheap, clonable submission handle to one table's owner thread.
#[derive(Clone)]
pub(crate) struct ExecutorHandle {
    tx: Sender<Job>,
    executor_id: u64,
}

impl SerialExecutor {
    /// Moves the store onto a fresh owner thread and starts the job loop.
    pub(crate) fn spawn(store: RowStore) -> Self {
        let executor_id = NEXT_EXECUTOR_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel::<Job>();

        thread::Builder::new()
            .name("crawl-table-owner".to_string())
            .spawn(move || {
                OWNED.with(|slot| {
                    *slot.borrow_mut() = Some(OwnedContext {
                        executor_id,
                        store: Rc::new(RefCell::new(store)),
                    });
                });
                log::debug!("table owner thread started (executor {})", executor_id);

                while let Ok(job) = rx.recv() {
                    run_on_owner(job);
                }

                // Clearing the slot drops the store (and with it any live bus
                // subscription) on the owner thread.
                OWNED.with(|slot| *slot.borrow_mut() = None);
                log::debug!("table owner thread stopped (executor {})", executor_id);
            })
            .expect("failed to spawn table owner thread");

        Self { tx, executor_id }
    }

    pub(crate) fn handle(&self) -> ExecutorHandle {
        ExecutorHandle {
            tx: self.tx.clone(),
            executor_id: self.executor_id,
        }
    }
}

impl ExecutorHandle {
    /// True when the calling thread is this table's owning context.
    pub(crate) fn on_owner_thread(&self) -> bool {
        OWNED.with(|slot| {
            slot.borrow()
                .as_ref()
                .map_or(false, |owned| owned.executor_id == self.executor_id)
        })
    }

    /// Runs the job on the owning context: synchronously when already there,
    /// enqueued fire-and-forget otherwise.
    pub(crate) fn execute(&self, job: Job) {
        if self.on_owner_thread() {
            run_on_owner(job);
            return;
        }

        // A closed channel means the table was dropped; late submissions
        // from lingering producers are dropped with it.
        if self.tx.send(job).is_err() {
            log::debug!("table owner thread gone, dropping submitted job");
        }
    }

    /// Runs a read against the store and returns its result.
    ///
    /// Off-thread callers block until the owner thread reaches this job,
    /// which orders the read after every mutation the caller already
    /// submitted. On-thread callers read directly.
    ///
    /// # Panics
    /// When the owner thread has terminated, or when called from inside a
    /// running mutation (observers receive consistent state already and must
    /// not re-enter the read path).
    pub(crate) fn query<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&RowStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.on_owner_thread() {
            let store = OWNED.with(|slot| {
                Rc::clone(&slot.borrow().as_ref().expect("owner context missing").store)
            });
            let result = f(&store.borrow());
            return result;
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        self.execute(Box::new(move |store| {
            let _ = reply_tx.send(f(store));
        }));
        reply_rx.recv().expect("table owner thread terminated")
    }
}

/// Executes a job on the owner thread, deferring nested submissions until
/// the current one finishes.
fn run_on_owner(job: Job) {
    PARKED_JOBS.with(|q| q.borrow_mut().push_back(job));

    if DRAINING.with(|d| d.get()) {
        // Re-entrant submission from a running job; the active drain loop
        // picks it up next.
        return;
    }

    DRAINING.with(|d| d.set(true));
    let store = OWNED.with(|slot| {
        Rc::clone(&slot.borrow().as_ref().expect("owner context missing").store)
    });

    loop {
        let next = PARKED_JOBS.with(|q| q.borrow_mut().pop_front());
        match next {
            Some(job) => job(&mut store.borrow_mut()),
            None => break,
        }
    }
    DRAINING.with(|d| d.set(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TableEntry;
    use crate::sources::InMemoryFindingStore;
    use crate::store::TableUpdate;
    use crate::types::CaptureRecord;
    use std::sync::Arc;

    fn spawn_store() -> SerialExecutor {
        let findings = Arc::new(InMemoryFindingStore::new());
        SerialExecutor::spawn(RowStore::new(findings))
    }

    fn entry(id: u64) -> TableEntry {
        let record = CaptureRecord::new(id, "GET", format!("http://host/{}", id));
        TableEntry::new(&record, false)
    }

    fn tracked_ids(handle: &ExecutorHandle) -> Vec<u64> {
        handle.query(|store| {
            (0..store.row_count())
                .map(|row| store.entry_at(row).record_id())
                .collect()
        })
    }

    #[test]
    fn jobs_from_one_producer_run_in_submission_order() {
        let executor = spawn_store();
        let handle = executor.handle();

        for id in 0..50u64 {
            let e = entry(id);
            handle.execute(Box::new(move |store| {
                store.append(e);
            }));
        }

        assert_eq!(tracked_ids(&handle), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn query_observes_previously_submitted_mutations() {
        let executor = spawn_store();
        let handle = executor.handle();

        handle.execute(Box::new(|store| {
            store.append(entry(1));
        }));
        assert_eq!(handle.query(|store| store.row_count()), 1);
    }

    #[test]
    fn owner_context_is_detected_per_executor() {
        let executor = spawn_store();
        let handle = executor.handle();

        assert!(!handle.on_owner_thread());

        let probe = handle.clone();
        assert!(handle.query(move |_| probe.on_owner_thread()));

        // Another table's owner thread is not this table's owning context.
        let other = spawn_store();
        let foreign_probe = handle.clone();
        assert!(!other.handle().query(move |_| foreign_probe.on_owner_thread()));
    }

    #[test]
    fn reentrant_submission_from_observer_is_deferred_not_deadlocked() {
        let executor = spawn_store();
        let handle = executor.handle();

        // An observer that reacts to the first insert by scheduling another
        // append through the same dispatch path.
        let reentry = handle.clone();
        let mut fired = false;
        handle.execute(Box::new(move |store| {
            store.add_observer(Box::new(move |update: &TableUpdate| {
                if let TableUpdate::RowsInserted { first: 0, .. } = update {
                    if !fired {
                        fired = true;
                        reentry.execute(Box::new(|store| {
                            store.append(entry(99));
                        }));
                    }
                }
            }));
        }));

        handle.execute(Box::new(|store| {
            store.append(entry(1));
        }));

        assert_eq!(tracked_ids(&handle), vec![1, 99]);
    }

    #[test]
    fn concurrent_producers_all_land() {
        let executor = spawn_store();
        let mut producers = Vec::new();

        for p in 0..4u64 {
            let handle = executor.handle();
            producers.push(thread::spawn(move || {
                for i in 0..25u64 {
                    let e = entry(p * 100 + i);
                    handle.execute(Box::new(move |store| {
                        store.append(e);
                    }));
                }
            }));
        }
        for producer in producers {
            producer.join().unwrap();
        }

        let handle = executor.handle();
        assert_eq!(handle.query(|store| store.row_count()), 100);
    }
}
