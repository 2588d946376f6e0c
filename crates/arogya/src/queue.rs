//! Offline sync queue.
//!
//! Records created while the server is unreachable are appended here and
//! written through to the [`KeyValueStore`] before `enqueue` returns. A flush
//! submits the queue as one batch; success removes exactly the records that
//! were submitted, failure leaves everything in place for the next attempt.
//!
//! The in-memory list sits behind a `std::sync::Mutex` that is never held
//! across an `.await`. At most one flush runs at a time; the guard is an
//! atomic flag cleared on drop, so a cancelled flush future cannot wedge the
//! queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, RecordSink};
use crate::connectivity::ConnectivityEvent;
use crate::record::HealthRecord;
use crate::storage::{read_json, write_json, KeyValueStore, OFFLINE_RECORDS_KEY};

/// Result of a flush attempt.
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing was queued.
    Empty,
    /// Another flush is outstanding; nothing was submitted.
    AlreadyInFlight,
    /// The batch was accepted and removed from the queue.
    Flushed {
        /// Number of records submitted.
        count: usize,
    },
    /// The batch was rejected or the server was unreachable.
    Failed {
        /// Why the submission failed.
        error: ApiError,
    },
}

impl FlushOutcome {
    /// Whether records reached the server.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        matches!(self, Self::Flushed { .. })
    }
}

/// Ordered buffer of records awaiting upload.
#[derive(Debug)]
pub struct SyncQueue {
    store: Arc<dyn KeyValueStore>,
    records: Mutex<Vec<HealthRecord>>,
    flushing: AtomicBool,
    last_offline_id: AtomicU64,
}

/// Clears the in-flight flag however the flush ends.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncQueue {
    /// Load the persisted queue.
    ///
    /// A missing key yields an empty queue. A value that cannot be read or
    /// decoded is logged and also treated as empty.
    #[must_use]
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let records: Vec<HealthRecord> = match read_json(store.as_ref(), OFFLINE_RECORDS_KEY) {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Discarding unreadable offline queue: {e}");
                Vec::new()
            }
        };

        let last_offline_id = records
            .iter()
            .filter_map(|r| r.offline_id.as_deref()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        if !records.is_empty() {
            info!(count = records.len(), "Restored offline queue");
        }

        Self {
            store,
            records: Mutex::new(records),
            flushing: AtomicBool::new(false),
            last_offline_id: AtomicU64::new(last_offline_id),
        }
    }

    fn records(&self) -> MutexGuard<'_, Vec<HealthRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Millisecond timestamp, bumped past the previous id so ids stay
    /// strictly increasing even within one millisecond.
    fn next_offline_id(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last_offline_id.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_offline_id.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    fn persist(&self, records: &[HealthRecord]) {
        let result = if records.is_empty() {
            self.store.remove(OFFLINE_RECORDS_KEY)
        } else {
            write_json(self.store.as_ref(), OFFLINE_RECORDS_KEY, records)
        };
        if let Err(e) = result {
            error!(count = records.len(), "Failed to persist offline queue: {e}");
        }
    }

    /// Append a record and write the queue through to the store.
    ///
    /// The record gets a fresh `offline_id`, loses any server `id`, and is
    /// marked unsynced. Returns the record as stored. A store failure is
    /// logged; the record stays queued for this session either way.
    pub fn enqueue(&self, mut record: HealthRecord) -> HealthRecord {
        record.id = None;
        record.is_synced = false;
        record.offline_id = Some(self.next_offline_id().to_string());

        let mut records = self.records();
        records.push(record.clone());
        self.persist(&records);
        debug!(
            offline_id = record.offline_id.as_deref().unwrap_or_default(),
            queued = records.len(),
            "Record queued"
        );
        record
    }

    /// Submit the queued records as one batch.
    ///
    /// The batch is snapshotted when the flush starts; records enqueued while
    /// it is outstanding stay queued after a success.
    pub async fn flush<S: RecordSink + ?Sized>(&self, sink: &S) -> FlushOutcome {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("Flush already in flight");
            return FlushOutcome::AlreadyInFlight;
        }
        let _guard = FlushGuard(&self.flushing);

        let batch = self.snapshot();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        debug!(count = batch.len(), "Submitting offline batch");
        match sink.submit_batch(&batch).await {
            Ok(receipt) => {
                let mut records = self.records();
                let submitted = batch.len().min(records.len());
                records.drain(..submitted);
                self.persist(&records);
                info!(
                    count = batch.len(),
                    synced = receipt.synced_count,
                    remaining = records.len(),
                    "Offline records synced"
                );
                FlushOutcome::Flushed { count: batch.len() }
            }
            Err(error) => {
                warn!(count = batch.len(), "Sync failed, keeping queue: {error}");
                FlushOutcome::Failed { error }
            }
        }
    }

    /// Number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Copy of the queued records in enqueue order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HealthRecord> {
        self.records().clone()
    }

    /// Whether a flush is outstanding.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }
}

/// Flush the queue once on every `Reconnected` edge.
///
/// The task ends when the event channel closes.
pub fn spawn_flush_on_reconnect<S>(
    queue: Arc<SyncQueue>,
    sink: Arc<S>,
    mut events: broadcast::Receiver<ConnectivityEvent>,
) -> JoinHandle<()>
where
    S: RecordSink + ?Sized + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectivityEvent::Reconnected) => {
                    let outcome = queue.flush(sink.as_ref()).await;
                    debug!(?outcome, "Reconnect flush finished");
                }
                Ok(ConnectivityEvent::Disconnected) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Connectivity events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
