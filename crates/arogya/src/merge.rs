//! Combining server and queued records for display.

use tracing::{debug, warn};

use crate::api::{ApiResult, RecordSource};
use crate::queue::SyncQueue;
use crate::record::HealthRecord;

/// Build the display list: remote records newest first, then queued records
/// in enqueue order.
///
/// Ties in `date` keep the server's order. Queued records are always emitted
/// with `is_synced = false`.
#[must_use]
pub fn merge(remote: &[HealthRecord], queued: &[HealthRecord]) -> Vec<HealthRecord> {
    let mut merged: Vec<HealthRecord> = remote.to_vec();
    merged.sort_by(|a, b| b.date.cmp(&a.date));

    merged.extend(queued.iter().cloned().map(|mut record| {
        record.is_synced = false;
        record
    }));
    merged
}

/// Merge the result of a fetch, treating any failure as an empty remote set.
#[must_use]
pub fn merge_fetched(
    fetched: ApiResult<Vec<HealthRecord>>,
    queued: &[HealthRecord],
) -> Vec<HealthRecord> {
    match fetched {
        Ok(remote) => merge(&remote, queued),
        Err(e) => {
            warn!("Showing offline records only: {e}");
            merge(&[], queued)
        }
    }
}

/// A records screen's worth of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    /// Records in display order.
    pub records: Vec<HealthRecord>,
    /// How many of them are still waiting to sync.
    pub pending: usize,
}

impl RecordView {
    /// Fetch the user's records and merge the local queue in.
    pub async fn load<A: RecordSource + ?Sized>(
        api: &A,
        user_id: &str,
        queue: &SyncQueue,
    ) -> Self {
        let fetched = api.fetch_records(user_id).await;
        let queued = queue.snapshot();
        let records = merge_fetched(fetched, &queued);
        debug!(
            total = records.len(),
            pending = queued.len(),
            "Record view loaded"
        );
        Self {
            records,
            pending: queued.len(),
        }
    }
}
