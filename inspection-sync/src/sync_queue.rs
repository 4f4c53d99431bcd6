//! Deferred upload of dirty shifts
//!
//! Protocol flow for one shift:
//! 1. Connectivity pre-check (offline fails fast)
//! 2. Snapshot the shift and its whole record graph
//! 3. Submit: create when no remote id is known, update otherwise
//! 4. Reconcile: store remote ids, mark inspections submitted, clear the
//!    dirty flag only if nothing was edited since the snapshot
//!
//! Transient transport failures are retried with exponential backoff. Any
//! failure leaves the shift dirty with `last_sync_error` set. A push in flight
//! cannot be cancelled.

use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::error::{SyncError, SyncResult};
use crate::models::{InspectionRecord, InspectionStatus, ShiftRecord};
use crate::remote::{Connectivity, RemoteApi, ShiftPayload, SubmitReceipt};
use crate::store::{RecordStore, StoreTransaction};

/// Mark a shift dirty as part of an enclosing edit transaction.
pub async fn mark_dirty_in(tx: &mut StoreTransaction, shift_id: Uuid) -> SyncResult<ShiftRecord> {
    let mut shift: ShiftRecord = tx.require(shift_id).await?;
    shift.touch();
    tx.put(&shift).await?;
    Ok(shift)
}

/// Outcome of a `sync_pending` run
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    /// Local shift id and the remote id the server assigned
    pub pushed: Vec<(Uuid, i64)>,
    pub failed: Vec<(Uuid, String)>,
    /// Dirty but incomplete (start or end time missing)
    pub skipped: Vec<Uuid>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SyncQueue {
    store: Arc<RecordStore>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn Connectivity>,
    retry: RetryPolicy,
}

impl SyncQueue {
    pub fn new(
        store: Arc<RecordStore>,
        remote: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn Connectivity>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
            retry,
        }
    }

    /// Dirty shifts owned by `owner_id`, oldest first.
    pub async fn pending_records(&self, owner_id: &str) -> Vec<ShiftRecord> {
        let mut shifts = self
            .store
            .query::<ShiftRecord, _>(|s| s.should_sync && s.user_id == owner_id)
            .await;
        shifts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        shifts
    }

    pub async fn mark_dirty(&self, shift_id: Uuid) -> SyncResult<()> {
        let mut tx = self.store.begin().await?;
        let shift = mark_dirty_in(&mut tx, shift_id).await?;
        tx.commit().await?;

        tracing::debug!(shift_id = %shift_id, revision = shift.revision, "Marked shift dirty");
        Ok(())
    }

    /// Upload one shift with everything it owns. Returns the shift's remote id.
    pub async fn push(&self, shift_id: Uuid) -> SyncResult<i64> {
        if self.connectivity.status().is_offline() {
            tracing::debug!(shift_id = %shift_id, "Offline, not pushing");
            return Err(SyncError::NetworkUnavailable);
        }

        let payload = self.snapshot(shift_id).await?;
        match self.submit_with_retry(&payload).await {
            Ok(receipt) => {
                self.reconcile(&payload, &receipt).await?;
                Ok(receipt.id)
            }
            Err(e) => {
                self.record_failure(shift_id, &e).await;
                Err(e)
            }
        }
    }

    /// Push every complete dirty shift of `owner_id`.
    pub async fn sync_pending(&self, owner_id: &str) -> SyncReport {
        let mut report = SyncReport::default();

        for shift in self.pending_records(owner_id).await {
            if !shift.is_complete() {
                tracing::debug!(shift_id = %shift.id, "Skipping incomplete shift");
                report.skipped.push(shift.id);
                continue;
            }

            match self.push(shift.id).await {
                Ok(remote_id) => report.pushed.push((shift.id, remote_id)),
                Err(e) => report.failed.push((shift.id, e.to_string())),
            }
        }

        tracing::info!(
            owner = owner_id,
            pushed = report.pushed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Sync pass finished"
        );
        report
    }

    /// Run `sync_pending` on the tokio runtime.
    pub fn spawn_sync_pending(
        self: &Arc<Self>,
        owner_id: impl Into<String>,
    ) -> JoinHandle<SyncReport> {
        let queue = Arc::clone(self);
        let owner_id = owner_id.into();
        tokio::spawn(async move { queue.sync_pending(&owner_id).await })
    }

    /// Consistent read of the shift graph. Taken under the write gate so no
    /// edit lands halfway through.
    async fn snapshot(&self, shift_id: Uuid) -> SyncResult<ShiftPayload> {
        let mut tx = self.store.begin().await?;
        let shift: ShiftRecord = tx.require(shift_id).await?;
        let mut inspections = Vec::new();
        for inspection in tx.shift_inspections(shift_id).await? {
            inspections.push(tx.aggregate(inspection.id).await?);
        }
        tx.rollback().await?;

        Ok(ShiftPayload::new(shift, inspections))
    }

    async fn submit_with_retry(&self, payload: &ShiftPayload) -> SyncResult<SubmitReceipt> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.remote.submit_shift(payload).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        shift_id = %payload.local_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Push failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() && max_attempts > 1 => {
                    return Err(SyncError::RetriesExhausted {
                        attempts: attempt + 1,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn reconcile(&self, payload: &ShiftPayload, receipt: &SubmitReceipt) -> SyncResult<()> {
        let mut tx = self.store.begin().await?;
        let mut shift: ShiftRecord = tx.require(payload.local_id).await?;

        shift.remote_id = Some(receipt.id);
        shift.last_sync_error = None;
        shift.synced_revision = Some(payload.revision);
        if shift.revision == payload.revision {
            shift.should_sync = false;
        } else {
            tracing::debug!(
                shift_id = %shift.id,
                pushed = payload.revision,
                current = shift.revision,
                "Shift edited during push, staying dirty"
            );
        }
        tx.put(&shift).await?;

        for accepted in &receipt.inspections {
            if let Some(mut inspection) = tx.get::<InspectionRecord>(accepted.local_id).await? {
                inspection.remote_id = Some(accepted.id);
                inspection.status = InspectionStatus::Submitted;
                tx.put(&inspection).await?;
            }
        }
        tx.commit().await?;

        tracing::info!(
            shift_id = %payload.local_id,
            remote_id = receipt.id,
            inspections = receipt.inspections.len(),
            "Shift synced"
        );
        Ok(())
    }

    async fn record_failure(&self, shift_id: Uuid, error: &SyncError) {
        tracing::warn!(shift_id = %shift_id, error = %error, "Push failed");

        let message = error.to_string();
        let result = self
            .store
            .update::<ShiftRecord, _>(shift_id, |shift| {
                shift.last_sync_error = Some(message);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::error!(shift_id = %shift_id, error = %e, "Could not record sync failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftStatus;
    use crate::remote::{ConnectivityStatus, MockRemote, StaticConnectivity};
    use crate::store::tests::create_test_store;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    async fn complete_shift(store: &RecordStore) -> ShiftRecord {
        let mut shift = ShiftRecord::new(NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(), "Osoyoos");
        shift.start_time = "07:00".to_string();
        shift.end_time = "15:00".to_string();
        store.create(shift).await.unwrap()
    }

    fn queue(
        store: Arc<RecordStore>,
        remote: Arc<dyn RemoteApi>,
        status: ConnectivityStatus,
        retry: RetryPolicy,
    ) -> SyncQueue {
        SyncQueue::new(store, remote, Arc::new(StaticConnectivity::new(status)), retry)
    }

    #[tokio::test]
    async fn test_push_twice_updates_same_resource() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        let queue = queue(store.clone(), remote.clone(), ConnectivityStatus::Online, fast_retry(3));

        let shift = complete_shift(&store).await;
        let inspection = store.create(InspectionRecord::new(shift.id)).await.unwrap();

        let first = queue.push(shift.id).await.unwrap();
        let synced: ShiftRecord = store.require(shift.id).await.unwrap();
        assert_eq!(synced.status(), ShiftStatus::Synced);
        assert_eq!(synced.remote_id, Some(first));

        let submitted: InspectionRecord = store.require(inspection.id).await.unwrap();
        assert_eq!(submitted.status, InspectionStatus::Submitted);
        assert!(submitted.remote_id.is_some());

        queue.mark_dirty(shift.id).await.unwrap();
        let second = queue.push(shift.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(remote.creates(), 1);
        assert_eq!(remote.updates(), 1);
        assert_eq!(remote.resource_count().await, 1);
    }

    #[tokio::test]
    async fn test_offline_fails_fast_without_submitting() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        let queue = queue(store.clone(), remote.clone(), ConnectivityStatus::Offline, fast_retry(3));

        let shift = complete_shift(&store).await;
        let err = queue.push(shift.id).await.unwrap_err();

        assert!(matches!(err, SyncError::NetworkUnavailable));
        assert_eq!(remote.submit_attempts(), 0);
        let unchanged: ShiftRecord = store.require(shift.id).await.unwrap();
        assert!(unchanged.should_sync);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        remote
            .fail_next([SyncError::Network("connection reset".to_string())])
            .await;
        let queue = queue(store.clone(), remote.clone(), ConnectivityStatus::Unknown, fast_retry(3));

        let shift = complete_shift(&store).await;
        queue.push(shift.id).await.unwrap();

        assert_eq!(remote.submit_attempts(), 2);
        let synced: ShiftRecord = store.require(shift.id).await.unwrap();
        assert!(!synced.should_sync);
        assert!(synced.last_sync_error.is_none());
    }

    #[tokio::test]
    async fn test_retries_exhausted_leaves_record_dirty() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        remote
            .fail_next((0..3).map(|_| SyncError::Network("timeout".to_string())))
            .await;
        let queue = queue(store.clone(), remote.clone(), ConnectivityStatus::Online, fast_retry(3));

        let shift = complete_shift(&store).await;
        let err = queue.push(shift.id).await.unwrap_err();

        assert!(matches!(err, SyncError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(remote.submit_attempts(), 3);

        let failed: ShiftRecord = store.require(shift.id).await.unwrap();
        assert!(failed.should_sync);
        assert_eq!(failed.status(), ShiftStatus::SyncFailed);
        assert_eq!(failed.revision, shift.revision);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        remote
            .fail_next([SyncError::RemoteRejected("400 Bad Request".to_string())])
            .await;
        let queue = queue(store.clone(), remote.clone(), ConnectivityStatus::Online, fast_retry(3));

        let shift = complete_shift(&store).await;
        let err = queue.push(shift.id).await.unwrap_err();

        assert!(matches!(err, SyncError::RemoteRejected(_)));
        assert_eq!(remote.submit_attempts(), 1);
    }

    /// Remote that edits the shift while the submission is in flight.
    struct EditingRemote {
        inner: MockRemote,
        store: Arc<RecordStore>,
    }

    #[async_trait]
    impl RemoteApi for EditingRemote {
        async fn fetch_codes(&self) -> SyncResult<serde_json::Value> {
            self.inner.fetch_codes().await
        }

        async fn fetch_water_bodies(&self) -> SyncResult<serde_json::Value> {
            self.inner.fetch_water_bodies().await
        }

        async fn submit_shift(&self, payload: &ShiftPayload) -> SyncResult<SubmitReceipt> {
            let mut tx = self.store.begin().await?;
            mark_dirty_in(&mut tx, payload.local_id).await?;
            tx.commit().await?;
            self.inner.submit_shift(payload).await
        }
    }

    #[tokio::test]
    async fn test_edit_during_push_keeps_shift_dirty() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(EditingRemote {
            inner: MockRemote::new(),
            store: store.clone(),
        });
        let queue = queue(store.clone(), remote, ConnectivityStatus::Online, fast_retry(1));

        let shift = complete_shift(&store).await;
        let remote_id = queue.push(shift.id).await.unwrap();

        let after: ShiftRecord = store.require(shift.id).await.unwrap();
        assert!(after.should_sync);
        assert_eq!(after.remote_id, Some(remote_id));
        assert_eq!(after.synced_revision, Some(shift.revision));
        assert_eq!(after.revision, shift.revision + 1);
    }

    #[tokio::test]
    async fn test_sync_pending_skips_incomplete_shifts() {
        let (store, _dir) = create_test_store().await;
        let store = Arc::new(store);
        let remote = Arc::new(MockRemote::new());
        let queue = Arc::new(queue(
            store.clone(),
            remote.clone(),
            ConnectivityStatus::Online,
            fast_retry(1),
        ));

        let complete = complete_shift(&store).await;
        let incomplete = store
            .create(ShiftRecord::new(NaiveDate::from_ymd_opt(2024, 7, 3).unwrap(), "Golden"))
            .await
            .unwrap();

        assert_eq!(queue.pending_records("test_user").await.len(), 2);
        assert!(queue.pending_records("someone_else").await.is_empty());

        let report = queue.spawn_sync_pending("test_user").await.unwrap();
        assert_eq!(report.pushed.len(), 1);
        assert_eq!(report.pushed[0].0, complete.id);
        assert_eq!(report.skipped, vec![incomplete.id]);
        assert!(report.is_clean());
        assert_eq!(queue.pending_records("test_user").await.len(), 1);
    }
}
