//! In-process `RemoteApi` for tests and offline demos.
//!
//! Keeps submitted shifts in memory, hands out sequential remote ids and can
//! be scripted to fail the next N submissions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{SyncError, SyncResult};
use crate::remote::{InspectionReceipt, RemoteApi, ShiftPayload, SubmitReceipt};

pub struct MockRemote {
    codes: Mutex<serde_json::Value>,
    water_bodies: Mutex<serde_json::Value>,
    failures: Mutex<VecDeque<SyncError>>,
    shifts: Mutex<HashMap<i64, ShiftPayload>>,
    next_id: AtomicI64,
    creates: AtomicUsize,
    updates: AtomicUsize,
    submit_attempts: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(serde_json::json!({})),
            water_bodies: Mutex::new(serde_json::json!([])),
            failures: Mutex::new(VecDeque::new()),
            shifts: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            submit_attempts: AtomicUsize::new(0),
        }
    }

    pub async fn set_codes(&self, codes: serde_json::Value) {
        *self.codes.lock().await = codes;
    }

    pub async fn set_water_bodies(&self, water_bodies: serde_json::Value) {
        *self.water_bodies.lock().await = water_bodies;
    }

    /// Fail the next submissions (and fetches) with these errors, in order.
    pub async fn fail_next(&self, errors: impl IntoIterator<Item = SyncError>) {
        self.failures.lock().await.extend(errors);
    }

    /// Number of distinct shifts the server holds
    pub async fn resource_count(&self) -> usize {
        self.shifts.lock().await.len()
    }

    pub async fn stored_shift(&self, remote_id: i64) -> Option<ShiftPayload> {
        self.shifts.lock().await.get(&remote_id).cloned()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn submit_attempts(&self) -> usize {
        self.submit_attempts.load(Ordering::SeqCst)
    }

    async fn scripted_failure(&self) -> SyncResult<()> {
        match self.failures.lock().await.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn fetch_codes(&self) -> SyncResult<serde_json::Value> {
        self.scripted_failure().await?;
        Ok(self.codes.lock().await.clone())
    }

    async fn fetch_water_bodies(&self) -> SyncResult<serde_json::Value> {
        self.scripted_failure().await?;
        Ok(self.water_bodies.lock().await.clone())
    }

    async fn submit_shift(&self, payload: &ShiftPayload) -> SyncResult<SubmitReceipt> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        self.scripted_failure().await?;

        let mut shifts = self.shifts.lock().await;
        let id = match payload.remote_id {
            Some(remote_id) => {
                if !shifts.contains_key(&remote_id) {
                    return Err(SyncError::RemoteRejected(format!(
                        "Unknown shift {}",
                        remote_id
                    )));
                }
                self.updates.fetch_add(1, Ordering::SeqCst);
                remote_id
            }
            None => {
                self.creates.fetch_add(1, Ordering::SeqCst);
                self.allocate_id()
            }
        };

        let inspections = payload
            .inspections
            .iter()
            .map(|aggregate| InspectionReceipt {
                local_id: aggregate.inspection.id,
                id: aggregate
                    .inspection
                    .remote_id
                    .unwrap_or_else(|| self.allocate_id()),
            })
            .collect();

        shifts.insert(id, payload.clone());
        Ok(SubmitReceipt { id, inspections })
    }
}
