//! Per-user session root
//!
//! Owns the store, the code table cache and the sync queue for one signed-in
//! user. Hosts create one context at sign-in and call `shutdown` at sign-out.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::code_tables::CodeTableCache;
use crate::config::InspectionConfig;
use crate::error::SyncResult;
use crate::form::{FormSession, ShiftSession};
use crate::models::ShiftRecord;
use crate::remote::{Connectivity, HttpRemote, RemoteApi};
use crate::store::RecordStore;
use crate::sync_queue::SyncQueue;

pub struct InspectionContext {
    store: Arc<RecordStore>,
    code_tables: Arc<CodeTableCache>,
    sync_queue: Arc<SyncQueue>,
}

impl InspectionContext {
    pub async fn open(
        config: InspectionConfig,
        remote: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn Connectivity>,
    ) -> SyncResult<Self> {
        let store = Arc::new(RecordStore::open(config.store).await?);
        let code_tables = Arc::new(CodeTableCache::new(
            store.clone(),
            remote.clone(),
            config.code_tables,
        ));
        let sync_queue = Arc::new(SyncQueue::new(
            store.clone(),
            remote,
            connectivity,
            config.retry,
        ));

        tracing::info!(user_id = %store.user_id(), "Inspection context opened");
        Ok(Self {
            store,
            code_tables,
            sync_queue,
        })
    }

    /// Open with the reqwest client configured under `remote`.
    pub async fn open_http(
        config: InspectionConfig,
        connectivity: Arc<dyn Connectivity>,
    ) -> SyncResult<Self> {
        let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemote::new(config.remote.clone())?);
        Self::open(config, remote, connectivity).await
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn code_tables(&self) -> &Arc<CodeTableCache> {
        &self.code_tables
    }

    pub fn sync_queue(&self) -> &Arc<SyncQueue> {
        &self.sync_queue
    }

    pub fn user_id(&self) -> &str {
        self.store.user_id()
    }

    /// Create a draft shift owned by the session user.
    pub async fn start_shift(&self, date: NaiveDate, location: &str) -> SyncResult<ShiftRecord> {
        let shift = self.store.create(ShiftRecord::new(date, location)).await?;
        tracing::info!(shift_id = %shift.id, date = %shift.formatted_date(), "Shift started");
        Ok(shift)
    }

    /// The session user's shifts, newest first.
    pub async fn shifts(&self) -> Vec<ShiftRecord> {
        let user_id = self.user_id().to_string();
        let mut shifts = self
            .store
            .query::<ShiftRecord, _>(|s| s.user_id == user_id)
            .await;
        shifts.sort_by(|a, b| {
            b.shift_date
                .cmp(&a.shift_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        shifts
    }

    pub async fn shift_session(&self, shift_id: Uuid) -> SyncResult<ShiftSession> {
        ShiftSession::open(self.store.clone(), shift_id).await
    }

    pub async fn form_session(&self, inspection_id: Uuid) -> SyncResult<FormSession> {
        FormSession::open(self.store.clone(), inspection_id).await
    }

    /// Close the database pool. Spawned refresh or sync tasks should be
    /// awaited first.
    pub async fn shutdown(self) {
        self.store.close().await;
        tracing::info!("Inspection context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::remote::{MockRemote, StaticConnectivity};
    use tempfile::TempDir;

    async fn open_context(dir: &TempDir, user: &str) -> InspectionContext {
        let config = InspectionConfig {
            store: StoreConfig {
                db_path: dir.path().join("inspect.db").to_string_lossy().to_string(),
                user_id: user.to_string(),
                ..StoreConfig::default()
            },
            ..InspectionConfig::default()
        };
        InspectionContext::open(
            config,
            Arc::new(MockRemote::new()),
            Arc::new(StaticConnectivity::default()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_shifts_are_per_user_newest_first() {
        let dir = TempDir::new().unwrap();
        let ctx = open_context(&dir, "officer_a").await;
        let older = ctx
            .start_shift(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), "Golden")
            .await
            .unwrap();
        let newer = ctx
            .start_shift(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), "Golden")
            .await
            .unwrap();
        assert_eq!(newer.user_id, "officer_a");
        ctx.shutdown().await;

        let other = open_context(&dir, "officer_b").await;
        assert!(other.shifts().await.is_empty());
        other.shutdown().await;

        let ctx = open_context(&dir, "officer_a").await;
        let ids: Vec<_> = ctx.shifts().await.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_sessions_require_existing_records() {
        let dir = TempDir::new().unwrap();
        let ctx = open_context(&dir, "officer_a").await;
        assert!(ctx.form_session(Uuid::new_v4()).await.is_err());
        assert!(ctx.shift_session(Uuid::new_v4()).await.is_err());
    }
}
