//! Local record store
//!
//! Provides:
//! - Typed JSON documents in one SQLite `records` table, keyed by collection and id
//! - Parent back-references for owned children
//! - Scoped write transactions serialised through a single write gate
//! - Explicit cascade deletion for shifts and inspections
//!
//! Read paths used by list screens (`query`, `children`) never fail: storage
//! errors are logged and degrade to an empty result. `try_*` variants expose them.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{Row, Sqlite, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{
    HighRiskAssessment, InspectionAggregate, InspectionRecord, MajorCityVisit, ShiftRecord,
    WaterBodyVisit,
};

/// A document persisted in the record store.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Collection the record lives in
    const COLLECTION: &'static str;

    /// Primary key within the collection
    fn key(&self) -> String;

    /// Key of the owning record, if any
    fn parent_key(&self) -> Option<String> {
        None
    }

    /// Called once by `RecordStore::create` with a fresh local id
    fn assign_id(&mut self, id: Uuid);

    /// Called by `RecordStore::create` with the session user
    fn assign_owner(&mut self, _owner: &str) {}
}

/// Local record store handle
pub struct RecordStore {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
    user_id: String,
}

impl RecordStore {
    /// Open (creating if missing) the database at `config.db_path`
    pub async fn open(config: StoreConfig) -> SyncResult<Self> {
        let journal_mode = if config.enable_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path))?
            .create_if_missing(true)
            .journal_mode(journal_mode)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
            user_id: config.user_id,
        };
        store.initialize_schema().await?;

        tracing::debug!(db_path = %config.db_path, wal = config.enable_wal, "Opened record store");
        Ok(store)
    }

    async fn initialize_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                parent_id TEXT,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_parent ON records(collection, parent_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// User stamped onto newly created owned records
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Assign a fresh local id (and owner) and persist the record.
    pub async fn create<T: Record>(&self, mut record: T) -> SyncResult<T> {
        record.assign_id(Uuid::new_v4());
        if !self.user_id.is_empty() {
            record.assign_owner(&self.user_id);
        }

        let mut tx = self.begin().await?;
        tx.put(&record).await?;
        tx.commit().await?;

        tracing::debug!(collection = T::COLLECTION, id = %record.key(), "Created record");
        Ok(record)
    }

    pub async fn get<T: Record>(&self, key: impl Display) -> SyncResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one::<T>(&mut conn, &key.to_string()).await
    }

    /// Like `get`, but a missing record is `NotFound`.
    pub async fn require<T: Record>(&self, key: impl Display) -> SyncResult<T> {
        let key = key.to_string();
        self.get::<T>(&key)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("{}/{}", T::COLLECTION, key)))
    }

    /// All records of a collection matching `predicate`, in insertion order.
    /// Storage failures are logged and yield an empty list.
    pub async fn query<T, P>(&self, predicate: P) -> Vec<T>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        match self.try_query(predicate).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(collection = T::COLLECTION, error = %e, "Query failed");
                Vec::new()
            }
        }
    }

    pub async fn try_query<T, P>(&self, predicate: P) -> SyncResult<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        let mut conn = self.pool.acquire().await?;
        let records = fetch_all::<T>(&mut conn, None).await?;
        Ok(records.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Records owned by `parent`. Storage failures are logged and yield an empty list.
    pub async fn children<T: Record>(&self, parent: impl Display) -> Vec<T> {
        let parent = parent.to_string();
        match self.try_children::<T>(&parent).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(
                    collection = T::COLLECTION,
                    parent = %parent,
                    error = %e,
                    "Loading children failed"
                );
                Vec::new()
            }
        }
    }

    pub async fn try_children<T: Record>(&self, parent: impl Display) -> SyncResult<Vec<T>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all::<T>(&mut conn, Some(&parent.to_string())).await
    }

    /// Apply `mutation` to one record inside a transaction. An error from the
    /// mutation rolls everything back.
    pub async fn update<T, F>(&self, key: impl Display, mutation: F) -> SyncResult<T>
    where
        T: Record,
        F: FnOnce(&mut T) -> SyncResult<()>,
    {
        let key = key.to_string();
        let mut tx = self.begin().await?;
        let mut record = tx.require::<T>(&key).await?;
        mutation(&mut record)?;
        tx.put(&record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Start a scoped write transaction. Waits for any other writer to finish.
    pub async fn begin(&self) -> SyncResult<StoreTransaction> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(StoreTransaction { tx, _gate: gate })
    }

    /// Delete exactly one record. Owned children are left alone.
    pub async fn delete<T: Record>(&self, key: impl Display) -> SyncResult<bool> {
        let mut tx = self.begin().await?;
        let removed = tx.delete::<T>(key).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Delete an inspection with its journey legs and high-risk assessment.
    pub async fn cascade_delete_inspection(&self, inspection_id: Uuid) -> SyncResult<()> {
        let mut tx = self.begin().await?;
        tx.cascade_delete_inspection(inspection_id).await?;
        tx.commit().await
    }

    /// Delete a shift, all of its inspections and everything they own.
    pub async fn cascade_delete_shift(&self, shift_id: Uuid) -> SyncResult<()> {
        let mut tx = self.begin().await?;
        tx.cascade_delete_shift(shift_id).await?;
        tx.commit().await
    }

    /// Load an inspection with all of its children.
    pub async fn load_aggregate(&self, inspection_id: Uuid) -> SyncResult<InspectionAggregate> {
        let mut conn = self.pool.acquire().await?;
        aggregate(&mut conn, inspection_id).await
    }

    /// Inspections of a shift, oldest first.
    pub async fn shift_inspections(&self, shift_id: Uuid) -> Vec<InspectionRecord> {
        let mut inspections = self.children::<InspectionRecord>(shift_id).await;
        sort_inspections(&mut inspections);
        inspections
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Closed record store");
    }
}

/// A write transaction over the record store.
///
/// Holds the store's write gate until committed or dropped. Dropping without
/// `commit` rolls back every write made through it.
pub struct StoreTransaction {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

impl StoreTransaction {
    pub async fn get<T: Record>(&mut self, key: impl Display) -> SyncResult<Option<T>> {
        fetch_one::<T>(&mut self.tx, &key.to_string()).await
    }

    pub async fn require<T: Record>(&mut self, key: impl Display) -> SyncResult<T> {
        let key = key.to_string();
        self.get::<T>(&key)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("{}/{}", T::COLLECTION, key)))
    }

    /// Insert or replace a record under its own key.
    pub async fn put<T: Record>(&mut self, record: &T) -> SyncResult<()> {
        let body = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO records (collection, id, parent_id, body, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(collection, id) DO UPDATE SET
                parent_id = excluded.parent_id,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(T::COLLECTION)
        .bind(record.key())
        .bind(record.parent_key())
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn delete<T: Record>(&mut self, key: impl Display) -> SyncResult<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(T::COLLECTION)
            .bind(key.to_string())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn children<T: Record>(&mut self, parent: impl Display) -> SyncResult<Vec<T>> {
        fetch_all::<T>(&mut self.tx, Some(&parent.to_string())).await
    }

    pub async fn all<T: Record>(&mut self) -> SyncResult<Vec<T>> {
        fetch_all::<T>(&mut self.tx, None).await
    }

    pub async fn delete_children<T: Record>(&mut self, parent: impl Display) -> SyncResult<u64> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND parent_id = ?")
            .bind(T::COLLECTION)
            .bind(parent.to_string())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// Empty a whole collection.
    pub async fn delete_all<T: Record>(&mut self) -> SyncResult<u64> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(T::COLLECTION)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn aggregate(&mut self, inspection_id: Uuid) -> SyncResult<InspectionAggregate> {
        aggregate(&mut self.tx, inspection_id).await
    }

    pub async fn shift_inspections(&mut self, shift_id: Uuid) -> SyncResult<Vec<InspectionRecord>> {
        let mut inspections = self.children::<InspectionRecord>(shift_id).await?;
        sort_inspections(&mut inspections);
        Ok(inspections)
    }

    pub async fn cascade_delete_inspection(&mut self, inspection_id: Uuid) -> SyncResult<()> {
        let assessments = self.delete_children::<HighRiskAssessment>(inspection_id).await?;
        let water_bodies = self.delete_children::<WaterBodyVisit>(inspection_id).await?;
        let major_cities = self.delete_children::<MajorCityVisit>(inspection_id).await?;
        self.delete::<InspectionRecord>(inspection_id).await?;

        tracing::debug!(
            inspection_id = %inspection_id,
            assessments,
            water_bodies,
            major_cities,
            "Cascade deleted inspection"
        );
        Ok(())
    }

    pub async fn cascade_delete_shift(&mut self, shift_id: Uuid) -> SyncResult<()> {
        let inspections = self.children::<InspectionRecord>(shift_id).await?;
        for inspection in &inspections {
            self.cascade_delete_inspection(inspection.id).await?;
        }
        self.delete::<ShiftRecord>(shift_id).await?;

        tracing::debug!(
            shift_id = %shift_id,
            inspections = inspections.len(),
            "Cascade deleted shift"
        );
        Ok(())
    }

    pub async fn commit(self) -> SyncResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> SyncResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn fetch_one<T: Record>(conn: &mut SqliteConnection, key: &str) -> SyncResult<Option<T>> {
    let row = sqlx::query("SELECT body FROM records WHERE collection = ? AND id = ?")
        .bind(T::COLLECTION)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let body: String = row.try_get("body")?;
            Ok(Some(serde_json::from_str(&body)?))
        }
        None => Ok(None),
    }
}

async fn fetch_all<T: Record>(
    conn: &mut SqliteConnection,
    parent: Option<&str>,
) -> SyncResult<Vec<T>> {
    let rows = match parent {
        Some(parent) => {
            sqlx::query(
                "SELECT body FROM records WHERE collection = ? AND parent_id = ? ORDER BY rowid",
            )
            .bind(T::COLLECTION)
            .bind(parent)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query("SELECT body FROM records WHERE collection = ? ORDER BY rowid")
                .bind(T::COLLECTION)
                .fetch_all(&mut *conn)
                .await?
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let body: String = row.try_get("body")?;
        records.push(serde_json::from_str(&body)?);
    }
    Ok(records)
}

async fn aggregate(
    conn: &mut SqliteConnection,
    inspection_id: Uuid,
) -> SyncResult<InspectionAggregate> {
    let key = inspection_id.to_string();
    let inspection = fetch_one::<InspectionRecord>(conn, &key)
        .await?
        .ok_or_else(|| SyncError::NotFound(format!("inspections/{}", key)))?;
    let water_bodies = fetch_all::<WaterBodyVisit>(conn, Some(&key)).await?;
    let major_cities = fetch_all::<MajorCityVisit>(conn, Some(&key)).await?;
    let high_risk = fetch_all::<HighRiskAssessment>(conn, Some(&key))
        .await?
        .into_iter()
        .next();

    Ok(InspectionAggregate::from_parts(
        inspection,
        water_bodies,
        major_cities,
        high_risk,
    ))
}

fn sort_inspections(inspections: &mut [InspectionRecord]) {
    inspections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::JourneySide;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    /// A store in a fresh temp directory. Keep the directory alive for the test.
    pub(crate) async fn create_test_store() -> (RecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("records.db").to_str().unwrap().to_string();
        let config = StoreConfig {
            db_path,
            user_id: "test_user".to_string(),
            ..StoreConfig::default()
        };
        (RecordStore::open(config).await.unwrap(), dir)
    }

    fn shift() -> ShiftRecord {
        ShiftRecord::new(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), "Golden")
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_owner() {
        let (store, _dir) = create_test_store().await;

        let created = store.create(shift()).await.unwrap();
        assert!(!created.id.is_nil());
        assert_eq!(created.user_id, "test_user");

        let loaded: ShiftRecord = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_update_error_rolls_back() {
        let (store, _dir) = create_test_store().await;
        let created = store.create(shift()).await.unwrap();

        let result = store
            .update::<ShiftRecord, _>(created.id, |s| {
                s.station = "Yoho".to_string();
                Err(SyncError::InvalidField("station".to_string()))
            })
            .await;
        assert!(result.is_err());

        let loaded: ShiftRecord = store.require(created.id).await.unwrap();
        assert_eq!(loaded.station, "");

        let updated = store
            .update::<ShiftRecord, _>(created.id, |s| {
                s.station = "Yoho".to_string();
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(updated.station, "Yoho");
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, _dir) = create_test_store().await;
        let created = store.create(shift()).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut s: ShiftRecord = tx.require(created.id).await.unwrap();
            s.location = "Osoyoos".to_string();
            tx.put(&s).await.unwrap();
        }

        let loaded: ShiftRecord = store.require(created.id).await.unwrap();
        assert_eq!(loaded.location, "Golden");
    }

    #[tokio::test]
    async fn test_query_and_children() {
        let (store, _dir) = create_test_store().await;
        let a = store.create(shift()).await.unwrap();
        let b = store.create(shift()).await.unwrap();

        store.create(InspectionRecord::new(a.id)).await.unwrap();
        store.create(InspectionRecord::new(a.id)).await.unwrap();
        store.create(InspectionRecord::new(b.id)).await.unwrap();

        let all: Vec<ShiftRecord> = store.query(|_| true).await;
        assert_eq!(all.len(), 2);
        assert_eq!(store.children::<InspectionRecord>(a.id).await.len(), 2);
        assert_eq!(store.shift_inspections(b.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let (store, _dir) = create_test_store().await;
        let err = store.require::<ShiftRecord>(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_corrupt_rows_degrade_to_empty() {
        let (store, _dir) = create_test_store().await;
        sqlx::query(
            "INSERT INTO records (collection, id, parent_id, body, updated_at) VALUES ('shifts', 'x', NULL, '{not json', '')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(store.try_query::<ShiftRecord, _>(|_| true).await.is_err());
        assert!(store.query::<ShiftRecord, _>(|_| true).await.is_empty());
    }

    #[tokio::test]
    async fn test_cascade_delete_shift_removes_everything() {
        let (store, _dir) = create_test_store().await;
        let s = store.create(shift()).await.unwrap();
        let inspection = store.create(InspectionRecord::new(s.id)).await.unwrap();

        let mut visit = WaterBodyVisit::new("Kinbasket Lake", "BC", "Golden");
        visit.inspection_id = inspection.id;
        visit.side = JourneySide::Destination;
        store.create(visit).await.unwrap();
        store.create(HighRiskAssessment::new(inspection.id)).await.unwrap();

        let other = store.create(shift()).await.unwrap();
        store.create(InspectionRecord::new(other.id)).await.unwrap();

        store.cascade_delete_shift(s.id).await.unwrap();

        assert!(store.get::<ShiftRecord>(s.id).await.unwrap().is_none());
        assert_eq!(store.query::<InspectionRecord, _>(|_| true).await.len(), 1);
        assert!(store.query::<WaterBodyVisit, _>(|_| true).await.is_empty());
        assert!(store.query::<HighRiskAssessment, _>(|_| true).await.is_empty());
    }
}
