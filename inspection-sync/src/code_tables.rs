//! Code table cache
//!
//! Lookup lists (stations, observers, ...) are fetched from the Codes API and
//! stored one table per type. Provinces, cities and water bodies are derived
//! from the water body reference set, which comes from the WaterBody API or a
//! bundled seed file. Every refresh replaces its tables in one transaction, so
//! a failed or cancelled refresh leaves the previous data in place.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::CodeTableConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{CodeTable, CodeTableType, DropdownOption, WaterBodyReference};
use crate::remote::RemoteApi;
use crate::store::{RecordStore, StoreTransaction};

/// Tables computed from the water body reference set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedTables {
    pub water_bodies: Vec<String>,
    pub cities: Vec<String>,
    pub provinces: Vec<String>,
}

/// Project the reference set onto the three derived tables. Each table is
/// de-duplicated and sorted case-insensitively, ties broken by the exact string.
pub fn derive_tables(references: &[WaterBodyReference]) -> DerivedTables {
    DerivedTables {
        water_bodies: sorted_unique(references.iter().map(|r| r.name.as_str())),
        cities: sorted_unique(references.iter().map(|r| r.closest.as_str())),
        provinces: sorted_unique(references.iter().map(|r| r.abbrev.as_str())),
    }
}

fn sorted_unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut sorted: Vec<String> = values
        .filter(|v| !v.trim().is_empty())
        .map(String::from)
        .collect();
    sorted.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    sorted.dedup();
    sorted
}

/// One water body entry as either the seed file or the live API spells it.
#[derive(Debug, Deserialize)]
struct RawWaterBody {
    #[serde(alias = "Name", default)]
    name: Option<String>,
    #[serde(alias = "waterBodyId", default)]
    water_body_id: Option<i64>,
    #[serde(alias = "LatDD", default)]
    latitude: Option<f64>,
    #[serde(alias = "LongDD", default)]
    longitude: Option<f64>,
    #[serde(alias = "Abbrev", default)]
    abbrev: Option<String>,
    #[serde(alias = "Closest", default)]
    closest: Option<String>,
}

/// Normalise one entry. Entries without a name, province or closest city are
/// rejected.
pub fn normalise_water_body(entry: &serde_json::Value) -> SyncResult<WaterBodyReference> {
    let raw: RawWaterBody = serde_json::from_value(entry.clone())
        .map_err(|e| SyncError::MalformedSeedData(e.to_string()))?;

    let required = |value: Option<String>, field: &str| -> SyncResult<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(SyncError::MalformedSeedData(format!("missing {}", field))),
        }
    };

    Ok(WaterBodyReference {
        id: Uuid::new_v4(),
        name: required(raw.name, "name")?,
        water_body_id: raw.water_body_id.unwrap_or_default(),
        latitude: raw.latitude.unwrap_or_default(),
        longitude: raw.longitude.unwrap_or_default(),
        abbrev: required(raw.abbrev, "abbrev")?,
        closest: required(raw.closest, "closest")?,
    })
}

fn percent(counter: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        counter * 100 / total
    }
}

pub struct CodeTableCache {
    store: Arc<RecordStore>,
    remote: Arc<dyn RemoteApi>,
    config: CodeTableConfig,
}

impl CodeTableCache {
    pub fn new(
        store: Arc<RecordStore>,
        remote: Arc<dyn RemoteApi>,
        config: CodeTableConfig,
    ) -> Self {
        Self {
            store,
            remote,
            config,
        }
    }

    /// Refresh one table. Derived types re-import the whole water body set.
    ///
    /// Returns the number of items stored.
    pub async fn refresh<F>(
        &self,
        code_type: &CodeTableType,
        status: F,
        cancel: &CancelToken,
    ) -> SyncResult<usize>
    where
        F: Fn(String) + Send + Sync,
    {
        if code_type.is_derived() {
            return self.refresh_water_bodies(&status, cancel).await;
        }

        let codes = self.remote.fetch_codes().await?;
        let Some(tables) = codes.as_object() else {
            tracing::warn!(code_type = %code_type, "Codes response is not an object");
            return Ok(0);
        };
        let Some(items) = tables.get(code_type.as_str()).and_then(string_list) else {
            tracing::warn!(code_type = %code_type, "Code type missing from response");
            return Ok(0);
        };

        let mut tx = self.store.begin().await?;
        let count = store_table(&mut tx, code_type, items, &status, cancel).await?;
        tx.commit().await?;

        tracing::info!(code_type = %code_type, count, "Refreshed code table");
        Ok(count)
    }

    /// Full refresh: every table from the Codes API, then the water body set.
    pub async fn refresh_all<F>(&self, status: F, cancel: &CancelToken) -> SyncResult<usize>
    where
        F: Fn(String) + Send + Sync,
    {
        status("Fetching code tables".to_string());
        let codes = self.remote.fetch_codes().await?;

        let mut total = 0;
        match codes.as_object() {
            Some(tables) => {
                let mut tx = self.store.begin().await?;
                for (name, value) in tables {
                    let Some(items) = string_list(value) else {
                        tracing::debug!(code_type = %name, "Skipping non-list code entry");
                        continue;
                    };
                    let code_type = CodeTableType::from_name(name);
                    total += store_table(&mut tx, &code_type, items, &status, cancel).await?;
                }
                tx.commit().await?;
            }
            None => tracing::warn!("Codes response is not an object"),
        }

        status("Loading Waterbodies".to_string());
        total += self.refresh_water_bodies(&status, cancel).await?;

        status("Wrapping up".to_string());
        tracing::info!(items = total, "Code tables refreshed");
        Ok(total)
    }

    /// Run `refresh_all` on the tokio runtime.
    pub fn spawn_refresh_all<F>(
        self: &Arc<Self>,
        status: F,
        cancel: CancelToken,
    ) -> JoinHandle<SyncResult<usize>>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let cache = Arc::clone(self);
        tokio::spawn(async move { cache.refresh_all(status, &cancel).await })
    }

    async fn refresh_water_bodies<F>(&self, status: &F, cancel: &CancelToken) -> SyncResult<usize>
    where
        F: Fn(String) + Send + Sync,
    {
        let source = self.water_body_source().await?;
        let Some(entries) = source.as_array() else {
            tracing::warn!("Water body source is not an array");
            return Ok(0);
        };

        let total = entries.len();
        let mut tx = self.store.begin().await?;
        tx.delete_all::<WaterBodyReference>().await?;

        let mut references = Vec::with_capacity(total);
        for (index, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(processed = index, total, "Water body import cancelled");
                return Err(SyncError::Cancelled);
            }
            status(format!("Storing Waterbodies: {}%", percent(index + 1, total)));

            match normalise_water_body(entry) {
                Ok(reference) => {
                    tx.put(&reference).await?;
                    references.push(reference);
                }
                Err(e) => tracing::warn!(index, error = %e, "Skipping water body entry"),
            }
        }

        let derived = derive_tables(&references);
        tx.put(&CodeTable::new(&CodeTableType::WaterBodies, derived.water_bodies))
            .await?;
        tx.put(&CodeTable::new(&CodeTableType::Cities, derived.cities)).await?;
        tx.put(&CodeTable::new(&CodeTableType::Provinces, derived.provinces))
            .await?;
        tx.commit().await?;

        tracing::info!(stored = references.len(), total, "Imported water bodies");
        Ok(references.len())
    }

    /// Live API unless the seed file is preferred. Falls back to the seed file
    /// when the API is unreachable.
    async fn water_body_source(&self) -> SyncResult<serde_json::Value> {
        let seed = self.config.water_body_seed_path.as_deref();
        match seed {
            Some(path) if self.config.prefer_seed_file => read_seed_file(path).await,
            Some(path) => match self.remote.fetch_water_bodies().await {
                Ok(value) => Ok(value),
                Err(e @ (SyncError::Network(_) | SyncError::NetworkUnavailable)) => {
                    tracing::warn!(
                        error = %e,
                        seed = path,
                        "WaterBody API unreachable, using seed file"
                    );
                    read_seed_file(path).await
                }
                Err(e) => Err(e),
            },
            None => self.remote.fetch_water_bodies().await,
        }
    }

    /// Cached items in stored order, duplicates removed. Never touches the network.
    pub async fn lookup(&self, code_type: &CodeTableType) -> Vec<String> {
        let table = match self.store.get::<CodeTable>(code_type.as_str()).await {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(code_type = %code_type, error = %e, "Code table lookup failed");
                None
            }
        };

        let mut seen = HashSet::new();
        table
            .map(|t| t.items)
            .unwrap_or_default()
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect()
    }

    /// Sorted, de-duplicated dropdown options for a table.
    pub async fn dropdown(&self, code_type: &CodeTableType) -> Vec<DropdownOption> {
        let items = self.lookup(code_type).await;
        sorted_unique(items.iter().map(String::as_str))
            .into_iter()
            .map(DropdownOption::new)
            .collect()
    }

    pub async fn water_bodies_in_province(&self, abbrev: &str) -> Vec<String> {
        self.project(|r| r.abbrev == abbrev, |r| &r.name).await
    }

    pub async fn water_bodies_near_city(&self, city: &str) -> Vec<String> {
        self.project(|r| r.closest == city, |r| &r.name).await
    }

    pub async fn cities_near_water_body(&self, water_body: &str) -> Vec<String> {
        self.project(|r| r.name == water_body, |r| &r.closest).await
    }

    pub async fn cities_in_province(&self, abbrev: &str) -> Vec<String> {
        self.project(|r| r.abbrev == abbrev, |r| &r.closest).await
    }

    pub async fn provinces_with_water_body(&self, water_body: &str) -> Vec<String> {
        self.project(|r| r.name == water_body, |r| &r.abbrev).await
    }

    pub async fn provinces_with_city(&self, city: &str) -> Vec<String> {
        self.project(|r| r.closest == city, |r| &r.abbrev).await
    }

    /// First reference entry with this water body name.
    pub async fn water_body(&self, name: &str) -> Option<WaterBodyReference> {
        self.store
            .query::<WaterBodyReference, _>(|r| r.name == name)
            .await
            .into_iter()
            .next()
    }

    async fn project<P, M>(&self, predicate: P, field: M) -> Vec<String>
    where
        P: Fn(&WaterBodyReference) -> bool,
        M: Fn(&WaterBodyReference) -> &String,
    {
        let matches = self.store.query::<WaterBodyReference, _>(predicate).await;
        sorted_unique(matches.iter().map(|r| field(r).as_str()))
    }
}

fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    value.as_array().map(|values| {
        values
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

async fn store_table<F>(
    tx: &mut StoreTransaction,
    code_type: &CodeTableType,
    items: Vec<String>,
    status: &F,
    cancel: &CancelToken,
) -> SyncResult<usize>
where
    F: Fn(String) + Send + Sync,
{
    let total = items.len();
    for counter in 1..=total {
        if cancel.is_cancelled() {
            tracing::info!(code_type = %code_type, "Code table refresh cancelled");
            return Err(SyncError::Cancelled);
        }
        status(format!("Storing {}: {}%", code_type, percent(counter, total)));
    }

    tx.put(&CodeTable::new(code_type, items)).await?;
    Ok(total)
}

async fn read_seed_file(path: &str) -> SyncResult<serde_json::Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::MalformedSeedData(format!("cannot read {}: {}", path, e)))?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;
    use crate::store::tests::create_test_store;
    use serde_json::json;
    use std::sync::Mutex;

    fn reference(name: &str, abbrev: &str, closest: &str) -> WaterBodyReference {
        WaterBodyReference {
            id: Uuid::new_v4(),
            name: name.to_string(),
            water_body_id: 0,
            latitude: 0.0,
            longitude: 0.0,
            abbrev: abbrev.to_string(),
            closest: closest.to_string(),
        }
    }

    fn seed() -> serde_json::Value {
        json!([
            { "Name": "Shuswap Lake", "water_body_id": 11, "LatDD": 50.9, "LongDD": -119.2, "Abbrev": "BC", "Closest": "Salmon Arm" },
            { "name": "Okanagan Lake", "water_body_id": 12, "latitude": 49.9, "longitude": -119.5, "abbrev": "BC", "closest": "Kelowna" },
            { "Name": "", "Abbrev": "BC", "Closest": "Nowhere" },
            { "Name": "Lake Minnewanka", "Abbrev": "AB", "Closest": "Banff" },
            { "Name": "Mara Lake", "Abbrev": "BC", "Closest": "Salmon Arm" }
        ])
    }

    async fn cache_with(remote: Arc<MockRemote>) -> (CodeTableCache, tempfile::TempDir) {
        let (store, dir) = create_test_store().await;
        let cache = CodeTableCache::new(Arc::new(store), remote, CodeTableConfig::default());
        (cache, dir)
    }

    #[test]
    fn test_derive_tables_is_deterministic() {
        let refs = vec![
            reference("shuswap", "BC", "Salmon Arm"),
            reference("Shuswap", "BC", "salmon arm"),
            reference("Arrow Lake", "BC", "Nakusp"),
            reference("Shuswap", "AB", "Salmon Arm"),
        ];
        let mut reversed = refs.clone();
        reversed.reverse();

        let derived = derive_tables(&refs);
        assert_eq!(derived, derive_tables(&reversed));
        assert_eq!(derived.water_bodies, vec!["Arrow Lake", "Shuswap", "shuswap"]);
        assert_eq!(derived.provinces, vec!["AB", "BC"]);
        assert_eq!(derived.cities, vec!["Nakusp", "Salmon Arm", "salmon arm"]);
    }

    #[test]
    fn test_normalise_accepts_both_casings() {
        let entries = seed();
        let seed_style = normalise_water_body(&entries[0]).unwrap();
        assert_eq!(seed_style.name, "Shuswap Lake");
        assert_eq!(seed_style.water_body_id, 11);
        assert_eq!(seed_style.abbrev, "BC");

        let api_style = normalise_water_body(&entries[1]).unwrap();
        assert_eq!(api_style.closest, "Kelowna");
        assert!((api_style.latitude - 49.9).abs() < f64::EPSILON);

        let err = normalise_water_body(&entries[2]).unwrap_err();
        assert!(matches!(err, SyncError::MalformedSeedData(_)));
    }

    #[tokio::test]
    async fn test_refresh_plain_table() {
        let remote = Arc::new(MockRemote::new());
        remote
            .set_codes(json!({ "stations": ["Golden", "Osoyoos", "Golden", 7] }))
            .await;
        let (cache, _dir) = cache_with(remote).await;

        let progress = Mutex::new(Vec::new());
        let count = cache
            .refresh(
                &CodeTableType::Stations,
                |s| progress.lock().unwrap().push(s),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(cache.lookup(&CodeTableType::Stations).await, vec!["Golden", "Osoyoos"]);
        assert_eq!(
            progress.lock().unwrap().last().map(String::as_str),
            Some("Storing stations: 100%")
        );
    }

    #[tokio::test]
    async fn test_non_object_codes_response_stores_nothing() {
        let remote = Arc::new(MockRemote::new());
        remote.set_codes(json!(["not", "an", "object"])).await;
        let (cache, _dir) = cache_with(remote).await;

        let count = cache
            .refresh(&CodeTableType::Observers, |_| {}, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(cache.lookup(&CodeTableType::Observers).await.is_empty());
    }

    #[tokio::test]
    async fn test_water_body_import_derives_tables_and_reports_progress() {
        let remote = Arc::new(MockRemote::new());
        remote.set_water_bodies(seed()).await;
        let (cache, _dir) = cache_with(remote).await;

        let progress = Mutex::new(Vec::new());
        let stored = cache
            .refresh(
                &CodeTableType::Provinces,
                |s| progress.lock().unwrap().push(s),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stored, 4);
        assert_eq!(cache.lookup(&CodeTableType::Provinces).await, vec!["AB", "BC"]);
        assert_eq!(
            cache.water_bodies_in_province("BC").await,
            vec!["Mara Lake", "Okanagan Lake", "Shuswap Lake"]
        );
        assert_eq!(
            cache.water_bodies_near_city("Salmon Arm").await,
            vec!["Mara Lake", "Shuswap Lake"]
        );
        assert_eq!(cache.provinces_with_city("Banff").await, vec!["AB"]);
        assert_eq!(cache.cities_near_water_body("Okanagan Lake").await, vec!["Kelowna"]);

        let progress = progress.lock().unwrap();
        assert_eq!(progress.len(), 5);
        assert_eq!(progress[0], "Storing Waterbodies: 20%");
        assert_eq!(progress[4], "Storing Waterbodies: 100%");
    }

    #[tokio::test]
    async fn test_cancelled_refresh_keeps_previous_tables() {
        let remote = Arc::new(MockRemote::new());
        remote.set_water_bodies(seed()).await;
        let (cache, _dir) = cache_with(remote.clone()).await;
        cache
            .refresh(&CodeTableType::WaterBodies, |_| {}, &CancelToken::new())
            .await
            .unwrap();
        let before = cache.lookup(&CodeTableType::WaterBodies).await;

        remote
            .set_water_bodies(json!([
                { "Name": "Kootenay Lake", "Abbrev": "BC", "Closest": "Nelson" },
                { "Name": "Arrow Lake", "Abbrev": "BC", "Closest": "Nakusp" }
            ]))
            .await;
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let err = cache
            .refresh(&CodeTableType::WaterBodies, move |_| trigger.cancel(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert_eq!(cache.lookup(&CodeTableType::WaterBodies).await, before);
        assert!(cache.water_body("Kootenay Lake").await.is_none());
        assert!(cache.water_body("Mara Lake").await.is_some());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_tables() {
        let remote = Arc::new(MockRemote::new());
        remote.set_codes(json!({ "observers": ["A. Smith"] })).await;
        let (cache, _dir) = cache_with(remote.clone()).await;
        cache
            .refresh(&CodeTableType::Observers, |_| {}, &CancelToken::new())
            .await
            .unwrap();

        remote
            .fail_next([SyncError::Network("timeout".to_string())])
            .await;
        assert!(cache
            .refresh(&CodeTableType::Observers, |_| {}, &CancelToken::new())
            .await
            .is_err());
        assert_eq!(cache.lookup(&CodeTableType::Observers).await, vec!["A. Smith"]);
    }

    #[tokio::test]
    async fn test_seed_file_fallback_when_offline() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::io::Write::write_all(&mut file, seed().to_string().as_bytes()).unwrap();

        let remote = Arc::new(MockRemote::new());
        remote.fail_next([SyncError::NetworkUnavailable]).await;
        let (store, _dir) = create_test_store().await;
        let cache = CodeTableCache::new(
            Arc::new(store),
            remote,
            CodeTableConfig {
                water_body_seed_path: Some(file.path().to_str().unwrap().to_string()),
                prefer_seed_file: false,
            },
        );

        let stored = cache
            .refresh(&CodeTableType::Cities, |_| {}, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(stored, 4);
        assert_eq!(
            cache.lookup(&CodeTableType::Cities).await,
            vec!["Banff", "Kelowna", "Salmon Arm"]
        );
    }

    #[tokio::test]
    async fn test_refresh_all_reports_phases() {
        let remote = Arc::new(MockRemote::new());
        remote
            .set_codes(json!({ "observers": ["B", "A"], "stations": ["Golden"], "version": 3 }))
            .await;
        remote.set_water_bodies(seed()).await;
        let (cache, _dir) = cache_with(remote).await;
        let cache = Arc::new(cache);

        let progress = Arc::new(Mutex::new(Vec::new()));
        let sink = progress.clone();
        let total = cache
            .spawn_refresh_all(move |s| sink.lock().unwrap().push(s), CancelToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(total, 3 + 4);
        let progress = progress.lock().unwrap();
        assert_eq!(progress.first().map(String::as_str), Some("Fetching code tables"));
        assert!(progress.iter().any(|s| s == "Loading Waterbodies"));
        assert_eq!(progress.last().map(String::as_str), Some("Wrapping up"));

        let options = cache.dropdown(&CodeTableType::Observers).await;
        assert_eq!(options, vec![DropdownOption::new("A"), DropdownOption::new("B")]);
    }
}
