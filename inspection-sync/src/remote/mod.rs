//! Remote service seams
//!
//! The core talks to three remote collaborators: the Codes API, the WaterBody
//! API and the shift submission endpoint. All three sit behind `RemoteApi` so
//! hosts can swap the HTTP client for anything else. Reachability is consumed
//! through `Connectivity`.

pub mod http;
pub mod mock;

use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncResult;
use crate::models::{InspectionAggregate, ShiftRecord};

pub use http::HttpRemote;
pub use mock::MockRemote;

/// Wire payload for one shift and its whole record graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftPayload {
    pub local_id: Uuid,
    /// Present once the server has accepted the shift; submission becomes an update
    pub remote_id: Option<i64>,
    pub revision: u64,
    pub shift: ShiftRecord,
    pub inspections: Vec<InspectionAggregate>,
}

impl ShiftPayload {
    pub fn new(shift: ShiftRecord, inspections: Vec<InspectionAggregate>) -> Self {
        Self {
            local_id: shift.id,
            remote_id: shift.remote_id,
            revision: shift.revision,
            shift,
            inspections,
        }
    }

    pub fn is_update(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Server acknowledgement of a submitted shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Remote id of the shift
    pub id: i64,
    #[serde(default)]
    pub inspections: Vec<InspectionReceipt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReceipt {
    pub local_id: Uuid,
    pub id: i64,
}

/// Remote API used by the sync queue and the code table cache.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Codes API: an object mapping code type name to a list of strings
    async fn fetch_codes(&self) -> SyncResult<serde_json::Value>;

    /// WaterBody API: an array of water body reference entries
    async fn fetch_water_bodies(&self) -> SyncResult<serde_json::Value>;

    /// Create (no remote id) or update (remote id present) a shift
    async fn submit_shift(&self, payload: &ShiftPayload) -> SyncResult<SubmitReceipt>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    Online,
    Offline,
    /// Reachability not determined yet. Treated as online.
    Unknown,
}

impl ConnectivityStatus {
    pub fn is_offline(&self) -> bool {
        matches!(self, ConnectivityStatus::Offline)
    }
}

/// Reachability signal supplied by the host platform.
pub trait Connectivity: Send + Sync {
    fn status(&self) -> ConnectivityStatus;
}

/// Connectivity the host updates as reachability changes.
#[derive(Debug)]
pub struct StaticConnectivity {
    state: AtomicU8,
}

impl StaticConnectivity {
    pub fn new(status: ConnectivityStatus) -> Self {
        Self {
            state: AtomicU8::new(Self::encode(status)),
        }
    }

    pub fn set(&self, status: ConnectivityStatus) {
        self.state.store(Self::encode(status), Ordering::SeqCst);
        tracing::debug!(status = ?status, "Connectivity changed");
    }

    fn encode(status: ConnectivityStatus) -> u8 {
        match status {
            ConnectivityStatus::Online => 0,
            ConnectivityStatus::Offline => 1,
            ConnectivityStatus::Unknown => 2,
        }
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::new(ConnectivityStatus::Unknown)
    }
}

impl Connectivity for StaticConnectivity {
    fn status(&self) -> ConnectivityStatus {
        match self.state.load(Ordering::SeqCst) {
            0 => ConnectivityStatus::Online,
            1 => ConnectivityStatus::Offline,
            _ => ConnectivityStatus::Unknown,
        }
    }
}
