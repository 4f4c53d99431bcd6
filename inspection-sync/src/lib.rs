//! Offline-first core for watercraft inspection field work
//!
//! Provides:
//! - Local SQLite record store for shifts, inspections and their children
//! - Sync queue pushing dirty shifts with retry and revision-guarded reconcile
//! - Code table cache with water body import and derived lookup tables
//! - Conditional form schema that computes the visible inspection form
//! - Journey leg management with contiguous ordering

pub mod cancel;
pub mod code_tables;
pub mod config;
pub mod error;
pub mod form;
pub mod journey;
pub mod logging;
pub mod models;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync_queue;

pub use cancel::CancelToken;
pub use code_tables::{derive_tables, CodeTableCache, DerivedTables};
pub use config::{
    CodeTableConfig, InspectionConfig, LoggingConfig, RemoteConfig, RetryPolicy, StoreConfig,
};
pub use error::{SyncError, SyncResult};
pub use form::{
    compute_layout, EditOutcome, FieldValue, FormEvent, FormLayout, FormMode, FormSession,
    HighRiskMode, InspectionField, ShiftSession,
};
pub use journey::{JourneyRow, JourneyToggle, JourneyToggles, MajorCityField, VisitField};
pub use remote::{
    Connectivity, ConnectivityStatus, HttpRemote, MockRemote, RemoteApi, StaticConnectivity,
};
pub use session::InspectionContext;
pub use store::{Record, RecordStore, StoreTransaction};
pub use sync_queue::{SyncQueue, SyncReport};
