use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Record;

/// Display status of a shift in the home table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    /// Local edits, start or end time still missing
    Draft,
    /// Complete and waiting for upload
    PendingSync,
    /// Last push failed; still dirty
    SyncFailed,
    /// Server has the latest revision
    Synced,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingSync => "pending_sync",
            Self::SyncFailed => "sync_failed",
            Self::Synced => "synced",
        }
    }
}

/// One field-work shift at an inspection station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    pub id: Uuid,
    pub remote_id: Option<i64>,
    /// Owning user. A back-reference only; shifts are not owned by users.
    pub user_id: String,
    pub shift_date: NaiveDate,
    pub location: String,
    pub station: String,
    /// `HH:MM`, empty until entered
    pub start_time: String,
    pub end_time: String,
    pub sunny: bool,
    pub cloudy: bool,
    pub raining: bool,
    pub snowing: bool,
    pub foggy: bool,
    pub windy: bool,
    pub k9_on_shift: bool,
    pub boats_inspected: bool,
    pub motorized_blow_bys: i64,
    pub non_motorized_blow_bys: i64,
    pub start_comments: String,
    pub end_comments: String,
    /// Dirty flag
    pub should_sync: bool,
    /// Bumped on every edit of the shift or anything it owns
    pub revision: u64,
    /// Revision last accepted by the server
    pub synced_revision: Option<u64>,
    pub last_sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShiftRecord {
    /// A new, unsaved shift. Id and owner are assigned by `RecordStore::create`.
    pub fn new(shift_date: NaiveDate, location: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            remote_id: None,
            user_id: String::new(),
            shift_date,
            location: location.into(),
            station: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            sunny: false,
            cloudy: false,
            raining: false,
            snowing: false,
            foggy: false,
            windy: false,
            k9_on_shift: false,
            boats_inspected: false,
            motorized_blow_bys: 0,
            non_motorized_blow_bys: 0,
            start_comments: String::new(),
            end_comments: String::new(),
            should_sync: true,
            revision: 1,
            synced_revision: None,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shifts can only be uploaded once both start and end time are entered.
    pub fn is_complete(&self) -> bool {
        !self.start_time.trim().is_empty() && !self.end_time.trim().is_empty()
    }

    /// Record a local edit: dirty flag on, revision bumped.
    pub fn touch(&mut self) {
        self.should_sync = true;
        self.revision += 1;
        self.updated_at = Utc::now();
    }

    pub fn status(&self) -> ShiftStatus {
        if !self.should_sync {
            ShiftStatus::Synced
        } else if self.last_sync_error.is_some() {
            ShiftStatus::SyncFailed
        } else if self.is_complete() {
            ShiftStatus::PendingSync
        } else {
            ShiftStatus::Draft
        }
    }

    /// `YYYY-MM-DD`, the key the home screen groups shifts by.
    pub fn formatted_date(&self) -> String {
        self.shift_date.format("%Y-%m-%d").to_string()
    }
}

impl Record for ShiftRecord {
    const COLLECTION: &'static str = "shifts";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn assign_owner(&mut self, owner: &str) {
        self.user_id = owner.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> ShiftRecord {
        ShiftRecord::new(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), "Golden")
    }

    #[test]
    fn test_new_shift_is_dirty_draft() {
        let s = shift();
        assert!(s.should_sync);
        assert_eq!(s.revision, 1);
        assert_eq!(s.status(), ShiftStatus::Draft);
        assert_eq!(s.formatted_date(), "2024-06-14");
    }

    #[test]
    fn test_status_follows_completeness_and_sync_state() {
        let mut s = shift();
        s.start_time = "08:00".to_string();
        assert_eq!(s.status(), ShiftStatus::Draft);

        s.end_time = "16:30".to_string();
        assert_eq!(s.status(), ShiftStatus::PendingSync);

        s.last_sync_error = Some("503".to_string());
        assert_eq!(s.status(), ShiftStatus::SyncFailed);

        s.should_sync = false;
        assert_eq!(s.status(), ShiftStatus::Synced);
    }

    #[test]
    fn test_touch_bumps_revision() {
        let mut s = shift();
        s.should_sync = false;
        s.touch();
        assert!(s.should_sync);
        assert_eq!(s.revision, 2);
    }
}
