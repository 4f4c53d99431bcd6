//! Shift start/end forms

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::form::fields::{FieldValue, ShiftField};
use crate::form::layout::FieldLayout;
use crate::models::{InspectionRecord, ShiftRecord};
use crate::store::RecordStore;

const START_FIELDS: [ShiftField; 9] = [
    ShiftField::StartTime,
    ShiftField::Station,
    ShiftField::Sunny,
    ShiftField::Cloudy,
    ShiftField::Raining,
    ShiftField::Snowing,
    ShiftField::Foggy,
    ShiftField::Windy,
    ShiftField::StartComments,
];

const END_FIELDS: [ShiftField; 6] = [
    ShiftField::EndTime,
    ShiftField::K9OnShift,
    ShiftField::BoatsInspected,
    ShiftField::MotorizedBlowBys,
    ShiftField::NonMotorizedBlowBys,
    ShiftField::EndComments,
];

pub fn shift_start_fields(shift: &ShiftRecord, editable: bool) -> Vec<FieldLayout> {
    START_FIELDS
        .iter()
        .map(|f| FieldLayout::shift(*f, shift, editable))
        .collect()
}

pub fn shift_end_fields(shift: &ShiftRecord, editable: bool) -> Vec<FieldLayout> {
    END_FIELDS
        .iter()
        .map(|f| FieldLayout::shift(*f, shift, editable))
        .collect()
}

/// Edits to one shift. Each committed edit marks the shift dirty.
pub struct ShiftSession {
    store: Arc<RecordStore>,
    shift_id: Uuid,
}

impl ShiftSession {
    pub async fn open(store: Arc<RecordStore>, shift_id: Uuid) -> SyncResult<Self> {
        store.require::<ShiftRecord>(shift_id).await?;
        Ok(Self { store, shift_id })
    }

    pub fn shift_id(&self) -> Uuid {
        self.shift_id
    }

    pub async fn shift(&self) -> SyncResult<ShiftRecord> {
        self.store.require(self.shift_id).await
    }

    pub async fn set_field(&self, field: ShiftField, value: FieldValue) -> SyncResult<ShiftRecord> {
        self.store
            .update::<ShiftRecord, _>(self.shift_id, |shift| {
                field.set(shift, value)?;
                shift.touch();
                Ok(())
            })
            .await
    }

    pub async fn set_field_by_key(&self, key: &str, value: FieldValue) -> SyncResult<ShiftRecord> {
        let field = ShiftField::from_key(key)
            .ok_or_else(|| SyncError::InvalidField(format!("Unknown shift field '{}'", key)))?;
        self.set_field(field, value).await
    }

    /// Start a new draft inspection in this shift.
    pub async fn add_inspection(&self) -> SyncResult<InspectionRecord> {
        let mut tx = self.store.begin().await?;
        let mut shift: ShiftRecord = tx.require(self.shift_id).await?;

        let mut inspection = InspectionRecord::new(self.shift_id);
        inspection.id = Uuid::new_v4();
        tx.put(&inspection).await?;

        shift.touch();
        tx.put(&shift).await?;
        tx.commit().await?;

        tracing::info!(
            shift_id = %self.shift_id,
            inspection_id = %inspection.id,
            "Inspection added"
        );
        Ok(inspection)
    }

    /// Inspections in creation order.
    pub async fn inspections(&self) -> Vec<InspectionRecord> {
        self.store.shift_inspections(self.shift_id).await
    }

    /// Upload needs both start and end time.
    pub async fn can_submit(&self) -> SyncResult<bool> {
        Ok(self.shift().await?.is_complete())
    }

    pub async fn delete(self) -> SyncResult<()> {
        self.store.cascade_delete_shift(self.shift_id).await?;
        tracing::info!(shift_id = %self.shift_id, "Shift deleted");
        Ok(())
    }
}
