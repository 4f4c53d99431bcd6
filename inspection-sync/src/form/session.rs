//! Editing session for one inspection
//!
//! Every edit runs in a single store transaction that also marks the owning
//! shift dirty, so a committed edit is always visible to the sync queue.
//! Listeners receive `FormEvent`s over a broadcast channel; the layout is
//! recomputed from the stored aggregate after each commit.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::form::country::CountryProvince;
use crate::form::fields::{FieldValue, HighRiskField, InspectionField};
use crate::form::layout::{
    compute_layout, form_mode, high_risk_gate_open, high_risk_mode, FormLayout, FormMode,
    HighRiskMode,
};
use crate::journey::{
    append_leg, apply_toggle, apply_toggles, remove_leg, update_leg, JourneyToggle, JourneyToggles,
    MajorCityField, VisitField,
};
use crate::models::{
    HighRiskAssessment, InspectionAggregate, InspectionRecord, JourneySide, MajorCityVisit,
    WaterBodyVisit,
};
use crate::store::{RecordStore, StoreTransaction};
use crate::sync_queue::mark_dirty_in;

const EVENT_CAPACITY: usize = 64;

/// Notifications for whoever renders the form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    /// The stored value differs from what the input last showed; redraw it.
    FieldShouldUpdate { key: String, value: FieldValue },
    LayoutChanged { mode: FormMode, high_risk: HighRiskMode },
    HighRiskAssessmentCreated { id: Uuid },
    HighRiskAssessmentRemoved { id: Uuid },
    /// `index` is set when a single leg changed, unset when rows were added or removed.
    JourneyChanged { side: JourneySide, index: Option<usize> },
}

/// A gating field was set to true while no assessment exists. Nothing has
/// been written; pass this to `confirm_high_risk` or `decline_high_risk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHighRisk {
    field: InspectionField,
}

impl PendingHighRisk {
    pub fn field(&self) -> InspectionField {
        self.field
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied(FormLayout),
    ConfirmationRequired(PendingHighRisk),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied(_))
    }
}

/// An open edit. Events queued here are sent only once the transaction commits.
struct Edit {
    tx: StoreTransaction,
    aggregate: InspectionAggregate,
    before: (FormMode, HighRiskMode),
    events: Vec<FormEvent>,
}

pub struct FormSession {
    store: Arc<RecordStore>,
    inspection_id: Uuid,
    events: broadcast::Sender<FormEvent>,
}

impl FormSession {
    pub async fn open(store: Arc<RecordStore>, inspection_id: Uuid) -> SyncResult<Self> {
        store.require::<InspectionRecord>(inspection_id).await?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            store,
            inspection_id,
            events,
        })
    }

    pub fn inspection_id(&self) -> Uuid {
        self.inspection_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    pub async fn aggregate(&self) -> SyncResult<InspectionAggregate> {
        self.store.load_aggregate(self.inspection_id).await
    }

    pub async fn layout(&self) -> SyncResult<FormLayout> {
        Ok(compute_layout(&self.aggregate().await?))
    }

    pub async fn set_field(
        &self,
        field: InspectionField,
        value: FieldValue,
    ) -> SyncResult<EditOutcome> {
        if field == InspectionField::CountryProvince {
            let code = value.into_text(field.key())?;
            return self.select_country_province(&code).await;
        }

        let mut edit = self.begin_edit().await?;

        if field.is_high_risk_gate()
            && value == FieldValue::Bool(true)
            && edit.aggregate.high_risk_assessment.is_none()
        {
            // Dropping the edit rolls back; nothing was written.
            tracing::debug!(
                inspection_id = %self.inspection_id,
                field = field.key(),
                "High-risk confirmation required"
            );
            return Ok(EditOutcome::ConfirmationRequired(PendingHighRisk { field }));
        }

        field.set(&mut edit.aggregate.inspection, value)?;
        self.put_inspection(&mut edit).await?;

        if field.is_high_risk_gate() {
            self.remove_assessment_if_closed(&mut edit).await?;
        }

        self.finish_edit(edit).await.map(EditOutcome::Applied)
    }

    /// Route a raw UI key to the matching typed field.
    pub async fn set_field_by_key(&self, key: &str, value: FieldValue) -> SyncResult<EditOutcome> {
        let prefix = HighRiskField::PREFIX;
        let is_high_risk = key
            .get(..prefix.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(prefix));

        if is_high_risk {
            let field = HighRiskField::from_key(key)
                .ok_or_else(|| SyncError::InvalidField(format!("Unknown field '{}'", key)))?;
            return self
                .set_high_risk_field(field, value)
                .await
                .map(EditOutcome::Applied);
        }

        let field = InspectionField::from_key(key)
            .ok_or_else(|| SyncError::InvalidField(format!("Unknown field '{}'", key)))?;
        self.set_field(field, value).await
    }

    pub async fn set_high_risk_field(
        &self,
        field: HighRiskField,
        value: FieldValue,
    ) -> SyncResult<FormLayout> {
        let mut edit = self.begin_edit().await?;
        let mut assessment = edit.aggregate.high_risk_assessment.take().ok_or_else(|| {
            SyncError::InvalidOperation(format!(
                "Inspection {} has no high-risk assessment",
                self.inspection_id
            ))
        })?;

        field.set(&mut assessment, value)?;
        edit.tx.put(&assessment).await?;
        edit.aggregate.high_risk_assessment = Some(assessment);
        self.put_inspection(&mut edit).await?;

        self.finish_edit(edit).await
    }

    /// Write the gating field and create the assessment, together.
    pub async fn confirm_high_risk(&self, pending: PendingHighRisk) -> SyncResult<FormLayout> {
        let mut edit = self.begin_edit().await?;
        pending
            .field
            .set(&mut edit.aggregate.inspection, FieldValue::Bool(true))?;
        self.put_inspection(&mut edit).await?;

        if edit.aggregate.high_risk_assessment.is_none() {
            let mut assessment = HighRiskAssessment::new(self.inspection_id);
            assessment.id = Uuid::new_v4();
            edit.tx.put(&assessment).await?;
            tracing::info!(
                inspection_id = %self.inspection_id,
                assessment_id = %assessment.id,
                "High-risk assessment created"
            );
            edit.events
                .push(FormEvent::HighRiskAssessmentCreated { id: assessment.id });
            edit.aggregate.high_risk_assessment = Some(assessment);
        }

        self.finish_edit(edit).await
    }

    /// Revert the gating field to false. The input is always told to redraw,
    /// even when the stored value was already false.
    pub async fn decline_high_risk(&self, pending: PendingHighRisk) -> SyncResult<FormLayout> {
        let field = pending.field;
        let mut edit = self.begin_edit().await?;

        let layout = if field.get(&edit.aggregate.inspection) != FieldValue::Bool(false) {
            field.set(&mut edit.aggregate.inspection, FieldValue::Bool(false))?;
            self.put_inspection(&mut edit).await?;
            self.remove_assessment_if_closed(&mut edit).await?;
            self.finish_edit(edit).await?
        } else {
            edit.tx.rollback().await?;
            compute_layout(&edit.aggregate)
        };

        self.emit(FormEvent::FieldShouldUpdate {
            key: field.key().to_string(),
            value: FieldValue::Bool(false),
        });
        Ok(layout)
    }

    /// Store a residence option code and fan it out to country and province.
    /// An empty code clears all three.
    pub async fn select_country_province(&self, code: &str) -> SyncResult<EditOutcome> {
        let code = code.trim();
        let parsed = if code.is_empty() {
            None
        } else {
            Some(CountryProvince::parse(code)?)
        };

        let mut edit = self.begin_edit().await?;
        let inspection = &mut edit.aggregate.inspection;
        match &parsed {
            Some(selection) => {
                inspection.country_province = selection.code();
                inspection.country_of_residence = selection.country.clone();
                inspection.province_of_residence = selection.province.clone();
            }
            None => {
                inspection.country_province.clear();
                inspection.country_of_residence.clear();
                inspection.province_of_residence.clear();
            }
        }
        self.put_inspection(&mut edit).await?;

        tracing::debug!(
            inspection_id = %self.inspection_id,
            code,
            "Country/province selected"
        );
        self.finish_edit(edit).await.map(EditOutcome::Applied)
    }

    pub async fn add_water_body(
        &self,
        visit: WaterBodyVisit,
        side: JourneySide,
    ) -> SyncResult<WaterBodyVisit> {
        let mut edit = self.begin_edit().await?;
        let stored = append_leg(&mut edit.tx, self.inspection_id, side, visit).await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(stored)
    }

    pub async fn add_major_city(
        &self,
        visit: MajorCityVisit,
        side: JourneySide,
    ) -> SyncResult<MajorCityVisit> {
        let mut edit = self.begin_edit().await?;
        let stored = append_leg(&mut edit.tx, self.inspection_id, side, visit).await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(stored)
    }

    pub async fn remove_water_body(
        &self,
        index: usize,
        side: JourneySide,
    ) -> SyncResult<WaterBodyVisit> {
        let mut edit = self.begin_edit().await?;
        let removed = remove_leg(&mut edit.tx, self.inspection_id, side, index).await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(removed)
    }

    pub async fn remove_major_city(
        &self,
        index: usize,
        side: JourneySide,
    ) -> SyncResult<MajorCityVisit> {
        let mut edit = self.begin_edit().await?;
        let removed = remove_leg(&mut edit.tx, self.inspection_id, side, index).await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(removed)
    }

    /// Flip one journey toggle. Visits of either kind are kept.
    pub async fn set_toggle(
        &self,
        toggle: JourneyToggle,
        side: JourneySide,
        value: bool,
    ) -> SyncResult<FormLayout> {
        let mut edit = self.begin_edit().await?;
        apply_toggle(&mut edit.aggregate.inspection, side, toggle, value);
        self.put_inspection(&mut edit).await?;
        let layout = self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(layout)
    }

    pub async fn set_toggles(
        &self,
        side: JourneySide,
        toggles: JourneyToggles,
    ) -> SyncResult<FormLayout> {
        let mut edit = self.begin_edit().await?;
        apply_toggles(&mut edit.aggregate.inspection, side, toggles);
        self.put_inspection(&mut edit).await?;
        let layout = self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: None });
        Ok(layout)
    }

    pub async fn set_water_body_field(
        &self,
        side: JourneySide,
        index: usize,
        field: VisitField,
        value: FieldValue,
    ) -> SyncResult<WaterBodyVisit> {
        let mut edit = self.begin_edit().await?;
        let visit = update_leg(
            &mut edit.tx,
            self.inspection_id,
            side,
            index,
            |v: &mut WaterBodyVisit| field.set(v, value),
        )
        .await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: Some(index) });
        Ok(visit)
    }

    pub async fn set_major_city_field(
        &self,
        side: JourneySide,
        index: usize,
        field: MajorCityField,
        value: FieldValue,
    ) -> SyncResult<MajorCityVisit> {
        let mut edit = self.begin_edit().await?;
        let visit = update_leg(
            &mut edit.tx,
            self.inspection_id,
            side,
            index,
            |v: &mut MajorCityVisit| field.set(v, value),
        )
        .await?;
        self.put_inspection(&mut edit).await?;
        self.finish_edit(edit).await?;
        self.emit(FormEvent::JourneyChanged { side, index: Some(index) });
        Ok(visit)
    }

    /// Delete the inspection and everything it owns. The shift becomes dirty.
    pub async fn delete(self) -> SyncResult<()> {
        let edit = self.begin_edit().await?;
        let shift_id = edit.aggregate.inspection.shift_id;
        let mut tx = edit.tx;

        tx.cascade_delete_inspection(self.inspection_id).await?;
        mark_dirty_in(&mut tx, shift_id).await?;
        tx.commit().await?;

        tracing::info!(
            inspection_id = %self.inspection_id,
            shift_id = %shift_id,
            "Inspection deleted"
        );
        Ok(())
    }

    async fn begin_edit(&self) -> SyncResult<Edit> {
        let mut tx = self.store.begin().await?;
        let aggregate = tx.aggregate(self.inspection_id).await?;
        if !aggregate.inspection.is_editable() {
            return Err(SyncError::NotEditable(format!(
                "Inspection {} has been submitted",
                self.inspection_id
            )));
        }
        let before = (form_mode(&aggregate.inspection), high_risk_mode(&aggregate));
        Ok(Edit {
            tx,
            aggregate,
            before,
            events: Vec::new(),
        })
    }

    async fn put_inspection(&self, edit: &mut Edit) -> SyncResult<()> {
        edit.aggregate.inspection.updated_at = Utc::now();
        edit.tx.put(&edit.aggregate.inspection).await
    }

    /// With no gating field left true, the assessment goes.
    async fn remove_assessment_if_closed(&self, edit: &mut Edit) -> SyncResult<()> {
        if high_risk_gate_open(&edit.aggregate.inspection) {
            return Ok(());
        }
        if let Some(assessment) = edit.aggregate.high_risk_assessment.take() {
            edit.tx.delete::<HighRiskAssessment>(assessment.id).await?;
            tracing::info!(
                inspection_id = %self.inspection_id,
                assessment_id = %assessment.id,
                "High-risk assessment removed"
            );
            edit.events
                .push(FormEvent::HighRiskAssessmentRemoved { id: assessment.id });
        }
        Ok(())
    }

    async fn finish_edit(&self, edit: Edit) -> SyncResult<FormLayout> {
        let Edit {
            mut tx,
            aggregate,
            before,
            events,
        } = edit;

        let shift = mark_dirty_in(&mut tx, aggregate.inspection.shift_id).await?;
        tx.commit().await?;
        for event in events {
            self.emit(event);
        }

        let layout = self.layout().await?;
        tracing::debug!(
            inspection_id = %self.inspection_id,
            shift_revision = shift.revision,
            mode = ?layout.mode,
            high_risk = ?layout.high_risk,
            "Inspection edit committed"
        );

        if (layout.mode, layout.high_risk) != before {
            self.emit(FormEvent::LayoutChanged {
                mode: layout.mode,
                high_risk: layout.high_risk,
            });
        }
        Ok(layout)
    }

    fn emit(&self, event: FormEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
