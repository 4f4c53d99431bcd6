use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Record;

/// The high-risk assessment sub-form. At most one per inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighRiskAssessment {
    pub id: Uuid,
    pub inspection_id: Uuid,
    /// `None` until answered. `Some(false)` opens the full assessment.
    pub clean_drain_dry_after_inspection: Option<bool>,
    pub quarantine_period_issued: bool,
    pub standing_water_present: bool,
    pub standing_water_location: String,
    pub adult_dreissenid_mussels_found: bool,
    pub other_inspection_findings: String,
    pub decontamination_performed: bool,
    pub decontamination_reference: String,
    pub decontamination_order_issued: bool,
    pub decontamination_order_number: String,
    pub seal_issued: bool,
    pub seal_number: String,
    pub general_comments: String,
}

impl HighRiskAssessment {
    pub fn new(inspection_id: Uuid) -> Self {
        Self {
            id: Uuid::nil(),
            inspection_id,
            clean_drain_dry_after_inspection: None,
            quarantine_period_issued: false,
            standing_water_present: false,
            standing_water_location: String::new(),
            adult_dreissenid_mussels_found: false,
            other_inspection_findings: String::new(),
            decontamination_performed: false,
            decontamination_reference: String::new(),
            decontamination_order_issued: false,
            decontamination_order_number: String::new(),
            seal_issued: false,
            seal_number: String::new(),
            general_comments: String::new(),
        }
    }
}

impl Record for HighRiskAssessment {
    const COLLECTION: &'static str = "high_risk_assessments";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn parent_key(&self) -> Option<String> {
        Some(self.inspection_id.to_string())
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }
}
