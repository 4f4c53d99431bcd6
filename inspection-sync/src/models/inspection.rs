use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::high_risk::HighRiskAssessment;
use crate::models::journey::{JourneySide, MajorCityVisit, WaterBodyVisit};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    Draft,
    /// Accepted by the server. Terminal; no further local edits.
    Submitted,
}

/// One watercraft inspection within a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub id: Uuid,
    pub shift_id: Uuid,
    pub remote_id: Option<i64>,
    pub status: InspectionStatus,

    pub is_passport_holder: bool,
    pub passport_number: String,
    pub launched_outside_bc: bool,
    pub is_new_passport_issued: bool,
    pub inspection_time: String,

    pub country_province: String,
    pub country_of_residence: String,
    pub province_of_residence: String,
    pub non_motorized: i64,
    pub simple: i64,
    pub complex: i64,
    pub very_complex: i64,

    pub number_of_people_in_party: i64,
    pub commercially_hauled: bool,
    pub previous_ais_knowledge: bool,
    pub previous_ais_knowledge_source: String,
    pub previous_inspection: bool,
    pub previous_inspection_source: String,
    pub previous_inspection_days: i64,

    pub previous_dry_storage: bool,
    pub unknown_previous_water_body: bool,
    pub commercial_manufacturer_as_previous_water_body: bool,
    pub destination_dry_storage: bool,
    pub unknown_destination_water_body: bool,
    pub commercial_manufacturer_as_destination_water_body: bool,

    pub aquatic_plants_found: bool,
    pub marine_mussels_found: bool,
    pub marine_species_found: String,
    pub dreissenid_mussels_found_previous: bool,

    pub high_risk_ais: bool,
    pub adult_dreissenidae_found: bool,

    pub general_comments: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InspectionRecord {
    /// A blank draft inspection. New inspections default to passport holders,
    /// which keeps the form compact until an answer widens it.
    pub fn new(shift_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            shift_id,
            remote_id: None,
            status: InspectionStatus::Draft,
            is_passport_holder: true,
            passport_number: String::new(),
            launched_outside_bc: false,
            is_new_passport_issued: false,
            inspection_time: String::new(),
            country_province: String::new(),
            country_of_residence: String::new(),
            province_of_residence: String::new(),
            non_motorized: 0,
            simple: 0,
            complex: 0,
            very_complex: 0,
            number_of_people_in_party: 0,
            commercially_hauled: false,
            previous_ais_knowledge: false,
            previous_ais_knowledge_source: String::new(),
            previous_inspection: false,
            previous_inspection_source: String::new(),
            previous_inspection_days: 0,
            previous_dry_storage: false,
            unknown_previous_water_body: false,
            commercial_manufacturer_as_previous_water_body: false,
            destination_dry_storage: false,
            unknown_destination_water_body: false,
            commercial_manufacturer_as_destination_water_body: false,
            aquatic_plants_found: false,
            marine_mussels_found: false,
            marine_species_found: String::new(),
            dreissenid_mussels_found_previous: false,
            high_risk_ais: false,
            adult_dreissenidae_found: false,
            general_comments: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.status == InspectionStatus::Draft
    }

    /// Any of the three toggles replaces the side's water body rows with
    /// major city rows.
    pub fn journey_toggles_checked(&self, side: JourneySide) -> bool {
        match side {
            JourneySide::Previous => {
                self.previous_dry_storage
                    || self.unknown_previous_water_body
                    || self.commercial_manufacturer_as_previous_water_body
            }
            JourneySide::Destination => {
                self.destination_dry_storage
                    || self.unknown_destination_water_body
                    || self.commercial_manufacturer_as_destination_water_body
            }
        }
    }
}

impl Record for InspectionRecord {
    const COLLECTION: &'static str = "inspections";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn parent_key(&self) -> Option<String> {
        Some(self.shift_id.to_string())
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

/// An inspection together with everything it owns, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionAggregate {
    pub inspection: InspectionRecord,
    pub previous_water_bodies: Vec<WaterBodyVisit>,
    pub destination_water_bodies: Vec<WaterBodyVisit>,
    pub previous_major_cities: Vec<MajorCityVisit>,
    pub destination_major_cities: Vec<MajorCityVisit>,
    pub high_risk_assessment: Option<HighRiskAssessment>,
}

impl InspectionAggregate {
    pub fn new(inspection: InspectionRecord) -> Self {
        Self {
            inspection,
            previous_water_bodies: Vec::new(),
            destination_water_bodies: Vec::new(),
            previous_major_cities: Vec::new(),
            destination_major_cities: Vec::new(),
            high_risk_assessment: None,
        }
    }

    /// Build from unsorted child rows, splitting by side and ordering by position.
    pub fn from_parts(
        inspection: InspectionRecord,
        water_bodies: Vec<WaterBodyVisit>,
        major_cities: Vec<MajorCityVisit>,
        high_risk_assessment: Option<HighRiskAssessment>,
    ) -> Self {
        let (mut previous_water_bodies, mut destination_water_bodies): (Vec<_>, Vec<_>) =
            water_bodies.into_iter().partition(|v| v.side.is_previous());
        let (mut previous_major_cities, mut destination_major_cities): (Vec<_>, Vec<_>) =
            major_cities.into_iter().partition(|v| v.side.is_previous());
        previous_water_bodies.sort_by_key(|v| v.position);
        destination_water_bodies.sort_by_key(|v| v.position);
        previous_major_cities.sort_by_key(|v| v.position);
        destination_major_cities.sort_by_key(|v| v.position);

        Self {
            inspection,
            previous_water_bodies,
            destination_water_bodies,
            previous_major_cities,
            destination_major_cities,
            high_risk_assessment,
        }
    }

    pub fn water_bodies(&self, side: JourneySide) -> &[WaterBodyVisit] {
        match side {
            JourneySide::Previous => &self.previous_water_bodies,
            JourneySide::Destination => &self.destination_water_bodies,
        }
    }

    pub fn major_cities(&self, side: JourneySide) -> &[MajorCityVisit] {
        match side {
            JourneySide::Previous => &self.previous_major_cities,
            JourneySide::Destination => &self.destination_major_cities,
        }
    }
}
