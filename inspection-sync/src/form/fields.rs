//! Typed form fields
//!
//! Every editable value is a variant of one of the field enums below. The
//! string key is what a UI layer sends back; `from_key` is the only place
//! that maps it, so an unknown key is an `InvalidField` error rather than a
//! silent no-op.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::models::{HighRiskAssessment, InspectionRecord, ShiftRecord};

/// Input widget a field is edited with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Switch,
    /// Yes/no radio that may be left unanswered
    RadioBoolean,
    Integer,
    Text,
    TextArea,
    /// `HH:MM`
    Time,
    /// Options come from the named code table
    Dropdown(&'static str),
}

/// A field value as exchanged with the UI layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Empty,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_bool(&self, key: &str) -> SyncResult<bool> {
        match self {
            FieldValue::Bool(b) => Ok(*b),
            other => Err(mismatch(key, "a boolean", other)),
        }
    }

    pub fn as_int(&self, key: &str) -> SyncResult<i64> {
        match self {
            FieldValue::Int(n) => Ok(*n),
            FieldValue::Empty => Ok(0),
            other => Err(mismatch(key, "an integer", other)),
        }
    }

    pub fn into_text(self, key: &str) -> SyncResult<String> {
        match self {
            FieldValue::Text(s) => Ok(s),
            FieldValue::Empty => Ok(String::new()),
            other => Err(mismatch(key, "text", &other)),
        }
    }

    fn into_time(self, key: &str) -> SyncResult<String> {
        let text = self.into_text(key)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map(|t| t.format("%H:%M").to_string())
            .map_err(|_| SyncError::InvalidField(format!("{}: '{}' is not HH:MM", key, trimmed)))
    }
}

fn mismatch(key: &str, expected: &str, got: &FieldValue) -> SyncError {
    SyncError::InvalidField(format!("{} expects {}, got {:?}", key, expected, got))
}

/// Fields stored directly on an inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InspectionField {
    IsPassportHolder,
    PassportNumber,
    LaunchedOutsideBc,
    IsNewPassportIssued,
    InspectionTime,
    CountryProvince,
    NonMotorized,
    Simple,
    Complex,
    VeryComplex,
    NumberOfPeopleInParty,
    CommerciallyHauled,
    PreviousAisKnowledge,
    PreviousAisKnowledgeSource,
    PreviousInspection,
    PreviousInspectionSource,
    PreviousInspectionDays,
    PreviousDryStorage,
    UnknownPreviousWaterBody,
    CommercialManufacturerAsPreviousWaterBody,
    DestinationDryStorage,
    UnknownDestinationWaterBody,
    CommercialManufacturerAsDestinationWaterBody,
    AquaticPlantsFound,
    MarineMusselsFound,
    MarineSpeciesFound,
    DreissenidMusselsFoundPrevious,
    HighRiskAis,
    AdultDreissenidaeFound,
    GeneralComments,
}

impl InspectionField {
    pub const ALL: [InspectionField; 30] = [
        Self::IsPassportHolder,
        Self::PassportNumber,
        Self::LaunchedOutsideBc,
        Self::IsNewPassportIssued,
        Self::InspectionTime,
        Self::CountryProvince,
        Self::NonMotorized,
        Self::Simple,
        Self::Complex,
        Self::VeryComplex,
        Self::NumberOfPeopleInParty,
        Self::CommerciallyHauled,
        Self::PreviousAisKnowledge,
        Self::PreviousAisKnowledgeSource,
        Self::PreviousInspection,
        Self::PreviousInspectionSource,
        Self::PreviousInspectionDays,
        Self::PreviousDryStorage,
        Self::UnknownPreviousWaterBody,
        Self::CommercialManufacturerAsPreviousWaterBody,
        Self::DestinationDryStorage,
        Self::UnknownDestinationWaterBody,
        Self::CommercialManufacturerAsDestinationWaterBody,
        Self::AquaticPlantsFound,
        Self::MarineMusselsFound,
        Self::MarineSpeciesFound,
        Self::DreissenidMusselsFoundPrevious,
        Self::HighRiskAis,
        Self::AdultDreissenidaeFound,
        Self::GeneralComments,
    ];

    /// Fields that open the high-risk assessment when set
    pub const HIGH_RISK_GATES: [InspectionField; 2] =
        [Self::HighRiskAis, Self::AdultDreissenidaeFound];

    pub fn key(&self) -> &'static str {
        match self {
            Self::IsPassportHolder => "isPassportHolder",
            Self::PassportNumber => "passportNumber",
            Self::LaunchedOutsideBc => "launchedOutsideBC",
            Self::IsNewPassportIssued => "isNewPassportIssued",
            Self::InspectionTime => "inspectionTime",
            Self::CountryProvince => "countryProvince",
            Self::NonMotorized => "nonMotorized",
            Self::Simple => "simple",
            Self::Complex => "complex",
            Self::VeryComplex => "veryComplex",
            Self::NumberOfPeopleInParty => "numberOfPeopleInParty",
            Self::CommerciallyHauled => "commerciallyHauled",
            Self::PreviousAisKnowledge => "previousAISKnowledge",
            Self::PreviousAisKnowledgeSource => "previousAISKnowledgeSource",
            Self::PreviousInspection => "previousInspection",
            Self::PreviousInspectionSource => "previousInspectionSource",
            Self::PreviousInspectionDays => "previousInspectionDays",
            Self::PreviousDryStorage => "previousDryStorage",
            Self::UnknownPreviousWaterBody => "unknownPreviousWaterBody",
            Self::CommercialManufacturerAsPreviousWaterBody => {
                "commercialManufacturerAsPreviousWaterBody"
            }
            Self::DestinationDryStorage => "destinationDryStorage",
            Self::UnknownDestinationWaterBody => "unknownDestinationWaterBody",
            Self::CommercialManufacturerAsDestinationWaterBody => {
                "commercialManufacturerAsDestinationWaterBody"
            }
            Self::AquaticPlantsFound => "aquaticPlantsFound",
            Self::MarineMusselsFound => "marineMusselsFound",
            Self::MarineSpeciesFound => "marineSpeciesFound",
            Self::DreissenidMusselsFoundPrevious => "dreissenidMusselsFoundPrevious",
            Self::HighRiskAis => "highriskAIS",
            Self::AdultDreissenidaeFound => "adultDreissenidaeFound",
            Self::GeneralComments => "generalComments",
        }
    }

    /// Keys are matched case-insensitively.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::IsPassportHolder => "Is this a Passport Holder?",
            Self::PassportNumber => "Passport Number",
            Self::LaunchedOutsideBc => "Launched outside BC/AB in the last 30 days?",
            Self::IsNewPassportIssued => "Is New Passport Issued?",
            Self::InspectionTime => "Time of Inspection",
            Self::CountryProvince => "Province/State of Boat Residence",
            Self::NonMotorized => "Non-Motorized",
            Self::Simple => "Simple",
            Self::Complex => "Complex",
            Self::VeryComplex => "Very Complex",
            Self::NumberOfPeopleInParty => "Number of people in the party",
            Self::CommerciallyHauled => "Watercraft/equipment commercially hauled",
            Self::PreviousAisKnowledge => "Previous knowledge of AIS or Clean, Drain, Dry",
            Self::PreviousAisKnowledgeSource => "Source of previous knowledge",
            Self::PreviousInspection => "Previous inspection and/or agency notification",
            Self::PreviousInspectionSource => "Source of previous inspection",
            Self::PreviousInspectionDays => "Days since previous inspection",
            Self::PreviousDryStorage | Self::DestinationDryStorage => "Dry Storage",
            Self::UnknownPreviousWaterBody | Self::UnknownDestinationWaterBody => "Unknown",
            Self::CommercialManufacturerAsPreviousWaterBody
            | Self::CommercialManufacturerAsDestinationWaterBody => "Commercial Manufacturer",
            Self::AquaticPlantsFound => "Aquatic plants found",
            Self::MarineMusselsFound => "Marine Mussels Found",
            Self::MarineSpeciesFound => "Marine species found",
            Self::DreissenidMusselsFoundPrevious => {
                "Dreissenid mussels found in previous water body"
            }
            Self::HighRiskAis => "Watercraft is from a province or state that is high risk for AIS",
            Self::AdultDreissenidaeFound => "Adult Dreissenidae mussels found",
            Self::GeneralComments => "Comments",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::PassportNumber
            | Self::PreviousAisKnowledgeSource
            | Self::PreviousInspectionSource
            | Self::MarineSpeciesFound => FieldKind::Text,
            Self::InspectionTime => FieldKind::Time,
            Self::CountryProvince => FieldKind::Dropdown("countryProvince"),
            Self::NonMotorized
            | Self::Simple
            | Self::Complex
            | Self::VeryComplex
            | Self::NumberOfPeopleInParty
            | Self::PreviousInspectionDays => FieldKind::Integer,
            Self::GeneralComments => FieldKind::TextArea,
            Self::IsPassportHolder
            | Self::LaunchedOutsideBc
            | Self::IsNewPassportIssued
            | Self::CommerciallyHauled
            | Self::PreviousAisKnowledge
            | Self::PreviousInspection
            | Self::MarineMusselsFound
            | Self::HighRiskAis
            | Self::AdultDreissenidaeFound => FieldKind::RadioBoolean,
            Self::PreviousDryStorage
            | Self::UnknownPreviousWaterBody
            | Self::CommercialManufacturerAsPreviousWaterBody
            | Self::DestinationDryStorage
            | Self::UnknownDestinationWaterBody
            | Self::CommercialManufacturerAsDestinationWaterBody
            | Self::AquaticPlantsFound
            | Self::DreissenidMusselsFoundPrevious => FieldKind::Switch,
        }
    }

    pub fn is_high_risk_gate(&self) -> bool {
        Self::HIGH_RISK_GATES.contains(self)
    }

    pub fn get(&self, record: &InspectionRecord) -> FieldValue {
        use FieldValue::{Bool, Int, Text};
        match self {
            Self::IsPassportHolder => Bool(record.is_passport_holder),
            Self::PassportNumber => Text(record.passport_number.clone()),
            Self::LaunchedOutsideBc => Bool(record.launched_outside_bc),
            Self::IsNewPassportIssued => Bool(record.is_new_passport_issued),
            Self::InspectionTime => Text(record.inspection_time.clone()),
            Self::CountryProvince => Text(record.country_province.clone()),
            Self::NonMotorized => Int(record.non_motorized),
            Self::Simple => Int(record.simple),
            Self::Complex => Int(record.complex),
            Self::VeryComplex => Int(record.very_complex),
            Self::NumberOfPeopleInParty => Int(record.number_of_people_in_party),
            Self::CommerciallyHauled => Bool(record.commercially_hauled),
            Self::PreviousAisKnowledge => Bool(record.previous_ais_knowledge),
            Self::PreviousAisKnowledgeSource => Text(record.previous_ais_knowledge_source.clone()),
            Self::PreviousInspection => Bool(record.previous_inspection),
            Self::PreviousInspectionSource => Text(record.previous_inspection_source.clone()),
            Self::PreviousInspectionDays => Int(record.previous_inspection_days),
            Self::PreviousDryStorage => Bool(record.previous_dry_storage),
            Self::UnknownPreviousWaterBody => Bool(record.unknown_previous_water_body),
            Self::CommercialManufacturerAsPreviousWaterBody => {
                Bool(record.commercial_manufacturer_as_previous_water_body)
            }
            Self::DestinationDryStorage => Bool(record.destination_dry_storage),
            Self::UnknownDestinationWaterBody => Bool(record.unknown_destination_water_body),
            Self::CommercialManufacturerAsDestinationWaterBody => {
                Bool(record.commercial_manufacturer_as_destination_water_body)
            }
            Self::AquaticPlantsFound => Bool(record.aquatic_plants_found),
            Self::MarineMusselsFound => Bool(record.marine_mussels_found),
            Self::MarineSpeciesFound => Text(record.marine_species_found.clone()),
            Self::DreissenidMusselsFoundPrevious => Bool(record.dreissenid_mussels_found_previous),
            Self::HighRiskAis => Bool(record.high_risk_ais),
            Self::AdultDreissenidaeFound => Bool(record.adult_dreissenidae_found),
            Self::GeneralComments => Text(record.general_comments.clone()),
        }
    }

    /// Write one value. `CountryProvince` only stores the code here; the
    /// residence fan-out happens in the form session.
    pub fn set(&self, record: &mut InspectionRecord, value: FieldValue) -> SyncResult<()> {
        let key = self.key();
        match self {
            Self::IsPassportHolder => record.is_passport_holder = value.as_bool(key)?,
            Self::PassportNumber => record.passport_number = value.into_text(key)?,
            Self::LaunchedOutsideBc => record.launched_outside_bc = value.as_bool(key)?,
            Self::IsNewPassportIssued => record.is_new_passport_issued = value.as_bool(key)?,
            Self::InspectionTime => record.inspection_time = value.into_time(key)?,
            Self::CountryProvince => record.country_province = value.into_text(key)?,
            Self::NonMotorized => record.non_motorized = value.as_int(key)?,
            Self::Simple => record.simple = value.as_int(key)?,
            Self::Complex => record.complex = value.as_int(key)?,
            Self::VeryComplex => record.very_complex = value.as_int(key)?,
            Self::NumberOfPeopleInParty => record.number_of_people_in_party = value.as_int(key)?,
            Self::CommerciallyHauled => record.commercially_hauled = value.as_bool(key)?,
            Self::PreviousAisKnowledge => record.previous_ais_knowledge = value.as_bool(key)?,
            Self::PreviousAisKnowledgeSource => {
                record.previous_ais_knowledge_source = value.into_text(key)?
            }
            Self::PreviousInspection => record.previous_inspection = value.as_bool(key)?,
            Self::PreviousInspectionSource => {
                record.previous_inspection_source = value.into_text(key)?
            }
            Self::PreviousInspectionDays => record.previous_inspection_days = value.as_int(key)?,
            Self::PreviousDryStorage => record.previous_dry_storage = value.as_bool(key)?,
            Self::UnknownPreviousWaterBody => {
                record.unknown_previous_water_body = value.as_bool(key)?
            }
            Self::CommercialManufacturerAsPreviousWaterBody => {
                record.commercial_manufacturer_as_previous_water_body = value.as_bool(key)?
            }
            Self::DestinationDryStorage => record.destination_dry_storage = value.as_bool(key)?,
            Self::UnknownDestinationWaterBody => {
                record.unknown_destination_water_body = value.as_bool(key)?
            }
            Self::CommercialManufacturerAsDestinationWaterBody => {
                record.commercial_manufacturer_as_destination_water_body = value.as_bool(key)?
            }
            Self::AquaticPlantsFound => record.aquatic_plants_found = value.as_bool(key)?,
            Self::MarineMusselsFound => record.marine_mussels_found = value.as_bool(key)?,
            Self::MarineSpeciesFound => record.marine_species_found = value.into_text(key)?,
            Self::DreissenidMusselsFoundPrevious => {
                record.dreissenid_mussels_found_previous = value.as_bool(key)?
            }
            Self::HighRiskAis => record.high_risk_ais = value.as_bool(key)?,
            Self::AdultDreissenidaeFound => record.adult_dreissenidae_found = value.as_bool(key)?,
            Self::GeneralComments => record.general_comments = value.into_text(key)?,
        }
        Ok(())
    }
}

/// Fields of the high-risk assessment. Keys carry the `highRisk-` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighRiskField {
    CleanDrainDryAfterInspection,
    QuarantinePeriodIssued,
    StandingWaterPresent,
    StandingWaterLocation,
    AdultDreissenidMusselsFound,
    OtherInspectionFindings,
    DecontaminationPerformed,
    DecontaminationReference,
    DecontaminationOrderIssued,
    DecontaminationOrderNumber,
    SealIssued,
    SealNumber,
    GeneralComments,
}

impl HighRiskField {
    pub const PREFIX: &'static str = "highRisk-";

    pub const ALL: [HighRiskField; 13] = [
        Self::CleanDrainDryAfterInspection,
        Self::QuarantinePeriodIssued,
        Self::StandingWaterPresent,
        Self::StandingWaterLocation,
        Self::AdultDreissenidMusselsFound,
        Self::OtherInspectionFindings,
        Self::DecontaminationPerformed,
        Self::DecontaminationReference,
        Self::DecontaminationOrderIssued,
        Self::DecontaminationOrderNumber,
        Self::SealIssued,
        Self::SealNumber,
        Self::GeneralComments,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CleanDrainDryAfterInspection => "highRisk-cleanDrainDryAfterInspection",
            Self::QuarantinePeriodIssued => "highRisk-quarantinePeriodIssued",
            Self::StandingWaterPresent => "highRisk-standingWaterPresent",
            Self::StandingWaterLocation => "highRisk-standingWaterLocation",
            Self::AdultDreissenidMusselsFound => "highRisk-adultDreissenidMusselsFound",
            Self::OtherInspectionFindings => "highRisk-otherInspectionFindings",
            Self::DecontaminationPerformed => "highRisk-decontaminationPerformed",
            Self::DecontaminationReference => "highRisk-decontaminationReference",
            Self::DecontaminationOrderIssued => "highRisk-decontaminationOrderIssued",
            Self::DecontaminationOrderNumber => "highRisk-decontaminationOrderNumber",
            Self::SealIssued => "highRisk-sealIssued",
            Self::SealNumber => "highRisk-sealNumber",
            Self::GeneralComments => "highRisk-generalComments",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::CleanDrainDryAfterInspection => {
                "Is the watercraft/equipment Clean, Drain, Dry after inspection?"
            }
            Self::QuarantinePeriodIssued => "Quarantine period issued",
            Self::StandingWaterPresent => "Standing water present",
            Self::StandingWaterLocation => "Location of standing water",
            Self::AdultDreissenidMusselsFound => "Adult Dreissenid mussels found",
            Self::OtherInspectionFindings => "Other inspection findings",
            Self::DecontaminationPerformed => "Decontamination performed",
            Self::DecontaminationReference => "Record of Decontamination number",
            Self::DecontaminationOrderIssued => "Decontamination order issued",
            Self::DecontaminationOrderNumber => "Decontamination order number",
            Self::SealIssued => "Seal issued or existing seal?",
            Self::SealNumber => "Seal #",
            Self::GeneralComments => "Comments",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::CleanDrainDryAfterInspection
            | Self::QuarantinePeriodIssued
            | Self::StandingWaterPresent
            | Self::AdultDreissenidMusselsFound
            | Self::DecontaminationPerformed
            | Self::DecontaminationOrderIssued
            | Self::SealIssued => FieldKind::RadioBoolean,
            Self::StandingWaterLocation | Self::OtherInspectionFindings => FieldKind::Text,
            Self::DecontaminationReference
            | Self::DecontaminationOrderNumber
            | Self::SealNumber => FieldKind::Integer,
            Self::GeneralComments => FieldKind::TextArea,
        }
    }

    pub fn get(&self, record: &HighRiskAssessment) -> FieldValue {
        use FieldValue::{Bool, Text};
        match self {
            Self::CleanDrainDryAfterInspection => record
                .clean_drain_dry_after_inspection
                .map_or(FieldValue::Empty, Bool),
            Self::QuarantinePeriodIssued => Bool(record.quarantine_period_issued),
            Self::StandingWaterPresent => Bool(record.standing_water_present),
            Self::StandingWaterLocation => Text(record.standing_water_location.clone()),
            Self::AdultDreissenidMusselsFound => Bool(record.adult_dreissenid_mussels_found),
            Self::OtherInspectionFindings => Text(record.other_inspection_findings.clone()),
            Self::DecontaminationPerformed => Bool(record.decontamination_performed),
            Self::DecontaminationReference => Text(record.decontamination_reference.clone()),
            Self::DecontaminationOrderIssued => Bool(record.decontamination_order_issued),
            Self::DecontaminationOrderNumber => Text(record.decontamination_order_number.clone()),
            Self::SealIssued => Bool(record.seal_issued),
            Self::SealNumber => Text(record.seal_number.clone()),
            Self::GeneralComments => Text(record.general_comments.clone()),
        }
    }

    pub fn set(&self, record: &mut HighRiskAssessment, value: FieldValue) -> SyncResult<()> {
        let key = self.key();
        match self {
            Self::CleanDrainDryAfterInspection => {
                record.clean_drain_dry_after_inspection = match value {
                    FieldValue::Empty => None,
                    other => Some(other.as_bool(key)?),
                }
            }
            Self::QuarantinePeriodIssued => record.quarantine_period_issued = value.as_bool(key)?,
            Self::StandingWaterPresent => record.standing_water_present = value.as_bool(key)?,
            Self::StandingWaterLocation => {
                record.standing_water_location = value.into_text(key)?
            }
            Self::AdultDreissenidMusselsFound => {
                record.adult_dreissenid_mussels_found = value.as_bool(key)?
            }
            Self::OtherInspectionFindings => {
                record.other_inspection_findings = value.into_text(key)?
            }
            Self::DecontaminationPerformed => {
                record.decontamination_performed = value.as_bool(key)?
            }
            Self::DecontaminationReference => {
                record.decontamination_reference = reference_number(value, key)?
            }
            Self::DecontaminationOrderIssued => {
                record.decontamination_order_issued = value.as_bool(key)?
            }
            Self::DecontaminationOrderNumber => {
                record.decontamination_order_number = reference_number(value, key)?
            }
            Self::SealIssued => record.seal_issued = value.as_bool(key)?,
            Self::SealNumber => record.seal_number = reference_number(value, key)?,
            Self::GeneralComments => record.general_comments = value.into_text(key)?,
        }
        Ok(())
    }
}

/// Reference numbers are entered on a numeric pad but stored as text.
fn reference_number(value: FieldValue, key: &str) -> SyncResult<String> {
    match value {
        FieldValue::Int(n) => Ok(n.to_string()),
        other => other.into_text(key),
    }
}

/// Fields of the shift start and end forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftField {
    StartTime,
    Station,
    Sunny,
    Cloudy,
    Raining,
    Snowing,
    Foggy,
    Windy,
    StartComments,
    EndTime,
    K9OnShift,
    BoatsInspected,
    MotorizedBlowBys,
    NonMotorizedBlowBys,
    EndComments,
}

impl ShiftField {
    pub const ALL: [ShiftField; 15] = [
        Self::StartTime,
        Self::Station,
        Self::Sunny,
        Self::Cloudy,
        Self::Raining,
        Self::Snowing,
        Self::Foggy,
        Self::Windy,
        Self::StartComments,
        Self::EndTime,
        Self::K9OnShift,
        Self::BoatsInspected,
        Self::MotorizedBlowBys,
        Self::NonMotorizedBlowBys,
        Self::EndComments,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::Station => "station",
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Raining => "raining",
            Self::Snowing => "snowing",
            Self::Foggy => "foggy",
            Self::Windy => "windy",
            Self::StartComments => "shiftStartComments",
            Self::EndTime => "endTime",
            Self::K9OnShift => "k9OnShift",
            Self::BoatsInspected => "boatsInspected",
            Self::MotorizedBlowBys => "motorizedBlowBys",
            Self::NonMotorizedBlowBys => "nonMotorizedBlowBys",
            Self::EndComments => "shiftEndComments",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key().eq_ignore_ascii_case(key))
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::StartTime => "Shift Start Time",
            Self::Station => "Station",
            Self::Sunny => "Sunny",
            Self::Cloudy => "Cloudy",
            Self::Raining => "Raining",
            Self::Snowing => "Snowing",
            Self::Foggy => "Foggy",
            Self::Windy => "Windy",
            Self::StartComments | Self::EndComments => "Comments",
            Self::EndTime => "Shift End Time",
            Self::K9OnShift => "K9 on shift?",
            Self::BoatsInspected => "Boats inspected during shift?",
            Self::MotorizedBlowBys => "Motorized blow bys",
            Self::NonMotorizedBlowBys => "Non-motorized blow bys",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::StartTime | Self::EndTime => FieldKind::Time,
            Self::Station => FieldKind::Dropdown("stations"),
            Self::Sunny
            | Self::Cloudy
            | Self::Raining
            | Self::Snowing
            | Self::Foggy
            | Self::Windy => FieldKind::Switch,
            Self::K9OnShift | Self::BoatsInspected => FieldKind::RadioBoolean,
            Self::MotorizedBlowBys | Self::NonMotorizedBlowBys => FieldKind::Integer,
            Self::StartComments | Self::EndComments => FieldKind::TextArea,
        }
    }

    pub fn get(&self, record: &ShiftRecord) -> FieldValue {
        use FieldValue::{Bool, Int, Text};
        match self {
            Self::StartTime => Text(record.start_time.clone()),
            Self::Station => Text(record.station.clone()),
            Self::Sunny => Bool(record.sunny),
            Self::Cloudy => Bool(record.cloudy),
            Self::Raining => Bool(record.raining),
            Self::Snowing => Bool(record.snowing),
            Self::Foggy => Bool(record.foggy),
            Self::Windy => Bool(record.windy),
            Self::StartComments => Text(record.start_comments.clone()),
            Self::EndTime => Text(record.end_time.clone()),
            Self::K9OnShift => Bool(record.k9_on_shift),
            Self::BoatsInspected => Bool(record.boats_inspected),
            Self::MotorizedBlowBys => Int(record.motorized_blow_bys),
            Self::NonMotorizedBlowBys => Int(record.non_motorized_blow_bys),
            Self::EndComments => Text(record.end_comments.clone()),
        }
    }

    pub fn set(&self, record: &mut ShiftRecord, value: FieldValue) -> SyncResult<()> {
        let key = self.key();
        match self {
            Self::StartTime => record.start_time = value.into_time(key)?,
            Self::Station => record.station = value.into_text(key)?,
            Self::Sunny => record.sunny = value.as_bool(key)?,
            Self::Cloudy => record.cloudy = value.as_bool(key)?,
            Self::Raining => record.raining = value.as_bool(key)?,
            Self::Snowing => record.snowing = value.as_bool(key)?,
            Self::Foggy => record.foggy = value.as_bool(key)?,
            Self::Windy => record.windy = value.as_bool(key)?,
            Self::StartComments => record.start_comments = value.into_text(key)?,
            Self::EndTime => record.end_time = value.into_time(key)?,
            Self::K9OnShift => record.k9_on_shift = value.as_bool(key)?,
            Self::BoatsInspected => record.boats_inspected = value.as_bool(key)?,
            Self::MotorizedBlowBys => record.motorized_blow_bys = value.as_int(key)?,
            Self::NonMotorizedBlowBys => record.non_motorized_blow_bys = value.as_int(key)?,
            Self::EndComments => record.end_comments = value.into_text(key)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_every_key_resolves_to_its_field() {
        for field in InspectionField::ALL {
            assert_eq!(InspectionField::from_key(field.key()), Some(field));
        }
        for field in HighRiskField::ALL {
            assert!(field.key().starts_with(HighRiskField::PREFIX));
            assert_eq!(HighRiskField::from_key(field.key()), Some(field));
        }
        for field in ShiftField::ALL {
            assert_eq!(ShiftField::from_key(field.key()), Some(field));
        }
        assert_eq!(InspectionField::from_key("ISPASSPORTHOLDER"), Some(InspectionField::IsPassportHolder));
        assert_eq!(InspectionField::from_key("noSuchField"), None);
    }

    #[test]
    fn test_set_then_get_inspection_fields() {
        let mut record = InspectionRecord::new(Uuid::new_v4());

        InspectionField::Simple.set(&mut record, FieldValue::Int(3)).unwrap();
        InspectionField::PassportNumber
            .set(&mut record, FieldValue::text("P-1234"))
            .unwrap();
        InspectionField::HighRiskAis.set(&mut record, FieldValue::Bool(true)).unwrap();

        assert_eq!(InspectionField::Simple.get(&record), FieldValue::Int(3));
        assert_eq!(InspectionField::PassportNumber.get(&record), FieldValue::text("P-1234"));
        assert!(record.high_risk_ais);
    }

    #[test]
    fn test_type_mismatch_is_invalid_field() {
        let mut record = InspectionRecord::new(Uuid::new_v4());
        let err = InspectionField::IsPassportHolder
            .set(&mut record, FieldValue::text("yes"))
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidField(_)));
        assert!(record.is_passport_holder);
    }

    #[test]
    fn test_time_fields_are_validated() {
        let mut shift = ShiftRecord::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), "Golden");
        ShiftField::StartTime.set(&mut shift, FieldValue::text("7:05")).unwrap();
        assert_eq!(shift.start_time, "07:05");

        assert!(ShiftField::EndTime.set(&mut shift, FieldValue::text("25:00")).is_err());
        ShiftField::EndTime.set(&mut shift, FieldValue::Empty).unwrap();
        assert_eq!(shift.end_time, "");
    }

    #[test]
    fn test_clean_drain_dry_can_be_unanswered() {
        let mut assessment = HighRiskAssessment::new(Uuid::new_v4());
        let field = HighRiskField::CleanDrainDryAfterInspection;
        assert_eq!(field.get(&assessment), FieldValue::Empty);

        field.set(&mut assessment, FieldValue::Bool(false)).unwrap();
        assert_eq!(assessment.clean_drain_dry_after_inspection, Some(false));

        HighRiskField::SealNumber
            .set(&mut assessment, FieldValue::Int(4411))
            .unwrap();
        assert_eq!(assessment.seal_number, "4411");
    }
}
