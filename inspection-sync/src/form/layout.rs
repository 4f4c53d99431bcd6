//! Visible-form computation
//!
//! `compute_layout` is a pure function of the aggregate. Nothing here is
//! cached; a session recomputes the layout after every committed edit.

use serde::Serialize;

use crate::form::fields::{FieldKind, FieldValue, HighRiskField, InspectionField, ShiftField};
use crate::journey::{journey_rows, JourneyRow, JourneyToggles};
use crate::models::{
    HighRiskAssessment, InspectionAggregate, InspectionRecord, JourneySide, ShiftRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    /// Passport section only
    Compact,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighRiskMode {
    Hidden,
    /// First two assessment sections
    Summary,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormSection {
    PassportInfo,
    BasicInformation,
    WatercraftDetails,
    JourneyDetails,
    InspectionDetails,
    HighRiskAssessmentFields,
    HighRiskAssessment,
    Divider,
    GeneralComments,
}

impl FormSection {
    pub const ALL: [FormSection; 9] = [
        Self::PassportInfo,
        Self::BasicInformation,
        Self::WatercraftDetails,
        Self::JourneyDetails,
        Self::InspectionDetails,
        Self::HighRiskAssessmentFields,
        Self::HighRiskAssessment,
        Self::Divider,
        Self::GeneralComments,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::PassportInfo => "Passport Information",
            Self::BasicInformation => "Basic Information",
            Self::WatercraftDetails => "Watercraft Details",
            Self::JourneyDetails => "Journey Details",
            Self::InspectionDetails => "Inspection Details",
            Self::HighRiskAssessmentFields => "High Risk Assessment Fields",
            Self::HighRiskAssessment => "High Risk Assessment",
            Self::Divider => "",
            Self::GeneralComments => "Comments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighRiskSection {
    InspectionOutcomes,
    InspectionFindings,
    Decontamination,
    SealIssued,
    GeneralComments,
}

impl HighRiskSection {
    pub const ALL: [HighRiskSection; 5] = [
        Self::InspectionOutcomes,
        Self::InspectionFindings,
        Self::Decontamination,
        Self::SealIssued,
        Self::GeneralComments,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::InspectionOutcomes => "Inspection Outcomes",
            Self::InspectionFindings => "Inspection Findings",
            Self::Decontamination => "Decontamination",
            Self::SealIssued => "Seal",
            Self::GeneralComments => "Comments",
        }
    }
}

/// One rendered input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldLayout {
    pub key: &'static str,
    pub header: &'static str,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub editable: bool,
}

impl FieldLayout {
    fn inspection(field: InspectionField, record: &InspectionRecord, editable: bool) -> Self {
        Self {
            key: field.key(),
            header: field.header(),
            kind: field.kind(),
            value: field.get(record),
            editable,
        }
    }

    pub(crate) fn shift(field: ShiftField, record: &ShiftRecord, editable: bool) -> Self {
        Self {
            key: field.key(),
            header: field.header(),
            kind: field.kind(),
            value: field.get(record),
            editable,
        }
    }

    fn high_risk(field: HighRiskField, record: &HighRiskAssessment, editable: bool) -> Self {
        Self {
            key: field.key(),
            header: field.header(),
            kind: field.kind(),
            value: field.get(record),
            editable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighRiskGroup {
    pub section: HighRiskSection,
    pub fields: Vec<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum SectionContent {
    Fields(Vec<FieldLayout>),
    Journey {
        previous_toggles: JourneyToggles,
        destination_toggles: JourneyToggles,
        rows: Vec<JourneyRow>,
    },
    HighRisk(Vec<HighRiskGroup>),
    Divider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionLayout {
    pub section: FormSection,
    pub content: SectionContent,
}

/// The visible shape of one inspection form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormLayout {
    pub mode: FormMode,
    pub high_risk: HighRiskMode,
    pub editable: bool,
    /// Visible sections in display order
    pub sections: Vec<SectionLayout>,
}

impl FormLayout {
    pub fn section(&self, section: FormSection) -> Option<&SectionLayout> {
        self.sections.iter().find(|s| s.section == section)
    }

    pub fn is_visible(&self, section: FormSection) -> bool {
        self.section(section).is_some()
    }

    /// Every visible field, across plain and high-risk sections.
    pub fn fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.sections.iter().flat_map(|s| {
            let fields: Vec<&FieldLayout> = match &s.content {
                SectionContent::Fields(fields) => fields.iter().collect(),
                SectionContent::HighRisk(groups) => {
                    groups.iter().flat_map(|g| g.fields.iter()).collect()
                }
                SectionContent::Journey { .. } | SectionContent::Divider => Vec::new(),
            };
            fields
        })
    }

    pub fn field(&self, key: &str) -> Option<&FieldLayout> {
        self.fields().find(|f| f.key.eq_ignore_ascii_case(key))
    }
}

pub fn form_mode(record: &InspectionRecord) -> FormMode {
    if !record.is_passport_holder || record.launched_outside_bc || record.is_new_passport_issued {
        FormMode::Full
    } else {
        FormMode::Compact
    }
}

pub fn high_risk_gate_open(record: &InspectionRecord) -> bool {
    InspectionField::HIGH_RISK_GATES
        .iter()
        .any(|f| f.get(record) == FieldValue::Bool(true))
}

pub fn high_risk_mode(aggregate: &InspectionAggregate) -> HighRiskMode {
    if !high_risk_gate_open(&aggregate.inspection) {
        return HighRiskMode::Hidden;
    }
    let unclean = aggregate
        .high_risk_assessment
        .as_ref()
        .and_then(|a| a.clean_drain_dry_after_inspection)
        == Some(false);
    if unclean {
        HighRiskMode::Full
    } else {
        HighRiskMode::Summary
    }
}

pub fn compute_layout(aggregate: &InspectionAggregate) -> FormLayout {
    let record = &aggregate.inspection;
    let editable = record.is_editable();
    let mode = form_mode(record);
    let high_risk = high_risk_mode(aggregate);

    let mut sections = vec![SectionLayout {
        section: FormSection::PassportInfo,
        content: SectionContent::Fields(fields_for(FormSection::PassportInfo, record, editable)),
    }];

    if mode == FormMode::Full {
        for section in FormSection::ALL.iter().copied().skip(1) {
            let content = match section {
                FormSection::JourneyDetails => SectionContent::Journey {
                    previous_toggles: JourneyToggles::of(record, JourneySide::Previous),
                    destination_toggles: JourneyToggles::of(record, JourneySide::Destination),
                    rows: journey_rows(aggregate),
                },
                FormSection::HighRiskAssessment => {
                    if high_risk == HighRiskMode::Hidden {
                        continue;
                    }
                    SectionContent::HighRisk(high_risk_groups(aggregate, high_risk, editable))
                }
                FormSection::Divider => {
                    if high_risk != HighRiskMode::Hidden {
                        continue;
                    }
                    SectionContent::Divider
                }
                other => SectionContent::Fields(fields_for(other, record, editable)),
            };
            sections.push(SectionLayout { section, content });
        }
    }

    FormLayout {
        mode,
        high_risk,
        editable,
        sections,
    }
}

fn fields_for(section: FormSection, record: &InspectionRecord, editable: bool) -> Vec<FieldLayout> {
    use InspectionField as F;
    let candidates: &[InspectionField] = match section {
        FormSection::PassportInfo => &[
            F::IsPassportHolder,
            F::PassportNumber,
            F::LaunchedOutsideBc,
            F::IsNewPassportIssued,
            F::InspectionTime,
        ],
        FormSection::BasicInformation => &[
            F::CountryProvince,
            F::NonMotorized,
            F::Simple,
            F::Complex,
            F::VeryComplex,
        ],
        FormSection::WatercraftDetails => &[
            F::NumberOfPeopleInParty,
            F::CommerciallyHauled,
            F::PreviousAisKnowledge,
            F::PreviousAisKnowledgeSource,
            F::PreviousInspection,
            F::PreviousInspectionSource,
            F::PreviousInspectionDays,
        ],
        FormSection::InspectionDetails => &[
            F::AquaticPlantsFound,
            F::MarineMusselsFound,
            F::MarineSpeciesFound,
            F::DreissenidMusselsFoundPrevious,
        ],
        FormSection::HighRiskAssessmentFields => &[F::HighRiskAis, F::AdultDreissenidaeFound],
        FormSection::GeneralComments => &[F::GeneralComments],
        FormSection::JourneyDetails | FormSection::HighRiskAssessment | FormSection::Divider => {
            &[]
        }
    };

    candidates
        .iter()
        .copied()
        .filter(|f| inspection_field_visible(*f, record))
        .map(|f| FieldLayout::inspection(f, record, editable))
        .collect()
}

/// Field-level show/hide rules within a visible section.
pub fn inspection_field_visible(field: InspectionField, record: &InspectionRecord) -> bool {
    use InspectionField as F;
    match field {
        F::PassportNumber | F::LaunchedOutsideBc | F::IsNewPassportIssued => {
            record.is_passport_holder
        }
        F::PreviousAisKnowledgeSource => record.previous_ais_knowledge,
        F::PreviousInspectionSource | F::PreviousInspectionDays => record.previous_inspection,
        F::MarineSpeciesFound => record.marine_mussels_found,
        _ => true,
    }
}

pub fn high_risk_field_visible(field: HighRiskField, record: &HighRiskAssessment) -> bool {
    use HighRiskField as H;
    match field {
        H::StandingWaterLocation => record.standing_water_present,
        H::DecontaminationReference => record.decontamination_performed,
        H::DecontaminationOrderNumber => record.decontamination_order_issued,
        H::SealNumber => record.seal_issued,
        _ => true,
    }
}

fn high_risk_groups(
    aggregate: &InspectionAggregate,
    mode: HighRiskMode,
    editable: bool,
) -> Vec<HighRiskGroup> {
    use HighRiskField as H;
    let blank;
    let record = match &aggregate.high_risk_assessment {
        Some(assessment) => assessment,
        None => {
            blank = HighRiskAssessment::new(aggregate.inspection.id);
            &blank
        }
    };

    let count = match mode {
        HighRiskMode::Hidden => 0,
        HighRiskMode::Summary => 2,
        HighRiskMode::Full => HighRiskSection::ALL.len(),
    };

    HighRiskSection::ALL
        .iter()
        .copied()
        .take(count)
        .map(|section| {
            let candidates: &[HighRiskField] = match section {
                HighRiskSection::InspectionOutcomes => {
                    &[H::CleanDrainDryAfterInspection, H::QuarantinePeriodIssued]
                }
                HighRiskSection::InspectionFindings => &[
                    H::StandingWaterPresent,
                    H::StandingWaterLocation,
                    H::AdultDreissenidMusselsFound,
                    H::OtherInspectionFindings,
                ],
                HighRiskSection::Decontamination => &[
                    H::DecontaminationPerformed,
                    H::DecontaminationReference,
                    H::DecontaminationOrderIssued,
                    H::DecontaminationOrderNumber,
                ],
                HighRiskSection::SealIssued => &[H::SealIssued, H::SealNumber],
                HighRiskSection::GeneralComments => &[H::GeneralComments],
            };
            HighRiskGroup {
                section,
                fields: candidates
                    .iter()
                    .copied()
                    .filter(|f| high_risk_field_visible(*f, record))
                    .map(|f| FieldLayout::high_risk(f, record, editable))
                    .collect(),
            }
        })
        .collect()
}
