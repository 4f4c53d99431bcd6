//! Conditional form schema
//!
//! The form shown for an inspection is a function of the record's current
//! values. `layout` computes it, `fields` maps UI keys onto typed fields, and
//! the sessions apply edits transactionally.

pub mod country;
pub mod fields;
pub mod layout;
pub mod session;
pub mod shift;

pub use country::{country_province_options, CountryProvince};
pub use fields::{FieldKind, FieldValue, HighRiskField, InspectionField, ShiftField};
pub use layout::{
    compute_layout, FieldLayout, FormLayout, FormMode, FormSection, HighRiskGroup, HighRiskMode,
    HighRiskSection, SectionContent, SectionLayout,
};
pub use session::{EditOutcome, FormEvent, FormSession, PendingHighRisk};
pub use shift::{shift_end_fields, shift_start_fields, ShiftSession};
