//! Persisted entities.
//!
//! Every record is stored as a camelCase JSON document keyed by its local id.
//! Children carry the id of the record that owns them; nothing is shared.

pub mod code_table;
pub mod high_risk;
pub mod inspection;
pub mod journey;
pub mod shift;

pub use code_table::{CodeTable, CodeTableType, DropdownOption, WaterBodyReference};
pub use high_risk::HighRiskAssessment;
pub use inspection::{InspectionAggregate, InspectionRecord, InspectionStatus};
pub use journey::{JourneyLeg, JourneySide, MajorCityVisit, WaterBodyVisit};
pub use shift::{ShiftRecord, ShiftStatus};
