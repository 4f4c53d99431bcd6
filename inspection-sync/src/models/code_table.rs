use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Record;

/// Known lookup table types. Anything else the codes API returns is kept
/// under its raw name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeTableType {
    Observers,
    OtherObservations,
    Stations,
    WatercraftList,
    WaterBodies,
    Cities,
    Provinces,
    Other(String),
}

impl CodeTableType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Observers => "observers",
            Self::OtherObservations => "otherObservations",
            Self::Stations => "stations",
            Self::WatercraftList => "watercraftList",
            Self::WaterBodies => "waterBodies",
            Self::Cities => "cities",
            Self::Provinces => "provinces",
            Self::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "observers" => Self::Observers,
            "otherObservations" => Self::OtherObservations,
            "stations" => Self::Stations,
            "watercraftList" => Self::WatercraftList,
            "waterBodies" => Self::WaterBodies,
            "cities" => Self::Cities,
            "provinces" => Self::Provinces,
            other => Self::Other(other.to_string()),
        }
    }

    /// Tables computed from the water body reference set rather than fetched.
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::WaterBodies | Self::Cities | Self::Provinces)
    }
}

impl fmt::Display for CodeTableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached lookup list. Keyed by type, so there is never more than one per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeTable {
    pub code_type: String,
    pub items: Vec<String>,
    pub refreshed_at: DateTime<Utc>,
}

impl CodeTable {
    pub fn new(code_type: &CodeTableType, items: Vec<String>) -> Self {
        Self {
            code_type: code_type.as_str().to_string(),
            items,
            refreshed_at: Utc::now(),
        }
    }
}

impl Record for CodeTable {
    const COLLECTION: &'static str = "code_tables";

    fn key(&self) -> String {
        self.code_type.clone()
    }

    fn assign_id(&mut self, _id: Uuid) {}
}

/// Geographic reference entry for one water body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterBodyReference {
    pub id: Uuid,
    pub name: String,
    pub water_body_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Province abbreviation
    pub abbrev: String,
    /// Nearest city
    pub closest: String,
}

impl Record for WaterBodyReference {
    const COLLECTION: &'static str = "water_body_references";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

/// Dropdown entry built from a code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub key: String,
    pub display: String,
}

impl DropdownOption {
    pub fn new(display: impl Into<String>) -> Self {
        let display = display.into();
        Self {
            key: display.clone(),
            display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table_type_names_round_trip() {
        for name in ["observers", "stations", "waterBodies", "cities", "provinces"] {
            assert_eq!(CodeTableType::from_name(name).as_str(), name);
        }
        assert_eq!(
            CodeTableType::from_name("launchSites"),
            CodeTableType::Other("launchSites".to_string())
        );
    }

    #[test]
    fn test_derived_types() {
        assert!(CodeTableType::Provinces.is_derived());
        assert!(CodeTableType::WaterBodies.is_derived());
        assert!(!CodeTableType::Stations.is_derived());
    }
}
