use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::code_table::WaterBodyReference;
use crate::store::Record;

/// Which end of the journey a leg belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneySide {
    Previous,
    Destination,
}

impl JourneySide {
    pub fn is_previous(&self) -> bool {
        matches!(self, JourneySide::Previous)
    }
}

/// A previous or destination water body on an inspection's journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterBodyVisit {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub side: JourneySide,
    /// Equals the index within the (inspection, side) collection
    pub position: u32,
    pub water_body_name: String,
    pub water_body_id: i64,
    pub province: String,
    pub closest_city: String,
    pub number_of_days_out: Option<i64>,
    pub dry_storage: bool,
}

impl WaterBodyVisit {
    pub fn new(
        water_body_name: impl Into<String>,
        province: impl Into<String>,
        closest_city: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            inspection_id: Uuid::nil(),
            side: JourneySide::Previous,
            position: 0,
            water_body_name: water_body_name.into(),
            water_body_id: 0,
            province: province.into(),
            closest_city: closest_city.into(),
            number_of_days_out: None,
            dry_storage: false,
        }
    }
}

impl From<&WaterBodyReference> for WaterBodyVisit {
    fn from(reference: &WaterBodyReference) -> Self {
        let mut visit = Self::new(&reference.name, &reference.abbrev, &reference.closest);
        visit.water_body_id = reference.water_body_id;
        visit
    }
}

impl Record for WaterBodyVisit {
    const COLLECTION: &'static str = "water_body_visits";

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

/// A previous or destination major city, used instead of water bodies when a
/// journey toggle (dry storage, unknown, commercial manufacturer) is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorCityVisit {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub side: JourneySide,
    pub position: u32,
    pub city: String,
    pub province: String,
    pub country: String,
    pub dry_storage: bool,
}

impl MajorCityVisit {
    pub fn new(
        city: impl Into<String>,
        province: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            inspection_id: Uuid::nil(),
            side: JourneySide::Previous,
            position: 0,
            city: city.into(),
            province: province.into(),
            country: country.into(),
            dry_storage: false,
        }
    }
}

impl Record for MajorCityVisit {
    const COLLECTION: &'static str = "major_city_visits";

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

/// Ordinal-bearing journey entries, so renumbering works for both kinds.
pub trait JourneyLeg: Record + Clone {
    fn side(&self) -> JourneySide;
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
    fn attach(&mut self, inspection_id: Uuid, side: JourneySide, position: u32);
}

impl JourneyLeg for WaterBodyVisit {
    fn side(&self) -> JourneySide {
        self.side
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    fn attach(&mut self, inspection_id: Uuid, side: JourneySide, position: u32) {
        self.inspection_id = inspection_id;
        self.side = side;
        self.position = position;
    }
}

impl JourneyLeg for MajorCityVisit {
    fn side(&self) -> JourneySide {
        self.side
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    fn attach(&mut self, inspection_id: Uuid, side: JourneySide, position: u32) {
        self.inspection_id = inspection_id;
        self.side = side;
        self.position = position;
    }
}
