//! Journey legs and the journey row layout
//!
//! Each inspection has an ordered list of water body visits and an ordered
//! list of major city visits per side. Positions are always contiguous from
//! zero; removing a leg renumbers the ones after it in the same transaction.
//!
//! The three journey toggles of a side (dry storage, unknown, commercial
//! manufacturer) switch that side's rows from water bodies to major cities.
//! Toggling never deletes visits of either kind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::form::fields::{FieldValue, InspectionField};
use crate::models::{
    InspectionAggregate, InspectionRecord, JourneyLeg, JourneySide, MajorCityVisit, WaterBodyVisit,
};
use crate::store::StoreTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyToggle {
    DryStorage,
    Unknown,
    CommercialManufacturer,
}

impl JourneyToggle {
    pub const ALL: [JourneyToggle; 3] =
        [Self::DryStorage, Self::Unknown, Self::CommercialManufacturer];

    /// The inspection flag behind this toggle on one side
    pub fn field(&self, side: JourneySide) -> InspectionField {
        use InspectionField as F;
        match (side, self) {
            (JourneySide::Previous, Self::DryStorage) => F::PreviousDryStorage,
            (JourneySide::Previous, Self::Unknown) => F::UnknownPreviousWaterBody,
            (JourneySide::Previous, Self::CommercialManufacturer) => {
                F::CommercialManufacturerAsPreviousWaterBody
            }
            (JourneySide::Destination, Self::DryStorage) => F::DestinationDryStorage,
            (JourneySide::Destination, Self::Unknown) => F::UnknownDestinationWaterBody,
            (JourneySide::Destination, Self::CommercialManufacturer) => {
                F::CommercialManufacturerAsDestinationWaterBody
            }
        }
    }
}

/// All three toggles of one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyToggles {
    pub dry_storage: bool,
    pub unknown: bool,
    pub commercial_manufacturer: bool,
}

impl JourneyToggles {
    pub fn of(record: &InspectionRecord, side: JourneySide) -> Self {
        match side {
            JourneySide::Previous => Self {
                dry_storage: record.previous_dry_storage,
                unknown: record.unknown_previous_water_body,
                commercial_manufacturer: record.commercial_manufacturer_as_previous_water_body,
            },
            JourneySide::Destination => Self {
                dry_storage: record.destination_dry_storage,
                unknown: record.unknown_destination_water_body,
                commercial_manufacturer: record.commercial_manufacturer_as_destination_water_body,
            },
        }
    }

    pub fn get(&self, toggle: JourneyToggle) -> bool {
        match toggle {
            JourneyToggle::DryStorage => self.dry_storage,
            JourneyToggle::Unknown => self.unknown,
            JourneyToggle::CommercialManufacturer => self.commercial_manufacturer,
        }
    }

    pub fn any(&self) -> bool {
        self.dry_storage || self.unknown || self.commercial_manufacturer
    }
}

/// Set one toggle flag. Visits are left alone.
pub fn apply_toggle(
    record: &mut InspectionRecord,
    side: JourneySide,
    toggle: JourneyToggle,
    value: bool,
) {
    let flag = match (side, toggle) {
        (JourneySide::Previous, JourneyToggle::DryStorage) => &mut record.previous_dry_storage,
        (JourneySide::Previous, JourneyToggle::Unknown) => &mut record.unknown_previous_water_body,
        (JourneySide::Previous, JourneyToggle::CommercialManufacturer) => {
            &mut record.commercial_manufacturer_as_previous_water_body
        }
        (JourneySide::Destination, JourneyToggle::DryStorage) => {
            &mut record.destination_dry_storage
        }
        (JourneySide::Destination, JourneyToggle::Unknown) => {
            &mut record.unknown_destination_water_body
        }
        (JourneySide::Destination, JourneyToggle::CommercialManufacturer) => {
            &mut record.commercial_manufacturer_as_destination_water_body
        }
    };
    *flag = value;
}

pub fn apply_toggles(record: &mut InspectionRecord, side: JourneySide, toggles: JourneyToggles) {
    for toggle in JourneyToggle::ALL {
        apply_toggle(record, side, toggle, toggles.get(toggle));
    }
}

/// Editable fields of a water body leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitField {
    WaterBodyName,
    WaterBodyId,
    Province,
    ClosestCity,
    NumberOfDaysOut,
    DryStorage,
}

impl VisitField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::WaterBodyName => "waterBodyName",
            Self::WaterBodyId => "waterBodyId",
            Self::Province => "province",
            Self::ClosestCity => "closestCity",
            Self::NumberOfDaysOut => "numberOfDaysOut",
            Self::DryStorage => "dryStorage",
        }
    }

    pub fn set(&self, visit: &mut WaterBodyVisit, value: FieldValue) -> SyncResult<()> {
        let key = self.key();
        match self {
            Self::WaterBodyName => visit.water_body_name = value.into_text(key)?,
            Self::WaterBodyId => visit.water_body_id = value.as_int(key)?,
            Self::Province => visit.province = value.into_text(key)?,
            Self::ClosestCity => visit.closest_city = value.into_text(key)?,
            Self::NumberOfDaysOut => {
                visit.number_of_days_out = match value {
                    FieldValue::Empty => None,
                    other => Some(other.as_int(key)?),
                }
            }
            Self::DryStorage => visit.dry_storage = value.as_bool(key)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorCityField {
    City,
    Province,
    Country,
    DryStorage,
}

impl MajorCityField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Province => "province",
            Self::Country => "country",
            Self::DryStorage => "dryStorage",
        }
    }

    pub fn set(&self, visit: &mut MajorCityVisit, value: FieldValue) -> SyncResult<()> {
        let key = self.key();
        match self {
            Self::City => visit.city = value.into_text(key)?,
            Self::Province => visit.province = value.into_text(key)?,
            Self::Country => visit.country = value.into_text(key)?,
            Self::DryStorage => visit.dry_storage = value.as_bool(key)?,
        }
        Ok(())
    }
}

/// One row of the journey section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum JourneyRow {
    Header,
    SideHeader { side: JourneySide },
    WaterBody { side: JourneySide, index: usize },
    MajorCity { side: JourneySide, index: usize },
    Add { side: JourneySide },
    Divider,
}

/// Rows shown for one side: major cities when any toggle is on, water bodies otherwise.
fn side_rows(
    aggregate: &InspectionAggregate,
    side: JourneySide,
) -> impl Iterator<Item = JourneyRow> {
    let cities = JourneyToggles::of(&aggregate.inspection, side).any();
    let count = if cities {
        aggregate.major_cities(side).len()
    } else {
        aggregate.water_bodies(side).len()
    };
    (0..count).map(move |index| {
        if cities {
            JourneyRow::MajorCity { side, index }
        } else {
            JourneyRow::WaterBody { side, index }
        }
    })
}

pub fn journey_rows(aggregate: &InspectionAggregate) -> Vec<JourneyRow> {
    let mut rows = vec![JourneyRow::Header];
    for side in [JourneySide::Previous, JourneySide::Destination] {
        rows.push(JourneyRow::SideHeader { side });
        rows.extend(side_rows(aggregate, side));
        rows.push(JourneyRow::Add { side });
    }
    rows.push(JourneyRow::Divider);
    rows
}

pub fn journey_row_count(aggregate: &InspectionAggregate) -> usize {
    6 + side_rows(aggregate, JourneySide::Previous).count()
        + side_rows(aggregate, JourneySide::Destination).count()
}

async fn side_legs<T: JourneyLeg>(
    tx: &mut StoreTransaction,
    inspection_id: Uuid,
    side: JourneySide,
) -> SyncResult<Vec<T>> {
    let mut legs: Vec<T> = tx
        .children::<T>(inspection_id)
        .await?
        .into_iter()
        .filter(|leg| leg.side() == side)
        .collect();
    legs.sort_by_key(|leg| leg.position());
    Ok(legs)
}

/// Append a leg at the end of its side. Returns the stored leg.
pub(crate) async fn append_leg<T: JourneyLeg>(
    tx: &mut StoreTransaction,
    inspection_id: Uuid,
    side: JourneySide,
    mut leg: T,
) -> SyncResult<T> {
    let count = side_legs::<T>(tx, inspection_id, side).await?.len();
    let position = u32::try_from(count)
        .map_err(|_| SyncError::InvalidOperation(format!("Too many {} entries", T::COLLECTION)))?;

    leg.assign_id(Uuid::new_v4());
    leg.attach(inspection_id, side, position);
    tx.put(&leg).await?;
    Ok(leg)
}

/// Remove the leg at `index` and close the gap.
pub(crate) async fn remove_leg<T: JourneyLeg>(
    tx: &mut StoreTransaction,
    inspection_id: Uuid,
    side: JourneySide,
    index: usize,
) -> SyncResult<T> {
    let mut legs = side_legs::<T>(tx, inspection_id, side).await?;
    if index >= legs.len() {
        return Err(SyncError::InvalidOperation(format!(
            "No {} at index {} (have {})",
            T::COLLECTION,
            index,
            legs.len()
        )));
    }

    let removed = legs.remove(index);
    tx.delete::<T>(removed.key()).await?;

    for (position, leg) in legs.iter_mut().enumerate().skip(index) {
        let position = u32::try_from(position).unwrap_or(u32::MAX);
        if leg.position() != position {
            leg.set_position(position);
            tx.put(&*leg).await?;
        }
    }

    tracing::debug!(
        inspection_id = %inspection_id,
        collection = T::COLLECTION,
        index,
        remaining = legs.len(),
        "Removed journey leg"
    );
    Ok(removed)
}

/// Apply `edit` to the leg at `index` and store it.
pub(crate) async fn update_leg<T, F>(
    tx: &mut StoreTransaction,
    inspection_id: Uuid,
    side: JourneySide,
    index: usize,
    edit: F,
) -> SyncResult<T>
where
    T: JourneyLeg,
    F: FnOnce(&mut T) -> SyncResult<()>,
{
    let mut legs = side_legs::<T>(tx, inspection_id, side).await?;
    if index >= legs.len() {
        return Err(SyncError::InvalidOperation(format!(
            "No {} at index {}",
            T::COLLECTION,
            index
        )));
    }
    let mut leg = legs.swap_remove(index);
    edit(&mut leg)?;
    tx.put(&leg).await?;
    Ok(leg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::create_test_store;

    fn aggregate_with(previous: (usize, usize), destination: (usize, usize)) -> InspectionAggregate {
        let mut inspection = InspectionRecord::new(Uuid::new_v4());
        inspection.id = Uuid::new_v4();
        let mut agg = InspectionAggregate::new(inspection);
        for i in 0..previous.0 {
            agg.previous_water_bodies.push(WaterBodyVisit::new(format!("P{}", i), "BC", "Golden"));
        }
        for i in 0..previous.1 {
            agg.previous_major_cities.push(MajorCityVisit::new(format!("PC{}", i), "AB", "CA"));
        }
        for i in 0..destination.0 {
            agg.destination_water_bodies.push(WaterBodyVisit::new(format!("D{}", i), "BC", "Nelson"));
        }
        for i in 0..destination.1 {
            agg.destination_major_cities.push(MajorCityVisit::new(format!("DC{}", i), "WA", "US"));
        }
        agg
    }

    #[test]
    fn test_empty_journey_has_six_rows() {
        let agg = aggregate_with((0, 0), (0, 0));
        assert_eq!(journey_row_count(&agg), 6);
        assert_eq!(
            journey_rows(&agg),
            vec![
                JourneyRow::Header,
                JourneyRow::SideHeader { side: JourneySide::Previous },
                JourneyRow::Add { side: JourneySide::Previous },
                JourneyRow::SideHeader { side: JourneySide::Destination },
                JourneyRow::Add { side: JourneySide::Destination },
                JourneyRow::Divider,
            ]
        );
    }

    #[test]
    fn test_row_count_for_every_toggle_combination() {
        let base = aggregate_with((1, 2), (3, 4));
        for bits in 0u8..64 {
            let mut agg = base.clone();
            let flag = |n: u8| bits & (1 << n) != 0;
            let previous = JourneyToggles {
                dry_storage: flag(0),
                unknown: flag(1),
                commercial_manufacturer: flag(2),
            };
            let destination = JourneyToggles {
                dry_storage: flag(3),
                unknown: flag(4),
                commercial_manufacturer: flag(5),
            };
            apply_toggles(&mut agg.inspection, JourneySide::Previous, previous);
            apply_toggles(&mut agg.inspection, JourneySide::Destination, destination);

            let expected_previous = if previous.any() { 2 } else { 1 };
            let expected_destination = if destination.any() { 4 } else { 3 };
            assert_eq!(
                journey_row_count(&agg),
                6 + expected_previous + expected_destination,
                "toggle bits {:06b}",
                bits
            );
            assert_eq!(journey_rows(&agg).len(), journey_row_count(&agg));
        }
    }

    #[test]
    fn test_destination_toggles_use_destination_cities() {
        let mut agg = aggregate_with((2, 0), (1, 5));
        apply_toggle(&mut agg.inspection, JourneySide::Destination, JourneyToggle::Unknown, true);

        let rows = journey_rows(&agg);
        assert_eq!(
            rows.iter()
                .filter(|r| matches!(r, JourneyRow::MajorCity { side: JourneySide::Destination, .. }))
                .count(),
            5
        );
        assert_eq!(
            rows.iter()
                .filter(|r| matches!(r, JourneyRow::WaterBody { side: JourneySide::Previous, .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_toggle_maps_to_inspection_field() {
        let mut record = InspectionRecord::new(Uuid::new_v4());
        for side in [JourneySide::Previous, JourneySide::Destination] {
            for toggle in JourneyToggle::ALL {
                apply_toggle(&mut record, side, toggle, true);
                assert_eq!(toggle.field(side).get(&record), FieldValue::Bool(true));
            }
        }
        assert!(record.journey_toggles_checked(JourneySide::Previous));
        assert!(record.journey_toggles_checked(JourneySide::Destination));
    }

    #[tokio::test]
    async fn test_remove_renumbers_contiguously() {
        let (store, _dir) = create_test_store().await;
        let inspection_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        for name in ["A", "B", "C"] {
            append_leg(
                &mut tx,
                inspection_id,
                JourneySide::Previous,
                WaterBodyVisit::new(name, "BC", "Golden"),
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let removed: WaterBodyVisit = remove_leg(&mut tx, inspection_id, JourneySide::Previous, 1)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(removed.water_body_name, "B");

        let mut remaining: Vec<WaterBodyVisit> = store.children(inspection_id).await;
        remaining.sort_by_key(|v| v.position);
        let names: Vec<_> = remaining.iter().map(|v| v.water_body_name.as_str()).collect();
        let positions: Vec<_> = remaining.iter().map(|v| v.position).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_sides_are_numbered_independently() {
        let (store, _dir) = create_test_store().await;
        let inspection_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let first = append_leg(
            &mut tx,
            inspection_id,
            JourneySide::Previous,
            MajorCityVisit::new("Calgary", "AB", "CA"),
        )
        .await
        .unwrap();
        let second = append_leg(
            &mut tx,
            inspection_id,
            JourneySide::Destination,
            MajorCityVisit::new("Seattle", "WA", "US"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 0);
    }

    #[tokio::test]
    async fn test_remove_out_of_range_is_rejected() {
        let (store, _dir) = create_test_store().await;
        let mut tx = store.begin().await.unwrap();
        let err = remove_leg::<WaterBodyVisit>(&mut tx, Uuid::new_v4(), JourneySide::Destination, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidOperation(_)));
    }
}
