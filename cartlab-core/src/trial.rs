use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::product::ProductId;

/// One of the four fixed shelf anchors a trial stocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShelfSlot {
    One,
    Two,
    Three,
    Four,
}

impl ShelfSlot {
    pub const ALL: [ShelfSlot; 4] = [ShelfSlot::One, ShelfSlot::Two, ShelfSlot::Three, ShelfSlot::Four];

    /// Zero-based index into a trial's shelf array.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            ShelfSlot::One => 0,
            ShelfSlot::Two => 1,
            ShelfSlot::Three => 2,
            ShelfSlot::Four => 3,
        }
    }

    /// One-based shelf number as written to the trial log.
    #[must_use]
    pub fn number(self) -> i32 {
        self.index() as i32 + 1
    }
}

/// Schedule lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialKey {
    pub participant_id: i32,
    pub trial_number: i32,
}

/// One scheduled trial: who, when, under which condition, and what is on
/// each shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub participant_id: i32,
    pub block: i32,
    pub trial_number: i32,
    /// Condition 1..=4, or 0 when the schedule does not carry one.
    pub condition: i32,
    pub shelves: [ProductId; 4],
}

impl TrialRecord {
    #[must_use]
    pub fn key(&self) -> TrialKey {
        TrialKey {
            participant_id: self.participant_id,
            trial_number: self.trial_number,
        }
    }

    #[must_use]
    pub fn product_on(&self, slot: ShelfSlot) -> ProductId {
        self.shelves[slot.index()]
    }

    /// The first shelf stocked with `product_id`.
    #[must_use]
    pub fn slot_of(&self, product_id: ProductId) -> Option<ShelfSlot> {
        ShelfSlot::ALL
            .into_iter()
            .find(|slot| self.product_on(*slot) == product_id)
    }
}

/// One row of the trial log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialLogEntry {
    pub participant_id: i32,
    pub block: i32,
    pub trial_number: i32,
    pub condition: i32,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub duration_secs: f64,
    /// Purchased product, 0 when nothing was bought.
    pub product_purchased: ProductId,
    /// Shelf 1..=4 the purchase came from, 0 when nothing was bought.
    pub shelf_location: i32,
    pub shelves: [ProductId; 4],
}

impl TrialLogEntry {
    pub const HEADER: &'static str = "ParticipantID,Block,TrialNumber,Condition,TrialStartTime,\
TrialEndTime,TrialDuration_Seconds,ProductPurchased,ShelfLocation,ShelfOneProductID,\
ShelfTwoProductID,ShelfThreeProductID,ShelfFourProductID";

    const TIME_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S%.3f";

    #[must_use]
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{:.3},{},{},{},{},{},{}",
            self.participant_id,
            self.block,
            self.trial_number,
            self.condition,
            self.start.format(Self::TIME_FORMAT),
            self.end.format(Self::TIME_FORMAT),
            self.duration_secs,
            self.product_purchased,
            self.shelf_location,
            self.shelves[0],
            self.shelves[1],
            self.shelves[2],
            self.shelves[3],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> TrialRecord {
        TrialRecord {
            participant_id: 3,
            block: 2,
            trial_number: 5,
            condition: 4,
            shelves: [10, 11, 12, 10],
        }
    }

    #[test]
    fn slot_of_finds_first_shelf() {
        let r = record();
        assert_eq!(r.slot_of(10), Some(ShelfSlot::One));
        assert_eq!(r.slot_of(12).map(ShelfSlot::number), Some(3));
        assert_eq!(r.slot_of(99), None);
    }

    #[test]
    fn header_and_row_have_thirteen_columns() {
        let start = Local.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(12_345);
        let entry = TrialLogEntry {
            participant_id: 3,
            block: 2,
            trial_number: 5,
            condition: 4,
            start,
            end,
            duration_secs: 12.345,
            product_purchased: 11,
            shelf_location: 2,
            shelves: [10, 11, 12, 10],
        };
        assert_eq!(TrialLogEntry::HEADER.split(',').count(), 13);
        let row = entry.csv_row();
        assert_eq!(row.split(',').count(), 13);
        assert_eq!(
            row,
            "3,2,5,4,2025-03-01 09:30:00.000,2025-03-01 09:30:12.345,12.345,11,2,10,11,12,10"
        );
    }
}
