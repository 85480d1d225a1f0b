use cartlab_core::{ProductId, TrialLogEntry, TrialRecord};
use chrono::{DateTime, Local};

/// Bookkeeping for the trial currently on the shelves.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRun {
    pub record: TrialRecord,
    pub started: DateTime<Local>,
    /// First purchase of the run and the shelf number it came from.
    pub purchase: Option<(ProductId, i32)>,
}

impl TrialRun {
    #[must_use]
    pub fn new(record: TrialRecord, started: DateTime<Local>) -> Self {
        Self {
            record,
            started,
            purchase: None,
        }
    }

    /// Records a purchase unless one was already recorded.
    pub fn record_purchase(&mut self, product_id: ProductId) {
        if self.purchase.is_none() {
            let shelf = self.record.slot_of(product_id).map_or(0, |s| s.number());
            self.purchase = Some((product_id, shelf));
        }
    }

    #[must_use]
    pub fn finish(self, end: DateTime<Local>) -> TrialLogEntry {
        let duration = end - self.started;
        let (product_purchased, shelf_location) = self.purchase.unwrap_or((0, 0));
        TrialLogEntry {
            participant_id: self.record.participant_id,
            block: self.record.block,
            trial_number: self.record.trial_number,
            condition: self.record.condition,
            start: self.started,
            end,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            product_purchased,
            shelf_location,
            shelves: self.record.shelves,
        }
    }
}
