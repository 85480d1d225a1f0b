//! Loaders for the price list and the trial schedule.
//!
//! Both inputs are flat comma-separated text with a header row. Loading
//! never fails: rows that do not parse are skipped and counted, and an
//! empty or missing source produces an empty result plus a warning.

use std::path::Path;

use cartlab_core::{PriceTable, ProductRecord, TrialKey, TrialRecord};
use tracing::{debug, info, warn};

use crate::error::DataError;

/// Result of loading one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport<T> {
    pub data: T,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Column layouts the trials file has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialSchema {
    /// `participant,trial,s1,s2,s3,s4`
    Legacy,
    /// `participant,block,trial,condition,s1,s2,s3,s4`
    Blocked,
}

impl TrialSchema {
    pub fn from_width(columns: usize) -> Result<Self, DataError> {
        match columns {
            6 => Ok(TrialSchema::Legacy),
            8 => Ok(TrialSchema::Blocked),
            other => Err(DataError::UnknownSchema(other)),
        }
    }

    #[must_use]
    pub fn width(self) -> usize {
        match self {
            TrialSchema::Legacy => 6,
            TrialSchema::Blocked => 8,
        }
    }

    fn parse_row(self, cols: &[&str]) -> Option<TrialRecord> {
        if cols.len() != self.width() {
            return None;
        }
        let mut ints = cols.iter().map(|c| c.parse::<i32>().ok());
        let mut next = || ints.next().flatten();
        let record = match self {
            TrialSchema::Legacy => TrialRecord {
                participant_id: next()?,
                block: 1,
                trial_number: next()?,
                condition: 0,
                shelves: [next()?, next()?, next()?, next()?],
            },
            TrialSchema::Blocked => TrialRecord {
                participant_id: next()?,
                block: next()?,
                trial_number: next()?,
                condition: next()?,
                shelves: [next()?, next()?, next()?, next()?],
            },
        };
        Some(record)
    }
}

/// Reads a data file, treating a missing or unreadable file as empty.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(source) => {
            let err = DataError::Read {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "data source unavailable, continuing with no rows");
            String::new()
        }
    }
}

fn rows(text: &str) -> impl Iterator<Item = Vec<&str>> {
    text.split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(str::trim).collect())
}

fn parse_product(cols: &[&str]) -> Option<ProductRecord> {
    if cols.len() < 3 {
        return None;
    }
    Some(ProductRecord {
        product_id: cols[0].parse().ok()?,
        price: cols[2].parse::<f32>().ok().filter(|p| p.is_finite())?,
    })
}

/// Parses the price list: column 0 is the product ID, column 2 the price.
pub fn load_products(text: &str) -> LoadReport<PriceTable> {
    let mut report = LoadReport::<PriceTable>::default();
    if text.trim().is_empty() {
        warn!("products source is empty");
        return report;
    }

    for cols in rows(text).skip(1) {
        report.rows_read += 1;
        match parse_product(&cols) {
            Some(record) => {
                if !report.data.insert(record) {
                    debug!(product_id = record.product_id, "duplicate product row ignored");
                }
            }
            None => report.rows_skipped += 1,
        }
    }

    info!(
        products = report.data.len(),
        skipped = report.rows_skipped,
        "product database loaded"
    );
    report
}

/// Parses the trial schedule. The header's column count selects the schema.
pub fn load_trials(text: &str) -> LoadReport<Vec<TrialRecord>> {
    let mut report = LoadReport::<Vec<TrialRecord>>::default();
    let mut lines = rows(text);
    let Some(header) = lines.next() else {
        warn!("trials source is empty");
        return report;
    };
    let schema = match TrialSchema::from_width(header.len()) {
        Ok(schema) => schema,
        Err(err) => {
            warn!(error = %err, "trials not loaded");
            return report;
        }
    };

    for cols in lines {
        report.rows_read += 1;
        match schema.parse_row(&cols) {
            Some(record) => report.data.push(record),
            None => report.rows_skipped += 1,
        }
    }

    info!(
        ?schema,
        trials = report.data.len(),
        skipped = report.rows_skipped,
        "trials loaded"
    );
    report
}

/// The ordered trial schedule with lookup by participant and trial number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    trials: Vec<TrialRecord>,
}

impl Schedule {
    #[must_use]
    pub fn new(trials: Vec<TrialRecord>) -> Self {
        Self { trials }
    }

    /// The first scheduled record for `key`.
    #[must_use]
    pub fn find(&self, key: TrialKey) -> Option<&TrialRecord> {
        self.trials.iter().find(|t| t.key() == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter()
    }

    /// Number of scheduled trials for one participant.
    #[must_use]
    pub fn trials_for(&self, participant_id: i32) -> usize {
        self.trials
            .iter()
            .filter(|t| t.participant_id == participant_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_skip_header_and_bad_rows() {
        let report = load_products("id,name,price\r\n1,Soda,1.50\r\n\r\nx,Bad,2\r\n3,Short\r\n2,Chips,3.00\r\n");
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_skipped, 2);
        assert_eq!(report.data.price(1), Some(1.5));
        assert_eq!(report.data.price(2), Some(3.0));
        assert_eq!(report.data.len(), 2);
    }

    #[test]
    fn non_finite_prices_are_skipped() {
        let report = load_products("id,name,price\n1,A,NaN\n2,B,inf\n3,C,2.5\n4,D,-infinity\n");
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_skipped, 3);
        assert_eq!(report.data.len(), 1);
        assert_eq!(report.data.price(1), None);
        assert_eq!(report.data.price(3), Some(2.5));
    }

    #[test]
    fn products_keep_first_duplicate() {
        let report = load_products("id,name,price\n7,A,1.00\n7,B,2.00\n");
        assert_eq!(report.data.price(7), Some(1.0));
        assert_eq!(report.rows_skipped, 0);
    }

    #[test]
    fn empty_sources_yield_empty_tables() {
        assert!(load_products("").data.is_empty());
        assert!(load_trials("   \n").data.is_empty());
    }

    #[test]
    fn legacy_schema_defaults_block_and_condition() {
        let report = load_trials("p,t,s1,s2,s3,s4\n1,1,1,2,0,0\n1,2,3,4,5,6\n");
        assert_eq!(report.data.len(), 2);
        let first = &report.data[0];
        assert_eq!(first.block, 1);
        assert_eq!(first.condition, 0);
        assert_eq!(first.shelves, [1, 2, 0, 0]);
    }

    #[test]
    fn blocked_schema_reads_every_column() {
        let report = load_trials(
            "participant,block,trial,condition,s1,s2,s3,s4\n\
             2,1,1,3,10,11,12,13\n\
             2,1,2,3,10,11,12\n\
             2,2,3,x,10,11,12,13\n",
        );
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_skipped, 2);
        assert_eq!(
            report.data,
            vec![TrialRecord {
                participant_id: 2,
                block: 1,
                trial_number: 1,
                condition: 3,
                shelves: [10, 11, 12, 13],
            }]
        );
    }

    #[test]
    fn unknown_header_width_loads_nothing() {
        let report = load_trials("a,b,c\n1,2,3\n");
        assert!(report.data.is_empty());
        assert_eq!(report.rows_read, 0);
    }

    #[test]
    fn schedule_lookup_by_key() {
        let schedule = Schedule::new(load_trials("p,t,s1,s2,s3,s4\n1,1,1,2,0,0\n2,1,5,6,7,8\n").data);
        let key = TrialKey { participant_id: 2, trial_number: 1 };
        assert_eq!(schedule.find(key).map(|t| t.shelves[0]), Some(5));
        assert!(schedule.find(TrialKey { participant_id: 2, trial_number: 2 }).is_none());
        assert_eq!(schedule.trials_for(1), 1);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_source(&dir.path().join("nope.csv")), "");
    }
}
