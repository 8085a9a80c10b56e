use crate::models::{CityTemperatureRecord, DemographicsRecord, ImmigrationRecord};
use crate::utils::constants::{TEMPERATURE_COUNTRY, TEMPERATURE_MONTH, TEMPERATURE_YEAR};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;
use tracing::info;

/// Row counts of one staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagingReport {
    pub dataset: String,
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub filtered_out: usize,
    pub output_rows: usize,
}

impl StagingReport {
    fn new(dataset: &str, input_rows: usize) -> Self {
        Self {
            dataset: dataset.to_string(),
            input_rows,
            ..Self::default()
        }
    }

    fn log(&self) {
        info!(
            dataset = %self.dataset,
            input = self.input_rows,
            duplicates = self.duplicates_removed,
            filtered = self.filtered_out,
            output = self.output_rows,
            "staged dataset"
        );
    }
}

/// Keep the first row of every key, preserving input order
pub fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<T> = rows.into_iter().filter(|row| seen.insert(key(row))).collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Deduplicate, drop rows with no departure, an unlisted port or no match flag
pub fn stage_immigration(
    raw: Vec<ImmigrationRecord>,
    valid_port_codes: &HashSet<&str>,
) -> (Vec<ImmigrationRecord>, StagingReport) {
    let mut report = StagingReport::new("immigration", raw.len());

    let (rows, duplicates) = dedup_by_key(raw, |r| r.clone());
    report.duplicates_removed = duplicates;

    let before = rows.len();
    let rows: Vec<ImmigrationRecord> = rows
        .into_iter()
        .filter(|r| r.has_departure())
        .filter(|r| {
            r.i94port
                .as_deref()
                .is_some_and(|port| valid_port_codes.contains(port))
        })
        .filter(|r| r.is_matched())
        .collect();

    report.filtered_out = before - rows.len();
    report.output_rows = rows.len();
    report.log();

    (rows, report)
}

/// Drop rows without a city or state, lower-case both, then deduplicate
pub fn stage_demographics(raw: Vec<DemographicsRecord>) -> (Vec<DemographicsRecord>, StagingReport) {
    let mut report = StagingReport::new("demographics", raw.len());

    let before = raw.len();
    let rows: Vec<DemographicsRecord> = raw
        .into_iter()
        .filter(|r| r.city.is_some() && r.state.is_some())
        .map(|mut r| {
            r.city = r.city.map(|c| c.to_lowercase());
            r.state = r.state.map(|s| s.to_lowercase());
            r
        })
        .collect();
    report.filtered_out = before - rows.len();

    let (rows, duplicates) = dedup_by_key(rows, DemographicsRecord::row_key);
    report.duplicates_removed = duplicates;
    report.output_rows = rows.len();
    report.log();

    (rows, report)
}

/// Keep the US April 2016 window with lower-cased city and state
pub fn stage_temperatures(
    raw: Vec<CityTemperatureRecord>,
) -> (Vec<CityTemperatureRecord>, StagingReport) {
    let mut report = StagingReport::new("temperatures", raw.len());

    let before = raw.len();
    let rows: Vec<CityTemperatureRecord> = raw
        .into_iter()
        .filter(|r| r.is_in_window(TEMPERATURE_COUNTRY, TEMPERATURE_YEAR, TEMPERATURE_MONTH))
        .map(|mut r| {
            r.city = r.city.map(|c| c.to_lowercase());
            r.state = r.state.map(|s| s.to_lowercase());
            r
        })
        .collect();
    report.filtered_out = before - rows.len();

    let (rows, duplicates) = dedup_by_key(rows, CityTemperatureRecord::row_key);
    report.duplicates_removed = duplicates;
    report.output_rows = rows.len();
    report.log();

    (rows, report)
}
