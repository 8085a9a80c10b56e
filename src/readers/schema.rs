//! Declared column maps for the delimited source extracts.
//!
//! Each dataset lists the header names it expects and the canonical column
//! each one becomes. Headers are resolved once per file; any declared column
//! missing from the header fails the load with `SchemaMismatch`.

use crate::error::{ProcessingError, Result};
use csv::StringRecord;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub target: &'static str,
    /// Validated in the header but not carried into the dataset
    pub dropped: bool,
}

impl ColumnSpec {
    pub const fn keep(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            dropped: false,
        }
    }

    pub const fn dropped(source: &'static str, target: &'static str) -> Self {
        Self {
            source,
            target,
            dropped: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetSchema {
    pub name: &'static str,
    pub delimiter: u8,
    pub columns: &'static [ColumnSpec],
}

pub const IMMIGRATION_SCHEMA: DatasetSchema = DatasetSchema {
    name: "i94_immigration",
    delimiter: crate::utils::constants::IMMIGRATION_DELIMITER,
    columns: &[
        ColumnSpec::keep("cicid", "cicid"),
        ColumnSpec::keep("i94yr", "i94yr"),
        ColumnSpec::keep("i94mon", "i94mon"),
        ColumnSpec::keep("i94cit", "i94cit"),
        ColumnSpec::keep("i94res", "i94res"),
        ColumnSpec::keep("i94port", "i94port"),
        ColumnSpec::keep("arrdate", "arrdate"),
        ColumnSpec::keep("i94mode", "i94mode"),
        ColumnSpec::keep("i94addr", "i94addr"),
        ColumnSpec::keep("depdate", "depdate"),
        ColumnSpec::keep("i94bir", "i94bir"),
        ColumnSpec::keep("i94visa", "i94visa"),
        ColumnSpec::keep("matflag", "matflag"),
        ColumnSpec::keep("gender", "gender"),
        ColumnSpec::keep("airline", "airline"),
        ColumnSpec::keep("visatype", "visatype"),
    ],
};

pub const DEMOGRAPHICS_SCHEMA: DatasetSchema = DatasetSchema {
    name: "us_cities_demographics",
    delimiter: crate::utils::constants::DEMOGRAPHICS_DELIMITER,
    columns: &[
        ColumnSpec::keep("City", "city"),
        ColumnSpec::keep("State", "state"),
        ColumnSpec::keep("Median Age", "median_age"),
        ColumnSpec::keep("Male Population", "male_population"),
        ColumnSpec::keep("Female Population", "female_population"),
        ColumnSpec::keep("Total Population", "total_population"),
        ColumnSpec::keep("Number of Veterans", "number_of_veterans"),
        ColumnSpec::keep("Foreign-born", "foreign_born"),
        ColumnSpec::keep("Average Household Size", "average_household_size"),
        ColumnSpec::keep("State Code", "state_code"),
        ColumnSpec::dropped("Race", "race"),
        ColumnSpec::dropped("Count", "count"),
    ],
};

pub const TEMPERATURES_SCHEMA: DatasetSchema = DatasetSchema {
    name: "city_temperature",
    delimiter: crate::utils::constants::TEMPERATURES_DELIMITER,
    columns: &[
        ColumnSpec::keep("Region", "region"),
        ColumnSpec::keep("Country", "country"),
        ColumnSpec::keep("State", "state"),
        ColumnSpec::keep("City", "city"),
        ColumnSpec::keep("Month", "month"),
        ColumnSpec::keep("Day", "day"),
        ColumnSpec::keep("Year", "year"),
        ColumnSpec::keep("AvgTemperature", "avg_temperature"),
    ],
};

/// Positions of the kept canonical columns within one file's records
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    dataset: &'static str,
    positions: HashMap<&'static str, usize>,
}

impl DatasetSchema {
    /// Match a header row against the declared columns
    pub fn resolve(&self, headers: &StringRecord) -> Result<ColumnIndex> {
        let header_positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim(), i))
            .collect();

        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !header_positions.contains_key(c.source))
            .map(|c| c.source.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ProcessingError::SchemaMismatch {
                dataset: self.name.to_string(),
                missing,
            });
        }

        let undeclared: Vec<&str> = header_positions
            .keys()
            .filter(|h| !h.is_empty() && !self.columns.iter().any(|c| c.source == **h))
            .copied()
            .collect();
        if !undeclared.is_empty() {
            debug!(dataset = self.name, columns = ?undeclared, "ignoring undeclared columns");
        }

        let positions = self
            .columns
            .iter()
            .filter(|c| !c.dropped)
            .map(|c| (c.target, header_positions[c.source]))
            .collect();

        Ok(ColumnIndex {
            dataset: self.name,
            positions,
        })
    }

    /// Canonical names of the columns carried into the dataset
    pub fn kept_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !c.dropped)
            .map(|c| c.target)
            .collect()
    }
}

impl ColumnIndex {
    /// Raw cell of a canonical column; short records yield an empty cell
    pub fn get<'r>(&self, record: &'r StringRecord, target: &str) -> Result<&'r str> {
        let position = self.positions.get(target).ok_or_else(|| {
            ProcessingError::InvalidFormat(format!(
                "Column '{}' is not declared for {}",
                target, self.dataset
            ))
        })?;
        Ok(record.get(*position).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_renames_demographics_headers() {
        let headers = StringRecord::from(vec![
            "City",
            "State",
            "Median Age",
            "Male Population",
            "Female Population",
            "Total Population",
            "Number of Veterans",
            "Foreign-born",
            "Average Household Size",
            "State Code",
            "Race",
            "Count",
        ]);
        let index = DEMOGRAPHICS_SCHEMA.resolve(&headers).unwrap();
        let record = StringRecord::from(vec![
            "Boston", "Massachusetts", "31.9", "1", "2", "3", "4", "5", "2.3", "MA", "Asian", "9",
        ]);

        assert_eq!(index.get(&record, "foreign_born").unwrap(), "5");
        assert_eq!(index.get(&record, "state_code").unwrap(), "MA");
        assert!(index.get(&record, "race").is_err());
        assert!(!DEMOGRAPHICS_SCHEMA.kept_columns().contains(&"race"));
        assert!(!DEMOGRAPHICS_SCHEMA.kept_columns().contains(&"count"));
    }

    #[test]
    fn test_resolve_reports_missing_columns() {
        let headers = StringRecord::from(vec!["Region", "Country", "City", "Month", "Day", "Year"]);

        match TEMPERATURES_SCHEMA.resolve(&headers) {
            Err(ProcessingError::SchemaMismatch { dataset, missing }) => {
                assert_eq!(dataset, "city_temperature");
                assert_eq!(missing, vec!["State".to_string(), "AvgTemperature".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_ignores_extra_columns_and_bom() {
        let mut names: Vec<&str> = IMMIGRATION_SCHEMA.columns.iter().map(|c| c.source).collect();
        names[0] = "\u{feff}cicid";
        names.insert(0, "");
        names.push("dtadfile");

        let index = IMMIGRATION_SCHEMA.resolve(&StringRecord::from(names)).unwrap();
        let mut cells = vec![""; 18];
        cells[1] = "42.0";
        assert_eq!(index.get(&StringRecord::from(cells), "cicid").unwrap(), "42.0");
    }
}
