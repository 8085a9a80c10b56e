use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Which legacy lookup a mapping file feeds, selecting its cleanup rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingDimension {
    Country,
    UsState,
    UsPort,
    ValidPort,
    Visa,
    TravelMode,
}

impl fmt::Display for MappingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MappingDimension::Country => "country",
            MappingDimension::UsState => "us_state",
            MappingDimension::UsPort => "us_port",
            MappingDimension::ValidPort => "valid_port",
            MappingDimension::Visa => "visa",
            MappingDimension::TravelMode => "travel_mode",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupRow {
    pub code: String,
    pub label: String,
}

impl LookupRow {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// A line of a mapping file that could not be turned into a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    pub file: PathBuf,
    pub line: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    pub dimension: MappingDimension,
    pub rows: Vec<LookupRow>,
    pub rejected: Vec<ParseIssue>,
    pub duplicate_codes: usize,
}

impl LookupTable {
    pub fn new(dimension: MappingDimension) -> Self {
        Self {
            dimension,
            rows: Vec::new(),
            rejected: Vec::new(),
            duplicate_codes: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn codes(&self) -> HashSet<&str> {
        self.rows.iter().map(|r| r.code.as_str()).collect()
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.code == code)
            .map(|r| r.label.as_str())
    }
}

/// A port of entry with its "City, ST" label split apart
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortLookupRow {
    pub port_code: String,
    pub city: String,
    pub state_code: Option<String>,
}

impl PortLookupRow {
    /// Split a `City, ST` label on the first `", "`; the city is lower-cased
    pub fn from_lookup(row: &LookupRow) -> Self {
        let (city, state_code) = match row.label.split_once(", ") {
            Some((city, state)) => {
                let state = state.trim();
                let state = if state.is_empty() {
                    None
                } else {
                    Some(state.to_string())
                };
                (city, state)
            }
            None => (row.label.as_str(), None),
        };

        Self {
            port_code: row.code.clone(),
            city: city.trim().to_lowercase(),
            state_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_lookup_split() {
        let row = LookupRow::new("NYC", "NEW YORK, NY");
        let port = PortLookupRow::from_lookup(&row);
        assert_eq!(port.port_code, "NYC");
        assert_eq!(port.city, "new york");
        assert_eq!(port.state_code.as_deref(), Some("NY"));
    }

    #[test]
    fn test_port_lookup_without_comma() {
        let row = LookupRow::new("XXX", "NOT REPORTED/UNKNOWN");
        let port = PortLookupRow::from_lookup(&row);
        assert_eq!(port.city, "not reported/unknown");
        assert_eq!(port.state_code, None);
    }

    #[test]
    fn test_port_lookup_splits_on_first_comma_only() {
        let row = LookupRow::new("DNS", "DUNSEITH, ND, USA");
        let port = PortLookupRow::from_lookup(&row);
        assert_eq!(port.city, "dunseith");
        assert_eq!(port.state_code.as_deref(), Some("ND, USA"));
    }

    #[test]
    fn test_lookup_table_accessors() {
        let mut table = LookupTable::new(MappingDimension::Visa);
        table.rows.push(LookupRow::new("1", "Business"));
        table.rows.push(LookupRow::new("2", "Pleasure"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.label("2"), Some("Pleasure"));
        assert!(table.codes().contains("1"));
        assert_eq!(MappingDimension::TravelMode.to_string(), "travel_mode");
    }
}
