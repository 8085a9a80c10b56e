use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One immigration visit, keyed by `cicid`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitFact {
    pub cicid: i64,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub stay_days: Option<i64>,
    pub port_code: String,
    pub country_code: Option<i64>,
    pub mode_code: Option<i64>,
    pub visa_code: Option<i64>,
    pub age: Option<i64>,
    pub avg_temperature: Option<f64>,
}

impl VisitFact {
    pub fn partition_value(&self) -> Option<String> {
        self.arrival_date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}
