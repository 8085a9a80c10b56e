use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::dates::{iso_week, weekday_name};
use chrono::Datelike;

/// Port of entry located in a recognized US state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDimensionRow {
    pub port_code: String,
    pub city: String,
    pub state_code: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryRow {
    pub country_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisaRow {
    pub visa_code: String,
    pub visa: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelModeRow {
    pub mode_code: String,
    pub mode: String,
}

/// City demographics resolved to the port of entry serving the city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsDimensionRow {
    pub port_code: String,
    pub median_age: Option<f64>,
    pub male_population: Option<i64>,
    pub female_population: Option<i64>,
    pub total_population: Option<i64>,
    pub number_of_veterans: Option<i64>,
    pub foreign_born: Option<i64>,
    pub average_household_size: Option<f64>,
    pub state_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateDimensionRow {
    pub arrival_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub week: u32,
    pub weekday: String,
}

impl DateDimensionRow {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            arrival_date: date,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            week: iso_week(date),
            weekday: weekday_name(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_dimension_row() {
        let row = DateDimensionRow::from_date(NaiveDate::from_ymd_opt(2016, 4, 30).unwrap());
        assert_eq!(row.year, 2016);
        assert_eq!(row.month, 4);
        assert_eq!(row.day, 30);
        assert_eq!(row.week, 17);
        assert_eq!(row.weekday, "Sat");
    }
}
