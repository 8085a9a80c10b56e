use serde::{Deserialize, Serialize};

/// Daily average temperature of one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTemperatureRecord {
    pub region: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    pub year: Option<i64>,
    pub avg_temperature: Option<f64>,
}

pub type TemperatureRowKey = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<u64>,
);

/// Join key shared with the fact table: (year, month, day, state, city)
pub type TemperatureJoinKey = (i64, i64, i64, String, String);

impl CityTemperatureRecord {
    pub fn new(country: &str, state: &str, city: &str, date: (i64, i64, i64), avg: f64) -> Self {
        let (year, month, day) = date;
        Self {
            region: None,
            country: Some(country.to_string()),
            state: Some(state.to_string()),
            city: Some(city.to_string()),
            month: Some(month),
            day: Some(day),
            year: Some(year),
            avg_temperature: Some(avg),
        }
    }

    pub fn row_key(&self) -> TemperatureRowKey {
        (
            self.region.clone(),
            self.country.clone(),
            self.state.clone(),
            self.city.clone(),
            self.month,
            self.day,
            self.year,
            self.avg_temperature.map(f64::to_bits),
        )
    }

    pub fn join_key(&self) -> Option<TemperatureJoinKey> {
        Some((
            self.year?,
            self.month?,
            self.day?,
            self.state.clone()?,
            self.city.clone()?,
        ))
    }

    pub fn is_in_window(&self, country: &str, year: i64, month: i64) -> bool {
        self.country.as_deref() == Some(country)
            && self.year == Some(year)
            && self.month == Some(month)
    }
}
