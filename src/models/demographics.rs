use serde::{Deserialize, Serialize};

/// City demographics with the per-race breakdown (`race`, `count`) left out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsRecord {
    pub city: Option<String>,
    pub state: Option<String>,
    pub median_age: Option<f64>,
    pub male_population: Option<i64>,
    pub female_population: Option<i64>,
    pub total_population: Option<i64>,
    pub number_of_veterans: Option<i64>,
    pub foreign_born: Option<i64>,
    pub average_household_size: Option<f64>,
    pub state_code: Option<String>,
}

/// Hashable view over every column, floats compared bitwise
pub type DemographicsRowKey = (
    Option<String>,
    Option<String>,
    Option<u64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<u64>,
    Option<String>,
);

impl DemographicsRecord {
    pub fn new(city: &str, state: &str) -> Self {
        Self {
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            median_age: None,
            male_population: None,
            female_population: None,
            total_population: None,
            number_of_veterans: None,
            foreign_born: None,
            average_household_size: None,
            state_code: None,
        }
    }

    pub fn row_key(&self) -> DemographicsRowKey {
        (
            self.city.clone(),
            self.state.clone(),
            self.median_age.map(f64::to_bits),
            self.male_population,
            self.female_population,
            self.total_population,
            self.number_of_veterans,
            self.foreign_born,
            self.average_household_size.map(f64::to_bits),
            self.state_code.clone(),
        )
    }

    /// The (state, city) pair used to resolve a port of entry
    pub fn location(&self) -> Option<(&str, &str)> {
        Some((self.state.as_deref()?, self.city.as_deref()?))
    }
}
