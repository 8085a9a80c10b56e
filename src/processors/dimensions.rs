use crate::models::{
    CountryRow, DateDimensionRow, DemographicsDimensionRow, DemographicsRecord, LookupTable,
    PortDimensionRow, TravelModeRow, VisaRow, VisitFact,
};
use crate::processors::staging::dedup_by_key;
use crate::readers::port_lookup;
use crate::utils::constants::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Rows in and out of a dimension build, with rows lost to joins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionReport {
    pub table: String,
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub output_rows: usize,
}

impl DimensionReport {
    pub fn new(table: &str, input_rows: usize, output_rows: usize) -> Self {
        let report = Self {
            table: table.to_string(),
            input_rows,
            dropped_rows: input_rows.saturating_sub(output_rows),
            output_rows,
        };
        info!(
            table,
            input = report.input_rows,
            dropped = report.dropped_rows,
            output = report.output_rows,
            "built dimension"
        );
        report
    }
}

/// Ports whose state code resolves to a recognized US state
pub fn build_port_dimension(
    us_port: &LookupTable,
    us_state: &LookupTable,
) -> (Vec<PortDimensionRow>, DimensionReport) {
    let states: HashMap<&str, &str> = us_state
        .rows
        .iter()
        .map(|r| (r.code.as_str(), r.label.as_str()))
        .collect();

    let ports = port_lookup(us_port);
    let input_rows = ports.len();

    let rows: Vec<PortDimensionRow> = ports
        .into_iter()
        .filter_map(|port| {
            let state_code = port.state_code?;
            let state = states.get(state_code.as_str())?;
            Some(PortDimensionRow {
                port_code: port.port_code,
                city: port.city,
                state: state.to_string(),
                state_code,
            })
        })
        .collect();

    let (rows, _) = dedup_by_key(rows, |r| r.port_code.clone());
    let report = DimensionReport::new(DIM_PORTS_TABLE, input_rows, rows.len());
    (rows, report)
}

pub fn build_country_dimension(countries: &LookupTable) -> Vec<CountryRow> {
    countries
        .rows
        .iter()
        .map(|r| CountryRow {
            country_code: r.code.clone(),
            country: r.label.clone(),
        })
        .collect()
}

pub fn build_visa_dimension(visas: &LookupTable) -> Vec<VisaRow> {
    visas
        .rows
        .iter()
        .map(|r| VisaRow {
            visa_code: r.code.clone(),
            visa: r.label.clone(),
        })
        .collect()
}

pub fn build_travel_mode_dimension(modes: &LookupTable) -> Vec<TravelModeRow> {
    modes
        .rows
        .iter()
        .map(|r| TravelModeRow {
            mode_code: r.code.clone(),
            mode: r.label.clone(),
        })
        .collect()
}

/// Attach each staged city to the port serving it, joined on (state, city).
///
/// A port keeps the first demographics row that resolves to it.
pub fn build_demographics_dimension(
    demographics: &[DemographicsRecord],
    ports: &[PortDimensionRow],
) -> (Vec<DemographicsDimensionRow>, DimensionReport) {
    let mut ports_by_location: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
    for port in ports {
        ports_by_location
            .entry((port.state.as_str(), port.city.as_str()))
            .or_default()
            .push(port.port_code.as_str());
    }

    let mut rows = Vec::new();
    for record in demographics {
        let Some(location) = record.location() else {
            continue;
        };
        let Some(port_codes) = ports_by_location.get(&location) else {
            continue;
        };

        for port_code in port_codes {
            rows.push(DemographicsDimensionRow {
                port_code: port_code.to_string(),
                median_age: record.median_age,
                male_population: record.male_population,
                female_population: record.female_population,
                total_population: record.total_population,
                number_of_veterans: record.number_of_veterans,
                foreign_born: record.foreign_born,
                average_household_size: record.average_household_size,
                state_code: record.state_code.clone(),
            });
        }
    }

    let (rows, _) = dedup_by_key(rows, |r| r.port_code.clone());
    let report = DimensionReport::new(DIM_DEMOGRAPHICS_TABLE, demographics.len(), rows.len());
    (rows, report)
}

/// One row per distinct arrival date, in calendar order
pub fn build_date_dimension(facts: &[VisitFact]) -> Vec<DateDimensionRow> {
    facts
        .iter()
        .filter_map(|f| f.arrival_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(DateDimensionRow::from_date)
        .collect()
}
