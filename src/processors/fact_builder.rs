use crate::error::{ProcessingError, Result};
use crate::models::temperature::TemperatureJoinKey;
use crate::models::{CityTemperatureRecord, ImmigrationRecord, PortDimensionRow, VisitFact};
use crate::utils::dates::{sas_to_date, stay_days};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Row accounting of one fact build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactBuildReport {
    pub input_rows: usize,
    pub missing_departure: usize,
    pub unknown_port: usize,
    pub temperature_matches: usize,
    pub output_rows: usize,
}

/// An immigration row with its SAS offsets decoded
#[derive(Debug, Clone)]
struct DecodedVisit<'a> {
    record: &'a ImmigrationRecord,
    arrival: Option<NaiveDate>,
    departure: Option<NaiveDate>,
    stay: Option<i64>,
}

impl DecodedVisit<'_> {
    fn temperature_key(&self, port: &PortDimensionRow) -> Option<TemperatureJoinKey> {
        let arrival = self.arrival?;
        Some((
            i64::from(arrival.year()),
            i64::from(arrival.month()),
            i64::from(arrival.day()),
            port.state.clone(),
            port.city.clone(),
        ))
    }

    fn to_fact(&self, port_code: &str, avg_temperature: Option<f64>) -> VisitFact {
        VisitFact {
            cicid: self.record.cicid,
            arrival_date: self.arrival,
            departure_date: self.departure,
            stay_days: self.stay,
            port_code: port_code.to_string(),
            country_code: self.record.i94cit,
            mode_code: self.record.i94mode,
            visa_code: self.record.i94visa,
            age: self.record.i94bir,
            avg_temperature,
        }
    }
}

/// Builds the visits fact from staged immigration, ports and temperatures
pub struct FactBuilder {
    max_workers: usize,
}

impl FactBuilder {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn build(
        &self,
        immigration: &[ImmigrationRecord],
        ports: &[PortDimensionRow],
        temperatures: &[CityTemperatureRecord],
    ) -> Result<(Vec<VisitFact>, FactBuildReport)> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let ports_by_code: HashMap<&str, &PortDimensionRow> =
            ports.iter().map(|p| (p.port_code.as_str(), p)).collect();

        let mut temperatures_by_key: HashMap<TemperatureJoinKey, Vec<Option<f64>>> =
            HashMap::new();
        for temperature in temperatures {
            if let Some(key) = temperature.join_key() {
                temperatures_by_key
                    .entry(key)
                    .or_default()
                    .push(temperature.avg_temperature);
            }
        }

        let mut report = FactBuildReport {
            input_rows: immigration.len(),
            ..FactBuildReport::default()
        };

        let decoded: Vec<DecodedVisit> = pool.install(|| {
            immigration
                .par_iter()
                .filter(|r| r.has_departure())
                .map(|record| DecodedVisit {
                    record,
                    arrival: sas_to_date(record.arrdate),
                    departure: sas_to_date(record.depdate),
                    stay: stay_days(record.arrdate, record.depdate),
                })
                .collect()
        });
        report.missing_departure = immigration.len() - decoded.len();

        // None marks a visit whose port is not in the port dimension
        let joined: Vec<Option<(Vec<VisitFact>, bool)>> = pool.install(|| {
            decoded
                .par_iter()
                .map(|visit| {
                    let port = visit
                        .record
                        .i94port
                        .as_deref()
                        .and_then(|code| ports_by_code.get(code))?;

                    let matches = visit
                        .temperature_key(port)
                        .and_then(|key| temperatures_by_key.get(&key));

                    Some(match matches {
                        Some(values) => (
                            values
                                .iter()
                                .map(|avg| visit.to_fact(&port.port_code, *avg))
                                .collect(),
                            true,
                        ),
                        None => (vec![visit.to_fact(&port.port_code, None)], false),
                    })
                })
                .collect()
        });

        let mut facts = Vec::with_capacity(joined.len());
        for outcome in joined {
            match outcome {
                Some((rows, matched)) => {
                    if matched {
                        report.temperature_matches += 1;
                    }
                    facts.extend(rows);
                }
                None => report.unknown_port += 1,
            }
        }
        report.output_rows = facts.len();

        info!(
            input = report.input_rows,
            missing_departure = report.missing_departure,
            unknown_port = report.unknown_port,
            temperature_matches = report.temperature_matches,
            output = report.output_rows,
            "built visits fact"
        );

        Ok((facts, report))
    }
}

impl Default for FactBuilder {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
