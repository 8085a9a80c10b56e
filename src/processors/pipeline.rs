//! Stage scheduling for one warehouse build.
//!
//! Stages form a DAG over the tables they own. A stage only starts after every
//! dependency has persisted its table, and reads its inputs back from the
//! table store rather than from memory. Stage bodies are blocking and run on
//! the Tokio blocking pool, one at a time.

use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{
    CityTemperatureRecord, DemographicsRecord, ImmigrationRecord, LookupTable, MappingDimension,
    ParseIssue, PortDimensionRow, VisitFact,
};
use crate::processors::dimensions::{self, DimensionReport};
use crate::processors::fact_builder::{FactBuildReport, FactBuilder};
use crate::processors::quality_gate::{self, QualityCheck};
use crate::processors::staging::{self, StagingReport};
use crate::readers::{MappingReader, ParsePolicy, SourceReader};
use crate::utils::constants::*;
use crate::utils::progress::ProgressReporter;
use crate::writers::{TableInfo, TableStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    StageImmigration,
    StageDemographics,
    StageTemperatures,
    DimPorts,
    DimCountries,
    DimVisa,
    DimTravelMode,
    DimDemographics,
    FactVisits,
    DimDate,
    QualityGate,
}

impl StageId {
    pub const ALL: [StageId; 11] = [
        StageId::StageImmigration,
        StageId::StageDemographics,
        StageId::StageTemperatures,
        StageId::DimPorts,
        StageId::DimCountries,
        StageId::DimVisa,
        StageId::DimTravelMode,
        StageId::DimDemographics,
        StageId::FactVisits,
        StageId::DimDate,
        StageId::QualityGate,
    ];

    /// Table written by the stage; the quality gate writes none
    pub fn table(&self) -> Option<&'static str> {
        match self {
            StageId::StageImmigration => Some(STAGE_IMMIGRATION_TABLE),
            StageId::StageDemographics => Some(STAGE_DEMOGRAPHICS_TABLE),
            StageId::StageTemperatures => Some(STAGE_TEMPERATURES_TABLE),
            StageId::DimPorts => Some(DIM_PORTS_TABLE),
            StageId::DimCountries => Some(DIM_COUNTRIES_TABLE),
            StageId::DimVisa => Some(DIM_VISA_TABLE),
            StageId::DimTravelMode => Some(DIM_TRAVEL_MODE_TABLE),
            StageId::DimDemographics => Some(DIM_DEMOGRAPHICS_TABLE),
            StageId::FactVisits => Some(FACT_VISITS_TABLE),
            StageId::DimDate => Some(DIM_DATE_TABLE),
            StageId::QualityGate => None,
        }
    }

    pub fn dependencies(&self) -> &'static [StageId] {
        match self {
            StageId::DimDemographics => &[StageId::StageDemographics, StageId::DimPorts],
            StageId::FactVisits => &[
                StageId::StageImmigration,
                StageId::StageTemperatures,
                StageId::DimPorts,
            ],
            StageId::DimDate => &[StageId::FactVisits],
            StageId::QualityGate => &[StageId::FactVisits, StageId::DimDate],
            _ => &[],
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table() {
            Some(table) => f.write_str(table),
            None => f.write_str("quality_gate"),
        }
    }
}

/// Kahn's algorithm; ready nodes are taken in `Ord` order so the result is stable
pub fn topological_order<K>(graph: &[(K, Vec<K>)]) -> Result<Vec<K>>
where
    K: Copy + Ord + Hash + fmt::Display,
{
    let mut pending: BTreeMap<K, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<K, Vec<K>> = BTreeMap::new();

    for (node, deps) in graph {
        pending.insert(*node, deps.len());
        for dep in deps {
            dependents.entry(*dep).or_default().push(*node);
        }
    }

    for (node, deps) in graph {
        if let Some(missing) = deps.iter().find(|d| !pending.contains_key(d)) {
            return Err(ProcessingError::Config(format!(
                "Stage {} depends on undeclared stage {}",
                node, missing
            )));
        }
    }

    let mut ready: BTreeSet<K> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);
        for dependent in dependents.get(&node).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() < pending.len() {
        let blocked: Vec<String> = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(node, _)| node.to_string())
            .collect();
        return Err(ProcessingError::StageCycle(blocked.join(", ")));
    }

    Ok(order)
}

/// Mapping file summary kept in the run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupSummary {
    pub dimension: MappingDimension,
    pub rows: usize,
    pub duplicate_codes: usize,
    pub rejected: Vec<ParseIssue>,
}

impl From<&LookupTable> for LookupSummary {
    fn from(table: &LookupTable) -> Self {
        Self {
            dimension: table.dimension,
            rows: table.len(),
            duplicate_codes: table.duplicate_codes,
            rejected: table.rejected.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageDetails {
    Staging {
        staging: StagingReport,
        lookups: Vec<LookupSummary>,
    },
    Dimension {
        dimension: DimensionReport,
        lookups: Vec<LookupSummary>,
    },
    Fact(FactBuildReport),
    Quality {
        checks: Vec<QualityCheck>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: StageId,
    pub table: Option<String>,
    pub rows_written: usize,
    pub elapsed_ms: u128,
    pub details: StageDetails,
}

impl StageReport {
    fn summary(&self) -> String {
        match &self.details {
            StageDetails::Quality { checks } => format!("{} checks passed", checks.len()),
            StageDetails::Fact(report) => format!(
                "{} rows ({} unknown ports dropped)",
                report.output_rows, report.unknown_port
            ),
            _ => format!("{} rows", self.rows_written),
        }
    }
}

/// Summary of a complete run, written as `_run_report.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub input_base: PathBuf,
    pub output_base: PathBuf,
    pub elapsed_ms: u128,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn stage(&self, stage: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn fact_report(&self) -> Option<&FactBuildReport> {
        self.stages.iter().find_map(|s| match &s.details {
            StageDetails::Fact(report) => Some(report),
            _ => None,
        })
    }
}

/// Shared, read-only state handed to each stage body
#[derive(Debug, Clone)]
struct StageContext {
    config: Arc<PipelineConfig>,
    store: Arc<TableStore>,
}

impl StageContext {
    fn mapping(&self, dimension: MappingDimension) -> Result<LookupTable> {
        let table = MappingReader::with_policy(self.config.parse_policy())
            .read_source(self.config.input_base(), &self.config.mapping_source(dimension))?;
        if !table.rejected.is_empty() {
            warn!(
                dimension = %dimension,
                rejected = table.rejected.len(),
                "mapping lines were skipped"
            );
        }
        Ok(table)
    }

    fn input(&self, file: &str) -> PathBuf {
        self.config.input_base().join(file)
    }

    /// Strict parsing also rejects records whose field count differs from the header
    fn source_reader(&self) -> SourceReader {
        SourceReader::with_strict_record_length(self.config.parse_policy() == ParsePolicy::Strict)
    }

    fn run(&self, stage: StageId) -> Result<(usize, StageDetails)> {
        let store = &self.store;

        match stage {
            StageId::StageImmigration => {
                let valid_ports = self.mapping(MappingDimension::ValidPort)?;
                let raw = self.source_reader().read_immigration(&self.input(IMMIGRATION_FILE))?;
                let (rows, report) = staging::stage_immigration(raw, &valid_ports.codes());
                store.write_partitioned(
                    STAGE_IMMIGRATION_TABLE,
                    &rows,
                    STAGE_IMMIGRATION_PARTITION,
                    |r: &ImmigrationRecord| r.arrdate.map(|offset| offset.to_string()),
                )?;
                Ok((
                    rows.len(),
                    StageDetails::Staging {
                        staging: report,
                        lookups: vec![LookupSummary::from(&valid_ports)],
                    },
                ))
            }
            StageId::StageDemographics => {
                let raw = self.source_reader().read_demographics(&self.input(DEMOGRAPHICS_FILE))?;
                let (rows, report) = staging::stage_demographics(raw);
                store.write_table(STAGE_DEMOGRAPHICS_TABLE, &rows)?;
                Ok((
                    rows.len(),
                    StageDetails::Staging {
                        staging: report,
                        lookups: Vec::new(),
                    },
                ))
            }
            StageId::StageTemperatures => {
                let raw = self.source_reader().read_temperatures(&self.input(TEMPERATURES_FILE))?;
                let (rows, report) = staging::stage_temperatures(raw);
                store.write_table(STAGE_TEMPERATURES_TABLE, &rows)?;
                Ok((
                    rows.len(),
                    StageDetails::Staging {
                        staging: report,
                        lookups: Vec::new(),
                    },
                ))
            }
            StageId::DimPorts => {
                let us_port = self.mapping(MappingDimension::UsPort)?;
                let us_state = self.mapping(MappingDimension::UsState)?;
                let (rows, report) = dimensions::build_port_dimension(&us_port, &us_state);
                store.write_table(DIM_PORTS_TABLE, &rows)?;
                Ok((
                    rows.len(),
                    StageDetails::Dimension {
                        dimension: report,
                        lookups: vec![
                            LookupSummary::from(&us_port),
                            LookupSummary::from(&us_state),
                        ],
                    },
                ))
            }
            StageId::DimCountries => {
                let lookup = self.mapping(MappingDimension::Country)?;
                let rows = dimensions::build_country_dimension(&lookup);
                store.write_table(DIM_COUNTRIES_TABLE, &rows)?;
                Ok(lookup_dimension(DIM_COUNTRIES_TABLE, &lookup, rows.len()))
            }
            StageId::DimVisa => {
                let lookup = self.mapping(MappingDimension::Visa)?;
                let rows = dimensions::build_visa_dimension(&lookup);
                store.write_table(DIM_VISA_TABLE, &rows)?;
                Ok(lookup_dimension(DIM_VISA_TABLE, &lookup, rows.len()))
            }
            StageId::DimTravelMode => {
                let lookup = self.mapping(MappingDimension::TravelMode)?;
                let rows = dimensions::build_travel_mode_dimension(&lookup);
                store.write_table(DIM_TRAVEL_MODE_TABLE, &rows)?;
                Ok(lookup_dimension(DIM_TRAVEL_MODE_TABLE, &lookup, rows.len()))
            }
            StageId::DimDemographics => {
                let demographics: Vec<DemographicsRecord> =
                    store.read_table(STAGE_DEMOGRAPHICS_TABLE)?;
                let ports: Vec<PortDimensionRow> = store.read_table(DIM_PORTS_TABLE)?;
                let (rows, report) = dimensions::build_demographics_dimension(&demographics, &ports);
                store.write_table(DIM_DEMOGRAPHICS_TABLE, &rows)?;
                Ok((
                    rows.len(),
                    StageDetails::Dimension {
                        dimension: report,
                        lookups: Vec::new(),
                    },
                ))
            }
            StageId::FactVisits => {
                let immigration: Vec<ImmigrationRecord> =
                    store.read_table(STAGE_IMMIGRATION_TABLE)?;
                let temperatures: Vec<CityTemperatureRecord> =
                    store.read_table(STAGE_TEMPERATURES_TABLE)?;
                let ports: Vec<PortDimensionRow> = store.read_table(DIM_PORTS_TABLE)?;

                let (facts, report) = FactBuilder::new(self.config.max_workers())
                    .build(&immigration, &ports, &temperatures)?;
                store.write_partitioned(
                    FACT_VISITS_TABLE,
                    &facts,
                    FACT_VISITS_PARTITION,
                    VisitFact::partition_value,
                )?;
                Ok((facts.len(), StageDetails::Fact(report)))
            }
            StageId::DimDate => {
                let facts: Vec<VisitFact> = store.read_table(FACT_VISITS_TABLE)?;
                let rows = dimensions::build_date_dimension(&facts);
                store.write_table(DIM_DATE_TABLE, &rows)?;
                Ok((
                    rows.len(),
                    StageDetails::Dimension {
                        dimension: DimensionReport::new(DIM_DATE_TABLE, facts.len(), rows.len()),
                        lookups: Vec::new(),
                    },
                ))
            }
            StageId::QualityGate => {
                let checks = run_quality_checks(store)?;
                Ok((0, StageDetails::Quality { checks }))
            }
        }
    }
}

fn lookup_dimension(table: &str, lookup: &LookupTable, rows: usize) -> (usize, StageDetails) {
    (
        rows,
        StageDetails::Dimension {
            dimension: DimensionReport::new(table, lookup.len(), rows),
            lookups: vec![LookupSummary::from(lookup)],
        },
    )
}

/// The fact table checks: at least one row and a unique `cicid`
pub fn run_quality_checks(store: &TableStore) -> Result<Vec<QualityCheck>> {
    Ok(vec![
        quality_gate::check_count(store, FACT_VISITS_TABLE, "fact i94 visits")?,
        quality_gate::check_unique_key(store, FACT_VISITS_TABLE, FACT_VISITS_KEY, "fact i94 visits")?,
    ])
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    store: Arc<TableStore>,
    quiet: bool,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let store = TableStore::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            quiet: false,
        })
    }

    /// Suppress the terminal progress bar
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Stages in dependency order
    pub fn execution_order() -> Result<Vec<StageId>> {
        let graph: Vec<(StageId, Vec<StageId>)> = StageId::ALL
            .iter()
            .map(|stage| (*stage, stage.dependencies().to_vec()))
            .collect();
        topological_order(&graph)
    }

    /// Run every stage, then write the run report at the output root
    pub async fn run(&self) -> Result<PipelineReport> {
        let report = self.execute().await?;
        let path = self.store.write_json(RUN_REPORT_FILE, &report)?;
        info!(report = %path.display(), "wrote run report");
        Ok(report)
    }

    /// Run every stage without writing the run report
    pub async fn execute(&self) -> Result<PipelineReport> {
        let order = Self::execution_order()?;
        let started_at = Utc::now();
        let start = Instant::now();
        let progress = ProgressReporter::new(order.len() as u64, "Building warehouse", self.quiet);

        info!(
            input = %self.config.input_base().display(),
            output = %self.store.root().display(),
            stages = order.len(),
            "pipeline started"
        );

        let mut stages = Vec::with_capacity(order.len());
        for stage in order {
            progress.stage_started(&stage.to_string());
            info!(stage = %stage, "stage started");

            let context = StageContext {
                config: Arc::clone(&self.config),
                store: Arc::clone(&self.store),
            };
            let stage_start = Instant::now();
            let (rows_written, details) =
                tokio::task::spawn_blocking(move || context.run(stage)).await??;

            let report = StageReport {
                stage,
                table: stage.table().map(str::to_string),
                rows_written,
                elapsed_ms: stage_start.elapsed().as_millis(),
                details,
            };

            info!(
                stage = %stage,
                rows = rows_written,
                elapsed_ms = report.elapsed_ms as u64,
                "stage finished"
            );
            progress.stage_finished(&stage.to_string(), &report.summary());
            stages.push(report);
        }

        progress.finish_with_message("Warehouse complete");

        Ok(PipelineReport {
            started_at,
            input_base: self.config.input_base().to_path_buf(),
            output_base: self.store.root().to_path_buf(),
            elapsed_ms: start.elapsed().as_millis(),
            stages,
        })
    }

    /// Quality gate against an existing output
    pub async fn check(&self) -> Result<Vec<QualityCheck>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || run_quality_checks(&store)).await?
    }

    /// Metadata of every table present under the output root
    pub fn table_infos(&self) -> Result<Vec<TableInfo>> {
        StageId::ALL
            .iter()
            .filter_map(|stage| stage.table())
            .filter(|table| self.store.table_exists(table))
            .map(|table| self.store.table_info(table))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_execution_order_respects_dependencies() {
        let order = Pipeline::execution_order().unwrap();
        assert_eq!(order.len(), StageId::ALL.len());

        let position = |stage: StageId| order.iter().position(|s| *s == stage).unwrap();
        for stage in StageId::ALL {
            for dep in stage.dependencies() {
                assert!(position(*dep) < position(stage), "{} before {}", dep, stage);
            }
        }
        assert!(position(StageId::FactVisits) < position(StageId::DimDate));
        assert_eq!(order.last(), Some(&StageId::QualityGate));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let graph = vec![
            (StageId::DimPorts, vec![]),
            (StageId::FactVisits, vec![StageId::DimPorts, StageId::DimDate]),
            (StageId::DimDate, vec![StageId::FactVisits]),
        ];

        match topological_order(&graph) {
            Err(ProcessingError::StageCycle(stages)) => {
                assert_eq!(stages, "fact_i94visits, dim_date");
            }
            other => panic!("expected StageCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_dependency_is_rejected() {
        let graph = vec![(StageId::DimDate, vec![StageId::FactVisits])];
        assert!(matches!(topological_order(&graph), Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_stage_tables() {
        assert_eq!(StageId::FactVisits.table(), Some("fact_i94visits"));
        assert_eq!(StageId::QualityGate.table(), None);
        assert_eq!(StageId::QualityGate.to_string(), "quality_gate");
    }
}
