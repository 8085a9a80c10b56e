use crate::error::{ProcessingError, Result};
use crate::models::{LookupRow, LookupTable, MappingDimension, ParseIssue, PortLookupRow};
use crate::utils::constants::*;
use crate::utils::text::{decode_legacy_text, last_quoted_field, strip_quotes_and_tabs};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What to do with a mapping line that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Record the line on the table, log it and keep going
    #[default]
    BestEffort,
    /// Abort the parse with a `MappingParse` error
    Strict,
}

/// A legacy lookup file and the separator its lines use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSource {
    pub file_name: String,
    pub separator: String,
    pub dimension: MappingDimension,
}

impl MappingSource {
    pub fn new(file_name: &str, separator: &str, dimension: MappingDimension) -> Self {
        Self {
            file_name: file_name.to_string(),
            separator: separator.to_string(),
            dimension,
        }
    }

    pub fn for_dimension(dimension: MappingDimension) -> Self {
        match dimension {
            MappingDimension::UsState => {
                Self::new(US_STATE_MAPPING_FILE, US_STATE_SEPARATOR, dimension)
            }
            MappingDimension::UsPort => {
                Self::new(US_PORT_MAPPING_FILE, US_PORT_SEPARATOR, dimension)
            }
            MappingDimension::ValidPort => {
                Self::new(VALID_PORT_MAPPING_FILE, VALID_PORT_SEPARATOR, dimension)
            }
            MappingDimension::Country => {
                Self::new(COUNTRY_MAPPING_FILE, COUNTRY_SEPARATOR, dimension)
            }
            MappingDimension::Visa => Self::new(VISA_MAPPING_FILE, VISA_SEPARATOR, dimension),
            MappingDimension::TravelMode => {
                Self::new(TRAVEL_MODE_MAPPING_FILE, TRAVEL_MODE_SEPARATOR, dimension)
            }
        }
    }

    pub fn path(&self, input_base: &Path) -> PathBuf {
        input_base.join(MAPPINGS_DIR).join(&self.file_name)
    }
}

pub struct MappingReader {
    policy: ParsePolicy,
}

impl MappingReader {
    pub fn new() -> Self {
        Self {
            policy: ParsePolicy::BestEffort,
        }
    }

    pub fn with_policy(policy: ParsePolicy) -> Self {
        Self { policy }
    }

    /// Read a mapping source from `<input_base>/mappings/`
    pub fn read_source(&self, input_base: &Path, source: &MappingSource) -> Result<LookupTable> {
        self.read_mapping(&source.path(input_base), source)
    }

    /// Read a mapping file into a lookup table
    pub fn read_mapping(&self, path: &Path, source: &MappingSource) -> Result<LookupTable> {
        let bytes = std::fs::read(path)?;
        let text = decode_legacy_text(&bytes);
        let table = self.parse_mapping_text(&text, path, source)?;

        debug!(
            file = %path.display(),
            dimension = %source.dimension,
            rows = table.len(),
            rejected = table.rejected.len(),
            "parsed mapping file"
        );

        Ok(table)
    }

    /// Parse mapping text; `file` is only used for error context
    pub fn parse_mapping_text(
        &self,
        text: &str,
        file: &Path,
        source: &MappingSource,
    ) -> Result<LookupTable> {
        let mut table = LookupTable::new(source.dimension);
        let mut seen_codes = HashSet::new();

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            match self.parse_mapping_line(line, source) {
                Ok(row) => {
                    if seen_codes.insert(row.code.clone()) {
                        table.rows.push(row);
                    } else {
                        table.duplicate_codes += 1;
                    }
                }
                Err(reason) => {
                    if self.policy == ParsePolicy::Strict {
                        return Err(ProcessingError::MappingParse {
                            file: file.to_path_buf(),
                            line: line_number,
                            content: line.to_string(),
                            reason,
                        });
                    }

                    warn!(
                        file = %file.display(),
                        line = line_number,
                        reason = reason.as_str(),
                        "skipping unparseable mapping line"
                    );
                    table.rejected.push(ParseIssue {
                        file: file.to_path_buf(),
                        line: line_number,
                        content: line.to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(table)
    }

    /// Parse a single `'code'<sep>'label'` line
    fn parse_mapping_line(
        &self,
        line: &str,
        source: &MappingSource,
    ) -> std::result::Result<LookupRow, String> {
        let (raw_code, raw_label) = line
            .split_once(source.separator.as_str())
            .ok_or_else(|| format!("separator {:?} not found", source.separator))?;

        let code = strip_quotes_and_tabs(raw_code);
        if code.is_empty() {
            return Err("empty code".to_string());
        }

        let label = strip_quotes_and_tabs(last_quoted_field(raw_label));

        Ok(apply_dimension_rule(source.dimension, code, label))
    }
}

impl Default for MappingReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-dimension label cleanup
fn apply_dimension_rule(dimension: MappingDimension, code: String, label: String) -> LookupRow {
    let label = match dimension {
        MappingDimension::Country => {
            if OTHER_COUNTRY_PREFIXES
                .iter()
                .any(|prefix| label.starts_with(prefix))
            {
                OTHER_COUNTRY_LABEL.to_string()
            } else {
                label
            }
        }
        MappingDimension::UsState => label.to_lowercase(),
        MappingDimension::UsPort
        | MappingDimension::ValidPort
        | MappingDimension::Visa
        | MappingDimension::TravelMode => label,
    };

    LookupRow { code, label }
}

/// Split the `us_port` lookup labels into (city, state_code)
pub fn port_lookup(table: &LookupTable) -> Vec<PortLookupRow> {
    table.rows.iter().map(PortLookupRow::from_lookup).collect()
}
