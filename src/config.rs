use crate::error::{ProcessingError, Result};
use crate::models::MappingDimension;
use crate::readers::{MappingSource, ParsePolicy};
use crate::utils::constants::COMPRESSION_SNAPPY;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

/// Storage credentials, never printed
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

/// Immutable run configuration handed to the table store and the pipeline
#[derive(Debug, Clone, Validate)]
pub struct PipelineConfig {
    credentials: Credentials,

    #[validate(custom(function = "validate_base_path"))]
    input_base: PathBuf,

    #[validate(custom(function = "validate_base_path"))]
    output_base: PathBuf,

    #[validate(length(min = 1))]
    compression: String,

    #[validate(range(min = 1, max = 1024))]
    max_workers: usize,

    parse_policy: ParsePolicy,

    /// File names replacing the default mapping file of a dimension
    mapping_files: HashMap<MappingDimension, String>,
}

fn validate_base_path(path: &PathBuf) -> std::result::Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::new("empty_path"));
    }
    Ok(())
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load `[AWS]`, `[DATA]`, `[PIPELINE]` and `[MAPPINGS]` sections from a config file
    /// (INI for `.cfg`/`.ini`, otherwise by extension) and `I94__*` env vars
    pub fn load(path: Option<&Path>) -> Result<PipelineConfigBuilder> {
        let mut sources = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let is_ini = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("cfg") | Some("ini")
            );
            sources = if is_ini {
                sources.add_source(File::from(path).format(FileFormat::Ini))
            } else {
                sources.add_source(File::from(path))
            };
        }

        let raw: RawConfig = sources
            .add_source(Environment::with_prefix("I94").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(raw.into_builder())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn input_base(&self) -> &Path {
        &self.input_base
    }

    pub fn output_base(&self) -> &Path {
        &self.output_base
    }

    pub fn compression(&self) -> &str {
        &self.compression
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn parse_policy(&self) -> ParsePolicy {
        self.parse_policy
    }

    /// The mapping file for `dimension`, with any configured file name applied
    pub fn mapping_source(&self, dimension: MappingDimension) -> MappingSource {
        let mut source = MappingSource::for_dimension(dimension);
        if let Some(file_name) = self.mapping_files.get(&dimension) {
            source.file_name = file_name.clone();
        }
        source
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    credentials: Credentials,
    input_base: Option<PathBuf>,
    output_base: Option<PathBuf>,
    compression: Option<String>,
    max_workers: Option<usize>,
    parse_policy: Option<ParsePolicy>,
    mapping_files: HashMap<MappingDimension, String>,
}

impl PipelineConfigBuilder {
    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.access_key = Some(key.into());
        self
    }

    pub fn secret_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.secret_key = Some(key.into());
        self
    }

    pub fn input_base(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_base = Some(path.into());
        self
    }

    /// Input base used only when nothing else set one
    pub fn default_input_base(mut self, path: impl Into<PathBuf>) -> Self {
        if self.input_base.is_none() {
            self.input_base = Some(path.into());
        }
        self
    }

    pub fn output_base(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_base = Some(path.into());
        self
    }

    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub fn parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = Some(policy);
        self
    }

    pub fn mapping_file(mut self, dimension: MappingDimension, file_name: impl Into<String>) -> Self {
        self.mapping_files.insert(dimension, file_name.into());
        self
    }

    pub fn build(self) -> Result<PipelineConfig> {
        let input_base = self
            .input_base
            .ok_or_else(|| ProcessingError::Config("input base path is not set".to_string()))?;
        let output_base = self
            .output_base
            .ok_or_else(|| ProcessingError::Config("output base path is not set".to_string()))?;

        let credentials = &self.credentials;
        if !credentials.is_complete()
            && (credentials.access_key.is_some() || credentials.secret_key.is_some())
        {
            return Err(ProcessingError::Config(
                "AWS credentials need both an access key and a secret key".to_string(),
            ));
        }

        let config = PipelineConfig {
            credentials: self.credentials,
            input_base,
            output_base,
            compression: self
                .compression
                .unwrap_or_else(|| COMPRESSION_SNAPPY.to_string()),
            max_workers: self.max_workers.unwrap_or_else(num_cpus::get),
            parse_policy: self.parse_policy.unwrap_or_default(),
            mapping_files: self.mapping_files,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "AWS")]
    aws: AwsSection,
    #[serde(default, alias = "DATA")]
    data: DataSection,
    #[serde(default, alias = "PIPELINE")]
    pipeline: PipelineSection,
    #[serde(default, alias = "MAPPINGS")]
    mappings: MappingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct AwsSection {
    #[serde(alias = "AWS_ACCESS_KEY_ID", alias = "aws_access_key_id")]
    access_key: Option<String>,
    #[serde(alias = "AWS_SECRET_ACCESS_KEY", alias = "aws_secret_access_key")]
    secret_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DataSection {
    #[serde(alias = "INPUT")]
    input: Option<String>,
    #[serde(alias = "OUTPUT")]
    output: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSection {
    #[serde(alias = "COMPRESSION")]
    compression: Option<String>,
    #[serde(alias = "MAX_WORKERS")]
    max_workers: Option<usize>,
    #[serde(alias = "STRICT_MAPPINGS")]
    strict_mappings: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MappingsSection {
    #[serde(alias = "US_STATE")]
    us_state: Option<String>,
    #[serde(alias = "US_PORT")]
    us_port: Option<String>,
    #[serde(alias = "VALID_PORT")]
    valid_port: Option<String>,
    #[serde(alias = "COUNTRY")]
    country: Option<String>,
    #[serde(alias = "VISA")]
    visa: Option<String>,
    #[serde(alias = "TRAVEL_MODE")]
    travel_mode: Option<String>,
}

impl MappingsSection {
    fn into_overrides(self) -> Vec<(MappingDimension, String)> {
        [
            (MappingDimension::UsState, self.us_state),
            (MappingDimension::UsPort, self.us_port),
            (MappingDimension::ValidPort, self.valid_port),
            (MappingDimension::Country, self.country),
            (MappingDimension::Visa, self.visa),
            (MappingDimension::TravelMode, self.travel_mode),
        ]
        .into_iter()
        .filter_map(|(dimension, file)| file.map(|f| (dimension, f)))
        .collect()
    }
}

impl RawConfig {
    fn into_builder(self) -> PipelineConfigBuilder {
        let mut builder = PipelineConfig::builder();
        if let Some(key) = self.aws.access_key {
            builder = builder.access_key(key);
        }
        if let Some(key) = self.aws.secret_key {
            builder = builder.secret_key(key);
        }
        if let Some(input) = self.data.input {
            builder = builder.input_base(input);
        }
        if let Some(output) = self.data.output {
            builder = builder.output_base(output);
        }
        if let Some(compression) = self.pipeline.compression {
            builder = builder.compression(compression);
        }
        if let Some(workers) = self.pipeline.max_workers {
            builder = builder.max_workers(workers);
        }
        if let Some(strict) = self.pipeline.strict_mappings {
            builder = builder.parse_policy(if strict {
                ParsePolicy::Strict
            } else {
                ParsePolicy::BestEffort
            });
        }
        for (dimension, file_name) in self.mappings.into_overrides() {
            builder = builder.mapping_file(dimension, file_name);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder()
            .input_base("data")
            .output_base("out")
            .build()
            .unwrap();

        assert_eq!(config.input_base(), Path::new("data"));
        assert_eq!(config.output_base(), Path::new("out"));
        assert_eq!(config.compression(), "snappy");
        assert!(config.max_workers() >= 1);
        assert_eq!(config.parse_policy(), ParsePolicy::BestEffort);
        assert!(!config.credentials().is_complete());
    }

    #[test]
    fn test_builder_requires_paths() {
        assert!(PipelineConfig::builder().input_base("data").build().is_err());
        assert!(PipelineConfig::builder()
            .input_base("")
            .output_base("out")
            .build()
            .is_err());
        assert!(PipelineConfig::builder()
            .input_base("data")
            .output_base("out")
            .max_workers(0)
            .build()
            .is_err());
    }

    #[test]
    fn test_default_input_base() {
        let config = PipelineConfig::builder()
            .input_base("data")
            .default_input_base(".")
            .output_base("out")
            .build()
            .unwrap();
        assert_eq!(config.input_base(), Path::new("data"));

        let config = PipelineConfig::builder()
            .default_input_base(".")
            .output_base("out")
            .build()
            .unwrap();
        assert_eq!(config.input_base(), Path::new("."));
    }

    #[test]
    fn test_partial_credentials_are_rejected() {
        let result = PipelineConfig::builder()
            .input_base("data")
            .output_base("out")
            .access_key("AKIA-ONLY")
            .build();

        match result {
            Err(ProcessingError::Config(message)) => assert!(message.contains("secret key")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_credentials_are_redacted() {
        let config = PipelineConfig::builder()
            .input_base("data")
            .output_base("out")
            .access_key("AKIA-SECRET")
            .secret_key("very-secret")
            .build()
            .unwrap();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("AKIA-SECRET"));
        assert!(!printed.contains("very-secret"));
        assert!(config.credentials().is_complete());
    }

    #[test]
    fn test_load_ini_file() -> Result<()> {
        let mut file = Builder::new().suffix(".cfg").tempfile()?;
        writeln!(file, "[AWS]")?;
        writeln!(file, "AWS_ACCESS_KEY_ID=abc")?;
        writeln!(file, "AWS_SECRET_ACCESS_KEY=def")?;
        writeln!(file, "[DATA]")?;
        writeln!(file, "INPUT=/data/in")?;
        writeln!(file, "OUTPUT=/data/out")?;

        let config = PipelineConfig::load(Some(file.path()))?.build()?;
        assert_eq!(config.input_base(), Path::new("/data/in"));
        assert_eq!(config.output_base(), Path::new("/data/out"));
        assert_eq!(config.credentials().access_key.as_deref(), Some("abc"));
        assert_eq!(config.credentials().secret_key.as_deref(), Some("def"));

        Ok(())
    }

    #[test]
    fn test_mapping_file_overrides() -> Result<()> {
        let mut file = Builder::new().suffix(".cfg").tempfile()?;
        writeln!(file, "[DATA]")?;
        writeln!(file, "INPUT=/data/in")?;
        writeln!(file, "OUTPUT=/data/out")?;
        writeln!(file, "[MAPPINGS]")?;
        writeln!(file, "US_PORT=ports_2016.txt")?;

        let config = PipelineConfig::load(Some(file.path()))?.build()?;
        let port = config.mapping_source(MappingDimension::UsPort);
        assert_eq!(port.file_name, "ports_2016.txt");
        assert_eq!(port.separator, "\t=\t");
        assert_eq!(
            config.mapping_source(MappingDimension::Visa).file_name,
            "I94VISA.txt"
        );
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/dl.cfg")));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }
}
