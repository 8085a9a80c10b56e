/// Table names under the output base
pub const STAGE_IMMIGRATION_TABLE: &str = "stage_i94_immigration";
pub const STAGE_DEMOGRAPHICS_TABLE: &str = "stage_cities_demographics";
pub const STAGE_TEMPERATURES_TABLE: &str = "stage_uscities_temperatures";
pub const DIM_PORTS_TABLE: &str = "dim_us_ports";
pub const DIM_COUNTRIES_TABLE: &str = "dim_countries";
pub const DIM_VISA_TABLE: &str = "dim_us_visa";
pub const DIM_TRAVEL_MODE_TABLE: &str = "dim_travelmode";
pub const DIM_DEMOGRAPHICS_TABLE: &str = "dim_demographics";
pub const FACT_VISITS_TABLE: &str = "fact_i94visits";
pub const DIM_DATE_TABLE: &str = "dim_date";

/// Partition columns
pub const STAGE_IMMIGRATION_PARTITION: &str = "arrdate";
pub const FACT_VISITS_PARTITION: &str = "arrival_date";
pub const NULL_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

/// Primary key of the fact table
pub const FACT_VISITS_KEY: &[&str] = &["cicid"];

/// Input file names, relative to the input base
pub const IMMIGRATION_FILE: &str = "immigration_data.csv";
pub const DEMOGRAPHICS_FILE: &str = "us-cities-demographics.csv";
pub const TEMPERATURES_FILE: &str = "city_temperature.csv";
pub const MAPPINGS_DIR: &str = "mappings";

/// Mapping files and their field separators
pub const US_STATE_MAPPING_FILE: &str = "i94addrl.txt";
pub const US_STATE_SEPARATOR: &str = "=";
pub const US_PORT_MAPPING_FILE: &str = "i94prtl.txt";
pub const US_PORT_SEPARATOR: &str = "\t=\t";
pub const VALID_PORT_MAPPING_FILE: &str = "i94prtl_valid.txt";
pub const VALID_PORT_SEPARATOR: &str = "\t=\t";
pub const COUNTRY_MAPPING_FILE: &str = "i94cntyl.txt";
pub const COUNTRY_SEPARATOR: &str = " =  ";
pub const VISA_MAPPING_FILE: &str = "I94VISA.txt";
pub const VISA_SEPARATOR: &str = " = ";
pub const TRAVEL_MODE_MAPPING_FILE: &str = "i94model.txt";
pub const TRAVEL_MODE_SEPARATOR: &str = " = ";

/// Delimiters of the tabular inputs
pub const IMMIGRATION_DELIMITER: u8 = b',';
pub const DEMOGRAPHICS_DELIMITER: u8 = b';';
pub const TEMPERATURES_DELIMITER: u8 = b',';

/// Country labels folded into `OTHER_COUNTRY_LABEL`
pub const OTHER_COUNTRY_PREFIXES: &[&str] = &["No Country", "INVALID", "Collapsed"];
pub const OTHER_COUNTRY_LABEL: &str = "Other";

/// SAS date offsets count days from this epoch
pub const SAS_EPOCH_YEAR: i32 = 1960;
pub const SAS_EPOCH_MONTH: u32 = 1;
pub const SAS_EPOCH_DAY: u32 = 1;

/// Temperature analysis window matching the April 2016 immigration extract
pub const TEMPERATURE_COUNTRY: &str = "US";
pub const TEMPERATURE_YEAR: i64 = 2016;
pub const TEMPERATURE_MONTH: i64 = 4;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const PART_FILE_NAME: &str = "part-00000.parquet";
pub const RUN_REPORT_FILE: &str = "_run_report.json";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
