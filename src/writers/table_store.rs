use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE, NULL_PARTITION_VALUE, PART_FILE_NAME,
};
use crate::writers::records::TableRecord;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parquet tables under one output root, one subtree per table.
///
/// Every write replaces the whole table subtree. Partitioned tables use
/// hive-style directories (`<column>=<value>/part-00000.parquet`) and keep
/// the partition column inside the files as well.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
    compression: Compression,
    row_group_size: usize,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    /// Store rooted at the configured output base
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let root = config.output_base();
        if root.to_string_lossy().contains("://") {
            return Err(ProcessingError::Config(format!(
                "Only local output paths are supported, got: {}",
                root.display()
            )));
        }

        Self::new(root).with_compression(config.compression())
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = parse_compression(compression)?;
        Ok(self)
    }

    /// Rows per Parquet row group, at least one
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(table)
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.table_path(table).is_dir()
    }

    /// Replace `table` with a single unpartitioned file
    pub fn write_table<T: TableRecord>(&self, table: &str, rows: &[T]) -> Result<TableWriteSummary> {
        let dir = self.reset_table(table)?;
        self.write_file(&dir.join(PART_FILE_NAME), rows)?;

        debug!(table, rows = rows.len(), "wrote table");

        Ok(TableWriteSummary {
            table: table.to_string(),
            rows: rows.len(),
            files: 1,
            partitions: 0,
        })
    }

    /// Replace `table` with one directory per distinct value of `partition`
    pub fn write_partitioned<T, F>(
        &self,
        table: &str,
        rows: &[T],
        column: &str,
        partition: F,
    ) -> Result<TableWriteSummary>
    where
        T: TableRecord + Clone,
        F: Fn(&T) -> Option<String>,
    {
        let dir = self.reset_table(table)?;

        // An empty table still gets a schema-only file
        if rows.is_empty() {
            self.write_file(&dir.join(PART_FILE_NAME), rows)?;
            return Ok(TableWriteSummary {
                table: table.to_string(),
                rows: 0,
                files: 1,
                partitions: 0,
            });
        }

        let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
        for row in rows {
            let value = partition(row).unwrap_or_else(|| NULL_PARTITION_VALUE.to_string());
            groups.entry(value).or_default().push(row.clone());
        }

        for (value, group) in &groups {
            if value.contains(['/', '\\']) || value == ".." {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Invalid partition value for {}.{}: '{}'",
                    table, column, value
                )));
            }

            let partition_dir = dir.join(format!("{}={}", column, value));
            fs::create_dir_all(&partition_dir)?;
            self.write_file(&partition_dir.join(PART_FILE_NAME), group)?;
        }

        debug!(
            table,
            rows = rows.len(),
            partitions = groups.len(),
            "wrote partitioned table"
        );

        Ok(TableWriteSummary {
            table: table.to_string(),
            rows: rows.len(),
            files: groups.len(),
            partitions: groups.len(),
        })
    }

    /// Read every row of a persisted table
    pub fn read_table<T: TableRecord>(&self, table: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for batch in self.read_batches(table)? {
            rows.extend(T::from_batch(&batch)?);
        }
        Ok(rows)
    }

    pub fn read_batches(&self, table: &str) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for path in self.data_files(table)? {
            let file = File::open(&path)?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            for batch in reader {
                batches.push(batch?);
            }
        }
        Ok(batches)
    }

    /// Parquet files of a table in path order
    pub fn data_files(&self, table: &str) -> Result<Vec<PathBuf>> {
        let dir = self.table_path(table);
        if !dir.is_dir() {
            return Err(ProcessingError::MissingData(format!(
                "Table '{}' not found under {}",
                table,
                self.root.display()
            )));
        }

        let mut files = Vec::new();
        collect_parquet_files(&dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    /// Row count from file metadata, without decoding any data
    pub fn row_count(&self, table: &str) -> Result<i64> {
        let mut total = 0;
        for path in self.data_files(table)? {
            let reader = SerializedFileReader::new(File::open(&path)?)?;
            total += reader.metadata().file_metadata().num_rows();
        }
        Ok(total)
    }

    pub fn table_info(&self, table: &str) -> Result<TableInfo> {
        let files = self.data_files(table)?;
        let mut info = TableInfo {
            table: table.to_string(),
            files: files.len(),
            partitions: 0,
            total_rows: 0,
            row_groups: 0,
            size_bytes: 0,
        };

        for path in &files {
            let reader = SerializedFileReader::new(File::open(path)?)?;
            let metadata = reader.metadata();
            info.total_rows += metadata.file_metadata().num_rows();
            info.row_groups += metadata.num_row_groups();
            info.size_bytes += fs::metadata(path)?.len();
        }

        let table_dir = self.table_path(table);
        info.partitions = files
            .iter()
            .filter_map(|p| p.parent())
            .filter(|p| *p != table_dir.as_path())
            .count();

        Ok(info)
    }

    /// Serialize a JSON document at the output root
    pub fn write_json<S: Serialize>(&self, file_name: &str, value: &S) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(file_name);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(path)
    }

    fn reset_table(&self, table: &str) -> Result<PathBuf> {
        let dir = self.table_path(table);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_file<T: TableRecord>(&self, path: &Path, rows: &[T]) -> Result<()> {
        let schema = T::schema();
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        for chunk in rows.chunks(self.row_group_size) {
            let batch = T::to_batch(chunk)?;
            writer.write(&batch)?;
        }

        writer.close()?;
        Ok(())
    }
}

fn collect_parquet_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_parquet_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    Ok(())
}

pub fn parse_compression(compression: &str) -> Result<Compression> {
    Ok(match compression.to_lowercase().as_str() {
        COMPRESSION_SNAPPY => Compression::SNAPPY,
        COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
        COMPRESSION_LZ4 => Compression::LZ4,
        COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
        COMPRESSION_NONE => Compression::UNCOMPRESSED,
        _ => {
            return Err(ProcessingError::Config(format!(
                "Unsupported compression: {}",
                compression
            )))
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWriteSummary {
    pub table: String,
    pub rows: usize,
    pub files: usize,
    pub partitions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub table: String,
    pub files: usize,
    pub partitions: usize,
    pub total_rows: i64,
    pub row_groups: usize,
    pub size_bytes: u64,
}

impl TableInfo {
    pub fn summary(&self) -> String {
        format!(
            "Table {}:\n\
            - Total rows: {}\n\
            - Files: {}\n\
            - Partitions: {}\n\
            - Row groups: {}\n\
            - Size: {:.2} MB",
            self.table,
            self.total_rows,
            self.files,
            self.partitions,
            self.row_groups,
            self.size_bytes as f64 / 1_048_576.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CountryRow, VisitFact};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn country(code: &str, label: &str) -> CountryRow {
        CountryRow {
            country_code: code.to_string(),
            country: label.to_string(),
        }
    }

    fn fact(cicid: i64, arrival: Option<NaiveDate>) -> VisitFact {
        VisitFact {
            cicid,
            arrival_date: arrival,
            departure_date: None,
            stay_days: None,
            port_code: "NYC".to_string(),
            country_code: Some(101),
            mode_code: Some(1),
            visa_code: Some(2),
            age: None,
            avg_temperature: None,
        }
    }

    #[test]
    fn test_write_and_read_table() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());
        let rows = vec![country("101", "FRANCE"), country("999", "Other")];

        let summary = store.write_table("dim_countries", &rows)?;
        assert_eq!(summary.rows, 2);
        assert_eq!(store.read_table::<CountryRow>("dim_countries")?, rows);
        assert_eq!(store.row_count("dim_countries")?, 2);
        Ok(())
    }

    #[test]
    fn test_write_overwrites_previous_snapshot() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());

        store.write_table("dim_countries", &[country("1", "A"), country("2", "B")])?;
        store.write_table("dim_countries", &[country("3", "C")])?;

        assert_eq!(store.read_table::<CountryRow>("dim_countries")?, vec![country("3", "C")]);
        Ok(())
    }

    #[test]
    fn test_write_empty_table_keeps_schema() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());

        store.write_table::<CountryRow>("dim_countries", &[])?;

        assert_eq!(store.row_count("dim_countries")?, 0);
        assert!(store.read_table::<CountryRow>("dim_countries")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_partitioned_layout() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());
        let day = NaiveDate::from_ymd_opt(2016, 4, 1);
        let rows = vec![fact(1, day), fact(2, day), fact(3, None)];

        let summary =
            store.write_partitioned("fact_i94visits", &rows, "arrival_date", VisitFact::partition_value)?;

        assert_eq!(summary.partitions, 2);
        assert!(dir
            .path()
            .join("fact_i94visits/arrival_date=2016-04-01/part-00000.parquet")
            .exists());
        assert!(dir
            .path()
            .join("fact_i94visits/arrival_date=__HIVE_DEFAULT_PARTITION__/part-00000.parquet")
            .exists());

        let mut read = store.read_table::<VisitFact>("fact_i94visits")?;
        read.sort_by_key(|f| f.cicid);
        assert_eq!(read, rows);

        let info = store.table_info("fact_i94visits")?;
        assert_eq!(info.total_rows, 3);
        assert_eq!(info.partitions, 2);
        assert!(info.summary().contains("Total rows: 3"));
        Ok(())
    }

    #[test]
    fn test_row_group_size() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path()).with_row_group_size(2);
        let rows: Vec<CountryRow> = (0..5).map(|i| country(&i.to_string(), "X")).collect();

        store.write_table("dim_countries", &rows)?;

        let info = store.table_info("dim_countries")?;
        assert_eq!(info.row_groups, 3);
        assert_eq!(info.total_rows, 5);
        Ok(())
    }

    #[test]
    fn test_zero_row_group_size_is_clamped() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path()).with_row_group_size(0);

        store.write_table("dim_countries", &[country("101", "FRANCE"), country("102", "SPAIN")])?;

        let info = store.table_info("dim_countries")?;
        assert_eq!(info.row_groups, 2);
        assert_eq!(info.total_rows, 2);
        Ok(())
    }

    #[test]
    fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let store = TableStore::new(dir.path());

        assert!(matches!(
            store.read_table::<CountryRow>("dim_countries"),
            Err(ProcessingError::MissingData(_))
        ));
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let dir = TempDir::new()?;
            let store = TableStore::new(dir.path()).with_compression(compression)?;
            store.write_table("dim_countries", &[country("101", "FRANCE")])?;
            assert_eq!(store.row_count("dim_countries")?, 1, "compression {}", compression);
        }

        assert!(TableStore::new("out").with_compression("brotli-9000").is_err());
        Ok(())
    }
}
