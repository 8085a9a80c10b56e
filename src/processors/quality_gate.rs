use crate::error::{ProcessingError, Result};
use crate::writers::TableStore;
use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// Outcome of a passed quality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityCheck {
    pub table: String,
    pub description: String,
    pub rows: i64,
    pub distinct_keys: Option<usize>,
}

/// Fail when the persisted table has no rows
pub fn check_count(store: &TableStore, table: &str, description: &str) -> Result<QualityCheck> {
    let rows = store.row_count(table)?;

    if rows == 0 {
        return Err(ProcessingError::DataValidation {
            table: table.to_string(),
            description: description.to_string(),
            reason: "zero records".to_string(),
        });
    }

    info!(table, description, rows, "row count check passed");

    Ok(QualityCheck {
        table: table.to_string(),
        description: description.to_string(),
        rows,
        distinct_keys: None,
    })
}

/// Fail when the key columns of the persisted table repeat a value
pub fn check_unique_key(
    store: &TableStore,
    table: &str,
    key_columns: &[&str],
    description: &str,
) -> Result<QualityCheck> {
    let mut keys: HashSet<Vec<Option<String>>> = HashSet::new();
    let mut rows: i64 = 0;

    for batch in store.read_batches(table)? {
        let columns = key_columns
            .iter()
            .map(|name| {
                batch.column_by_name(name).ok_or_else(|| ProcessingError::DataValidation {
                    table: table.to_string(),
                    description: description.to_string(),
                    reason: format!("key column '{}' not found", name),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for i in 0..batch.num_rows() {
            let key = columns
                .iter()
                .map(|column| {
                    if column.is_null(i) {
                        Ok(None)
                    } else {
                        array_value_to_string(column.as_ref(), i).map(Some)
                    }
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            keys.insert(key);
        }
        rows += batch.num_rows() as i64;
    }

    if rows > keys.len() as i64 {
        return Err(ProcessingError::DataValidation {
            table: table.to_string(),
            description: description.to_string(),
            reason: format!(
                "{} rows but only {} distinct values of ({})",
                rows,
                keys.len(),
                key_columns.join(", ")
            ),
        });
    }

    info!(table, description, rows, "unique key check passed");

    Ok(QualityCheck {
        table: table.to_string(),
        description: description.to_string(),
        rows,
        distinct_keys: Some(keys.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryRow;
    use tempfile::TempDir;

    fn country(code: &str, label: &str) -> CountryRow {
        CountryRow {
            country_code: code.to_string(),
            country: label.to_string(),
        }
    }

    #[test]
    fn test_count_check() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());

        store.write_table("dim_countries", &[country("101", "FRANCE")])?;
        assert_eq!(check_count(&store, "dim_countries", "countries")?.rows, 1);

        store.write_table::<CountryRow>("dim_countries", &[])?;
        assert!(matches!(
            check_count(&store, "dim_countries", "countries"),
            Err(ProcessingError::DataValidation { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unique_key_check() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());

        store.write_table("dim_countries", &[country("101", "FRANCE"), country("102", "FRANCE")])?;
        let check = check_unique_key(&store, "dim_countries", &["country_code"], "countries")?;
        assert_eq!(check.distinct_keys, Some(2));

        // unique over the pair, duplicated over the label alone
        check_unique_key(&store, "dim_countries", &["country_code", "country"], "countries")?;
        match check_unique_key(&store, "dim_countries", &["country"], "countries") {
            Err(ProcessingError::DataValidation { reason, .. }) => {
                assert!(reason.contains("2 rows but only 1"), "{}", reason);
            }
            other => panic!("expected DataValidation, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_unknown_key_column() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TableStore::new(dir.path());
        store.write_table("dim_countries", &[country("101", "FRANCE")])?;

        assert!(check_unique_key(&store, "dim_countries", &["cicid"], "countries").is_err());
        Ok(())
    }
}
