use crate::error::{ProcessingError, Result};
use crate::models::{CityTemperatureRecord, DemographicsRecord, ImmigrationRecord};
use crate::readers::schema::{
    ColumnIndex, DatasetSchema, DEMOGRAPHICS_SCHEMA, IMMIGRATION_SCHEMA, TEMPERATURES_SCHEMA,
};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use crate::utils::text::{non_empty, parse_float, parse_integral};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Reads the three raw tabular extracts through their declared column maps
pub struct SourceReader {
    flexible: bool,
}

impl SourceReader {
    pub fn new() -> Self {
        Self { flexible: true }
    }

    /// Reject records whose field count differs from the header
    pub fn with_strict_record_length(strict: bool) -> Self {
        Self { flexible: !strict }
    }

    pub fn read_immigration(&self, path: &Path) -> Result<Vec<ImmigrationRecord>> {
        self.read_dataset(path, &IMMIGRATION_SCHEMA, parse_immigration)
    }

    pub fn read_demographics(&self, path: &Path) -> Result<Vec<DemographicsRecord>> {
        self.read_dataset(path, &DEMOGRAPHICS_SCHEMA, parse_demographics)
    }

    pub fn read_temperatures(&self, path: &Path) -> Result<Vec<CityTemperatureRecord>> {
        self.read_dataset(path, &TEMPERATURES_SCHEMA, parse_temperature)
    }

    fn read_dataset<T, F>(&self, path: &Path, schema: &DatasetSchema, parse: F) -> Result<Vec<T>>
    where
        F: Fn(&ColumnIndex, &StringRecord) -> Result<T>,
    {
        let file = File::open(path)?;
        let records = self.read_from(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file), schema, parse)?;

        debug!(
            dataset = schema.name,
            file = %path.display(),
            rows = records.len(),
            "read source extract"
        );

        Ok(records)
    }

    /// Parse delimited text with a header row
    pub fn read_from<R, T, F>(&self, input: R, schema: &DatasetSchema, parse: F) -> Result<Vec<T>>
    where
        R: Read,
        F: Fn(&ColumnIndex, &StringRecord) -> Result<T>,
    {
        let mut reader = ReaderBuilder::new()
            .delimiter(schema.delimiter)
            .has_headers(true)
            .flexible(self.flexible)
            .from_reader(input);

        let index = schema.resolve(reader.headers()?)?;
        let mut records = Vec::new();

        for result in reader.records() {
            let record = result?;

            // Skip blank lines
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let parsed = parse(&index, &record).map_err(|e| match e {
                ProcessingError::InvalidFormat(message) => {
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    ProcessingError::InvalidFormat(format!(
                        "{} line {}: {}",
                        schema.name, line, message
                    ))
                }
                other => other,
            })?;
            records.push(parsed);
        }

        Ok(records)
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}

fn text(index: &ColumnIndex, record: &StringRecord, column: &str) -> Result<Option<String>> {
    Ok(non_empty(index.get(record, column)?))
}

fn integral(index: &ColumnIndex, record: &StringRecord, column: &str) -> Result<Option<i64>> {
    parse_integral(index.get(record, column)?)
}

fn float(index: &ColumnIndex, record: &StringRecord, column: &str) -> Result<Option<f64>> {
    parse_float(index.get(record, column)?)
}

pub fn parse_immigration(index: &ColumnIndex, record: &StringRecord) -> Result<ImmigrationRecord> {
    let cicid = integral(index, record, "cicid")?
        .ok_or_else(|| ProcessingError::InvalidFormat("missing cicid".to_string()))?;

    Ok(ImmigrationRecord {
        cicid,
        i94yr: integral(index, record, "i94yr")?,
        i94mon: integral(index, record, "i94mon")?,
        i94cit: integral(index, record, "i94cit")?,
        i94res: integral(index, record, "i94res")?,
        i94port: text(index, record, "i94port")?,
        arrdate: integral(index, record, "arrdate")?,
        i94mode: integral(index, record, "i94mode")?,
        i94addr: text(index, record, "i94addr")?,
        depdate: integral(index, record, "depdate")?,
        i94bir: integral(index, record, "i94bir")?,
        i94visa: integral(index, record, "i94visa")?,
        matflag: text(index, record, "matflag")?,
        gender: text(index, record, "gender")?,
        airline: text(index, record, "airline")?,
        visatype: text(index, record, "visatype")?,
    })
}

pub fn parse_demographics(
    index: &ColumnIndex,
    record: &StringRecord,
) -> Result<DemographicsRecord> {
    Ok(DemographicsRecord {
        city: text(index, record, "city")?,
        state: text(index, record, "state")?,
        median_age: float(index, record, "median_age")?,
        male_population: integral(index, record, "male_population")?,
        female_population: integral(index, record, "female_population")?,
        total_population: integral(index, record, "total_population")?,
        number_of_veterans: integral(index, record, "number_of_veterans")?,
        foreign_born: integral(index, record, "foreign_born")?,
        average_household_size: float(index, record, "average_household_size")?,
        state_code: text(index, record, "state_code")?,
    })
}

pub fn parse_temperature(
    index: &ColumnIndex,
    record: &StringRecord,
) -> Result<CityTemperatureRecord> {
    Ok(CityTemperatureRecord {
        region: text(index, record, "region")?,
        country: text(index, record, "country")?,
        state: text(index, record, "state")?,
        city: text(index, record, "city")?,
        month: integral(index, record, "month")?,
        day: integral(index, record, "day")?,
        year: integral(index, record, "year")?,
        avg_temperature: float(index, record, "avg_temperature")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const IMMIGRATION_HEADER: &str = ",cicid,i94yr,i94mon,i94cit,i94res,i94port,arrdate,i94mode,i94addr,depdate,i94bir,i94visa,count,dtadfile,visapost,occup,entdepa,entdepd,entdepu,matflag,biryear,dtaddto,gender,insnum,airline,admnum,fltno,visatype";

    #[test]
    fn test_read_immigration_extract() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", IMMIGRATION_HEADER)?;
        writeln!(
            file,
            "2027561,4084316.0,2016.0,4.0,209.0,209.0,HHW,20566.0,1.0,HI,20573.0,61.0,2.0,1.0,20160422,,,G,O,,M,1955.0,07202016,F,,JL,56582674633.0,00782,WT"
        )?;
        writeln!(
            file,
            "2171295,4422636.0,2016.0,4.0,582.0,582.0,MCA,20567.0,1.0,TX,,26.0,2.0,1.0,20160423,MTR,,G,,,,1990.0,10222016,M,,*GA,94361995930.0,XBLNG,B2"
        )?;

        let records = SourceReader::new().read_immigration(file.path())?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cicid, 4084316);
        assert_eq!(records[0].i94port.as_deref(), Some("HHW"));
        assert_eq!(records[0].arrdate, Some(20566));
        assert_eq!(records[0].depdate, Some(20573));
        assert_eq!(records[0].matflag.as_deref(), Some("M"));
        assert_eq!(records[0].visatype.as_deref(), Some("WT"));
        assert_eq!(records[1].depdate, None);
        assert_eq!(records[1].matflag, None);
        Ok(())
    }

    #[test]
    fn test_invalid_number_reports_line() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", IMMIGRATION_HEADER)?;
        writeln!(
            file,
            "0,1.0,2016.0,4.0,209.0,209.0,HHW,soon,1.0,HI,20573.0,61.0,2.0,1.0,,,,,,,M,,,F,,JL,,,WT"
        )?;

        match SourceReader::new().read_immigration(file.path()) {
            Err(ProcessingError::InvalidFormat(message)) => {
                assert!(message.contains("line 2"), "{}", message);
                assert!(message.contains("soon"), "{}", message);
            }
            other => panic!("expected InvalidFormat, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_read_demographics_semicolon_delimited() -> Result<()> {
        let data = "City;State;Median Age;Male Population;Female Population;Total Population;Number of Veterans;Foreign-born;Average Household Size;State Code;Race;Count\n\
                    Silver Spring;Maryland;33.8;40601;41862;82463;1562;30908;2.6;MD;Hispanic or Latino;25924\n\
                    Quincy;Massachusetts;41.0;44129;49500;93629;4147;32935;2.39;MA;White;58723\n";

        let records = SourceReader::new().read_from(
            data.as_bytes(),
            &DEMOGRAPHICS_SCHEMA,
            parse_demographics,
        )?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].city.as_deref(), Some("Silver Spring"));
        assert_eq!(records[0].median_age, Some(33.8));
        assert_eq!(records[1].foreign_born, Some(32935));
        assert_eq!(records[1].state_code.as_deref(), Some("MA"));
        Ok(())
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let data = "Region,Country,State,City,Month,Day,Year\nNorth America,US,Texas,Austin,4,1,2016\n";
        let result =
            SourceReader::new().read_from(data.as_bytes(), &TEMPERATURES_SCHEMA, parse_temperature);

        assert!(matches!(result, Err(ProcessingError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_short_records() -> Result<()> {
        let data = "Region,Country,State,City,Month,Day,Year,AvgTemperature\n\
                    North America,US,Texas,Austin,4,1,2016\n";

        let records =
            SourceReader::new().read_from(data.as_bytes(), &TEMPERATURES_SCHEMA, parse_temperature)?;
        assert_eq!(records[0].avg_temperature, None);

        let strict = SourceReader::with_strict_record_length(true).read_from(
            data.as_bytes(),
            &TEMPERATURES_SCHEMA,
            parse_temperature,
        );
        assert!(matches!(strict, Err(ProcessingError::Csv(_))));
        Ok(())
    }

    #[test]
    fn test_read_temperatures() -> Result<()> {
        let data = "Region,Country,State,City,Month,Day,Year,AvgTemperature\n\
                    North America,US,Texas,Austin,4,1,2016,68.2\n\
                    Europe,France,,Paris,4,1,2016,55.1\n";
        let records =
            SourceReader::new().read_from(data.as_bytes(), &TEMPERATURES_SCHEMA, parse_temperature)?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].avg_temperature, Some(68.2));
        assert_eq!(records[1].state, None);
        Ok(())
    }
}
