use crate::error::{ProcessingError, Result};
use crate::models::*;
use crate::utils::dates::{date32_to_date, date_to_date32};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::sync::Arc;

/// A row type persisted as one warehouse table
pub trait TableRecord: Sized {
    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing column '{}'", name)))?
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

fn opt_string(array: &StringArray, i: usize) -> Option<String> {
    (!array.is_null(i)).then(|| array.value(i).to_string())
}

fn req_string(array: &StringArray, i: usize, name: &str) -> Result<String> {
    opt_string(array, i)
        .ok_or_else(|| ProcessingError::MissingData(format!("null value in column '{}'", name)))
}

fn opt_i64(array: &Int64Array, i: usize) -> Option<i64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn opt_f64(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn opt_date(array: &Date32Array, i: usize) -> Result<Option<NaiveDate>> {
    if array.is_null(i) {
        Ok(None)
    } else {
        date32_to_date(array.value(i)).map(Some)
    }
}

fn strings<T>(rows: &[T], f: impl Fn(&T) -> Option<String>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn ints<T>(rows: &[T], f: impl Fn(&T) -> Option<i64>) -> ArrayRef {
    Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn floats<T>(rows: &[T], f: impl Fn(&T) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn dates<T>(rows: &[T], f: impl Fn(&T) -> Option<NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from(
        rows.iter()
            .map(|r| f(r).map(date_to_date32))
            .collect::<Vec<_>>(),
    ))
}

fn schema(fields: Vec<(&str, DataType, bool)>) -> SchemaRef {
    Arc::new(Schema::new(
        fields
            .into_iter()
            .map(|(name, data_type, nullable)| Field::new(name, data_type, nullable))
            .collect::<Vec<_>>(),
    ))
}

impl TableRecord for ImmigrationRecord {
    fn schema() -> SchemaRef {
        schema(vec![
            ("cicid", DataType::Int64, false),
            ("i94yr", DataType::Int64, true),
            ("i94mon", DataType::Int64, true),
            ("i94cit", DataType::Int64, true),
            ("i94res", DataType::Int64, true),
            ("i94port", DataType::Utf8, true),
            ("arrdate", DataType::Int64, true),
            ("i94mode", DataType::Int64, true),
            ("i94addr", DataType::Utf8, true),
            ("depdate", DataType::Int64, true),
            ("i94bir", DataType::Int64, true),
            ("i94visa", DataType::Int64, true),
            ("matflag", DataType::Utf8, true),
            ("gender", DataType::Utf8, true),
            ("airline", DataType::Utf8, true),
            ("visatype", DataType::Utf8, true),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from(rows.iter().map(|r| r.cicid).collect::<Vec<_>>())),
                ints(rows, |r| r.i94yr),
                ints(rows, |r| r.i94mon),
                ints(rows, |r| r.i94cit),
                ints(rows, |r| r.i94res),
                strings(rows, |r| r.i94port.clone()),
                ints(rows, |r| r.arrdate),
                ints(rows, |r| r.i94mode),
                strings(rows, |r| r.i94addr.clone()),
                ints(rows, |r| r.depdate),
                ints(rows, |r| r.i94bir),
                ints(rows, |r| r.i94visa),
                strings(rows, |r| r.matflag.clone()),
                strings(rows, |r| r.gender.clone()),
                strings(rows, |r| r.airline.clone()),
                strings(rows, |r| r.visatype.clone()),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let cicid = column::<Int64Array>(batch, "cicid")?;
        let i94yr = column::<Int64Array>(batch, "i94yr")?;
        let i94mon = column::<Int64Array>(batch, "i94mon")?;
        let i94cit = column::<Int64Array>(batch, "i94cit")?;
        let i94res = column::<Int64Array>(batch, "i94res")?;
        let i94port = column::<StringArray>(batch, "i94port")?;
        let arrdate = column::<Int64Array>(batch, "arrdate")?;
        let i94mode = column::<Int64Array>(batch, "i94mode")?;
        let i94addr = column::<StringArray>(batch, "i94addr")?;
        let depdate = column::<Int64Array>(batch, "depdate")?;
        let i94bir = column::<Int64Array>(batch, "i94bir")?;
        let i94visa = column::<Int64Array>(batch, "i94visa")?;
        let matflag = column::<StringArray>(batch, "matflag")?;
        let gender = column::<StringArray>(batch, "gender")?;
        let airline = column::<StringArray>(batch, "airline")?;
        let visatype = column::<StringArray>(batch, "visatype")?;

        Ok((0..batch.num_rows())
            .map(|i| ImmigrationRecord {
                cicid: cicid.value(i),
                i94yr: opt_i64(i94yr, i),
                i94mon: opt_i64(i94mon, i),
                i94cit: opt_i64(i94cit, i),
                i94res: opt_i64(i94res, i),
                i94port: opt_string(i94port, i),
                arrdate: opt_i64(arrdate, i),
                i94mode: opt_i64(i94mode, i),
                i94addr: opt_string(i94addr, i),
                depdate: opt_i64(depdate, i),
                i94bir: opt_i64(i94bir, i),
                i94visa: opt_i64(i94visa, i),
                matflag: opt_string(matflag, i),
                gender: opt_string(gender, i),
                airline: opt_string(airline, i),
                visatype: opt_string(visatype, i),
            })
            .collect())
    }
}

impl TableRecord for DemographicsRecord {
    fn schema() -> SchemaRef {
        schema(vec![
            ("city", DataType::Utf8, true),
            ("state", DataType::Utf8, true),
            ("median_age", DataType::Float64, true),
            ("male_population", DataType::Int64, true),
            ("female_population", DataType::Int64, true),
            ("total_population", DataType::Int64, true),
            ("number_of_veterans", DataType::Int64, true),
            ("foreign_born", DataType::Int64, true),
            ("average_household_size", DataType::Float64, true),
            ("state_code", DataType::Utf8, true),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| r.city.clone()),
                strings(rows, |r| r.state.clone()),
                floats(rows, |r| r.median_age),
                ints(rows, |r| r.male_population),
                ints(rows, |r| r.female_population),
                ints(rows, |r| r.total_population),
                ints(rows, |r| r.number_of_veterans),
                ints(rows, |r| r.foreign_born),
                floats(rows, |r| r.average_household_size),
                strings(rows, |r| r.state_code.clone()),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let city = column::<StringArray>(batch, "city")?;
        let state = column::<StringArray>(batch, "state")?;
        let median_age = column::<Float64Array>(batch, "median_age")?;
        let male = column::<Int64Array>(batch, "male_population")?;
        let female = column::<Int64Array>(batch, "female_population")?;
        let total = column::<Int64Array>(batch, "total_population")?;
        let veterans = column::<Int64Array>(batch, "number_of_veterans")?;
        let foreign_born = column::<Int64Array>(batch, "foreign_born")?;
        let household = column::<Float64Array>(batch, "average_household_size")?;
        let state_code = column::<StringArray>(batch, "state_code")?;

        Ok((0..batch.num_rows())
            .map(|i| DemographicsRecord {
                city: opt_string(city, i),
                state: opt_string(state, i),
                median_age: opt_f64(median_age, i),
                male_population: opt_i64(male, i),
                female_population: opt_i64(female, i),
                total_population: opt_i64(total, i),
                number_of_veterans: opt_i64(veterans, i),
                foreign_born: opt_i64(foreign_born, i),
                average_household_size: opt_f64(household, i),
                state_code: opt_string(state_code, i),
            })
            .collect())
    }
}

impl TableRecord for CityTemperatureRecord {
    fn schema() -> SchemaRef {
        schema(vec![
            ("region", DataType::Utf8, true),
            ("country", DataType::Utf8, true),
            ("state", DataType::Utf8, true),
            ("city", DataType::Utf8, true),
            ("month", DataType::Int64, true),
            ("day", DataType::Int64, true),
            ("year", DataType::Int64, true),
            ("avg_temperature", DataType::Float64, true),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| r.region.clone()),
                strings(rows, |r| r.country.clone()),
                strings(rows, |r| r.state.clone()),
                strings(rows, |r| r.city.clone()),
                ints(rows, |r| r.month),
                ints(rows, |r| r.day),
                ints(rows, |r| r.year),
                floats(rows, |r| r.avg_temperature),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let region = column::<StringArray>(batch, "region")?;
        let country = column::<StringArray>(batch, "country")?;
        let state = column::<StringArray>(batch, "state")?;
        let city = column::<StringArray>(batch, "city")?;
        let month = column::<Int64Array>(batch, "month")?;
        let day = column::<Int64Array>(batch, "day")?;
        let year = column::<Int64Array>(batch, "year")?;
        let avg = column::<Float64Array>(batch, "avg_temperature")?;

        Ok((0..batch.num_rows())
            .map(|i| CityTemperatureRecord {
                region: opt_string(region, i),
                country: opt_string(country, i),
                state: opt_string(state, i),
                city: opt_string(city, i),
                month: opt_i64(month, i),
                day: opt_i64(day, i),
                year: opt_i64(year, i),
                avg_temperature: opt_f64(avg, i),
            })
            .collect())
    }
}

impl TableRecord for PortDimensionRow {
    fn schema() -> SchemaRef {
        schema(vec![
            ("port_code", DataType::Utf8, false),
            ("city", DataType::Utf8, false),
            ("state_code", DataType::Utf8, false),
            ("state", DataType::Utf8, false),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.port_code.clone())),
                strings(rows, |r| Some(r.city.clone())),
                strings(rows, |r| Some(r.state_code.clone())),
                strings(rows, |r| Some(r.state.clone())),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let port_code = column::<StringArray>(batch, "port_code")?;
        let city = column::<StringArray>(batch, "city")?;
        let state_code = column::<StringArray>(batch, "state_code")?;
        let state = column::<StringArray>(batch, "state")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(PortDimensionRow {
                    port_code: req_string(port_code, i, "port_code")?,
                    city: req_string(city, i, "city")?,
                    state_code: req_string(state_code, i, "state_code")?,
                    state: req_string(state, i, "state")?,
                })
            })
            .collect()
    }
}

/// Two-column code/label dimensions share one layout
macro_rules! code_label_record {
    ($row:ident, $code:ident, $label:ident) => {
        impl TableRecord for $row {
            fn schema() -> SchemaRef {
                schema(vec![
                    (stringify!($code), DataType::Utf8, false),
                    (stringify!($label), DataType::Utf8, false),
                ])
            }

            fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
                let batch = RecordBatch::try_new(
                    Self::schema(),
                    vec![
                        strings(rows, |r| Some(r.$code.clone())),
                        strings(rows, |r| Some(r.$label.clone())),
                    ],
                )?;
                Ok(batch)
            }

            fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
                let codes = column::<StringArray>(batch, stringify!($code))?;
                let labels = column::<StringArray>(batch, stringify!($label))?;

                (0..batch.num_rows())
                    .map(|i| {
                        Ok($row {
                            $code: req_string(codes, i, stringify!($code))?,
                            $label: req_string(labels, i, stringify!($label))?,
                        })
                    })
                    .collect()
            }
        }
    };
}

code_label_record!(CountryRow, country_code, country);
code_label_record!(VisaRow, visa_code, visa);
code_label_record!(TravelModeRow, mode_code, mode);

impl TableRecord for DemographicsDimensionRow {
    fn schema() -> SchemaRef {
        schema(vec![
            ("port_code", DataType::Utf8, false),
            ("median_age", DataType::Float64, true),
            ("male_population", DataType::Int64, true),
            ("female_population", DataType::Int64, true),
            ("total_population", DataType::Int64, true),
            ("number_of_veterans", DataType::Int64, true),
            ("foreign_born", DataType::Int64, true),
            ("average_household_size", DataType::Float64, true),
            ("state_code", DataType::Utf8, true),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                strings(rows, |r| Some(r.port_code.clone())),
                floats(rows, |r| r.median_age),
                ints(rows, |r| r.male_population),
                ints(rows, |r| r.female_population),
                ints(rows, |r| r.total_population),
                ints(rows, |r| r.number_of_veterans),
                ints(rows, |r| r.foreign_born),
                floats(rows, |r| r.average_household_size),
                strings(rows, |r| r.state_code.clone()),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let port_code = column::<StringArray>(batch, "port_code")?;
        let median_age = column::<Float64Array>(batch, "median_age")?;
        let male = column::<Int64Array>(batch, "male_population")?;
        let female = column::<Int64Array>(batch, "female_population")?;
        let total = column::<Int64Array>(batch, "total_population")?;
        let veterans = column::<Int64Array>(batch, "number_of_veterans")?;
        let foreign_born = column::<Int64Array>(batch, "foreign_born")?;
        let household = column::<Float64Array>(batch, "average_household_size")?;
        let state_code = column::<StringArray>(batch, "state_code")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(DemographicsDimensionRow {
                    port_code: req_string(port_code, i, "port_code")?,
                    median_age: opt_f64(median_age, i),
                    male_population: opt_i64(male, i),
                    female_population: opt_i64(female, i),
                    total_population: opt_i64(total, i),
                    number_of_veterans: opt_i64(veterans, i),
                    foreign_born: opt_i64(foreign_born, i),
                    average_household_size: opt_f64(household, i),
                    state_code: opt_string(state_code, i),
                })
            })
            .collect()
    }
}

impl TableRecord for VisitFact {
    fn schema() -> SchemaRef {
        schema(vec![
            ("cicid", DataType::Int64, false),
            ("arrival_date", DataType::Date32, true),
            ("departure_date", DataType::Date32, true),
            ("stay_days", DataType::Int64, true),
            ("port_code", DataType::Utf8, false),
            ("country_code", DataType::Int64, true),
            ("mode_code", DataType::Int64, true),
            ("visa_code", DataType::Int64, true),
            ("age", DataType::Int64, true),
            ("avg_temperature", DataType::Float64, true),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(Int64Array::from(rows.iter().map(|r| r.cicid).collect::<Vec<_>>())),
                dates(rows, |r| r.arrival_date),
                dates(rows, |r| r.departure_date),
                ints(rows, |r| r.stay_days),
                strings(rows, |r| Some(r.port_code.clone())),
                ints(rows, |r| r.country_code),
                ints(rows, |r| r.mode_code),
                ints(rows, |r| r.visa_code),
                ints(rows, |r| r.age),
                floats(rows, |r| r.avg_temperature),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let cicid = column::<Int64Array>(batch, "cicid")?;
        let arrival = column::<Date32Array>(batch, "arrival_date")?;
        let departure = column::<Date32Array>(batch, "departure_date")?;
        let stay = column::<Int64Array>(batch, "stay_days")?;
        let port_code = column::<StringArray>(batch, "port_code")?;
        let country = column::<Int64Array>(batch, "country_code")?;
        let mode = column::<Int64Array>(batch, "mode_code")?;
        let visa = column::<Int64Array>(batch, "visa_code")?;
        let age = column::<Int64Array>(batch, "age")?;
        let temperature = column::<Float64Array>(batch, "avg_temperature")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(VisitFact {
                    cicid: cicid.value(i),
                    arrival_date: opt_date(arrival, i)?,
                    departure_date: opt_date(departure, i)?,
                    stay_days: opt_i64(stay, i),
                    port_code: req_string(port_code, i, "port_code")?,
                    country_code: opt_i64(country, i),
                    mode_code: opt_i64(mode, i),
                    visa_code: opt_i64(visa, i),
                    age: opt_i64(age, i),
                    avg_temperature: opt_f64(temperature, i),
                })
            })
            .collect()
    }
}

impl TableRecord for DateDimensionRow {
    fn schema() -> SchemaRef {
        schema(vec![
            ("arrival_date", DataType::Date32, false),
            ("year", DataType::Int32, false),
            ("month", DataType::UInt32, false),
            ("day", DataType::UInt32, false),
            ("week", DataType::UInt32, false),
            ("weekday", DataType::Utf8, false),
        ])
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let batch = RecordBatch::try_new(
            Self::schema(),
            vec![
                dates(rows, |r| Some(r.arrival_date)),
                Arc::new(Int32Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
                Arc::new(UInt32Array::from(rows.iter().map(|r| r.month).collect::<Vec<_>>())),
                Arc::new(UInt32Array::from(rows.iter().map(|r| r.day).collect::<Vec<_>>())),
                Arc::new(UInt32Array::from(rows.iter().map(|r| r.week).collect::<Vec<_>>())),
                strings(rows, |r| Some(r.weekday.clone())),
            ],
        )?;
        Ok(batch)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let arrival = column::<Date32Array>(batch, "arrival_date")?;
        let year = column::<Int32Array>(batch, "year")?;
        let month = column::<UInt32Array>(batch, "month")?;
        let day = column::<UInt32Array>(batch, "day")?;
        let week = column::<UInt32Array>(batch, "week")?;
        let weekday = column::<StringArray>(batch, "weekday")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(DateDimensionRow {
                    arrival_date: date32_to_date(arrival.value(i))?,
                    year: year.value(i),
                    month: month.value(i),
                    day: day.value(i),
                    week: week.value(i),
                    weekday: req_string(weekday, i, "weekday")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fact_batch_keeps_nulls() -> Result<()> {
        let facts = vec![
            VisitFact {
                cicid: 1,
                arrival_date: NaiveDate::from_ymd_opt(2016, 4, 1),
                departure_date: NaiveDate::from_ymd_opt(2016, 4, 7),
                stay_days: Some(6),
                port_code: "NYC".to_string(),
                country_code: Some(101),
                mode_code: Some(1),
                visa_code: Some(2),
                age: Some(40),
                avg_temperature: Some(52.3),
            },
            VisitFact {
                cicid: 2,
                arrival_date: None,
                departure_date: None,
                stay_days: None,
                port_code: "BOS".to_string(),
                country_code: None,
                mode_code: None,
                visa_code: None,
                age: None,
                avg_temperature: None,
            },
        ];

        let batch = VisitFact::to_batch(&facts)?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 10);
        assert_eq!(VisitFact::from_batch(&batch)?, facts);
        Ok(())
    }

    #[test]
    fn test_code_label_schema_names() {
        let schema = CountryRow::schema();
        assert_eq!(schema.field(0).name(), "country_code");
        assert_eq!(schema.field(1).name(), "country");
        assert_eq!(TravelModeRow::schema().field(1).name(), "mode");
    }

    #[test]
    fn test_demographics_schema_has_no_race_or_count() {
        let schema = DemographicsRecord::schema();
        assert!(schema.field_with_name("race").is_err());
        assert!(schema.field_with_name("count").is_err());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let batch = CountryRow::to_batch(&[CountryRow {
            country_code: "101".to_string(),
            country: "FRANCE".to_string(),
        }])
        .unwrap();

        assert!(VisaRow::from_batch(&batch).is_err());
    }
}
