use crate::error::{ProcessingError, Result};
use crate::utils::constants::{SAS_EPOCH_DAY, SAS_EPOCH_MONTH, SAS_EPOCH_YEAR};
use chrono::{Datelike, Duration, NaiveDate};

/// The SAS date epoch, 1960-01-01
pub fn sas_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(SAS_EPOCH_YEAR, SAS_EPOCH_MONTH, SAS_EPOCH_DAY)
        .unwrap_or(NaiveDate::MIN)
}

/// Convert a SAS day offset (days since 1960-01-01) to a calendar date
///
/// # Examples
/// ```
/// use i94_warehouse::utils::sas_to_date;
///
/// let date = sas_to_date(Some(20545)).unwrap();
/// assert_eq!(date.to_string(), "2016-04-01");
/// assert!(sas_to_date(None).is_none());
/// ```
pub fn sas_to_date(offset: Option<i64>) -> Option<NaiveDate> {
    let offset = offset?;
    sas_epoch().checked_add_signed(Duration::try_days(offset)?)
}

/// Stay length in days between two SAS offsets; negative stays pass through,
/// a difference that does not fit in `i64` is null
pub fn stay_days(arrival: Option<i64>, departure: Option<i64>) -> Option<i64> {
    departure?.checked_sub(arrival?)
}

/// Days since the Unix epoch, as stored in Arrow `Date32` columns
pub fn date_to_date32(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

pub fn date32_to_date(days: i32) -> Result<NaiveDate> {
    NaiveDate::default()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Date32 value out of range: {}", days)))
}

/// ISO-8601 week number
pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Short weekday name (`Mon` .. `Sun`)
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sas_epoch_offsets() {
        assert_eq!(sas_to_date(Some(0)), NaiveDate::from_ymd_opt(1960, 1, 1));
        assert_eq!(sas_to_date(Some(20100)), NaiveDate::from_ymd_opt(2015, 1, 12));
        assert_eq!(sas_to_date(Some(20545)), NaiveDate::from_ymd_opt(2016, 4, 1));
        assert_eq!(sas_to_date(Some(-1)), NaiveDate::from_ymd_opt(1959, 12, 31));
        assert_eq!(sas_to_date(None), None);
    }

    #[test]
    fn test_stay_days() {
        assert_eq!(stay_days(Some(20545), Some(20551)), Some(6));
        assert_eq!(stay_days(Some(20551), Some(20545)), Some(-6));
        assert_eq!(stay_days(None, Some(20545)), None);
        assert_eq!(stay_days(Some(20545), None), None);
    }

    #[test]
    fn test_stay_days_overflow_is_null() {
        assert_eq!(stay_days(Some(i64::MIN), Some(i64::MAX)), None);
        assert_eq!(stay_days(Some(i64::MAX), Some(i64::MIN)), None);
        assert_eq!(sas_to_date(Some(i64::MAX)), None);
    }

    #[test]
    fn test_date32_conversion() {
        let date = NaiveDate::from_ymd_opt(2016, 4, 1).unwrap();
        let days = date_to_date32(date);
        assert_eq!(days, 16892);
        assert_eq!(date32_to_date(days).unwrap(), date);
    }

    #[test]
    fn test_week_and_weekday() {
        let date = NaiveDate::from_ymd_opt(2016, 4, 1).unwrap();
        assert_eq!(iso_week(date), 13);
        assert_eq!(weekday_name(date), "Fri");

        // 2016-01-01 belongs to ISO week 53 of 2015
        let new_year = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        assert_eq!(iso_week(new_year), 53);
    }
}
