use crate::error::{ProcessingError, Result};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;

/// Decode legacy text: UTF-8 when valid, Windows-1252 otherwise
pub fn decode_legacy_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

/// Remove single/double quotes and literal tabs, then trim
pub fn strip_quotes_and_tabs(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// The last of several quoted fields (`'ABC'\t'NEW YORK, NY'` -> `'NEW YORK, NY'`).
///
/// Fields are separated by a closing quote, whitespace, then an opening quote;
/// a lone apostrophe inside a label does not start a new field.
pub fn last_quoted_field(value: &str) -> &str {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == b'\'' {
                start = j;
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }

    &trimmed[start..]
}

/// Empty or whitespace-only cells are nulls
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse an integral value that may be written as a float (`20545.0`)
pub fn parse_integral(value: &str) -> Result<Option<i64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(Some(v));
    }

    let float = trimmed
        .parse::<f64>()
        .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid integer: '{}'", value)))?;

    if float.is_finite()
        && float.fract() == 0.0
        && float >= i64::MIN as f64
        && float < i64::MAX as f64
    {
        Ok(Some(float as i64))
    } else {
        Err(ProcessingError::InvalidFormat(format!(
            "Expected an integral value, got: '{}'",
            value
        )))
    }
}

pub fn parse_float(value: &str) -> Result<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid number: '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_legacy_text() {
        assert_eq!(decode_legacy_text(b"MEXICO"), "MEXICO");
        // 0xC9 is 'É' in Windows-1252 and invalid on its own in UTF-8
        assert_eq!(decode_legacy_text(b"C\xC9TE"), "CÉTE");
    }

    #[test]
    fn test_strip_quotes_and_tabs() {
        assert_eq!(strip_quotes_and_tabs("\t'AL'"), "AL");
        assert_eq!(strip_quotes_and_tabs("'ALCAN, AK             '"), "ALCAN, AK");
        assert_eq!(strip_quotes_and_tabs(" 582 "), "582");
    }

    #[test]
    fn test_last_quoted_field() {
        assert_eq!(last_quoted_field("'ABC'\t'NEW YORK, NY'"), "'NEW YORK, NY'");
        assert_eq!(last_quoted_field(" 'ALABAMA' "), "'ALABAMA'");
        assert_eq!(last_quoted_field("'COTE D'IVOIRE'"), "'COTE D'IVOIRE'");
        assert_eq!(last_quoted_field("Business"), "Business");
    }

    #[test]
    fn test_parse_integral() {
        assert_eq!(parse_integral("20545.0").unwrap(), Some(20545));
        assert_eq!(parse_integral("42").unwrap(), Some(42));
        assert_eq!(parse_integral("").unwrap(), None);
        assert_eq!(parse_integral("NaN").unwrap(), None);
        assert!(parse_integral("20545.5").is_err());
        assert!(parse_integral("abc").is_err());
    }

    #[test]
    fn test_parse_integral_out_of_range() {
        assert!(matches!(parse_integral("1e300"), Err(ProcessingError::InvalidFormat(_))));
        assert!(matches!(parse_integral("-1e300"), Err(ProcessingError::InvalidFormat(_))));
        assert_eq!(parse_integral("-1e15").unwrap(), Some(-1_000_000_000_000_000));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("56.3").unwrap(), Some(56.3));
        assert_eq!(parse_float(" ").unwrap(), None);
        assert!(parse_float("warm").is_err());
    }
}
