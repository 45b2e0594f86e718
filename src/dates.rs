use chrono::{DateTime, FixedOffset, Locale, NaiveDate, NaiveTime};
use thiserror::Error;

/// The display locale is fixed: Brazilian Portuguese month abbreviations,
/// as rendered by the blog.
const LOCALE: Locale = Locale::pt_BR;

#[derive(Debug, Error)]
#[error("not a parseable date: {input:?}")]
pub struct InvalidDateError {
    input: String,
}

/// Parse an ISO-ish timestamp. Accepts RFC 3339, the `+0000`-style offsets
/// the CMS emits, and bare `YYYY-MM-DD` dates (midnight assumed).
fn parse(input: &str) -> Result<DateTime<FixedOffset>, InvalidDateError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(InvalidDateError {
        input: input.to_string(),
    })
}

/// "d MMM yyyy" under the fixed locale, e.g. `25 mar 2021`.
pub fn format_date(input: &str) -> Result<String, InvalidDateError> {
    Ok(parse(input)?
        .format_localized("%-d %b %Y", LOCALE)
        .to_string())
}

/// "HH:mm" from the input's own timestamp, e.g. `10:00`.
pub fn format_hour(input: &str) -> Result<String, InvalidDateError> {
    Ok(parse(input)?.format("%H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_day_month_year() {
        let formatted = format_date("2021-03-25T10:00:00Z").unwrap();
        assert_eq!(formatted, "25 mar 2021");
    }

    #[test]
    fn test_format_date_accepts_compact_offset() {
        let formatted = format_date("2021-03-25T10:00:00+0000").unwrap();
        assert_eq!(formatted, "25 mar 2021");
    }

    #[test]
    fn test_format_date_accepts_bare_date() {
        let formatted = format_date("2021-12-01").unwrap();
        assert_eq!(formatted, "1 dez 2021");
    }

    #[test]
    fn test_format_hour_keeps_input_clock() {
        assert_eq!(format_hour("2021-03-25T10:07:00Z").unwrap(), "10:07");
        assert_eq!(format_hour("2021-03-25T23:59:59+0000").unwrap(), "23:59");
    }

    #[test]
    fn test_unparseable_input_is_an_error() {
        assert!(format_date("yesterday").is_err());
        assert!(format_hour("").is_err());
    }
}
