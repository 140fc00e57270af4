//! Duration parsing for query parameters and settings.
//!
//! Accepted forms:
//! - `humantime`: `100ms`, `10s`, `1h 30m`
//! - ISO 8601: `PT10S`, `PT1H30M`
//! - a bare `0`, meaning no delay

use std::time::Duration;

/// Parse a duration string.
///
/// Tries humantime first, then ISO 8601.
///
/// # Errors
///
/// Returns a human readable message when neither format matches.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    if let Ok(d) = iso8601_duration::Duration::parse(s) {
        if let Some(std_duration) = d.to_std() {
            return Ok(std_duration);
        }
    }

    Err(format!(
        "invalid duration '{s}': expected humantime (10s) or ISO 8601 (PT10S)"
    ))
}

/// Format a duration the way [`parse_duration`] reads it back.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_humantime() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_iso8601() {
        assert_eq!(parse_duration("PT10S").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_bare_zero_disables() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_format_is_readable() {
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(
            parse_duration(&format_duration(Duration::from_millis(1500))).unwrap(),
            Duration::from_millis(1500)
        );
    }
}
