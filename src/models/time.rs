//! Typed converters for the time and size values found in scontrol output.
//!
//! scontrol prints durations as `HH:MM:SS` or `D-HH:MM:SS`, timestamps as
//! local `YYYY-MM-DDTHH:MM:SS`, and memory either as plain megabytes or with
//! a unit suffix. Each converter returns a [`ParseValueError`] carrying the
//! original text so callers can keep it as an "unparseable" field.

use chrono::{NaiveDateTime, TimeDelta};

/// Timestamp format used by scontrol (local time, no zone)
pub const SLURM_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Error for a value that was present but could not be converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    input: String,
    expected: &'static str,
}

impl ParseValueError {
    fn new(input: &str, expected: &'static str) -> Self {
        Self {
            input: input.to_string(),
            expected,
        }
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl std::fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid {}", self.input, self.expected)
    }
}

impl std::error::Error for ParseValueError {}

/// Parse a Slurm duration (`D-HH:MM:SS` or `HH:MM:SS`).
///
/// The day segment is only recognised when a `-` separates it from the
/// clock part; without it the leading segment is hours.
pub fn parse_duration(s: &str) -> Result<TimeDelta, ParseValueError> {
    const EXPECTED: &str = "duration ([D-]HH:MM:SS)";
    let err = || ParseValueError::new(s, EXPECTED);

    let trimmed = s.trim();
    let (days, clock) = match trimmed.split_once('-') {
        Some((days, clock)) => (days.parse::<i64>().map_err(|_| err())?, clock),
        None => (0, trimmed),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(err());
    };

    let parse_part = |p: &str, max: i64| -> Result<i64, ParseValueError> {
        if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let value: i64 = p.parse().map_err(|_| err())?;
        if value > max { Err(err()) } else { Ok(value) }
    };

    let hours = parse_part(hours, if days > 0 { 23 } else { i64::MAX / 3600 })?;
    let minutes = parse_part(minutes, 59)?;
    let seconds = parse_part(seconds, 59)?;

    // Out-of-range totals are unparseable, never a panic
    TimeDelta::try_days(days)
        .zip(TimeDelta::try_hours(hours))
        .and_then(|(d, h)| d.checked_add(&h))
        .and_then(|total| total.checked_add(&TimeDelta::try_minutes(minutes)?))
        .and_then(|total| total.checked_add(&TimeDelta::try_seconds(seconds)?))
        .ok_or_else(err)
}

/// Parse an scontrol timestamp such as `2024-03-01T09:15:00`.
///
/// Values like `Unknown` or `None` are reported as errors, not mapped to a
/// made-up date.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, ParseValueError> {
    NaiveDateTime::parse_from_str(s.trim(), SLURM_TIMESTAMP_FORMAT)
        .map_err(|_| ParseValueError::new(s, "timestamp (YYYY-MM-DDTHH:MM:SS)"))
}

/// Parse a memory amount into megabytes.
///
/// A bare number is megabytes (the unit scontrol uses for `Mem=`); `K`, `M`,
/// `G` and `T` suffixes are honoured.
pub fn parse_memory_mb(s: &str) -> Result<u64, ParseValueError> {
    let err = || ParseValueError::new(s, "memory amount");
    let trimmed = s.trim();
    let (number, unit) = match trimmed.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    if number.is_empty() {
        return Err(err());
    }
    let value: u64 = number.parse().map_err(|_| err())?;

    match unit.to_ascii_uppercase().as_str() {
        "" | "M" | "MB" => Ok(value),
        "K" | "KB" => Ok(value / 1024),
        "G" | "GB" => value.checked_mul(1024).ok_or_else(err),
        "T" | "TB" => value.checked_mul(1024 * 1024).ok_or_else(err),
        _ => Err(err()),
    }
}

/// Parse an `ExitCode=<code>:<signal>` value into its two halves
pub fn parse_exit_code(s: &str) -> Result<(i32, i32), ParseValueError> {
    let err = || ParseValueError::new(s, "exit code (CODE:SIGNAL)");
    let (code, signal) = s.trim().split_once(':').ok_or_else(err)?;
    Ok((
        code.parse().map_err(|_| err())?,
        signal.parse().map_err(|_| err())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_with_days() {
        let d = parse_duration("1-02:03:04").unwrap();
        assert_eq!(d.num_seconds(), 86_400 + 2 * 3600 + 3 * 60 + 4);
    }

    #[test]
    fn test_parse_duration_without_days() {
        let d = parse_duration("02:03:04").unwrap();
        assert_eq!(d.num_seconds(), 2 * 3600 + 3 * 60 + 4);
    }

    #[test]
    fn test_parse_duration_day_segment_is_additive() {
        // The same clock part differs by exactly one day with and without `1-`
        for clock in ["00:00:00", "02:03:04", "23:59:59", "12:00:30"] {
            let plain = parse_duration(clock).unwrap();
            let with_day = parse_duration(&format!("1-{clock}")).unwrap();
            assert_eq!(with_day - plain, TimeDelta::days(1), "clock {clock}");
        }
    }

    #[test]
    fn test_parse_duration_long_hours_without_days() {
        assert_eq!(parse_duration("100:00:00").unwrap().num_hours(), 100);
    }

    #[test]
    fn test_parse_duration_invalid() {
        for bad in ["", "UNLIMITED", "Partition_Limit", "1-", "12:00", "aa:bb:cc", "00:61:00", "1-25:00:00", "-01:00:00"] {
            assert!(parse_duration(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        for huge in ["99999999999999-00:00:00", "999999999999999:00:00", "106751991167-23:59:59"] {
            assert!(parse_duration(huge).is_err(), "expected error for {huge:?}");
        }
        assert_eq!(parse_duration("36500-00:00:00").unwrap().num_days(), 36500);
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-01T09:15:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 09:15:00");
    }

    #[test]
    fn test_parse_timestamp_unknown_is_error() {
        let err = parse_timestamp("Unknown").unwrap_err();
        assert_eq!(err.input(), "Unknown");
        assert!(parse_timestamp("None").is_err());
        assert!(parse_timestamp("2024-13-01T00:00:00").is_err());
    }

    #[test]
    fn test_parse_memory_mb() {
        assert_eq!(parse_memory_mb("4096").unwrap(), 4096);
        assert_eq!(parse_memory_mb("4096M").unwrap(), 4096);
        assert_eq!(parse_memory_mb("4G").unwrap(), 4096);
        assert_eq!(parse_memory_mb("2048K").unwrap(), 2);
        assert_eq!(parse_memory_mb("1T").unwrap(), 1024 * 1024);
        assert!(parse_memory_mb("lots").is_err());
        assert!(parse_memory_mb("4X").is_err());
        assert!(parse_memory_mb("").is_err());
    }

    #[test]
    fn test_parse_exit_code() {
        assert_eq!(parse_exit_code("0:0").unwrap(), (0, 0));
        assert_eq!(parse_exit_code("137:9").unwrap(), (137, 9));
        assert!(parse_exit_code("12").is_err());
    }
}
