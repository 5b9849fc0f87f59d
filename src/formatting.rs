//! Shared formatting utilities used by both CLI and TUI
//!
//! Truncation, duration and memory rendering live here so the summary,
//! the tables and the live viewer all agree on how values look.

use chrono::{NaiveDateTime, TimeDelta};

use crate::models::time::SLURM_TIMESTAMP_FORMAT;

/// Layout constants used across CLI and TUI
pub mod layout {
    pub const NAME_TRUNCATE_LEN: usize = 30;
    pub const PATH_TRUNCATE_LEN: usize = 50;
}

/// Placeholder shown for values that are not known
pub const UNKNOWN: &str = "unknown";

/// Truncate a string to a maximum length (in characters), adding "..." at the end if truncated.
///
/// This function is Unicode-safe and counts characters, not bytes.
///
/// # Examples
/// ```
/// use slurmtools::formatting::truncate_string;
/// assert_eq!(truncate_string("hello", 10), "hello");
/// assert_eq!(truncate_string("hello world", 8), "hello...");
/// ```
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Truncate a path, keeping the end visible.
///
/// # Examples
/// ```
/// use slurmtools::formatting::truncate_path;
/// assert_eq!(truncate_path("/very/long/path/to/file.txt", 15), ".../to/file.txt");
/// ```
#[must_use]
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let char_count = path.chars().count();
    if char_count <= max_len {
        path.to_string()
    } else if max_len <= 3 {
        path.chars().skip(char_count.saturating_sub(max_len)).collect()
    } else {
        let suffix: String = path.chars().skip(char_count.saturating_sub(max_len - 3)).collect();
        format!("...{}", suffix)
    }
}

/// Format duration as HH:MM:SS or D-HH:MM:SS, the way Slurm prints it.
///
/// # Examples
/// ```
/// use slurmtools::formatting::format_duration_hms;
/// assert_eq!(format_duration_hms(3661), "01:01:01");
/// assert_eq!(format_duration_hms(90061), "1-01:01:01");
/// ```
#[must_use]
pub fn format_duration_hms(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours >= 24 {
        let days = hours / 24;
        let remaining_hours = hours % 24;
        format!("{}-{:02}:{:02}:{:02}", days, remaining_hours, minutes, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    }
}

/// Format a possibly negative span in Slurm style; negative spans get a
/// leading `-` (a job past its end time).
#[must_use]
pub fn format_time_delta(delta: TimeDelta) -> String {
    let seconds = delta.num_seconds();
    let formatted = format_duration_hms(seconds.unsigned_abs());
    if seconds < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

/// Format a timestamp back into scontrol's notation
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(SLURM_TIMESTAMP_FORMAT).to_string()
}

/// Format megabytes to human-readable size (input is in MB).
///
/// # Examples
/// ```
/// use slurmtools::formatting::format_bytes_mb;
/// assert_eq!(format_bytes_mb(512), "512M");
/// assert_eq!(format_bytes_mb(1536), "1.5G");
/// ```
#[must_use]
pub fn format_bytes_mb(mb: u64) -> String {
    const GB_IN_MB: u64 = 1024;
    const TB_IN_MB: u64 = 1024 * 1024;

    if mb >= TB_IN_MB {
        format!("{:.1}T", mb as f64 / TB_IN_MB as f64)
    } else if mb >= GB_IN_MB {
        format!("{:.1}G", mb as f64 / GB_IN_MB as f64)
    } else {
        format!("{}M", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abcd", 3), "abc");
    }

    #[test]
    fn test_truncate_string_unicode() {
        let chinese = "\u{4e2d}\u{6587}\u{6d4b}\u{8bd5}\u{5b57}\u{7b26}";
        assert_eq!(truncate_string(chinese, 5), "\u{4e2d}\u{6587}...");
    }

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("/home/user/file.txt", 30), "/home/user/file.txt");
        assert_eq!(truncate_path("/very/long/path/file.txt", 12), ".../file.txt");
        assert_eq!(truncate_path("/a/b", 3), "a/b");
    }

    #[test]
    fn test_format_duration_hms() {
        assert_eq!(format_duration_hms(0), "00:00:00");
        assert_eq!(format_duration_hms(3661), "01:01:01");
        assert_eq!(format_duration_hms(86400), "1-00:00:00");
    }

    #[test]
    fn test_format_time_delta_negative() {
        assert_eq!(format_time_delta(TimeDelta::seconds(-61)), "-00:01:01");
        assert_eq!(format_time_delta(TimeDelta::hours(25)), "1-01:00:00");
    }

    #[test]
    fn test_format_timestamp_matches_scontrol() {
        let ts = crate::models::time::parse_timestamp("2024-03-01T09:15:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01T09:15:00");
    }

    #[test]
    fn test_format_bytes_mb() {
        assert_eq!(format_bytes_mb(512), "512M");
        assert_eq!(format_bytes_mb(1024), "1.0G");
        assert_eq!(format_bytes_mb(1048576), "1.0T");
    }
}
