//! Data models for Slurm job descriptions.
//!
//! This module provides the field extractor, the typed job record built on
//! it, the value converters they share, and the configuration types.

pub mod config;
pub mod fields;
pub mod job;
pub mod state;
pub mod time;

pub use config::{Config, ConfigError, LoggingConfig, QueueConfig, SystemConfig};
pub use fields::{Field, FieldMap, FieldValue};
pub use job::JobRecord;
pub use state::JobState;
pub use time::{ParseValueError, parse_duration, parse_memory_mb, parse_timestamp};
