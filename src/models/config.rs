//! Configuration for slurmtools.
//!
//! Settings come from built-in defaults, then `/etc/slurmtools/config.toml`,
//! then the user's config file, then `SLURMTOOLS_*` environment variables.
//! Invalid values are corrected to defaults with a warning unless
//! `SLURMTOOLS_STRICT_CONFIG` is set, in which case they are errors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SYSTEM_CONFIG_PATH: &str = "/etc/slurmtools/config.toml";
const STRICT_ENV: &str = "SLURMTOOLS_STRICT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config file '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("could not read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,

    pub queue: QueueConfig,

    pub logging: LoggingConfig,
}

/// System configuration for paths and environment
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Path to directory containing Slurm binaries (squeue, scontrol, etc.)
    /// If not set, auto-detected via PATH
    pub slurm_bin_path: Option<PathBuf>,

    /// Where the last submitted job id is remembered
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Seconds between automatic refreshes of the live view
    pub refresh_interval: u64,

    /// Number of queue lines visible at once
    pub window_size: usize,

    /// Lines moved per scroll keypress
    pub scroll_step: usize,

    /// Show every user's jobs by default
    pub show_all: bool,

    /// Color theme of the live view ("dark" or "light")
    pub theme: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 5,
            window_size: 20,
            scroll_step: 1,
            show_all: false,
            theme: "dark".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

/// One config file as written on disk: every key is optional so a file
/// only overrides what it mentions
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    system: SystemConfig,
    queue: QueueOverlay,
    logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueueOverlay {
    refresh_interval: Option<u64>,
    window_size: Option<usize>,
    scroll_step: Option<usize>,
    show_all: Option<bool>,
    theme: Option<String>,
}

impl QueueConfig {
    fn apply(&mut self, overlay: QueueOverlay) {
        if let Some(v) = overlay.refresh_interval {
            self.refresh_interval = v;
        }
        if let Some(v) = overlay.window_size {
            self.window_size = v;
        }
        if let Some(v) = overlay.scroll_step {
            self.scroll_step = v;
        }
        if let Some(v) = overlay.show_all {
            self.show_all = v;
        }
        if let Some(v) = overlay.theme {
            self.theme = v;
        }
    }
}

/// Minimum allowed refresh interval in seconds (prevents tight polling loops)
const MIN_REFRESH_INTERVAL: u64 = 1;

/// Reset `value` to `default` when below `min`, or fail in strict mode
fn validate_minimum<T>(
    value: &mut T,
    name: &str,
    min: T,
    default: T,
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if *value < min {
        if strict {
            return Err(ConfigError::InvalidValue {
                name: format!("queue.{name}"),
                value: value.to_string(),
                reason: format!("must be at least {min}"),
            });
        }
        warnings.push(format!(
            "queue.{name} must be at least {min}, got {value} - using default ({default})"
        ));
        *value = default;
    }
    Ok(())
}

impl QueueConfig {
    /// Validate queue settings, correcting invalid values to defaults.
    /// Returns warnings for every corrected value.
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, ConfigError> {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        validate_minimum(
            &mut self.refresh_interval,
            "refresh_interval",
            MIN_REFRESH_INTERVAL,
            defaults.refresh_interval,
            strict,
            &mut warnings,
        )?;
        validate_minimum(
            &mut self.window_size,
            "window_size",
            1,
            defaults.window_size,
            strict,
            &mut warnings,
        )?;
        validate_minimum(
            &mut self.scroll_step,
            "scroll_step",
            1,
            defaults.scroll_step,
            strict,
            &mut warnings,
        )?;

        Ok(warnings)
    }
}

impl Config {
    /// Get the user config file path, respecting XDG_CONFIG_HOME
    ///
    /// Resolution order:
    /// 1. $XDG_CONFIG_HOME/slurmtools/config.toml (if XDG_CONFIG_HOME is set)
    /// 2. $HOME/.config/slurmtools/config.toml (if HOME is set)
    /// 3. dirs::config_dir()/slurmtools/config.toml
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
            && !xdg_config.is_empty()
        {
            return Some(PathBuf::from(xdg_config).join("slurmtools/config.toml"));
        }

        if let Some(home) = std::env::var_os("HOME") {
            return Some(PathBuf::from(home).join(".config/slurmtools/config.toml"));
        }

        dirs::config_dir().map(|dir| dir.join("slurmtools/config.toml"))
    }

    /// Load configuration from the standard files and the process environment.
    /// Returns the config and any warnings encountered during loading.
    pub fn load() -> Result<(Self, Vec<String>), ConfigError> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
        paths.extend(Self::user_config_path());
        Self::load_from(&paths, |name| std::env::var(name).ok())
    }

    /// Load configuration from `paths` (later files win) and the variables
    /// returned by `env`.
    pub fn load_from(
        paths: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Vec<String>), ConfigError> {
        let strict = env(STRICT_ENV).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let mut config = Self::default();
        let mut warnings = Vec::new();

        for path in paths {
            config.load_config_file(path, strict, &mut warnings)?;
        }

        config.apply_env_overrides(&env, strict, &mut warnings)?;
        warnings.extend(config.queue.validate(strict)?);

        Ok((config, warnings))
    }

    /// Merge one config file. Missing files are expected and silently skipped.
    fn load_config_file(
        &mut self,
        path: &Path,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<ConfigFile>(&content) {
                Ok(parsed) => self.merge(parsed),
                Err(e) => {
                    let err = ConfigError::Parse {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    };
                    if strict {
                        return Err(err);
                    }
                    warnings.push(err.to_string());
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                let err = ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                if strict {
                    return Err(err);
                }
                warnings.push(err.to_string());
            }
        }
        Ok(())
    }

    fn merge(&mut self, other: ConfigFile) {
        self.system.slurm_bin_path = other
            .system
            .slurm_bin_path
            .or(self.system.slurm_bin_path.take());
        self.system.state_file = other.system.state_file.or(self.system.state_file.take());
        self.logging.file = other.logging.file.or(self.logging.file.take());
        self.queue.apply(other.queue);
    }

    fn apply_env_overrides(
        &mut self,
        env: &impl Fn(&str) -> Option<String>,
        strict: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let mut report = |name: &str, value: &str, reason: &str| -> Result<(), ConfigError> {
            let err = ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            };
            if strict {
                return Err(err);
            }
            warnings.push(format!("{err} - using default"));
            Ok(())
        };

        if let Some(val) = env("SLURMTOOLS_SLURM_PATH")
            && !val.is_empty()
        {
            let path = PathBuf::from(&val);
            if path.is_dir() {
                self.system.slurm_bin_path = Some(path);
            } else {
                report("SLURMTOOLS_SLURM_PATH", &val, "not a valid directory")?;
            }
        }

        if let Some(val) = env("SLURMTOOLS_STATE_FILE")
            && !val.is_empty()
        {
            self.system.state_file = Some(PathBuf::from(val));
        }

        if let Some(val) = env("SLURMTOOLS_LOG_FILE")
            && !val.is_empty()
        {
            self.logging.file = Some(PathBuf::from(val));
        }

        if let Some(val) = env("SLURMTOOLS_REFRESH") {
            match val.parse::<u64>() {
                Ok(secs) if secs >= MIN_REFRESH_INTERVAL => self.queue.refresh_interval = secs,
                Ok(_) => report(
                    "SLURMTOOLS_REFRESH",
                    &val,
                    &format!("must be at least {MIN_REFRESH_INTERVAL} second(s)"),
                )?,
                Err(_) => report("SLURMTOOLS_REFRESH", &val, "expected a positive integer (seconds)")?,
            }
        }

        if let Some(val) = env("SLURMTOOLS_WINDOW") {
            match val.parse::<usize>() {
                Ok(rows) if rows >= 1 => self.queue.window_size = rows,
                _ => report("SLURMTOOLS_WINDOW", &val, "expected a positive integer (rows)")?,
            }
        }

        Ok(())
    }

    /// Configured state file with a leading `~` expanded
    #[must_use]
    pub fn state_file(&self) -> Option<PathBuf> {
        self.system.state_file.as_deref().map(expand_tilde)
    }

    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(expand_tilde)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
