//! Configuration for the convsched binary.
//!
//! Loaded from `~/.convsched/config.toml`, or from the file named by
//! `CONVSCHED_CONFIG`. Every section is optional; a missing file is not an
//! error.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "CONVSCHED_CONFIG";

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

#[derive(Debug, Default, Deserialize)]
pub struct ConvschedConfig {
    pub log: Option<LogConfig>,
    pub simulation: Option<SimulationConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Parameters of the simulated migration driven by `convsched run`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Maximum number of monitor ticks before giving up.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Tick from which the migration stops making progress.
    #[serde(default)]
    pub stall_from: u32,
    /// Bytes to transfer in total.
    #[serde(default = "default_data_total")]
    pub data_total: u64,
    /// Bytes transferred per tick while not stalled.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: u64,
    /// Sleep for the schedule's monitor interval between ticks.
    #[serde(default)]
    pub realtime: bool,
}

const fn default_iterations() -> u32 {
    30
}

const fn default_data_total() -> u64 {
    GIB
}

const fn default_bandwidth() -> u64 {
    64 * MIB
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            stall_from: 0,
            data_total: default_data_total(),
            bandwidth: default_bandwidth(),
            realtime: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportConfig {
    /// Envelope version stamped on outgoing records.
    pub version: Option<String>,
}

impl ConvschedConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref().and_then(|log| log.filter.as_deref())
    }

    #[must_use]
    pub fn report_version(&self) -> Option<&str> {
        self.report
            .as_ref()
            .and_then(|report| report.version.as_deref())
    }

    /// Simulation parameters with defaults filled in.
    #[must_use]
    pub fn simulation(&self) -> SimulationConfig {
        self.simulation.clone().unwrap_or_default()
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".convsched").join("config.toml"))
}
