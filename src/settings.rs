use std::path::PathBuf;

use cpuident_base::EnumFromNameT;
use cpuident_logging::{log_error, log_warning, LogLevel};
use serde::{Deserialize, Deserializer};

use crate::LOG_CAT;

/// Logging settings, `[log]` table
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogSettings {
    /// Maximum level that will be logged
    #[serde(deserialize_with = "deserialize_level")]
    pub level        : LogLevel,
    /// Optional file all log output is also written to
    pub file         : Option<PathBuf>,
    /// Flush after every message
    pub always_flush : bool,
    /// Echo log output to the console
    pub console      : bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Warning,
            file: None,
            always_flush: false,
            console: true,
        }
    }
}

/// Report settings, `[output]` table
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputSettings {
    /// Dump the raw register data after the report
    pub raw      : bool,
    /// Print the feature list one feature per line
    pub features : bool,
}

/// Application settings
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log    : LogSettings,
    pub output : OutputSettings,
}

impl Settings {
    pub fn load(toml: &str) -> Option<Settings> {
        match toml::from_str(toml) {
            Ok(settings) => Some(settings),
            Err(err) => {
                log_error!(LOG_CAT, Self::load, "Failed to parse settings, err: {}", err);
                None
            }
        }
    }
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(LogLevel::parse(&name).unwrap_or_else(|| {
        log_warning!(LOG_CAT, "Unknown log level '{}', falling back to 'warning'", name);
        LogLevel::Warning
    }))
}
