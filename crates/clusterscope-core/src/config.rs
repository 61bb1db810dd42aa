//! clusterscope.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Emission interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted emission interval (one week).
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterscopeConfig {
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Emission interval, e.g. "10s", "500ms", "2m".
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// JSON-lines event file. `None` or "-" reads stdin.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// "prometheus" (default) or "json".
    pub format: Option<String>,
    /// Output file. `None` or "-" writes stdout.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive string.
    pub filter: Option<String>,
}

/// How emitted snapshots are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SinkFormat {
    #[default]
    Prometheus,
    Json,
}

impl FromStr for SinkFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prometheus" | "prom" => Ok(Self::Prometheus),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for SinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prometheus => f.write_str("prometheus"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl ClusterscopeConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.interval()?;
        config.sink_format()?;
        Ok(config)
    }

    /// Effective emission interval.
    pub fn interval(&self) -> ConfigResult<Duration> {
        match &self.collection.interval {
            Some(s) => parse_duration(s).ok_or_else(|| ConfigError::InvalidDuration(s.clone())),
            None => Ok(DEFAULT_INTERVAL),
        }
    }

    /// Effective sink format.
    pub fn sink_format(&self) -> ConfigResult<SinkFormat> {
        self.sink
            .format
            .as_deref()
            .map(SinkFormat::from_str)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Event source path, `None` meaning stdin.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.path.as_deref().filter(|p| !is_stdio(p))
    }

    /// Sink output path, `None` meaning stdout.
    pub fn sink_path(&self) -> Option<&Path> {
        self.sink.path.as_deref().filter(|p| !is_stdio(p))
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is taken as seconds. Zero is rejected, since tokio
/// intervals panic on a zero period, and so is anything above
/// [`MAX_INTERVAL`].
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let duration = if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }?;
    (!duration.is_zero() && duration <= MAX_INTERVAL).then_some(duration)
}
