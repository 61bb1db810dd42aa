//! Effective daemon settings: config file values with CLI overrides applied.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clusterscope_core::{ClusterscopeConfig, ConfigResult, SinkFormat};

/// Default `EnvFilter` directives when neither `RUST_LOG` nor the config
/// file set one.
pub const DEFAULT_LOG_FILTER: &str = "info,clusterscope=debug";

/// Values given on the command line. `None` falls back to the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub events: Option<PathBuf>,
    pub interval: Option<String>,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub interval: Duration,
    pub format: SinkFormat,
    /// `None` reads events from stdin.
    pub events: Option<PathBuf>,
    /// `None` writes metrics to stdout.
    pub output: Option<PathBuf>,
    pub log_filter: String,
}

impl Settings {
    pub fn resolve(mut config: ClusterscopeConfig, overrides: Overrides) -> ConfigResult<Self> {
        if overrides.interval.is_some() {
            config.collection.interval = overrides.interval;
        }
        if overrides.format.is_some() {
            config.sink.format = overrides.format;
        }
        if overrides.events.is_some() {
            config.source.path = overrides.events;
        }
        if overrides.output.is_some() {
            config.sink.path = overrides.output;
        }

        Ok(Self {
            interval: config.interval()?,
            format: config.sink_format()?,
            events: config.source_path().map(PathBuf::from),
            output: config.sink_path().map(PathBuf::from),
            log_filter: config
                .log
                .filter
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_std = |p: &Option<PathBuf>, fallback: &str| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| fallback.to_string())
        };
        writeln!(f, "interval:   {:?}", self.interval)?;
        writeln!(f, "format:     {}", self.format)?;
        writeln!(f, "events:     {}", or_std(&self.events, "<stdin>"))?;
        writeln!(f, "output:     {}", or_std(&self.output, "<stdout>"))?;
        write!(f, "log filter: {}", self.log_filter)
    }
}
