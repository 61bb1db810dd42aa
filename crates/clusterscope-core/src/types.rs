//! Metric data model.
//!
//! A [`MetricBatch`] is everything known about one observed resource at
//! the time its metrics were last computed: an optional resource
//! descriptor plus an ordered list of [`Metric`]s. Each metric carries one
//! or more [`TimeSeries`], and the last [`Point`] of a series is the
//! "current" value that gets re-stamped on every emission.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i64 = 1_000_000_000;

// ── Timestamp ──────────────────────────────────────────────────────

/// Point in time as seconds + nanoseconds since the Unix epoch.
///
/// `nanos` is always normalized to `0..1_000_000_000`, so pre-epoch
/// instants carry a negative `seconds` and a positive `nanos`. Deserialized
/// values are normalized the same way as [`Timestamp::new`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "RawTimestamp")]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

#[derive(Deserialize)]
struct RawTimestamp {
    #[serde(default)]
    seconds: i64,
    #[serde(default)]
    nanos: i32,
}

impl From<RawTimestamp> for Timestamp {
    fn from(raw: RawTimestamp) -> Self {
        Self::new(raw.seconds, raw.nanos)
    }
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let total = seconds as i128 * NANOS_PER_SEC as i128 + nanos as i128;
        Self::from_nanos(total)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Milliseconds since the epoch (Prometheus sample timestamps).
    pub fn as_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanos) / 1_000_000
    }

    fn from_nanos(total: i128) -> Self {
        let secs = total.div_euclid(NANOS_PER_SEC as i128);
        let nanos = total.rem_euclid(NANOS_PER_SEC as i128);
        Self {
            seconds: secs as i64,
            nanos: nanos as i32,
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::from_nanos(d.as_nanos() as i128),
            Err(e) => Self::from_nanos(-(e.duration().as_nanos() as i128)),
        }
    }
}

// ── Resource ───────────────────────────────────────────────────────

/// Immutable description of the entity a batch of metrics belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type, e.g. "k8s".
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Builder method: add a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

// ── Metric ─────────────────────────────────────────────────────────

/// Kind of value a metric reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    GaugeInt64,
    GaugeDouble,
    CumulativeInt64,
    CumulativeDouble,
}

impl MetricType {
    pub fn is_cumulative(&self) -> bool {
        matches!(self, Self::CumulativeInt64 | Self::CumulativeDouble)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Label keys, positionally matched with each series' `label_values`.
    #[serde(default)]
    pub label_keys: Vec<String>,
}

/// A single metric and its time-series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub descriptor: MetricDescriptor,
    #[serde(default)]
    pub timeseries: Vec<TimeSeries>,
}

impl Metric {
    /// Build a metric with no label keys and no series.
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            descriptor: MetricDescriptor {
                name: name.into(),
                description: String::new(),
                unit: String::new(),
                metric_type,
                label_keys: Vec::new(),
            },
            timeseries: Vec::new(),
        }
    }

    /// Builder method: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.descriptor.description = description.into();
        self
    }

    /// Builder method: append a series.
    pub fn with_series(mut self, series: TimeSeries) -> Self {
        self.timeseries.push(series);
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(default)]
    pub start_timestamp: Option<Timestamp>,
    /// `None` marks a label that has no value for this series.
    #[serde(default)]
    pub label_values: Vec<Option<String>>,
    #[serde(default)]
    pub points: Vec<Point>,
}

impl TimeSeries {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            start_timestamp: None,
            label_values: Vec::new(),
            points,
        }
    }

    /// The most recent point, if the series has any.
    pub fn last_point(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn last_point_mut(&mut self) -> Option<&mut Point> {
        self.points.last_mut()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    pub value: PointValue,
}

impl Point {
    pub fn int64(timestamp: Timestamp, value: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
            value: PointValue::Int64(value),
        }
    }

    pub fn double(timestamp: Timestamp, value: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            value: PointValue::Double(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointValue {
    Int64(i64),
    Double(f64),
}

// ── MetricBatch ────────────────────────────────────────────────────

/// Metrics computed for one resource, with the resource they describe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricBatch {
    #[serde(default)]
    pub resource: Option<Resource>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl MetricBatch {
    pub fn new(resource: Resource, metrics: Vec<Metric>) -> Self {
        Self {
            resource: Some(resource),
            metrics,
        }
    }

    /// Rewrite the timestamp of the last point of every series to `at`.
    ///
    /// Earlier points are left untouched. Metrics without series and
    /// series without points are skipped.
    pub fn stamp_current(&mut self, at: Timestamp) {
        for series in self.metrics.iter_mut().flat_map(|m| m.timeseries.iter_mut()) {
            if let Some(point) = series.last_point_mut() {
                point.timestamp = Some(at);
            }
        }
    }
}
