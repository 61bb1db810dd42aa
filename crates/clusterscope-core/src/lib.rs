//! clusterscope-core — shared types for the clusterscope metrics cache.
//!
//! Defines the metric data model carried through the pipeline
//! ([`MetricBatch`] and friends), the [`ResourceIdentity`] key derived from
//! observed cluster objects, and the `clusterscope.toml` configuration.

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{ClusterscopeConfig, MAX_INTERVAL, SinkFormat};
pub use error::{ConfigError, ConfigResult, IdentityError, IdentityResult};
pub use identity::{Identify, ObjectMeta, ResourceIdentity, ResourceObject};
pub use types::*;
