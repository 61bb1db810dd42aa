//! Resource change events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use clusterscope_core::{Identify, IdentityResult, MetricBatch, ResourceIdentity};

/// A change to an observed cluster object.
///
/// `added` and `modified` carry the metric batches computed for the object
/// in its new state; `deleted` only needs the object to find its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceEvent {
    Added {
        object: Value,
        #[serde(default)]
        batches: Vec<MetricBatch>,
    },
    Modified {
        object: Value,
        #[serde(default)]
        batches: Vec<MetricBatch>,
    },
    Deleted {
        object: Value,
    },
}

impl ResourceEvent {
    pub fn object(&self) -> &Value {
        match self {
            Self::Added { object, .. } | Self::Modified { object, .. } | Self::Deleted { object } => {
                object
            }
        }
    }

    /// Event type as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Modified { .. } => "modified",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn identity(&self) -> IdentityResult<ResourceIdentity> {
        self.object().identity()
    }
}
