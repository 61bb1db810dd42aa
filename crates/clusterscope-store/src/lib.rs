//! clusterscope-store — the cache between cluster events and metric emission.
//!
//! Cluster events arrive whenever objects change; metrics must be emitted
//! on a fixed interval whether or not anything changed. [`MetricsStore`]
//! holds the latest metric batches per resource and hands out a full,
//! freshly stamped snapshot on every emission cycle.
//!
//! # Architecture
//!
//! ```text
//! watcher ──► update(obj, batches) ─┐
//!         └─► remove(obj) ──────────┤
//!                                   ▼
//!                      RwLock<HashMap<ResourceIdentity, Vec<MetricBatch>>>
//!                                   │
//! emitter ◄── snapshot(now) ────────┘  (last point of every series ← now)
//! ```

pub mod store;

pub use store::MetricsStore;
