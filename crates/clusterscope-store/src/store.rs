//! MetricsStore — latest metric batches per observed resource.
//!
//! Entries are created by the first `update` for an identity, replaced
//! wholesale by later updates, and dropped by `remove`. Nothing else ever
//! evicts an entry.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use clusterscope_core::{Identify, IdentityResult, MetricBatch, ResourceIdentity, Timestamp};

/// Thread-safe cache of the most recent metric batches for each resource.
///
/// Share it between the watcher and the emitter behind an `Arc`.
///
/// # Concurrency model
///
/// A single `RwLock` guards the whole map. `update` and `remove` hold the
/// write side only for the map mutation itself. `snapshot` re-stamps the
/// cached points in place, so it also takes the write side: snapshots are
/// serialized with each other and with writers.
#[derive(Debug, Default)]
pub struct MetricsStore {
    /// identity → batches from the last update, in update order.
    cache: RwLock<HashMap<ResourceIdentity, Vec<MetricBatch>>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything stored for `obj` with `batches`.
    ///
    /// If no identity can be derived from `obj`, the extraction error is
    /// returned unchanged and the store is not touched.
    pub fn update<O>(&self, obj: &O, batches: Vec<MetricBatch>) -> IdentityResult<()>
    where
        O: Identify + ?Sized,
    {
        let key = obj.identity()?;
        let count = batches.len();
        let replaced = self.write().insert(key.clone(), batches).is_some();
        debug!(identity = %key, batches = count, replaced, "metrics cached");
        Ok(())
    }

    /// Drop the entry for `obj`. Removing an unknown identity is a no-op.
    pub fn remove<O>(&self, obj: &O) -> IdentityResult<()>
    where
        O: Identify + ?Sized,
    {
        let key = obj.identity()?;
        let existed = self.write().remove(&key).is_some();
        debug!(identity = %key, existed, "metrics evicted");
        Ok(())
    }

    /// Return every cached batch with its current points stamped `as_of`.
    ///
    /// The last point of each time-series is re-stamped in the cache itself,
    /// so a resource that has not changed since the previous cycle keeps
    /// reporting its value as current. Order across resources is
    /// unspecified; batches of one resource keep their update order.
    pub fn snapshot(&self, as_of: Timestamp) -> Vec<MetricBatch> {
        let mut cache = self.write();
        let mut out = Vec::with_capacity(cache.values().map(Vec::len).sum());

        for batches in cache.values_mut() {
            for batch in batches.iter_mut() {
                batch.stamp_current(as_of);
                out.push(batch.clone());
            }
        }

        debug!(
            resources = cache.len(),
            batches = out.len(),
            as_of = as_of.seconds,
            "metrics snapshot taken"
        );
        out
    }

    /// Number of resources with cached metrics.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.read().contains_key(identity)
    }

    /// Identities currently cached, in no particular order.
    pub fn identities(&self) -> Vec<ResourceIdentity> {
        self.read().keys().cloned().collect()
    }

    // Every mutation is a single insert or remove, so the map is consistent
    // even if a holder panicked.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ResourceIdentity, Vec<MetricBatch>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ResourceIdentity, Vec<MetricBatch>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterscope_core::{
        IdentityError, Metric, MetricType, Point, PointValue, Resource, ResourceObject, TimeSeries,
    };

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::new(seconds, 0)
    }

    fn pod(uid: &str) -> ResourceObject {
        ResourceObject::new("Pod", format!("pod-{uid}"), uid)
    }

    /// One gauge with a single series holding `values`, stamped t=1, 2, ...
    fn batch(uid: &str, values: &[i64]) -> MetricBatch {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| Point::int64(ts(i as i64 + 1), *v))
            .collect();
        MetricBatch::new(
            Resource::new("k8s").with_label("k8s.pod.uid", uid),
            vec![Metric::new("k8s.container.restarts", MetricType::GaugeInt64)
                .with_series(TimeSeries::new(points))],
        )
    }

    fn last_value(batch: &MetricBatch) -> Option<PointValue> {
        batch.metrics[0].timeseries[0].last_point().map(|p| p.value)
    }

    fn uid_of(batch: &MetricBatch) -> &str {
        &batch.resource.as_ref().unwrap().labels["k8s.pod.uid"]
    }

    #[test]
    fn empty_store_snapshot_is_empty() {
        let store = MetricsStore::new();
        assert!(store.snapshot(ts(100)).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn update_replaces_instead_of_merging() {
        let store = MetricsStore::new();
        let obj = pod("a");

        store.update(&obj, vec![batch("a", &[1]), batch("a", &[2])]).unwrap();
        store.update(&obj, vec![batch("a", &[3])]).unwrap();

        let snap = store.snapshot(ts(100));
        assert_eq!(snap.len(), 1);
        assert_eq!(last_value(&snap[0]), Some(PointValue::Int64(3)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_with_empty_batches_keeps_identity_present() {
        let store = MetricsStore::new();
        let obj = pod("a");
        store.update(&obj, vec![batch("a", &[1])]).unwrap();
        store.update(&obj, Vec::new()).unwrap();

        assert!(store.contains(&ResourceIdentity::new("a")));
        assert!(store.snapshot(ts(100)).is_empty());
    }

    #[test]
    fn batches_keep_update_order() {
        let store = MetricsStore::new();
        store
            .update(&pod("a"), vec![batch("a", &[1]), batch("a", &[2]), batch("a", &[3])])
            .unwrap();

        let values: Vec<_> = store.snapshot(ts(100)).iter().map(last_value).collect();
        assert_eq!(
            values,
            vec![
                Some(PointValue::Int64(1)),
                Some(PointValue::Int64(2)),
                Some(PointValue::Int64(3)),
            ]
        );
    }

    #[test]
    fn remove_is_final_until_readded() {
        let store = MetricsStore::new();
        let obj = pod("a");
        store.update(&pod("b"), vec![batch("b", &[7])]).unwrap();

        store.update(&obj, vec![batch("a", &[1])]).unwrap();
        store.remove(&obj).unwrap();
        let snap = store.snapshot(ts(100));
        assert_eq!(snap.len(), 1);
        assert_eq!(uid_of(&snap[0]), "b");

        store.update(&obj, vec![batch("a", &[9])]).unwrap();
        let snap = store.snapshot(ts(200));
        assert_eq!(snap.len(), 2);
        let a = snap.iter().find(|b| uid_of(b) == "a").unwrap();
        assert_eq!(last_value(a), Some(PointValue::Int64(9)));
    }

    #[test]
    fn remove_of_absent_identity_is_noop() {
        let store = MetricsStore::new();
        store.update(&pod("a"), vec![batch("a", &[1])]).unwrap();

        store.remove(&pod("never-seen")).unwrap();

        assert_eq!(store.identities(), vec![ResourceIdentity::new("a")]);
        assert_eq!(store.snapshot(ts(100)).len(), 1);
    }

    #[test]
    fn extraction_failure_leaves_state_unchanged() {
        let store = MetricsStore::new();
        store.update(&pod("a"), vec![batch("a", &[1])]).unwrap();
        let before = store.snapshot(ts(100));

        let broken = ResourceObject {
            kind: "Pod".to_string(),
            metadata: None,
        };
        let err = store.update(&broken, vec![batch("x", &[5])]).unwrap_err();
        assert_eq!(
            err,
            IdentityError::MissingMetadata {
                kind: "Pod".to_string()
            }
        );
        assert!(store.remove(&broken).is_err());

        assert_eq!(store.snapshot(ts(100)), before);
    }

    #[test]
    fn snapshot_restamps_only_last_point() {
        let store = MetricsStore::new();
        store.update(&pod("a"), vec![batch("a", &[10, 20])]).unwrap();

        let snap = store.snapshot(ts(500));
        let points = &snap[0].metrics[0].timeseries[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, Some(ts(1)));
        assert_eq!(points[0].value, PointValue::Int64(10));
        assert_eq!(points[1].timestamp, Some(ts(500)));
        assert_eq!(points[1].value, PointValue::Int64(20));
    }

    #[test]
    fn repeated_snapshots_advance_cached_timestamp() {
        let store = MetricsStore::new();
        store.update(&pod("a"), vec![batch("a", &[10, 20])]).unwrap();

        let first = store.snapshot(ts(500));
        let second = store.snapshot(ts(560));

        let stamp = |b: &MetricBatch| b.metrics[0].timeseries[0].points[1].timestamp;
        assert_eq!(stamp(&first[0]), Some(ts(500)));
        assert_eq!(stamp(&second[0]), Some(ts(560)));
        // Returned batches are detached from the cache.
        assert_eq!(stamp(&first[0]), Some(ts(500)));
    }

    #[test]
    fn snapshot_tolerates_empty_metric_shapes() {
        let store = MetricsStore::new();
        let hollow = MetricBatch::new(
            Resource::new("k8s"),
            vec![
                Metric::new("no.series", MetricType::GaugeInt64),
                Metric::new("no.points", MetricType::CumulativeDouble)
                    .with_series(TimeSeries::default()),
            ],
        );
        store
            .update(&pod("a"), vec![hollow.clone(), MetricBatch::default()])
            .unwrap();

        let snap = store.snapshot(ts(100));
        assert_eq!(snap, vec![hollow, MetricBatch::default()]);
    }

    #[test]
    fn json_objects_share_keys_with_typed_objects() {
        let store = MetricsStore::new();
        store.update(&pod("a"), vec![batch("a", &[1])]).unwrap();

        let raw = serde_json::json!({"kind": "Pod", "metadata": {"name": "pod-a", "uid": "a"}});
        store.remove(&raw).unwrap();
        assert!(store.is_empty());
    }
}
