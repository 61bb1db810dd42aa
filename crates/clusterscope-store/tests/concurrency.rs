//! Concurrent access to a shared MetricsStore.
//!
//! Writers on distinct identities race each other and a snapshot reader;
//! the final map must hold exactly the surviving identities.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::thread;

use clusterscope_core::{
    Metric, MetricBatch, MetricType, Point, PointValue, Resource, ResourceIdentity, ResourceObject, TimeSeries,
    Timestamp,
};
use clusterscope_store::MetricsStore;

const WRITERS: usize = 8;
const OBJECTS_PER_WRITER: usize = 50;

fn object(writer: usize, n: usize) -> ResourceObject {
    let uid = format!("uid-{writer}-{n}");
    ResourceObject::new("Pod", format!("pod-{writer}-{n}"), uid)
}

fn batch(uid: &str, value: i64) -> MetricBatch {
    MetricBatch::new(
        Resource::new("k8s").with_label("k8s.pod.uid", uid),
        vec![Metric::new("k8s.pod.phase", MetricType::GaugeInt64)
            .with_series(TimeSeries::new(vec![Point::int64(Timestamp::new(1, 0), value)]))],
    )
}

#[test]
fn concurrent_writers_keep_exactly_surviving_identities() {
    let store = Arc::new(MetricsStore::new());

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..OBJECTS_PER_WRITER {
                    let obj = object(w, n);
                    let uid = format!("uid-{w}-{n}");
                    store.update(&obj, vec![batch(&uid, 1)]).unwrap();
                    store.update(&obj, vec![batch(&uid, 2), batch(&uid, 3)]).unwrap();
                    // Every third object is deleted again.
                    if n % 3 == 0 {
                        store.remove(&obj).unwrap();
                    }
                }
            })
        })
        .collect();

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..100 {
                let snap = store.snapshot(Timestamp::new(1_000 + i, 0));
                let mut by_uid: HashMap<String, Vec<PointValue>> = HashMap::new();
                for b in &snap {
                    let uid = b.resource.as_ref().unwrap().labels["k8s.pod.uid"].clone();
                    let value = b.metrics[0].timeseries[0].last_point().unwrap().value;
                    by_uid.entry(uid).or_default().push(value);
                }
                // Each entry is the first list or its full replacement.
                for values in by_uid.values() {
                    assert!(
                        values == &[PointValue::Int64(1)]
                            || values == &[PointValue::Int64(2), PointValue::Int64(3)],
                        "partially visible entry: {values:?}"
                    );
                }
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    let expected: BTreeSet<ResourceIdentity> = (0..WRITERS)
        .flat_map(|w| (0..OBJECTS_PER_WRITER).map(move |n| (w, n)))
        .filter(|(_, n)| n % 3 != 0)
        .map(|(w, n)| ResourceIdentity::new(format!("uid-{w}-{n}")))
        .collect();
    let actual: BTreeSet<ResourceIdentity> = store.identities().into_iter().collect();
    assert_eq!(actual, expected);

    let snap = store.snapshot(Timestamp::new(5_000, 0));
    assert_eq!(snap.len(), expected.len() * 2);
    for b in &snap {
        let point = b.metrics[0].timeseries[0].last_point().unwrap();
        assert_eq!(point.timestamp, Some(Timestamp::new(5_000, 0)));
    }
}

#[test]
fn snapshot_after_update_returns_observes_it() {
    let store = Arc::new(MetricsStore::new());
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            store
                .update(&object(0, 0), vec![batch("uid-0-0", 42)])
                .unwrap();
        })
    };
    writer.join().unwrap();

    let snap = store.snapshot(Timestamp::new(10, 0));
    assert_eq!(snap.len(), 1);
}
