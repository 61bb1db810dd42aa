//! Watcher — replays resource events into the metrics store.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use clusterscope_store::MetricsStore;

use crate::error::{WatcherError, WatcherResult};
use crate::event::ResourceEvent;

/// Running totals for a watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Events applied to the store.
    pub applied: u64,
    /// Malformed lines and objects without a usable identity.
    pub skipped: u64,
}

/// Applies [`ResourceEvent`]s to a shared [`MetricsStore`].
pub struct Watcher {
    store: Arc<MetricsStore>,
    stats: WatchStats,
}

impl Watcher {
    pub fn new(store: Arc<MetricsStore>) -> Self {
        Self {
            store,
            stats: WatchStats::default(),
        }
    }

    pub fn stats(&self) -> WatchStats {
        self.stats
    }

    /// Apply one event. Returns false if the object had no usable identity.
    pub fn apply(&mut self, event: ResourceEvent) -> bool {
        let kind = event.kind();
        let result = match event {
            ResourceEvent::Added { object, batches } | ResourceEvent::Modified { object, batches } => {
                self.store.update(&object, batches)
            }
            ResourceEvent::Deleted { object } => self.store.remove(&object),
        };

        match result {
            Ok(()) => {
                self.stats.applied += 1;
                true
            }
            Err(e) => {
                warn!(event = kind, error = %e, "skipping event without resource identity");
                self.stats.skipped += 1;
                false
            }
        }
    }

    /// Parse and apply one JSON line. Blank lines are ignored.
    pub fn apply_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }
        match serde_json::from_str::<ResourceEvent>(line) {
            Ok(event) => self.apply(event),
            Err(e) => {
                warn!(error = %e, "skipping malformed event");
                self.stats.skipped += 1;
                false
            }
        }
    }

    /// Read JSON-lines events from `reader` until EOF or shutdown.
    pub async fn run<R>(
        &mut self,
        reader: R,
        mut shutdown: watch::Receiver<bool>,
    ) -> WatcherResult<WatchStats>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("watcher started");
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.map_err(|e| WatcherError::Read(e.to_string()))? {
                        Some(line) => {
                            self.apply_line(&line);
                        }
                        None => {
                            debug!("event source exhausted");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("watcher shutting down");
                    break;
                }
            }
        }

        info!(
            applied = self.stats.applied,
            skipped = self.stats.skipped,
            "watcher stopped"
        );
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterscope_core::{ResourceIdentity, Timestamp};

    fn watcher() -> (Watcher, Arc<MetricsStore>) {
        let store = Arc::new(MetricsStore::new());
        (Watcher::new(store.clone()), store)
    }

    const ADD_A: &str = r#"{"type":"added","object":{"kind":"Pod","metadata":{"uid":"a"}},"batches":[{"metrics":[]}]}"#;
    const ADD_B: &str = r#"{"type":"added","object":{"kind":"Pod","metadata":{"uid":"b"}},"batches":[{"metrics":[]},{"metrics":[]}]}"#;
    const DEL_A: &str = r#"{"type":"deleted","object":{"kind":"Pod","metadata":{"uid":"a"}}}"#;
    const NO_UID: &str = r#"{"type":"modified","object":{"kind":"Pod","metadata":{"name":"x"}},"batches":[]}"#;

    #[test]
    fn add_and_delete_events_drive_store() {
        let (mut w, store) = watcher();

        assert!(w.apply_line(ADD_A));
        assert!(w.apply_line(ADD_B));
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot(Timestamp::new(1, 0)).len(), 3);

        assert!(w.apply_line(DEL_A));
        assert!(!store.contains(&ResourceIdentity::new("a")));
        assert_eq!(w.stats(), WatchStats { applied: 3, skipped: 0 });
    }

    #[test]
    fn bad_events_are_skipped() {
        let (mut w, store) = watcher();
        w.apply_line(ADD_A);

        assert!(!w.apply_line(NO_UID));
        assert!(!w.apply_line("{not json"));
        assert!(!w.apply_line("   "));

        assert_eq!(store.identities(), vec![ResourceIdentity::new("a")]);
        assert_eq!(w.stats(), WatchStats { applied: 1, skipped: 2 });
    }

    #[tokio::test]
    async fn run_reads_until_eof() {
        let (mut w, store) = watcher();
        let input = format!("{ADD_A}\n{ADD_B}\n\ngarbage\n{DEL_A}\n");
        let (_tx, rx) = watch::channel(false);

        let stats = w.run(input.as_bytes(), rx).await.unwrap();

        assert_eq!(stats, WatchStats { applied: 3, skipped: 1 });
        assert_eq!(store.identities(), vec![ResourceIdentity::new("b")]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (mut w, _store) = watcher();
        // A duplex stream never reaches EOF while the writer half is alive.
        let (reader, _writer) = tokio::io::duplex(64);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            w.run(tokio::io::BufReader::new(reader), rx).await
        });
        tx.send(true).unwrap();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, WatchStats::default());
    }
}
