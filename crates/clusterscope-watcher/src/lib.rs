//! clusterscope-watcher — feeds observed resource changes into the store.
//!
//! Events are JSON lines, one [`ResourceEvent`] per line:
//!
//! ```text
//! {"type":"added","object":{...},"batches":[...]}     → store.update
//! {"type":"modified","object":{...},"batches":[...]}  → store.update
//! {"type":"deleted","object":{...}}                   → store.remove
//! ```
//!
//! Objects whose identity cannot be derived are logged and skipped; the
//! watcher never stops on a bad event.

pub mod error;
pub mod event;
pub mod watcher;

pub use error::{WatcherError, WatcherResult};
pub use event::ResourceEvent;
pub use watcher::{WatchStats, Watcher};
