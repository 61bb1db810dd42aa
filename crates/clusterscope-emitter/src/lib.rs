//! clusterscope-emitter — pushes the cached metrics downstream on a timer.
//!
//! # Architecture
//!
//! ```text
//! Emitter
//!   ├── tick(now) → store.snapshot(now) → sink.consume(batches)
//!   └── run()     → tick every interval until shutdown
//!
//! Sinks
//!   ├── WriterSink  → Prometheus text or JSON lines on any AsyncWrite
//!   └── ChannelSink → mpsc hand-off to the next pipeline stage
//! ```

pub mod emitter;
pub mod error;
pub mod prometheus;
pub mod sink;

pub use emitter::Emitter;
pub use error::{SinkError, SinkResult};
pub use prometheus::render_prometheus;
pub use sink::{ChannelSink, MetricsSink, WriterSink};
