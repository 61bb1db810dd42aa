//! Downstream consumers of emitted snapshots.

use std::future::Future;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use clusterscope_core::{MetricBatch, SinkFormat};

use crate::error::{SinkError, SinkResult};
use crate::prometheus::render_prometheus;

/// The next pipeline stage after the metrics store.
///
/// Receives every snapshot as-is; the store knows nothing about how it is
/// exported.
pub trait MetricsSink: Send {
    fn consume(&mut self, batches: Vec<MetricBatch>) -> impl Future<Output = SinkResult<()>> + Send;
}

/// Writes each snapshot to an [`AsyncWrite`] as Prometheus text or JSON lines.
pub struct WriterSink<W> {
    writer: W,
    format: SinkFormat,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, format: SinkFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&self, batches: &[MetricBatch]) -> SinkResult<String> {
        match self.format {
            // A blank line separates consecutive expositions.
            SinkFormat::Prometheus => Ok(render_prometheus(batches) + "\n"),
            SinkFormat::Json => {
                let mut out = String::new();
                for batch in batches {
                    let line =
                        serde_json::to_string(batch).map_err(|e| SinkError::Encode(e.to_string()))?;
                    out.push_str(&line);
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}

impl<W> MetricsSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn consume(&mut self, batches: Vec<MetricBatch>) -> SinkResult<()> {
        let rendered = self.render(&batches)?;
        self.writer
            .write_all(rendered.as_bytes())
            .await
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }
}

/// Forwards each snapshot over an mpsc channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<MetricBatch>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Vec<MetricBatch>>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end for a channel of `capacity` snapshots.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<MetricBatch>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl MetricsSink for ChannelSink {
    async fn consume(&mut self, batches: Vec<MetricBatch>) -> SinkResult<()> {
        self.tx.send(batches).await.map_err(|_| SinkError::Closed)
    }
}
