use std::sync::Arc;

use futures::StreamExt;
use meter_domain::domain::Reading;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::{mpsc, Mutex},
};
use tokio_stream::wrappers::ReceiverStream;

use super::stats::{MonitorState, MonitorStats};
use crate::{
    decode::decode_line,
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Reads decoder output line by line, forwarding every decodable reading.
///
/// Undecodable lines are counted and skipped. Returns when the reader hits
/// end of stream, or early if the receiving side has gone away.
pub(crate) async fn pump_lines<R>(
    reader: R,
    tx: &mpsc::Sender<Envelope<Reading>>,
    stats: &MonitorStats,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut segments = reader.split(b'\n');

    while let Some(line) = segments.next_segment().await? {
        match decode_line(&line) {
            Ok(reading) => {
                stats.record_valid();
                if tx.send(Envelope::now(reading)).await.is_err() {
                    tracing::warn!("reading consumer closed; no longer reading decoder output");
                    return Ok(());
                }
            }
            Err(e) => {
                stats.record_invalid();
                tracing::debug!(error = %e, "rejected decoder line");
            }
        }
    }

    Ok(())
}

/// Source over any buffered reader of decoder output, such as a captured
/// `rtlamr -format=json` log. Single consumer.
pub struct LineReaderSource<R> {
    reader: Mutex<Option<R>>,
    stats: Arc<MonitorStats>,
    channel_capacity: usize,
}

impl<R> LineReaderSource<R> {
    pub fn new(reader: R, stats: Arc<MonitorStats>, channel_capacity: usize) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            stats,
            channel_capacity,
        }
    }
}

#[async_trait::async_trait]
impl<R> Source<Reading> for LineReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn stream(&self) -> Result<EnvelopeStream<Reading>, PipelineError> {
        let reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| PipelineError::Source("line reader already consumed".to_string()))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let stats = self.stats.clone();
        stats.advance(MonitorState::Running);

        tokio::spawn(async move {
            if let Err(e) = pump_lines(reader, &tx, &stats).await {
                tracing::error!(error = %e, "failed reading decoder output");
            }
            stats.advance(MonitorState::Stopped);
            drop(tx);
        });

        Ok(Box::pin(ReceiverStream::new(rx).map(Ok::<_, PipelineError>)))
    }
}
