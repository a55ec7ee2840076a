use std::time::SystemTime;

use futures::StreamExt;
use meter_domain::domain::Reading;

use crate::{
    pipeline::{Envelope, PipelineError, Sink},
    store::ReadingStore,
};

/// The single writer into the `ReadingStore`.
pub struct ReadingStoreSink {
    store: ReadingStore,
}

impl ReadingStoreSink {
    pub fn new(store: ReadingStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Sink<Reading> for ReadingStoreSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for ReadingStoreSink");
                    continue;
                }
            };

            let reading = env.payload;
            let queued = SystemTime::now()
                .duration_since(env.received_at)
                .unwrap_or_default();
            tracing::trace!(
                meter_id = reading.meter_id(),
                consumption = reading.message.consumption,
                meter_type = %reading.meter_type,
                queued_ms = queued.as_millis() as u64,
                "storing reading"
            );

            self.store.upsert(reading.meter_id(), reading);
        }

        tracing::warn!("reading stream ended; store will no longer be updated");
        Ok(())
    }
}
