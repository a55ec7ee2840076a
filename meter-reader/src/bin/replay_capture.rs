use anyhow::{bail, Context, Result};
use meter_domain::domain::Reading;
use meter_reader::{
    collector::ConsumptionCollector,
    observability,
    pipeline::Pipeline,
    sinks::ReadingStoreSink,
    sources::{LineReaderSource, MonitorStats},
    store::ReadingStore,
};
use std::{env, sync::Arc};
use tokio::io::BufReader;

/// Replays a captured `rtlamr -format=json` log and prints the resulting
/// exposition, which is handy for checking a capture against a dashboard.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing(0);

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: replay_capture <rtlamr_json_log>");
    }
    let file_path = &args[1];

    let file = tokio::fs::File::open(file_path)
        .await
        .with_context(|| format!("failed to open {file_path}"))?;

    let store = ReadingStore::new();
    let stats = Arc::new(MonitorStats::new());
    let source = LineReaderSource::new(BufReader::new(file), stats.clone(), 1024);

    let pipeline: Pipeline<_, Reading, _> = Pipeline::new(source, ReadingStoreSink::new(store.clone()));
    pipeline.run().await?;

    eprintln!(
        "{} valid, {} invalid, {} meters",
        stats.valid(),
        stats.invalid(),
        store.len()
    );
    print!("{}", ConsumptionCollector::new(store, stats).render());

    Ok(())
}
