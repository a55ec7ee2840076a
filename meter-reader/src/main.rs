use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use meter_domain::domain::Reading;
use meter_reader::{
    cli::Cli,
    collector::ConsumptionCollector,
    config::AppConfig,
    metrics_server, observability,
    pipeline::Pipeline,
    sinks::ReadingStoreSink,
    sources::{MonitorStats, RtlamrMonitor},
    store::ReadingStore,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose);

    let cfg = AppConfig::load(&cli.overrides())?;

    let store = ReadingStore::new();
    let stats = Arc::new(MonitorStats::new());
    let collector = Arc::new(ConsumptionCollector::new(store.clone(), stats.clone()));

    let shutdown = CancellationToken::new();
    let server = metrics_server::start(&cfg.metrics.bind_addr, collector, shutdown.clone()).await?;
    let mut server_done = tokio::spawn(server.wait());

    let pipeline: Pipeline<_, Reading, _> = Pipeline::new(
        RtlamrMonitor::new(cfg.rtlamr.clone(), stats),
        ReadingStoreSink::new(store),
    );

    tokio::select! {
        res = pipeline.run() => {
            res?;
            tracing::warn!("monitor has stopped");
            if let Err(stopped) = cfg.service.check_monitor_stop() {
                tracing::warn!("shutting down http service");
                shutdown.cancel();
                server_done.await??;
                return Err(stopped.into());
            }

            tracing::warn!("serving last known readings until interrupted");
            tokio::select! {
                res = &mut server_done => return Ok(res??),
                _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
            }
        }
        res = &mut server_done => {
            res??;
            tracing::warn!("metrics server has stopped");
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }

    tracing::warn!("shutting down http service");
    shutdown.cancel();
    server_done.await??;

    Ok(())
}
