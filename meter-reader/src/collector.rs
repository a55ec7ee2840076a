use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use time::OffsetDateTime;

use crate::{sources::MonitorStats, store::ReadingStore};

pub const CONSUMPTION: &str = "consumption";
pub const VALID_READINGS: &str = "rtlamr_valid_reading_count";
pub const INVALID_READINGS: &str = "rtlamr_invalid_reading_count";
pub const MONITOR_UP: &str = "rtlamr_monitor_up";
pub const READING_TIMESTAMP: &str = "meter_reading_timestamp_seconds";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionSample {
    pub meter_id: u64,
    /// Numeric protocol sub-code from the payload, used as the `metertype` label.
    pub meter_type: u32,
    pub consumption: u64,
    pub time: OffsetDateTime,
}

/// Projects the store and monitor counters into a Prometheus exposition.
///
/// Every scrape renders through a fresh recorder, so the output is exactly
/// what the store holds at that moment and nothing is kept between scrapes.
pub struct ConsumptionCollector {
    store: ReadingStore,
    stats: Arc<MonitorStats>,
}

impl ConsumptionCollector {
    pub fn new(store: ReadingStore, stats: Arc<MonitorStats>) -> Self {
        Self { store, stats }
    }

    pub fn collect(&self) -> Vec<ConsumptionSample> {
        self.store
            .snapshot()
            .into_iter()
            .map(|r| ConsumptionSample {
                meter_id: r.message.meter_id,
                meter_type: r.message.protocol_type,
                consumption: r.message.consumption,
                time: r.time,
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || self.record());
        handle.render()
    }

    fn record(&self) {
        describe_counter!(CONSUMPTION, "Energy consumed");
        describe_counter!(VALID_READINGS, "Valid readings received from rtlamr");
        describe_counter!(INVALID_READINGS, "Invalid readings received from rtlamr");
        describe_gauge!(MONITOR_UP, "Whether rtlamr output is still being read");
        describe_gauge!(READING_TIMESTAMP, "Unix time of the latest reading per meter");

        for sample in self.collect() {
            let meter_id = sample.meter_id.to_string();
            counter!(
                CONSUMPTION,
                "meterid" => meter_id.clone(),
                "metertype" => sample.meter_type.to_string()
            )
            .absolute(sample.consumption);
            gauge!(READING_TIMESTAMP, "meterid" => meter_id).set(unix_seconds(sample.time));
        }

        counter!(VALID_READINGS).absolute(self.stats.valid());
        counter!(INVALID_READINGS).absolute(self.stats.invalid());
        gauge!(MONITOR_UP).set(if self.stats.is_running() { 1.0 } else { 0.0 });
    }
}

fn unix_seconds(t: OffsetDateTime) -> f64 {
    t.unix_timestamp_nanos() as f64 / 1e9
}
