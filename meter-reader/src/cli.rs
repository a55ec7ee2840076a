use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;

/// Exposes rtlamr meter readings as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "meter-reader", version)]
pub struct Cli {
    /// Increase logging verbosity (-v for info, -vv for debug). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// <address:port> of the rtl_tcp service.
    #[arg(short = 'a', long, env = "METERREADER_RTL_TCP_ADDRESS")]
    pub rtl_tcp_address: Option<String>,

    /// Path to the rtlamr binary.
    #[arg(short = 'p', long, env = "METERREADER_RTLAMR_PATH")]
    pub rtlamr_path: Option<String>,

    /// Optional TOML config file.
    #[arg(short, long, env = "METERREADER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Metrics listen address.
    #[arg(long, env = "METERREADER_METRICS_ADDR")]
    pub metrics_addr: Option<String>,

    /// Keep serving the last known readings after rtlamr stops.
    #[arg(long)]
    pub keep_serving: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            rtl_tcp_address: self.rtl_tcp_address.clone(),
            rtlamr_path: self.rtlamr_path.clone(),
            metrics_addr: self.metrics_addr.clone(),
            keep_serving: self.keep_serving,
        }
    }
}
