use serde::Deserialize;
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RtlamrConfig {
    /// `host:port` of the rtl_tcp service rtlamr connects to.
    pub rtl_tcp_address: String,
    /// rtlamr binary; a bare name is resolved through `PATH`.
    pub rtlamr_path: String,
    pub channel_capacity: usize,
}

impl Default for RtlamrConfig {
    fn default() -> Self {
        Self {
            rtl_tcp_address: "127.0.0.1:1234".to_string(),
            rtlamr_path: "rtlamr".to_string(),
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Exit once the monitor stops instead of serving stale metrics.
    pub exit_on_monitor_stop: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            exit_on_monitor_stop: true,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("rtlamr stopped; no further readings will be collected")]
pub struct MonitorStopped;

impl ServiceConfig {
    /// Whether a stopped monitor should end the process with an error.
    pub fn check_monitor_stop(&self) -> Result<(), MonitorStopped> {
        if self.exit_on_monitor_stop {
            Err(MonitorStopped)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub rtlamr: RtlamrConfig,
    pub metrics: MetricsConfig,
    pub service: ServiceConfig,
}

/// Values taken from the command line or environment; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub rtl_tcp_address: Option<String>,
    pub rtlamr_path: Option<String>,
    pub metrics_addr: Option<String>,
    pub keep_serving: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Builds the effective configuration: defaults, then the optional file,
    /// then overrides. The result is validated.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut cfg = match &overrides.config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = &overrides.rtl_tcp_address {
            cfg.rtlamr.rtl_tcp_address = addr.clone();
        }
        if let Some(path) = &overrides.rtlamr_path {
            cfg.rtlamr.rtlamr_path = path.clone();
        }
        if let Some(addr) = &overrides.metrics_addr {
            cfg.metrics.bind_addr = addr.clone();
        }
        if overrides.keep_serving {
            cfg.service.exit_on_monitor_stop = false;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.rtlamr.rtl_tcp_address)?;

        if self.rtlamr.rtlamr_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "rtlamr_path",
                reason: "must not be empty".to_string(),
            });
        }

        if self.rtlamr.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "channel_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }

        self.metrics
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                field: "metrics bind_addr",
                reason: format!("'{}': {e}", self.metrics.bind_addr),
            })?;

        Ok(())
    }
}

fn validate_endpoint(addr: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        field: "rtl_tcp_address",
        reason,
    };

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| invalid(format!("'{addr}' is not host:port")))?;

    if host.is_empty() {
        return Err(invalid(format!("'{addr}' has an empty host")));
    }

    port.parse::<u16>()
        .map_err(|e| invalid(format!("'{addr}' has an invalid port: {e}")))?;

    Ok(())
}
