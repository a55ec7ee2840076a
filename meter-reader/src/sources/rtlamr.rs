use std::{
    process::Stdio,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::StreamExt;
use meter_domain::domain::Reading;
use tokio::{
    io::BufReader,
    process::{Child, ChildStdout, Command},
    sync::mpsc,
};
use tokio_stream::wrappers::ReceiverStream;

use super::{
    lines::pump_lines,
    stats::{MonitorState, MonitorStats},
};
use crate::{
    config::RtlamrConfig,
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Message types requested from rtlamr. Both carry the same logical fields.
pub const MSG_TYPES: &str = "scm,scm+";

/// How long to wait for rtlamr to exit once it has closed stdout.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs rtlamr as a child process and streams the readings it decodes.
///
/// The child is started by the first call to `stream()` and is not
/// restarted: when its output ends the stream ends and the stats move to
/// `Stopped`. What to do about that is up to the caller.
pub struct RtlamrMonitor {
    config: RtlamrConfig,
    stats: Arc<MonitorStats>,
    reap_timeout: Duration,
    started: AtomicBool,
}

impl RtlamrMonitor {
    pub fn new(config: RtlamrConfig, stats: Arc<MonitorStats>) -> Self {
        Self {
            config,
            stats,
            reap_timeout: REAP_TIMEOUT,
            started: AtomicBool::new(false),
        }
    }

    pub fn with_reap_timeout(mut self, reap_timeout: Duration) -> Self {
        self.reap_timeout = reap_timeout;
        self
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            format!("-msgtype={MSG_TYPES}"),
            "-format=json".to_string(),
            format!("-server={}", self.config.rtl_tcp_address),
        ]
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.rtlamr_path);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self) -> Result<(Child, ChildStdout), PipelineError> {
        let mut child = self.command().spawn().map_err(|e| {
            PipelineError::Source(format!(
                "failed to start rtlamr ({}): {e}",
                self.config.rtlamr_path
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Source("rtlamr stdout was not captured".to_string()))?;

        Ok((child, stdout))
    }
}

#[async_trait::async_trait]
impl Source<Reading> for RtlamrMonitor {
    async fn stream(&self) -> Result<EnvelopeStream<Reading>, PipelineError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::Source("rtlamr monitor already started".to_string()));
        }

        tracing::info!(
            server = %self.config.rtl_tcp_address,
            path = %self.config.rtlamr_path,
            "start reading from rtl_tcp"
        );

        let (child, stdout) = match self.spawn() {
            Ok(spawned) => spawned,
            Err(e) => {
                tracing::error!(error = %e, "rtlamr could not be started");
                self.stats.advance(MonitorState::Stopped);
                return Err(e);
            }
        };

        self.stats.advance(MonitorState::Running);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        tokio::spawn(supervise(child, stdout, tx, self.stats.clone(), self.reap_timeout));

        Ok(Box::pin(ReceiverStream::new(rx).map(Ok::<_, PipelineError>)))
    }
}

async fn supervise(
    mut child: Child,
    stdout: ChildStdout,
    tx: mpsc::Sender<Envelope<Reading>>,
    stats: Arc<MonitorStats>,
    reap_timeout: Duration,
) {
    if let Err(e) = pump_lines(BufReader::new(stdout), &tx, &stats).await {
        tracing::error!(error = %e, "failed reading rtlamr output");
    }

    match tokio::time::timeout(reap_timeout, child.wait()).await {
        Ok(Ok(status)) => tracing::warn!(%status, "rtlamr has stopped"),
        Ok(Err(e)) => tracing::warn!(error = %e, "rtlamr has stopped; exit status unavailable"),
        Err(_) => {
            tracing::warn!("rtlamr closed its output but kept running; killing it");
            if let Err(e) = child.kill().await {
                tracing::error!(error = %e, "failed to kill rtlamr");
            }
        }
    }

    stats.advance(MonitorState::Stopped);
    drop(tx);
}
