use std::{net::SocketAddr, sync::Arc};

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::collector::ConsumptionCollector;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(thiserror::Error, Debug)]
pub enum MetricsServerError {
    #[error("invalid metrics bind address '{addr}': {source}")]
    InvalidAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("metrics server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct MetricsServer {
    local_addr: SocketAddr,
    handle: JoinHandle<Result<(), MetricsServerError>>,
}

impl MetricsServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn wait(self) -> Result<(), MetricsServerError> {
        match self.handle.await {
            Ok(res) => res,
            Err(e) => Err(MetricsServerError::Serve(std::io::Error::other(e))),
        }
    }
}

pub fn router(collector: Arc<ConsumptionCollector>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(collector)
}

/// Binds the listener (failure here is fatal to startup) and serves
/// `/metrics` in the background until `shutdown` is cancelled.
pub async fn start(
    bind_addr: &str,
    collector: Arc<ConsumptionCollector>,
    shutdown: CancellationToken,
) -> Result<MetricsServer, MetricsServerError> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|source| MetricsServerError::InvalidAddr {
            addr: bind_addr.to_string(),
            source,
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| MetricsServerError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| MetricsServerError::Bind { addr, source })?;

    tracing::info!(addr = %local_addr, "starting metrics server");

    let app = router(collector);
    let handle = tokio::spawn(async move {
        let res = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
        if let Err(e) = &res {
            tracing::error!(error = %e, "metrics server error");
        }
        res.map_err(MetricsServerError::Serve)
    });

    Ok(MetricsServer { local_addr, handle })
}

async fn metrics_handler(State(collector): State<Arc<ConsumptionCollector>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], collector.render())
}
