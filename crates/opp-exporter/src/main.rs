//! OPP exporter server.
//!
//! Configuration comes from the environment (`OPP_GATEWAY_URL`,
//! `OPP_FETCH_TIMEOUT_SECS`, `OPP_EXPORTER_ADDR`); log filtering from
//! `RUST_LOG`.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opp_exporter::gateway::HttpGateway;
use opp_exporter::{router, Exporter, ExporterConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ExporterConfig::from_env().context("loading configuration")?;
    let gateway = HttpGateway::new(config.fetch_timeout).context("building gateway client")?;
    let bind_addr = config.bind_addr;

    info!(
        %bind_addr,
        gateway = %config.default_gateway,
        timeout_secs = config.fetch_timeout.as_secs(),
        version = %config.version,
        "starting opp-exporter"
    );

    let app = router(Arc::new(Exporter::new(Arc::new(gateway), config)));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
