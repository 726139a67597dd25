//! Logging and metrics setup

use crate::cli::LogFormat;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging to stderr
pub fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("sentiscope=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentiscope=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Install the Prometheus recorder and describe pipeline metrics
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {}", e))?;

    metrics::describe_counter!(
        "sentiscope_rows_classified_total",
        "Rows classified, including degenerate inputs"
    );
    metrics::describe_counter!(
        "sentiscope_rows_dropped_total",
        "Rows dropped because normalization left them empty"
    );
    metrics::describe_counter!(
        "sentiscope_degenerate_inputs_total",
        "Missing or blank inputs resolved without the model"
    );
    metrics::describe_histogram!(
        "sentiscope_batch_latency_us",
        metrics::Unit::Microseconds,
        "Classification latency per batch in microseconds"
    );

    tracing::debug!("Metrics recorder installed");
    Ok(handle)
}

/// Write the rendered exposition text to `path`
pub fn write_metrics(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    std::fs::write(path, handle.render())
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    tracing::info!("Metrics written to {}", path.display());
    Ok(())
}
