//! Sentiscope
//!
//! Batch sentiment analysis of customer feedback: five-point labels with
//! confidence for every row of a CSV column, plus distribution statistics.

use anyhow::Result;
use clap::Parser;
use sentiscope_cli::telemetry::{init_metrics, init_tracing, write_metrics};
use sentiscope_cli::{commands, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let metrics = match &cli.metrics_out {
        Some(_) => Some(init_metrics()?),
        None => None,
    };

    let result = commands::run(&cli).await;

    if let (Some(handle), Some(path)) = (&metrics, &cli.metrics_out) {
        write_metrics(handle, path)?;
    }

    result
}
