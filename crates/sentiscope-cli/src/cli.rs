use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sentiscope")]
#[command(author, version, about = "Batch sentiment analysis for customer feedback")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "sentiscope.yaml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Write Prometheus metrics to this file when the command finishes
    #[arg(long, global = true)]
    pub metrics_out: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the model section of the configuration
#[derive(Args, Debug, Default, Clone)]
pub struct ModelArgs {
    /// Load the model from a local directory instead of the Hub
    #[arg(long, global = true, conflicts_with = "lexicon")]
    pub model_dir: Option<PathBuf>,

    /// Use the built-in lexicon model (no download)
    #[arg(long, global = true)]
    pub lexicon: bool,

    /// Inference device (cpu, cuda, metal)
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Rows per model call
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Batches classified concurrently
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install linguistic resources (and optionally fetch the model)
    Init {
        /// Also download and load the configured model
        #[arg(long)]
        model: bool,
    },

    /// Classify texts given on the command line
    Classify {
        /// Texts to classify
        #[arg(required = true)]
        texts: Vec<String>,

        /// Print only the label
        #[arg(long)]
        label_only: bool,

        /// Apply the full normalization pipeline first
        #[arg(long)]
        normalize: bool,
    },

    /// Classify a text column of a CSV file and report statistics
    Analyze {
        /// Input CSV file
        input: PathBuf,

        /// Text column (defaults to pipeline.text_column)
        #[arg(long)]
        column: Option<String>,

        /// Apply the full normalization pipeline first
        #[arg(long)]
        normalize: bool,

        /// Output CSV (defaults to <stem>_sentiment_analysis.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report statistics for an already analyzed CSV file
    Stats {
        /// Analyzed CSV file with sentiment and confidence columns
        input: PathBuf,

        /// Column holding dates for a per-day timeline
        #[arg(long)]
        date_column: Option<String>,

        /// Number of keyword phrases to extract from the text column
        #[arg(long, default_value_t = 0)]
        keywords: usize,

        /// Text column for keyword extraction (defaults to pipeline.text_column)
        #[arg(long)]
        column: Option<String>,

        /// Confidence histogram bins (0 disables)
        #[arg(long, default_value_t = 0)]
        bins: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the text columns of a CSV file
    Columns {
        /// Input CSV file
        input: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
