//! Subcommand handlers

use crate::cli::{Cli, Commands, ModelArgs};
use crate::csv_io::{default_output_path, read_table, write_table};
use crate::report::AnalysisReport;
use anyhow::{bail, Context, Result};
use sentiscope_classifiers::{
    load_model, BatchPipeline, LinguisticResources, ModelSource, SentimentClassifier,
    SentiscopeConfig, TextNormalizer,
};
use sentiscope_core::{AnalysisTable, Cell};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Run the parsed command line
pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config, &cli.model)?;

    match &cli.command {
        Commands::Init { model } => init(&config, *model).await,
        Commands::Classify {
            texts,
            label_only,
            normalize,
        } => classify(&config, texts, *label_only, *normalize).await,
        Commands::Analyze {
            input,
            column,
            normalize,
            output,
            json,
        } => {
            let column = column.as_deref().unwrap_or(&config.pipeline.text_column);
            let normalize = *normalize || config.pipeline.normalize;
            let output = output.clone().unwrap_or_else(|| default_output_path(input));
            let report = analyze(&config, input, column, normalize, &output).await?;
            print_report(&report, *json)
        }
        Commands::Stats {
            input,
            date_column,
            keywords,
            column,
            bins,
            json,
        } => {
            let column = column.as_deref().unwrap_or(&config.pipeline.text_column);
            let report = stats(&config, input, date_column.as_deref(), *keywords, column, *bins)?;
            print_report(&report, *json)
        }
        Commands::Columns { input } => {
            for column in columns(input)? {
                println!("{}", column);
            }
            Ok(())
        }
    }
}

/// Load the YAML configuration and apply command-line overrides
pub fn load_config(path: &Path, overrides: &ModelArgs) -> Result<SentiscopeConfig> {
    let mut config = SentiscopeConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if overrides.lexicon {
        config.model.source = ModelSource::Lexicon;
    }
    if let Some(dir) = &overrides.model_dir {
        config.model.source = ModelSource::Local { path: dir.clone() };
    }
    if let Some(device) = &overrides.device {
        config.model.device = device.clone();
    }
    if let Some(batch_size) = overrides.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(concurrency) = overrides.concurrency {
        config.pipeline.concurrency = concurrency;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Build the pipeline from configuration: resources, normalizer and model
pub async fn build_pipeline(config: &SentiscopeConfig) -> Result<BatchPipeline> {
    let resources = LinguisticResources::ensure(&config.resources.dir)
        .context("Failed to initialize linguistic resources")?;
    let normalizer = TextNormalizer::new(Arc::new(resources))?;

    let model = load_model(&config.model)
        .await
        .context("Failed to load sentiment model")?;
    info!("Sentiment model '{}' loaded", model.name());

    Ok(BatchPipeline::new(SentimentClassifier::new(model), normalizer)
        .with_batch_size(config.pipeline.batch_size)
        .with_concurrency(config.pipeline.concurrency))
}

async fn init(config: &SentiscopeConfig, with_model: bool) -> Result<()> {
    let resources = LinguisticResources::ensure(&config.resources.dir)
        .context("Failed to initialize linguistic resources")?;
    println!(
        "Linguistic resources ready in {} ({} stopwords)",
        config.resources.dir.display(),
        resources.stopword_count()
    );

    if with_model {
        let model = load_model(&config.model)
            .await
            .context("Failed to load sentiment model")?;
        println!("Model ready: {}", model.name());
    }
    Ok(())
}

async fn classify(
    config: &SentiscopeConfig,
    texts: &[String],
    label_only: bool,
    normalize: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config).await?;

    let inputs: Vec<String> = if normalize {
        texts
            .iter()
            .map(|t| pipeline.normalizer().clean(t, true))
            .collect()
    } else {
        texts.to_vec()
    };

    let results = pipeline
        .classify_texts(inputs.iter().map(|t| Some(t.as_str())))
        .await?;

    for result in results {
        if label_only {
            println!("{}", result.label);
        } else {
            println!("{}\t{:.3}", result.label, result.confidence);
        }
    }
    Ok(())
}

/// Classify `column` of the CSV at `input`, write the augmented CSV to
/// `output` and return the report
pub async fn analyze(
    config: &SentiscopeConfig,
    input: &Path,
    column: &str,
    normalize: bool,
    output: &Path,
) -> Result<AnalysisReport> {
    let table = read_table(input).with_context(|| format!("Failed to read {}", input.display()))?;
    require_column(&table, column)?;

    let pipeline = build_pipeline(config).await?;
    let analyzed = pipeline.run(&table, column, normalize).await?;

    write_table(&analyzed, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} rows to {}", analyzed.len(), output.display());

    Ok(AnalysisReport::from_table(&analyzed, config.thresholds)?
        .with_model(pipeline.classifier().model_name())
        .with_output(output.to_path_buf()))
}

/// Aggregate an already analyzed CSV without running the model
pub fn stats(
    config: &SentiscopeConfig,
    input: &Path,
    date_column: Option<&str>,
    keywords: usize,
    column: &str,
    bins: usize,
) -> Result<AnalysisReport> {
    let table = read_table(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let mut report = AnalysisReport::from_table(&table, config.thresholds)
        .context("Input does not look like an analyzed file")?
        .with_histogram(&table, bins)?;

    if let Some(date_column) = date_column {
        report = report.with_timeline(&table, date_column)?;
    }

    if keywords > 0 {
        require_column(&table, column)?;
        let resources = LinguisticResources::ensure(&config.resources.dir)
            .context("Failed to initialize linguistic resources")?;
        let normalizer = TextNormalizer::new(Arc::new(resources))?;
        let texts = table.column(column)?.filter_map(Cell::as_text);
        report = report.with_keywords(normalizer.extract_keywords(texts, keywords));
    }

    Ok(report)
}

/// Text columns of a CSV file
pub fn columns(input: &Path) -> Result<Vec<String>> {
    let table = read_table(input).with_context(|| format!("Failed to read {}", input.display()))?;
    Ok(table.text_columns())
}

fn require_column(table: &AnalysisTable, column: &str) -> Result<()> {
    if table.has_column(column) {
        return Ok(());
    }

    let text_columns = table.text_columns();
    if text_columns.is_empty() {
        bail!("Column '{}' not found and the file has no text columns", column);
    }
    bail!(
        "Column '{}' not found. Available text columns: {}",
        column,
        text_columns.join(", ")
    )
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
