//! Batch sentiment pipeline
//!
//! Runs the normalizer and classifier over one text column of an
//! [`AnalysisTable`] and appends `sentiment` and `confidence` columns.
//! Rows are classified in chunks of `batch_size`; up to `concurrency` chunks
//! are in flight at once and results are reassembled in row order.
//! Chunks are spawned as Tokio tasks, so the pipeline must be driven from a
//! Tokio runtime.

use crate::classifier::SentimentClassifier;
use crate::normalizer::TextNormalizer;
use futures::stream::{self, StreamExt, TryStreamExt};
use sentiscope_core::{
    round_to, AnalysisTable, Cell, Error, Result, SentimentResult, CONFIDENCE_COLUMN,
    SENTIMENT_COLUMN,
};
use std::time::Instant;

/// Default rows per model call
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Normalize → classify → augment, over a whole table
#[derive(Clone)]
pub struct BatchPipeline {
    classifier: SentimentClassifier,
    normalizer: TextNormalizer,
    batch_size: usize,
    concurrency: usize,
}

impl BatchPipeline {
    pub fn new(classifier: SentimentClassifier, normalizer: TextNormalizer) -> Self {
        Self {
            classifier,
            normalizer,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: num_cpus::get(),
        }
    }

    /// Rows per model call (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Chunks classified concurrently (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn classifier(&self) -> &SentimentClassifier {
        &self.classifier
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Classify `text_column` of `table`, returning an augmented copy.
    ///
    /// With `normalize`, a `<column>_cleaned` column is added first and rows
    /// whose cleaned text is empty are dropped; the cleaned text is what gets
    /// classified. No other step changes the row count.
    pub async fn run(
        &self,
        table: &AnalysisTable,
        text_column: &str,
        normalize: bool,
    ) -> Result<AnalysisTable> {
        let start = Instant::now();
        table.column_index(text_column)?;

        let (mut output, analysis_column) = if normalize {
            let (normalized, cleaned_column) =
                self.normalizer.normalize_table(table, text_column, true)?;
            let dropped = table.len() - normalized.len();
            if dropped > 0 {
                metrics::counter!("sentiscope_rows_dropped_total").increment(dropped as u64);
            }
            (normalized, cleaned_column)
        } else {
            (table.clone(), text_column.to_string())
        };

        let cells: Vec<Cell> = output.column(&analysis_column)?.cloned().collect();
        let results = self.classify_cells(cells).await?;

        let (labels, confidences): (Vec<Cell>, Vec<Cell>) = results
            .iter()
            .map(|r| {
                (
                    Cell::from(r.label.as_str()),
                    Cell::Number(round_to(r.confidence as f64, 3)),
                )
            })
            .unzip();

        output.add_column(SENTIMENT_COLUMN, labels)?;
        output.add_column(CONFIDENCE_COLUMN, confidences)?;

        tracing::info!(
            rows_in = table.len(),
            rows_out = output.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Classified column '{}' with {}",
            analysis_column,
            self.classifier.model_name()
        );

        Ok(output)
    }

    /// Classify a list of optional texts, one result per input in order
    pub async fn classify_texts<'a, I>(&self, texts: I) -> Result<Vec<SentimentResult>>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let cells = texts.into_iter().map(Cell::from).collect();
        self.classify_cells(cells).await
    }

    async fn classify_cells(&self, cells: Vec<Cell>) -> Result<Vec<SentimentResult>> {
        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let total = cells.len();
        let chunks: Vec<Vec<Cell>> = cells
            .chunks(self.batch_size)
            .map(<[Cell]>::to_vec)
            .collect();
        let num_chunks = chunks.len();

        let batches: Vec<Vec<SentimentResult>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, chunk)| {
                let classifier = self.classifier.clone();
                tokio::spawn(async move {
                    let start = Instant::now();
                    let results = classifier.classify_batch(&chunk).await?;
                    let elapsed = start.elapsed();

                    let degenerate = results.iter().filter(|r| r.is_degenerate()).count();
                    metrics::histogram!("sentiscope_batch_latency_us")
                        .record(elapsed.as_micros() as f64);
                    metrics::counter!("sentiscope_rows_classified_total")
                        .increment(results.len() as u64);
                    metrics::counter!("sentiscope_degenerate_inputs_total")
                        .increment(degenerate as u64);

                    tracing::debug!(
                        "Batch {}/{}: {} rows ({} degenerate) in {}us",
                        idx + 1,
                        num_chunks,
                        results.len(),
                        degenerate,
                        elapsed.as_micros()
                    );
                    Ok::<_, Error>(results)
                })
            })
            .buffered(self.concurrency)
            .map(|joined| {
                joined.map_err(|e| Error::internal(format!("Classification task failed: {}", e)))?
            })
            .try_collect()
            .await?;

        let results: Vec<SentimentResult> = batches.into_iter().flatten().collect();
        if results.len() != total {
            return Err(Error::internal(format!(
                "Pipeline produced {} results for {} rows",
                results.len(),
                total
            )));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LexiconSentimentModel;
    use sentiscope_core::SentimentLabel;
    use std::sync::Arc;

    fn pipeline() -> BatchPipeline {
        let model = Arc::new(LexiconSentimentModel::new().unwrap());
        BatchPipeline::new(
            SentimentClassifier::new(model),
            TextNormalizer::bundled().unwrap(),
        )
        .with_batch_size(2)
        .with_concurrency(2)
    }

    #[tokio::test]
    async fn test_run_appends_columns_in_order() {
        let table = AnalysisTable::from_texts(
            "feedback",
            vec![Some("I love this!"), Some(""), None, Some("Terrible service.")],
        );

        let output = pipeline().run(&table, "feedback", false).await.unwrap();
        assert_eq!(output.len(), 4);
        assert_eq!(output.columns(), &["feedback", "sentiment", "confidence"]);

        let labels: Vec<_> = output
            .column(SENTIMENT_COLUMN)
            .unwrap()
            .map(|c| c.as_text().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["Positive", "Neutral", "Neutral", "Negative"]);

        let confidences: Vec<_> = output
            .column(CONFIDENCE_COLUMN)
            .unwrap()
            .map(|c| c.as_number().unwrap())
            .collect();
        assert_eq!(confidences[1], 0.0);
        assert_eq!(confidences[2], 0.0);
        assert!(confidences[0] > 0.0);
    }

    #[tokio::test]
    async fn test_run_with_normalization_drops_empty_rows() {
        let table = AnalysisTable::from_texts(
            "feedback",
            vec![Some("Great food!"), Some("!!!"), None, Some("@bob #tag")],
        );

        let output = pipeline().run(&table, "feedback", true).await.unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(
            output.columns(),
            &["feedback", "feedback_cleaned", "sentiment", "confidence"]
        );
    }

    #[tokio::test]
    async fn test_empty_table_gets_output_columns() {
        let table = AnalysisTable::new(["feedback"]);
        let output = pipeline().run(&table, "feedback", false).await.unwrap();
        assert!(output.is_empty());
        assert!(output.has_column(SENTIMENT_COLUMN));
        assert!(output.has_column(CONFIDENCE_COLUMN));
    }

    #[tokio::test]
    async fn test_missing_column_is_an_error() {
        let table = AnalysisTable::from_texts("review", vec![Some("fine")]);
        let err = pipeline().run(&table, "feedback", false).await.unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[tokio::test]
    async fn test_classify_texts() {
        let results = pipeline()
            .classify_texts(vec![Some("not good"), None, Some("   ")])
            .await
            .unwrap();
        assert_eq!(results[0].label, SentimentLabel::Negative);
        assert!(results[1].is_degenerate());
        assert!(results[2].is_degenerate());
    }
}
