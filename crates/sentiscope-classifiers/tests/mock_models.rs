//! Mock sentiment models for testing
//!
//! Deterministic, scriptable implementations of the SentimentModel trait for
//! exercising the classifier and batch pipeline without downloading a model.

use async_trait::async_trait;
use sentiscope_classifiers::{
    BatchPipeline, ClassProbabilities, SentimentClassifier, SentimentModel, TextNormalizer,
};
use sentiscope_core::{AnalysisTable, Cell, Error, Result, SentimentLabel};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock model that maps keywords to fixed probability vectors
pub struct ScriptedModel {
    rules: Vec<(String, ClassProbabilities)>,
    fallback: ClassProbabilities,
    simulated_latency: Option<Duration>,
    fail_on: Option<String>,
    call_count: AtomicU32,
    batch_sizes: Mutex<Vec<usize>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: [0.1, 0.1, 0.6, 0.1, 0.1],
            simulated_latency: None,
            fail_on: None,
            call_count: AtomicU32::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Texts containing `keyword` get `probs`; first matching rule wins
    pub fn with_rule(mut self, keyword: &str, probs: ClassProbabilities) -> Self {
        self.rules.push((keyword.to_string(), probs));
        self
    }

    /// Sleep before answering; longer texts sleep longer, so batches finish out of order
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Fail any batch containing `keyword`
    pub fn failing_on(mut self, keyword: &str) -> Self {
        self.fail_on = Some(keyword.to_string());
        self
    }

    /// Number of texts the model has been asked about
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn score(&self, text: &str) -> Result<ClassProbabilities> {
        if let Some(keyword) = &self.fail_on {
            if text.contains(keyword.as_str()) {
                return Err(Error::model(format!("scripted failure on '{}'", keyword)));
            }
        }
        Ok(self
            .rules
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, probs)| *probs)
            .unwrap_or(self.fallback))
    }
}

#[async_trait]
impl SentimentModel for ScriptedModel {
    async fn predict(&self, text: &str) -> Result<ClassProbabilities> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.score(text)
    }

    async fn predict_batch(&self, texts: &[String]) -> Result<Vec<ClassProbabilities>> {
        self.call_count.fetch_add(texts.len() as u32, Ordering::Relaxed);
        self.batch_sizes.lock().unwrap().push(texts.len());

        if let Some(latency) = self.simulated_latency {
            let longest = texts.iter().map(String::len).max().unwrap_or(0) as u32;
            tokio::time::sleep(latency * longest).await;
        }

        texts.iter().map(|text| self.score(text)).collect()
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn max_length(&self) -> usize {
        512
    }
}

/// Route pipeline logs to the test harness; repeat calls are no-ops
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn scripted() -> ScriptedModel {
    ScriptedModel::new()
        .with_rule("love", [0.01, 0.02, 0.07, 0.3, 0.6])
        .with_rule("great", [0.02, 0.03, 0.15, 0.7, 0.1])
        .with_rule("terrible", [0.5, 0.3, 0.1, 0.05, 0.05])
        .with_rule("meh", [0.05, 0.25, 0.4, 0.25, 0.05])
}

fn pipeline(model: Arc<ScriptedModel>, batch_size: usize, concurrency: usize) -> BatchPipeline {
    BatchPipeline::new(
        SentimentClassifier::new(model),
        TextNormalizer::bundled().unwrap(),
    )
    .with_batch_size(batch_size)
    .with_concurrency(concurrency)
}

fn labels_and_confidences(table: &AnalysisTable) -> Vec<(String, f64)> {
    table
        .column("sentiment")
        .unwrap()
        .zip(table.column("confidence").unwrap())
        .map(|(label, confidence)| {
            (
                label.as_text().unwrap().to_string(),
                confidence.as_number().unwrap(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_degenerate_rows_never_reach_model() {
        init_tracing();
        let model = Arc::new(scripted());
        let table = AnalysisTable::from_texts(
            "feedback",
            vec![Some("I love this!"), Some(""), None, Some("Terrible.")],
        );

        let output = pipeline(model.clone(), 32, 1)
            .run(&table, "feedback", false)
            .await
            .unwrap();

        let rows = labels_and_confidences(&output);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], ("Very Positive".to_string(), 0.6));
        assert_eq!(rows[1], ("Neutral".to_string(), 0.0));
        assert_eq!(rows[2], ("Neutral".to_string(), 0.0));
        // case-sensitive rule: "Terrible." does not contain "terrible"
        assert_eq!(rows[3], ("Neutral".to_string(), 0.6));
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.batch_sizes(), vec![2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_preserved_when_batches_finish_out_of_order() {
        init_tracing();
        let texts: Vec<String> = (0..40)
            .map(|i| match i % 4 {
                0 => format!("love it {}", "!".repeat(40 - i)),
                1 => "terrible".to_string(),
                2 => format!("meh {}", i),
                _ => "great".to_string(),
            })
            .collect();
        let table = AnalysisTable::from_texts("feedback", texts.iter().map(String::as_str));

        let model = Arc::new(scripted().with_latency(Duration::from_micros(200)));
        let output = pipeline(model.clone(), 3, 8)
            .run(&table, "feedback", false)
            .await
            .unwrap();

        let expected: Vec<&str> = (0..40)
            .map(|i| match i % 4 {
                0 => "Very Positive",
                1 => "Very Negative",
                2 => "Neutral",
                _ => "Positive",
            })
            .collect();
        let actual: Vec<String> = labels_and_confidences(&output)
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(model.call_count(), 40);
        assert_eq!(model.batch_sizes().iter().sum::<usize>(), 40);
    }

    #[tokio::test]
    async fn test_batch_size_does_not_change_results() {
        init_tracing();
        let texts = vec![
            Some("love"),
            None,
            Some("meh"),
            Some("   "),
            Some("great"),
            Some("terrible"),
            Some("plain"),
        ];
        let table = AnalysisTable::from_texts("feedback", texts);

        let mut outputs = Vec::new();
        for (batch_size, concurrency) in [(1, 1), (2, 3), (3, 2), (64, 4)] {
            let model = Arc::new(scripted());
            let output = pipeline(model, batch_size, concurrency)
                .run(&table, "feedback", false)
                .await
                .unwrap();
            outputs.push(labels_and_confidences(&output));
        }

        for output in &outputs[1..] {
            assert_eq!(output, &outputs[0]);
        }
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(scripted().failing_on("boom"));
        let table = AnalysisTable::from_texts(
            "feedback",
            vec![Some("love"), Some("boom"), Some("great")],
        );

        let err = pipeline(model, 1, 2)
            .run(&table, "feedback", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[tokio::test]
    async fn test_normalization_only_removes_rows() {
        init_tracing();
        let table = AnalysisTable::from_texts(
            "feedback",
            vec![
                Some("I LOVE the new menu!!"),
                Some("https://spam.example.com"),
                Some("meh, the fries were cold"),
                None,
                Some("@someone #hashtag"),
            ],
        );

        let model = Arc::new(scripted());
        let output = pipeline(model.clone(), 2, 2)
            .run(&table, "feedback", true)
            .await
            .unwrap();

        assert_eq!(output.len(), 2);
        let cleaned: Vec<_> = output
            .column("feedback_cleaned")
            .unwrap()
            .filter_map(Cell::as_text)
            .collect();
        assert_eq!(cleaned, vec!["love new menu", "meh fry cold"]);

        let rows = labels_and_confidences(&output);
        assert_eq!(rows[0].0, SentimentLabel::VeryPositive.as_str());
        assert_eq!(rows[1].0, SentimentLabel::Neutral.as_str());
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_classifier_single_and_batch_agree() {
        let model = Arc::new(scripted());
        let classifier = SentimentClassifier::new(model);
        let cells = vec![Cell::from("great"), Cell::Number(5.0), Cell::from("terrible")];

        let batch = classifier.classify_batch(&cells).await.unwrap();
        for (cell, result) in cells.iter().zip(&batch) {
            assert_eq!(classifier.classify_cell(cell).await.unwrap(), *result);
        }
        assert_eq!(batch[2].label, SentimentLabel::VeryNegative);
        assert_eq!(batch[2].confidence, 0.5);
    }
}
