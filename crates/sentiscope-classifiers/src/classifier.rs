//! Sentiment classifier and the model trait it wraps

use async_trait::async_trait;
use sentiscope_core::{Cell, Error, Result, SentimentLabel, SentimentResult, NUM_CLASSES};
use std::sync::Arc;

/// Probability distribution over the five ordinal classes, index 0 = very negative
pub type ClassProbabilities = [f32; NUM_CLASSES];

/// Trait for all models that can back the sentiment classifier
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Class probabilities for one non-blank text
    async fn predict(&self, text: &str) -> Result<ClassProbabilities>;

    /// Class probabilities for several texts, in input order.
    ///
    /// Implementations may batch internally but must return exactly what
    /// `predict` would return for each text in isolation.
    async fn predict_batch(&self, texts: &[String]) -> Result<Vec<ClassProbabilities>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.predict(text).await?);
        }
        Ok(out)
    }

    /// Get the model name
    fn name(&self) -> &str;

    /// Maximum input length in model tokens
    fn max_length(&self) -> usize;
}

/// Maps text to a five-point sentiment label and confidence.
///
/// Blank or missing input short-circuits to the Neutral/0.0 sentinel and is
/// never sent to the model.
#[derive(Clone)]
pub struct SentimentClassifier {
    model: Arc<dyn SentimentModel>,
}

impl SentimentClassifier {
    /// Create a classifier around a loaded model
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model }
    }

    /// Name of the underlying model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Classify a single, possibly missing, text
    pub async fn classify(&self, text: Option<&str>) -> Result<SentimentResult> {
        match usable_text(text) {
            Some(text) => {
                let probs = self.model.predict(text).await?;
                to_result(&probs)
            }
            None => Ok(SentimentResult::degenerate()),
        }
    }

    /// Classify a table cell; numeric and missing cells are degenerate input
    pub async fn classify_cell(&self, cell: &Cell) -> Result<SentimentResult> {
        self.classify(cell.as_text()).await
    }

    /// Label only, for callers that do not need the confidence
    pub async fn classify_label(&self, text: Option<&str>) -> Result<SentimentLabel> {
        Ok(self.classify(text).await?.label)
    }

    /// Classify many cells, returning one result per cell in input order.
    ///
    /// Degenerate cells are resolved locally; the rest go to the model in a
    /// single `predict_batch` call.
    pub async fn classify_batch(&self, cells: &[Cell]) -> Result<Vec<SentimentResult>> {
        let mut results = vec![SentimentResult::degenerate(); cells.len()];
        let mut positions = Vec::new();
        let mut texts = Vec::new();

        for (idx, cell) in cells.iter().enumerate() {
            if let Some(text) = usable_text(cell.as_text()) {
                positions.push(idx);
                texts.push(text.to_string());
            }
        }

        if texts.is_empty() {
            return Ok(results);
        }

        let predictions = self.model.predict_batch(&texts).await?;
        if predictions.len() != texts.len() {
            return Err(Error::classifier(format!(
                "Model '{}' returned {} predictions for {} inputs",
                self.model.name(),
                predictions.len(),
                texts.len()
            )));
        }

        for (idx, probs) in positions.into_iter().zip(predictions.iter()) {
            results[idx] = to_result(probs)?;
        }

        Ok(results)
    }
}

/// Text worth sending to the model: present and not blank
fn usable_text(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Arg-max over the class probabilities. Ties resolve to the lowest class.
pub fn to_result(probs: &ClassProbabilities) -> Result<SentimentResult> {
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(Error::classifier(format!(
            "Model produced non-finite probabilities: {:?}",
            probs
        )));
    }

    let (max_idx, max_prob) = probs
        .iter()
        .enumerate()
        .fold((0, probs[0]), |best, (idx, &p)| if p > best.1 { (idx, p) } else { best });

    let label = SentimentLabel::from_class_index(max_idx)
        .ok_or_else(|| Error::internal(format!("Class index {} out of range", max_idx)))?;

    Ok(SentimentResult::new(label, max_prob))
}
