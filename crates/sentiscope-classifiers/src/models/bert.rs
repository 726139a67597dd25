//! BERT five-class sentiment model on Candle
//!
//! Backbone, pooler (`bert.pooler.dense` + tanh) and linear classification
//! head, as in a standard `BertForSequenceClassification` checkpoint.

use crate::classifier::{ClassProbabilities, SentimentModel};
use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use sentiscope_core::{Error, Result, NUM_CLASSES};
use std::sync::Arc;
use tokenizers::{Encoding, Tokenizer};

/// BERT sequence classifier producing five ordinal class probabilities.
///
/// Tokenization and the forward pass run on Tokio's blocking pool, so calls
/// must be made from within a Tokio runtime.
pub struct BertSentimentModel {
    name: String,
    max_length: usize,
    inference: Arc<BertInference>,
}

/// Weights and tokenizer shared with blocking inference tasks
struct BertInference {
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    device: Device,
}

impl BertSentimentModel {
    /// Assemble a model from loaded parts.
    ///
    /// The tokenizer must already truncate to `max_length` and pad batches to
    /// their longest member; see `model_loader::load_tokenizer`.
    pub fn new(
        name: impl Into<String>,
        tokenizer: Tokenizer,
        model: BertModel,
        pooler: Linear,
        classifier: Linear,
        device: Device,
        max_length: usize,
    ) -> Self {
        Self {
            name: name.into(),
            max_length,
            inference: Arc::new(BertInference {
                tokenizer,
                model,
                pooler,
                classifier,
                device,
            }),
        }
    }
}

impl BertInference {
    fn predict_batch(&self, texts: &[String]) -> Result<Vec<ClassProbabilities>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| Error::model(format!("Tokenization failed: {}", e)))?;

        tracing::trace!(
            "Forward pass on batch of {} (seq len {})",
            encodings.len(),
            encodings.first().map(Encoding::len).unwrap_or(0)
        );

        self.forward(&encodings)
    }

    fn forward(&self, encodings: &[Encoding]) -> Result<Vec<ClassProbabilities>> {
        let input_ids = self.stack(encodings, Encoding::get_ids, "input ids")?;
        let token_type_ids = self.stack(encodings, Encoding::get_type_ids, "token type ids")?;
        let attention_mask =
            self.stack(encodings, Encoding::get_attention_mask, "attention mask")?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(candle_error("Model forward pass failed"))?;

        // [CLS] token of every sequence: (batch, hidden)
        let cls = hidden_states
            .i((.., 0))
            .map_err(candle_error("Failed to get CLS token"))?;

        let pooled = self
            .pooler
            .forward(&cls)
            .and_then(|t| t.tanh())
            .map_err(candle_error("Pooler failed"))?;

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(candle_error("Classification head failed"))?;

        let probs: Vec<Vec<f32>> = candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.to_vec2())
            .map_err(candle_error("Softmax failed"))?;

        probs
            .into_iter()
            .map(|row| {
                let len = row.len();
                ClassProbabilities::try_from(row).map_err(|_| {
                    Error::model(format!(
                        "Classification head produced {} classes, expected {}",
                        len, NUM_CLASSES
                    ))
                })
            })
            .collect()
    }

    fn stack(
        &self,
        encodings: &[Encoding],
        field: fn(&Encoding) -> &[u32],
        what: &str,
    ) -> Result<Tensor> {
        let rows = encodings
            .iter()
            .map(|encoding| Tensor::new(field(encoding), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()
            .and_then(|rows| Tensor::stack(&rows, 0))
            .map_err(|e| Error::model(format!("Failed to build {} tensor: {}", what, e)))?;
        Ok(rows)
    }
}

#[async_trait]
impl SentimentModel for BertSentimentModel {
    async fn predict(&self, text: &str) -> Result<ClassProbabilities> {
        let mut probs = self.predict_batch(&[text.to_string()]).await?;
        probs
            .pop()
            .ok_or_else(|| Error::model("Model returned no prediction"))
    }

    async fn predict_batch(&self, texts: &[String]) -> Result<Vec<ClassProbabilities>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inference = Arc::clone(&self.inference);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || inference.predict_batch(&texts))
            .await
            .map_err(|e| Error::internal(format!("{} inference task failed: {}", self.name, e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}

fn candle_error(context: &'static str) -> impl Fn(candle_core::Error) -> Error {
    move |e| Error::model(format!("{}: {}", context, e))
}
