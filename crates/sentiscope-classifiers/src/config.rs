//! Configuration for model loading, the batch pipeline and aggregation

use crate::resources::LinguisticResources;
use sentiscope_core::{Error, Result, SentimentLabel, NUM_CLASSES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default pretrained multilingual five-star review model
pub const DEFAULT_MODEL_REPO: &str = "nlptown/bert-base-multilingual-uncased-sentiment";

/// Top-level Sentiscope configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentiscopeConfig {
    /// Model source and inference settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Batch pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Linguistic resource location
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Confidence thresholds used in statistics
    #[serde(default)]
    pub thresholds: ConfidenceThresholds,
}

impl SentiscopeConfig {
    /// Load configuration from a YAML file, or defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model.max_length == 0 {
            return Err(Error::config("model.max_length must be greater than 0"));
        }
        if let Some(labels) = &self.model.labels {
            if labels.len() != NUM_CLASSES {
                return Err(Error::config(format!(
                    "model.labels must list exactly {} labels, got {}",
                    NUM_CLASSES,
                    labels.len()
                )));
            }
            if labels.as_slice() != SentimentLabel::ALL {
                return Err(Error::config(
                    "model.labels must follow the ordinal order very_negative..very_positive",
                ));
            }
        }
        if self.pipeline.batch_size == 0 {
            return Err(Error::config("pipeline.batch_size must be greater than 0"));
        }
        if self.pipeline.concurrency == 0 {
            return Err(Error::config("pipeline.concurrency must be greater than 0"));
        }
        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.low) || !(0.0..=1.0).contains(&t.high) || t.low > t.high {
            return Err(Error::config(format!(
                "thresholds must satisfy 0 <= low <= high <= 1 (low={}, high={})",
                t.low, t.high
            )));
        }
        Ok(())
    }
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Where the model comes from
    #[serde(default)]
    pub source: ModelSource,

    /// Device to run on (cpu, cuda, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length in subword tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Class labels in model output order; only the fixed ordinal order is accepted
    #[serde(default)]
    pub labels: Option<Vec<SentimentLabel>>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::default(),
            device: default_device(),
            max_length: default_max_length(),
            labels: None,
        }
    }
}

/// Model source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },

    /// Load from a local directory holding config.json, tokenizer and weights
    Local { path: PathBuf },

    /// Built-in lexicon model, no download
    Lexicon,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: DEFAULT_MODEL_REPO.to_string(),
            revision: default_revision(),
        }
    }
}

/// Batch pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows per model call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Batches in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Column holding the text to classify
    #[serde(default = "default_text_column")]
    pub text_column: String,

    /// Apply the full normalization pipeline before classifying
    #[serde(default)]
    pub normalize: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            text_column: default_text_column(),
            normalize: false,
        }
    }
}

/// Linguistic resource configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Directory where stopwords and lemma data are installed
    #[serde(default = "LinguisticResources::default_dir")]
    pub dir: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            dir: LinguisticResources::default_dir(),
        }
    }
}

/// Thresholds for the high/low confidence counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Confidence strictly above this counts as high
    #[serde(default = "default_high")]
    pub high: f64,

    /// Confidence strictly below this counts as low
    #[serde(default = "default_low")]
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            low: default_low(),
        }
    }
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

fn default_batch_size() -> usize {
    32
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

fn default_text_column() -> String {
    "feedback".to_string()
}

fn default_high() -> f64 {
    0.8
}

fn default_low() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SentiscopeConfig::default();
        assert_eq!(
            config.model.source,
            ModelSource::HuggingFace {
                repo: DEFAULT_MODEL_REPO.to_string(),
                revision: "main".to_string()
            }
        );
        assert_eq!(config.model.max_length, 512);
        assert_eq!(config.pipeline.batch_size, 32);
        assert_eq!(config.pipeline.text_column, "feedback");
        assert_eq!(config.thresholds, ConfidenceThresholds { high: 0.8, low: 0.5 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
model:
  source:
    type: local
    path: "./models/bert-sentiment"
  device: "cpu"
  max_length: 256
pipeline:
  batch_size: 8
  concurrency: 2
  text_column: "review"
  normalize: true
thresholds:
  high: 0.9
"#;
        let config = SentiscopeConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.model.source,
            ModelSource::Local {
                path: PathBuf::from("./models/bert-sentiment")
            }
        );
        assert_eq!(config.model.max_length, 256);
        assert_eq!(config.pipeline.batch_size, 8);
        assert!(config.pipeline.normalize);
        assert_eq!(config.thresholds.high, 0.9);
        assert_eq!(config.thresholds.low, 0.5);
    }

    #[test]
    fn test_lexicon_source() {
        let config = SentiscopeConfig::from_yaml_str("model:\n  source:\n    type: lexicon\n").unwrap();
        assert_eq!(config.model.source, ModelSource::Lexicon);
    }

    #[test]
    fn test_validation_errors() {
        assert!(SentiscopeConfig::from_yaml_str("pipeline:\n  batch_size: 0\n").is_err());
        assert!(SentiscopeConfig::from_yaml_str("pipeline:\n  concurrency: 0\n").is_err());
        assert!(SentiscopeConfig::from_yaml_str("model:\n  max_length: 0\n").is_err());
        assert!(SentiscopeConfig::from_yaml_str("thresholds:\n  high: 0.4\n  low: 0.6\n").is_err());
        assert!(SentiscopeConfig::from_yaml_str("model:\n  labels: [negative, positive]\n").is_err());
        assert!(SentiscopeConfig::from_yaml_str(
            "model:\n  labels: [very_positive, positive, neutral, negative, very_negative]\n"
        )
        .is_err());
        assert!(SentiscopeConfig::from_yaml_str(
            "model:\n  labels: [very_negative, negative, neutral, positive, very_positive]\n"
        )
        .is_ok());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = SentiscopeConfig::load("/definitely/not/here.yaml").unwrap();
        assert_eq!(config.pipeline.text_column, "feedback");
    }
}
