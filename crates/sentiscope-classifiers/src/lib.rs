//! Sentiscope Classifiers
//!
//! Batch sentiment analysis of free-text feedback.
//!
//! The flow is normalizer → classifier → aggregator:
//! - [`TextNormalizer`] cleans raw text, optionally removing stopwords and lemmatizing
//! - [`SentimentClassifier`] maps text to one of five ordinal labels plus a confidence,
//!   backed by a [`SentimentModel`] (BERT via Candle, or a built-in lexicon)
//! - [`BatchPipeline`] runs both over a table column in order-preserving batches
//! - [`aggregate`] computes label distribution and confidence statistics
//!
//! Models are loaded once with [`load_model`] and shared read-only afterwards.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod model_loader;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod resources;

pub use aggregate::{
    confidence_histogram, confidence_stats, distribution, summary, timeline, ConfidenceStats,
    Distribution, HistogramBin, LabelShare, Summary, TimelinePoint,
};
pub use classifier::{to_result, ClassProbabilities, SentimentClassifier, SentimentModel};
pub use config::{
    ConfidenceThresholds, ModelConfig, ModelSource, PipelineConfig, ResourcesConfig,
    SentiscopeConfig, DEFAULT_MODEL_REPO,
};
pub use model_loader::load_model;
pub use models::LexiconSentimentModel;
#[cfg(feature = "ml-models")]
pub use models::BertSentimentModel;
pub use normalizer::TextNormalizer;
pub use pipeline::BatchPipeline;
pub use resources::LinguisticResources;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{SentimentClassifier, SentimentModel};
    pub use crate::config::SentiscopeConfig;
    pub use crate::model_loader::load_model;
    pub use crate::normalizer::TextNormalizer;
    pub use crate::pipeline::BatchPipeline;
    pub use crate::resources::LinguisticResources;
    pub use sentiscope_core::prelude::*;
}
