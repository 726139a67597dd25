//! Sentiment model backends

#[cfg(feature = "ml-models")]
pub mod bert;
pub mod lexicon;

#[cfg(feature = "ml-models")]
pub use bert::BertSentimentModel;
pub use lexicon::LexiconSentimentModel;
