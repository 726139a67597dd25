//! Sentiscope Core
//!
//! Core types shared across Sentiscope components.
//!
//! This crate provides:
//! - The five-point ordinal sentiment scale and per-record results
//! - The analysis table that carries records and derived columns
//! - Error types and result handling

pub mod error;
pub mod table;
pub mod types;

pub use error::{Error, Result};
pub use table::{AnalysisTable, Cell, CLEANED_SUFFIX, CONFIDENCE_COLUMN, SENTIMENT_COLUMN};
pub use types::{round_to, SentimentLabel, SentimentResult, NUM_CLASSES};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::table::{AnalysisTable, Cell};
    pub use crate::types::{SentimentLabel, SentimentResult};
}
