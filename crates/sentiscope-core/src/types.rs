//! Core types for Sentiscope

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of ordinal sentiment classes produced by the model
pub const NUM_CLASSES: usize = 5;

/// Five-point ordinal sentiment scale.
///
/// Variant order is the model's class order: class index 0 is `VeryNegative`
/// (a one-star rating) and index 4 is `VeryPositive` (five stars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    /// All labels in ascending ordinal order
    pub const ALL: [SentimentLabel; NUM_CLASSES] = [
        Self::VeryNegative,
        Self::Negative,
        Self::Neutral,
        Self::Positive,
        Self::VeryPositive,
    ];

    /// Map a zero-based model class index to its label
    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map a 1..=5 rating to its label
    pub fn from_rating(rating: u8) -> Option<Self> {
        match rating {
            1..=5 => Self::from_class_index(rating as usize - 1),
            _ => None,
        }
    }

    /// Zero-based class index
    pub fn class_index(self) -> usize {
        self as usize
    }

    /// Rating on the 1..=5 scale
    pub fn rating(self) -> u8 {
        self as u8 + 1
    }

    /// Human-readable display name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryNegative => "Very Negative",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
            Self::Positive => "Positive",
            Self::VeryPositive => "Very Positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "verynegative" => Ok(Self::VeryNegative),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            "verypositive" => Ok(Self::VeryPositive),
            _ => Err(format!("unknown sentiment label: '{}'", s)),
        }
    }
}

/// Round `value` to `places` decimal places.
///
/// Rounds on the exact decimal expansion of `value` with ties to even, so
/// 6.25 becomes 6.2 and 0.0625 becomes 0.062.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", places as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Sentiment of one text record: label plus model confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Arg-max label
    pub label: SentimentLabel,

    /// Probability assigned to `label`, in [0, 1], three decimal places
    pub confidence: f32,
}

impl SentimentResult {
    /// Create a result, clamping confidence to [0, 1] and rounding to 3 dp
    pub fn new(label: SentimentLabel, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            round_to(confidence.clamp(0.0, 1.0) as f64, 3) as f32
        } else {
            0.0
        };
        Self { label, confidence }
    }

    /// Sentinel for missing or blank input. Never produced by the model.
    pub const fn degenerate() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
        }
    }

    /// Whether this is the missing-input sentinel
    pub fn is_degenerate(&self) -> bool {
        self.label == SentimentLabel::Neutral && self.confidence == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_bijection() {
        for (idx, label) in SentimentLabel::ALL.iter().enumerate() {
            assert_eq!(SentimentLabel::from_class_index(idx), Some(*label));
            assert_eq!(label.class_index(), idx);
            assert_eq!(SentimentLabel::from_rating(label.rating()), Some(*label));
        }
        assert_eq!(SentimentLabel::from_class_index(5), None);
        assert_eq!(SentimentLabel::from_rating(0), None);
        assert_eq!(SentimentLabel::from_rating(6), None);
    }

    #[test]
    fn test_total_order() {
        assert!(SentimentLabel::VeryNegative < SentimentLabel::Negative);
        assert!(SentimentLabel::Negative < SentimentLabel::Neutral);
        assert!(SentimentLabel::Neutral < SentimentLabel::Positive);
        assert!(SentimentLabel::Positive < SentimentLabel::VeryPositive);
    }

    #[test]
    fn test_parse_display_and_snake_case() {
        for label in SentimentLabel::ALL {
            assert_eq!(label.as_str().parse::<SentimentLabel>(), Ok(label));
            assert_eq!(label.to_string(), label.as_str());
        }
        assert_eq!("very_positive".parse::<SentimentLabel>(), Ok(SentimentLabel::VeryPositive));
        assert_eq!("very-negative".parse::<SentimentLabel>(), Ok(SentimentLabel::VeryNegative));
        assert!("mixed".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_result_clamps_and_rounds() {
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, 0.87654).confidence, 0.877);
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, 1.7).confidence, 1.0);
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, -0.2).confidence, 0.0);
        assert_eq!(SentimentResult::new(SentimentLabel::Positive, f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_degenerate_sentinel() {
        let result = SentimentResult::degenerate();
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.confidence, 0.0);
        assert!(result.is_degenerate());
        assert!(!SentimentResult::new(SentimentLabel::Neutral, 0.41).is_degenerate());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 1), 66.7);
        assert_eq!(round_to(0.123_56, 3), 0.124);
    }

    #[test]
    fn test_round_to_ties_to_even() {
        // 1 of 16 rows
        assert_eq!(round_to(1.0 / 16.0 * 100.0, 1), 6.2);
        assert_eq!(round_to(15.0 / 16.0 * 100.0, 1), 93.8);
        assert_eq!(round_to(0.0625, 3), 0.062);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(f64::INFINITY, 3), f64::INFINITY);
    }
}
