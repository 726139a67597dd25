//! Lexicon sentiment model
//!
//! Dependency-light fallback used when no neural model is configured. Word
//! hits place an expected rating on the 1..=5 scale and a Gaussian kernel
//! around it yields the five class probabilities.

use crate::classifier::{ClassProbabilities, SentimentModel};
use aho_corasick::{AhoCorasick, MatchKind};
use sentiscope_core::{Error, Result, NUM_CLASSES};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "love", "loved", "amazing", "wonderful", "happy",
    "fantastic", "awesome", "best", "perfect", "recommend", "friendly", "helpful",
    "delicious", "pleasant", "satisfied", "nice", "enjoyed", "fast", "easy", "beautiful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "hated", "horrible", "worst", "sad", "angry",
    "disappointed", "disappointing", "poor", "rude", "slow", "broken", "dirty", "waste",
    "useless", "never again", "refund", "cold", "late", "expensive",
];

const INTENSIFIERS: &[&str] = &[
    "very", "extremely", "really", "absolutely", "so", "totally", "incredibly", "super",
];

const NEGATORS: &[&str] = &["not", "no", "never", "isn't", "wasn't", "don't", "didn't"];

/// Kernel width on the rating scale
const SIGMA: f32 = 0.8;

/// Lexicon-based five-class sentiment model
pub struct LexiconSentimentModel {
    name: String,
    matcher: AhoCorasick,
    positive_count: usize,
    negative_count: usize,
    max_length: usize,
}

#[derive(Debug, Default, PartialEq)]
struct Hits {
    positive: f32,
    negative: f32,
    intensifiers: f32,
}

impl LexiconSentimentModel {
    pub fn new() -> Result<Self> {
        Self::with_name("sentiment-lexicon")
    }

    pub fn with_name(name: impl Into<String>) -> Result<Self> {
        let patterns: Vec<&str> = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .chain(INTENSIFIERS)
            .copied()
            .collect();

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| Error::model(format!("Failed to build sentiment lexicon matcher: {e}")))?;

        Ok(Self {
            name: name.into(),
            matcher,
            positive_count: POSITIVE_WORDS.len(),
            negative_count: NEGATIVE_WORDS.len(),
            max_length: 512,
        })
    }

    /// Only the first `max_length` words are scored
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    fn count_hits(&self, text: &str) -> Hits {
        let text = truncate_words(text, self.max_length);
        let mut hits = Hits::default();

        for m in self.matcher.find_iter(text) {
            if !is_word_boundary(text, m.start(), m.end()) {
                continue;
            }

            let pattern = m.pattern().as_usize();
            let negated = preceding_word(text, m.start())
                .map(|w| NEGATORS.iter().any(|n| w.eq_ignore_ascii_case(n)))
                .unwrap_or(false);

            if pattern < self.positive_count {
                if negated {
                    hits.negative += 1.0;
                } else {
                    hits.positive += 1.0;
                }
            } else if pattern < self.positive_count + self.negative_count {
                if negated {
                    hits.positive += 0.5;
                } else {
                    hits.negative += 1.0;
                }
            } else {
                hits.intensifiers += 1.0;
            }
        }

        hits
    }
}

/// Expected rating: 3 is neutral, polarity and strength push toward 1 or 5
fn expected_rating(hits: &Hits) -> f32 {
    let total = hits.positive + hits.negative;
    if total == 0.0 {
        return 3.0;
    }

    let polarity = (hits.positive - hits.negative) / total;
    let strength = (total * 0.5 + hits.intensifiers * 0.25).min(1.0);
    3.0 + 2.0 * polarity * strength
}

fn kernel_probabilities(center: f32) -> ClassProbabilities {
    let mut probs = [0f32; NUM_CLASSES];
    for (idx, p) in probs.iter_mut().enumerate() {
        let distance = (idx as f32 + 1.0) - center;
        *p = (-(distance * distance) / (2.0 * SIGMA * SIGMA)).exp();
    }

    let sum: f32 = probs.iter().sum();
    for p in probs.iter_mut() {
        *p /= sum;
    }
    probs
}

fn truncate_words(text: &str, max_words: usize) -> &str {
    match text.split_whitespace().nth(max_words) {
        Some(word) => {
            let offset = word.as_ptr() as usize - text.as_ptr() as usize;
            &text[..offset]
        }
        None => text,
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

fn preceding_word(text: &str, start: usize) -> Option<&str> {
    text[..start].split_whitespace().next_back()
}

#[async_trait::async_trait]
impl SentimentModel for LexiconSentimentModel {
    async fn predict(&self, text: &str) -> Result<ClassProbabilities> {
        let hits = self.count_hits(text);
        Ok(kernel_probabilities(expected_rating(&hits)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn max_length(&self) -> usize {
        self.max_length
    }
}
