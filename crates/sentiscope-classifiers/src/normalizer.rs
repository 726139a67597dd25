//! Text normalizer
//!
//! Deterministic cleaning applied before classification. The light pass
//! always runs; the full pass adds stopword removal and lemmatization.

use crate::resources::LinguisticResources;
use regex::Regex;
use sentiscope_core::{AnalysisTable, Cell, Result, CLEANED_SUFFIX};
use std::collections::HashMap;
use std::sync::Arc;

/// Longest keyword phrase, in words
const MAX_KEYWORD_WORDS: usize = 3;

/// Regex-based text cleaner with optional stopword removal and lemmatization
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    url_regex: Regex,
    email_regex: Regex,
    handle_regex: Regex,
    punctuation_regex: Regex,
    whitespace_regex: Regex,
    resources: Arc<LinguisticResources>,
}

impl TextNormalizer {
    /// Create a normalizer over already-initialized resources
    pub fn new(resources: Arc<LinguisticResources>) -> Result<Self> {
        Ok(Self {
            url_regex: compile(r"http\S+|www\S+|https\S+")?,
            email_regex: compile(r"\S+@\S+")?,
            handle_regex: compile(r"@\w+|#\w+")?,
            punctuation_regex: compile(r"[^\w\s]")?,
            whitespace_regex: compile(r"\s+")?,
            resources,
        })
    }

    /// Normalizer backed by the bundled resources
    pub fn bundled() -> Result<Self> {
        Self::new(Arc::new(LinguisticResources::bundled()))
    }

    /// Resources used by the full pipeline
    pub fn resources(&self) -> &LinguisticResources {
        &self.resources
    }

    /// Clean a text. `full` adds stopword removal and lemmatization.
    pub fn clean(&self, text: &str, full: bool) -> String {
        let light = self.light_clean(text);
        if !full {
            return light;
        }

        light
            .split_whitespace()
            .filter(|token| token.chars().count() > 1 && !self.resources.is_stopword(token))
            .map(|token| self.resources.lemmatize(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Clean a table cell; anything that is not text cleans to the empty string
    pub fn clean_cell(&self, cell: &Cell, full: bool) -> String {
        match cell {
            Cell::Text(text) => self.clean(text, full),
            Cell::Missing | Cell::Number(_) => String::new(),
        }
    }

    /// Add `<column>_cleaned` to a copy of `table` and drop rows whose cleaned
    /// text is empty. Returns the new table and the name of the cleaned column.
    pub fn normalize_table(
        &self,
        table: &AnalysisTable,
        column: &str,
        full: bool,
    ) -> Result<(AnalysisTable, String)> {
        let cleaned_column = format!("{}{}", column, CLEANED_SUFFIX);
        let cleaned: Vec<Cell> = table
            .column(column)?
            .map(|cell| Cell::Text(self.clean_cell(cell, full)))
            .collect();

        let mut output = table.clone();
        output.add_column(cleaned_column.clone(), cleaned)?;

        let idx = output.column_index(&cleaned_column)?;
        let before = output.len();
        output.retain_rows(|row| row[idx].as_text().is_some_and(|s| !s.is_empty()));

        tracing::debug!(
            "Normalized column '{}': kept {} of {} rows",
            column,
            output.len(),
            before
        );

        Ok((output, cleaned_column))
    }

    /// Most frequent keyword phrases across `texts`.
    ///
    /// Candidates are n-grams of one to three adjacent content words
    /// (non-stopwords longer than two characters). Ranked by frequency, then
    /// by phrase length, then by first appearance.
    pub fn extract_keywords<'a, I>(&self, texts: I, top_n: usize) -> Vec<(String, usize)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        // phrase -> (count, words, first seen)
        let mut counts: HashMap<String, (usize, usize, usize)> = HashMap::new();
        let mut seen = 0usize;

        for text in texts {
            let light = self.light_clean(text);
            let mut run: Vec<&str> = Vec::new();

            for token in light.split_whitespace() {
                if token.chars().count() <= 2 || self.resources.is_stopword(token) {
                    run.clear();
                    continue;
                }
                run.push(token);

                for words in 1..=MAX_KEYWORD_WORDS.min(run.len()) {
                    let phrase = run[run.len() - words..].join(" ");
                    let entry = counts.entry(phrase).or_insert_with(|| {
                        seen += 1;
                        (0, words, seen)
                    });
                    entry.0 += 1;
                }
            }
        }

        let mut ranked: Vec<(String, (usize, usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|(_, (ca, wa, sa)), (_, (cb, wb, sb))| {
            cb.cmp(ca).then(wb.cmp(wa)).then(sa.cmp(sb))
        });
        ranked
            .into_iter()
            .take(top_n)
            .map(|(phrase, (count, _, _))| (phrase, count))
            .collect()
    }

    fn light_clean(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = self.url_regex.replace_all(&text, "");
        let text = self.email_regex.replace_all(&text, "");
        let text = self.handle_regex.replace_all(&text, "");
        let text = self.punctuation_regex.replace_all(&text, "");
        let text = self.whitespace_regex.replace_all(&text, " ");
        text.trim().to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        sentiscope_core::Error::internal(format!("Failed to compile regex {}: {}", pattern, e))
    })
}
