//! Analysis reports, printed as text or JSON

use sentiscope_classifiers::aggregate::{self, format_distribution};
use sentiscope_classifiers::{
    ConfidenceStats, ConfidenceThresholds, Distribution, HistogramBin, Summary, TimelinePoint,
};
use sentiscope_core::{AnalysisTable, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct Keyword {
    pub phrase: String,
    pub count: usize,
}

/// Everything the CLI reports about a classified table
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub thresholds: ConfidenceThresholds,
    pub distribution: Distribution,
    pub confidence: ConfidenceStats,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub histogram: Vec<HistogramBin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelinePoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Keyword>,
}

impl AnalysisReport {
    /// Distribution, confidence statistics and summary of a classified table
    pub fn from_table(table: &AnalysisTable, thresholds: ConfidenceThresholds) -> Result<Self> {
        Ok(Self {
            rows: table.len(),
            model: None,
            output: None,
            thresholds,
            distribution: aggregate::distribution(table)?,
            confidence: aggregate::confidence_stats(table, &thresholds)?,
            summary: aggregate::summary(table, &thresholds)?,
            histogram: Vec::new(),
            timeline: Vec::new(),
            keywords: Vec::new(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_histogram(mut self, table: &AnalysisTable, bins: usize) -> Result<Self> {
        if bins > 0 {
            self.histogram = aggregate::confidence_histogram(table, bins)?;
        }
        Ok(self)
    }

    pub fn with_timeline(mut self, table: &AnalysisTable, date_column: &str) -> Result<Self> {
        self.timeline = aggregate::timeline(table, date_column)?;
        Ok(self)
    }

    pub fn with_keywords(mut self, keywords: Vec<(String, usize)>) -> Self {
        self.keywords = keywords
            .into_iter()
            .map(|(phrase, count)| Keyword { phrase, count })
            .collect();
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Write the human-readable report to `out`
    pub fn write_text(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let c = &self.confidence;

        writeln!(out, "Rows analyzed: {}", self.rows)?;
        if let Some(model) = &self.model {
            writeln!(out, "Model: {}", model)?;
        }
        if let Some(output) = &self.output {
            writeln!(out, "Results written to: {}", output.display())?;
        }

        writeln!(out, "\nSentiment distribution:")?;
        if self.distribution.is_empty() {
            writeln!(out, "  (no rows)")?;
        }
        for line in format_distribution(&self.distribution).lines() {
            writeln!(out, "  {}", line)?;
        }

        writeln!(out, "\nConfidence:")?;
        writeln!(
            out,
            "  mean {:.3}  median {:.3}  min {:.3}  max {:.3}",
            c.mean, c.median, c.min, c.max
        )?;
        writeln!(
            out,
            "  high (> {}): {}  low (< {}): {}",
            self.thresholds.high, c.high_count, self.thresholds.low, c.low_count
        )?;

        if let Some(label) = self.summary.most_common {
            writeln!(out, "\nMost common: {}", label)?;
        }

        if !self.histogram.is_empty() {
            writeln!(out, "\nConfidence histogram:")?;
            for bin in &self.histogram {
                writeln!(out, "  [{:.2}, {:.2}) {}", bin.lower, bin.upper, bin.count)?;
            }
        }

        if !self.timeline.is_empty() {
            writeln!(out, "\nTimeline:")?;
            for point in &self.timeline {
                write!(out, "  {} ", point.date)?;
                for (idx, (label, count)) in point.counts.iter().enumerate() {
                    let sep = if idx == 0 { " " } else { ", " };
                    write!(out, "{}{}={}", sep, label, count)?;
                }
                writeln!(out)?;
            }
        }

        if !self.keywords.is_empty() {
            writeln!(out, "\nTop keywords:")?;
            for keyword in &self.keywords {
                writeln!(out, "  {} ({})", keyword.phrase, keyword.count)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}
