//! Aggregation over a classified table
//!
//! Pure functions of a table snapshot: calling any of them twice on the same
//! table yields identical output.

use crate::config::ConfidenceThresholds;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sentiscope_core::{
    round_to, AnalysisTable, Cell, Error, Result, SentimentLabel, CONFIDENCE_COLUMN,
    SENTIMENT_COLUMN,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Count and share of one label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelShare {
    pub count: usize,
    /// Percent of all rows, one decimal place
    pub percentage: f64,
}

impl fmt::Display for LabelShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.count, self.percentage)
    }
}

/// Label → share, in ordinal label order. Labels that never occur are absent.
pub type Distribution = BTreeMap<SentimentLabel, LabelShare>;

/// Descriptive statistics of the confidence column
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfidenceStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Rows with confidence strictly above the high threshold
    pub high_count: usize,
    /// Rows with confidence strictly below the low threshold
    pub low_count: usize,
}

/// Headline numbers for a classified table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unique_labels: usize,
    pub most_common: Option<SentimentLabel>,
    pub average_confidence: f64,
    pub high_confidence: usize,
}

/// One equal-width confidence bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Label counts for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub counts: BTreeMap<SentimentLabel, usize>,
}

/// Label distribution over the `sentiment` column
pub fn distribution(table: &AnalysisTable) -> Result<Distribution> {
    let total = table.len();
    let mut counts: BTreeMap<SentimentLabel, usize> = BTreeMap::new();
    for label in labels(table)? {
        *counts.entry(label).or_insert(0) += 1;
    }

    Ok(counts
        .into_iter()
        .map(|(label, count)| {
            let percentage = round_to(count as f64 / total as f64 * 100.0, 1);
            (label, LabelShare { count, percentage })
        })
        .collect())
}

/// Mean, median, min and max (3 dp) of the `confidence` column, plus the
/// number of rows above `thresholds.high` and below `thresholds.low`.
/// An empty table gives all zeros.
pub fn confidence_stats(
    table: &AnalysisTable,
    thresholds: &ConfidenceThresholds,
) -> Result<ConfidenceStats> {
    let mut values = confidences(table)?;
    if values.is_empty() {
        return Ok(ConfidenceStats::default());
    }

    values.sort_by(f64::total_cmp);
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };

    Ok(ConfidenceStats {
        mean: round_to(mean, 3),
        median: round_to(median, 3),
        min: round_to(values[0], 3),
        max: round_to(values[n - 1], 3),
        high_count: values.iter().filter(|&&c| c > thresholds.high).count(),
        low_count: values.iter().filter(|&&c| c < thresholds.low).count(),
    })
}

/// Totals, most common label and average confidence.
///
/// Ties for most common go to the alphabetically first display name, so
/// "Positive" wins over "Very Negative" at equal counts.
pub fn summary(table: &AnalysisTable, thresholds: &ConfidenceThresholds) -> Result<Summary> {
    let dist = distribution(table)?;
    let stats = confidence_stats(table, thresholds)?;

    let most_common = dist
        .iter()
        .max_by(|(a, x), (b, y)| {
            x.count
                .cmp(&y.count)
                .then_with(|| b.as_str().cmp(a.as_str()))
        })
        .map(|(label, _)| *label);

    Ok(Summary {
        total: table.len(),
        unique_labels: dist.len(),
        most_common,
        average_confidence: stats.mean,
        high_confidence: stats.high_count,
    })
}

/// Equal-width histogram of confidence over [0, 1]; the last bin is closed
pub fn confidence_histogram(table: &AnalysisTable, bins: usize) -> Result<Vec<HistogramBin>> {
    if bins == 0 {
        return Err(Error::config("histogram needs at least one bin"));
    }

    let width = 1.0 / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|idx| HistogramBin {
            lower: round_to(idx as f64 * width, 6),
            upper: round_to((idx + 1) as f64 * width, 6),
            count: 0,
        })
        .collect();

    for value in confidences(table)? {
        let idx = ((value.clamp(0.0, 1.0) * bins as f64).floor() as usize).min(bins - 1);
        histogram[idx].count += 1;
    }

    Ok(histogram)
}

/// Per-day label counts, days ascending. Rows whose date does not parse are skipped.
pub fn timeline(table: &AnalysisTable, date_column: &str) -> Result<Vec<TimelinePoint>> {
    let dates: Vec<&Cell> = table.column(date_column)?.collect();
    let labels = labels(table)?;

    let mut days: BTreeMap<NaiveDate, BTreeMap<SentimentLabel, usize>> = BTreeMap::new();
    let mut skipped = 0usize;

    for (cell, label) in dates.into_iter().zip(labels) {
        match cell.as_text().and_then(parse_date) {
            Some(date) => *days.entry(date).or_default().entry(label).or_insert(0) += 1,
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Timeline skipped {} rows with unparseable '{}'", skipped, date_column);
    }

    Ok(days
        .into_iter()
        .map(|(date, counts)| TimelinePoint { date, counts })
        .collect())
}

/// Render a distribution as `Label: count (pct%)` lines
pub fn format_distribution(dist: &Distribution) -> String {
    dist.iter()
        .map(|(label, share)| format!("{}: {}", label, share))
        .collect::<Vec<_>>()
        .join("\n")
}

fn labels(table: &AnalysisTable) -> Result<Vec<SentimentLabel>> {
    table
        .column(SENTIMENT_COLUMN)?
        .enumerate()
        .map(|(row, cell)| {
            cell.as_text()
                .ok_or_else(|| Error::table(format!("row {}: sentiment label is missing", row)))?
                .parse::<SentimentLabel>()
                .map_err(|e| Error::table(format!("row {}: {}", row, e)))
        })
        .collect()
}

fn confidences(table: &AnalysisTable) -> Result<Vec<f64>> {
    table
        .column(CONFIDENCE_COLUMN)?
        .enumerate()
        .map(|(row, cell)| {
            cell.as_number()
                .filter(|c| c.is_finite())
                .ok_or_else(|| {
                    Error::table(format!("row {}: confidence '{}' is not a number", row, cell.render()))
                })
        })
        .collect()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    None
}
