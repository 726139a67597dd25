//! Ordered, column-addressable table of records under analysis.
//!
//! An [`AnalysisTable`] holds the caller's dataset plus any derived columns
//! (`<column>_cleaned`, `sentiment`, `confidence`). Row order is insertion
//! order and nothing in this module reorders rows.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Name of the derived label column
pub const SENTIMENT_COLUMN: &str = "sentiment";

/// Name of the derived confidence column
pub const CONFIDENCE_COLUMN: &str = "confidence";

/// Suffix of the derived cleaned-text column
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// A single table value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Absent value (empty CSV field, null)
    #[default]
    Missing,
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
}

impl Cell {
    /// Text content, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value; text cells are parsed leniently
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Missing => None,
        }
    }

    /// Whether this cell is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Render the cell for output (missing renders as empty)
    pub fn render(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Missing)
    }
}

/// Tabular dataset with named columns and ordered rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl AnalysisTable {
    /// Create an empty table with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a single-column table from a sequence of optional texts
    pub fn from_texts<I, T>(column: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Cell>,
    {
        Self {
            columns: vec![column.into()],
            rows: texts.into_iter().map(|t| vec![t.into()]).collect(),
        }
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::table(format!(
                "row has {} cells but table has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Index of a column, or a `MissingColumn` error naming it
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::missing_column(name, &self.columns))
    }

    /// Iterate the cells of one column in row order
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Columns that hold free text: at least one non-missing cell that does
    /// not parse as a number. Columns mixing numbers and text count as text.
    pub fn text_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                self.rows.iter().any(|row| match &row[*idx] {
                    Cell::Text(s) => s.trim().parse::<f64>().is_err(),
                    Cell::Number(_) | Cell::Missing => false,
                })
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Add a column, or replace an existing column with the same name.
    /// `values` must have exactly one entry per row.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Cell>) -> Result<()> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(Error::table(format!(
                "column '{}' has {} values but table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.columns.iter().position(|c| *c == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Keep only rows for which `keep` returns true, preserving order
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }
}
