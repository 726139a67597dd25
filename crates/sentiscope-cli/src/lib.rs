//! Sentiscope command-line interface
//!
//! CSV in, augmented CSV and a statistics report out.

pub mod cli;
pub mod commands;
pub mod csv_io;
pub mod report;
pub mod telemetry;

pub use cli::{Cli, Commands, LogFormat, ModelArgs};
pub use report::AnalysisReport;
