//! revscan - review export auditing
//!
//! This library ingests marketplace review exports and flags statistical
//! irregularities that suggest manipulated review activity: bursts of daily
//! volume, days above the fitted volume trend, exact duplicate text and
//! repeated phrasing, each with a rating comparison against the rest.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod daily;
pub mod error;
pub mod ingest;
pub mod isolation_forest;
pub mod json_output;
pub mod pipeline;
pub mod repetition;
pub mod statistics;
pub mod text;
pub mod trend;
pub mod volume_anomaly;
pub mod word_count;

pub use error::{AnalysisError, Component, Result};
pub use pipeline::{FileReport, ReviewAnalyzer};
