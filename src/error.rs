//! Error taxonomy for the review analysis pipeline
//!
//! Every error carries the [`Component`] that raised it so a failed file can be
//! reported as "which stage, which condition" without inspecting messages.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Pipeline stage that produced an error or a derived value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Ingestion,
    Aggregation,
    VolumeAnomaly,
    VolumeTrend,
    Repetition,
    Comparator,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Ingestion => "ingestion",
            Component::Aggregation => "aggregation",
            Component::VolumeAnomaly => "volume-anomaly",
            Component::VolumeTrend => "volume-trend",
            Component::Repetition => "repetition",
            Component::Comparator => "comparator",
        };
        f.write_str(name)
    }
}

/// Errors raised while analysing a single review export
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A row whose rating, date or text could not be used. Dropped, never fatal.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// The file could not be read as CSV at all
    #[error("malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },

    /// No usable record survived ingestion
    #[error("no usable reviews ({rows_read} rows read, {dropped} dropped)")]
    EmptyDataset { rows_read: usize, dropped: usize },

    /// A model needs more data points than the series provides
    #[error("insufficient data for {component}: need at least {needed}, got {got}")]
    InsufficientData {
        component: Component,
        needed: usize,
        got: usize,
    },

    /// A group needed for a mean, percentage or t-test is empty or constant
    #[error("{component}: statistic for '{group}' is undefined")]
    DegenerateStatistic {
        component: Component,
        group: String,
    },

    /// The Poisson trend fit did not reach the deviance tolerance
    #[error("poisson fit did not converge after {iterations} iterations")]
    ConvergenceFailure { iterations: usize },

    /// A text-cleaning pattern failed to compile
    #[error("invalid text pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Stage responsible for this error
    pub fn component(&self) -> Component {
        match self {
            AnalysisError::MalformedRow { .. }
            | AnalysisError::MalformedCsv { .. }
            | AnalysisError::EmptyDataset { .. }
            | AnalysisError::InvalidPattern(_)
            | AnalysisError::Io(_) => Component::Ingestion,
            AnalysisError::InsufficientData { component, .. }
            | AnalysisError::DegenerateStatistic { component, .. } => *component,
            AnalysisError::ConvergenceFailure { .. } => Component::VolumeTrend,
        }
    }

    /// Whether this error aborts the analysis of the current file
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AnalysisError::MalformedRow { .. } | AnalysisError::DegenerateStatistic { .. }
        )
    }

    pub(crate) fn degenerate(component: Component, group: impl Into<String>) -> Self {
        AnalysisError::DegenerateStatistic {
            component,
            group: group.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = AnalysisError::InsufficientData {
            component: Component::VolumeAnomaly,
            needed: 2,
            got: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for volume-anomaly: need at least 2, got 1"
        );
    }

    #[test]
    fn test_component_attribution() {
        let err = AnalysisError::ConvergenceFailure { iterations: 100 };
        assert_eq!(err.component(), Component::VolumeTrend);

        let err = AnalysisError::EmptyDataset {
            rows_read: 3,
            dropped: 3,
        };
        assert_eq!(err.component(), Component::Ingestion);

        let err = AnalysisError::degenerate(Component::Repetition, "duplicates");
        assert_eq!(err.component(), Component::Repetition);
    }

    #[test]
    fn test_fatality() {
        assert!(!AnalysisError::degenerate(Component::Comparator, "x").is_fatal());
        assert!(!AnalysisError::MalformedRow {
            line: 2,
            reason: "rating".into()
        }
        .is_fatal());
        assert!(AnalysisError::EmptyDataset {
            rows_read: 0,
            dropped: 0
        }
        .is_fatal());
    }
}
