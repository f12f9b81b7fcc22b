//! JSON output format for batch results
//!
//! Carries the dense bucket series, flagged partitions and summary numbers so
//! an external renderer can draw charts without re-running the analysis.

use crate::error::Component;
use crate::pipeline::{FileOutcome, FileReport};
use serde::Serialize;

/// Why a file produced no report
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    pub component: Component,
    pub message: String,
}

/// Result for one input file
#[derive(Debug, Clone, Serialize)]
pub struct JsonFileResult<'a> {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a FileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonFailure>,
}

/// Complete JSON output for a batch run
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    pub version: String,
    pub format: String,
    pub files: Vec<JsonFileResult<'a>>,
    pub summary: JsonSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JsonSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl<'a> JsonOutput<'a> {
    pub fn new(outcomes: &'a [FileOutcome]) -> Self {
        let files: Vec<JsonFileResult<'a>> = outcomes
            .iter()
            .map(|outcome| {
                let file = outcome.path.display().to_string();
                match &outcome.result {
                    Ok(report) => JsonFileResult {
                        file,
                        report: Some(report),
                        error: None,
                    },
                    Err(e) => JsonFileResult {
                        file,
                        report: None,
                        error: Some(JsonFailure {
                            component: e.component(),
                            message: e.to_string(),
                        }),
                    },
                }
            })
            .collect();

        let failed = files.iter().filter(|f| f.error.is_some()).count();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "revscan-json-v1".to_string(),
            summary: JsonSummary {
                total_files: files.len(),
                succeeded: files.len() - failed,
                failed,
            },
            files,
        }
    }

    /// Serialize to pretty JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
