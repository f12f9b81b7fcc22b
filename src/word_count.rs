//! Review length distribution
//!
//! Counts whitespace-separated words of the normalized text and bins them
//! into fixed ranges. Reviews with no words are left out of the distribution.

use crate::error::{AnalysisError, Component};
use crate::ingest::ReviewRecord;
use crate::statistics::percentage;
use serde::Serialize;

/// Half-open `[lower, upper)` word-count ranges and their labels
const BINS: [(usize, Option<usize>, &str); 8] = [
    (1, Some(5), "1-5 words"),
    (5, Some(15), "6-15 words"),
    (15, Some(25), "16-25 words"),
    (25, Some(40), "26-40 words"),
    (40, Some(65), "41-65 words"),
    (65, Some(100), "66-100 words"),
    (100, Some(200), "101-200 words"),
    (200, None, "201+ words"),
];

/// One row of the distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCountBin {
    pub range: &'static str,
    pub review_count: usize,
    /// Share of binned reviews; `None` when no review has any words
    pub percentage: Option<f64>,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn bin_index(words: usize) -> Option<usize> {
    BINS.iter().position(|&(lower, upper, _)| {
        words >= lower && upper.map_or(true, |upper| words < upper)
    })
}

/// Bin every record by word count
pub fn word_count_distribution(
    records: &[ReviewRecord],
    diagnostics: &mut Vec<AnalysisError>,
) -> Vec<WordCountBin> {
    let mut counts = [0usize; BINS.len()];
    for record in records {
        if let Some(idx) = bin_index(word_count(&record.text)) {
            counts[idx] += 1;
        }
    }

    let binned: usize = counts.iter().sum();
    if binned == 0 {
        diagnostics.push(AnalysisError::degenerate(
            Component::Repetition,
            "word count distribution",
        ));
    }

    BINS.iter()
        .zip(counts)
        .map(|(&(_, _, range), review_count)| WordCountBin {
            range,
            review_count,
            percentage: percentage(review_count, binned),
        })
        .collect()
}
