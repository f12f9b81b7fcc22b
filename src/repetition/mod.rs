// Duplicate and repeated-phrase analysis over normalized review text
//
// Two separate signals of copy-pasted or templated reviews:
// - Exact duplicates: byte-identical normalized text shared by 2+ reviews.
//   Every member of a group is flagged, including the first occurrence.
// - Common phrases: contiguous token windows of several lengths (3, 4 and 5
//   by default) whose corpus-wide frequency reaches a threshold. A review is
//   flagged when it contains at least one of them.
//
// Reviews whose text normalizes to nothing stay in the record set; they just
// never duplicate and contribute no n-grams.

mod duplicates;
mod ngram;

pub use duplicates::{duplicate_flags, find_duplicate_groups, DuplicateGroup};
pub use ngram::{extract_ngrams, top_ngrams, CommonPhrases, NGram, NGramMap, PhraseMiner};

use crate::error::{AnalysisError, Component};
use crate::ingest::ReviewRecord;
use crate::statistics::{compare_groups, percentage, split_ratings, GroupComparison};
use serde::Serialize;

/// Exact-duplicate summary for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub flagged_review_uids: Vec<String>,
    /// Ratings of duplicated reviews vs unique reviews
    pub ratings: GroupComparison,
    pub percentage_non_unique: Option<f64>,
}

impl DuplicateReport {
    pub fn avg_ratings_unique(&self) -> Option<f64> {
        self.ratings.other_mean
    }

    pub fn avg_ratings_non_unique(&self) -> Option<f64> {
        self.ratings.flagged_mean
    }
}

/// A common phrase with its corpus frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseCount {
    pub phrase: String,
    pub frequency: usize,
}

/// Repeated-phrase summary for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseReport {
    pub common_phrase_count: usize,
    pub top_phrases: Vec<PhraseCount>,
    pub flagged_review_uids: Vec<String>,
    /// Ratings of reviews with a common phrase vs without
    pub ratings: GroupComparison,
    pub percentage_with_common_phrases: Option<f64>,
}

impl PhraseReport {
    pub fn ratings_with_phrases(&self) -> Option<f64> {
        self.ratings.flagged_mean
    }

    pub fn ratings_without_phrases(&self) -> Option<f64> {
        self.ratings.other_mean
    }
}

fn flagged_uids(records: &[ReviewRecord], flags: &[bool]) -> Vec<String> {
    records
        .iter()
        .zip(flags)
        .filter(|&(_, &flagged)| flagged)
        .map(|(r, _)| r.review_uid.clone())
        .collect()
}

/// Flag reviews with identical normalized text and compare their ratings
pub fn analyze_duplicates(
    records: &[ReviewRecord],
    diagnostics: &mut Vec<AnalysisError>,
) -> DuplicateReport {
    let groups = find_duplicate_groups(records.iter().map(|r| r.text.as_str()));
    let flags = duplicate_flags(&groups, records.len());
    let flagged_count = flags.iter().filter(|&&f| f).count();

    let (duplicated, unique) =
        split_ratings(records.iter().zip(&flags).map(|(r, &f)| (r.rating, f)));
    let ratings = compare_groups(
        Component::Repetition,
        ("duplicate reviews", "unique reviews"),
        &duplicated,
        &unique,
        diagnostics,
    );

    tracing::debug!(groups = groups.len(), flagged = flagged_count, "duplicate scan");

    DuplicateReport {
        flagged_review_uids: flagged_uids(records, &flags),
        percentage_non_unique: percentage(flagged_count, records.len()),
        groups,
        ratings,
    }
}

/// Mine common phrases, flag reviews containing one and compare ratings
pub fn analyze_phrases(
    records: &[ReviewRecord],
    miner: &PhraseMiner<'_>,
    top_k: usize,
    diagnostics: &mut Vec<AnalysisError>,
) -> PhraseReport {
    let documents: Vec<Vec<String>> = records.iter().map(|r| miner.tokenize(&r.text)).collect();
    let common = miner.mine(&documents);

    let flags: Vec<bool> = documents
        .iter()
        .map(|tokens| common.contains_common_phrase(tokens))
        .collect();
    let flagged_count = flags.iter().filter(|&&f| f).count();

    let (with_phrase, without_phrase) =
        split_ratings(records.iter().zip(&flags).map(|(r, &f)| (r.rating, f)));
    let ratings = compare_groups(
        Component::Repetition,
        ("reviews with common phrases", "reviews without common phrases"),
        &with_phrase,
        &without_phrase,
        diagnostics,
    );

    let top_phrases = common
        .top(top_k)
        .into_iter()
        .map(|(ngram, frequency)| PhraseCount {
            phrase: ngram.join(" "),
            frequency,
        })
        .collect();

    tracing::debug!(
        common_phrases = common.len(),
        flagged = flagged_count,
        "phrase mining"
    );

    PhraseReport {
        common_phrase_count: common.len(),
        top_phrases,
        flagged_review_uids: flagged_uids(records, &flags),
        ratings,
        percentage_with_common_phrases: percentage(flagged_count, records.len()),
    }
}
