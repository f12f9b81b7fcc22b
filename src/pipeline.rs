//! Per-file analysis pipeline
//!
//! ingest → daily series → {volume anomaly, volume trend} and
//! ingest → {duplicates, phrases, word counts}. Every file is analysed
//! independently; a failure in one file never affects another.

use crate::config::{AnalysisConfig, TokenizerKind};
use crate::csv_output::format_value;
use crate::daily::{DailyBucket, DailySeries};
use crate::error::{AnalysisError, Component, Result};
use crate::ingest::{ingest_csv, IngestSummary, ReviewRecord};
use crate::repetition::{analyze_duplicates, analyze_phrases, DuplicateReport, PhraseMiner, PhraseReport};
use crate::statistics::GroupComparison;
use crate::text::{TextNormalizer, Tokenizer, WhitespaceTokenizer, WordTokenizer};
use crate::trend::{TrendReport, VolumeTrendModel};
use crate::volume_anomaly::{AnomalyReport, VolumeAnomalyDetector};
use crate::word_count::{word_count_distribution, WordCountBin};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Non-fatal problem recorded while analysing a file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub component: Component,
    pub message: String,
}

impl From<&AnalysisError> for Diagnostic {
    fn from(err: &AnalysisError) -> Self {
        Self {
            component: err.component(),
            message: err.to_string(),
        }
    }
}

/// Everything derived from one review export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub company_name: String,
    pub product_name: String,
    pub ingest: IngestSummary,
    /// Dense daily series with model outputs, for external renderers
    pub buckets: Vec<DailyBucket>,
    pub anomaly: AnomalyReport,
    pub trend: TrendReport,
    pub duplicates: DuplicateReport,
    pub phrases: PhraseReport,
    pub word_counts: Vec<WordCountBin>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of analysing one path in a batch
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileReport>,
}

/// Company name encoded in an export file name: everything before the first `.`
///
/// # Example
/// ```
/// use revscan::pipeline::company_name_from_path;
///
/// assert_eq!(company_name_from_path("reviews/acme.blender.csv"), "acme");
/// ```
pub fn company_name_from_path<P: AsRef<Path>>(path: P) -> String {
    let file_name = path
        .as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => file_name,
    }
}

/// Runs the full analysis for review exports
///
/// The tokenizer is constructed once and shared by every file.
pub struct ReviewAnalyzer {
    config: AnalysisConfig,
    normalizer: TextNormalizer,
    tokenizer: Box<dyn Tokenizer>,
}

impl ReviewAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let tokenizer: Box<dyn Tokenizer> = match config.tokenizer {
            TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
            TokenizerKind::Word => Box::new(WordTokenizer::new()?),
        };
        Ok(Self {
            config,
            normalizer: TextNormalizer::new()?,
            tokenizer,
        })
    }

    /// Replace the tokenizer used for phrase mining
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<FileReport> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        self.analyze_csv(&company_name_from_path(path), &content)
    }

    pub fn analyze_csv(&self, company_name: &str, content: &str) -> Result<FileReport> {
        let (records, ingest) = ingest_csv(content, &self.normalizer)?;
        self.analyze_records(company_name, &records, ingest)
    }

    /// Analyse already validated records
    pub fn analyze_records(
        &self,
        company_name: &str,
        records: &[ReviewRecord],
        ingest: IngestSummary,
    ) -> Result<FileReport> {
        if records.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                rows_read: ingest.rows_read,
                dropped: ingest.dropped_rows(),
            });
        }

        let mut diagnostics = Vec::new();
        let series = DailySeries::from_records(records, self.config.rolling_window)?;

        let anomaly = VolumeAnomalyDetector::new(&self.config).analyze(&series, records, &mut diagnostics)?;
        let trend = VolumeTrendModel::new(&self.config).analyze(&series, records, &mut diagnostics)?;
        let buckets = series.annotate(&anomaly.labels(), &trend.model.fitted, trend.max_reviews_per_day);

        let duplicates = analyze_duplicates(records, &mut diagnostics);
        let miner = PhraseMiner::new(
            self.tokenizer.as_ref(),
            self.config.min_phrase_length,
            self.config.max_phrase_length,
            self.config.min_phrase_freq,
        );
        let phrases = analyze_phrases(records, &miner, self.config.top_phrases, &mut diagnostics);
        let word_counts = word_count_distribution(records, &mut diagnostics);

        for diagnostic in &diagnostics {
            tracing::debug!(company = company_name, "{}", diagnostic);
        }

        let product_name = records
            .first()
            .map(|r| r.product_name.clone())
            .unwrap_or_default();

        tracing::info!(
            company = company_name,
            records = records.len(),
            days = buckets.len(),
            "analysis complete"
        );

        Ok(FileReport {
            company_name: company_name.to_string(),
            product_name,
            ingest,
            buckets,
            anomaly,
            trend,
            duplicates,
            phrases,
            word_counts,
            diagnostics: diagnostics.iter().map(Diagnostic::from).collect(),
        })
    }

    /// Analyse every path, isolating failures per file
    pub fn analyze_batch<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<FileOutcome> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let result = self.analyze_file(path);
                if let Err(e) = &result {
                    tracing::warn!(file = %path.display(), component = %e.component(), "analysis failed: {}", e);
                }
                FileOutcome {
                    path: path.to_path_buf(),
                    result,
                }
            })
            .collect()
    }
}

fn write_comparison(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    cmp: &GroupComparison,
    alpha: f64,
) -> fmt::Result {
    writeln!(f, "{}:", title)?;
    writeln!(
        f,
        "  {:<32} {:>6} reviews, mean rating {}",
        cmp.flagged_label,
        cmp.flagged_count,
        format_value(cmp.flagged_mean)
    )?;
    writeln!(
        f,
        "  {:<32} {:>6} reviews, mean rating {}",
        cmp.other_label,
        cmp.other_count,
        format_value(cmp.other_mean)
    )?;
    match cmp.welch {
        Some(test) => {
            let verdict = if test.is_significant(alpha) {
                "significant"
            } else {
                "not significant"
            };
            writeln!(
                f,
                "  Welch t = {:.4}, p = {:.4} ({} at {})",
                test.statistic, test.pvalue, verdict, alpha
            )
        }
        None => writeln!(f, "  Welch t-test undefined"),
    }
}

/// Text rendering of a [`FileReport`] at a given significance level
pub struct ReportDisplay<'a> {
    report: &'a FileReport,
    alpha: f64,
}

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let alpha = self.alpha;

        writeln!(f, "=== {} / {} ===", r.company_name, r.product_name)?;
        writeln!(
            f,
            "Reviews: {} usable, {} dropped of {} rows",
            r.ingest.accepted,
            r.ingest.dropped_rows(),
            r.ingest.rows_read
        )?;
        writeln!(
            f,
            "Days: {} ({} days between first and last review)",
            r.buckets.len(),
            r.trend.days_diff
        )?;
        writeln!(f)?;

        writeln!(
            f,
            "Volume anomalies: {} of {} days ({}%)",
            r.anomaly.flagged_dates.len(),
            r.anomaly.days.len(),
            format_value(r.anomaly.percentage_anomalies)
        )?;
        for date in &r.anomaly.flagged_dates {
            writeln!(f, "  {}", date)?;
        }
        write_comparison(f, "Ratings on anomalous days", &r.anomaly.ratings, alpha)?;
        writeln!(f)?;

        writeln!(
            f,
            "Volume trend: ceiling {} reviews/day, {} days above ({} reviews, {}%)",
            r.trend.max_reviews_per_day,
            r.trend.num_dates_higher_than_max,
            r.trend.total_reviews_higher_than_max,
            format_value(r.trend.high_volume_review_percentage)
        )?;
        write_comparison(f, "Ratings on high-volume days", &r.trend.ratings, alpha)?;
        writeln!(f)?;

        writeln!(
            f,
            "Duplicates: {} groups, {}% of reviews",
            r.duplicates.groups.len(),
            format_value(r.duplicates.percentage_non_unique)
        )?;
        write_comparison(f, "Ratings of duplicated reviews", &r.duplicates.ratings, alpha)?;
        writeln!(f)?;

        writeln!(
            f,
            "Common phrases: {} phrases, {}% of reviews contain one",
            r.phrases.common_phrase_count,
            format_value(r.phrases.percentage_with_common_phrases)
        )?;
        for phrase in &r.phrases.top_phrases {
            writeln!(f, "  {:>5}  {}", phrase.frequency, phrase.phrase)?;
        }
        write_comparison(f, "Ratings with common phrases", &r.phrases.ratings, alpha)?;
        writeln!(f)?;

        writeln!(f, "Word counts:")?;
        for bin in &r.word_counts {
            writeln!(
                f,
                "  {:<14} {:>6} ({}%)",
                bin.range,
                bin.review_count,
                format_value(bin.percentage)
            )?;
        }

        if !r.diagnostics.is_empty() {
            writeln!(f)?;
            writeln!(f, "Diagnostics:")?;
            for diagnostic in &r.diagnostics {
                writeln!(f, "  {}: {}", diagnostic.component, diagnostic.message)?;
            }
        }

        Ok(())
    }
}

impl FileReport {
    /// Displayable summary with Welch verdicts at `alpha`
    pub fn display(&self, alpha: f64) -> ReportDisplay<'_> {
        ReportDisplay {
            report: self,
            alpha,
        }
    }

    /// Human-readable summary
    pub fn to_report_string(&self, alpha: f64) -> String {
        self.display(alpha).to_string()
    }
}
