//! Volume anomaly detection over the daily review series
//!
//! Each day becomes a `(count, rolling_mean)` point; an isolation forest
//! scores the points and the contamination fraction turns scores into an
//! explicit [`VolumeLabel`] per day.

use crate::config::AnalysisConfig;
use crate::daily::DailySeries;
use crate::error::{AnalysisError, Component, Result};
use crate::ingest::ReviewRecord;
use crate::isolation_forest::{outliers_by_contamination, IsolationForest};
use crate::statistics::{compare_groups, percentage, split_ratings, GroupComparison};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of the volume outlier model for one day
///
/// Written to result tables as `0` (normal) or `1` (anomaly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeLabel {
    #[default]
    Normal,
    Anomaly,
}

impl VolumeLabel {
    pub fn is_anomaly(self) -> bool {
        self == VolumeLabel::Anomaly
    }

    /// `0` for normal days, `1` for anomalous days
    pub fn as_flag(self) -> u8 {
        match self {
            VolumeLabel::Normal => 0,
            VolumeLabel::Anomaly => 1,
        }
    }
}

impl From<bool> for VolumeLabel {
    fn from(is_outlier: bool) -> Self {
        if is_outlier {
            VolumeLabel::Anomaly
        } else {
            VolumeLabel::Normal
        }
    }
}

/// Score and label of a single day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayScore {
    pub date: NaiveDate,
    /// Isolation score in `(0, 1]`, higher is more anomalous
    pub score: f64,
    pub label: VolumeLabel,
}

/// Per-file anomaly summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub days: Vec<DayScore>,
    pub flagged_dates: Vec<NaiveDate>,
    /// Ratings of reviews posted on anomalous days vs all other reviews
    pub ratings: GroupComparison,
    /// Flagged dates over all dense dates
    pub percentage_anomalies: Option<f64>,
}

impl AnomalyReport {
    pub fn avg_rating_anomalies(&self) -> Option<f64> {
        self.ratings.flagged_mean
    }

    pub fn avg_rating_non_anomalies(&self) -> Option<f64> {
        self.ratings.other_mean
    }

    pub fn labels(&self) -> Vec<VolumeLabel> {
        self.days.iter().map(|d| d.label).collect()
    }
}

/// Isolation-forest detector configured from an [`AnalysisConfig`]
#[derive(Debug, Clone)]
pub struct VolumeAnomalyDetector {
    contamination: f64,
    num_trees: usize,
    subsample_size: usize,
    seed: Option<u64>,
}

impl VolumeAnomalyDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            contamination: config.contamination,
            num_trees: config.num_trees,
            subsample_size: config.subsample_size,
            seed: config.seed,
        }
    }

    /// Score and label every day of the series
    pub fn detect(&self, series: &DailySeries) -> Result<Vec<DayScore>> {
        if series.len() < 2 {
            return Err(AnalysisError::InsufficientData {
                component: Component::VolumeAnomaly,
                needed: 2,
                got: series.len(),
            });
        }

        let features = series.features();
        let mut forest = IsolationForest::new(self.num_trees, Some(self.subsample_size), self.seed);
        forest.fit(&features);

        let scores = forest.score_samples(&features);
        let outliers = outliers_by_contamination(&scores, self.contamination);

        let days: Vec<DayScore> = series
            .buckets()
            .iter()
            .zip(scores.iter().zip(outliers))
            .map(|(bucket, (&score, is_outlier))| DayScore {
                date: bucket.date,
                score,
                label: VolumeLabel::from(is_outlier),
            })
            .collect();

        tracing::debug!(
            days = days.len(),
            flagged = days.iter().filter(|d| d.label.is_anomaly()).count(),
            "isolation forest scored daily series"
        );

        Ok(days)
    }

    /// Detect anomalous days and compare ratings posted on them
    pub fn analyze(
        &self,
        series: &DailySeries,
        records: &[ReviewRecord],
        diagnostics: &mut Vec<AnalysisError>,
    ) -> Result<AnomalyReport> {
        let days = self.detect(series)?;

        let flagged: BTreeSet<NaiveDate> = days
            .iter()
            .filter(|d| d.label.is_anomaly())
            .map(|d| d.date)
            .collect();

        let (on_flagged, elsewhere) =
            split_ratings(records.iter().map(|r| (r.rating, flagged.contains(&r.date))));
        let ratings = compare_groups(
            Component::VolumeAnomaly,
            ("anomalous days", "normal days"),
            &on_flagged,
            &elsewhere,
            diagnostics,
        );

        Ok(AnomalyReport {
            percentage_anomalies: percentage(flagged.len(), days.len()),
            flagged_dates: flagged.into_iter().collect(),
            days,
            ratings,
        })
    }
}
