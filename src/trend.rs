//! Poisson trend model over daily review counts
//!
//! Fits `log(mu_t) = intercept + slope * t` by iteratively reweighted least
//! squares. The largest fitted mean, rounded up, is the volume ceiling: a
//! day whose count exceeds it is a high-volume day. The ceiling is
//! independent of the isolation-forest labels and both are reported.

use crate::config::AnalysisConfig;
use crate::daily::DailySeries;
use crate::error::{AnalysisError, Component, Result};
use crate::ingest::ReviewRecord;
use crate::statistics::{compare_groups, percentage, split_ratings, GroupComparison};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

// Keeps IRLS weights positive for long runs of zero-count days
const MIN_MU: f64 = 1e-10;

/// Fitted log-linear Poisson model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoissonTrend {
    pub intercept: f64,
    pub slope: f64,
    /// Fitted mean for each day index
    pub fitted: Vec<f64>,
    pub iterations: usize,
    pub deviance: f64,
}

impl PoissonTrend {
    /// Expected-volume ceiling, `ceil(max fitted mean)`
    pub fn ceiling(&self) -> u64 {
        let max = self.fitted.iter().copied().fold(0.0_f64, f64::max);
        // exp(ln(k)) may land a hair above an integer k
        let nearest = max.round();
        if (max - nearest).abs() < 1e-9 {
            nearest as u64
        } else {
            max.ceil() as u64
        }
    }
}

fn poisson_deviance(y: &[f64], mu: &[f64]) -> f64 {
    2.0 * y
        .iter()
        .zip(mu)
        .map(|(&y, &mu)| {
            let ylogy = if y > 0.0 { y * (y / mu).ln() } else { 0.0 };
            ylogy - (y - mu)
        })
        .sum::<f64>()
}

/// Fit a Poisson GLM of `counts` against the day index `0..n`
///
/// # Example
/// ```
/// use revscan::trend::fit_poisson_trend;
///
/// let model = fit_poisson_trend(&[4.0, 4.0, 4.0, 4.0], 100, 1e-8).unwrap();
/// assert!(model.slope.abs() < 1e-6);
/// assert_eq!(model.ceiling(), 4);
/// ```
pub fn fit_poisson_trend(counts: &[f64], max_iterations: usize, tolerance: f64) -> Result<PoissonTrend> {
    let n = counts.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            component: Component::VolumeTrend,
            needed: 2,
            got: n,
        });
    }

    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y_mean = counts.iter().sum::<f64>() / n as f64;

    let mut mu: Vec<f64> = counts
        .iter()
        .map(|&y| ((y + y_mean) / 2.0).max(MIN_MU))
        .collect();
    let mut eta: Vec<f64> = mu.iter().map(|m| m.ln()).collect();
    let mut deviance = poisson_deviance(counts, &mu);

    for iteration in 1..=max_iterations {
        // Weighted least squares on the working response
        let (mut sw, mut swx, mut swxx, mut swz, mut swxz) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for i in 0..n {
            let w = mu[i];
            let z = eta[i] + (counts[i] - mu[i]) / mu[i];
            sw += w;
            swx += w * x[i];
            swxx += w * x[i] * x[i];
            swz += w * z;
            swxz += w * x[i] * z;
        }

        let det = sw * swxx - swx * swx;
        if !det.is_finite() || det <= 0.0 {
            return Err(AnalysisError::ConvergenceFailure {
                iterations: iteration,
            });
        }
        let slope = (sw * swxz - swx * swz) / det;
        let intercept = (swz - slope * swx) / sw;

        for i in 0..n {
            eta[i] = intercept + slope * x[i];
            mu[i] = eta[i].exp().max(MIN_MU);
        }

        let previous = deviance;
        deviance = poisson_deviance(counts, &mu);
        if !deviance.is_finite() {
            return Err(AnalysisError::ConvergenceFailure {
                iterations: iteration,
            });
        }

        if (deviance - previous).abs() / (deviance.abs() + 0.1) < tolerance {
            tracing::debug!(iteration, intercept, slope, deviance, "poisson trend converged");
            return Ok(PoissonTrend {
                intercept,
                slope,
                fitted: mu,
                iterations: iteration,
                deviance,
            });
        }
    }

    Err(AnalysisError::ConvergenceFailure {
        iterations: max_iterations,
    })
}

/// Per-file trend summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub model: PoissonTrend,
    /// Days between the first and last review
    pub days_diff: i64,
    /// Volume ceiling derived from the fitted model
    pub max_reviews_per_day: u64,
    pub high_volume_dates: Vec<NaiveDate>,
    pub num_dates_higher_than_max: usize,
    pub total_reviews_higher_than_max: usize,
    /// Reviews on high-volume days over all usable reviews
    pub high_volume_review_percentage: Option<f64>,
    /// Ratings on high-volume days vs all other days
    pub ratings: GroupComparison,
}

impl TrendReport {
    pub fn avg_ratings_higher_than_max(&self) -> Option<f64> {
        self.ratings.flagged_mean
    }

    pub fn avg_ratings_lower_than_max(&self) -> Option<f64> {
        self.ratings.other_mean
    }
}

/// Trend model configured from an [`AnalysisConfig`]
#[derive(Debug, Clone)]
pub struct VolumeTrendModel {
    max_iterations: usize,
    tolerance: f64,
}

impl VolumeTrendModel {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }

    pub fn fit(&self, series: &DailySeries) -> Result<PoissonTrend> {
        fit_poisson_trend(&series.counts(), self.max_iterations, self.tolerance)
    }

    /// Fit the trend and split reviews at the volume ceiling
    pub fn analyze(
        &self,
        series: &DailySeries,
        records: &[ReviewRecord],
        diagnostics: &mut Vec<AnalysisError>,
    ) -> Result<TrendReport> {
        let model = self.fit(series)?;
        let ceiling = model.ceiling();

        let high: BTreeSet<NaiveDate> = series
            .buckets()
            .iter()
            .filter(|b| b.count as u64 > ceiling)
            .map(|b| b.date)
            .collect();
        let total_high: usize = series
            .buckets()
            .iter()
            .filter(|b| high.contains(&b.date))
            .map(|b| b.count)
            .sum();

        let (on_high, elsewhere) =
            split_ratings(records.iter().map(|r| (r.rating, high.contains(&r.date))));
        let ratings = compare_groups(
            Component::VolumeTrend,
            ("high-volume days", "other days"),
            &on_high,
            &elsewhere,
            diagnostics,
        );

        tracing::debug!(ceiling, high_days = high.len(), "volume trend ceiling");

        Ok(TrendReport {
            days_diff: series.span_days(),
            max_reviews_per_day: ceiling,
            num_dates_higher_than_max: high.len(),
            total_reviews_higher_than_max: total_high,
            high_volume_review_percentage: percentage(total_high, records.len()),
            high_volume_dates: high.into_iter().collect(),
            ratings,
            model,
        })
    }
}
