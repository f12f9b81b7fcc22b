//! Daily aggregation and smoothing
//!
//! Reviews are bucketed per calendar day over the dense range
//! `[first_date, last_date]`; days without reviews get a zero count so the
//! outlier and regression models see a contiguous series.

use crate::error::{AnalysisError, Component, Result};
use crate::ingest::ReviewRecord;
use crate::volume_anomaly::VolumeLabel;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Review count for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
    /// Trailing mean over the rolling window, 0 before the window fills
    pub rolling_mean: f64,
}

/// Fully annotated bucket handed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: usize,
    pub rolling_mean: f64,
    pub anomaly: VolumeLabel,
    /// Fitted mean of the Poisson trend model for this day
    pub expected_volume: f64,
    /// Count exceeds the trend ceiling
    pub high_volume: bool,
}

/// Dense, date-ordered series of daily counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySeries {
    buckets: Vec<DailyCount>,
    window: usize,
}

/// Count reviews per calendar day
pub fn count_by_date(records: &[ReviewRecord]) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.date).or_insert(0) += 1;
    }
    counts
}

/// Expand sparse day counts to every date between the first and last key
pub fn densify(counts: &BTreeMap<NaiveDate, usize>) -> Vec<(NaiveDate, usize)> {
    let (Some((&first, _)), Some((&last, _))) = (counts.first_key_value(), counts.last_key_value())
    else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| (date, counts.get(&date).copied().unwrap_or(0)))
        .collect()
}

/// Trailing rolling mean
///
/// For `i >= window - 1` the value is the mean of `counts[i + 1 - window..=i]`;
/// earlier positions are defined as 0.
///
/// # Example
/// ```
/// use revscan::daily::rolling_mean;
///
/// let means = rolling_mean(&[3, 6, 9, 12], 3);
/// assert_eq!(means, vec![0.0, 0.0, 6.0, 9.0]);
/// ```
pub fn rolling_mean(counts: &[usize], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut means = vec![0.0; counts.len()];
    let mut running: usize = 0;

    for (i, &count) in counts.iter().enumerate() {
        running += count;
        if i >= window {
            running -= counts[i - window];
        }
        if i + 1 >= window {
            means[i] = running as f64 / window as f64;
        }
    }

    means
}

impl DailySeries {
    /// Bucket records into a dense daily series
    pub fn from_records(records: &[ReviewRecord], window: usize) -> Result<Self> {
        let dense = densify(&count_by_date(records));
        if dense.is_empty() {
            return Err(AnalysisError::InsufficientData {
                component: Component::Aggregation,
                needed: 1,
                got: 0,
            });
        }

        let counts: Vec<usize> = dense.iter().map(|&(_, count)| count).collect();
        let means = rolling_mean(&counts, window);

        let buckets = dense
            .into_iter()
            .zip(means)
            .map(|((date, count), rolling_mean)| DailyCount {
                date,
                count,
                rolling_mean,
            })
            .collect();

        Ok(Self { buckets, window })
    }

    pub fn buckets(&self) -> &[DailyCount] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.buckets.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.buckets.last().map(|b| b.date)
    }

    /// Days between the first and last review
    pub fn span_days(&self) -> i64 {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        }
    }

    pub fn counts(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.count as f64).collect()
    }

    /// `(count, rolling_mean)` feature vectors for the outlier model
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.buckets
            .iter()
            .map(|b| vec![b.count as f64, b.rolling_mean])
            .collect()
    }

    /// Combine the series with per-day model outputs
    ///
    /// `labels` and `expected` must be aligned with the buckets.
    pub fn annotate(&self, labels: &[VolumeLabel], expected: &[f64], ceiling: u64) -> Vec<DailyBucket> {
        self.buckets
            .iter()
            .zip(labels.iter().zip(expected))
            .map(|(b, (&anomaly, &expected_volume))| DailyBucket {
                date: b.date,
                count: b.count,
                rolling_mean: b.rolling_mean,
                anomaly,
                expected_volume,
                high_volume: b.count as u64 > ceiling,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_densify_fills_gaps_with_zero() {
        let mut counts = BTreeMap::new();
        counts.insert(day(1), 2);
        counts.insert(day(4), 5);

        let dense = densify(&counts);

        assert_eq!(
            dense,
            vec![(day(1), 2), (day(2), 0), (day(3), 0), (day(4), 5)]
        );
    }

    #[test]
    fn test_densify_single_day() {
        let mut counts = BTreeMap::new();
        counts.insert(day(9), 1);
        assert_eq!(densify(&counts), vec![(day(9), 1)]);
    }

    #[test]
    fn test_densify_empty() {
        assert!(densify(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_rolling_mean_window_three() {
        let counts = [2, 3, 2, 50, 3];
        let means = rolling_mean(&counts, 3);

        assert_eq!(means[0], 0.0);
        assert_eq!(means[1], 0.0);
        assert!((means[2] - 7.0 / 3.0).abs() < 1e-12);
        assert!((means[3] - 55.0 / 3.0).abs() < 1e-12);
        assert!((means[4] - 55.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_mean_shorter_than_window() {
        assert_eq!(rolling_mean(&[4, 4], 3), vec![0.0, 0.0]);
        assert_eq!(rolling_mean(&[4, 6], 1), vec![4.0, 6.0]);
    }

    #[test]
    fn test_dense_length_matches_span() {
        let mut counts = BTreeMap::new();
        counts.insert(day(3), 1);
        counts.insert(day(10), 1);
        let dense = densify(&counts);
        assert_eq!(dense.len(), 8);
    }
}
