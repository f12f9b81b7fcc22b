// Rating comparisons between binary partitions of a review set
//
// Every analysis splits reviews into a flagged group (anomalous day,
// high-volume day, duplicate text, common phrase) and the rest. This module
// wraps aprender's hypothesis testing and trueno's vector primitives to
// compare the two groups' ratings.
//
// - Group means use trueno::Vector (SIMD)
// - Welch's t-test (unequal variances) uses aprender::stats::hypothesis::ttest_ind
// - An empty group never yields NaN or 0: the value is None and a
//   DegenerateStatistic diagnostic is recorded

use crate::error::{AnalysisError, Component, Result};
use serde::Serialize;
use trueno::Vector;

/// Result of Welch's two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WelchTest {
    /// t-statistic; positive when the first group has the higher mean
    pub statistic: f64,

    /// Two-tailed p-value
    pub pvalue: f64,

    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
}

impl WelchTest {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.pvalue < alpha
    }
}

/// Mean ratings of a flagged group versus the remaining reviews
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub flagged_label: &'static str,
    pub other_label: &'static str,
    pub flagged_count: usize,
    pub other_count: usize,
    /// `None` when the flagged group is empty
    pub flagged_mean: Option<f64>,
    /// `None` when the other group is empty
    pub other_mean: Option<f64>,
    /// `None` when either group is too small or both are constant
    pub welch: Option<WelchTest>,
}

/// Arithmetic mean via trueno; `None` for an empty slice
pub fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Vector::from_slice(values).mean().ok().map(f64::from)
}

/// `part / whole * 100`; `None` when `whole` is zero
pub fn percentage(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

/// Split ratings by a flag into (flagged, other)
pub fn split_ratings<I>(pairs: I) -> (Vec<f32>, Vec<f32>)
where
    I: IntoIterator<Item = (f64, bool)>,
{
    let mut flagged = Vec::new();
    let mut other = Vec::new();
    for (rating, is_flagged) in pairs {
        if is_flagged {
            flagged.push(rating as f32);
        } else {
            other.push(rating as f32);
        }
    }
    (flagged, other)
}

/// Compare two rating distributions using Welch's independent t-test
///
/// Swapping the arguments negates the statistic and leaves the p-value unchanged.
///
/// # Example
/// ```ignore
/// use revscan::statistics::welch_t_test;
///
/// let organic = vec![3.0, 4.0, 2.0, 5.0, 3.0];
/// let promoted = vec![5.0, 5.0, 4.0, 5.0, 5.0];
///
/// let result = welch_t_test(&promoted, &organic).unwrap();
/// assert!(result.statistic > 0.0);
/// ```
pub fn welch_t_test(first: &[f32], second: &[f32]) -> Result<WelchTest> {
    if first.len() < 2 || second.len() < 2 {
        return Err(AnalysisError::degenerate(
            Component::Comparator,
            format!(
                "t-test needs 2 ratings per group, got {} and {}",
                first.len(),
                second.len()
            ),
        ));
    }

    if is_constant(first) && is_constant(second) {
        return Err(AnalysisError::degenerate(
            Component::Comparator,
            "t-test with zero variance in both groups",
        ));
    }

    let result = aprender::stats::hypothesis::ttest_ind(first, second, false).map_err(|e| {
        AnalysisError::degenerate(Component::Comparator, format!("t-test failed: {}", e))
    })?;

    let test = WelchTest {
        statistic: f64::from(result.statistic),
        pvalue: f64::from(result.pvalue),
        df: f64::from(result.df),
    };

    if !(test.statistic.is_finite() && test.pvalue.is_finite()) {
        return Err(AnalysisError::degenerate(
            Component::Comparator,
            "t-test produced a non-finite result",
        ));
    }

    Ok(test)
}

fn is_constant(values: &[f32]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Compare the ratings of a flagged group against the rest
///
/// Undefined means and tests are pushed onto `diagnostics` as
/// [`AnalysisError::DegenerateStatistic`] attributed to `component`.
pub fn compare_groups(
    component: Component,
    labels: (&'static str, &'static str),
    flagged: &[f32],
    other: &[f32],
    diagnostics: &mut Vec<AnalysisError>,
) -> GroupComparison {
    let (flagged_label, other_label) = labels;

    let flagged_mean = mean(flagged);
    if flagged_mean.is_none() {
        diagnostics.push(AnalysisError::degenerate(
            component,
            format!("mean rating of {}", flagged_label),
        ));
    }

    let other_mean = mean(other);
    if other_mean.is_none() {
        diagnostics.push(AnalysisError::degenerate(
            component,
            format!("mean rating of {}", other_label),
        ));
    }

    let welch = match welch_t_test(flagged, other) {
        Ok(test) => Some(test),
        Err(e) => {
            tracing::debug!("{} t-test skipped: {}", component, e);
            diagnostics.push(e);
            None
        }
    };

    GroupComparison {
        flagged_label,
        other_label,
        flagged_count: flagged.len(),
        other_count: other.len(),
        flagged_mean,
        other_mean,
        welch,
    }
}
