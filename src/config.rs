//! Analysis configuration
//!
//! All tunables of the pipeline live here so a run can be reproduced from a
//! single TOML file. Command-line flags override individual fields.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How the anomaly table renders `product_name`
///
/// One historical export wrote the product name as a one-element tuple
/// (`('name',)`) instead of a scalar. Downstream consumers may depend on
/// either shape, so both are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductNameShape {
    #[default]
    Scalar,
    Singleton,
}

/// Tokenizer used for phrase mining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Split on whitespace
    #[default]
    Whitespace,
    /// Runs of word characters
    Word,
}

/// Configuration for one pipeline run
///
/// # Example
/// ```
/// use revscan::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.contamination, 0.05);
/// assert_eq!(config.min_phrase_freq, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Expected fraction of anomalous days for the isolation forest
    pub contamination: f64,

    /// Number of isolation trees
    pub num_trees: usize,

    /// Points drawn per tree (capped at the series length)
    pub subsample_size: usize,

    /// RNG seed for the isolation forest. `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Trailing window of the daily rolling mean
    ///
    /// Buckets with fewer than `rolling_window - 1` predecessors get 0.
    pub rolling_window: usize,

    /// Shortest n-gram order mined for repeated phrases
    pub min_phrase_length: usize,

    /// Longest n-gram order mined for repeated phrases
    pub max_phrase_length: usize,

    /// Corpus frequency at which an n-gram becomes a common phrase
    pub min_phrase_freq: usize,

    /// IRLS iteration cap for the Poisson trend model
    pub max_iterations: usize,

    /// Relative deviance change that ends IRLS
    pub tolerance: f64,

    /// Alpha used to label t-test results as significant
    pub significance_level: f64,

    /// Rendering of `product_name` in the anomaly table
    pub product_name_shape: ProductNameShape,

    /// Number of most frequent common phrases kept in the report
    pub top_phrases: usize,

    /// Tokenizer for phrase mining
    pub tokenizer: TokenizerKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            contamination: 0.05,
            num_trees: 100,
            subsample_size: 256,
            seed: None,
            rolling_window: 3,
            min_phrase_length: 3,
            max_phrase_length: 5,
            min_phrase_freq: 3,
            max_iterations: 100,
            tolerance: 1e-8,
            significance_level: 0.05,
            product_name_shape: ProductNameShape::Scalar,
            top_phrases: 10,
            tokenizer: TokenizerKind::Whitespace,
        }
    }
}

impl AnalysisConfig {
    /// Fewer flagged days and phrases: lower contamination, rarer phrases must repeat more
    pub fn strict() -> Self {
        Self {
            contamination: 0.01,
            min_phrase_freq: 5,
            significance_level: 0.01,
            ..Self::default()
        }
    }

    /// More flagged days and phrases, for a first exploratory pass
    pub fn permissive() -> Self {
        Self {
            contamination: 0.10,
            min_phrase_freq: 2,
            significance_level: 0.10,
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file; missing keys keep their defaults
    ///
    /// # Example TOML
    /// ```toml
    /// contamination = 0.05
    /// num_trees = 200
    /// seed = 42
    /// min_phrase_freq = 4
    /// product_name_shape = "singleton"
    /// ```
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.contamination.is_nan() || self.contamination <= 0.0 || self.contamination > 0.5 {
            return Err(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            ));
        }

        if self.num_trees == 0 {
            return Err("num_trees must be >= 1".to_string());
        }

        if self.subsample_size < 2 {
            return Err(format!(
                "subsample_size must be >= 2, got {}",
                self.subsample_size
            ));
        }

        if self.rolling_window == 0 {
            return Err("rolling_window must be >= 1".to_string());
        }

        if self.min_phrase_length == 0 || self.min_phrase_length > self.max_phrase_length {
            return Err(format!(
                "phrase lengths must satisfy 1 <= min <= max, got {}..={}",
                self.min_phrase_length, self.max_phrase_length
            ));
        }

        if self.min_phrase_freq < 2 {
            return Err(format!(
                "min_phrase_freq must be >= 2 to count as repetition, got {}",
                self.min_phrase_freq
            ));
        }

        if self.max_iterations == 0 {
            return Err("max_iterations must be >= 1".to_string());
        }

        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(format!("tolerance must be positive, got {}", self.tolerance));
        }

        if !(0.0..=1.0).contains(&self.significance_level) {
            return Err(format!(
                "significance_level must be in [0, 1], got {}",
                self.significance_level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.rolling_window, 3);
        assert_eq!(config.min_phrase_length, 3);
        assert_eq!(config.max_phrase_length, 5);
        assert_eq!(config.min_phrase_freq, 3);
        assert_eq!(config.product_name_shape, ProductNameShape::Scalar);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(AnalysisConfig::strict().validate().is_ok());
        assert!(AnalysisConfig::permissive().validate().is_ok());
        assert!(AnalysisConfig::strict().contamination < AnalysisConfig::permissive().contamination);
    }

    #[test]
    fn test_toml_partial_override() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            contamination = 0.1
            seed = 7
            product_name_shape = "singleton"
            tokenizer = "word"
            "#,
        )
        .unwrap();

        assert_eq!(config.contamination, 0.1);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.product_name_shape, ProductNameShape::Singleton);
        assert_eq!(config.tokenizer, TokenizerKind::Word);
        // Untouched keys keep defaults
        assert_eq!(config.num_trees, 100);
    }

    #[test]
    fn test_toml_rejects_invalid_values() {
        assert!(AnalysisConfig::from_toml_str("contamination = 0.9").is_err());
        assert!(AnalysisConfig::from_toml_str("min_phrase_length = 6").is_err());
        assert!(AnalysisConfig::from_toml_str("num_trees = \"many\"").is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_min_phrase_freq() {
        let mut config = AnalysisConfig::default();
        config.min_phrase_freq = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_rolling_window() {
        let mut config = AnalysisConfig::default();
        config.rolling_window = 0;
        assert!(config.validate().is_err());
    }
}
