//! CLI argument parsing for revscan

use crate::config::{AnalysisConfig, TokenizerKind};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV result tables on stdout
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "revscan")]
#[command(version)]
#[command(
    about = "Flag review volume anomalies and repeated review text in marketplace exports",
    long_about = None
)]
pub struct Cli {
    /// Review export CSV files, one product per file
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// TOML file with analysis settings
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Expected fraction of anomalous days (0, 0.5]
    #[arg(long = "contamination", value_name = "FRACTION")]
    pub contamination: Option<f64>,

    /// Number of isolation trees
    #[arg(long = "trees", value_name = "N")]
    pub trees: Option<usize>,

    /// Seed for a reproducible isolation forest
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Corpus frequency at which an n-gram becomes a common phrase
    #[arg(long = "min-phrase-freq", value_name = "N")]
    pub min_phrase_freq: Option<usize>,

    /// Tokenizer for phrase mining
    #[arg(long = "tokenizer", value_enum, value_name = "KIND")]
    pub tokenizer: Option<TokenizerKind>,

    /// Directory receiving per-company result tables
    #[arg(long = "output-dir", value_name = "DIR", default_value = "results")]
    pub output_dir: PathBuf,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Do not write result tables to the output directory
    #[arg(long = "no-write")]
    pub no_write: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file or default settings
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(contamination) = self.contamination {
            config.contamination = contamination;
        }
        if let Some(trees) = self.trees {
            config.num_trees = trees;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(min_freq) = self.min_phrase_freq {
            config.min_phrase_freq = min_freq;
        }
        if let Some(tokenizer) = self.tokenizer {
            config.tokenizer = tokenizer;
        }
    }
}
