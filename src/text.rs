//! Review text normalization and tokenization
//!
//! Normalization strips marketplace boilerplate before any comparison so that
//! two reviews differing only in an auto-inserted purchase stamp are treated as
//! the same text. It is deterministic and idempotent:
//! `normalize(normalize(x)) == normalize(x)`.
//!
//! Tokenization is an explicit dependency ([`Tokenizer`]) constructed once by
//! the caller and handed to the phrase miner.

use crate::error::Result;
use regex::Regex;

/// Purchase stamp appended by the marketplace, e.g.
/// `(2024-03-15 10:22:31 에 등록된 네이버 페이 구매평)`
pub const PURCHASE_STAMP_PATTERN: &str =
    r"\(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} 에 등록된 네이버 페이 구매평\)";

/// Promotional label inserted into recommended reviews
pub const PROMOTIONAL_LABEL: &str = "쇼핑몰 추천 리뷰";

/// Badge prefixed to recently posted reviews
pub const NEW_BADGE: &str = "NEW";

/// Cleans raw review text into its comparable form
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    purchase_stamp: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            purchase_stamp: Regex::new(PURCHASE_STAMP_PATTERN)?,
        })
    }

    /// Normalize raw review text
    ///
    /// Steps, in order: drop purchase stamps, drop promotional labels, drop a
    /// leading `NEW` badge, lower-case, remove ASCII punctuation. Removing
    /// punctuation can splice a new promotional label together, so labels are
    /// removed once more until none remain.
    ///
    /// # Example
    /// ```
    /// use revscan::text::TextNormalizer;
    ///
    /// let normalizer = TextNormalizer::new().unwrap();
    /// assert_eq!(normalizer.normalize("NEWGreat, fast shipping!"), "great fast shipping");
    /// ```
    pub fn normalize(&self, raw: &str) -> String {
        let text = self.purchase_stamp.replace_all(raw, "");
        let text = strip_promotional_labels(text.into_owned());
        let text = text.strip_prefix(NEW_BADGE).unwrap_or(text.as_str());

        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect();

        strip_promotional_labels(cleaned)
    }
}

fn strip_promotional_labels(mut text: String) -> String {
    while text.contains(PROMOTIONAL_LABEL) {
        text = text.replace(PROMOTIONAL_LABEL, "");
    }
    text
}

/// Splits normalized review text into tokens for n-gram mining
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits on Unicode whitespace. Suitable once punctuation has been removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Extracts runs of word characters (`\w+`), discarding everything else
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    word: Regex,
}

impl WordTokenizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            word: Regex::new(r"\w+")?,
        })
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
