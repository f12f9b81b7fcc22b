use crate::text::Tokenizer;
use std::collections::HashMap;

/// Type alias for N-gram sequences (vector of normalized tokens)
pub type NGram = Vec<String>;

/// Type alias for N-gram frequency map
pub type NGramMap = HashMap<NGram, usize>;

/// Extracts N-gram sequences from a token list
///
/// For example, with N=3 (trigrams):
/// - Input tokens: ["fast", "shipping", "great", "product"]
/// - Output N-grams: [["fast", "shipping", "great"], ["shipping", "great", "product"]]
///
/// # Example
/// ```
/// use revscan::repetition::extract_ngrams;
///
/// let tokens = vec!["fast".to_string(), "shipping".to_string(), "great".to_string()];
/// let ngrams = extract_ngrams(&tokens, 3);
///
/// assert_eq!(ngrams.len(), 1);
/// assert_eq!(ngrams.get(&vec!["fast".to_string(), "shipping".to_string(), "great".to_string()]), Some(&1));
/// ```
pub fn extract_ngrams(tokens: &[String], n: usize) -> NGramMap {
    let mut ngrams: NGramMap = HashMap::new();
    accumulate_ngrams(&mut ngrams, tokens, n);
    ngrams
}

fn accumulate_ngrams(ngrams: &mut NGramMap, tokens: &[String], n: usize) {
    if n == 0 || tokens.len() < n {
        return; // Not enough tokens for N-gram
    }

    // Sliding window of size N
    for window in tokens.windows(n) {
        *ngrams.entry(window.to_vec()).or_insert(0) += 1;
    }
}

/// Find most frequent N-grams
///
/// Ties are broken lexicographically so the listing is stable across runs.
pub fn top_ngrams(ngrams: &NGramMap, k: usize) -> Vec<(NGram, usize)> {
    let mut ngram_vec: Vec<_> = ngrams
        .iter()
        .map(|(ngram, count)| (ngram.clone(), *count))
        .collect();

    ngram_vec.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ngram_vec.into_iter().take(k).collect()
}

/// N-grams whose corpus frequency reached the common-phrase threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonPhrases {
    frequencies: NGramMap,
    min_len: usize,
    max_len: usize,
}

impl CommonPhrases {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequency(&self, ngram: &[String]) -> Option<usize> {
        self.frequencies.get(ngram).copied()
    }

    pub fn frequencies(&self) -> &NGramMap {
        &self.frequencies
    }

    /// Whether any window of `tokens` of a mined length is a common phrase
    pub fn contains_common_phrase(&self, tokens: &[String]) -> bool {
        if self.frequencies.is_empty() {
            return false;
        }
        (self.min_len..=self.max_len)
            .filter(|&n| n > 0)
            .any(|n| tokens.windows(n).any(|w| self.frequencies.contains_key(w)))
    }

    pub fn top(&self, k: usize) -> Vec<(NGram, usize)> {
        top_ngrams(&self.frequencies, k)
    }
}

/// Mines repeated phrases across a corpus of normalized review texts
///
/// Every review contributes all contiguous token windows of each length in
/// `min_len..=max_len`; frequencies are summed over the whole corpus.
pub struct PhraseMiner<'a> {
    tokenizer: &'a dyn Tokenizer,
    min_len: usize,
    max_len: usize,
    min_freq: usize,
}

impl<'a> PhraseMiner<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, min_len: usize, max_len: usize, min_freq: usize) -> Self {
        Self {
            tokenizer,
            min_len,
            max_len,
            min_freq,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    /// Corpus-wide frequency of every n-gram of the mined lengths
    pub fn frequencies(&self, documents: &[Vec<String>]) -> NGramMap {
        let mut ngrams = NGramMap::new();
        for tokens in documents {
            for n in self.min_len..=self.max_len {
                accumulate_ngrams(&mut ngrams, tokens, n);
            }
        }
        ngrams
    }

    /// Keep the n-grams reaching `min_freq`
    pub fn mine(&self, documents: &[Vec<String>]) -> CommonPhrases {
        let mut frequencies = self.frequencies(documents);
        frequencies.retain(|_, count| *count >= self.min_freq);

        CommonPhrases {
            frequencies,
            min_len: self.min_len,
            max_len: self.max_len,
        }
    }

    #[cfg(test)]
    fn mine_texts(&self, texts: &[&str]) -> CommonPhrases {
        let documents: Vec<Vec<String>> = texts.iter().map(|t| self.tokenize(t)).collect();
        self.mine(&documents)
    }
}
