// Bag-of-words count vectorization.
//
// Tokens are runs of at least two alphanumeric characters, lowercased. The
// vocabulary is filtered by document frequency, capped to the most frequent
// terms, and stored in alphabetical order so column indices are stable.

use std::collections::{HashMap, HashSet};

use stop_words::{get, LANGUAGE};

/// Sparse term counts for one document: (term index, count), ascending index.
pub type TermCounts = Vec<(usize, usize)>;

#[derive(Debug, Clone)]
pub struct CountVectorizer {
    pub max_features: Option<usize>,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f64,
    pub stop_words: HashSet<String>,
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self {
            max_features: Some(1000),
            min_df: 1,
            max_df: 1.0,
            stop_words: get(LANGUAGE::English).into_iter().collect(),
        }
    }
}

/// A fitted vocabulary and the document-term counts it produced.
#[derive(Debug, Clone, Default)]
pub struct Vectorized {
    /// Alphabetically ordered terms.
    pub vocabulary: Vec<String>,
    pub counts: Vec<TermCounts>,
}

impl Vectorized {
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Dense row for one document.
    pub fn dense(&self, doc: usize) -> Vec<f64> {
        let mut row = vec![0.0; self.vocabulary.len()];
        if let Some(counts) = self.counts.get(doc) {
            for &(term, n) in counts {
                row[term] = n as f64;
            }
        }
        row
    }
}

impl CountVectorizer {
    pub fn with_extra_stop_words(mut self, extra: &[String]) -> Self {
        self.stop_words.extend(extra.iter().map(|w| w.to_lowercase()));
        self
    }

    /// Split text into lowercase tokens, dropping stop words.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_lowercase)
            .filter(|t| !self.stop_words.contains(t))
            .collect()
    }

    /// Learn the vocabulary from `documents` and count terms in each.
    pub fn fit_transform(&self, documents: &[String]) -> Vectorized {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| self.tokenize(d)).collect();
        let n_docs = documents.len();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut term_freq: HashMap<&str, usize> = HashMap::new();
        for doc in &tokenized {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
            for term in doc {
                *term_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let max_docs = (self.max_df * n_docs as f64).floor() as usize;
        let mut kept: Vec<(&str, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.min_df && *df <= max_docs.max(1))
            .map(|(term, _)| (term, term_freq.get(term).copied().unwrap_or(0)))
            .collect();

        // Most frequent first, then alphabetical, so the cap is deterministic
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(max) = self.max_features {
            kept.truncate(max);
        }

        let mut vocabulary: Vec<String> = kept.into_iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();
        let index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let counts = tokenized
            .iter()
            .map(|doc| {
                let mut c: HashMap<usize, usize> = HashMap::new();
                for term in doc {
                    if let Some(&i) = index.get(term.as_str()) {
                        *c.entry(i).or_insert(0) += 1;
                    }
                }
                let mut v: TermCounts = c.into_iter().collect();
                v.sort_unstable();
                v
            })
            .collect();

        Vectorized { vocabulary, counts }
    }
}
