// Lightweight language identification by stop-word coverage.
//
// Survey answers are long enough that counting function words is a reliable
// signal for the handful of European languages they are written in. Detection
// returns None instead of guessing when the signal is weak.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};

/// Minimum number of words before detection is attempted.
const MIN_WORDS: usize = 3;
/// Minimum stop-word hits for the winning language.
const MIN_HITS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    French,
    Spanish,
    German,
    Italian,
    Portuguese,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::French,
        Language::Spanish,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::German => "de",
            Language::Italian => "it",
            Language::Portuguese => "pt",
        }
    }

    pub fn stop_words_language(self) -> LANGUAGE {
        match self {
            Language::English => LANGUAGE::English,
            Language::French => LANGUAGE::French,
            Language::Spanish => LANGUAGE::Spanish,
            Language::German => LANGUAGE::German,
            Language::Italian => LANGUAGE::Italian,
            Language::Portuguese => LANGUAGE::Portuguese,
        }
    }

    pub fn stemmer_algorithm(self) -> Algorithm {
        match self {
            Language::English => Algorithm::English,
            Language::French => Algorithm::French,
            Language::Spanish => Algorithm::Spanish,
            Language::German => Algorithm::German,
            Language::Italian => Algorithm::Italian,
            Language::Portuguese => Algorithm::Portuguese,
        }
    }

    /// The base stop-word list for this language.
    pub fn stop_words(self) -> &'static HashSet<String> {
        &STOP_WORDS[Language::ALL
            .iter()
            .position(|l| *l == self)
            .unwrap_or_default()]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == lower || format!("{l:?}").to_lowercase() == lower)
            .ok_or_else(|| anyhow::anyhow!("Unknown language: {s}"))
    }
}

static STOP_WORDS: LazyLock<Vec<HashSet<String>>> = LazyLock::new(|| {
    Language::ALL
        .iter()
        .map(|l| get(l.stop_words_language()).into_iter().collect())
        .collect()
});

/// Lowercased alphabetic words of `text` (apostrophes split words).
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Guess the language of `text`, or None when it can't be told.
///
/// The language whose stop words cover the most words wins. A tie between
/// the top two candidates, very short text, or too few hits yields None.
pub fn detect(text: &str) -> Option<Language> {
    let words = words(text);
    if words.len() < MIN_WORDS {
        return None;
    }

    let mut scores: Vec<(Language, usize)> = Language::ALL
        .iter()
        .map(|&lang| {
            let stops = lang.stop_words();
            (lang, words.iter().filter(|w| stops.contains(*w)).count())
        })
        .collect();
    scores.sort_by(|a, b| b.1.cmp(&a.1));

    let (best, hits) = scores[0];
    if hits < MIN_HITS || scores.get(1).is_some_and(|s| s.1 == hits) {
        return None;
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_english() {
        let text = "The space was founded by artists who wanted a place where they could work together.";
        assert_eq!(detect(text), Some(Language::English));
    }

    #[test]
    fn test_detects_french() {
        let text = "Notre structure est née de la volonté de créer un lieu ouvert pour les artistes et le public du quartier.";
        assert_eq!(detect(text), Some(Language::French));
    }

    #[test]
    fn test_short_text_is_undetected() {
        assert_eq!(detect("Bonjour"), None);
        assert_eq!(detect(""), None);
        assert_eq!(detect("12345 67890"), None);
    }

    #[test]
    fn test_language_codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
        assert_eq!("French".parse::<Language>().unwrap(), Language::French);
        assert!("klingon".parse::<Language>().is_err());
    }
}
