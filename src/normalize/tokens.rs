// Token cleaning and the pluggable curation filter.
//
// The cleaner lowercases, drops stop words, stems, and offers every surviving
// candidate to a TokenFilter. Batch runs use AcceptAll; the `curate` command
// plugs in ConsoleCurator, which asks a human about each candidate.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};

use rust_stemmers::Stemmer;

use super::language::{words, Language};

/// Domain stop words added to the base list unless overridden.
pub const DEFAULT_CUSTOM_STOP_WORDS: &[&str] =
    &["le", "la", "de", "des", "et", "en", "un", "une", "du", "au", "aux"];

const PHRASE_BREAKS: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '"', '\n', '«', '»', '\u{201c}', '\u{201d}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A run of consecutive content words.
    Phrase,
    Token,
}

/// Something the filter is asked to keep or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCandidate {
    pub text: String,
    pub kind: CandidateKind,
}

/// Accept/reject decision for candidate tokens and phrases.
pub trait TokenFilter {
    fn accept(&mut self, candidate: &TokenCandidate) -> bool;
}

/// Keeps everything. The batch-mode default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl TokenFilter for AcceptAll {
    fn accept(&mut self, _candidate: &TokenCandidate) -> bool {
        true
    }
}

/// Interactive filter: prompts once per distinct candidate and blocks on the
/// answer. There is no timeout. End of input rejects everything after it.
pub struct ConsoleCurator<R: BufRead, W: Write> {
    input: R,
    output: W,
    decisions: HashMap<String, bool>,
    exhausted: bool,
}

impl<R: BufRead, W: Write> ConsoleCurator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            decisions: HashMap::new(),
            exhausted: false,
        }
    }

    /// Candidates answered so far, with the decision taken.
    pub fn decisions(&self) -> &HashMap<String, bool> {
        &self.decisions
    }

    fn ask(&mut self, candidate: &TokenCandidate) -> bool {
        let label = match candidate.kind {
            CandidateKind::Phrase => "phrase",
            CandidateKind::Token => "token",
        };
        if write!(self.output, "Keep {label} '{}'? (y/n) ", candidate.text)
            .and_then(|_| self.output.flush())
            .is_err()
        {
            self.exhausted = true;
            return false;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                self.exhausted = true;
                false
            }
            Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "o" | "oui"),
        }
    }
}

impl<R: BufRead, W: Write> TokenFilter for ConsoleCurator<R, W> {
    fn accept(&mut self, candidate: &TokenCandidate) -> bool {
        if let Some(&decision) = self.decisions.get(&candidate.text) {
            return decision;
        }
        if self.exhausted {
            return false;
        }
        let decision = self.ask(candidate);
        if !self.exhausted {
            self.decisions.insert(candidate.text.clone(), decision);
        }
        decision
    }
}

/// Stop-word removal, stemming and filtering for one language.
pub struct Cleaner {
    stop_words: HashSet<String>,
    stemmer: Option<Stemmer>,
    phrases: bool,
}

impl Cleaner {
    /// Base stop words for `language` plus `custom`.
    pub fn new(language: Language, custom: &[String], stem: bool, phrases: bool) -> Self {
        let mut stop_words = language.stop_words().clone();
        stop_words.extend(custom.iter().map(|w| w.to_lowercase()));
        Self {
            stop_words,
            stemmer: stem.then(|| Stemmer::create(language.stemmer_algorithm())),
            phrases,
        }
    }

    fn is_content(&self, word: &str) -> bool {
        word.chars().count() >= 2 && !self.stop_words.contains(word)
    }

    fn stem(&self, word: &str) -> String {
        match &self.stemmer {
            Some(s) => s.stem(word).into_owned(),
            None => word.to_string(),
        }
    }

    /// Clean `text` into space-separated tokens.
    ///
    /// With phrases enabled, runs of two or more consecutive content words are
    /// offered first; an accepted phrase is emitted as one `_`-joined token and
    /// its words are not offered again. Remaining content words are offered one
    /// by one, in order.
    pub fn clean(&self, text: &str, filter: &mut dyn TokenFilter) -> String {
        let mut out = Vec::new();
        let mut covered: HashSet<usize> = HashSet::new();
        let mut tokens: Vec<String> = Vec::new();

        for segment in text.split(PHRASE_BREAKS) {
            let mut run: Vec<usize> = Vec::new();
            for word in words(segment) {
                if self.is_content(&word) {
                    run.push(tokens.len());
                    tokens.push(word);
                } else {
                    self.offer_phrase(&mut run, &tokens, &mut covered, &mut out, filter);
                }
            }
            self.offer_phrase(&mut run, &tokens, &mut covered, &mut out, filter);
        }

        for (i, word) in tokens.iter().enumerate() {
            if covered.contains(&i) {
                continue;
            }
            let candidate = TokenCandidate {
                text: word.clone(),
                kind: CandidateKind::Token,
            };
            if filter.accept(&candidate) {
                out.push(self.stem(word));
            }
        }
        out.join(" ")
    }

    fn offer_phrase(
        &self,
        run: &mut Vec<usize>,
        tokens: &[String],
        covered: &mut HashSet<usize>,
        out: &mut Vec<String>,
        filter: &mut dyn TokenFilter,
    ) {
        if self.phrases && run.len() >= 2 {
            let words: Vec<&str> = run.iter().map(|&i| tokens[i].as_str()).collect();
            let candidate = TokenCandidate {
                text: words.join(" "),
                kind: CandidateKind::Phrase,
            };
            if filter.accept(&candidate) {
                let stemmed: Vec<String> = words.iter().map(|w| self.stem(w)).collect();
                out.push(stemmed.join("_"));
                covered.extend(run.iter().copied());
            }
        }
        run.clear();
    }
}
