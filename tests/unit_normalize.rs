// Unit tests for text normalization: document shaping, token cleaning,
// curation and the translation pass.
//
// Translators are in-process fakes; nothing here touches the network.

use std::io::Cursor;

use anyhow::Result;
use async_trait::async_trait;

use artscope::normalize::language::detect;
use artscope::normalize::tokens::{
    AcceptAll, CandidateKind, Cleaner, ConsoleCurator, TokenCandidate, TokenFilter,
};
use artscope::normalize::translate::{translate_columns, IdentityTranslator, Translator};
use artscope::normalize::{
    clean_documents, long_documents, wide_documents, Document, Language, NormalizeOptions, Shape,
};
use artscope::pipeline::segments::{build_segments, COMBINED};
use artscope::tabular::{Dataset, Schema};

fn spaces() -> Dataset {
    let mut ds = Dataset::new(vec![
        "id".into(),
        "name".into(),
        "presentation".into(),
        "history".into(),
    ]);
    ds.push_row(vec![
        Some("1".into()),
        Some("Atelier".into()),
        Some("ceramic kiln".into()),
        Some("old mill".into()),
    ]);
    ds.push_row(vec![Some("2".into()), Some("Friche".into()), None, Some("rail depot".into())]);
    ds
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Document shapes
// ============================================================

#[test]
fn wide_joins_columns_with_single_spaces() {
    let docs = wide_documents(&spaces(), &columns(&["presentation", "history"]), &Schema::default());
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].text, "ceramic kiln old mill");
    // A missing cell still contributes its separator
    assert_eq!(docs[1].text, " rail depot");
    assert_eq!(docs[1].name.as_deref(), Some("Friche"));
    assert_eq!(docs[1].field_type, None);
}

#[test]
fn long_emits_one_document_per_filled_cell() {
    let docs = long_documents(&spaces(), &columns(&["presentation", "history"]), &Schema::default());
    let fields: Vec<(usize, &str)> = docs
        .iter()
        .map(|d| (d.entity, d.field_type.as_deref().unwrap()))
        .collect();
    assert_eq!(fields, vec![(0, "presentation"), (0, "history"), (1, "history")]);
}

#[test]
fn missing_columns_are_reported_not_fatal() {
    let options = NormalizeOptions {
        columns: columns(&["presentation", "history", "activities"]),
        ..NormalizeOptions::for_schema(&Schema::default())
    };
    let (segments, skipped) = build_segments(&spaces(), &Schema::default(), &options);
    let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["presentation", "history", COMBINED]);
    assert_eq!(skipped, vec![("activities".to_string(), "column not in dataset".to_string())]);
}

#[test]
fn long_shape_is_a_single_segment() {
    let options = NormalizeOptions {
        columns: columns(&["presentation", "history"]),
        shape: Shape::Long,
        ..NormalizeOptions::for_schema(&Schema::default())
    };
    let (segments, _) = build_segments(&spaces(), &Schema::default(), &options);
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].usable(), 3);
}

// ============================================================
// Cleaner
// ============================================================

#[test]
fn cleaner_drops_stop_words_and_short_tokens() {
    let cleaner = Cleaner::new(Language::English, &[], false, false);
    assert_eq!(cleaner.clean("The ceramic kiln, a sculpture x garden", &mut AcceptAll), "ceramic kiln sculpture garden");
}

#[test]
fn cleaner_applies_custom_stop_words_case_insensitively() {
    let cleaner = Cleaner::new(Language::English, &["Kiln".to_string()], false, false);
    assert_eq!(cleaner.clean("ceramic KILN", &mut AcceptAll), "ceramic");
}

#[test]
fn cleaner_stems_in_the_chosen_language() {
    let cleaner = Cleaner::new(Language::French, &[], true, false);
    let stemmer = rust_stemmers::Stemmer::create(rust_stemmers::Algorithm::French);
    assert_eq!(cleaner.clean("sculptures", &mut AcceptAll), stemmer.stem("sculptures").as_ref());
}

#[test]
fn blank_documents_stay_blank() {
    let mut docs = vec![
        Document { entity: 0, name: None, field_type: None, text: "   ".into() },
        Document { entity: 1, name: None, field_type: None, text: "the ceramic kiln".into() },
    ];
    let cleaner = Cleaner::new(Language::English, &[], false, false);
    clean_documents(&mut docs, &cleaner, &mut AcceptAll);
    assert_eq!(docs[0].text, "   ");
    assert_eq!(docs[1].text, "ceramic kiln");
}

/// Keeps phrases, rejects single tokens.
struct PhrasesOnly;

impl TokenFilter for PhrasesOnly {
    fn accept(&mut self, candidate: &TokenCandidate) -> bool {
        candidate.kind == CandidateKind::Phrase
    }
}

#[test]
fn accepted_phrases_become_joined_tokens() {
    let cleaner = Cleaner::new(Language::English, &[], false, true);
    let out = cleaner.clean("ceramic kiln, the sculpture garden. pottery", &mut PhrasesOnly);
    assert_eq!(out, "ceramic_kiln sculpture_garden");
}

#[test]
fn curator_remembers_decisions() {
    let cleaner = Cleaner::new(Language::English, &[], false, false);
    let mut output = Vec::new();
    let mut curator = ConsoleCurator::new(Cursor::new("y\nn\n"), &mut output);
    let out = cleaner.clean("ceramic kiln ceramic kiln", &mut curator);
    assert_eq!(out, "ceramic ceramic");
    assert_eq!(curator.decisions().len(), 2);
    assert_eq!(curator.decisions().get("kiln"), Some(&false));
    drop(curator);
    let prompts = String::from_utf8(output).unwrap();
    assert_eq!(prompts.matches("Keep token").count(), 2);
}

#[test]
fn curator_rejects_everything_after_end_of_input() {
    let cleaner = Cleaner::new(Language::English, &[], false, false);
    let mut curator = ConsoleCurator::new(Cursor::new("oui\n"), Vec::new());
    assert_eq!(cleaner.clean("ceramic kiln sculpture", &mut curator), "ceramic");
}

// ============================================================
// Language detection and translation
// ============================================================

#[test]
fn detects_french_and_english() {
    assert_eq!(
        detect("Nous sommes un lieu de création pour les artistes et le public"),
        Some(Language::French)
    );
    assert_eq!(
        detect("The space is open to the public and the artists"),
        Some(Language::English)
    );
    assert_eq!(detect("Atelier"), None);
}

/// Prefixes the target code so translated cells are recognisable.
struct Tagging;

#[async_trait]
impl Translator for Tagging {
    async fn translate(&self, text: &str, _source: Language, target: Language) -> Result<String> {
        Ok(format!("[{target}] {text}"))
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

struct Broken;

#[async_trait]
impl Translator for Broken {
    async fn translate(&self, _text: &str, _source: Language, _target: Language) -> Result<String> {
        anyhow::bail!("endpoint unreachable")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn mixed() -> Dataset {
    let mut ds = Dataset::new(vec!["name".into(), "history".into()]);
    ds.push_row(vec![
        Some("A".into()),
        Some("Nous sommes un lieu de création pour les artistes et le public".into()),
    ]);
    ds.push_row(vec![
        Some("B".into()),
        Some("The space is open to the public and the artists".into()),
    ]);
    ds.push_row(vec![Some("C".into()), Some("Atelier".into())]);
    ds.push_row(vec![Some("D".into()), None]);
    ds
}

#[tokio::test]
async fn translation_only_touches_foreign_cells() {
    let mut ds = mixed();
    let summary = translate_columns(&mut ds, &columns(&["history", "absent"]), &Tagging, Language::English).await;
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.already_target, 1);
    assert_eq!(summary.undetected, 1);
    assert_eq!(summary.failed, 0);
    assert!(ds.get(0, 1).unwrap().starts_with("[en] Nous"));
    assert_eq!(ds.get(1, 1), mixed().get(1, 1));
    assert_eq!(ds.get(3, 1), None);
}

#[tokio::test]
async fn translation_failures_keep_original_text() {
    let mut ds = mixed();
    let summary = translate_columns(&mut ds, &columns(&["history"]), &Broken, Language::English).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(ds, mixed());
}

#[tokio::test]
async fn identity_translation_is_a_no_op() {
    let mut ds = mixed();
    translate_columns(&mut ds, &columns(&["history"]), &IdentityTranslator, Language::English).await;
    assert_eq!(ds, mixed());
}
