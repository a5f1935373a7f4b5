// Composition tests: whole pipeline runs over small datasets on disk.
//
// These chain load → merge → normalize → LDA → reports through
// pipeline::run with in-process collaborators (identity translator, accept-all
// filter). Everything is written under the temp directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use artscope::error::{exit_code_for, PipelineError};
use artscope::extract::QUESTION_1;
use artscope::normalize::tokens::AcceptAll;
use artscope::normalize::translate::IdentityTranslator;
use artscope::output::charts::{SvgRenderer, UnavailableRenderer};
use artscope::output::ArtifactOutcome;
use artscope::pipeline::{run, Components, RunOptions};
use artscope::tabular::io::{read_dataset, write_dataset};
use artscope::tabular::Dataset;
use artscope::topics::cluster::EmbeddingClusterModel;
use artscope::topics::embeddings::Embedder;
use artscope::topics::Strategy;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("artscope_composition_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_spaces(dir: &Path) -> PathBuf {
    let mut ds = Dataset::new(vec![
        "id".into(),
        "name".into(),
        "presentation".into(),
        "history".into(),
        "activities".into(),
    ]);
    let rows = [
        ("Atelier", "painting studio canvas exhibition", "former textile factory workers"),
        ("Galerie", "painting canvas gallery exhibition", "textile factory converted"),
        ("Studio", "studio painting residency canvas", "factory workers union"),
        ("Jardin", "garden compost vegetables harvest", "railway station platform"),
        ("Potager", "vegetables garden compost seeds", "railway depot station"),
        ("Ferme", "harvest garden vegetables market", "station railway tracks"),
    ];
    for (i, (name, presentation, history)) in rows.iter().enumerate() {
        ds.push_row(vec![
            Some((i + 1).to_string()),
            Some(name.to_string()),
            Some(presentation.to_string()),
            Some(history.to_string()),
            None,
        ]);
    }
    let path = dir.join("spaces.csv");
    write_dataset(&ds, &path).unwrap();
    path
}

fn components() -> Components {
    Components {
        translator: Box::new(IdentityTranslator),
        cluster_model: None,
        renderer: Box::new(UnavailableRenderer {
            reason: "charts disabled".into(),
        }),
        filter: Box::new(AcceptAll),
    }
}

fn options(input: PathBuf, out_dir: PathBuf) -> RunOptions {
    let mut options = RunOptions::new(input, out_dir);
    options.topic_counts = vec![2];
    options
}

// ============================================================
// Chain: CSV -> segments -> LDA -> tables
// ============================================================

#[tokio::test]
async fn csv_run_writes_tables_for_every_segment() {
    let dir = scratch("tables");
    let input = write_spaces(&dir);
    let out = dir.join("results");
    let summary = run(&options(input, out.clone()), &mut components()).await.unwrap();

    let labels: Vec<&str> = summary.runs.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["presentation_lda_k2", "history_lda_k2", "combined_lda_k2"]
    );
    for label in &labels {
        assert!(out.join(format!("{label}_topics.csv")).exists(), "{label} topics");
        assert!(out.join(format!("{label}_keywords.csv")).exists(), "{label} keywords");
        assert!(out.join(format!("{label}_keywords.md")).exists());
        assert!(out.join(format!("{label}_distributions.csv")).exists());
        assert!(out.join(format!("{label}_model")).join("fit.json").exists());
    }
    assert!(out.join("run_summary.md").exists());

    // Empty and absent columns are skipped, not fatal
    let skipped: Vec<&str> = summary.skipped.iter().map(|(s, _)| s.as_str()).collect();
    assert!(skipped.contains(&"activities"));
    assert!(skipped.contains(&"answer1"));
    assert!(skipped.contains(&"answer2"));

    // Charts failed, and the failures are counted rather than aborting the run
    assert!(summary.failures() > 0);
    let first = &summary.runs[0];
    assert!(first.report.get("bar_chart").is_some_and(ArtifactOutcome::is_failed));
    assert!(matches!(first.report.get("topics"), Some(ArtifactOutcome::Written(_))));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn topic_columns_are_added_to_the_dataset() {
    let dir = scratch("annotated");
    let input = write_spaces(&dir);
    let out = dir.join("results");
    let summary = run(&options(input, out.clone()), &mut components()).await.unwrap();

    let table = read_dataset(&out.join("presentation_lda_k2_topics.csv")).unwrap();
    let topic_col = table.column_index("presentation_topic").unwrap();
    let prob_col = table.column_index("presentation_topic_probability").unwrap();
    assert_eq!(table.len(), 6);
    // Original columns are kept alongside the new ones
    assert!(table.column_index("history").is_some());

    let topics: Vec<&str> = (0..6).map(|r| table.get(r, topic_col).unwrap()).collect();
    assert!(topics[..3].iter().all(|t| *t == topics[0]), "{topics:?}");
    assert!(topics[3..].iter().all(|t| *t == topics[3]), "{topics:?}");
    assert_ne!(topics[0], topics[3]);
    for r in 0..6 {
        let p: f64 = table.get(r, prob_col).unwrap().parse().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    let presentation = &summary.runs[0];
    assert_eq!(presentation.documents, 6);
    assert_eq!(presentation.unassigned, 0);
    assert_eq!(presentation.topics.len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn svg_renderer_writes_charts() {
    let dir = scratch("svg");
    let input = write_spaces(&dir);
    let out = dir.join("results");
    let mut components = components();
    components.renderer = Box::new(SvgRenderer);
    let mut options = options(input, out.clone());
    options.normalize.columns = vec!["presentation".into()];
    let summary = run(&options, &mut components).await.unwrap();

    assert_eq!(summary.runs.len(), 1);
    let report = &summary.runs[0].report;
    for name in ["bar_chart", "heatmap", "box_plot", "scatter"] {
        assert!(
            matches!(report.get(name), Some(ArtifactOutcome::Written(_))),
            "{name}: {:?}",
            report.get(name)
        );
    }
    assert!(out.join("presentation_lda_k2_topic_weights.svg").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

// ============================================================
// Chain: .docx + dataset -> merge -> answer segments
// ============================================================

#[tokio::test]
async fn merged_answers_become_a_segment() {
    let dir = scratch("merge");
    let input = write_spaces(&dir);
    let docx_path = dir.join("survey.docx");

    let heading = |t: &str| docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(t)).style("Heading1");
    let plain = |t: &str| docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(t));
    let docx = docx_rs::Docx::new()
        .add_paragraph(heading("Atelier"))
        .add_paragraph(plain(QUESTION_1))
        .add_paragraph(plain("painting collective studio"))
        .add_paragraph(heading("Nouveau Lieu"))
        .add_paragraph(plain(QUESTION_1))
        .add_paragraph(plain("garden collective harvest"));
    docx.build().pack(std::fs::File::create(&docx_path).unwrap()).unwrap();

    let out = dir.join("results");
    let mut options = options(input, out.clone());
    options.merge_docx = Some(docx_path);
    let summary = run(&options, &mut components()).await.unwrap();

    assert_eq!(summary.merged, Some((1, 1, 0)));
    let merged = read_dataset(&out.join("spaces_merged.csv")).unwrap();
    assert_eq!(merged.len(), 7);
    let answer1 = merged.column_index("answer1").unwrap();
    assert_eq!(merged.get(0, answer1), Some("painting collective studio"));
    assert_eq!(merged.get(6, merged.column_index("id").unwrap()), Some("7"));

    assert!(summary.runs.iter().any(|r| r.segment == "answer1"));
    // question columns are not text columns; answer2 exists but is empty
    assert!(summary
        .skipped
        .iter()
        .any(|(s, reason)| s == "answer2" && reason == "no non-empty documents"));

    let _ = std::fs::remove_dir_all(&dir);
}

// ============================================================
// Fatal errors
// ============================================================

#[tokio::test]
async fn missing_input_exits_with_input_not_found() {
    let dir = scratch("missing");
    let err = run(&options(dir.join("absent.xlsx"), dir.join("results")), &mut components())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InputNotFound(_))
    ));
    assert_eq!(exit_code_for(&err), 2);
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn embedding_strategy_needs_a_cluster_model() {
    let dir = scratch("no_model");
    let input = write_spaces(&dir);
    let mut options = options(input, dir.join("results"));
    options.strategy = Strategy::Embedding;
    assert!(run(&options, &mut components()).await.is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

/// An embedder whose backend is always down.
struct OfflineEmbedder;

#[async_trait]
impl Embedder for OfflineEmbedder {
    fn name(&self) -> &str {
        "offline"
    }

    fn dimension(&self) -> usize {
        8
    }

    async fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f64>>> {
        anyhow::bail!("onnx session unavailable")
    }
}

#[tokio::test]
async fn failed_fits_are_skipped_and_the_summary_is_still_written() {
    let dir = scratch("failed_fit");
    let input = write_spaces(&dir);
    let out = dir.join("results");
    let mut options = options(input, out.clone());
    options.strategy = Strategy::Embedding;
    let mut components = components();
    components.cluster_model = Some(EmbeddingClusterModel::new(Box::new(OfflineEmbedder)));

    let summary = run(&options, &mut components).await.unwrap();
    assert!(summary.runs.is_empty());
    for label in ["presentation_embedding", "history_embedding", "combined_embedding"] {
        assert!(
            summary
                .skipped
                .iter()
                .any(|(s, reason)| s == label && reason.contains("onnx session unavailable")),
            "{label}: {:?}",
            summary.skipped
        );
    }
    assert!(out.join("run_summary.md").exists());
    let _ = std::fs::remove_dir_all(&dir);
}
