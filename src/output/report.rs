// Writes every artifact of one topic fit.
//
// Tabular outputs come first so a failing chart can never cost the tables.
// Each artifact is attempted independently and its outcome recorded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::charts::ChartRenderer;
use super::tables::{annotate_dataset, distribution_table, document_table, keyword_table};
use super::{html, ArtifactOutcome, ArtifactReport};
use crate::normalize::{Document, Shape};
use crate::tabular::io::write_dataset;
use crate::tabular::markdown::to_markdown;
use crate::tabular::{output_path, Dataset, FileFormat};
use crate::topics::embeddings::similarity_matrix;
use crate::topics::reduce::pca;
use crate::topics::{model_artifact, TopicFit, TopicModel, NOISE_TOPIC};

/// Knobs for the visual part of a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Words drawn in each topic's word cloud.
    pub cloud_words: usize,
    /// Documents kept in the document heatmaps.
    pub max_heatmap_documents: usize,
    /// Seed for the 2-D projection of the scatter plot.
    pub seed: u64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            cloud_words: 30,
            max_heatmap_documents: 200,
            seed: 42,
        }
    }
}

/// Everything a report needs besides the fit itself.
pub struct ReportContext<'a> {
    pub out_dir: &'a Path,
    /// File name prefix, e.g. `history_lda_k5`.
    pub label: &'a str,
    /// Segment name used for the topic columns.
    pub segment: &'a str,
    pub dataset: &'a Dataset,
    /// The fitted documents, in fit order.
    pub documents: &'a [Document],
    pub shape: Shape,
    pub format: FileFormat,
    pub model: &'a dyn TopicModel,
    pub options: &'a ReportOptions,
}

impl ReportContext<'_> {
    fn file(&self, suffix: &str, extension: &str) -> PathBuf {
        self.out_dir.join(format!("{}_{suffix}.{extension}", self.label))
    }

    fn table(&self, suffix: &str) -> PathBuf {
        output_path(self.out_dir, &format!("{}_{suffix}", self.label), self.format.writable())
    }

    fn document_label(&self, i: usize) -> String {
        let doc = &self.documents[i];
        let name = doc.name.clone().unwrap_or_else(|| format!("row {}", doc.entity + 1));
        match &doc.field_type {
            Some(field) => format!("{name} ({field})"),
            None => name,
        }
    }
}

fn write_table(dataset: &Dataset, path: PathBuf) -> Result<PathBuf> {
    write_dataset(dataset, &path)?;
    Ok(path)
}

/// Write the tables, the model artifact and the charts for one fit.
pub fn write_topic_report(
    ctx: &ReportContext<'_>,
    fit: &TopicFit,
    renderer: &dyn ChartRenderer,
) -> ArtifactReport {
    let mut report = ArtifactReport::default();
    if let Err(e) = std::fs::create_dir_all(ctx.out_dir) {
        report.record(
            "output_directory",
            ArtifactOutcome::Failed(format!("{}: {e}", ctx.out_dir.display())),
        );
        return report;
    }

    // Tables
    let topics_table = match ctx.shape {
        Shape::Wide => annotate_dataset(ctx.dataset, ctx.documents, ctx.segment, fit),
        Shape::Long => document_table(ctx.documents, fit),
    };
    report.record(
        "topics",
        ArtifactOutcome::from_result(write_table(&topics_table, ctx.table("topics"))),
    );

    let keywords = keyword_table(fit);
    report.record(
        "keywords",
        ArtifactOutcome::from_result(write_table(&keywords, ctx.table("keywords"))),
    );
    report.record(
        "keywords_markdown",
        ArtifactOutcome::from_result(write_text(&to_markdown(&keywords), ctx.file("keywords", "md"))),
    );

    match distribution_table(ctx.documents, fit) {
        Some(table) => report.record(
            "distributions",
            ArtifactOutcome::from_result(write_table(&table, ctx.table("distributions"))),
        ),
        None => report.record(
            "distributions",
            ArtifactOutcome::Skipped("model has no document-topic weights".into()),
        ),
    }

    let model_dir = ctx.out_dir.join(format!("{}_model", ctx.label));
    report.record(
        "model",
        ArtifactOutcome::from_result(
            model_artifact::save(ctx.model, fit, &model_dir).map(|_| model_dir.clone()),
        ),
    );

    // Visuals
    report.extend(write_visuals(ctx, fit, renderer));

    info!(
        label = ctx.label,
        written = report.written(),
        failed = report.failures(),
        "Wrote topic report"
    );
    report
}

fn write_text(text: &str, path: PathBuf) -> Result<PathBuf> {
    std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Indices of documents that were actually fitted (non-blank text).
fn fitted_documents(ctx: &ReportContext<'_>, limit: usize) -> Vec<usize> {
    (0..ctx.documents.len())
        .filter(|&i| !ctx.documents[i].text.trim().is_empty())
        .take(limit)
        .collect()
}

fn write_visuals(
    ctx: &ReportContext<'_>,
    fit: &TopicFit,
    renderer: &dyn ChartRenderer,
) -> ArtifactReport {
    let mut report = ArtifactReport::default();
    let topic_labels: Vec<String> = fit.topics.iter().map(|t| t.id.to_string()).collect();

    // Bar chart: mean weight per topic, or documents per topic without weights
    let bar = {
        let path = ctx.file("topic_weights", "svg");
        let result = match &fit.distributions {
            Some(dist) => {
                let fitted = fitted_documents(ctx, usize::MAX);
                let means: Vec<f64> = (0..fit.topics.len())
                    .map(|k| {
                        let total: f64 = fitted.iter().map(|&i| dist[i].get(k).copied().unwrap_or(0.0)).sum();
                        total / fitted.len().max(1) as f64
                    })
                    .collect();
                renderer.bar_chart("Average topic weight", &topic_labels, &means, &path)
            }
            None => {
                let sizes: Vec<f64> = fit.topics.iter().map(|t| t.size as f64).collect();
                renderer.bar_chart("Documents per topic", &topic_labels, &sizes, &path)
            }
        };
        result.map(|_| path)
    };
    report.record("bar_chart", ArtifactOutcome::from_result(bar));

    match &fit.distributions {
        Some(dist) => {
            let fitted = fitted_documents(ctx, ctx.options.max_heatmap_documents);
            let rows: Vec<String> = fitted.iter().map(|&i| ctx.document_label(i)).collect();
            let values: Vec<Vec<f64>> = fitted.iter().map(|&i| dist[i].clone()).collect();
            let path = ctx.file("heatmap", "svg");
            let result = renderer
                .heatmap("Document-topic weights", &rows, &topic_labels, &values, &path)
                .map(|_| path);
            report.record("heatmap", ArtifactOutcome::from_result(result));
        }
        None => report.record(
            "heatmap",
            ArtifactOutcome::Skipped("model has no document-topic weights".into()),
        ),
    }

    for topic in &fit.topics {
        let name = format!("word_cloud_{}", topic.id);
        if topic.keywords.is_empty() {
            report.record(name, ArtifactOutcome::Skipped("topic has no keywords".into()));
            continue;
        }
        let words: Vec<(String, f64)> =
            topic.keywords.iter().take(ctx.options.cloud_words).cloned().collect();
        let path = ctx.file(&format!("wordcloud_topic{}", topic.id), "svg");
        let result = renderer
            .word_cloud(&format!("Topic {}", topic.id), &words, &path)
            .map(|_| path);
        report.record(name, ArtifactOutcome::from_result(result));
    }

    let samples = box_samples(ctx, fit);
    let path = ctx.file("topic_boxplot", "html");
    let result = html::write_box_plot("Topic weight per document", &samples, &path).map(|_| path);
    report.record("box_plot", ArtifactOutcome::from_result(result));

    // Scatter over embeddings, else over topic weights
    match fit.embeddings.as_ref().or(fit.distributions.as_ref()) {
        Some(vectors) => {
            let fitted = fitted_documents(ctx, usize::MAX);
            let points: Vec<Vec<f64>> = fitted.iter().map(|&i| vectors[i].clone()).collect();
            let projected = pca(&points, 2, ctx.options.seed);
            let topics: Vec<i32> = fitted.iter().map(|&i| fit.assignments[i]).collect();
            let labels: Vec<String> = fitted.iter().map(|&i| ctx.document_label(i)).collect();
            let path = ctx.file("scatter", "html");
            let result =
                html::write_scatter("Documents (2-D projection)", &projected, &topics, &labels, &path)
                    .map(|_| path);
            report.record("scatter", ArtifactOutcome::from_result(result));
        }
        None => report.record("scatter", ArtifactOutcome::Skipped("no document vectors".into())),
    }

    match &fit.embeddings {
        Some(vectors) => {
            let fitted = fitted_documents(ctx, ctx.options.max_heatmap_documents);
            let points: Vec<Vec<f64>> = fitted.iter().map(|&i| vectors[i].clone()).collect();
            let labels: Vec<String> = fitted.iter().map(|&i| ctx.document_label(i)).collect();
            let path = ctx.file("similarity", "svg");
            let result = renderer
                .heatmap("Document similarity", &labels, &labels, &similarity_matrix(&points), &path)
                .map(|_| path);
            report.record("similarity_heatmap", ArtifactOutcome::from_result(result));
        }
        None => report.record(
            "similarity_heatmap",
            ArtifactOutcome::Skipped("model has no document embeddings".into()),
        ),
    }

    report
}

/// Per-topic weight samples: the topic's column of the weight matrix, or
/// the membership probabilities of the topic's documents.
fn box_samples(ctx: &ReportContext<'_>, fit: &TopicFit) -> Vec<(i32, Vec<f64>)> {
    let fitted = fitted_documents(ctx, usize::MAX);
    fit.topics
        .iter()
        .map(|topic| {
            let values = match &fit.distributions {
                Some(dist) => fitted
                    .iter()
                    .filter_map(|&i| dist[i].get(topic.id as usize).copied())
                    .collect(),
                None => fitted
                    .iter()
                    .filter(|&&i| fit.assignments[i] == topic.id && topic.id != NOISE_TOPIC)
                    .map(|&i| fit.probabilities[i])
                    .collect(),
            };
            (topic.id, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::charts::{SvgRenderer, UnavailableRenderer};
    use crate::topics::lda::LdaModel;
    use crate::topics::Topic;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("artscope_report_{}_{name}", std::process::id()))
    }

    fn fixture() -> (Dataset, Vec<Document>, TopicFit) {
        let mut ds = Dataset::new(vec!["name".into(), "history".into()]);
        ds.push_row(vec![Some("Atelier".into()), Some("peinture".into())]);
        ds.push_row(vec![Some("Scène".into()), Some("danse".into())]);
        let docs = vec![
            Document { entity: 0, name: Some("Atelier".into()), field_type: None, text: "peinture".into() },
            Document { entity: 1, name: Some("Scène".into()), field_type: None, text: "danse".into() },
        ];
        let fit = TopicFit {
            model: "lda".into(),
            assignments: vec![0, 1],
            probabilities: vec![0.8, 0.9],
            distributions: Some(vec![vec![0.8, 0.2], vec![0.1, 0.9]]),
            topics: vec![
                Topic { id: 0, keywords: vec![("peinture".into(), 0.5)], size: 1 },
                Topic { id: 1, keywords: vec![("danse".into(), 0.5)], size: 1 },
            ],
            embeddings: None,
        };
        (ds, docs, fit)
    }

    #[test]
    fn test_full_report_with_svg() {
        let dir = scratch("svg");
        let (ds, docs, fit) = fixture();
        let model = LdaModel::new(2);
        let options = ReportOptions::default();
        let ctx = ReportContext {
            out_dir: &dir,
            label: "history_lda_k2",
            segment: "history",
            dataset: &ds,
            documents: &docs,
            shape: Shape::Wide,
            format: FileFormat::Csv,
            model: &model,
            options: &options,
        };
        let report = write_topic_report(&ctx, &fit, &SvgRenderer);
        assert_eq!(report.failures(), 0, "{:?}", report.entries);
        assert!(dir.join("history_lda_k2_topics.csv").exists());
        assert!(dir.join("history_lda_k2_wordcloud_topic1.svg").exists());
        assert!(matches!(report.get("similarity_heatmap"), Some(ArtifactOutcome::Skipped(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_chart_failures_keep_tables() {
        let dir = scratch("unavailable");
        let (ds, docs, fit) = fixture();
        let model = LdaModel::new(2);
        let options = ReportOptions::default();
        let ctx = ReportContext {
            out_dir: &dir,
            label: "k2",
            segment: "history",
            dataset: &ds,
            documents: &docs,
            shape: Shape::Wide,
            format: FileFormat::Csv,
            model: &model,
            options: &options,
        };
        let renderer = UnavailableRenderer { reason: "test".into() };
        let report = write_topic_report(&ctx, &fit, &renderer);
        assert!(matches!(report.get("topics"), Some(ArtifactOutcome::Written(_))));
        assert!(matches!(report.get("keywords"), Some(ArtifactOutcome::Written(_))));
        assert!(report.get("bar_chart").is_some_and(ArtifactOutcome::is_failed));
        assert!(matches!(report.get("box_plot"), Some(ArtifactOutcome::Written(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
