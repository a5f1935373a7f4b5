// Batch pipeline: load → (extract + merge) → (translate) → normalize →
// topic model per segment → reports.
//
// Loading and merging errors are fatal and surface to the caller. Past that
// point the run degrades instead of stopping: segments without usable text
// and failed fits are recorded as skipped, artifact failures per file.

pub mod segments;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::extract::{extract_file, ExtractConfig};
use crate::normalize::tokens::TokenFilter;
use crate::normalize::translate::{translate_columns, TranslationSummary, Translator};
use crate::normalize::{clean_documents, Language, NormalizeOptions};
use crate::output::charts::ChartRenderer;
use crate::output::report::{write_topic_report, ReportContext, ReportOptions};
use crate::output::summary::write_run_summary;
use crate::output::{ArtifactOutcome, ArtifactReport};
use crate::tabular::io::{read_dataset, write_dataset};
use crate::tabular::merge::{merge_records, MergeSummary};
use crate::tabular::{output_path, Dataset, FileFormat, Schema};
use crate::topics::cluster::EmbeddingClusterModel;
use crate::topics::lda::LdaModel;
use crate::topics::vectorizer::CountVectorizer;
use crate::topics::{Strategy, Topic, TopicModel};

use segments::{build_segments, Segment};

/// Topic counts fitted by the frequency strategy when none are given.
pub const DEFAULT_TOPIC_COUNTS: [usize; 3] = [5, 10, 15];

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub schema: Schema,
    /// Extract this document and merge its records before analysis.
    pub merge_docx: Option<PathBuf>,
    pub extract: ExtractConfig,
    /// Translate the normalize columns to this language first.
    pub translate_to: Option<Language>,
    pub normalize: NormalizeOptions,
    pub strategy: Strategy,
    pub topic_counts: Vec<usize>,
    pub seed: u64,
    pub report: ReportOptions,
}

impl RunOptions {
    pub fn new(input: PathBuf, out_dir: PathBuf) -> Self {
        let schema = Schema::default();
        Self {
            input,
            out_dir,
            normalize: NormalizeOptions::for_schema(&schema),
            schema,
            merge_docx: None,
            extract: ExtractConfig::default(),
            translate_to: None,
            strategy: Strategy::Lda,
            topic_counts: DEFAULT_TOPIC_COUNTS.to_vec(),
            seed: 42,
            report: ReportOptions::default(),
        }
    }
}

/// The swappable collaborators of a run, built once by the caller.
pub struct Components {
    pub translator: Box<dyn Translator>,
    /// Required for `Strategy::Embedding`.
    pub cluster_model: Option<EmbeddingClusterModel>,
    pub renderer: Box<dyn ChartRenderer>,
    pub filter: Box<dyn TokenFilter>,
}

/// One fitted model over one segment.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRun {
    pub segment: String,
    pub label: String,
    pub model: String,
    pub documents: usize,
    pub topics: Vec<Topic>,
    pub unassigned: usize,
    pub report: ArtifactReport,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub strategy: String,
    pub merged: Option<(usize, usize, usize)>,
    pub translated: Option<(usize, usize, usize, usize)>,
    pub runs: Vec<SegmentRun>,
    /// `(segment, reason)` for every segment or fit that produced nothing.
    pub skipped: Vec<(String, String)>,
    /// Outputs written outside a segment report (merged dataset, summary).
    pub artifacts: ArtifactReport,
}

impl RunSummary {
    /// Artifacts that failed anywhere in the run.
    pub fn failures(&self) -> usize {
        self.artifacts.failures() + self.runs.iter().map(|r| r.report.failures()).sum::<usize>()
    }

    fn record_merge(&mut self, m: &MergeSummary) {
        self.merged = Some((m.updated, m.appended, m.discarded_pairs));
    }

    fn record_fit_failure(&mut self, label: &str, err: &anyhow::Error) {
        warn!(label, error = %format!("{err:#}"), "Fit failed, skipping");
        self.skipped.push((label.to_string(), format!("fit failed: {err:#}")));
    }

    fn record_translation(&mut self, t: &TranslationSummary) {
        self.translated = Some((t.translated, t.already_target, t.undetected, t.failed));
    }
}

/// Execute a full run.
pub async fn run(options: &RunOptions, components: &mut Components) -> Result<RunSummary> {
    let mut dataset = read_dataset(&options.input)?;
    let format = FileFormat::from_path(&options.input)?;
    info!(rows = dataset.len(), columns = dataset.columns.len(), "Loaded dataset");

    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("Failed to create output directory {}", options.out_dir.display()))?;

    let mut summary = RunSummary {
        input: options.input.clone(),
        out_dir: options.out_dir.clone(),
        strategy: options.strategy.to_string(),
        ..Default::default()
    };
    let stem = options
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    if let Some(docx) = &options.merge_docx {
        let records = extract_file(docx, &options.extract)?;
        let merge = merge_records(&mut dataset, &records, &options.schema)?;
        summary.record_merge(&merge);
        let path = output_path(&options.out_dir, &format!("{stem}_merged"), format.writable());
        let outcome = ArtifactOutcome::from_result(write_dataset(&dataset, &path).map(|_| path.clone()));
        summary.artifacts.record("merged_dataset", outcome);
    }

    if let Some(target) = options.translate_to {
        let translated = translate_columns(
            &mut dataset,
            &options.normalize.columns,
            components.translator.as_ref(),
            target,
        )
        .await;
        summary.record_translation(&translated);
        let path = output_path(&options.out_dir, &format!("{stem}_translated"), format.writable());
        let outcome = ArtifactOutcome::from_result(write_dataset(&dataset, &path).map(|_| path.clone()));
        summary.artifacts.record("translated_dataset", outcome);
    }

    let (mut segments, missing) = build_segments(&dataset, &options.schema, &options.normalize);
    summary.skipped.extend(missing);

    if options.normalize.clean {
        let cleaner = options.normalize.cleaner();
        for segment in &mut segments {
            clean_documents(&mut segment.documents, &cleaner, components.filter.as_mut());
        }
    }

    for segment in &segments {
        if segment.usable() == 0 {
            warn!(segment = %segment.name, "No usable documents, skipping segment");
            summary
                .skipped
                .push((segment.name.clone(), "no non-empty documents".to_string()));
            continue;
        }
        match options.strategy {
            Strategy::Lda => {
                for &k in &options.topic_counts {
                    let model = LdaModel::new(k)
                        .with_seed(options.seed)
                        .with_vectorizer(lda_vectorizer(&options.normalize));
                    let label = format!("{}_lda_k{k}", segment.name);
                    if let Err(err) =
                        fit_and_report(&model, segment, &label, &dataset, format, options, components, &mut summary)
                            .await
                    {
                        summary.record_fit_failure(&label, &err);
                    }
                }
            }
            Strategy::Embedding => {
                let model = components
                    .cluster_model
                    .as_ref()
                    .context("Embedding strategy selected but no embedding model was configured")?;
                let label = format!("{}_embedding", segment.name);
                if let Err(err) =
                    fit_and_report(model, segment, &label, &dataset, format, options, components, &mut summary).await
                {
                    summary.record_fit_failure(&label, &err);
                }
            }
        }
    }

    let summary_path = options.out_dir.join("run_summary.md");
    let outcome =
        ArtifactOutcome::from_result(write_run_summary(&summary, &summary_path).map(|_| summary_path.clone()));
    summary.artifacts.record("run_summary", outcome);

    info!(
        fits = summary.runs.len(),
        skipped = summary.skipped.len(),
        failures = summary.failures(),
        "Run complete"
    );
    Ok(summary)
}

/// Term counting for LDA: the pipeline language's stop words on top of the
/// English base list.
fn lda_vectorizer(options: &NormalizeOptions) -> CountVectorizer {
    let mut extra: Vec<String> = options.language.stop_words().iter().cloned().collect();
    extra.extend(options.custom_stop_words.iter().cloned());
    CountVectorizer::default().with_extra_stop_words(&extra)
}

#[allow(clippy::too_many_arguments)]
async fn fit_and_report(
    model: &dyn TopicModel,
    segment: &Segment,
    label: &str,
    dataset: &Dataset,
    format: FileFormat,
    options: &RunOptions,
    components: &Components,
    summary: &mut RunSummary,
) -> Result<()> {
    let texts: Vec<String> = segment.documents.iter().map(|d| d.text.clone()).collect();
    let Some(fit) = model.fit(&texts).await? else {
        warn!(segment = %segment.name, label, "Model found nothing to fit");
        summary
            .skipped
            .push((label.to_string(), "no vocabulary left after normalization".to_string()));
        return Ok(());
    };

    let ctx = ReportContext {
        out_dir: &options.out_dir,
        label,
        segment: &segment.name,
        dataset,
        documents: &segment.documents,
        shape: options.normalize.shape,
        format,
        model,
        options: &options.report,
    };
    let report = write_topic_report(&ctx, &fit, components.renderer.as_ref());
    summary.runs.push(SegmentRun {
        segment: segment.name.clone(),
        label: label.to_string(),
        model: model.name().to_string(),
        documents: segment.usable(),
        topics: fit.topics.clone(),
        unassigned: fit.noise_count(),
        report,
    });
    Ok(())
}
