use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use artscope::config::Config;
use artscope::error::{exit_code_for, EXIT_WITH_WARNINGS};
use artscope::extract::{self, ExtractConfig, NameDetection};
use artscope::models::download;
use artscope::normalize::tokens::{AcceptAll, Cleaner, ConsoleCurator, TokenFilter};
use artscope::normalize::translate::{translate_columns, IdentityTranslator, OllamaTranslator, Translator};
use artscope::normalize::{Language, NormalizeOptions, Shape};
use artscope::output::charts::SvgRenderer;
use artscope::output::terminal;
use artscope::pipeline::{self, Components, RunOptions, RunSummary, DEFAULT_TOPIC_COUNTS};
use artscope::tabular::io::{read_dataset, write_dataset};
use artscope::tabular::markdown::{column_profile, parse_markdown, to_markdown};
use artscope::tabular::merge::merge_records;
use artscope::tabular::{output_path, FileFormat, Schema};
use artscope::topics::cluster::EmbeddingClusterModel;
use artscope::topics::embeddings::{Embedder, HashingEmbedder, SentenceEmbedder};
use artscope::topics::Strategy;

/// artscope: survey text analysis for art spaces.
///
/// Extracts survey answers from Word documents, merges them into the
/// art-space spreadsheet, translates and normalizes the text, and fits
/// topic models with tables and charts for each text column.
#[derive(Parser)]
#[command(name = "artscope", version, about)]
struct Cli {
    /// Exit with code 5 when the run completed but something was skipped or failed
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract Q/A records from a survey document (.docx)
    Extract {
        input: PathBuf,
        /// Write the records to this CSV file instead of printing them
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Extract a survey document and merge its records into a dataset
    Merge {
        /// Survey document (.docx)
        docx: PathBuf,
        /// Dataset to update (.xlsx, .xls or .csv)
        dataset: PathBuf,
        /// Output path (default: <output dir>/<name>_merged.<ext>)
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        extract: ExtractArgs,
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Convert a PDF to cleaned plain text
    PdfText {
        input: PathBuf,
        /// Output path (default: input with a .txt extension)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Translate dataset text columns to the pivot language
    Translate {
        input: PathBuf,
        /// Columns to translate (default: the schema's text columns)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Target language code (default: ARTSCOPE_PIVOT_LANGUAGE)
        #[arg(long)]
        to: Option<Language>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Convert a dataset to a Markdown table and verify it reads back
    Markdown {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Normalize a dataset and fit topic models over its text columns
    Topics {
        input: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Full pipeline: optional extract + merge and translation, then topics
    Run {
        input: PathBuf,
        /// Survey document to extract and merge first
        #[arg(long)]
        docx: Option<PathBuf>,
        /// Translate text columns to the pivot language before analysis
        #[arg(long)]
        translate: bool,
        #[command(flatten)]
        extract: ExtractArgs,
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Interactively choose which words and phrases of a column to keep
    Curate {
        input: PathBuf,
        /// Column to clean
        #[arg(long)]
        column: String,
        #[arg(long, default_value = "en")]
        language: Language,
        /// Offer multi-word phrases before single words
        #[arg(long)]
        phrases: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Export a dataset into a normalized SQLite database
    #[cfg(feature = "sqlite")]
    ExportSqlite {
        input: PathBuf,
        /// Database path (default: <output dir>/artscope.db)
        #[arg(long)]
        db: Option<PathBuf>,
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Download the ONNX sentence-embedding model (~90 MB)
    DownloadModel,
}

#[derive(Args, Clone)]
struct ExtractArgs {
    /// How entity names are recognised in the document
    #[arg(long, value_enum, default_value = "heading")]
    name_detection: NameDetection,
    /// Minimum similarity for a paragraph to match a question template
    #[arg(long, default_value = "0.9")]
    threshold: f64,
    /// Question templates (repeatable; default: the two survey questions)
    #[arg(long = "question")]
    questions: Vec<String>,
}

impl ExtractArgs {
    fn config(&self) -> ExtractConfig {
        let mut config = ExtractConfig {
            name_detection: self.name_detection,
            similarity_threshold: self.threshold,
            ..Default::default()
        };
        if !self.questions.is_empty() {
            config.question_templates = self.questions.clone();
        }
        config
    }
}

#[derive(Args, Clone)]
struct SchemaArgs {
    #[arg(long, default_value = "id")]
    id_column: String,
    #[arg(long, default_value = "name")]
    name_column: String,
    #[arg(long, default_value = "presentation")]
    presentation_column: String,
    #[arg(long, default_value = "history")]
    history_column: String,
    #[arg(long, default_value = "activities")]
    activities_column: String,
    #[arg(long, default_value = "question1")]
    question1_column: String,
    #[arg(long, default_value = "answer1")]
    answer1_column: String,
    #[arg(long, default_value = "question2")]
    question2_column: String,
    #[arg(long, default_value = "answer2")]
    answer2_column: String,
}

impl SchemaArgs {
    fn schema(&self) -> Schema {
        Schema {
            id: self.id_column.clone(),
            name: self.name_column.clone(),
            presentation: self.presentation_column.clone(),
            history: self.history_column.clone(),
            activities: self.activities_column.clone(),
            question1: self.question1_column.clone(),
            answer1: self.answer1_column.clone(),
            question2: self.question2_column.clone(),
            answer2: self.answer2_column.clone(),
        }
    }
}

#[derive(Args, Clone)]
struct AnalysisArgs {
    /// Text columns to analyse (default: the schema's text columns)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    #[arg(long, value_enum, default_value = "wide")]
    shape: Shape,
    #[arg(long, value_enum, default_value = "lda")]
    strategy: Strategy,
    /// Topic counts for LDA (default: 5,10,15)
    #[arg(long, value_delimiter = ',')]
    topics: Vec<usize>,
    /// Language of the texts, for stop words and stemming (default: the pivot language)
    #[arg(long)]
    language: Option<Language>,
    /// Extra stop words (repeatable)
    #[arg(long = "stop-word")]
    stop_words: Vec<String>,
    /// Skip stop-word removal and stemming
    #[arg(long)]
    no_clean: bool,
    #[arg(long)]
    no_stem: bool,
    /// Ask which words and phrases to keep (blocks on stdin)
    #[arg(long)]
    curate: bool,
    /// Smallest cluster the embedding strategy reports as a topic
    #[arg(long, default_value = "3")]
    min_cluster_size: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory (default: ARTSCOPE_OUTPUT_DIR)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("artscope=info")),
        )
        .init();

    let cli = Cli::parse();
    let strict = cli.strict;
    let code = match dispatch(cli.command).await {
        Ok(Some(summary)) if strict && has_warnings(&summary) => EXIT_WITH_WARNINGS,
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn has_warnings(summary: &RunSummary) -> bool {
    summary.failures() > 0
        || !summary.skipped.is_empty()
        || summary.translated.is_some_and(|(_, _, _, failed)| failed > 0)
}

/// Run one subcommand. Pipeline runs return their summary for `--strict`.
async fn dispatch(command: Commands) -> Result<Option<RunSummary>> {
    let config = Config::load()?;

    match command {
        Commands::Extract { input, output, extract: extract_args } => {
            let records = extract::extract_file(&input, &extract_args.config())?;
            match output {
                Some(path) => {
                    extract::write_records_csv(&records, &path)?;
                    println!("{} records written to {}", records.len(), path.display());
                }
                None => terminal::display_records(&records),
            }
        }

        Commands::Merge { docx, dataset, output, extract: extract_args, schema } => {
            let mut data = read_dataset(&dataset)?;
            let format = FileFormat::from_path(&dataset)?;
            let records = extract::extract_file(&docx, &extract_args.config())?;
            let summary = merge_records(&mut data, &records, &schema.schema())?;
            let path = output.unwrap_or_else(|| derived_path(&config, &dataset, "merged", format));
            ensure_parent(&path)?;
            write_dataset(&data, &path)?;
            println!(
                "Merged {} records: {} updated, {} appended",
                records.len(),
                summary.updated,
                summary.appended
            );
            if summary.discarded_pairs > 0 {
                println!(
                    "  {} {} Q/A pairs beyond the second were discarded",
                    "~".yellow(),
                    summary.discarded_pairs
                );
            }
            println!("Written to {}", path.display());
        }

        Commands::PdfText { input, output } => {
            let dest = output.unwrap_or_else(|| input.with_extension("txt"));
            let chars = extract::pdf::convert(&input, &dest)?;
            println!("{chars} characters of text written to {}", dest.display());
        }

        Commands::Translate { input, columns, to, output, schema } => {
            config.require_translator()?;
            let mut data = read_dataset(&input)?;
            let format = FileFormat::from_path(&input)?;
            let columns = if columns.is_empty() { default_columns(&schema.schema()) } else { columns };
            let translator = OllamaTranslator::new(&config.translate_url, &config.translate_model)?;
            let target = to.unwrap_or(config.pivot_language);
            info!(target = %target, columns = columns.len(), "Translating dataset");
            let summary = translate_columns(&mut data, &columns, &translator, target).await;
            let path = output.unwrap_or_else(|| derived_path(&config, &input, "translated", format));
            ensure_parent(&path)?;
            write_dataset(&data, &path)?;
            println!(
                "{} translated, {} already {target}, {} undetected, {} failed",
                summary.translated, summary.already_target, summary.undetected, summary.failed
            );
            println!("Written to {}", path.display());
        }

        Commands::Markdown { input, output } => {
            let data = read_dataset(&input)?;
            let markdown = to_markdown(&data);
            let path = output.unwrap_or_else(|| {
                config.output_dir.join(format!("{}.md", file_stem(&input)))
            });
            ensure_parent(&path)?;
            std::fs::write(&path, &markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            // Read the table back and compare column by column
            let reread = parse_markdown(&markdown)?;
            let before = column_profile(&data);
            let after = column_profile(&reread);
            println!("\n{}", "=== Column profile ===".bold());
            for ((column, count), (_, back)) in before.iter().zip(&after) {
                let mark = if count == back { "ok".green() } else { "!!".red().bold() };
                println!("  {mark} {column:<28} {count:>5} values");
            }
            if before != after {
                warn!("Markdown table does not read back identically");
            }
            println!("Written to {}", path.display());
        }

        Commands::Topics { input, analysis, schema } => {
            let options = run_options(&config, input, &analysis, &schema, None, None, None);
            let summary = run_pipeline(&config, &options, &analysis, None).await?;
            return Ok(Some(summary));
        }

        Commands::Run { input, docx, translate, extract: extract_args, analysis, schema } => {
            let translator: Option<Box<dyn Translator>> = if translate {
                config.require_translator()?;
                Some(Box::new(OllamaTranslator::new(
                    &config.translate_url,
                    &config.translate_model,
                )?))
            } else {
                None
            };
            let target = translate.then_some(config.pivot_language);
            let options = run_options(
                &config,
                input,
                &analysis,
                &schema,
                docx,
                Some(extract_args.config()),
                target,
            );
            let summary = run_pipeline(&config, &options, &analysis, translator).await?;
            return Ok(Some(summary));
        }

        Commands::Curate { input, column, language, phrases, output } => {
            let mut data = read_dataset(&input)?;
            let format = FileFormat::from_path(&input)?;
            let source = data.require_column(&column)?;
            let custom: Vec<String> = artscope::normalize::tokens::DEFAULT_CUSTOM_STOP_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect();
            let cleaner = Cleaner::new(language, &custom, true, phrases);
            let mut curator = ConsoleCurator::new(std::io::stdin().lock(), std::io::stdout());

            let target = data.ensure_column(&format!("{column}_clean"));
            for row in 0..data.len() {
                let Some(text) = data.get(row, source).map(str::to_string) else { continue };
                let cleaned = cleaner.clean(&text, &mut curator);
                data.set(row, target, Some(cleaned));
            }
            let kept = curator.decisions().values().filter(|&&k| k).count();
            let path = output.unwrap_or_else(|| derived_path(&config, &input, "curated", format));
            ensure_parent(&path)?;
            write_dataset(&data, &path)?;
            println!(
                "Kept {kept} of {} candidates. Written to {}",
                curator.decisions().len(),
                path.display()
            );
        }

        #[cfg(feature = "sqlite")]
        Commands::ExportSqlite { input, db, schema } => {
            let data = read_dataset(&input)?;
            let path = db.unwrap_or_else(|| config.output_dir.join("artscope.db"));
            let mut conn = artscope::db::initialize(&path)?;
            let summary = artscope::db::export::export_dataset(&mut conn, &data, &schema.schema())?;
            println!("Exported {} spaces to {}", summary.exported, path.display());
            if summary.missing_ids > 0 {
                println!("  {} {} rows had no identifier", "~".yellow(), summary.missing_ids);
            }
            if !summary.duplicate_ids.is_empty() {
                println!(
                    "  {} duplicate identifiers: {:?}",
                    "!".bright_red(),
                    summary.duplicate_ids
                );
            }
        }

        Commands::DownloadModel => {
            println!("Downloading model to {}", config.model_dir.display());
            download::download_model(&config.model_dir).await?;
            println!("\n{}", "Model ready.".green());
        }
    }

    Ok(None)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

/// `<output dir>/<stem>_<suffix>.<ext>`, keeping the input format when it can be written.
fn derived_path(config: &Config, input: &Path, suffix: &str, format: FileFormat) -> PathBuf {
    output_path(
        &config.output_dir,
        &format!("{}_{suffix}", file_stem(input)),
        format.writable(),
    )
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn default_columns(schema: &Schema) -> Vec<String> {
    schema.text_columns().iter().map(|c| c.to_string()).collect()
}

fn run_options(
    config: &Config,
    input: PathBuf,
    analysis: &AnalysisArgs,
    schema: &SchemaArgs,
    docx: Option<PathBuf>,
    extract: Option<ExtractConfig>,
    translate_to: Option<Language>,
) -> RunOptions {
    let schema = schema.schema();
    let out_dir = analysis
        .out_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    let mut options = RunOptions::new(input, out_dir);

    let mut normalize = NormalizeOptions::for_schema(&schema);
    if !analysis.columns.is_empty() {
        normalize.columns = analysis.columns.clone();
    }
    normalize.shape = analysis.shape;
    normalize.clean = !analysis.no_clean;
    normalize.stem = !analysis.no_stem;
    normalize.phrases = analysis.curate;
    normalize.language = analysis.language.unwrap_or(config.pivot_language);
    normalize.custom_stop_words.extend(analysis.stop_words.iter().cloned());

    options.seed = analysis.seed.unwrap_or(config.seed);
    options.report.seed = options.seed;
    options.schema = schema;
    options.normalize = normalize;
    options.merge_docx = docx;
    if let Some(extract) = extract {
        options.extract = extract;
    }
    options.translate_to = translate_to;
    options.strategy = analysis.strategy;
    options.topic_counts = if analysis.topics.is_empty() {
        DEFAULT_TOPIC_COUNTS.to_vec()
    } else {
        analysis.topics.clone()
    };
    options
}

/// Sentence model when it has been downloaded, hashed features otherwise.
fn load_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    if config.require_embedding_model().is_ok() {
        let dir = download::embedding_model_dir(&config.model_dir);
        let embedder = SentenceEmbedder::load(&dir)?;
        return Ok(Box::new(embedder));
    }
    warn!("Embedding model not downloaded, using hashed word features. Run `artscope download-model` for sentence embeddings.");
    Ok(Box::new(HashingEmbedder::default()))
}

async fn run_pipeline(
    config: &Config,
    options: &RunOptions,
    analysis: &AnalysisArgs,
    translator: Option<Box<dyn Translator>>,
) -> Result<RunSummary> {
    let cluster_model = match options.strategy {
        Strategy::Embedding => Some(
            EmbeddingClusterModel::new(load_embedder(config)?)
                .with_seed(options.seed)
                .with_min_cluster_size(analysis.min_cluster_size),
        ),
        Strategy::Lda => None,
    };
    let filter: Box<dyn TokenFilter> = if analysis.curate {
        Box::new(ConsoleCurator::new(std::io::stdin().lock(), std::io::stdout()))
    } else {
        Box::new(AcceptAll)
    };
    let mut components = Components {
        translator: translator.unwrap_or_else(|| Box::new(IdentityTranslator)),
        cluster_model,
        renderer: Box::new(SvgRenderer),
        filter,
    };

    let summary = pipeline::run(options, &mut components).await?;
    for run in &summary.runs {
        terminal::display_topics(&run.label, &run.model, &run.topics, run.unassigned, 8);
    }
    terminal::display_run_summary(&summary);
    Ok(summary)
}
