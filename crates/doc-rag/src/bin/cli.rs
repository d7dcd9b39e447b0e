//! doc-rag command line
//!
//! Run with: cargo run -p doc-rag --features cli --bin doc-rag -- --help

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_rag::{
    config::RagConfig,
    evaluation::parse_questions,
    normalizer::{NormalizeOutcome, OutputFormat, XmlNormalizer},
    pipeline::{self, EvaluationSession, IngestTarget, IngestionOrchestrator},
    providers,
    types::{Document, ProcessingMode},
};

#[derive(Parser, Debug)]
#[command(
    name = "doc-rag",
    version,
    about = "Normalize documents, answer questions over them and manage knowledge bases"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "DOC_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize XML files into text artifacts next to them
    Normalize {
        /// XML files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// pretty_xml, cleaned_json, cleaned_xml or direct_json
        #[arg(long, default_value = "pretty_xml")]
        format: String,

        /// Tag to remove before partitioning (repeatable)
        #[arg(long = "remove-tag")]
        remove_tags: Vec<String>,
    },

    /// Answer questions from a CSV over one document and score the answers
    Ask {
        /// Document to evaluate
        #[arg(long)]
        document: PathBuf,

        /// Questions CSV (header row, question in the first column)
        #[arg(long)]
        questions: PathBuf,

        /// "Only XML", "XML to JSON", "XML to ENRICHED XML" or "OFFICE File"
        #[arg(long, default_value = "Only XML")]
        mode: String,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Upload a file to object storage and start knowledge base ingestion
    Ingest {
        /// File to upload
        path: PathBuf,

        #[arg(long)]
        bucket: String,

        #[arg(long)]
        data_source_id: String,

        #[arg(long)]
        knowledge_base_id: String,

        /// Object key; defaults to the file name
        #[arg(long)]
        object_name: Option<String>,
    },

    /// Ask the managed knowledge base
    KbQuery {
        #[arg(long)]
        knowledge_base_id: String,

        /// Generation model; defaults to gcp.generation_model
        #[arg(long)]
        model_id: Option<String>,

        /// Questions CSV
        #[arg(long, conflicts_with = "question")]
        questions: Option<PathBuf>,

        /// A single question (repeatable)
        #[arg(long)]
        question: Vec<String>,
    },

    /// Delete stored data
    Teardown {
        #[command(subcommand)]
        target: TeardownTarget,
    },
}

#[derive(Subcommand, Debug)]
enum TeardownTarget {
    /// Delete every object in a bucket
    Bucket { name: String },
    /// Delete every vector in a managed index
    VectorIndex { name: String },
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Normalize {
            paths,
            format,
            remove_tags,
        } => normalize(&config, paths, &format, remove_tags).await,
        Command::Ask {
            document,
            questions,
            mode,
            json,
        } => ask(&config, document, questions, &mode, json).await,
        Command::Ingest {
            path,
            bucket,
            data_source_id,
            knowledge_base_id,
            object_name,
        } => {
            let target = IngestTarget {
                bucket,
                data_source_id,
                knowledge_base_id,
            };
            ingest(&config, path, target, object_name).await
        }
        Command::KbQuery {
            knowledge_base_id,
            model_id,
            questions,
            question,
        } => kb_query(&config, &knowledge_base_id, model_id, questions, question).await,
        Command::Teardown { target } => teardown(&config, target).await,
    }
}

async fn normalize(
    config: &RagConfig,
    paths: Vec<PathBuf>,
    format: &str,
    remove_tags: Vec<String>,
) -> Result<()> {
    let Some(format) = OutputFormat::parse(format) else {
        bail!("unknown format '{}'", format);
    };
    let mut normalizer = XmlNormalizer::new(config.normalizer.clone());
    if !remove_tags.is_empty() {
        normalizer = normalizer.with_remove_tags(remove_tags);
    }

    let bar = spinner(&format!("Normalizing {} files", paths.len()));
    let outcomes = normalizer.normalize_batch(&paths, format).await;
    bar.finish_and_clear();

    let mut failed = 0;
    for outcome in &outcomes {
        match outcome {
            NormalizeOutcome::Written(path) => println!("wrote  {}", path.display()),
            NormalizeOutcome::Failed { source, reason } => {
                failed += 1;
                println!("failed {}: {}", source.display(), reason);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} files failed", failed, outcomes.len());
    }
    Ok(())
}

async fn ask(
    config: &RagConfig,
    document: PathBuf,
    questions: PathBuf,
    mode: &str,
    json: bool,
) -> Result<()> {
    let Some(mode) = ProcessingMode::parse(mode) else {
        bail!("unknown mode '{}'", mode);
    };
    let document = Document::read(&document)
        .await
        .with_context(|| format!("failed to read {}", document.display()))?;
    let questions_csv = tokio::fs::read(&questions)
        .await
        .with_context(|| format!("failed to read {}", questions.display()))?;

    let session = EvaluationSession::new(
        config,
        providers::embedder_from_config(config)?,
        providers::llm_from_config(config)?,
    );

    let bar = spinner(&format!("Evaluating {} ({})", document.filename(), mode.label()));
    let report = session.run(&document, &questions_csv, mode).await;
    bar.finish_and_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} extracts indexed from {}",
        report.extract_count,
        report.artifact_path.display()
    );
    for result in &report.results {
        println!("\nQ: {}", result.question);
        for (i, answer) in result.answers.iter().enumerate() {
            println!("  [{}] {}", i + 1, answer);
        }
        for failure in &result.failures {
            println!("  (extract {} failed: {})", failure.extract_index, failure.error);
        }
        if let Some(scores) = result.scores {
            println!(
                "  precision {:.3}  recall {:.3}  f1 {:.3}",
                scores.precision, scores.recall, scores.f1
            );
        }
    }
    for error in &report.errors {
        println!("\nQ: {}\n  error: {}", error.question, error.error);
    }
    Ok(())
}

async fn ingest(
    config: &RagConfig,
    path: PathBuf,
    target: IngestTarget,
    object_name: Option<String>,
) -> Result<()> {
    let orchestrator = IngestionOrchestrator::new(
        providers::object_store_from_config(config).await?,
        providers::knowledge_base_from_config(config)?,
    );

    let bar = spinner(&format!("Uploading {}", path.display()));
    let outcome = orchestrator
        .upload_and_ingest(&path, &target, object_name.as_deref())
        .await;
    bar.finish_and_clear();

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.success {
        bail!("ingestion failed in state {:?}", outcome.state);
    }
    Ok(())
}

async fn kb_query(
    config: &RagConfig,
    knowledge_base_id: &str,
    model_id: Option<String>,
    questions_csv: Option<PathBuf>,
    mut questions: Vec<String>,
) -> Result<()> {
    if let Some(path) = questions_csv {
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        questions.extend(parse_questions(&data)?.into_iter().map(|q| q.text));
    }
    if questions.is_empty() {
        bail!("no questions given");
    }

    let model_id = match model_id {
        Some(model) => model,
        None => config.gcp()?.generation_model.clone(),
    };
    let service = providers::knowledge_base_from_config(config)?;

    let bar = spinner(&format!("Asking {} questions", questions.len()));
    let answers =
        pipeline::process_questions(service.as_ref(), &questions, knowledge_base_id, &model_id).await;
    bar.finish_and_clear();

    for answer in answers {
        println!("Q: {}", answer.question);
        match (answer.answer, answer.error) {
            (Some(text), _) => println!("A: {}\n", text),
            (None, Some(error)) => println!("error: {}\n", error),
            (None, None) => println!("A: <none>\n"),
        }
    }
    Ok(())
}

async fn teardown(config: &RagConfig, target: TeardownTarget) -> Result<()> {
    match target {
        TeardownTarget::Bucket { name } => {
            let store = providers::object_store_from_config(config).await?;
            let deleted = pipeline::clear_bucket(store.as_ref(), &name).await?;
            println!("deleted {} objects from {}", deleted, name);
        }
        TeardownTarget::VectorIndex { name } => {
            let admin = providers::vector_admin_from_config(config)?;
            let deleted = pipeline::clear_vector_index(
                admin.as_ref(),
                &name,
                config.vector_index.delete_batch_size,
            )
            .await?;
            println!("deleted {} vectors from {}", deleted, name);
        }
    }
    Ok(())
}
