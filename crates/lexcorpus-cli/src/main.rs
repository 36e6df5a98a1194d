mod display;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use lexcorpus_ai::gemini::DEFAULT_MODEL;
use lexcorpus_ai::{CredentialPool, GeminiClient};
use lexcorpus_core::PipelineConfig;
use lexcorpus_parse::extract_text;
use lexcorpus_store::DuckStore;
use lexcorpus_sync::pipeline::segment_and_analyze;
use lexcorpus_sync::{CorpusClient, IngestRequest, Pipeline, Progress, RunMode, ScrapeClient};

#[derive(Parser)]
#[command(
    name = "lexcorpus",
    version,
    about = "Ingest Brazilian statutes into an article-level corpus"
)]
struct Cli {
    /// JSON file overriding pipeline policy defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a statute, segment it, recover missing articles and store it.
    Sync(SyncArgs),
    /// Sanitize, segment and analyze a local HTML or markdown file.
    Inspect {
        file: PathBuf,
        /// Print every record as a table.
        #[arg(long)]
        records: bool,
    },
    /// Print the records stored for a destination.
    Show {
        destination: String,
        #[arg(long, env = "LEXCORPUS_DB", default_value = "lexcorpus.duckdb")]
        db: PathBuf,
    },
}

#[derive(clap::Args)]
struct SyncArgs {
    /// Statute page URL.
    url: String,

    /// Destination table name.
    #[arg(long)]
    destination: String,

    #[arg(long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Comma-separated AI credentials, rotated on rate limits.
    #[arg(long, env = "LEXCORPUS_AI_KEYS", hide_env_values = true)]
    ai_keys: Option<String>,

    #[arg(long, env = "LEXCORPUS_AI_MODEL", default_value = DEFAULT_MODEL)]
    ai_model: String,

    /// Base URL of the scraping service.
    #[arg(long, env = "LEXCORPUS_FETCH_URL")]
    fetch_url: String,

    #[arg(long, env = "LEXCORPUS_FETCH_KEY", hide_env_values = true)]
    fetch_key: Option<String>,

    /// Base URL of the alternate legal corpus.
    #[arg(long, env = "LEXCORPUS_CORPUS_URL")]
    corpus_url: Option<String>,

    #[arg(long, env = "LEXCORPUS_DB", default_value = "lexcorpus.duckdb")]
    db: PathBuf,

    /// Per-request timeout for every collaborator, in seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Print every record as a table after the summary.
    #[arg(long)]
    records: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Sanitize, segment and analyze only.
    Raw,
    /// Everything except storage.
    Analyzed,
    Full,
}

impl From<Mode> for RunMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::Raw => RunMode::RawPreview,
            Mode::Analyzed => RunMode::AnalyzedPreview,
            Mode::Full => RunMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    info!("lexcorpus v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Sync(args) => sync(args, config).await,
        Command::Inspect { file, records } => inspect(&file, records, &config),
        Command::Show { destination, db } => show(&destination, &db),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    PipelineConfig::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))
}

async fn sync(args: SyncArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let mode = RunMode::from(args.mode);

    let fetcher = ScrapeClient::new(&args.fetch_url, args.fetch_key.clone(), timeout)
        .context("building fetch client")?;
    let pool = args
        .ai_keys
        .as_deref()
        .map(CredentialPool::from_csv)
        .filter(|p| !p.is_empty());
    let ai = match pool {
        Some(pool) => Some(
            GeminiClient::new(pool, args.ai_model.as_str(), timeout).context("building AI client")?,
        ),
        None => {
            warn!("no AI credentials configured; AI steps disabled");
            None
        }
    };
    let corpus = args
        .corpus_url
        .as_deref()
        .map(|url| CorpusClient::new(url, timeout))
        .transpose()
        .context("building corpus client")?;
    let store = if mode.persists() {
        Some(
            DuckStore::open_persistent(&args.db)
                .with_context(|| format!("opening {}", args.db.display()))?,
        )
    } else {
        None
    };

    let (progress, mut rx) = Progress::channel();
    let printer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            eprintln!("  {line}");
        }
    });

    let mut pipeline = Pipeline::new(&fetcher, config).with_progress(progress);
    if let Some(ai) = &ai {
        pipeline = pipeline.with_ai(ai);
    }
    if let Some(corpus) = &corpus {
        pipeline = pipeline.with_corpus(corpus);
    }
    if let Some(store) = &store {
        pipeline = pipeline.with_sink(store);
    }

    let request = IngestRequest {
        destination: args.destination,
        url: args.url,
        mode,
    };
    let outcome = pipeline.run(&request).await;
    drop(pipeline);
    printer.await.context("progress printer")?;

    display::print_outcome(&outcome);
    if args.records {
        display::print_records(&outcome.records)?;
    }
    if !outcome.success {
        anyhow::bail!(
            "ingestion of {} failed: {}",
            request.url,
            outcome.error.as_deref().unwrap_or("no records written")
        );
    }
    Ok(())
}

fn inspect(file: &Path, records: bool, config: &PipelineConfig) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let is_markdown = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    let (html, md) = if is_markdown {
        (None, Some(raw.as_str()))
    } else {
        (Some(raw.as_str()), None)
    };
    let text = extract_text(html, md, 1).with_context(|| format!("extracting {}", file.display()))?;
    let (recs, analysis) = segment_and_analyze(&text, config);

    println!("=== {} ===", file.display());
    println!();
    display::print_analysis(&analysis);
    display::print_gaps(&analysis.gaps);
    if records {
        display::print_records(&recs)?;
    }
    Ok(())
}

fn show(destination: &str, db: &Path) -> anyhow::Result<()> {
    let store =
        DuckStore::open_persistent(db).with_context(|| format!("opening {}", db.display()))?;
    let count = store
        .count(destination)
        .with_context(|| format!("counting {destination}"))?;
    println!("{destination}: {count} records");
    let batches = store.records(destination)?;
    println!("{}", arrow::util::pretty::pretty_format_batches(&batches)?);
    Ok(())
}
