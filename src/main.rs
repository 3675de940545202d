use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, ensure};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use cidlens_core::assistant::Assistant;
use cidlens_core::config::Config;
use cidlens_core::prompt::MAX_HISTORY_TURNS;
use cidlens_index::{IngestConfig, IngestionPipeline, RetrievalEngine};
use cidlens_llm::ollama::OllamaProvider;
use cidlens_llm::provider::Message;
use cidlens_memory::{CodeRepository, SqliteCodeRepository};

const ERROR_REPLY: &str =
    "Desculpe, ocorreu um erro ao processar sua mensagem. Por favor, tente novamente.";

#[derive(Parser, Debug)]
#[command(
    name = "cidlens",
    version,
    about = "CID-10 grounded retrieval and answering for BPC/LOAS questions"
)]
struct Cli {
    /// Configuration file (defaults to $CIDLENS_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a CID-10 CSV table into the local database
    Ingest(IngestArgs),
    /// Show the codes retrieved for a query
    Search(SearchArgs),
    /// Answer a single question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive session reading questions from stdin
    Chat,
    /// Check that the model server is reachable and report stored records
    Health,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// CSV file with a header row
    csv: PathBuf,

    /// Remove every stored record before loading
    #[arg(long)]
    fresh: bool,

    /// Store records without computing embeddings
    #[arg(long)]
    skip_embeddings: bool,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    min_similarity: Option<f32>,

    /// Print results as JSON instead of the prompt context block
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Command::Ingest(args) => run_ingest(&config, args).await,
        Command::Search(args) => run_search(&config, args).await,
        Command::Ask { question } => run_ask(&config, &question.join(" ")).await,
        Command::Chat => run_chat(&config).await,
        Command::Health => run_health(&config).await,
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("CIDLENS_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

async fn open_repository(config: &Config) -> anyhow::Result<Arc<SqliteCodeRepository>> {
    let repo = SqliteCodeRepository::new(&config.storage.sqlite_path)
        .await
        .with_context(|| format!("failed to open database {}", config.storage.sqlite_path))?;
    Ok(Arc::new(repo))
}

async fn run_ingest(config: &Config, args: IngestArgs) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    let provider = Arc::new(config.ollama_provider());

    let ingest = IngestConfig {
        fresh: args.fresh,
        skip_embeddings: args.skip_embeddings,
        limit: args.limit,
        ..config.ingest_config()
    };
    let pipeline = IngestionPipeline::new(repository, provider, ingest);
    let report = pipeline
        .ingest_path(&args.csv)
        .await
        .with_context(|| format!("failed to ingest {}", args.csv.display()))?;

    for error in &report.errors {
        tracing::warn!("{error}");
    }
    println!(
        "rows read: {}, skipped: {}, inserted: {}, updated: {}, without embedding: {}, errors: {} ({} ms)",
        report.rows_read,
        report.rows_skipped,
        report.records_inserted,
        report.records_updated,
        report.embeddings_missing,
        report.errors.len(),
        report.duration_ms,
    );
    Ok(())
}

async fn run_search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let top_k = args.top_k.unwrap_or(config.retrieval.top_k);
    let min_similarity = args
        .min_similarity
        .unwrap_or(config.retrieval.min_similarity);
    check_search_bounds(top_k, min_similarity)?;

    let engine = RetrievalEngine::new(
        open_repository(config).await?,
        Arc::new(config.ollama_provider()),
        config.retrieval_config(),
    );
    let results = engine
        .search_with(&args.query.join(" "), top_k, min_similarity)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        eprintln!("no matching codes");
    } else {
        print!("{}", config.context_formatter().format(&results));
    }
    Ok(())
}

fn check_search_bounds(top_k: usize, min_similarity: f32) -> anyhow::Result<()> {
    ensure!(top_k >= 1, "--top-k must be at least 1");
    ensure!(
        (0.0..=1.0).contains(&min_similarity),
        "--min-similarity must be within [0.0, 1.0]"
    );
    Ok(())
}

fn build_assistant(
    config: &Config,
    repository: Arc<SqliteCodeRepository>,
) -> Assistant<SqliteCodeRepository, OllamaProvider> {
    Assistant::new(
        repository,
        Arc::new(config.ollama_provider()),
        config.retrieval_config(),
        config.context_formatter(),
    )
}

async fn run_ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let assistant = build_assistant(config, open_repository(config).await?);
    let answer = assistant.answer(question, &[]).await?;
    tracing::info!(
        sources = ?answer.sources.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(),
        "answered"
    );
    println!("{}", answer.reply);
    Ok(())
}

async fn run_chat(config: &Config) -> anyhow::Result<()> {
    let assistant = build_assistant(config, open_repository(config).await?);
    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("cidlens: digite sua pergunta (\"sair\" para encerrar)");
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "sair" | "exit" | "quit") {
            break;
        }

        let reply = match assistant.answer(question, &history).await {
            Ok(answer) => answer.reply,
            Err(e) => {
                tracing::error!("answer failed: {e:#}");
                ERROR_REPLY.to_owned()
            }
        };
        println!("{reply}\n");

        history.push(Message::user(question));
        history.push(Message::assistant(reply));
        let excess = history.len().saturating_sub(MAX_HISTORY_TURNS);
        history.drain(..excess);
    }
    Ok(())
}

async fn run_health(config: &Config) -> anyhow::Result<()> {
    let repository = open_repository(config).await?;
    let stored = repository.count().await?;
    let embedded = repository.all_with_embedding().await?.len();
    println!("database: {} ({stored} records, {embedded} embedded)", config.storage.sqlite_path);

    let provider = config.ollama_provider();
    provider
        .health_check()
        .await
        .with_context(|| format!("model server at {} is unreachable", config.llm.base_url))?;
    println!("model server: {} (ok)", config.llm.base_url);
    Ok(())
}
