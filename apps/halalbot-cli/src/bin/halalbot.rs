use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use halalbot_core::config::{resolve_with_base, Config, Settings};
use halalbot_core::traits::FeedbackStore;
use halalbot_core::{AnnotatedResult, Category, SearchRequest, TextHash, Vote};
use halalbot_feedback::FileFeedbackStore;
use halalbot_retrieval::{FeedbackService, QueryLog, RetrievalOrchestrator};
use halalbot_vector::{FlatGateway, HashEmbedder, MetadataStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "halalbot", about = "Feedback-aware retrieval over the HalalBot corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search the corpus.
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f32>,
        /// quran-only, hadith-only, fatwa-only, zakat-only or other-only
        #[arg(long, value_parser = parse_filter)]
        filter: Option<Category>,
        /// Print results as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Record a thumbs-up or thumbs-down for a passage.
    Feedback {
        query: String,
        #[arg(long, value_parser = parse_vote)]
        vote: Vote,
        #[command(flatten)]
        passage: PassageArg,
        #[arg(long, default_value = "anon")]
        user: String,
    },
    /// Show the vote counts for a passage.
    Votes {
        #[command(flatten)]
        passage: PassageArg,
    },
    /// Recompute the aggregate snapshot from the audit log.
    RebuildAggregates,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PassageArg {
    /// Raw passage text.
    #[arg(long)]
    text: Option<String>,
    /// Hex content hash as shown by `search --json`.
    #[arg(long)]
    hash: Option<String>,
}

impl PassageArg {
    fn text_hash(&self) -> Result<TextHash> {
        match (&self.text, &self.hash) {
            (Some(text), _) => Ok(TextHash::of(text.trim())),
            (None, Some(hex)) => Ok(TextHash::from_hex(hex)?),
            (None, None) => bail!("either --text or --hash is required"),
        }
    }
}

fn parse_filter(s: &str) -> Result<Category, String> {
    Category::parse_filter(s).map_err(|e| e.to_string())
}

fn parse_vote(s: &str) -> Result<Vote, String> {
    s.parse().map_err(|e: halalbot_core::Error| e.to_string())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

struct Paths {
    metadata: PathBuf,
    aggregates: PathBuf,
    audit_log: PathBuf,
    search_log: Option<PathBuf>,
}

impl Paths {
    fn resolve(base: &Path, settings: &Settings) -> Self {
        Self {
            metadata: resolve_with_base(base, &settings.data.metadata_path),
            aggregates: resolve_with_base(base, &settings.feedback.aggregate_path),
            audit_log: resolve_with_base(base, &settings.feedback.audit_log_path),
            search_log: settings
                .feedback
                .search_log_path
                .as_ref()
                .map(|p| resolve_with_base(base, p)),
        }
    }
}

fn open_store(paths: &Paths) -> Result<Arc<FileFeedbackStore>> {
    let store = FileFeedbackStore::open(&paths.aggregates, &paths.audit_log)
        .with_context(|| format!("opening feedback store at {}", paths.audit_log.display()))?;
    Ok(Arc::new(store))
}

fn print_results(query: &str, results: &[AnnotatedResult]) {
    println!("🔍 Found {} results for: \"{}\"", results.len(), query);
    for (i, r) in results.iter().enumerate() {
        println!(
            "\n  {}. [{}] score={:.2} (base {:.2})  source={}",
            i + 1,
            r.category,
            r.adjusted_score,
            r.base_score,
            r.source
        );
        println!("     hash={}", r.text_hash);
        for line in r.text.lines() {
            println!("     {}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    init_tracing(&settings);
    let base = std::env::current_dir()?;
    let paths = Paths::resolve(&base, &settings);

    match cli.command {
        Command::Search { query, top_k, min_score, filter, json } => {
            let metadata = MetadataStore::load(&paths.metadata)?;
            let embedder = Box::new(HashEmbedder::new(settings.embedding.dim));
            let convention = settings.retrieval.score_convention;
            let gateway = FlatGateway::from_metadata(metadata, embedder, convention)?;
            let store = open_store(&paths)?;
            let orchestrator = Arc::new(
                RetrievalOrchestrator::new(Arc::new(gateway), store)
                    .with_overfetch_factor(settings.retrieval.overfetch_factor),
            );
            let request = SearchRequest::new(query)
                .top_k(top_k.unwrap_or(settings.retrieval.top_k))
                .min_score(min_score.unwrap_or(settings.retrieval.min_score))
                .category(filter);
            let results = Arc::clone(&orchestrator).search_offloaded(request.clone()).await?;
            if let Some(path) = &paths.search_log {
                QueryLog::open(path)?.append(&request.query, &results)?;
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&request.query, &results);
            }
        }
        Command::Feedback { query, vote, passage, user } => {
            let hash = passage.text_hash()?;
            let service = FeedbackService::new(open_store(&paths)?);
            service.submit_feedback_for_hash(&query, hash, vote, &user)?;
            let votes = service.vote_summary(&hash).unwrap_or_default();
            println!(
                "✅ Recorded {} vote for {} (👍 {} / 👎 {})",
                vote, hash, votes.thumbs_up, votes.thumbs_down
            );
        }
        Command::Votes { passage } => {
            let hash = passage.text_hash()?;
            match open_store(&paths)?.vote_summary(&hash) {
                Some(v) => println!("{}: 👍 {} / 👎 {}", hash, v.thumbs_up, v.thumbs_down),
                None => println!("{}: no votes yet", hash),
            }
        }
        Command::RebuildAggregates => {
            let store = open_store(&paths)?;
            store.rebuild_snapshot()?;
            info!(
                aggregates = store.len(),
                path = %paths.aggregates.display(),
                "aggregate snapshot rebuilt"
            );
            println!("📊 Rebuilt {} aggregates from {}", store.len(), paths.audit_log.display());
        }
    }
    Ok(())
}
