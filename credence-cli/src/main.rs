//! Credence CLI
//!
//! Credibility scoring from concurrent signals with learned weights.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use credence_core::{ArticleContent, ArticleMetadata, AssessmentResult, ScoreScale};
use credence_net::parse_date;
use credence_runtime::{
    load_weights, retrain_blocking, save_weights, spawn_periodic_retrain, AssessmentError,
    BatchOutcome, HistoryStore, Services, Settings, SqliteStore,
};

#[derive(Parser)]
#[command(name = "credence")]
#[command(author, version, about = "Credence: credibility scoring with learned signal weights", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3); RUST_LOG overrides
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    #[command(flatten)]
    overrides: Overrides,
}

/// Flags layered over the settings file
#[derive(Args)]
struct Overrides {
    /// TOML settings file
    #[arg(long, global = true, env = "CREDENCE_CONFIG")]
    config: Option<PathBuf>,

    /// History database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Saved weights path
    #[arg(long, global = true)]
    weights: Option<PathBuf>,

    /// Per-call timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Label scale: raw or percent
    #[arg(long, global = true)]
    scale: Option<ScoreScale>,

    /// OpenAI-compatible API key for embeddings and sentiment
    #[arg(long, env = "OPENAI_API_KEY", global = true, hide_env_values = true)]
    openai_key: Option<String>,

    /// Fact Check Tools API key (primary source)
    #[arg(long, env = "FACTCHECK_API_KEY", global = true, hide_env_values = true)]
    factcheck_key: Option<String>,

    /// Qdrant URL for the remote reference index
    #[arg(long, env = "QDRANT_URL", global = true)]
    qdrant_url: Option<String>,

    #[arg(long, env = "QDRANT_API_KEY", global = true, hide_env_values = true)]
    qdrant_key: Option<String>,

    /// Ledger attestation endpoint
    #[arg(long, env = "LEDGER_URL", global = true)]
    ledger_url: Option<String>,

    /// JSON array of {id, text} reference claims for the local index
    #[arg(long, global = true)]
    claims: Option<PathBuf>,
}

impl Overrides {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(db) = &self.db {
            settings.db_path = db.clone();
        }
        if let Some(weights) = &self.weights {
            settings.weights_path = weights.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout_secs = timeout;
        }
        if let Some(scale) = self.scale {
            settings.score_scale = scale;
        }
        if self.openai_key.is_some() {
            settings.openai_api_key = self.openai_key.clone();
        }
        if self.factcheck_key.is_some() {
            settings.factcheck_api_key = self.factcheck_key.clone();
        }
        if self.qdrant_url.is_some() {
            settings.qdrant_url = self.qdrant_url.clone();
        }
        if self.qdrant_key.is_some() {
            settings.qdrant_api_key = self.qdrant_key.clone();
        }
        if self.ledger_url.is_some() {
            settings.ledger_url = self.ledger_url.clone();
        }
        if let Some(claims) = &self.claims {
            settings.reference_claims_path = Some(claims.clone());
        }

        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Assess one URL or a piece of raw text
    Assess {
        /// Article URL
        #[arg(short, long, conflicts_with = "text", required_unless_present = "text")]
        url: Option<String>,

        /// Raw article text instead of a URL
        #[arg(short, long)]
        text: Option<String>,

        /// Source domain for raw text
        #[arg(long, default_value = "unknown", requires = "text")]
        domain: String,

        /// Publication date for raw text (RFC 3339 or YYYY-MM-DD)
        #[arg(long, requires = "text")]
        published: Option<String>,

        /// Author for raw text
        #[arg(long, requires = "text")]
        author: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assess a file of URLs (one per line)
    Batch {
        /// File with one URL per line; '#' starts a comment
        #[arg(short, long)]
        file: PathBuf,

        /// Assessments in flight at once
        #[arg(short, long, default_value = "4")]
        concurrency: usize,

        /// Retrain every N seconds while the batch runs (0 = only at the end)
        #[arg(long)]
        retrain_every: Option<u64>,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Re-estimate weights from the history and save them
    Retrain {
        #[arg(long)]
        json: bool,
    },

    /// List stored assessment records
    History {
        /// Show only the most recent N records
        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Show the saved weight set
    Weights,

    /// Show which backends and sources are active
    Status,
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    match EnvFilter::try_from_default_env() {
        Ok(filter) => builder.with_env_filter(filter).init(),
        Err(_) => builder.with_max_level(log_level).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = cli.overrides.settings()?;

    match cli.command {
        Commands::Assess {
            url,
            text,
            domain,
            published,
            author,
            json,
        } => {
            let article = match text {
                Some(text) => Some(raw_article(&text, &domain, published.as_deref(), author)?),
                None => None,
            };
            run_assess(&settings, url, article, json).await?;
        }
        Commands::Batch {
            file,
            concurrency,
            retrain_every,
            json,
        } => {
            run_batch(&settings, &file, concurrency, retrain_every, json).await?;
        }
        Commands::Retrain { json } => {
            run_retrain(&settings, json).await?;
        }
        Commands::History { limit, json } => {
            show_history(&settings, limit, json)?;
        }
        Commands::Weights => {
            let weights = load_weights(&settings.weights_path);
            println!("{}", serde_json::to_string_pretty(&weights)?);
        }
        Commands::Status => {
            let services = Services::build(&settings).await?;
            println!("{}", serde_json::to_string_pretty(&services.status)?);
            println!("History records: {}", services.store.count()?);
        }
    }

    Ok(())
}

fn raw_article(
    text: &str,
    domain: &str,
    published: Option<&str>,
    author: Option<String>,
) -> Result<ArticleContent> {
    let mut metadata = ArticleMetadata::new(domain);
    if let Some(raw) = published {
        let date = parse_date(raw)
            .with_context(|| format!("Unrecognised publication date: {}", raw))?;
        metadata = metadata.with_publication_date(date);
    }
    if let Some(author) = author {
        metadata = metadata.with_author(&author);
    }
    Ok(ArticleContent::from_text(text, metadata))
}

async fn run_assess(
    settings: &Settings,
    url: Option<String>,
    article: Option<ArticleContent>,
    json: bool,
) -> Result<()> {
    let services = Services::build(settings).await?;

    let outcome = match (url, article) {
        (_, Some(article)) => services.assessor.assess_article(article).await,
        (Some(url), None) => services.assessor.assess_url(&url).await,
        (None, None) => anyhow::bail!("Either --url or --text is required"),
    };

    report_outcome(outcome, json)
}

/// Print an assessment; a failure is printed (as JSON when asked) and
/// returned so the process exits non-zero
fn report_outcome(outcome: Result<AssessmentResult, AssessmentError>, json: bool) -> Result<()> {
    match outcome {
        Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Ok(result) => print_result(&result),
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            return Err(anyhow::Error::new(e).context("Assessment failed"));
        }
    }

    Ok(())
}

fn print_result(result: &AssessmentResult) {
    let signals = &result.signals;
    println!("🔎 {}", result.url.as_deref().unwrap_or(&result.source_domain));
    println!("📊 Score: {:.2} ({})", result.final_score, result.label);
    println!(
        "⚖️  Weights: craap={:.3} sift={:.3} rag={:.3}",
        result.weights.craap_weight(),
        result.weights.sift_weight(),
        result.weights.rag_weight()
    );
    println!(
        "   CRAAP: currency={:.2} relevance={:.2} authority={:.2} accuracy={:.2} purpose={:.2}",
        signals.craap.currency,
        signals.craap.relevance,
        signals.craap.authority,
        signals.craap.accuracy,
        signals.craap.purpose
    );
    println!("   SIFT: {:.2}", signals.sift_score);
    println!(
        "   Corroboration: {:.2} (vector {:.2}, {} primary, {} secondary)",
        signals.corroboration.score,
        signals.corroboration.vector_score,
        signals.corroboration.primary_claims.len(),
        signals.corroboration.secondary_hits.len()
    );
    println!(
        "   Sentiment: {} polarity={:.2} subjectivity={:.2}",
        signals.sentiment.label.as_deref().unwrap_or("n/a"),
        signals.sentiment.polarity,
        signals.sentiment.subjectivity
    );
    match signals.ledger_verified {
        Some(true) => println!("⛓️  Ledger: attested"),
        Some(false) => println!("⛓️  Ledger: not attested"),
        None => {}
    }
    if !signals.degraded.is_empty() {
        let names: Vec<_> = signals.degraded.iter().map(|k| k.as_str()).collect();
        println!("⚠️  Degraded: {}", names.join(", "));
    }
}

async fn run_batch(
    settings: &Settings,
    file: &Path,
    concurrency: usize,
    retrain_every: Option<u64>,
    json: bool,
) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Cannot read URL list {}", file.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    let services = Services::build(settings).await?;

    let interval = retrain_every.unwrap_or(settings.retrain_interval_secs);
    let retrainer = (interval > 0).then(|| {
        info!("Retraining every {}s during the batch", interval);
        spawn_periodic_retrain(
            services.optimizer.clone(),
            services.weights.clone(),
            Duration::from_secs(interval),
        )
    });

    let items = services.assessor.assess_batch(urls, concurrency).await;

    if let Some(handle) = retrainer {
        handle.abort();
    }

    let mut failed = 0;
    for item in &items {
        if json {
            println!("{}", serde_json::to_string(item)?);
            continue;
        }
        match &item.outcome {
            BatchOutcome::Assessed(result) => {
                println!("✅ {:.2} {:<18} {}", result.final_score, result.label.as_str(), item.url)
            }
            BatchOutcome::Failed(e) => {
                failed += 1;
                println!("❌ {}: {}", item.url, e)
            }
        }
    }

    let report = retrain_blocking(services.optimizer.clone(), services.weights.clone()).await?;
    save_weights(&settings.weights_path, &report.weights)?;

    if !json {
        println!(
            "\n📦 {} assessed, {} failed. Weights retrained on {} records: craap={:.3} sift={:.3} rag={:.3}",
            items.len() - failed,
            failed,
            report.records,
            report.weights.craap_weight(),
            report.weights.sift_weight(),
            report.weights.rag_weight()
        );
    }

    Ok(())
}

async fn run_retrain(settings: &Settings, json: bool) -> Result<()> {
    let store = SqliteStore::open(&settings.db_path)?;
    let optimizer = credence_runtime::WeightOptimizer::new(std::sync::Arc::new(store))
        .with_forest(settings.forest);

    let report = tokio::task::spawn_blocking(move || optimizer.retrain()).await??;
    save_weights(&settings.weights_path, &report.weights)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("🧮 Retrained on {} records ({:?})", report.records, report.source);
        println!(
            "⚖️  craap={:.3} sift={:.3} rag={:.3}",
            report.weights.craap_weight(),
            report.weights.sift_weight(),
            report.weights.rag_weight()
        );
        println!("💾 Saved to {}", settings.weights_path.display());
    }

    Ok(())
}

fn show_history(settings: &Settings, limit: usize, json: bool) -> Result<()> {
    let store = SqliteStore::open(&settings.db_path)?;
    let records = store.read_all()?;
    let start = records.len().saturating_sub(limit);
    let recent = &records[start..];

    if json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }

    println!("📚 {} records (showing {})", records.len(), recent.len());
    for record in recent {
        println!(
            "{}  {:.2}  craap={:.2} sift={:.2} rag={:.2}  {}",
            record.date.format("%Y-%m-%d %H:%M"),
            record.final_score,
            record.craap_mean(),
            record.sift_score,
            record.rag_score,
            record.source
        );
    }

    Ok(())
}
