//! Curator CLI
//!
//! Scores, judges and selects tech articles from already-collected feeds.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use curator_core::{InMemoryCache, JsonlHistory, RawArticle};
use curator_judge::{create_backend, LlmJudge, Provider};
use curator_net::{describe, FetchPolicy};
use curator_pipeline::{CuratorConfig, Pipeline};
use curator_signals::SignalAggregator;

#[derive(Parser)]
#[command(name = "curator")]
#[command(author, version, about = "Curator: multi-source tech article curation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the curation pipeline over a JSON file of collected articles
    Run {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// JSON array of collected article records
        #[arg(short, long)]
        articles: PathBuf,

        /// Judgment cache file (read, and written back after a real run)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Run history file (one JSON line per run)
        #[arg(long)]
        history: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Judge and select, but write no cache or history
        #[arg(long)]
        dry_run: bool,

        /// Stop after candidate selection (implies --dry-run; no API key needed)
        #[arg(long)]
        no_judge: bool,

        #[command(flatten)]
        keys: ApiKeys,
    },

    /// Fetch aggregated popularity for URLs
    Signals {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// URLs to look up
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct ApiKeys {
    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,
}

impl ApiKeys {
    fn for_provider(&self, provider: Provider) -> Result<&str> {
        let key = match provider {
            Provider::Anthropic => &self.anthropic_key,
            Provider::OpenAi => &self.openai_key,
            Provider::OpenRouter => &self.openrouter_key,
        };
        key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("{} API key required. Set {}", provider, provider.key_env())
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct RunMode {
    /// Leave the cache file and run history untouched
    dry_run: bool,
    judge: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout carries the report
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            config,
            articles,
            cache,
            history,
            output,
            dry_run,
            no_judge,
            keys,
        } => {
            let mode = RunMode {
                dry_run: dry_run || no_judge,
                judge: !no_judge,
            };
            run_pipeline(&config, &articles, cache, history, output, mode, &keys).await?;
        }
        Commands::Signals { config, urls } => {
            show_signals(&config, &urls).await?;
        }
        Commands::CheckConfig { config } => {
            check_config(&config)?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<CuratorConfig> {
    CuratorConfig::load(path).with_context(|| format!("Invalid configuration {}", path.display()))
}

fn aggregator(config: &CuratorConfig) -> Result<SignalAggregator> {
    describe(&config.policy);
    let policy = FetchPolicy::with_client(config.policy.clone(), &config.net)?;
    let aggregator = SignalAggregator::with_default_sources(Arc::new(policy));
    let sources: Vec<String> = aggregator.sources().iter().map(|s| s.to_string()).collect();
    info!("Signal sources: {}", sources.join(", "));
    Ok(aggregator)
}

async fn run_pipeline(
    config_path: &Path,
    articles_path: &Path,
    cache_path: Option<PathBuf>,
    history_path: Option<PathBuf>,
    output: Option<PathBuf>,
    mode: RunMode,
    keys: &ApiKeys,
) -> Result<()> {
    let config = load_config(config_path)?;
    let raw: Vec<RawArticle> = serde_json::from_str(
        &fs::read_to_string(articles_path)
            .with_context(|| format!("Cannot read {}", articles_path.display()))?,
    )
    .with_context(|| format!("{} is not a JSON array of articles", articles_path.display()))?;
    info!("Loaded {} articles from {}", raw.len(), articles_path.display());

    let cache = Arc::new(match &cache_path {
        Some(path) => InMemoryCache::load(path)?,
        None => InMemoryCache::new(),
    });

    let mut pipeline = Pipeline::from_config(&config, Arc::new(aggregator(&config)?))?
        .with_cache(cache.clone());

    if mode.judge {
        let provider = config.judge.provider;
        let backend = create_backend(
            provider,
            keys.for_provider(provider)?,
            Some(config.judge.model_name()),
        )?;
        info!("Judge: {} / {}", provider, backend.model_name());
        let mut judge = LlmJudge::new(backend, &config.interests, config.judge.judge_config());
        if !mode.dry_run {
            judge = judge.with_cache(cache.clone());
        }
        pipeline = pipeline.with_judge(Arc::new(judge));
    }
    if let Some(path) = history_path {
        pipeline = pipeline.with_history(Arc::new(JsonlHistory::new(path)));
    }

    let report = pipeline.run(&raw, mode.dry_run).await?;

    if !mode.dry_run {
        if let Some(path) = &cache_path {
            cache.save(path)?;
            info!("Saved {} cached judgments to {}", cache.len(), path.display());
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            fs::write(&path, json)?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn show_signals(config_path: &Path, urls: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    let scores = aggregator(&config)?.fetch_batch(urls).await;

    for url in urls {
        match scores.get(url) {
            Some(score) if !score.is_fallback() => {
                println!("{:>6.1}  ({} sources)  {}", score.value, score.sources, url)
            }
            Some(score) => println!("{:>6.1}  (fallback)   {}", score.value, url),
            None => println!("     -  (no data)    {}", url),
        }
    }
    Ok(())
}

fn check_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = config.registry()?;

    println!("Configuration OK: {}", config_path.display());
    println!(
        "  Sources: {} ({} enabled)",
        registry.all().len(),
        registry.enabled().count()
    );
    println!(
        "  Judge: {} / {} (retries {}, concurrency {})",
        config.judge.provider,
        config.judge.model_name(),
        config.judge.max_retries,
        config.judge.concurrency
    );
    println!(
        "  Selection: {} candidates, {} final, {} per domain",
        config.selection.max_candidates, config.selection.max_final, config.selection.max_per_domain
    );
    let p = &config.policy;
    println!(
        "  Fetch policy: {} per domain, {} total, jitter {:.1}-{:.1}s, timeout {}s, retries {:?}",
        p.domain_concurrency,
        p.total_concurrency,
        p.jitter_min_secs,
        p.jitter_max_secs,
        p.timeout_secs,
        p.retry_delays_secs
    );
    let tiers = [
        ("max", config.interests.max_interest.len()),
        ("high", config.interests.high_interest.len()),
        ("medium", config.interests.medium_interest.len()),
        ("low", config.interests.low_interest.len()),
        ("ignore", config.interests.ignore_interest.len()),
    ];
    let tiers: Vec<String> = tiers.iter().map(|(name, n)| format!("{name} {n}")).collect();
    println!("  Interest topics: {}", tiers.join(", "));
    Ok(())
}
