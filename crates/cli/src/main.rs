use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::PipelineConfig;
use context_discovery::FileDiscoverer;
use context_indexer::{BatchIndex, IndexerError, SymbolIndexer};
use report::{DiscoverReport, GatherReport, StaleReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

mod config;
mod report;

#[derive(Parser)]
#[command(name = "context-pipeline")]
#[command(about = "Find the files relevant to a task and extract their symbols", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Symbol cache directory (default: <root>/.context/symbols)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank project files by relevance to a task
    Discover(TaskArgs),

    /// Extract symbols from the given files
    Symbols(SymbolsArgs),

    /// Discover files for a task, then extract their symbols
    Gather(TaskArgs),

    /// Remove cache records whose source file no longer exists
    #[command(name = "clear-stale")]
    ClearStale,
}

#[derive(Args)]
struct TaskArgs {
    /// Free-form task description
    task: String,

    /// Maximum number of files (default: discovery.max_results)
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct SymbolsArgs {
    /// Files to index, absolute or relative to the root
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Project root {} is not accessible", cli.root.display()))?;
    let mut config = PipelineConfig::load(&root).context("Failed to load pipeline config")?;
    if let Some(dir) = &cli.cache_dir {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Invalid cache directory {}", dir.display()))?;
        config.indexer.cache_dir = Some(dir);
    }

    match cli.command {
        Commands::Discover(args) => run_discover(&root, &config, args),
        Commands::Symbols(args) => run_symbols(&root, &config, args).await,
        Commands::Gather(args) => run_gather(&root, &config, args).await,
        Commands::ClearStale => run_clear_stale(&root, &config).await,
    }
}

fn run_discover(root: &Path, config: &PipelineConfig, args: TaskArgs) -> Result<()> {
    let discoverer = discoverer(root, config)?;
    let limit = args.limit.unwrap_or(config.discovery.max_results);

    let candidates = discoverer.discover(&args.task, limit);
    log::info!("{} candidate files for {:?}", candidates.len(), args.task);
    print_json(&DiscoverReport {
        keywords: discoverer.keywords(&args.task),
        task: args.task,
        candidates,
    })
}

async fn run_symbols(root: &Path, config: &PipelineConfig, args: SymbolsArgs) -> Result<()> {
    let indexer = indexer(root, config)?;
    let batch = indexer
        .batch_index(&args.paths)
        .await
        .context("Symbol extraction failed")?;
    print_json(&batch)
}

async fn run_gather(root: &Path, config: &PipelineConfig, args: TaskArgs) -> Result<()> {
    let start = Instant::now();
    let discoverer = discoverer(root, config)?;
    let indexer = indexer(root, config)?;
    let limit = args.limit.unwrap_or(config.discovery.max_results);

    let candidates = discoverer.discover(&args.task, limit);
    let paths: Vec<&str> = candidates.iter().map(|c| c.path.as_str()).collect();

    let batch = match indexer.batch_index(&paths).await {
        Ok(batch) => batch,
        // Report per-file failures instead of aborting the whole gather
        Err(IndexerError::TotalFailure { failures }) => {
            let mut batch = BatchIndex::default();
            for failure in failures {
                batch.stats.add_failure();
                batch.failures.push(failure);
            }
            batch
        }
        Err(e) => return Err(e).context("Symbol extraction failed"),
    };

    log::info!(
        "Gathered {} files ({} symbols, {} failures) in {} ms",
        batch.symbols.len(),
        batch.stats.symbols,
        batch.failures.len(),
        start.elapsed().as_millis()
    );
    let keywords = discoverer.keywords(&args.task);
    print_json(&GatherReport::new(args.task, keywords, candidates, batch))
}

async fn run_clear_stale(root: &Path, config: &PipelineConfig) -> Result<()> {
    let indexer = indexer(root, config)?;
    let removed = indexer
        .clear_stale()
        .await
        .context("Failed to clear stale cache records")?;
    log::info!("Removed {removed} stale cache records");
    print_json(&StaleReport {
        cache_dir: indexer.cache().dir().display().to_string(),
        removed,
    })
}

fn discoverer(root: &Path, config: &PipelineConfig) -> Result<FileDiscoverer> {
    FileDiscoverer::new(root, config.discovery.clone()).context("Failed to create file discoverer")
}

fn indexer(root: &Path, config: &PipelineConfig) -> Result<SymbolIndexer> {
    SymbolIndexer::new(root, config.indexer.clone()).context("Failed to create symbol indexer")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
