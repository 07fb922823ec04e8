use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tm_stats::config::AppConfig;
use tm_stats::ingest::CancelToken;
use tm_stats::pipeline::{ExplainRow, Pipeline, TableSummary};

#[derive(Parser)]
#[command(name = "tm-stats")]
#[command(about = "Faction outcome statistics from Terra Mystica game logs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./tm-stats.toml")]
    config: PathBuf,

    /// Data directory path (outcome cache)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory with downloaded game files
    #[arg(long)]
    games_dir: Option<PathBuf>,

    /// Where bucket tables are written
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest games (or reuse the cache) and write both tables
    Run {
        /// Re-extract outcomes even if the cache is fresh
        #[arg(long)]
        refresh: bool,
    },

    /// Extract outcomes into the cache only
    Ingest,

    /// Aggregate cached outcomes and write both tables
    Compute,

    /// Print one CSV row per outcome with its bucket key
    Explain {
        /// Only this game
        #[arg(long)]
        game: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {:?}", cli.config))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.games_dir {
        config.games_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting tm-stats v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing with the games read so far");
                cancel.cancel();
            }
        });
    }

    let command = cli.command;
    tokio::task::spawn_blocking(move || execute(command, config, cancel)).await?
}

fn execute(command: Commands, config: AppConfig, cancel: CancelToken) -> Result<()> {
    let pipeline = Pipeline::new(config, cancel);

    match command {
        Commands::Run { refresh } => {
            let summaries = pipeline.run(refresh)?;
            print_summaries(&summaries);
        }

        Commands::Ingest => {
            let ingested = pipeline.ingest(true)?;
            let report = &ingested.report;
            println!("\n=== Ingest Results ===");
            println!("Games seen:        {}", report.games_seen);
            println!("Games admitted:    {}", report.games_admitted);
            for (reason, count) in &report.rejections {
                println!("  rejected ({}): {}", reason, count);
            }
            println!("Seats dropped:     {}", report.participants_dropped);
            println!("Outcomes cached:   {}", ingested.outcomes.len());
            if report.cancelled {
                println!("\n(cancelled - cache is partial and will be rebuilt)");
            }
        }

        Commands::Compute => {
            let summaries = pipeline.compute()?;
            print_summaries(&summaries);
        }

        Commands::Explain { game } => {
            let rows = pipeline.explain(game.as_deref())?;
            println!("{}", ExplainRow::HEADER);
            for row in rows {
                println!("{}", row.to_csv());
            }
        }
    }

    Ok(())
}

fn print_summaries(summaries: &[TableSummary]) {
    println!("\n=== Tables ===");
    for s in summaries {
        println!(
            "{:<10} {:>7} buckets {:>9} outcomes {:>5} skipped  {}",
            s.variant.to_string(),
            s.buckets,
            s.outcomes,
            s.skipped,
            s.path.display()
        );
    }
}
