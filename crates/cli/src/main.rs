//! Docgraph CLI
//!
//! Main entry point for the docgraph command-line tool.
//! Provides commands for ingesting documents and asking questions over
//! the graph-augmented knowledge base.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, StatsCommand};
use docgraph_core::{config::AppConfig, logging, AppResult};

/// Docgraph CLI - graph-augmented retrieval over your documents
#[derive(Parser, Debug)]
#[command(name = "docgraph")]
#[command(about = "Graph-augmented retrieval over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, embed, and index documents
    Ingest(IngestCommand),

    /// Ask a question against the knowledge base
    Ask(AskCommand),

    /// Show vector store statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment; missing required keys
    // abort here, before any command runs.
    let config = AppConfig::load()?;
    let config = config.with_overrides(cli.log_level, cli.verbose, cli.no_color);

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Docgraph CLI starting");
    tracing::debug!("Store: {}", config.store_path.display());
    tracing::debug!("Index: {}", config.index_name);
    tracing::debug!("Embedding model: {}", config.embedding_model);

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
