//! Stats command handler.

use clap::Args;
use docgraph_core::{AppConfig, AppResult};

/// Show vector store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let store = super::open_store(config)?;
        let stats = store.list_stats().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        if stats.is_empty() {
            println!("No indexes in {}", config.store_path.display());
            return Ok(());
        }

        println!("Vector store: {}", config.store_path.display());
        for index in stats {
            println!(
                "  {}  dimension {}  {} entries",
                index.name, index.dimension, index.entry_count
            );
        }

        Ok(())
    }
}
