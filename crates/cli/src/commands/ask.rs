//! Ask command handler.

use clap::Args;
use docgraph_agent::GraphRagAgent;
use docgraph_core::{AppConfig, AppResult};
use docgraph_llm::GoogleChatClient;
use docgraph_rag::{GraphRagTool, Relation, SearchOptions};
use std::sync::Arc;
use std::time::Duration;

/// Ask a question against the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of direct hits to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Cosine-similarity threshold for graph edges
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Query deadline in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the retrieved context bundle without calling the chat model
    #[arg(long)]
    pub context_only: bool,

    /// Output answer and retrieved context as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let store = super::open_store(config)?;
        let embedder = super::embedding_provider(config)?;

        let search_options = SearchOptions {
            top_k: self.top_k.unwrap_or(config.top_k),
            graph_threshold: self.threshold.unwrap_or(config.graph_threshold),
        };
        let tool = GraphRagTool::new(store, embedder, &config.index_name, search_options);
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(config.query_timeout_secs));

        if self.context_only {
            let bundle = tool
                .retrieve_with_deadline(&self.question, timeout)
                .await?;
            if self.json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                print!("{}", docgraph_agent::render_context(&bundle));
            }
            return Ok(());
        }

        let mut chat = GoogleChatClient::new(config.api_key.clone())?;
        if let Some(url) = &config.api_url {
            chat = chat.with_base_url(url.clone());
        }
        let chat = Arc::new(chat);
        let agent = GraphRagAgent::new(tool, chat, config.chat_model.clone(), timeout);

        let answer = agent.answer(&self.question).await?;

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "answer": answer.answer,
                "model": config.chat_model,
                "context": {
                    "direct": answer.context.direct_hits().count(),
                    "expanded": answer.context.expanded_hits().count(),
                    "hits": answer.context.hits,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.answer);

            if tracing::enabled!(tracing::Level::DEBUG) {
                for hit in &answer.context.hits {
                    let tag = match hit.relation {
                        Relation::Direct => "direct",
                        Relation::Expanded => "expanded",
                    };
                    tracing::debug!("Context [{}] {} score {:.3}", tag, hit.id, hit.score);
                }
            }
        }

        Ok(())
    }
}
