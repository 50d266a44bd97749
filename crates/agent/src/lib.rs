//! Docgraph answering agent.
//!
//! Wraps the retrieval tool and a completion client into a
//! question-answering loop: retrieve context under a deadline, render it
//! into a prompt, and ask the model for a structured answer.

pub mod agent;
pub mod context;
pub mod instructions;

pub use agent::{AgentAnswer, GraphRagAgent};
pub use context::{build_prompt, render_context};
pub use instructions::AGENT_INSTRUCTIONS;
