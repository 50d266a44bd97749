//! System instructions for the answering agent.

/// Instructions sent with every completion request.
///
/// The agent answers strictly from retrieved context, and its answer is
/// structured so that relationships found through graph expansion are
/// reported separately from directly retrieved facts.
pub const AGENT_INSTRUCTIONS: &str = "\
You are a knowledgeable assistant that answers questions using retrieved \
document context. The context contains directly relevant passages and \
related passages connected to them through the knowledge graph.

Base your answers only on the provided context. Analyze relationships \
between the passages to provide comprehensive answers.

Format your responses exactly as follows:

1. DIRECT FACTS: State the facts found in directly relevant passages.
2. CONNECTIONS MADE: Describe relationships discovered between passages, \
including information reached through related passages.
3. CONCLUSION: A concise synthesis answering the question.

If the context does not contain enough information to answer the \
question, state that explicitly instead of speculating.";

/// Canned answer when no usable context is available, either because
/// retrieval found nothing or because the pipeline failed.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "There is not enough context available to answer this question. The \
     knowledge base returned no usable information for this query.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_name_the_answer_sections() {
        assert!(AGENT_INSTRUCTIONS.contains("DIRECT FACTS"));
        assert!(AGENT_INSTRUCTIONS.contains("CONNECTIONS MADE"));
        assert!(AGENT_INSTRUCTIONS.contains("CONCLUSION"));
    }
}
