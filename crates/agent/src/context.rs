//! Rendering retrieved context into prompt text.

use docgraph_rag::ContextBundle;
use std::fmt::Write;

/// Serialize a context bundle into the text block handed to the model.
///
/// Direct and graph-expanded passages are kept in separate sections so
/// the model can attribute facts to the right retrieval path. Heading
/// paths are rendered as a breadcrumb above each passage.
pub fn render_context(bundle: &ContextBundle) -> String {
    let mut out = String::new();

    out.push_str("RETRIEVED CONTEXT\n\n");
    out.push_str("Directly relevant passages:\n");
    for (i, hit) in bundle.direct_hits().enumerate() {
        render_hit(&mut out, i + 1, hit);
    }

    let expanded: Vec<_> = bundle.expanded_hits().collect();
    if !expanded.is_empty() {
        out.push_str("\nRelated passages (connected through the knowledge graph):\n");
        for (i, hit) in expanded.into_iter().enumerate() {
            render_hit(&mut out, i + 1, hit);
        }
    }

    out
}

fn render_hit(out: &mut String, number: usize, hit: &docgraph_rag::SearchHit) {
    // String formatting cannot fail; the Write impl only signals errors
    // for fallible sinks.
    let _ = write!(out, "\n[{number}] (score {:.3})", hit.score);
    if !hit.metadata.heading_path.is_empty() {
        let _ = write!(out, " {}", hit.metadata.heading_path.join(" > "));
    }
    let _ = write!(out, "\n{}\n", hit.metadata.text);
}

/// Assemble the full user prompt: question plus serialized context.
pub fn build_prompt(question: &str, bundle: &ContextBundle) -> String {
    format!(
        "{}\n\nQUESTION: {}\n\nAnswer using only the context above.",
        render_context(bundle),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_rag::{EntryMetadata, Relation, SearchHit};

    fn bundle() -> ContextBundle {
        ContextBundle {
            query: "q".to_string(),
            hits: vec![
                SearchHit {
                    id: "c1".to_string(),
                    score: 0.92,
                    relation: Relation::Direct,
                    metadata: EntryMetadata {
                        text: "Direct passage text.".to_string(),
                        heading_path: vec!["Guide".to_string(), "Setup".to_string()],
                    },
                },
                SearchHit {
                    id: "c2".to_string(),
                    score: 0.71,
                    relation: Relation::Expanded,
                    metadata: EntryMetadata {
                        text: "Related passage text.".to_string(),
                        heading_path: vec![],
                    },
                },
            ],
        }
    }

    #[test]
    fn test_sections_are_separated() {
        let text = render_context(&bundle());
        let direct_pos = text.find("Directly relevant").unwrap();
        let related_pos = text.find("Related passages").unwrap();
        assert!(direct_pos < related_pos);
        assert!(text.find("Direct passage text").unwrap() < related_pos);
        assert!(text.find("Related passage text").unwrap() > related_pos);
    }

    #[test]
    fn test_heading_breadcrumb_rendered() {
        let text = render_context(&bundle());
        assert!(text.contains("Guide > Setup"));
    }

    #[test]
    fn test_no_related_section_when_no_expanded_hits() {
        let mut b = bundle();
        b.hits.retain(|h| h.relation == Relation::Direct);
        let text = render_context(&b);
        assert!(!text.contains("Related passages"));
    }

    #[test]
    fn test_prompt_contains_question() {
        let prompt = build_prompt("what is setup?", &bundle());
        assert!(prompt.contains("QUESTION: what is setup?"));
        assert!(prompt.contains("RETRIEVED CONTEXT"));
    }
}
