//! # Answer Synthesis
//!
//! Builds a grounded prompt from retrieved chunks, makes exactly one call to
//! the language-model oracle, and attaches a short, deduplicated source list.
//!
//! When retrieval finds nothing useful the oracle is still called: the prompt
//! tells it to say the answer is not in the documentation.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::error::SearchError;
use super::search_impl::{SearchOptions, SearchResult, search_index};
use crate::index::Database;
use crate::model::Client;
use rig::{completion::CompletionModel, embeddings::EmbeddingModel};

/// System message sent with every answer prompt
pub const ANSWER_SYSTEM_MESSAGE: &str = "You are a helpful support assistant for our product documentation.";

/// Sentence the oracle is told to use when the context does not contain the answer
pub const NOT_FOUND_ANSWER: &str = "I could not find this in the documentation.";

/// Options for answer synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOptions {
    /// Chunks retrieved as context
    pub top_k: usize,

    /// Sources attached to the answer
    pub max_sources: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_sources: 3,
        }
    }
}

/// A synthesized answer to one ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAnswer {
    pub ticket_id: String,
    pub response: String,
    pub sources: Vec<String>,
}

/// Concatenate retrieved chunk texts, separated by a blank line
pub fn prepare_rag_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| result.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_answer_prompt(query: &str, topic: &str, context: &str) -> String {
    format!(
        "A customer asked the following question:\n\n\
         Query: {query}\n\
         Topic: {topic}\n\n\
         Use only the following documentation context to answer clearly and concisely:\n\
         {context}\n\n\
         If the answer is not found in the context, say \"{NOT_FOUND_ANSWER}\".\n\
         Always cite the most relevant sources.\n\n\
         Answer:"
    )
}

/// Source URLs in retrieval order, first occurrence kept, at most `max_sources`
pub fn collect_sources(results: &[SearchResult], max_sources: usize) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if sources.len() == max_sources {
            break;
        }
        if !sources.contains(&result.metadata.source) {
            sources.push(result.metadata.source.clone());
        }
    }
    sources
}

/// Answer a ticket from the documentation index.
///
/// Oracle failures are returned as `SearchError::Oracle`; no fallback answer
/// is produced.
#[instrument(skip(db, client, query, options))]
pub async fn generate_answer<C, E>(
    db: &Database,
    client: &Client<C, E>,
    ticket_id: &str,
    topic: &str,
    query: &str,
    options: AnswerOptions,
) -> Result<TicketAnswer, SearchError>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let results = search_index(db, client, query, &SearchOptions::with_limit(options.top_k)).await?;
    let context = prepare_rag_context(&results);
    let prompt = build_answer_prompt(query, topic, &context);

    let response = client
        .invoke(&prompt, Some(ANSWER_SYSTEM_MESSAGE))
        .await
        .map_err(SearchError::Oracle)?;

    let sources = collect_sources(&results, options.max_sources);
    info!(context_chunks = results.len(), sources = sources.len(), "answer generated");

    Ok(TicketAnswer {
        ticket_id: ticket_id.to_string(),
        response: response.trim().to_string(),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkMetadata;

    fn result(source: &str, text: &str) -> SearchResult {
        SearchResult {
            chunk_id: format!("{source}#{text}"),
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                title: "t".to_string(),
                chunk_index: 0,
                word_count: 1,
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_collect_sources_dedupes_in_order() {
        let results = vec![
            result("A", "1"),
            result("B", "2"),
            result("A", "3"),
            result("C", "4"),
            result("A", "5"),
        ];
        assert_eq!(collect_sources(&results, 3), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_collect_sources_caps() {
        let results = vec![
            result("A", "1"),
            result("B", "2"),
            result("C", "3"),
            result("D", "4"),
        ];
        assert_eq!(collect_sources(&results, 3), vec!["A", "B", "C"]);
        assert!(collect_sources(&[], 3).is_empty());
    }

    #[test]
    fn test_prepare_rag_context() {
        let results = vec![result("A", "first chunk"), result("B", "second chunk")];
        assert_eq!(prepare_rag_context(&results), "first chunk\n\nsecond chunk");
        assert_eq!(prepare_rag_context(&[]), "");
    }

    #[test]
    fn test_prompt_grounds_and_instructs() {
        let prompt = build_answer_prompt("How do I enable SSO?", "SSO", "Okta setup steps");
        assert!(prompt.contains("Query: How do I enable SSO?"));
        assert!(prompt.contains("Topic: SSO"));
        assert!(prompt.contains("Okta setup steps"));
        assert!(prompt.contains(NOT_FOUND_ANSWER));
        assert!(prompt.contains("cite"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn test_answer_serializes() {
        let answer = TicketAnswer {
            ticket_id: "TICKET-1".to_string(),
            response: "Use the admin panel.".to_string(),
            sources: vec!["https://docs.example.com/".to_string()],
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["ticket_id"], "TICKET-1");
        assert_eq!(json["sources"][0], "https://docs.example.com/");
    }
}
