//! Classification followed by either a RAG answer or a routing decision

use rig::{completion::CompletionModel, embeddings::EmbeddingModel};
use serde::Serialize;
use tracing::{info, instrument};

use super::Ticket;
use super::classify::{TicketClassification, classify_ticket};
use super::error::SupportError;
use super::routing::{RoutingDecision, is_rag_topic, route_ticket};
use crate::search::{AnswerOptions, SearchSystem, TicketAnswer};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriageOutcome {
    /// The primary topic is in RAG scope and was answered from the documentation
    Answered {
        classification: TicketClassification,
        answer: TicketAnswer,
    },

    /// The ticket was handed to a team
    Routed {
        classification: TicketClassification,
        routing: RoutingDecision,
    },
}

impl TriageOutcome {
    pub fn classification(&self) -> &TicketClassification {
        match self {
            TriageOutcome::Answered { classification, .. } => classification,
            TriageOutcome::Routed { classification, .. } => classification,
        }
    }
}

/// Classify a ticket, then answer it or route it based on its first topic tag
#[instrument(skip_all, fields(ticket_id = %ticket.id))]
pub async fn triage_ticket<C, E>(
    system: &SearchSystem<C, E>,
    ticket: &Ticket,
    options: AnswerOptions,
) -> Result<TriageOutcome, SupportError>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let classification = classify_ticket(system.client(), ticket).await?;
    let topic = classification.category.primary_topic().to_string();

    if is_rag_topic(&topic) {
        info!(%topic, "answering from documentation");
        let answer = system
            .answer(&ticket.id, &topic, &ticket.text(), options)
            .await?;
        Ok(TriageOutcome::Answered {
            classification,
            answer,
        })
    } else {
        info!(%topic, "routing to team");
        let routing = route_ticket(&ticket.id, &topic);
        Ok(TriageOutcome::Routed {
            classification,
            routing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Database, EmbeddingSpace};
    use crate::model::Client;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};
    use tempfile::TempDir;

    async fn system() -> (SearchSystem<MockCompletionModel, MockEmbeddingModel>, TempDir) {
        let client = Client::from_models(
            MockCompletionModel::new(),
            MockEmbeddingModel::with_vocabulary(["sso"]),
            "mock-embedding",
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db").to_string_lossy().to_string();
        let db = Database::new_from_path(&path, EmbeddingSpace::new("mock-embedding", 2))
            .await
            .unwrap();
        (SearchSystem::new(db, client), dir)
    }

    #[tokio::test]
    async fn test_rag_topic_is_answered() {
        let (system, _dir) = system().await;
        let completion = system.client().completion();
        completion
            .queue_text_response(r#"{"topic_tags": ["SSO", "Connector"], "sentiment": "Curious", "priority": "P2"}"#)
            .await;
        completion
            .queue_text_response("I could not find this in the documentation.")
            .await;

        let outcome = triage_ticket(
            &system,
            &Ticket::new("T-9", "SSO setup", "How do I enable SSO?"),
            AnswerOptions::default(),
        )
        .await
        .unwrap();

        match &outcome {
            TriageOutcome::Answered { answer, .. } => {
                assert_eq!(answer.ticket_id, "T-9");
                assert_eq!(answer.response, "I could not find this in the documentation.");
                // Empty index, so nothing to cite
                assert!(answer.sources.is_empty());
            }
            other => panic!("expected an answer, got {other:?}"),
        }
        assert_eq!(completion.call_count(), 2);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "answered");
    }

    #[tokio::test]
    async fn test_other_topic_is_routed_without_answer_call() {
        let (system, _dir) = system().await;
        let completion = system.client().completion();
        completion
            .set_text_response(r#"{"topic_tags": ["Lineage"], "sentiment": "Angry", "priority": "P0 (High)"}"#)
            .await;

        let outcome = triage_ticket(
            &system,
            &Ticket::new("T-10", "Lineage missing", "Where did it go?"),
            AnswerOptions::default(),
        )
        .await
        .unwrap();

        match outcome {
            TriageOutcome::Routed { routing, classification } => {
                assert!(!routing.handled_by_rag);
                assert!(routing.routing_message.contains("'Lineage'"));
                assert_eq!(classification.category.primary_topic(), "Lineage");
            }
            other => panic!("expected routing, got {other:?}"),
        }
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_topic_is_routed() {
        let (system, _dir) = system().await;
        system
            .client()
            .completion()
            .set_text_response(r#"{"topic_tags": [], "sentiment": "Neutral", "priority": "P2"}"#)
            .await;

        let outcome = triage_ticket(&system, &Ticket::new("T-11", "hi", ""), AnswerOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, TriageOutcome::Routed { .. }));
    }
}
