//! Ticket classification through a single oracle call

use std::fmt;

use rig::{completion::CompletionModel, embeddings::EmbeddingModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::SupportError;
use super::{Ticket, strip_json_fence};
use crate::model::Client;

/// Topic tags the classifier may choose from
pub const TOPIC_TAGS: [&str; 9] = [
    "How-to",
    "Product",
    "API/SDK",
    "Connector",
    "Lineage",
    "SSO",
    "Glossary",
    "Best practices",
    "Sensitive data",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Frustrated,
    Curious,
    Angry,
    Neutral,
}

/// Urgency of a ticket. Accepts labels such as `"P0 (High)"` when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        let code: String = label.trim().chars().take(2).collect();
        match code.to_ascii_uppercase().as_str() {
            "P0" => Ok(Priority::P0),
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            _ => Err(format!("unknown priority '{label}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::P0 => "P0 (High)",
            Priority::P1 => "P1 (Medium)",
            Priority::P2 => "P2 (Low)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCategory {
    #[serde(default)]
    pub topic_tags: Vec<String>,
    pub sentiment: Sentiment,
    pub priority: Priority,
}

impl TicketCategory {
    /// First topic tag, or an empty string when the classifier chose none
    pub fn primary_topic(&self) -> &str {
        self.topic_tags.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClassification {
    pub id: String,
    pub category: TicketCategory,
}

pub fn classification_prompt(ticket: &Ticket) -> String {
    format!(
        "You are an AI agent for a helpdesk application.\n\
         Given a ticket (subject and body), analyze it and return ONLY a JSON object with:\n\n\
         {{\n  \
           \"topic_tags\": [ ... ],   // choose from: {topics}.\n  \
           \"sentiment\": \"...\",      // choose from: Frustrated, Curious, Angry, Neutral\n  \
           \"priority\": \"...\"        // choose from: P0 (High), P1 (Medium), P2 (Low)\n\
         }}\n\n\
         Ticket Subject: {subject}\n\
         Ticket Body: {body}\n\n\
         Rules:\n\
         - Output valid JSON only (no text around it).\n\
         - Choose 1 or 2 most relevant topic tags.\n\
         - Priority reflects urgency implied in the ticket.",
        topics = TOPIC_TAGS.join(", "),
        subject = ticket.subject,
        body = ticket.body,
    )
}

/// Parse the classifier's JSON reply
pub fn parse_classification(reply: &str) -> Result<TicketCategory, SupportError> {
    serde_json::from_str(strip_json_fence(reply)).map_err(|e| SupportError::MalformedReply {
        expected: "classification",
        message: format!("{e}: {reply}"),
    })
}

/// Classify a ticket by topic, sentiment and priority
#[instrument(skip_all, fields(ticket_id = %ticket.id))]
pub async fn classify_ticket<C, E>(
    client: &Client<C, E>,
    ticket: &Ticket,
) -> Result<TicketClassification, SupportError>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    let reply = client.invoke(&classification_prompt(ticket), None).await?;
    let category = parse_classification(&reply).inspect_err(|e| warn!(error = %e, "classifier reply rejected"))?;
    debug!(topics = ?category.topic_tags, priority = %category.priority, "ticket classified");
    Ok(TicketClassification {
        id: ticket.id.clone(),
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};

    fn client() -> Client<MockCompletionModel, MockEmbeddingModel> {
        Client::from_models(
            MockCompletionModel::new(),
            MockEmbeddingModel::with_vocabulary(["sso"]),
            "mock-embedding",
        )
    }

    #[test]
    fn test_priority_accepts_labels() {
        let category = parse_classification(
            r#"{"topic_tags": ["SSO"], "sentiment": "Frustrated", "priority": "P0 (High)"}"#,
        )
        .unwrap();
        assert_eq!(category.priority, Priority::P0);
        assert_eq!(category.sentiment, Sentiment::Frustrated);
        assert_eq!(category.primary_topic(), "SSO");

        assert_eq!(Priority::try_from("p2".to_string()), Ok(Priority::P2));
        assert!(Priority::try_from("High".to_string()).is_err());
        assert_eq!(Priority::P1.to_string(), "P1 (Medium)");
    }

    #[test]
    fn test_missing_topics_default_to_empty() {
        let category =
            parse_classification(r#"{"sentiment": "Neutral", "priority": "P2"}"#).unwrap();
        assert!(category.topic_tags.is_empty());
        assert_eq!(category.primary_topic(), "");
    }

    #[test]
    fn test_malformed_reply_is_an_error() {
        let result = parse_classification("Sure! This ticket is about SSO.");
        assert!(matches!(
            result,
            Err(SupportError::MalformedReply {
                expected: "classification",
                ..
            })
        ));
        assert!(parse_classification(r#"{"sentiment": "Happy", "priority": "P1"}"#).is_err());
    }

    #[test]
    fn test_prompt_contains_ticket() {
        let prompt = classification_prompt(&Ticket::new("T-1", "Login broken", "SAML fails"));
        assert!(prompt.contains("Ticket Subject: Login broken"));
        assert!(prompt.contains("Ticket Body: SAML fails"));
        assert!(prompt.contains("Sensitive data"));
    }

    #[tokio::test]
    async fn test_classify_ticket() {
        let client = client();
        client
            .completion()
            .set_text_response(
                "```json\n{\"topic_tags\": [\"Connector\", \"Lineage\"], \"sentiment\": \"Curious\", \"priority\": \"P1 (Medium)\"}\n```",
            )
            .await;

        let result = classify_ticket(&client, &Ticket::new("T-2", "Snowflake", "Which permissions?"))
            .await
            .unwrap();
        assert_eq!(result.id, "T-2");
        assert_eq!(result.category.topic_tags, vec!["Connector", "Lineage"]);
        assert_eq!(result.category.priority, Priority::P1);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"]["priority"], "P1");
    }

    #[tokio::test]
    async fn test_classify_surfaces_oracle_failure() {
        let client = client();
        client.completion().set_error("429 Too Many Requests").await;
        let result = classify_ticket(&client, &Ticket::new("T-3", "a", "b")).await;
        assert!(matches!(result, Err(SupportError::Oracle(_))));
    }
}
