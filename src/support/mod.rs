//! Support-desk collaborators around the RAG core
//!
//! - `classify`: one oracle call that tags a ticket with topics, sentiment and priority
//! - `routing`: a static decision between answering with RAG and handing off to a team
//! - `triage`: classification followed by either an answer or a routing decision
//! - `live_chat`: a guarded conversation that collects enough detail to file a ticket

pub mod classify;
pub mod error;
pub mod live_chat;
pub mod routing;
pub mod triage;

pub use classify::{Priority, Sentiment, TicketCategory, TicketClassification, classify_ticket};
pub use error::SupportError;
pub use live_chat::{ChatTurn, ExtractedTicket, LiveChat, SessionStore};
pub use routing::{RAG_TOPICS, RoutingDecision, is_rag_topic, route_ticket};
pub use triage::{TriageOutcome, triage_ticket};

use serde::{Deserialize, Serialize};

/// An incoming support ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub body: String,
}

impl Ticket {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Subject and body as one query text
    pub fn text(&self) -> String {
        match (self.subject.trim(), self.body.trim()) {
            ("", body) => body.to_string(),
            (subject, "") => subject.to_string(),
            (subject, body) => format!("{subject}\n\n{body}"),
        }
    }
}

/// Strip a Markdown code fence some models wrap around JSON replies
pub(crate) fn strip_json_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_text() {
        assert_eq!(Ticket::new("1", "Subject", "Body").text(), "Subject\n\nBody");
        assert_eq!(Ticket::new("1", "", "Body only").text(), "Body only");
        assert_eq!(Ticket::new("1", "Subject only", " ").text(), "Subject only");
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_json_fence(" {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_json_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fence("```\n{}\n```"), "{}");
    }
}
