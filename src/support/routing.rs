//! Static routing between the RAG answerer and human teams

use serde::{Deserialize, Serialize};

/// Topics answered from the documentation index
pub const RAG_TOPICS: [&str; 5] = ["How-to", "Product", "Best practices", "API/SDK", "SSO"];

pub fn is_rag_topic(topic: &str) -> bool {
    RAG_TOPICS.contains(&topic)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub ticket_id: String,
    pub routing_message: String,
    pub handled_by_rag: bool,
}

/// Decide who handles a ticket from its topic. Pure; no I/O.
pub fn route_ticket(ticket_id: &str, topic: &str) -> RoutingDecision {
    let handled_by_rag = is_rag_topic(topic);
    let routing_message = if handled_by_rag {
        format!("This ticket belongs to RAG scope ('{topic}'), so it will be answered by the RAG agent.")
    } else {
        format!("This ticket has been classified as a '{topic}' issue and routed to the appropriate team.")
    };
    RoutingDecision {
        ticket_id: ticket_id.to_string(),
        routing_message,
        handled_by_rag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_topics_stay_in_scope() {
        for topic in RAG_TOPICS {
            let decision = route_ticket("T-1", topic);
            assert!(decision.handled_by_rag);
            assert!(decision.routing_message.contains("RAG scope"));
        }
    }

    #[test]
    fn test_other_topics_are_routed() {
        let decision = route_ticket("T-245", "Connector");
        assert_eq!(decision.ticket_id, "T-245");
        assert!(!decision.handled_by_rag);
        assert_eq!(
            decision.routing_message,
            "This ticket has been classified as a 'Connector' issue and routed to the appropriate team."
        );

        // Membership is exact
        assert!(!is_rag_topic("sso"));
        assert!(!is_rag_topic(""));
    }
}
