//! Typed coordination events fanned out on the bus.
//!
//! The event-type string is derived from the variant, not from a type name,
//! so the wire vocabulary stays stable regardless of how the enum evolves.
//! Subscription filters match against these strings.

use crate::agent::AgentStatus;
use crate::message::{CompletionReport, Message};
use crate::task::TaskStatus;
use serde::{Deserialize, Serialize};

/// An event observed on the coordination bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    AgentCreated {
        agent_id: String,
        workspace_id: String,
        parent_id: Option<String>,
    },
    AgentStatusChanged {
        agent_id: String,
        old: AgentStatus,
        new: AgentStatus,
    },
    AgentCompleted {
        agent_id: String,
        parent_id: String,
        report: CompletionReport,
    },
    MessageReceived {
        from: String,
        to: String,
        message: Message,
    },
    TaskStatusChanged {
        task_id: String,
        old: TaskStatus,
        new: TaskStatus,
    },
    TaskDelegated {
        task_id: String,
        agent_id: String,
        delegated_by: String,
    },
}

impl AgentEvent {
    /// The normative event-type string used by subscription filters.
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::AgentCreated { .. } => "agent:created",
            AgentEvent::AgentStatusChanged { .. } => "agent:status_changed",
            AgentEvent::AgentCompleted { .. } => "agent:completed",
            AgentEvent::MessageReceived { .. } => "agent:message",
            AgentEvent::TaskStatusChanged { .. } => "task:status_changed",
            AgentEvent::TaskDelegated { .. } => "task:delegated",
        }
    }

    /// Agent that caused the event, used for self-exclusion filtering.
    /// Task status changes have no single actor.
    pub fn actor(&self) -> Option<&str> {
        match self {
            AgentEvent::AgentCreated { agent_id, .. } => Some(agent_id),
            AgentEvent::AgentStatusChanged { agent_id, .. } => Some(agent_id),
            AgentEvent::AgentCompleted { agent_id, .. } => Some(agent_id),
            AgentEvent::MessageReceived { from, .. } => Some(from),
            AgentEvent::TaskStatusChanged { .. } => None,
            AgentEvent::TaskDelegated { delegated_by, .. } => Some(delegated_by),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_completed() -> AgentEvent {
        AgentEvent::AgentCompleted {
            agent_id: "agent_c".into(),
            parent_id: "agent_r".into(),
            report: CompletionReport::new("agent_c", "task_1", "done", true),
        }
    }

    #[test]
    fn event_type_strings() {
        let e = AgentEvent::AgentCreated {
            agent_id: "a".into(),
            workspace_id: "ws".into(),
            parent_id: None,
        };
        assert_eq!(e.event_type(), "agent:created");
        assert_eq!(sample_completed().event_type(), "agent:completed");

        let e = AgentEvent::TaskDelegated {
            task_id: "t".into(),
            agent_id: "a".into(),
            delegated_by: "r".into(),
        };
        assert_eq!(e.event_type(), "task:delegated");
    }

    #[test]
    fn actor_derivation() {
        assert_eq!(sample_completed().actor(), Some("agent_c"));

        let e = AgentEvent::TaskDelegated {
            task_id: "t".into(),
            agent_id: "a".into(),
            delegated_by: "r".into(),
        };
        assert_eq!(e.actor(), Some("r"));

        let e = AgentEvent::TaskStatusChanged {
            task_id: "t".into(),
            old: TaskStatus::Pending,
            new: TaskStatus::InProgress,
        };
        assert_eq!(e.actor(), None);

        let e = AgentEvent::MessageReceived {
            from: "a1".into(),
            to: "a2".into(),
            message: Message::from_agent("a2", "a1", "hi"),
        };
        assert_eq!(e.actor(), Some("a1"));
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_completed()).unwrap();
        assert!(json.contains("\"type\":\"agent_completed\""));
    }
}
