//! Agent records and lifecycle for the three-role pipeline.

use crate::ids::{new_id, now_millis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an agent in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Coordinator: plans, issues task blocks, never edits files.
    Routa,
    /// Implementor: consumes a task, produces a completion report.
    Crafter,
    /// Verifier: approves or rejects a completed wave.
    Gate,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Routa => "routa",
            AgentRole::Crafter => "crafter",
            AgentRole::Gate => "gate",
        }
    }

    /// Default model tier for the role. Planning and verification want the
    /// smarter tier; implementors favor throughput.
    pub fn default_tier(&self) -> ModelTier {
        match self {
            AgentRole::Routa | AgentRole::Gate => ModelTier::Smart,
            AgentRole::Crafter => ModelTier::Fast,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model tier an agent runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Smart,
    Fast,
}

/// Lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Active,
    Completed,
    Error,
    Cancelled,
}

impl AgentStatus {
    /// Status lattice: Pending -> Active -> {Completed | Error | Cancelled}.
    /// Terminal states admit no further transitions.
    pub fn can_transition(&self, to: AgentStatus) -> bool {
        use AgentStatus::*;
        matches!(
            (self, to),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Active, Completed)
                | (Active, Error)
                | (Active, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Error | AgentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Active => "active",
            AgentStatus::Completed => "completed",
            AgentStatus::Error => "error",
            AgentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A coordinated agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Unique agent ID
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Role in the pipeline
    pub role: AgentRole,

    /// Model tier this agent runs on
    pub model_tier: ModelTier,

    /// Workspace this agent belongs to
    pub workspace_id: String,

    /// Agent that created this one (None only for the Routa)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Current lifecycle status
    pub status: AgentStatus,

    /// Creation timestamp (Unix millis)
    pub created_at: u64,

    /// Last update timestamp
    pub updated_at: u64,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl AgentRecord {
    pub fn new(workspace_id: impl Into<String>, role: AgentRole, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id("agent"),
            name: name.into(),
            role,
            model_tier: role.default_tier(),
            workspace_id: workspace_id.into(),
            parent_id: None,
            status: AgentStatus::Pending,
            created_at: now,
            updated_at: now,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.model_tier = tier;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_forward_edges_only() {
        use AgentStatus::*;
        assert!(Pending.can_transition(Active));
        assert!(Active.can_transition(Completed));
        assert!(Active.can_transition(Error));
        assert!(Active.can_transition(Cancelled));

        assert!(!Active.can_transition(Pending));
        assert!(!Completed.can_transition(Active));
        assert!(!Error.can_transition(Active));
        assert!(!Pending.can_transition(Completed));
    }

    #[test]
    fn terminal_states() {
        assert!(AgentStatus::Completed.is_terminal());
        assert!(AgentStatus::Error.is_terminal());
        assert!(AgentStatus::Cancelled.is_terminal());
        assert!(!AgentStatus::Pending.is_terminal());
        assert!(!AgentStatus::Active.is_terminal());
    }

    #[test]
    fn default_tiers_by_role() {
        assert_eq!(AgentRole::Routa.default_tier(), ModelTier::Smart);
        assert_eq!(AgentRole::Gate.default_tier(), ModelTier::Smart);
        assert_eq!(AgentRole::Crafter.default_tier(), ModelTier::Fast);
    }

    #[test]
    fn record_builder() {
        let agent = AgentRecord::new("ws1", AgentRole::Crafter, "crafter-1").with_parent("agent_p");
        assert_eq!(agent.workspace_id, "ws1");
        assert_eq!(agent.status, AgentStatus::Pending);
        assert_eq!(agent.parent_id.as_deref(), Some("agent_p"));
        assert_eq!(agent.model_tier, ModelTier::Fast);
    }
}
