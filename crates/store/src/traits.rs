//! Store traits.
//!
//! These traits are the seam between the coordination core and persistence.
//! The in-memory implementations in [`crate::memory`] are the reference; a
//! durable backend must preserve the same query shapes and the atomicity of
//! `update_status` and the compound task operations (`delegate`,
//! `complete_review`, `resolve_review`), whose field writes must never be
//! observable half-committed.

use async_trait::async_trait;
use troika_common::{
    AgentRecord, AgentRole, AgentStatus, Message, Result, TaskRecord, TaskStatus,
    VerificationVerdict,
};

/// Storage for agent records.
///
/// Records are owned by the store; every read returns a snapshot clone.
/// `update_status` is an atomic compare-and-set against the status lattice.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn save(&self, agent: AgentRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<AgentRecord>;

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<AgentRecord>>;

    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<AgentRecord>>;

    async fn list_by_role(&self, workspace_id: &str, role: AgentRole) -> Result<Vec<AgentRecord>>;

    async fn list_by_status(
        &self,
        workspace_id: &str,
        status: AgentStatus,
    ) -> Result<Vec<AgentRecord>>;

    /// Transition an agent's status, validating the lattice under the store
    /// lock. Returns the (old, new) pair on success.
    async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
    ) -> Result<(AgentStatus, AgentStatus)>;
}

/// Storage for task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save(&self, task: TaskRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<TaskRecord>;

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<TaskRecord>>;

    async fn list_by_assignee(&self, agent_id: &str) -> Result<Vec<TaskRecord>>;

    /// Transition a task's status, validating the lattice under the store
    /// lock. Returns the (old, new) pair on success.
    async fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> Result<(TaskStatus, TaskStatus)>;

    /// Set or clear the assignee without touching status. Only valid while
    /// the status already admits an assignee (rebinding a mid-flight task).
    async fn set_assignee(&self, id: &str, agent_id: Option<String>) -> Result<()>;

    /// Assign and start a pending task in one critical section: the
    /// dependency check, the assignee write, and the Pending -> InProgress
    /// transition commit together, so no reader ever observes an assigned
    /// task that is still pending. Returns the (old, new) status pair.
    async fn delegate(&self, id: &str, agent_id: &str) -> Result<(TaskStatus, TaskStatus)>;

    /// Move an in-progress task to review and record the crafter's summary
    /// in the same critical section, so review_required is never observable
    /// without its completion summary.
    async fn complete_review(
        &self,
        id: &str,
        summary: String,
    ) -> Result<(TaskStatus, TaskStatus)>;

    /// Settle a reviewed task per the verdict in one critical section:
    /// status move(s), verdict bookkeeping, and assignee clearing commit
    /// together. Returns the lattice transitions applied, in order; a
    /// rejection traverses ReviewRequired -> NeedsFix -> Pending as a single
    /// committed hop.
    async fn resolve_review(
        &self,
        id: &str,
        verdict: VerificationVerdict,
        report: String,
    ) -> Result<Vec<(TaskStatus, TaskStatus)>>;

    /// Pending tasks whose every dependency is completed, against the current
    /// snapshot. A dependency id that does not resolve keeps the task gated.
    async fn find_ready_tasks(&self, workspace_id: &str) -> Result<Vec<TaskRecord>>;
}

/// Append-only per-agent conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, message: Message) -> Result<()>;

    async fn get_conversation(&self, agent_id: &str) -> Result<Vec<Message>>;

    async fn get_last_n(&self, agent_id: &str, n: usize) -> Result<Vec<Message>>;

    async fn get_by_turn_range(&self, agent_id: &str, from: u32, to: u32) -> Result<Vec<Message>>;

    async fn get_message_count(&self, agent_id: &str) -> Result<usize>;

    async fn delete_conversation(&self, agent_id: &str) -> Result<()>;
}
