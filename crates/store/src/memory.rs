//! In-memory reference stores.
//!
//! Each store is a `RwLock<HashMap>`. Compound task mutations (delegation,
//! review completion, verdict resolution) run inside a single write-lock
//! scope, so a reader never observes a half-committed record.

use crate::traits::{AgentStore, ConversationStore, TaskStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use troika_common::{
    AgentRecord, AgentRole, AgentStatus, Message, Result, TaskRecord, TaskStatus, TroikaError,
    VerificationVerdict, now_millis,
};

/// In-memory agent store.
#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: RwLock<HashMap<String, AgentRecord>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn save(&self, agent: AgentRecord) -> Result<()> {
        debug!(agent_id = %agent.id, role = %agent.role, "Saving agent");
        self.agents.write().await.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<AgentRecord> {
        self.agents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TroikaError::not_found("agent", id))
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<AgentRecord>> {
        let agents = self.agents.read().await;
        let mut found: Vec<AgentRecord> = agents
            .values()
            .filter(|a| a.workspace_id == workspace_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn list_by_parent(&self, parent_id: &str) -> Result<Vec<AgentRecord>> {
        let agents = self.agents.read().await;
        let mut found: Vec<AgentRecord> = agents
            .values()
            .filter(|a| a.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn list_by_role(&self, workspace_id: &str, role: AgentRole) -> Result<Vec<AgentRecord>> {
        let agents = self.agents.read().await;
        let mut found: Vec<AgentRecord> = agents
            .values()
            .filter(|a| a.workspace_id == workspace_id && a.role == role)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn list_by_status(
        &self,
        workspace_id: &str,
        status: AgentStatus,
    ) -> Result<Vec<AgentRecord>> {
        let agents = self.agents.read().await;
        let mut found: Vec<AgentRecord> = agents
            .values()
            .filter(|a| a.workspace_id == workspace_id && a.status == status)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn update_status(
        &self,
        id: &str,
        status: AgentStatus,
    ) -> Result<(AgentStatus, AgentStatus)> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("agent", id))?;

        let old = agent.status;
        if !old.can_transition(status) {
            return Err(TroikaError::IllegalTransition {
                entity: "agent",
                from: old.to_string(),
                to: status.to_string(),
            });
        }
        agent.status = status;
        agent.updated_at = now_millis();
        debug!(agent_id = %id, old = %old, new = %status, "Agent status changed");
        Ok((old, status))
    }
}

/// In-memory task store.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: TaskRecord) -> Result<()> {
        debug!(task_id = %task.id, title = %task.title, "Saving task");
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<TaskRecord> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TroikaError::not_found("task", id))
    }

    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<TaskRecord>> {
        let tasks = self.tasks.read().await;
        let mut found: Vec<TaskRecord> = tasks
            .values()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn list_by_assignee(&self, agent_id: &str) -> Result<Vec<TaskRecord>> {
        let tasks = self.tasks.read().await;
        let mut found: Vec<TaskRecord> = tasks
            .values()
            .filter(|t| t.assigned_to.as_deref() == Some(agent_id))
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> Result<(TaskStatus, TaskStatus)> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("task", id))?;

        let old = task.status;
        if !old.can_transition(status) {
            return Err(TroikaError::IllegalTransition {
                entity: "task",
                from: old.to_string(),
                to: status.to_string(),
            });
        }
        task.status = status;
        task.updated_at = now_millis();
        debug!(task_id = %id, old = %old, new = %status, "Task status changed");
        Ok((old, status))
    }

    async fn set_assignee(&self, id: &str, agent_id: Option<String>) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("task", id))?;
        task.assigned_to = agent_id;
        task.updated_at = now_millis();
        Ok(())
    }

    async fn delegate(&self, id: &str, agent_id: &str) -> Result<(TaskStatus, TaskStatus)> {
        let mut tasks = self.tasks.write().await;
        {
            let task = tasks
                .get(id)
                .ok_or_else(|| TroikaError::not_found("task", id))?;
            if task.status != TaskStatus::Pending {
                return Err(TroikaError::IllegalTransition {
                    entity: "task",
                    from: task.status.to_string(),
                    to: TaskStatus::InProgress.to_string(),
                });
            }
            for dep in &task.dependencies {
                match tasks.get(dep) {
                    Some(d) if d.status == TaskStatus::Completed => {}
                    Some(d) => {
                        return Err(TroikaError::Contract(format!(
                            "task {id} is not ready: dependency {dep} is {}",
                            d.status
                        )));
                    }
                    None => {
                        return Err(TroikaError::Contract(format!(
                            "task {id} is not ready: dependency {dep} does not resolve"
                        )));
                    }
                }
            }
        }
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("task", id))?;
        let old = task.status;
        task.status = TaskStatus::InProgress;
        task.assigned_to = Some(agent_id.to_string());
        task.updated_at = now_millis();
        debug!(task_id = %id, agent_id = %agent_id, "Task delegated in store");
        Ok((old, TaskStatus::InProgress))
    }

    async fn complete_review(
        &self,
        id: &str,
        summary: String,
    ) -> Result<(TaskStatus, TaskStatus)> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("task", id))?;
        let old = task.status;
        if !old.can_transition(TaskStatus::ReviewRequired) {
            return Err(TroikaError::IllegalTransition {
                entity: "task",
                from: old.to_string(),
                to: TaskStatus::ReviewRequired.to_string(),
            });
        }
        task.status = TaskStatus::ReviewRequired;
        task.completion_summary = Some(summary);
        task.updated_at = now_millis();
        debug!(task_id = %id, "Task moved to review");
        Ok((old, TaskStatus::ReviewRequired))
    }

    async fn resolve_review(
        &self,
        id: &str,
        verdict: VerificationVerdict,
        report: String,
    ) -> Result<Vec<(TaskStatus, TaskStatus)>> {
        let transitions = match verdict {
            VerificationVerdict::Approved => {
                vec![(TaskStatus::ReviewRequired, TaskStatus::Completed)]
            }
            VerificationVerdict::NotApproved => vec![
                (TaskStatus::ReviewRequired, TaskStatus::NeedsFix),
                (TaskStatus::NeedsFix, TaskStatus::Pending),
            ],
            VerificationVerdict::Blocked => {
                vec![(TaskStatus::ReviewRequired, TaskStatus::Blocked)]
            }
        };

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TroikaError::not_found("task", id))?;
        if task.status != TaskStatus::ReviewRequired {
            return Err(TroikaError::IllegalTransition {
                entity: "task",
                from: task.status.to_string(),
                to: transitions[0].1.to_string(),
            });
        }
        task.status = transitions[transitions.len() - 1].1;
        task.assigned_to = None;
        task.verification_verdict = Some(verdict);
        task.verification_report = Some(report);
        task.updated_at = now_millis();
        debug!(task_id = %id, verdict = ?verdict, "Review resolved");
        Ok(transitions)
    }

    async fn find_ready_tasks(&self, workspace_id: &str) -> Result<Vec<TaskRecord>> {
        let tasks = self.tasks.read().await;
        let mut ready: Vec<TaskRecord> = tasks
            .values()
            .filter(|t| t.workspace_id == workspace_id && t.status == TaskStatus::Pending)
            .filter(|t| {
                t.dependencies.iter().all(|dep| {
                    tasks
                        .get(dep)
                        .map(|d| d.status == TaskStatus::Completed)
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect();
        ready.sort_by_key(|t| t.created_at);
        Ok(ready)
    }
}

/// In-memory conversation store. Appends preserve per-agent insertion order.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: Message) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(message.agent_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn get_conversation(&self, agent_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .conversations
            .read()
            .await
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_last_n(&self, agent_id: &str, n: usize) -> Result<Vec<Message>> {
        let conversations = self.conversations.read().await;
        let messages = conversations.get(agent_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = messages.len().saturating_sub(n);
        Ok(messages[start..].to_vec())
    }

    async fn get_by_turn_range(&self, agent_id: &str, from: u32, to: u32) -> Result<Vec<Message>> {
        let conversations = self.conversations.read().await;
        let messages = conversations.get(agent_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(messages
            .iter()
            .filter(|m| m.turn.map(|t| t >= from && t <= to).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn get_message_count(&self, agent_id: &str) -> Result<usize> {
        Ok(self
            .conversations
            .read()
            .await
            .get(agent_id)
            .map(Vec::len)
            .unwrap_or(0))
    }

    async fn delete_conversation(&self, agent_id: &str) -> Result<()> {
        self.conversations.write().await.remove(agent_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troika_common::AgentRole;

    #[tokio::test]
    async fn agent_cas_rejects_illegal_transition() {
        let store = InMemoryAgentStore::new();
        let agent = AgentRecord::new("ws", AgentRole::Crafter, "c1");
        let id = agent.id.clone();
        store.save(agent).await.unwrap();

        // Pending -> Completed skips Active
        let err = store
            .update_status(&id, AgentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, TroikaError::IllegalTransition { .. }));

        store.update_status(&id, AgentStatus::Active).await.unwrap();
        let (old, new) = store
            .update_status(&id, AgentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(old, AgentStatus::Active);
        assert_eq!(new, AgentStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = InMemoryAgentStore::new();
        assert!(matches!(
            store.get("nope").await.unwrap_err(),
            TroikaError::NotFound { .. }
        ));

        let tasks = InMemoryTaskStore::new();
        assert!(matches!(
            tasks.update_status("nope", TaskStatus::InProgress).await.unwrap_err(),
            TroikaError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn conversation_append_preserves_order() {
        let store = InMemoryConversationStore::new();
        for i in 0..5 {
            store
                .append(Message::system("a1", format!("msg {i}")).with_turn(i))
                .await
                .unwrap();
        }

        let all = store.get_conversation("a1").await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "msg 0");
        assert_eq!(all[4].content, "msg 4");

        let tail = store.get_last_n("a1", 2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "msg 3");

        let ranged = store.get_by_turn_range("a1", 1, 3).await.unwrap();
        assert_eq!(ranged.len(), 3);

        assert_eq!(store.get_message_count("a1").await.unwrap(), 5);
        store.delete_conversation("a1").await.unwrap();
        assert_eq!(store.get_message_count("a1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn last_n_larger_than_log_returns_all() {
        let store = InMemoryConversationStore::new();
        store.append(Message::system("a1", "only")).await.unwrap();
        let tail = store.get_last_n("a1", 20).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn delegate_commits_status_and_assignee_together() {
        let store = InMemoryTaskStore::new();
        let mut task = TaskRecord::new("Gated");
        task.workspace_id = "ws".into();
        let id = task.id.clone();
        store.save(task).await.unwrap();

        let (old, new) = store.delegate(&id, "agent_c").await.unwrap();
        assert_eq!(old, TaskStatus::Pending);
        assert_eq!(new, TaskStatus::InProgress);

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assigned_to.as_deref(), Some("agent_c"));

        // Not pending anymore: a second delegation is an illegal transition.
        let err = store.delegate(&id, "agent_d").await.unwrap_err();
        assert!(matches!(err, TroikaError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn delegate_rejects_unready_dependencies() {
        let store = InMemoryTaskStore::new();
        let mut dep = TaskRecord::new("Dep");
        dep.workspace_id = "ws".into();
        let dep_id = dep.id.clone();
        store.save(dep).await.unwrap();

        let mut task = TaskRecord::new("Gated").with_dependency(&dep_id);
        task.workspace_id = "ws".into();
        let id = task.id.clone();
        store.save(task).await.unwrap();

        let err = store.delegate(&id, "agent_c").await.unwrap_err();
        assert!(err.to_string().contains("not ready"));

        let mut orphan = TaskRecord::new("Orphan").with_dependency("task_missing");
        orphan.workspace_id = "ws".into();
        let orphan_id = orphan.id.clone();
        store.save(orphan).await.unwrap();
        let err = store.delegate(&orphan_id, "agent_c").await.unwrap_err();
        assert!(err.to_string().contains("does not resolve"));
    }

    #[tokio::test]
    async fn complete_review_sets_summary_with_status() {
        let store = InMemoryTaskStore::new();
        let mut task = TaskRecord::new("Reviewed");
        task.workspace_id = "ws".into();
        let id = task.id.clone();
        store.save(task).await.unwrap();

        // Still pending: review completion is illegal.
        assert!(matches!(
            store.complete_review(&id, "done".into()).await.unwrap_err(),
            TroikaError::IllegalTransition { .. }
        ));

        store.delegate(&id, "agent_c").await.unwrap();
        let (old, new) = store.complete_review(&id, "done".into()).await.unwrap();
        assert_eq!(old, TaskStatus::InProgress);
        assert_eq!(new, TaskStatus::ReviewRequired);

        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::ReviewRequired);
        assert_eq!(task.completion_summary.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn resolve_review_applies_verdicts() {
        let store = InMemoryTaskStore::new();

        let new_task = || {
            let mut task = TaskRecord::new("Judged");
            task.workspace_id = "ws".into();
            let id = task.id.clone();
            (task, id)
        };

        // Approved: one transition, assignee cleared, verdict recorded.
        let (task, id) = new_task();
        store.save(task).await.unwrap();
        store.delegate(&id, "agent_c").await.unwrap();
        store.complete_review(&id, "done".into()).await.unwrap();
        let transitions = store
            .resolve_review(&id, VerificationVerdict::Approved, "APPROVED".into())
            .await
            .unwrap();
        assert_eq!(
            transitions,
            vec![(TaskStatus::ReviewRequired, TaskStatus::Completed)]
        );
        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.assigned_to.is_none());
        assert_eq!(task.verification_verdict, Some(VerificationVerdict::Approved));

        // Rejected: the back-edge is one committed hop through needs_fix.
        let (task, id) = new_task();
        store.save(task).await.unwrap();
        store.delegate(&id, "agent_c").await.unwrap();
        store.complete_review(&id, "done".into()).await.unwrap();
        let transitions = store
            .resolve_review(&id, VerificationVerdict::NotApproved, "NOT APPROVED".into())
            .await
            .unwrap();
        assert_eq!(
            transitions,
            vec![
                (TaskStatus::ReviewRequired, TaskStatus::NeedsFix),
                (TaskStatus::NeedsFix, TaskStatus::Pending),
            ]
        );
        let task = store.get(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_to.is_none());

        // Blocked: sink for the wave.
        let (task, id) = new_task();
        store.save(task).await.unwrap();
        store.delegate(&id, "agent_c").await.unwrap();
        store.complete_review(&id, "??".into()).await.unwrap();
        let transitions = store
            .resolve_review(&id, VerificationVerdict::Blocked, "no marker".into())
            .await
            .unwrap();
        assert_eq!(
            transitions,
            vec![(TaskStatus::ReviewRequired, TaskStatus::Blocked)]
        );
        assert_eq!(store.get(&id).await.unwrap().status, TaskStatus::Blocked);

        // Resolving a task that is not under review is illegal.
        let (task, id) = new_task();
        store.save(task).await.unwrap();
        assert!(matches!(
            store
                .resolve_review(&id, VerificationVerdict::Approved, "APPROVED".into())
                .await
                .unwrap_err(),
            TroikaError::IllegalTransition { .. }
        ));
    }
}
