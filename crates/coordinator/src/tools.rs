//! The agent-facing coordination tool surface.
//!
//! Tools are the only legitimate way agent executions mutate the stores.
//! Every tool returns a uniform [`ToolResult`]; expected failures are values,
//! never errors. Each mutating tool commits its store mutation through the
//! store's compare-and-set discipline and then emits the corresponding
//! events, so an observer only ever sees committed state.

use crate::bus::EventBus;
use crate::subscriptions::SubscriptionService;
use std::sync::Arc;
use tracing::{debug, info, warn};
use troika_common::{
    AgentEvent, AgentRecord, AgentRole, AgentStatus, CompletionReport, Message, ModelTier,
    TaskStatus,
};
use troika_store::{AgentStore, ConversationStore, TaskStore};

/// Uniform result of a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub data: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: String::new(),
            error: Some(error.into()),
        }
    }
}

/// The tool surface handed to agent executions.
pub struct AgentTools {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    conversations: Arc<dyn ConversationStore>,
    bus: Arc<EventBus>,
    subscriptions: Arc<SubscriptionService>,
}

impl AgentTools {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        conversations: Arc<dyn ConversationStore>,
        bus: Arc<EventBus>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            agents,
            tasks,
            conversations,
            bus,
            subscriptions,
        }
    }

    /// Roster of agents in the workspace. An unknown workspace is an empty
    /// roster, not an error.
    pub async fn list_agents(&self, workspace_id: &str) -> ToolResult {
        match self.agents.list_by_workspace(workspace_id).await {
            Ok(agents) => {
                let mut table = String::from("id | name | role | status\n");
                for agent in &agents {
                    table.push_str(&format!(
                        "{} | {} | {} | {}\n",
                        agent.id, agent.name, agent.role, agent.status
                    ));
                }
                ToolResult::ok(table)
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    pub async fn get_agent_status(&self, agent_id: &str) -> ToolResult {
        match self.agents.get(agent_id).await {
            Ok(agent) => ToolResult::ok(format!("{} ({})", agent.status, agent.role)),
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    /// Compact digest: role, status, assigned task, last few messages.
    pub async fn get_agent_summary(&self, agent_id: &str) -> ToolResult {
        let agent = match self.agents.get(agent_id).await {
            Ok(agent) => agent,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        let assigned = self
            .tasks
            .list_by_assignee(agent_id)
            .await
            .unwrap_or_default();
        let task_line = assigned
            .first()
            .map(|t| format!("{} [{}]", t.title, t.status))
            .unwrap_or_else(|| "none".to_string());

        let tail = self
            .conversations
            .get_last_n(agent_id, 5)
            .await
            .unwrap_or_default();

        let mut summary = format!(
            "{} ({}), status {}\nassigned task: {}\n",
            agent.name, agent.role, agent.status, task_line
        );
        for message in &tail {
            let snippet: String = message.content.chars().take(80).collect();
            summary.push_str(&format!("  [{:?}] {}\n", message.role, snippet));
        }
        ToolResult::ok(summary)
    }

    /// Full or turn-ranged transcript. Gate agents use this for cross-agent
    /// audit; any agent id is readable.
    pub async fn read_agent_conversation(
        &self,
        agent_id: &str,
        turn_range: Option<(u32, u32)>,
    ) -> ToolResult {
        if let Err(e) = self.agents.get(agent_id).await {
            return ToolResult::fail(e.to_string());
        }

        let messages = match turn_range {
            Some((from, to)) => self.conversations.get_by_turn_range(agent_id, from, to).await,
            None => self.conversations.get_conversation(agent_id).await,
        };

        match messages {
            Ok(messages) => {
                let mut text = String::new();
                for message in &messages {
                    let from = message.from_agent_id.as_deref().unwrap_or("-");
                    text.push_str(&format!("[{:?} {}] {}\n", message.role, from, message.content));
                }
                ToolResult::ok(text)
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    /// Create an agent and activate it. Exactly one Routa may exist per
    /// workspace; every Crafter and Gate needs a resolvable parent.
    pub async fn create_agent(
        &self,
        workspace_id: &str,
        role: AgentRole,
        name: Option<String>,
        parent_id: Option<&str>,
        tier: Option<ModelTier>,
    ) -> ToolResult {
        if role == AgentRole::Routa {
            match self.agents.list_by_role(workspace_id, AgentRole::Routa).await {
                Ok(existing)
                    if existing
                        .iter()
                        .any(|a| !a.status.is_terminal()) =>
                {
                    return ToolResult::fail(format!(
                        "workspace {workspace_id} already has an active routa"
                    ));
                }
                Ok(_) => {}
                Err(e) => return ToolResult::fail(e.to_string()),
            }
        } else {
            let Some(parent) = parent_id else {
                return ToolResult::fail(format!("{role} agents require a parent"));
            };
            if let Err(e) = self.agents.get(parent).await {
                return ToolResult::fail(format!("parent does not resolve: {e}"));
            }
        }

        let name = name.unwrap_or_else(|| format!("{role}"));
        let mut agent = AgentRecord::new(workspace_id, role, name);
        if let Some(parent) = parent_id {
            agent = agent.with_parent(parent);
        }
        if let Some(tier) = tier {
            agent = agent.with_tier(tier);
        }
        let agent_id = agent.id.clone();
        let parent_for_event = agent.parent_id.clone();

        if let Err(e) = self.agents.save(agent).await {
            return ToolResult::fail(e.to_string());
        }
        self.bus
            .emit(AgentEvent::AgentCreated {
                agent_id: agent_id.clone(),
                workspace_id: workspace_id.to_string(),
                parent_id: parent_for_event,
            })
            .await;

        match self.agents.update_status(&agent_id, AgentStatus::Active).await {
            Ok((old, new)) => {
                self.bus
                    .emit(AgentEvent::AgentStatusChanged {
                        agent_id: agent_id.clone(),
                        old,
                        new,
                    })
                    .await;
                info!(agent_id = %agent_id, role = %role, workspace = %workspace_id, "Agent created");
                ToolResult::ok(agent_id)
            }
            Err(e) => ToolResult::fail(e.to_string()),
        }
    }

    /// Delegate a ready task to an agent: assignment, status transition,
    /// events, and the briefing message, in that order.
    pub async fn delegate_task(
        &self,
        task_id: &str,
        agent_id: &str,
        delegated_by: &str,
    ) -> ToolResult {
        let task = match self.tasks.get(task_id).await {
            Ok(task) => task,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        if let Err(e) = self.agents.get(agent_id).await {
            return ToolResult::fail(e.to_string());
        }

        // One store-side critical section: readiness check, assignee write,
        // and the Pending -> InProgress transition commit together.
        let (old, new) = match self.tasks.delegate(task_id, agent_id).await {
            Ok(pair) => pair,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        self.bus
            .emit(AgentEvent::TaskDelegated {
                task_id: task_id.to_string(),
                agent_id: agent_id.to_string(),
                delegated_by: delegated_by.to_string(),
            })
            .await;
        self.bus
            .emit(AgentEvent::TaskStatusChanged {
                task_id: task_id.to_string(),
                old,
                new,
            })
            .await;

        let briefing = troika_agents::task_briefing(&task);
        if let Err(e) = self
            .conversations
            .append(Message::system(agent_id, briefing))
            .await
        {
            warn!(task_id = %task_id, error = %e, "Could not append delegation briefing");
        }

        info!(task_id = %task_id, agent_id = %agent_id, delegated_by = %delegated_by, "Task delegated");
        ToolResult::ok(format!("task {task_id} delegated to {agent_id}"))
    }

    pub async fn send_message_to_agent(
        &self,
        from_id: &str,
        to_id: &str,
        content: &str,
    ) -> ToolResult {
        if let Err(e) = self.agents.get(from_id).await {
            return ToolResult::fail(e.to_string());
        }
        if let Err(e) = self.agents.get(to_id).await {
            return ToolResult::fail(e.to_string());
        }

        let message = Message::from_agent(to_id, from_id, content);
        if let Err(e) = self.conversations.append(message.clone()).await {
            return ToolResult::fail(e.to_string());
        }
        self.bus
            .emit(AgentEvent::MessageReceived {
                from: from_id.to_string(),
                to: to_id.to_string(),
                message,
            })
            .await;
        debug!(from = %from_id, to = %to_id, "Message sent");
        ToolResult::ok("message delivered")
    }

    /// One-shot wait for another agent's completion. Returns the
    /// subscription id; the caller drains and filters by target.
    pub async fn wait_for_agent(&self, caller_id: &str, target_id: &str) -> ToolResult {
        let id = self
            .subscriptions
            .subscribe_to_agent_completion(caller_id, target_id);
        ToolResult::ok(id)
    }

    pub async fn subscribe_to_events(
        &self,
        caller_id: &str,
        patterns: Vec<String>,
        exclude_self: bool,
        one_shot: bool,
    ) -> ToolResult {
        let id = self
            .subscriptions
            .subscribe(caller_id, caller_id, patterns, exclude_self, one_shot);
        ToolResult::ok(id)
    }

    /// Unknown subscription ids are not an error; the result data says
    /// whether anything was removed.
    pub async fn unsubscribe_from_events(&self, subscription_id: &str) -> ToolResult {
        let removed = self.subscriptions.unsubscribe(subscription_id);
        ToolResult::ok(removed.to_string())
    }

    pub async fn drain_pending_events(&self, agent_id: &str) -> ToolResult {
        let events = self.subscriptions.drain_pending_events(agent_id);
        let mut text = String::new();
        for delivered in &events {
            text.push_str(&format!("{}\n", delivered.event.event_type()));
        }
        ToolResult::ok(text)
    }

    /// File a completion report: the reporter completes, its task moves to
    /// review, and the parent gets the report in its transcript.
    pub async fn report_to_parent(&self, report: CompletionReport) -> ToolResult {
        let reporter = match self.agents.get(&report.agent_id).await {
            Ok(agent) => agent,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        if reporter.status != AgentStatus::Active {
            return ToolResult::fail(format!(
                "reporter {} is {}, expected active",
                reporter.id, reporter.status
            ));
        }
        let Some(parent_id) = reporter.parent_id.clone() else {
            return ToolResult::fail(format!("agent {} has no parent to report to", reporter.id));
        };
        let task = match self.tasks.get(&report.task_id).await {
            Ok(task) => task,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        if task.status != TaskStatus::InProgress {
            return ToolResult::fail(format!(
                "task {} is {}, expected in_progress",
                task.id, task.status
            ));
        }

        let (agent_old, agent_new) = match self
            .agents
            .update_status(&reporter.id, AgentStatus::Completed)
            .await
        {
            Ok(pair) => pair,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        // Status move and summary commit in one store-side critical section:
        // review_required is never observable without its summary.
        let (task_old, task_new) = match self
            .tasks
            .complete_review(&task.id, report.summary.clone())
            .await
        {
            Ok(pair) => pair,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        self.bus
            .emit(AgentEvent::AgentStatusChanged {
                agent_id: reporter.id.clone(),
                old: agent_old,
                new: agent_new,
            })
            .await;
        self.bus
            .emit(AgentEvent::AgentCompleted {
                agent_id: reporter.id.clone(),
                parent_id: parent_id.clone(),
                report: report.clone(),
            })
            .await;
        self.bus
            .emit(AgentEvent::TaskStatusChanged {
                task_id: task.id.clone(),
                old: task_old,
                new: task_new,
            })
            .await;

        if let Err(e) = self
            .conversations
            .append(Message::system(&parent_id, report.to_transcript_text()))
            .await
        {
            warn!(parent = %parent_id, error = %e, "Could not append completion report");
        }

        info!(
            agent_id = %reporter.id,
            task_id = %task.id,
            success = report.success,
            "Completion report filed"
        );
        ToolResult::ok(format!("report filed for task {}", task.id))
    }

    /// Reuse the task's active assignee, or create a fresh agent and hand it
    /// the task. An assignee in error status is replaced, never reused.
    pub async fn wake_or_create_task_agent(&self, task_id: &str, role: AgentRole) -> ToolResult {
        let task = match self.tasks.get(task_id).await {
            Ok(task) => task,
            Err(e) => return ToolResult::fail(e.to_string()),
        };

        if let Some(assignee) = task.assigned_to.as_deref() {
            match self.agents.get(assignee).await {
                Ok(agent) if agent.status == AgentStatus::Active => {
                    debug!(task_id = %task_id, agent_id = %assignee, "Reusing active assignee");
                    return ToolResult::ok(assignee.to_string());
                }
                Ok(agent) => {
                    debug!(
                        task_id = %task_id,
                        agent_id = %assignee,
                        status = %agent.status,
                        "Assignee not active, spawning replacement"
                    );
                }
                Err(_) => {}
            }
        }

        let routas = match self
            .agents
            .list_by_role(&task.workspace_id, AgentRole::Routa)
            .await
        {
            Ok(routas) => routas,
            Err(e) => return ToolResult::fail(e.to_string()),
        };
        let Some(routa) = routas.first() else {
            return ToolResult::fail(format!(
                "workspace {} has no routa to parent the new agent",
                task.workspace_id
            ));
        };

        let name = format!("{}-{}", role, task.title_slug());
        let created = self
            .create_agent(&task.workspace_id, role, Some(name), Some(&routa.id), None)
            .await;
        if !created.success {
            return created;
        }
        let agent_id = created.data;

        match task.status {
            TaskStatus::Pending => {
                let delegated = self.delegate_task(task_id, &agent_id, &routa.id).await;
                if !delegated.success {
                    return delegated;
                }
            }
            TaskStatus::InProgress => {
                // Task already mid-flight (previous assignee died): rebind the
                // assignment without a status transition.
                if let Err(e) = self
                    .tasks
                    .set_assignee(task_id, Some(agent_id.clone()))
                    .await
                {
                    return ToolResult::fail(e.to_string());
                }
                self.bus
                    .emit(AgentEvent::TaskDelegated {
                        task_id: task_id.to_string(),
                        agent_id: agent_id.clone(),
                        delegated_by: routa.id.clone(),
                    })
                    .await;
                let briefing = troika_agents::task_briefing(&task);
                if let Err(e) = self
                    .conversations
                    .append(Message::system(&agent_id, briefing))
                    .await
                {
                    warn!(task_id = %task_id, error = %e, "Could not append rebind briefing");
                }
            }
            other => {
                return ToolResult::fail(format!(
                    "task {task_id} is {other}, cannot wake an agent for it"
                ));
            }
        }

        ToolResult::ok(agent_id)
    }
}
