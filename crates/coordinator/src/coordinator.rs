//! The wave coordinator: the state machine driving planning, execution
//! waves, and verification.

use crate::bus::EventBus;
use crate::config::CoordinationConfig;
use crate::state::{CoordinationState, Phase};
use crate::subscriptions::SubscriptionService;
use crate::tools::AgentTools;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use troika_agents::{parse_verdict, system_prompt_for};
use troika_common::{
    AgentEvent, AgentRole, AgentStatus, Result, TaskStatus, TroikaError, VerificationVerdict,
};
use troika_store::{AgentStore, ConversationStore, TaskStore};

const OBSERVE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Coordinates one workspace's three-role pipeline. Owns the observable
/// [`CoordinationState`] cell; all transitions happen here.
pub struct WaveCoordinator {
    agents: Arc<dyn AgentStore>,
    tasks: Arc<dyn TaskStore>,
    conversations: Arc<dyn ConversationStore>,
    bus: Arc<EventBus>,
    subscriptions: Arc<SubscriptionService>,
    tools: Arc<AgentTools>,
    config: CoordinationConfig,
    state: watch::Sender<CoordinationState>,
}

impl WaveCoordinator {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        tasks: Arc<dyn TaskStore>,
        conversations: Arc<dyn ConversationStore>,
        config: CoordinationConfig,
    ) -> Result<Self> {
        config.validate()?;

        let bus = Arc::new(EventBus::new(config.event_bus_buffer));
        let subscriptions = Arc::new(SubscriptionService::new());
        subscriptions.start_listening(bus.subscribe());

        let tools = Arc::new(AgentTools::new(
            agents.clone(),
            tasks.clone(),
            conversations.clone(),
            bus.clone(),
            subscriptions.clone(),
        ));

        let (state, _) = watch::channel(CoordinationState::idle());

        Ok(Self {
            agents,
            tasks,
            conversations,
            bus,
            subscriptions,
            tools,
            config,
            state,
        })
    }

    /// Convenience constructor wiring the in-memory reference stores.
    pub fn in_memory(config: CoordinationConfig) -> Result<Self> {
        use troika_store::{InMemoryAgentStore, InMemoryConversationStore, InMemoryTaskStore};
        Self::new(
            Arc::new(InMemoryAgentStore::new()),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryConversationStore::new()),
            config,
        )
    }

    pub fn state(&self) -> CoordinationState {
        self.state.borrow().clone()
    }

    /// Watch handle for UIs and tests; receivers observe every transition.
    pub fn watch_state(&self) -> watch::Receiver<CoordinationState> {
        self.state.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn tools(&self) -> Arc<AgentTools> {
        self.tools.clone()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    pub fn subscriptions(&self) -> Arc<SubscriptionService> {
        self.subscriptions.clone()
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    pub fn task_store(&self) -> Arc<dyn TaskStore> {
        self.tasks.clone()
    }

    pub fn agent_store(&self) -> Arc<dyn AgentStore> {
        self.agents.clone()
    }

    pub fn conversation_store(&self) -> Arc<dyn ConversationStore> {
        self.conversations.clone()
    }

    fn require_phase(&self, allowed: &[Phase], op: &str) -> Result<()> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(TroikaError::Contract(format!(
                "{op} called in phase {phase}, expected one of {allowed:?}"
            )))
        }
    }

    /// Create the workspace's Routa and enter planning. Returns its id.
    pub async fn initialize(&self, workspace_id: &str) -> Result<String> {
        self.require_phase(&[Phase::Idle], "initialize")?;

        let created = self
            .tools
            .create_agent(workspace_id, AgentRole::Routa, Some("routa".into()), None, None)
            .await;
        if !created.success {
            return Err(TroikaError::Contract(
                created.error.unwrap_or_else(|| "could not create routa".into()),
            ));
        }
        let routa_id = created.data;

        self.state.send_modify(|s| {
            s.phase = Phase::Planning;
            s.workspace_id = workspace_id.to_string();
            s.routa_agent_id = Some(routa_id.clone());
            s.current_wave = 0;
        });
        info!(workspace = %workspace_id, routa = %routa_id, "Coordination initialized");
        Ok(routa_id)
    }

    /// Parse the plan text and register its tasks. Moves to Ready when at
    /// least one task was produced.
    pub async fn register_tasks(&self, plan_text: &str) -> Result<Vec<String>> {
        self.require_phase(&[Phase::Planning], "register_tasks")?;

        let workspace_id = self.state.borrow().workspace_id.clone();
        let parsed = troika_agents::parse_plan(plan_text);
        let mut ids = Vec::with_capacity(parsed.len());

        for mut task in parsed {
            task.workspace_id = workspace_id.clone();
            ids.push(task.id.clone());
            self.tasks.save(task).await?;
        }

        if !ids.is_empty() {
            self.state.send_modify(|s| s.phase = Phase::Ready);
        }
        info!(workspace = %workspace_id, count = ids.len(), "Tasks registered");
        Ok(ids)
    }

    /// Launch the next wave: one fresh crafter per ready task. Returns the
    /// (crafter_id, task_id) pairs. An empty return means no task is ready
    /// and the phase is left untouched.
    pub async fn execute_next_wave(&self) -> Result<Vec<(String, String)>> {
        self.require_phase(&[Phase::Ready, Phase::NeedsFix], "execute_next_wave")?;

        let (workspace_id, routa_id, wave) = {
            let s = self.state.borrow();
            (
                s.workspace_id.clone(),
                s.routa_agent_id.clone().ok_or_else(|| {
                    TroikaError::Contract("execute_next_wave before initialize".into())
                })?,
                s.current_wave + 1,
            )
        };

        let ready = self.tasks.find_ready_tasks(&workspace_id).await?;
        if ready.is_empty() {
            warn!(workspace = %workspace_id, "No ready tasks for the next wave");
            return Ok(Vec::new());
        }

        let mut delegations = Vec::with_capacity(ready.len());
        for task in &ready {
            let name = format!("crafter-{}-{}", task.title_slug(), wave);
            let created = self
                .tools
                .create_agent(
                    &workspace_id,
                    AgentRole::Crafter,
                    Some(name),
                    Some(&routa_id),
                    None,
                )
                .await;
            if !created.success {
                warn!(task_id = %task.id, error = ?created.error, "Could not create crafter");
                continue;
            }
            let crafter_id = created.data;

            let delegated = self.tools.delegate_task(&task.id, &crafter_id, &routa_id).await;
            if !delegated.success {
                warn!(task_id = %task.id, error = ?delegated.error, "Could not delegate task");
                continue;
            }
            delegations.push((crafter_id, task.id.clone()));
        }

        let crafter_ids: Vec<String> = delegations.iter().map(|(c, _)| c.clone()).collect();
        self.state.send_modify(|s| {
            s.phase = Phase::Executing;
            s.current_wave = wave;
            s.active_crafter_ids = crafter_ids;
        });
        info!(workspace = %workspace_id, wave, crafters = delegations.len(), "Wave launched");
        Ok(delegations)
    }

    /// The prompt an agent should receive: role rules verbatim, the current
    /// task snapshot if one is assigned, and the conversation tail.
    pub async fn build_agent_context(&self, agent_id: &str) -> Result<String> {
        let agent = self.agents.get(agent_id).await?;
        let mut context = String::from(system_prompt_for(agent.role));

        if let Some(task) = self.tasks.list_by_assignee(agent_id).await?.first() {
            context.push_str(&format!(
                "\n\nCurrent task: {} [{}]\n",
                task.title, task.status
            ));
            if !task.objective.is_empty() {
                context.push_str(&format!("Objective: {}\n", task.objective));
            }
            for item in &task.scope {
                context.push_str(&format!("Scope: {}\n", item));
            }
            for item in &task.acceptance_criteria {
                context.push_str(&format!("Done when: {}\n", item));
            }
            for item in &task.verification_commands {
                context.push_str(&format!("Verify with: {}\n", item));
            }
        }

        let tail = self
            .conversations
            .get_last_n(agent_id, self.config.conversation_tail_messages)
            .await?;
        if !tail.is_empty() {
            context.push_str("\nConversation:\n");
            for message in &tail {
                let from = message.from_agent_id.as_deref().unwrap_or("-");
                context.push_str(&format!("[{:?} {}] {}\n", message.role, from, message.content));
            }
        }
        Ok(context)
    }

    /// Block until every crafter of the current wave has completed, then
    /// move to WaveComplete. Returns early when `reset` pulls the phase out
    /// of Executing.
    pub async fn observe_wave_completion(&self) -> Result<()> {
        self.require_phase(&[Phase::Executing], "observe_wave_completion")?;

        let (crafter_ids, observer_id) = {
            let s = self.state.borrow();
            (
                s.active_crafter_ids.clone(),
                s.routa_agent_id.clone().unwrap_or_else(|| "coordinator".into()),
            )
        };

        let subscription_id = self.subscriptions.subscribe(
            observer_id.clone(),
            "wave-observer",
            vec!["agent:completed".into()],
            false,
            false,
        );

        loop {
            if self.phase() != Phase::Executing {
                // reset() or shutdown() intervened
                self.subscriptions.unsubscribe(&subscription_id);
                return Ok(());
            }

            let mut all_done = true;
            for crafter_id in &crafter_ids {
                let status = self.agents.get(crafter_id).await?.status;
                if status != AgentStatus::Completed {
                    all_done = false;
                    break;
                }
            }
            if all_done {
                break;
            }

            // Completion events wake the drain; the sleep bounds the gap if
            // one was emitted before we subscribed.
            self.subscriptions.drain_pending_events(&observer_id);
            tokio::time::sleep(OBSERVE_POLL_INTERVAL).await;
        }

        self.subscriptions.unsubscribe(&subscription_id);
        self.state.send_modify(|s| s.phase = Phase::WaveComplete);
        info!(wave = self.state.borrow().current_wave, "Wave complete");
        Ok(())
    }

    /// Create the wave's Gate and move to Verifying. Returns the gate id.
    pub async fn start_verification(&self) -> Result<String> {
        self.require_phase(&[Phase::WaveComplete], "start_verification")?;

        let (workspace_id, routa_id, wave) = {
            let s = self.state.borrow();
            (
                s.workspace_id.clone(),
                s.routa_agent_id.clone().ok_or_else(|| {
                    TroikaError::Contract("start_verification before initialize".into())
                })?,
                s.current_wave,
            )
        };

        let created = self
            .tools
            .create_agent(
                &workspace_id,
                AgentRole::Gate,
                Some(format!("gate-wave-{wave}")),
                Some(&routa_id),
                None,
            )
            .await;
        if !created.success {
            return Err(TroikaError::Contract(
                created.error.unwrap_or_else(|| "could not create gate".into()),
            ));
        }
        let gate_id = created.data;

        // Brief the gate on what this wave produced.
        let mut briefing = format!("Wave {wave} finished. Review the following tasks:\n");
        for task in self.tasks.list_by_workspace(&workspace_id).await? {
            if task.status == TaskStatus::ReviewRequired {
                briefing.push_str(&format!("\nTask: {} ({})\n", task.title, task.id));
                if let Some(summary) = &task.completion_summary {
                    briefing.push_str(&format!("Reported: {}\n", summary));
                }
                for item in &task.acceptance_criteria {
                    briefing.push_str(&format!("Done when: {}\n", item));
                }
                if let Some(assignee) = &task.assigned_to {
                    briefing.push_str(&format!(
                        "Crafter transcript available via read_agent_conversation({assignee})\n"
                    ));
                }
            }
        }
        briefing.push_str("\nRender APPROVED or NOT APPROVED for the wave.");
        self.conversations
            .append(troika_common::Message::system(&gate_id, briefing))
            .await?;

        self.state.send_modify(|s| {
            s.phase = Phase::Verifying;
            s.active_gate_id = Some(gate_id.clone());
        });
        info!(gate = %gate_id, wave, "Verification started");
        Ok(gate_id)
    }

    /// Apply the gate's verdict to every task under review and settle the
    /// phase: Completed when everything is done, NeedsFix otherwise.
    pub async fn record_verdict(&self, gate_output: &str) -> Result<VerificationVerdict> {
        self.require_phase(&[Phase::Verifying], "record_verdict")?;

        let verdict = parse_verdict(gate_output);
        let (workspace_id, gate_id) = {
            let s = self.state.borrow();
            (s.workspace_id.clone(), s.active_gate_id.clone())
        };

        let all_tasks = self.tasks.list_by_workspace(&workspace_id).await?;
        for task in all_tasks.iter().filter(|t| t.status == TaskStatus::ReviewRequired) {
            // One store-side critical section per task: status move(s),
            // verdict bookkeeping, and assignee clearing commit together.
            // A rejection lands directly on Pending; its events still
            // describe both lattice edges.
            let transitions = self
                .tasks
                .resolve_review(&task.id, verdict, gate_output.to_string())
                .await?;
            for (old, new) in transitions {
                self.emit_task_status(&task.id, old, new).await;
            }
        }

        // The gate's run is over regardless of the verdict.
        if let Some(gate_id) = gate_id {
            match self.agents.update_status(&gate_id, AgentStatus::Completed).await {
                Ok((old, new)) => {
                    self.bus
                        .emit(AgentEvent::AgentStatusChanged {
                            agent_id: gate_id,
                            old,
                            new,
                        })
                        .await;
                }
                Err(e) => warn!(error = %e, "Could not complete gate agent"),
            }
        }

        let remaining = self.tasks.list_by_workspace(&workspace_id).await?;
        let all_completed = remaining.iter().all(|t| t.status == TaskStatus::Completed);
        self.state.send_modify(|s| {
            s.active_gate_id = None;
            s.active_crafter_ids.clear();
            s.phase = if all_completed {
                Phase::Completed
            } else {
                Phase::NeedsFix
            };
        });

        info!(verdict = ?verdict, all_completed, "Verdict recorded");
        Ok(verdict)
    }

    async fn emit_task_status(&self, task_id: &str, old: TaskStatus, new: TaskStatus) {
        self.bus
            .emit(AgentEvent::TaskStatusChanged {
                task_id: task_id.to_string(),
                old,
                new,
            })
            .await;
    }

    /// Cancel subscriptions, clear active ids, return to Idle. Stores are
    /// retained; any wave observer unblocks.
    pub fn reset(&self) {
        let observer = {
            let s = self.state.borrow();
            s.routa_agent_id.clone().unwrap_or_else(|| "coordinator".into())
        };
        self.subscriptions.unsubscribe_all(&observer);
        self.state.send_modify(|s| {
            s.phase = Phase::Idle;
            s.routa_agent_id = None;
            s.active_crafter_ids.clear();
            s.active_gate_id = None;
            s.current_wave = 0;
        });
        info!("Coordinator reset");
    }

    /// Reset and stop the subscription consumer.
    pub fn shutdown(&self) {
        self.reset();
        self.subscriptions.shutdown();
    }
}
