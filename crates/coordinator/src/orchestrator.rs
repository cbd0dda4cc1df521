//! Top-level orchestration of one user request.
//!
//! Drives the full pipeline: plan with the Routa, fan the wave's crafters
//! out concurrently, gate the wave, retry on rejection. Providers are run
//! through whatever [`AgentProvider`] the caller composed (typically a
//! `ResilientProvider` around a `CapabilityRouter`), so provider failures
//! surface as reviewable output rather than errors.

use crate::coordinator::WaveCoordinator;
use crate::state::Phase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use troika_agents::{fallback_report, planning_prompt};
use troika_common::{
    AgentRole, AgentStatus, Message, Result, TaskStatus, VerificationVerdict,
};
use troika_provider::AgentProvider;

/// Terminal outcome of one orchestrated request.
#[derive(Debug, Clone)]
pub enum OrchestratorResult {
    /// Every task completed and the gate approved.
    Success { summaries: Vec<String> },
    /// The routa's plan contained no task blocks; the raw plan is echoed.
    NoTasks { plan: String },
    /// The retry cap elapsed with unfinished tasks.
    MaxWavesReached,
    /// A cancel signal stopped the pipeline.
    Cancelled,
}

/// Progress notifications emitted at every state boundary.
#[derive(Debug, Clone)]
pub enum OrchestratorPhase {
    Initializing,
    Planning,
    PlanReady,
    TasksRegistered { count: usize },
    WaveStarting { wave: u32 },
    CrafterRunning { agent_id: String, task_id: String },
    CrafterCompleted { agent_id: String, task_id: String },
    VerificationStarting { gate_id: String },
    VerificationCompleted { verdict: VerificationVerdict },
    NeedsFix { wave: u32 },
    Completed,
    MaxWavesReached,
}

pub type PhaseCallback = Arc<dyn Fn(OrchestratorPhase) + Send + Sync>;

/// Runs one user request through the three-role pipeline.
pub struct Orchestrator {
    coordinator: Arc<WaveCoordinator>,
    provider: Arc<dyn AgentProvider>,
    on_phase: Option<PhaseCallback>,
    cancelled: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(coordinator: Arc<WaveCoordinator>, provider: Arc<dyn AgentProvider>) -> Self {
        Self {
            coordinator,
            provider,
            on_phase: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Observe phase boundaries (UI progress, tests).
    pub fn with_phase_callback(mut self, callback: PhaseCallback) -> Self {
        self.on_phase = Some(callback);
        self
    }

    /// Signal cancellation to the running pipeline and interrupt in-flight
    /// crafter runs.
    pub async fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        for crafter_id in self.coordinator.state().active_crafter_ids {
            if let Err(e) = self.provider.interrupt(&crafter_id).await {
                warn!(agent_id = %crafter_id, error = %e, "Interrupt failed");
            }
        }
    }

    fn notify(&self, phase: OrchestratorPhase) {
        if let Some(callback) = &self.on_phase {
            callback(phase);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancelled crafters end Cancelled; their tasks stay in progress so the
    /// caller can decide whether to retry.
    async fn cancel_active_crafters(&self) {
        for crafter_id in self.coordinator.state().active_crafter_ids {
            let store = self.coordinator.agent_store();
            match store.get(&crafter_id).await {
                Ok(agent) if agent.status == AgentStatus::Active => {
                    if let Err(e) = store.update_status(&crafter_id, AgentStatus::Cancelled).await {
                        warn!(agent_id = %crafter_id, error = %e, "Could not cancel crafter");
                    }
                }
                _ => {}
            }
        }
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, workspace_id: &str, user_request: &str) -> Result<OrchestratorResult> {
        self.notify(OrchestratorPhase::Initializing);
        let routa_id = self.coordinator.initialize(workspace_id).await?;
        self.coordinator
            .conversation_store()
            .append(Message::user(&routa_id, user_request))
            .await?;

        self.notify(OrchestratorPhase::Planning);
        let plan = self
            .provider
            .run(AgentRole::Routa, &routa_id, &planning_prompt(user_request))
            .await?;
        self.notify(OrchestratorPhase::PlanReady);

        let task_ids = self.coordinator.register_tasks(&plan).await?;
        if task_ids.is_empty() {
            info!(workspace = %workspace_id, "Plan produced no tasks");
            return Ok(OrchestratorResult::NoTasks { plan });
        }
        self.notify(OrchestratorPhase::TasksRegistered {
            count: task_ids.len(),
        });

        let max_waves = self.coordinator.config().max_waves;
        for _ in 0..max_waves {
            if self.is_cancelled() {
                return Ok(OrchestratorResult::Cancelled);
            }

            let delegations = self.coordinator.execute_next_wave().await?;
            if delegations.is_empty() {
                // Nothing ready: every remaining task is blocked or sunk.
                break;
            }
            let wave = self.coordinator.state().current_wave;
            self.notify(OrchestratorPhase::WaveStarting { wave });

            self.run_wave(&delegations).await;
            if self.is_cancelled() {
                self.cancel_active_crafters().await;
                return Ok(OrchestratorResult::Cancelled);
            }

            self.coordinator.observe_wave_completion().await?;

            let gate_id = self.coordinator.start_verification().await?;
            self.notify(OrchestratorPhase::VerificationStarting {
                gate_id: gate_id.clone(),
            });

            let gate_context = self.coordinator.build_agent_context(&gate_id).await?;
            let gate_output = self
                .provider
                .run(AgentRole::Gate, &gate_id, &gate_context)
                .await?;
            let verdict = self.coordinator.record_verdict(&gate_output).await?;
            self.notify(OrchestratorPhase::VerificationCompleted { verdict });

            if self.coordinator.phase() == Phase::Completed {
                self.notify(OrchestratorPhase::Completed);
                return Ok(OrchestratorResult::Success {
                    summaries: self.task_summaries(workspace_id).await?,
                });
            }
            self.notify(OrchestratorPhase::NeedsFix { wave });
        }

        warn!(workspace = %workspace_id, max_waves, "Wave cap reached with unfinished tasks");
        self.notify(OrchestratorPhase::MaxWavesReached);
        Ok(OrchestratorResult::MaxWavesReached)
    }

    /// Run every crafter of the wave concurrently; each run that ends
    /// without a filed report gets a synthesized failure report so the wave
    /// always converges.
    async fn run_wave(&self, delegations: &[(String, String)]) {
        let mut handles = Vec::with_capacity(delegations.len());

        for (crafter_id, task_id) in delegations {
            let coordinator = self.coordinator.clone();
            let provider = self.provider.clone();
            let on_phase = self.on_phase.clone();
            let crafter_id = crafter_id.clone();
            let task_id = task_id.clone();

            handles.push(tokio::spawn(async move {
                if let Some(callback) = &on_phase {
                    callback(OrchestratorPhase::CrafterRunning {
                        agent_id: crafter_id.clone(),
                        task_id: task_id.clone(),
                    });
                }

                let context = match coordinator.build_agent_context(&crafter_id).await {
                    Ok(context) => context,
                    Err(e) => {
                        warn!(agent_id = %crafter_id, error = %e, "Context build failed");
                        String::new()
                    }
                };
                let output = match provider.run(AgentRole::Crafter, &crafter_id, &context).await {
                    Ok(output) => output,
                    Err(e) => format!("[provider error: {e}]"),
                };

                // A well-behaved crafter filed its report during the run;
                // anything still in progress gets the failure fallback.
                let needs_fallback = matches!(
                    coordinator.task_store().get(&task_id).await,
                    Ok(task) if task.status == TaskStatus::InProgress
                );
                if needs_fallback {
                    let report = fallback_report(&crafter_id, &task_id, &output);
                    let filed = coordinator.tools().report_to_parent(report).await;
                    if !filed.success {
                        warn!(
                            agent_id = %crafter_id,
                            task_id = %task_id,
                            error = ?filed.error,
                            "Could not file fallback report"
                        );
                    }
                }

                if let Some(callback) = &on_phase {
                    callback(OrchestratorPhase::CrafterCompleted {
                        agent_id: crafter_id.clone(),
                        task_id: task_id.clone(),
                    });
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Crafter task join error");
            }
        }
    }

    async fn task_summaries(&self, workspace_id: &str) -> Result<Vec<String>> {
        let tasks = self
            .coordinator
            .task_store()
            .list_by_workspace(workspace_id)
            .await?;
        Ok(tasks
            .iter()
            .map(|t| {
                format!(
                    "{}: {}",
                    t.title,
                    t.completion_summary.as_deref().unwrap_or("(no summary)")
                )
            })
            .collect())
    }
}
