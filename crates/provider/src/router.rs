//! Capability-based provider routing.
//!
//! Each role has needs; each provider declares capabilities. The router picks
//! the highest-scoring qualified provider per run and falls back to the first
//! registered provider when none qualifies, so a run is always attempted.

use crate::provider::{AgentProvider, ChunkSink, ProviderCapabilities};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use troika_common::{AgentRole, Result, TroikaError};

/// What a role requires and prefers from its execution backend.
#[derive(Debug, Clone, Copy)]
pub struct RoleNeeds {
    /// Disqualifying if absent
    pub requires_file_editing: bool,
    pub requires_terminal: bool,
    /// Scoring bonus when present
    pub prefers_tool_calling: bool,
    /// Scoring penalty when present (planners should not edit files)
    pub avoids_file_editing: bool,
}

impl RoleNeeds {
    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::Routa => Self {
                requires_file_editing: false,
                requires_terminal: false,
                prefers_tool_calling: true,
                avoids_file_editing: true,
            },
            AgentRole::Crafter => Self {
                requires_file_editing: true,
                requires_terminal: true,
                prefers_tool_calling: false,
                avoids_file_editing: false,
            },
            AgentRole::Gate => Self {
                requires_file_editing: false,
                requires_terminal: false,
                prefers_tool_calling: true,
                avoids_file_editing: false,
            },
        }
    }

    /// Score a provider against these needs. `None` means disqualified.
    fn score(&self, caps: &ProviderCapabilities) -> Option<i32> {
        if self.requires_file_editing && !caps.supports_file_editing {
            return None;
        }
        if self.requires_terminal && !caps.supports_terminal {
            return None;
        }

        let mut score = 0;
        if self.prefers_tool_calling && caps.supports_tool_calling {
            score += 10;
        }
        if self.avoids_file_editing && caps.supports_file_editing {
            score -= 5;
        }
        Some(score * 100 + caps.priority)
    }
}

/// Routes each run to the best-matching provider by declared capability.
pub struct CapabilityRouter {
    providers: Vec<Arc<dyn AgentProvider>>,
}

impl std::fmt::Debug for CapabilityRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRouter")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl CapabilityRouter {
    pub fn new(providers: Vec<Arc<dyn AgentProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(TroikaError::Config(
                "capability router needs at least one provider".into(),
            ));
        }
        Ok(Self { providers })
    }

    /// Pick a provider for the role. Falls back to the first registered
    /// provider when nothing qualifies.
    pub fn select(&self, role: AgentRole) -> Arc<dyn AgentProvider> {
        let needs = RoleNeeds::for_role(role);

        let best = self
            .providers
            .iter()
            .filter_map(|p| needs.score(&p.capabilities()).map(|s| (s, p)))
            .max_by_key(|(s, _)| *s);

        match best {
            Some((score, provider)) => {
                debug!(
                    role = %role,
                    provider = %provider.capabilities().name,
                    score,
                    "Selected provider"
                );
                provider.clone()
            }
            None => {
                let fallback = self.providers[0].clone();
                warn!(
                    role = %role,
                    provider = %fallback.capabilities().name,
                    "No provider satisfies role needs, falling back to first"
                );
                fallback
            }
        }
    }
}

#[async_trait]
impl AgentProvider for CapabilityRouter {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        self.select(role).run(role, agent_id, prompt).await
    }

    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String> {
        self.select(role)
            .run_streaming(role, agent_id, prompt, on_chunk)
            .await
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        // Targeted cancellation fans out: the router does not track which
        // backend is serving the agent.
        for provider in &self.providers {
            provider.interrupt(agent_id).await?;
        }
        Ok(())
    }

    fn capabilities(&self) -> ProviderCapabilities {
        let mut caps = ProviderCapabilities {
            name: "capability-router".into(),
            supports_streaming: false,
            supports_file_editing: false,
            supports_terminal: false,
            supports_tool_calling: false,
            priority: 0,
        };
        for p in &self.providers {
            let c = p.capabilities();
            caps.supports_streaming |= c.supports_streaming;
            caps.supports_file_editing |= c.supports_file_editing;
            caps.supports_terminal |= c.supports_terminal;
            caps.supports_tool_calling |= c.supports_tool_calling;
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;

    fn caps(
        name: &str,
        file_editing: bool,
        terminal: bool,
        tool_calling: bool,
        priority: i32,
    ) -> ProviderCapabilities {
        ProviderCapabilities {
            name: name.into(),
            supports_streaming: false,
            supports_file_editing: file_editing,
            supports_terminal: terminal,
            supports_tool_calling: tool_calling,
            priority,
        }
    }

    fn provider(capabilities: ProviderCapabilities) -> Arc<dyn AgentProvider> {
        Arc::new(ScriptedProvider::new().with_capabilities(capabilities))
    }

    #[test]
    fn crafter_requires_file_editing_and_terminal() {
        let router = CapabilityRouter::new(vec![
            provider(caps("chat-only", false, false, true, 100)),
            provider(caps("workbench", true, true, false, 1)),
        ])
        .unwrap();

        assert_eq!(
            router.select(AgentRole::Crafter).capabilities().name,
            "workbench"
        );
    }

    #[test]
    fn routa_prefers_tool_calling_without_file_edits() {
        let router = CapabilityRouter::new(vec![
            provider(caps("workbench", true, true, true, 50)),
            provider(caps("planner", false, false, true, 1)),
        ])
        .unwrap();

        // Both qualify; the planner avoids the file-editing penalty.
        assert_eq!(
            router.select(AgentRole::Routa).capabilities().name,
            "planner"
        );
    }

    #[test]
    fn priority_breaks_ties() {
        let router = CapabilityRouter::new(vec![
            provider(caps("gate-a", false, false, true, 1)),
            provider(caps("gate-b", false, false, true, 9)),
        ])
        .unwrap();

        assert_eq!(router.select(AgentRole::Gate).capabilities().name, "gate-b");
    }

    #[test]
    fn falls_back_to_first_when_nothing_qualifies() {
        let router = CapabilityRouter::new(vec![
            provider(caps("first", false, false, false, 0)),
            provider(caps("second", false, false, false, 0)),
        ])
        .unwrap();

        // Crafter needs file editing + terminal; neither has them.
        assert_eq!(
            router.select(AgentRole::Crafter).capabilities().name,
            "first"
        );
    }

    #[test]
    fn empty_router_is_a_config_error() {
        assert!(matches!(
            CapabilityRouter::new(vec![]).unwrap_err(),
            TroikaError::Config(_)
        ));
    }

    #[test]
    fn router_capabilities_aggregate() {
        let router = CapabilityRouter::new(vec![
            provider(caps("a", true, false, false, 0)),
            provider(caps("b", false, true, true, 0)),
        ])
        .unwrap();

        let caps = router.capabilities();
        assert!(caps.supports_file_editing);
        assert!(caps.supports_terminal);
        assert!(caps.supports_tool_calling);
    }
}
