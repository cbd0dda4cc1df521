//! Deterministic scripted provider.
//!
//! Stands in for a model backend in tests and examples: per-role response
//! queues, a recorded run order, and optional failure/latency injection.

use crate::provider::{AgentProvider, ProviderCapabilities};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use troika_common::{AgentRole, Result, TroikaError};

/// One recorded run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedRun {
    pub role: AgentRole,
    pub agent_id: String,
}

/// Scripted provider: pops the next queued response for the role, or returns
/// the default response when the queue is empty.
pub struct ScriptedProvider {
    capabilities: ProviderCapabilities,
    responses: Mutex<HashMap<AgentRole, VecDeque<String>>>,
    default_response: String,
    fail_with: Option<String>,
    delay: Option<Duration>,
    runs: Mutex<Vec<ScriptedRun>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                name: "scripted".into(),
                supports_streaming: false,
                supports_file_editing: true,
                supports_terminal: true,
                supports_tool_calling: true,
                priority: 0,
            },
            responses: Mutex::new(HashMap::new()),
            default_response: "ok".into(),
            fail_with: None,
            delay: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every run fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.fail_with = Some(message.into());
        provider
    }

    /// Queue a response for the role. Responses pop in FIFO order.
    pub fn with_response(self, role: AgentRole, response: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(response.into());
        self
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Inject latency before each response (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Roles in the order they ran, e.g. `[Routa, Crafter, Crafter, Gate]`.
    pub fn run_order(&self) -> Vec<AgentRole> {
        self.runs.lock().unwrap().iter().map(|r| r.role).collect()
    }

    pub fn runs(&self) -> Vec<ScriptedRun> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count_for(&self, role: AgentRole) -> usize {
        self.runs.lock().unwrap().iter().filter(|r| r.role == role).count()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentProvider for ScriptedProvider {
    async fn run(&self, role: AgentRole, agent_id: &str, _prompt: &str) -> Result<String> {
        self.runs.lock().unwrap().push(ScriptedRun {
            role,
            agent_id: agent_id.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(ref message) = self.fail_with {
            return Err(TroikaError::Provider(message.clone()));
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_response.clone());
        Ok(response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_pop_in_fifo_order_per_role() {
        let provider = ScriptedProvider::new()
            .with_response(AgentRole::Gate, "NOT APPROVED")
            .with_response(AgentRole::Gate, "APPROVED")
            .with_default_response("done");

        assert_eq!(
            provider.run(AgentRole::Gate, "g1", "").await.unwrap(),
            "NOT APPROVED"
        );
        assert_eq!(
            provider.run(AgentRole::Gate, "g1", "").await.unwrap(),
            "APPROVED"
        );
        // Queue exhausted: default response
        assert_eq!(provider.run(AgentRole::Gate, "g1", "").await.unwrap(), "done");
        // Other roles never touch the gate queue
        assert_eq!(
            provider.run(AgentRole::Crafter, "c1", "").await.unwrap(),
            "done"
        );
    }

    #[tokio::test]
    async fn records_run_order() {
        let provider = ScriptedProvider::new();
        provider.run(AgentRole::Routa, "r", "").await.unwrap();
        provider.run(AgentRole::Crafter, "c1", "").await.unwrap();
        provider.run(AgentRole::Gate, "g", "").await.unwrap();

        assert_eq!(
            provider.run_order(),
            vec![AgentRole::Routa, AgentRole::Crafter, AgentRole::Gate]
        );
        assert_eq!(provider.run_count_for(AgentRole::Crafter), 1);
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let provider = ScriptedProvider::failing("no backend");
        let err = provider.run(AgentRole::Routa, "r", "").await.unwrap_err();
        assert!(matches!(err, TroikaError::Provider(_)));
        // The run is still recorded
        assert_eq!(provider.run_count_for(AgentRole::Routa), 1);
    }
}
