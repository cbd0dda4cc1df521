//! Resilient provider wrapper.
//!
//! Wraps any provider so that failures and timeouts become transcript entries
//! plus a synthetic `"[provider error: …]"` output instead of errors. The
//! coordinator keeps observing progress and a gate reviewing the output will
//! render NOT APPROVED on it.

use crate::provider::{AgentProvider, ChunkSink, ProviderCapabilities, StreamChunk};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use troika_common::{AgentRole, Message, Result, TroikaError};
use troika_store::ConversationStore;

pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 300_000;

/// Never-failing wrapper around an [`AgentProvider`].
pub struct ResilientProvider {
    inner: Arc<dyn AgentProvider>,
    conversations: Arc<dyn ConversationStore>,
    timeout: Duration,
}

impl ResilientProvider {
    pub fn new(inner: Arc<dyn AgentProvider>, conversations: Arc<dyn ConversationStore>) -> Self {
        Self {
            inner,
            conversations,
            timeout: Duration::from_millis(DEFAULT_RUN_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record the failure in the agent's transcript and produce the synthetic
    /// output the rest of the pipeline observes.
    async fn absorb(&self, agent_id: &str, error: TroikaError) -> String {
        warn!(
            agent_id = %agent_id,
            provider = %self.inner.capabilities().name,
            error = %error,
            "Provider run failed, recording failure transcript"
        );

        let note = format!("Provider run failed: {error}");
        if let Err(store_err) = self
            .conversations
            .append(Message::system(agent_id, note))
            .await
        {
            warn!(agent_id = %agent_id, error = %store_err, "Could not record provider failure");
        }

        format!("[provider error: {error}]")
    }

    async fn run_with_deadline(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
    ) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.inner.run(role, agent_id, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(TroikaError::Timeout {
                ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl AgentProvider for ResilientProvider {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        match self.run_with_deadline(role, agent_id, prompt).await {
            Ok(output) => Ok(output),
            Err(error) => Ok(self.absorb(agent_id, error).await),
        }
    }

    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String> {
        let attempt = tokio::time::timeout(
            self.timeout,
            self.inner.run_streaming(role, agent_id, prompt, on_chunk),
        )
        .await
        .unwrap_or(Err(TroikaError::Timeout {
            ms: self.timeout.as_millis() as u64,
        }));

        match attempt {
            Ok(output) => Ok(output),
            Err(error) => {
                on_chunk(StreamChunk::Error {
                    message: error.to_string(),
                });
                Ok(self.absorb(agent_id, error).await)
            }
        }
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        self.inner.interrupt(agent_id).await
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;
    use troika_store::InMemoryConversationStore;

    #[tokio::test]
    async fn failure_becomes_transcript_entry_and_synthetic_output() {
        let conversations = Arc::new(InMemoryConversationStore::new());
        let provider = ResilientProvider::new(
            Arc::new(ScriptedProvider::failing("backend down")),
            conversations.clone(),
        );

        let output = provider
            .run(AgentRole::Crafter, "agent_c", "do the thing")
            .await
            .unwrap();

        assert!(output.starts_with("[provider error:"));
        assert!(output.contains("backend down"));

        let transcript = conversations.get_conversation("agent_c").await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].content.contains("Provider run failed"));
    }

    #[tokio::test]
    async fn timeout_is_absorbed() {
        let conversations = Arc::new(InMemoryConversationStore::new());
        let slow = ScriptedProvider::new()
            .with_response(AgentRole::Routa, "never seen")
            .with_delay(Duration::from_millis(200));
        let provider = ResilientProvider::new(Arc::new(slow), conversations.clone())
            .with_timeout(Duration::from_millis(10));

        let output = provider.run(AgentRole::Routa, "agent_r", "plan").await.unwrap();
        assert!(output.contains("timed out"));

        let transcript = conversations.get_conversation("agent_r").await.unwrap();
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn success_passes_through_untouched() {
        let conversations = Arc::new(InMemoryConversationStore::new());
        let provider = ResilientProvider::new(
            Arc::new(ScriptedProvider::new().with_response(AgentRole::Gate, "APPROVED")),
            conversations.clone(),
        );

        let output = provider.run(AgentRole::Gate, "agent_g", "verify").await.unwrap();
        assert_eq!(output, "APPROVED");
        assert!(conversations
            .get_conversation("agent_g")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn streaming_failure_emits_error_chunk() {
        use std::sync::Mutex;
        let conversations = Arc::new(InMemoryConversationStore::new());
        let provider = ResilientProvider::new(
            Arc::new(ScriptedProvider::failing("boom")),
            conversations,
        );

        let chunks: Mutex<Vec<StreamChunk>> = Mutex::new(Vec::new());
        let output = provider
            .run_streaming(AgentRole::Crafter, "agent_c", "go", &|c| {
                chunks.lock().unwrap().push(c)
            })
            .await
            .unwrap();

        assert!(output.starts_with("[provider error:"));
        let chunks = chunks.into_inner().unwrap();
        assert!(chunks
            .iter()
            .any(|c| matches!(c, StreamChunk::Error { message } if message.contains("boom"))));
    }
}
