//! The provider contract.
//!
//! A provider is an execution backend for one agent run: an LLM runtime, a
//! subprocess-backed external agent, or a deterministic mock. Providers
//! declare capabilities; the router matches them to roles by declaration,
//! never by concrete type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use troika_common::{AgentRole, CompletionReport, Result};

/// Capabilities a provider declares for routing decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Provider name, for logs and transcripts
    pub name: String,

    /// Can deliver incremental chunks
    pub supports_streaming: bool,

    /// Can edit files in a workspace
    pub supports_file_editing: bool,

    /// Can run terminal commands
    pub supports_terminal: bool,

    /// Can invoke coordination tools
    pub supports_tool_calling: bool,

    /// Tie-breaker among equally capable providers (higher wins)
    pub priority: i32,
}

/// A chunk delivered by a streaming provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamChunk {
    Text {
        content: String,
    },
    Thinking {
        content: String,
        phase: String,
    },
    ToolCall {
        name: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<serde_json::Value>,
    },
    Error {
        message: String,
    },
    Completed {
        stop_reason: String,
    },
    CompletionReport(CompletionReport),
}

/// Callback receiving stream chunks as they arrive.
pub type ChunkSink<'a> = &'a (dyn Fn(StreamChunk) + Send + Sync);

/// An execution backend for agent runs.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Run the agent to completion, returning the full accumulated response.
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String>;

    /// Streaming variant. The default delegates to [`run`](Self::run) and
    /// delivers the response as a single text chunk.
    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String> {
        let output = self.run(role, agent_id, prompt).await?;
        on_chunk(StreamChunk::Text {
            content: output.clone(),
        });
        on_chunk(StreamChunk::Completed {
            stop_reason: "end".into(),
        });
        Ok(output)
    }

    /// Request cancellation of an in-flight run for the given agent.
    async fn interrupt(&self, _agent_id: &str) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> ProviderCapabilities;
}

#[async_trait]
impl AgentProvider for Box<dyn AgentProvider> {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        (**self).run(role, agent_id, prompt).await
    }

    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String> {
        (**self).run_streaming(role, agent_id, prompt, on_chunk).await
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        (**self).interrupt(agent_id).await
    }

    fn capabilities(&self) -> ProviderCapabilities {
        (**self).capabilities()
    }
}

#[async_trait]
impl AgentProvider for std::sync::Arc<dyn AgentProvider> {
    async fn run(&self, role: AgentRole, agent_id: &str, prompt: &str) -> Result<String> {
        (**self).run(role, agent_id, prompt).await
    }

    async fn run_streaming(
        &self,
        role: AgentRole,
        agent_id: &str,
        prompt: &str,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String> {
        (**self).run_streaming(role, agent_id, prompt, on_chunk).await
    }

    async fn interrupt(&self, agent_id: &str) -> Result<()> {
        (**self).interrupt(agent_id).await
    }

    fn capabilities(&self) -> ProviderCapabilities {
        (**self).capabilities()
    }
}
