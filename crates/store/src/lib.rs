//! Pluggable stores for the Troika coordination core.
//!
//! Three interfaces ([`AgentStore`], [`TaskStore`], [`ConversationStore`])
//! with thread-safe in-memory reference implementations. A session constructs
//! its own store triple; there are no process-wide singletons.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryAgentStore, InMemoryConversationStore, InMemoryTaskStore};
pub use traits::{AgentStore, ConversationStore, TaskStore};
