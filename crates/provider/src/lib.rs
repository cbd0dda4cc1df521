//! Execution providers for Troika agents.
//!
//! Providers differ widely (an LLM runtime, a subprocess-backed external
//! agent, a deterministic mock), so they all implement one
//! capability-declaring interface and are routed by declared capability,
//! never by concrete type:
//!
//! - [`AgentProvider`]: the provider contract (`run`, optional streaming and
//!   interrupt, declared [`ProviderCapabilities`]).
//! - [`CapabilityRouter`]: picks the best provider per role, with fallback.
//! - [`ResilientProvider`]: converts failures and timeouts into transcript
//!   entries plus a synthetic output; never fails.
//! - [`ScriptedProvider`]: deterministic mock for tests and examples.

pub mod mock;
pub mod provider;
pub mod resilient;
pub mod router;

pub use mock::{ScriptedProvider, ScriptedRun};
pub use provider::{AgentProvider, ChunkSink, ProviderCapabilities, StreamChunk};
pub use resilient::{ResilientProvider, DEFAULT_RUN_TIMEOUT_MS};
pub use router::{CapabilityRouter, RoleNeeds};
