//! Common types and traits shared across Troika crates.
//!
//! This crate provides the foundational abstractions that the stores,
//! providers, and coordinator use to communicate.

pub mod agent;
pub mod error;
pub mod event;
pub mod ids;
pub mod message;
pub mod task;

pub use agent::{AgentRecord, AgentRole, AgentStatus, ModelTier};
pub use error::{Result, TroikaError};
pub use event::AgentEvent;
pub use ids::{new_id, now_millis};
pub use message::{CompletionReport, Message, MessageRole};
pub use task::{TaskRecord, TaskStatus, VerificationVerdict};
