//! Coordination core for the Troika three-role pipeline.
//!
//! A Routa plans, Crafters execute in parallel waves, a Gate approves or
//! rejects each wave. This crate ties the pieces together for one session:
//!
//! ```text
//! User Request
//!      │
//!      ▼
//! ┌──────────────┐   plan (@@@task blocks)
//! │ Orchestrator │──────────────┐
//! └──────┬───────┘              ▼
//!        │             ┌─────────────────┐
//!        │             │ WaveCoordinator │◄── CoordinationState (watch)
//!        │             └────────┬────────┘
//!        │    delegate / report │ tools
//!   ┌────┴────┬──────────┐     ▼
//!   ▼         ▼          ▼  ┌───────────┐  ┌───────────────┐
//! [Crafter] [Crafter] [Gate]│ EventBus  │─▶│ Subscriptions │
//!                           └───────────┘  └───────────────┘
//! ```
//!
//! Each session constructs its own stores, bus, and coordinator; a host that
//! needs several concurrent sessions instantiates more.

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod orchestrator;
pub mod state;
pub mod subscriptions;
pub mod tools;

pub use bus::{BusReceiver, EventBus, DEFAULT_BUS_CAPACITY};
pub use config::CoordinationConfig;
pub use coordinator::WaveCoordinator;
pub use orchestrator::{Orchestrator, OrchestratorPhase, OrchestratorResult, PhaseCallback};
pub use state::{CoordinationState, Phase};
pub use subscriptions::{
    matches_event_type, DeliveredEvent, EventSubscription, SubscriptionService,
};
pub use tools::{AgentTools, ToolResult};
