//! Role definitions and text protocols for the Troika pipeline.
//!
//! Three roles, one module each:
//!
//! - **Routa**: plans; emits `@@@task` blocks; never edits files.
//! - **Crafter**: executes a delegated task; files a completion report.
//! - **Gate**: reviews a wave; renders APPROVED / NOT APPROVED.
//!
//! Plus the two text protocols that connect them: the `@@@task` plan grammar
//! ([`plan`]) and the verdict markers ([`gate::parse_verdict`]).

pub mod crafter;
pub mod gate;
pub mod plan;
pub mod routa;

pub use crafter::{fallback_report, task_briefing, CRAFTER_SYSTEM_PROMPT};
pub use gate::{parse_verdict, GATE_SYSTEM_PROMPT};
pub use plan::{parse_plan, render_plan};
pub use routa::{planning_prompt, ROUTA_SYSTEM_PROMPT};

use troika_common::AgentRole;

/// The system prompt for a role, rules verbatim.
pub fn system_prompt_for(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Routa => ROUTA_SYSTEM_PROMPT,
        AgentRole::Crafter => CRAFTER_SYSTEM_PROMPT,
        AgentRole::Gate => GATE_SYSTEM_PROMPT,
    }
}
