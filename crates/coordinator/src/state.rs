//! Observable coordination state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the coordination state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Planning,
    Ready,
    Executing,
    WaveComplete,
    Verifying,
    NeedsFix,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Planning => "planning",
            Phase::Ready => "ready",
            Phase::Executing => "executing",
            Phase::WaveComplete => "wave_complete",
            Phase::Verifying => "verifying",
            Phase::NeedsFix => "needs_fix",
            Phase::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of the coordinator's state, published on a watch cell. External
/// code reads it; only the coordinator writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationState {
    pub phase: Phase,
    pub workspace_id: String,
    pub routa_agent_id: Option<String>,
    /// 1-based; 0 until the first wave launches
    pub current_wave: u32,
    pub active_crafter_ids: Vec<String>,
    pub active_gate_id: Option<String>,
}

impl CoordinationState {
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            workspace_id: String::new(),
            routa_agent_id: None,
            current_wave: 0,
            active_crafter_ids: Vec::new(),
            active_gate_id: None,
        }
    }
}

impl Default for CoordinationState {
    fn default() -> Self {
        Self::idle()
    }
}
