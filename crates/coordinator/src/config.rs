//! Configuration for the coordination core.

use serde::{Deserialize, Serialize};
use troika_common::{Result, TroikaError};

/// Main coordination configuration. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Verification retry cap: maximum number of execution waves
    #[serde(default = "default_max_waves")]
    pub max_waves: u32,

    /// Iteration cap per Routa provider run
    #[serde(default = "default_planner_iterations")]
    pub max_routa_iterations: u32,

    /// Iteration cap per Crafter provider run
    #[serde(default = "default_planner_iterations")]
    pub max_crafter_iterations: u32,

    /// Iteration cap per Gate provider run
    #[serde(default = "default_gate_iterations")]
    pub max_gate_iterations: u32,

    /// Deadline for a single provider run, in milliseconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_ms: u64,

    /// Per-subscriber event bus buffer capacity
    #[serde(default = "default_event_bus_buffer")]
    pub event_bus_buffer: usize,

    /// Conversation tail length included in agent contexts
    #[serde(default = "default_conversation_tail")]
    pub conversation_tail_messages: usize,
}

fn default_max_waves() -> u32 {
    5
}

fn default_planner_iterations() -> u32 {
    20
}

fn default_gate_iterations() -> u32 {
    30
}

fn default_provider_timeout() -> u64 {
    300_000
}

fn default_event_bus_buffer() -> usize {
    256
}

fn default_conversation_tail() -> usize {
    20
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            max_waves: default_max_waves(),
            max_routa_iterations: default_planner_iterations(),
            max_crafter_iterations: default_planner_iterations(),
            max_gate_iterations: default_gate_iterations(),
            provider_timeout_ms: default_provider_timeout(),
            event_bus_buffer: default_event_bus_buffer(),
            conversation_tail_messages: default_conversation_tail(),
        }
    }
}

impl CoordinationConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| TroikaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would stall the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.max_waves == 0 {
            return Err(TroikaError::Config("max_waves must be at least 1".into()));
        }
        if self.provider_timeout_ms == 0 {
            return Err(TroikaError::Config(
                "provider_timeout_ms must be nonzero".into(),
            ));
        }
        if self.event_bus_buffer == 0 {
            return Err(TroikaError::Config(
                "event_bus_buffer must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinationConfig::default();
        assert_eq!(config.max_waves, 5);
        assert_eq!(config.max_routa_iterations, 20);
        assert_eq!(config.max_crafter_iterations, 20);
        assert_eq!(config.max_gate_iterations, 30);
        assert_eq!(config.provider_timeout_ms, 300_000);
        assert_eq!(config.event_bus_buffer, 256);
        assert_eq!(config.conversation_tail_messages, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: CoordinationConfig = toml::from_str("max_waves = 3").unwrap();
        assert_eq!(config.max_waves, 3);
        assert_eq!(config.event_bus_buffer, 256);
    }

    #[test]
    fn zero_values_are_rejected() {
        let config = CoordinationConfig {
            max_waves: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            TroikaError::Config(_)
        ));

        let config = CoordinationConfig {
            event_bus_buffer: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
