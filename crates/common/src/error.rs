//! Error types for Troika.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TroikaError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("illegal {entity} transition: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider run timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("contract violation: {0}")]
    Contract(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TroikaError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TroikaError>;
