//! Message and completion-report types for inter-agent communication.

use crate::ids::now_millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a message within an agent's transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// A single entry in an agent's append-only conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Agent whose transcript this message belongs to
    pub agent_id: String,

    /// Turn number within the conversation (if tracked)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u32>,

    /// Role of the sender
    pub role: MessageRole,

    /// Message content
    pub content: String,

    /// Source agent (if sent by another agent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_agent_id: Option<String>,

    /// Timestamp (Unix millis)
    pub timestamp: u64,
}

impl Message {
    pub fn user(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            turn: None,
            role: MessageRole::User,
            content: content.into(),
            from_agent_id: None,
            timestamp: now_millis(),
        }
    }

    pub fn system(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            turn: None,
            role: MessageRole::System,
            content: content.into(),
            from_agent_id: None,
            timestamp: now_millis(),
        }
    }

    pub fn from_agent(
        agent_id: impl Into<String>,
        from: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            turn: None,
            role: MessageRole::Agent,
            content: content.into(),
            from_agent_id: Some(from.into()),
            timestamp: now_millis(),
        }
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = Some(turn);
        self
    }
}

/// Report a crafter files when its task is done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    /// Reporting agent
    pub agent_id: String,

    /// Task the report covers
    pub task_id: String,

    /// 1-3 sentence summary of what was done
    pub summary: String,

    /// Files touched while executing the task
    #[serde(default)]
    pub files_modified: Vec<String>,

    /// Verification command -> captured output
    #[serde(default)]
    pub verification_results: BTreeMap<String, String>,

    /// Whether the crafter considers the task done
    pub success: bool,
}

impl CompletionReport {
    pub fn new(
        agent_id: impl Into<String>,
        task_id: impl Into<String>,
        summary: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_id: task_id.into(),
            summary: summary.into(),
            files_modified: Vec::new(),
            verification_results: BTreeMap::new(),
            success,
        }
    }

    /// Render the report as transcript text for the parent's conversation.
    pub fn to_transcript_text(&self) -> String {
        let mut text = format!(
            "Completion Report from {} for task {}\nSummary: {}\nSuccess: {}",
            self.agent_id, self.task_id, self.summary, self.success
        );
        if !self.files_modified.is_empty() {
            text.push_str(&format!("\nFiles modified: {}", self.files_modified.join(", ")));
        }
        for (cmd, output) in &self.verification_results {
            text.push_str(&format!("\nVerification `{}`: {}", cmd, output));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        let m = Message::user("a1", "hi");
        assert_eq!(m.role, MessageRole::User);
        assert!(m.from_agent_id.is_none());

        let m = Message::from_agent("a1", "a2", "ping");
        assert_eq!(m.role, MessageRole::Agent);
        assert_eq!(m.from_agent_id.as_deref(), Some("a2"));

        let m = Message::system("a1", "note").with_turn(3);
        assert_eq!(m.role, MessageRole::System);
        assert_eq!(m.turn, Some(3));
    }

    #[test]
    fn report_transcript_text() {
        let mut report = CompletionReport::new("agent_c", "task_1", "Implemented the API.", true);
        report.files_modified.push("src/api.rs".into());
        report
            .verification_results
            .insert("cargo test".into(), "ok".into());

        let text = report.to_transcript_text();
        assert!(text.contains("Completion Report from agent_c"));
        assert!(text.contains("src/api.rs"));
        assert!(text.contains("cargo test"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::System).unwrap(),
            "\"system\""
        );
    }
}
