//! Task records for agent coordination.

use crate::ids::{new_id, now_millis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    ReviewRequired,
    Completed,
    NeedsFix,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// Status lattice:
    /// Pending -> InProgress -> ReviewRequired -> {Completed | NeedsFix};
    /// NeedsFix -> Pending is the only back-edge. Blocked and Cancelled are
    /// sinks for the current wave.
    pub fn can_transition(&self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Blocked)
                | (Pending, Cancelled)
                | (InProgress, ReviewRequired)
                | (InProgress, Blocked)
                | (InProgress, Cancelled)
                | (ReviewRequired, Completed)
                | (ReviewRequired, NeedsFix)
                | (ReviewRequired, Blocked)
                | (NeedsFix, Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::ReviewRequired => "review_required",
            TaskStatus::Completed => "completed",
            TaskStatus::NeedsFix => "needs_fix",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict a gate renders over a reviewed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationVerdict {
    Approved,
    NotApproved,
    Blocked,
}

/// A unit of work delegated to a crafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task ID
    pub id: String,

    /// One-line title
    pub title: String,

    /// What must be accomplished
    pub objective: String,

    /// Ordered scope items
    #[serde(default)]
    pub scope: Vec<String>,

    /// Definition-of-done criteria
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,

    /// Commands or checks the crafter runs to verify its work
    #[serde(default)]
    pub verification_commands: Vec<String>,

    /// Agent currently assigned (set iff in_progress/review_required/needs_fix)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Task ids that must complete before this one is ready
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Tasks sharing a group may run in the same wave
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<String>,

    /// Workspace this task belongs to
    pub workspace_id: String,

    /// Creation timestamp (Unix millis)
    pub created_at: u64,

    /// Last update timestamp
    pub updated_at: u64,

    /// Summary the crafter reported on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_summary: Option<String>,

    /// Verdict recorded by the last verification pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_verdict: Option<VerificationVerdict>,

    /// Raw gate output backing the verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_report: Option<String>,
}

impl TaskRecord {
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id("task"),
            title: title.into(),
            objective: String::new(),
            scope: Vec::new(),
            acceptance_criteria: Vec::new(),
            verification_commands: Vec::new(),
            assigned_to: None,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            parallel_group: None,
            workspace_id: String::new(),
            created_at: now,
            updated_at: now,
            completion_summary: None,
            verification_verdict: None,
            verification_report: None,
        }
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.dependencies.push(task_id.into());
        self
    }

    /// Slug of the title suitable for agent names: lowercase, alphanumeric
    /// runs joined by dashes, capped at 32 chars.
    pub fn title_slug(&self) -> String {
        let mut slug = String::new();
        let mut last_dash = true;
        for c in self.title.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
            if slug.len() >= 32 {
                break;
            }
        }
        slug.trim_matches('-').to_string()
    }
}
