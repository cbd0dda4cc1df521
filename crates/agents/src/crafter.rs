//! Crafter, the implementing role.

use troika_common::{CompletionReport, TaskRecord};

pub const CRAFTER_SYSTEM_PROMPT: &str = r#"You are a Crafter, an implementing agent. Your role is to:

1. Execute exactly the task you were delegated - nothing more
2. Stay inside the task's Scope; treat the Definition of Done as binding
3. Run every Verification command and capture its output
4. When finished, call report_to_parent with a 1-3 sentence summary, the
   files you modified, and the verification results
5. If you are blocked, say precisely what is missing instead of guessing

Work autonomously; the gate will review your result after the wave.
"#;

/// The briefing appended to a crafter's conversation when a task is
/// delegated to it.
pub fn task_briefing(task: &TaskRecord) -> String {
    let mut briefing = format!("You have been assigned task: {}\n", task.title);

    if !task.objective.is_empty() {
        briefing.push_str(&format!("\nObjective:\n{}\n", task.objective));
    }
    if !task.scope.is_empty() {
        briefing.push_str("\nScope:\n");
        for item in &task.scope {
            briefing.push_str(&format!("- {}\n", item));
        }
    }
    if !task.acceptance_criteria.is_empty() {
        briefing.push_str("\nDefinition of Done:\n");
        for item in &task.acceptance_criteria {
            briefing.push_str(&format!("- {}\n", item));
        }
    }
    if !task.verification_commands.is_empty() {
        briefing.push_str("\nVerification:\n");
        for item in &task.verification_commands {
            briefing.push_str(&format!("- {}\n", item));
        }
    }
    briefing.push_str("\nCall report_to_parent when done.");
    briefing
}

/// Synthesize the failure report used when a crafter run ends without it
/// ever calling `report_to_parent`.
pub fn fallback_report(agent_id: &str, task_id: &str, output: &str) -> CompletionReport {
    let digest: String = output.chars().take(200).collect();
    let summary = if digest.is_empty() {
        "Crafter run produced no output and filed no completion report.".to_string()
    } else {
        format!("Crafter run ended without a completion report. Output: {digest}")
    };
    CompletionReport::new(agent_id, task_id, summary, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn briefing_carries_all_sections() {
        let mut task = TaskRecord::new("Implement Login API").with_objective("Build the endpoint.");
        task.scope.push("POST /login".into());
        task.acceptance_criteria.push("401 on bad creds".into());
        task.verification_commands.push("cargo test login".into());

        let briefing = task_briefing(&task);
        assert!(briefing.contains("Implement Login API"));
        assert!(briefing.contains("Build the endpoint."));
        assert!(briefing.contains("- POST /login"));
        assert!(briefing.contains("- 401 on bad creds"));
        assert!(briefing.contains("- cargo test login"));
        assert!(briefing.contains("report_to_parent"));
    }

    #[test]
    fn briefing_omits_empty_sections() {
        let task = TaskRecord::new("Bare");
        let briefing = task_briefing(&task);
        assert!(!briefing.contains("Scope:"));
        assert!(!briefing.contains("Definition of Done:"));
        assert!(!briefing.contains("Verification:"));
    }

    #[test]
    fn fallback_report_is_unsuccessful_and_truncated() {
        let long_output = "x".repeat(500);
        let report = fallback_report("agent_c", "task_1", &long_output);
        assert!(!report.success);
        assert_eq!(report.agent_id, "agent_c");
        assert_eq!(report.task_id, "task_1");
        assert!(report.summary.len() < 300);

        let report = fallback_report("agent_c", "task_1", "");
        assert!(report.summary.contains("no output"));
    }
}
