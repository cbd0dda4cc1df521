//! Plan-text parsing: `@@@task` blocks in and out.
//!
//! A coordinator's plan is free text containing zero or more blocks:
//!
//! ```text
//! @@@task
//! # <title>
//!
//! ## Objective
//! <free text until the next section>
//!
//! ## Scope
//! - <item>
//!
//! ## Definition of Done
//! - <criterion>
//!
//! ## Verification
//! - <command>
//! @@@
//! ```
//!
//! Opening and closing markers sit on their own lines; everything outside
//! blocks is ignored. The parser never fails: malformed input yields empty
//! fields, a whitespace-only body still yields a default-titled task.

use troika_common::TaskRecord;

const OPEN_MARKER: &str = "@@@task";
const CLOSE_MARKER: &str = "@@@";
const DEFAULT_TITLE: &str = "Untitled Task";

const SECTION_OBJECTIVE: &str = "## Objective";
const SECTION_SCOPE: &str = "## Scope";
const SECTION_DONE: &str = "## Definition of Done";
const SECTION_VERIFICATION: &str = "## Verification";

/// Extract every `@@@task` block from the plan text into task records.
pub fn parse_plan(text: &str) -> Vec<TaskRecord> {
    extract_blocks(text).iter().map(|b| parse_block(b)).collect()
}

/// Collect the body lines of each block, in order.
fn extract_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        match current {
            None if trimmed == OPEN_MARKER => current = Some(Vec::new()),
            None => {}
            Some(ref mut body) => {
                if trimmed == CLOSE_MARKER {
                    blocks.push(body.join("\n"));
                    current = None;
                } else {
                    body.push(line);
                }
            }
        }
    }
    // An unterminated block is dropped; the grammar requires the closing
    // marker on its own line.
    blocks
}

fn parse_block(body: &str) -> TaskRecord {
    let mut task = TaskRecord::new(DEFAULT_TITLE);
    let mut objective_lines: Vec<&str> = Vec::new();
    let mut section: Option<&str> = None;
    let mut title_seen = false;

    for line in body.lines() {
        let trimmed = line.trim();

        if !title_seen && section.is_none() {
            if let Some(rest) = trimmed.strip_prefix("# ") {
                let title = rest.trim();
                if !title.is_empty() {
                    task.title = title.to_string();
                }
                title_seen = true;
                continue;
            }
        }

        if trimmed == SECTION_OBJECTIVE {
            section = Some(SECTION_OBJECTIVE);
            continue;
        } else if trimmed == SECTION_SCOPE {
            section = Some(SECTION_SCOPE);
            continue;
        } else if trimmed == SECTION_DONE {
            section = Some(SECTION_DONE);
            continue;
        } else if trimmed == SECTION_VERIFICATION {
            section = Some(SECTION_VERIFICATION);
            continue;
        } else if trimmed.starts_with("## ") {
            // Unknown section: consume until the next known header.
            section = None;
            continue;
        }

        match section {
            Some(SECTION_OBJECTIVE) => objective_lines.push(line),
            Some(SECTION_SCOPE) => push_item(&mut task.scope, trimmed),
            Some(SECTION_DONE) => push_item(&mut task.acceptance_criteria, trimmed),
            Some(SECTION_VERIFICATION) => push_item(&mut task.verification_commands, trimmed),
            _ => {}
        }
    }

    task.objective = objective_lines.join("\n").trim().to_string();
    task
}

fn push_item(items: &mut Vec<String>, line: &str) {
    if let Some(rest) = line.strip_prefix('-') {
        let item = rest.trim();
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
}

/// Render tasks back into canonical block form. Parsing the rendered text
/// yields the same records modulo ids and timestamps.
pub fn render_plan(tasks: &[TaskRecord]) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(OPEN_MARKER);
        out.push('\n');
        out.push_str(&format!("# {}\n\n", task.title));

        out.push_str(SECTION_OBJECTIVE);
        out.push('\n');
        if !task.objective.is_empty() {
            out.push_str(&task.objective);
            out.push('\n');
        }
        out.push('\n');

        render_items(&mut out, SECTION_SCOPE, &task.scope);
        render_items(&mut out, SECTION_DONE, &task.acceptance_criteria);
        render_items(&mut out, SECTION_VERIFICATION, &task.verification_commands);

        out.push_str(CLOSE_MARKER);
        out.push('\n');
        out.push('\n');
    }
    out
}

fn render_items(out: &mut String, header: &str, items: &[String]) {
    out.push_str(header);
    out.push('\n');
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}
