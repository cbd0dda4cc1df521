//! Gate, the verifying role, and verdict parsing over its output.

use tracing::warn;
use troika_common::VerificationVerdict;

pub const GATE_SYSTEM_PROMPT: &str = r#"You are the Gate, the verification reviewer. Your role is to:

1. Review every task in the completed wave against its Definition of Done
2. Read the crafters' conversations and completion reports for evidence
3. Re-run or inspect the Verification commands where output is provided
4. Render exactly one verdict per reviewed wave: APPROVED or NOT APPROVED
5. When rejecting, name the failing criteria so the next wave can fix them

Be strict: unverified work is NOT APPROVED. If you cannot determine the
outcome at all, say so without using either marker.
"#;

/// Parse a gate's free-text output into a verdict.
///
/// Scans case-insensitively for the markers `APPROVED` / `NOT APPROVED`
/// (underscore form tolerated, emoji or check/cross prefixes irrelevant since
/// matching is positional-free). `NOT APPROVED` wins when both appear;
/// neither marker means the gate could not judge the wave.
pub fn parse_verdict(output: &str) -> VerificationVerdict {
    let normalized = output.to_uppercase().replace('_', " ");

    let not_approved = normalized.contains("NOT APPROVED");
    // Remove the compound marker before looking for the bare one, otherwise
    // every NOT APPROVED would also read as APPROVED.
    let approved = normalized.replace("NOT APPROVED", "").contains("APPROVED");

    match (not_approved, approved) {
        (true, true) => {
            warn!("Gate output contains both APPROVED and NOT APPROVED; treating as NOT APPROVED");
            VerificationVerdict::NotApproved
        }
        (true, false) => VerificationVerdict::NotApproved,
        (false, true) => VerificationVerdict::Approved,
        (false, false) => VerificationVerdict::Blocked,
    }
}
