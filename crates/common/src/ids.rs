//! Id and timestamp helpers shared by all entities.

use uuid::Uuid;

/// Generate a prefixed entity id, e.g. `task_1f6c0d…`.
///
/// Uuid-backed so that agents and tasks created in the same instant (a wave
/// spawns several at once) cannot collide.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_prefixed_and_unique() {
        let a = new_id("agent");
        let b = new_id("agent");
        assert!(a.starts_with("agent_"));
        assert_ne!(a, b);
    }

    #[test]
    fn now_millis_is_monotonic_enough() {
        let t1 = now_millis();
        let t2 = now_millis();
        assert!(t2 >= t1);
    }
}
