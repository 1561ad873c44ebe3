//! Workflow State
//!
//! The single source of truth for a run: which steps are done, in the order
//! they finished, and the values captured along the way. The engine owns the
//! live instance and mutates it exactly once per completed step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Captured values keyed by name. Sorted keys keep the saved file diff-friendly.
pub type Values = BTreeMap<String, Value>;

/// Persisted progress of a do-nothing workflow.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WorkflowState {
    /// Names of finished steps, in completion order, without duplicates
    #[serde(default)]
    pub completed_steps: Vec<String>,

    /// Last value captured under each key
    #[serde(default)]
    pub values: Values,
}

impl WorkflowState {
    /// Creates a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the named step is recorded as finished.
    pub fn is_completed(&self, step_name: &str) -> bool {
        self.completed_steps.iter().any(|name| name == step_name)
    }

    /// Records a step as finished and merges the values it captured.
    ///
    /// Marking an already-completed step again only merges the values.
    pub fn mark_completed(&mut self, step_name: &str, captured: Values) {
        if !self.is_completed(step_name) {
            self.completed_steps.push(step_name.to_string());
        }
        self.values.extend(captured);
    }

    /// Returns true if this state came from an earlier run that got somewhere.
    pub fn is_resume(&self) -> bool {
        !self.completed_steps.is_empty()
    }

    /// Returns the captured value for a key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Drops repeated step names, keeping the first occurrence.
    ///
    /// Returns the names that were removed.
    pub(crate) fn dedup_completed(&mut self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.completed_steps.len());
        let mut removed = Vec::new();

        for name in self.completed_steps.drain(..) {
            if seen.contains(&name) {
                removed.push(name);
            } else {
                seen.push(name);
            }
        }

        self.completed_steps = seen;
        removed
    }
}

/// Returns true if a value can live in the `values` map.
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_creation() {
        let state = WorkflowState::new();
        assert!(state.completed_steps.is_empty());
        assert!(state.values.is_empty());
        assert!(!state.is_resume());
    }

    #[test]
    fn test_mark_completed_keeps_order() {
        let mut state = WorkflowState::new();
        state.mark_completed("second", Values::new());
        state.mark_completed("first", Values::new());

        assert_eq!(state.completed_steps, vec!["second", "first"]);
        assert!(state.is_resume());
    }

    #[test]
    fn test_mark_completed_twice_is_unique() {
        let mut state = WorkflowState::new();
        state.mark_completed("step1", Values::new());
        state.mark_completed("step1", Values::new());

        assert_eq!(state.completed_steps.len(), 1);
    }

    #[test]
    fn test_mark_completed_merges_values() {
        let mut state = WorkflowState::new();
        state.values.insert("env".to_string(), json!("staging"));
        state.values.insert("port".to_string(), json!(8080));

        let mut captured = Values::new();
        captured.insert("env".to_string(), json!("prod"));
        state.mark_completed("choose_env", captured);

        assert_eq!(state.value("env"), Some(&json!("prod")));
        assert_eq!(state.value("port"), Some(&json!(8080)));
    }

    #[test]
    fn test_dedup_completed() {
        let mut state = WorkflowState::new();
        state.completed_steps = vec!["a".into(), "b".into(), "a".into(), "c".into(), "b".into()];

        let removed = state.dedup_completed();

        assert_eq!(state.completed_steps, vec!["a", "b", "c"]);
        assert_eq!(removed, vec!["a", "b"]);
    }

    #[test]
    fn test_is_scalar() {
        assert!(is_scalar(&json!("text")));
        assert!(is_scalar(&json!(3)));
        assert!(is_scalar(&json!(true)));
        assert!(is_scalar(&Value::Null));
        assert!(!is_scalar(&json!([1, 2])));
        assert!(!is_scalar(&json!({"a": 1})));
    }

    #[test]
    fn test_state_serialization_roundtrip() {
        let mut state = WorkflowState::new();
        let mut captured = Values::new();
        captured.insert("age".to_string(), json!("30"));
        state.mark_completed("step1", captured);
        state.mark_completed("step2", Values::new());

        let json = serde_json::to_string_pretty(&state).unwrap();
        let loaded: WorkflowState = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded, state);
    }
}
