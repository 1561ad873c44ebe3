//! Workflow Validation
//!
//! Checks run by the engine before any step executes:
//! - the step list has non-empty, unique names
//! - the loaded progress only refers to steps this workflow knows about

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::error::RegistryError;

use super::model::Workflow;
use super::state::WorkflowState;

/// Something odd about loaded progress that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateIssue {
    /// A completed name that no registered step carries
    UnknownCompletedStep(String),
}

impl std::fmt::Display for StateIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCompletedStep(name) => write!(
                f,
                "completed step '{}' is not part of this workflow and will be ignored",
                name
            ),
        }
    }
}

/// Validates step names.
///
/// [`Workflow::add_step`] already enforces this, but `steps` is public and
/// may have been assembled by hand.
pub fn validate_workflow(workflow: &Workflow) -> Result<(), RegistryError> {
    if workflow.is_empty() {
        warn!("Workflow '{}' has no steps", workflow.name);
        return Ok(());
    }

    let mut seen = HashSet::new();
    for step in &workflow.steps {
        if step.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !seen.insert(step.name.as_str()) {
            return Err(RegistryError::DuplicateStep(step.name.clone()));
        }
    }

    debug!(
        "Workflow '{}' has {} valid steps",
        workflow.name,
        workflow.len()
    );
    Ok(())
}

/// Compares loaded progress against the registered steps.
///
/// Unknown names are tolerated (a newer or older version of the workflow may
/// have written them) and logged; they are never invoked.
pub fn check_state(workflow: &Workflow, state: &WorkflowState) -> Vec<StateIssue> {
    let issues: Vec<StateIssue> = state
        .completed_steps
        .iter()
        .filter(|name| !workflow.contains(name))
        .map(|name| StateIssue::UnknownCompletedStep(name.clone()))
        .collect();

    for issue in &issues {
        warn!("{}", issue);
    }

    let known = state.completed_steps.len() - issues.len();
    if known > 0 {
        info!(
            "{} of {} steps already completed",
            known,
            workflow.len()
        );
    }

    issues
}
