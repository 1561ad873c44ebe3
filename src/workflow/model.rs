//! Workflow Data Model
//!
//! A workflow is an ordered list of named steps. Each step pairs a stable
//! name (the resume key written to the progress file) with the behavior to
//! run. Steps are registered explicitly, in the order they should execute.
//!
//! # Example
//!
//! ```
//! use donothing::workflow::{Step, Workflow};
//!
//! let mut workflow = Workflow::new("Release");
//! workflow
//!     .add_step(Step::new("announce", |ctx| {
//!         ctx.wait_for_done("Post the release notice in the team channel.")?;
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! assert_eq!(workflow.step_names(), vec!["announce"]);
//! ```

use std::fmt;

use crate::error::{BoxError, RegistryError};
use crate::execution::StepContext;

/// Outcome of a step body.
pub type StepResult = Result<(), BoxError>;

type Action = Box<dyn FnMut(&mut StepContext<'_, '_>) -> StepResult>;

/// One named unit of work.
pub struct Step {
    /// Unique name, stable across runs
    pub name: String,

    /// One-line summary shown in the run banner
    pub description: Option<String>,

    action: Action,
}

impl Step {
    /// Creates a step from a name and the closure that performs it.
    ///
    /// Values captured through the [`StepContext`] are merged into the
    /// workflow state only if the closure returns `Ok`.
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&mut StepContext<'_, '_>) -> StepResult + 'static,
    {
        Self {
            name: name.into().trim().to_string(),
            description: None,
            action: Box::new(action),
        }
    }

    /// Sets the summary shown when the step starts.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Invokes the step body.
    pub(crate) fn run(&mut self, ctx: &mut StepContext<'_, '_>) -> StepResult {
        (self.action)(ctx)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A named, ordered collection of steps.
#[derive(Debug)]
pub struct Workflow {
    /// Name used in file names and the progress file header
    pub name: String,

    /// One-line description for the command-line help
    pub description: String,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("{} do-nothing workflow", name),
            name,
            steps: Vec::new(),
        }
    }

    /// Sets the description shown by `--help`.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a step, rejecting empty or duplicate names.
    pub fn add_step(&mut self, step: Step) -> Result<&mut Self, RegistryError> {
        if step.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(&step.name) {
            return Err(RegistryError::DuplicateStep(step.name));
        }

        self.steps.push(step);
        Ok(self)
    }

    /// Returns true if a step with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|step| step.name == name)
    }

    /// Returns step names in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name.clone()).collect()
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no steps are registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
