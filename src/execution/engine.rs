//! Workflow Execution Engine
//!
//! Drives a [`Workflow`] against its progress file:
//! - loads earlier progress, or starts fresh
//! - runs every step not yet recorded as complete, in declared order
//! - saves progress after each completed step, before the next one starts
//! - stops at the first failing step, leaving progress as it was before it
//!
//! Re-running against the same progress file resumes at the first
//! incomplete step. Removing a name from `completed_steps` by hand makes that
//! step run again; adding one makes the engine skip it.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::error::{EngineError, StepExecutionError, StoreError};
use crate::interaction::Prompter;
use crate::monitoring::{EventType, ExecutionTimeline};
use crate::workflow::{
    check_state, validate_workflow, Annotations, ProgressStore, Workflow, WorkflowState,
};

use super::status::{RunPhase, StepStatus};
use super::step::execute_step;

/// Exit status for a run that completed every step.
pub const EXIT_ALL_DONE: u8 = 0;

/// Exit status for a run that stopped at a failing step.
pub const EXIT_HALTED: u8 = 2;

/// Exit status for fatal errors (corrupt or unwritable progress file, bad usage).
pub const EXIT_FATAL: u8 = 1;

/// Steps touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps that ran and completed in this run, in order
    pub executed: Vec<String>,

    /// Steps skipped because the progress file already listed them
    pub skipped: Vec<String>,
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step is complete
    AllDone(RunSummary),

    /// A step failed; later steps did not run
    Halted {
        summary: RunSummary,
        error: StepExecutionError,
    },
}

impl RunOutcome {
    pub fn is_all_done(&self) -> bool {
        matches!(self, Self::AllDone(_))
    }

    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::AllDone(summary) | Self::Halted { summary, .. } => summary,
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AllDone(_) => EXIT_ALL_DONE,
            Self::Halted { .. } => EXIT_HALTED,
        }
    }
}

/// Workflow execution engine.
///
/// Owns the workflow and the live [`WorkflowState`] for the duration of a run.
///
/// # Example
///
/// ```rust,no_run
/// use donothing::execution::Engine;
/// use donothing::interaction::Prompter;
/// use donothing::workflow::{Step, Workflow};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut workflow = Workflow::new("Rotate");
///     workflow.add_step(Step::new("revoke_old_key", |ctx| {
///         ctx.wait_for_done("Revoke the old key in the console.")?;
///         Ok(())
///     }))?;
///
///     let mut engine = Engine::new(workflow, ".nothing/Rotate.json");
///     let outcome = engine.run(&mut Prompter::stdio())?;
///     assert!(outcome.is_all_done());
///     Ok(())
/// }
/// ```
pub struct Engine {
    workflow: Workflow,
    store: ProgressStore,
    state: WorkflowState,
    statuses: Vec<StepStatus>,
    phase: RunPhase,
    timeline: ExecutionTimeline,
}

impl Engine {
    /// Creates an engine that keeps progress at `progress_path`.
    pub fn new(workflow: Workflow, progress_path: impl Into<PathBuf>) -> Self {
        let store = ProgressStore::new(progress_path).with_annotations(annotations_for(&workflow));
        let statuses = vec![StepStatus::Pending; workflow.len()];

        Self {
            workflow,
            store,
            state: WorkflowState::new(),
            statuses,
            phase: RunPhase::Fresh,
            timeline: ExecutionTimeline::new(),
        }
    }

    /// Returns the progress file path.
    pub fn progress_path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the workflow being run.
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Returns the live state (durable up to the last successful save).
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Returns the run phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Returns the status of a step in this run.
    pub fn step_status(&self, name: &str) -> Option<StepStatus> {
        self.workflow
            .steps
            .iter()
            .position(|step| step.name == name)
            .map(|index| self.statuses[index])
    }

    /// Returns the step events recorded so far.
    pub fn timeline(&self) -> &ExecutionTimeline {
        &self.timeline
    }

    /// Executes the workflow.
    ///
    /// # Returns
    ///
    /// * `Ok(RunOutcome::AllDone)` - Every step is complete
    /// * `Ok(RunOutcome::Halted)` - A step failed; progress before it is saved
    /// * `Err` - The step list is invalid, or the progress file is corrupt or
    ///   could not be written; no further step runs
    pub fn run(&mut self, prompter: &mut Prompter<'_>) -> Result<RunOutcome, EngineError> {
        let result = self.execute(prompter);
        if result.is_err() {
            self.phase = RunPhase::Halted;
        }
        result
    }

    fn execute(&mut self, prompter: &mut Prompter<'_>) -> Result<RunOutcome, EngineError> {
        validate_workflow(&self.workflow)?;

        self.state = self.store.load()?;
        self.phase = if self.state.is_resume() {
            RunPhase::Resumed
        } else {
            RunPhase::Fresh
        };
        self.statuses = vec![StepStatus::Pending; self.workflow.len()];

        info!(
            "Progress will be saved to: {} ({} run)",
            self.store.path().display(),
            self.phase
        );
        check_state(&self.workflow, &self.state);

        // Make sure the file exists (and its step list is current) before the first step
        self.store.save(&self.state)?;

        let mut summary = RunSummary::default();

        for (index, step) in self.workflow.steps.iter_mut().enumerate() {
            if self.state.is_completed(&step.name) {
                info!("Step {} '{}' already complete - skipping", index, step.name);
                set_status(&mut self.statuses, index, StepStatus::Skipped);
                self.timeline.add_event(&step.name, EventType::Skipped);
                summary.skipped.push(step.name.clone());
                continue;
            }

            info!("*** STEP {} '{}' STARTING ***", index, step.name);
            if let Some(description) = &step.description {
                info!("{}", description);
            }
            set_status(&mut self.statuses, index, StepStatus::Running);
            self.timeline.add_event(&step.name, EventType::Started);

            match execute_step(step, prompter, &self.state.values) {
                Ok(captured) => {
                    let mut next = self.state.clone();
                    next.mark_completed(&step.name, captured);

                    if let Err(e) = self.store.save(&next) {
                        error!(
                            "Step '{}' finished but its progress could not be saved",
                            step.name
                        );
                        set_status(&mut self.statuses, index, StepStatus::Failed);
                        self.timeline.add_event(&step.name, EventType::Failed);
                        return Err(e.into());
                    }

                    self.state = next;
                    set_status(&mut self.statuses, index, StepStatus::Completed);
                    self.timeline.add_event(&step.name, EventType::Completed);
                    summary.executed.push(step.name.clone());
                    info!("*** STEP {} '{}' COMPLETE ***", index, step.name);
                }
                Err(source) => {
                    set_status(&mut self.statuses, index, StepStatus::Failed);
                    self.timeline.add_event(&step.name, EventType::Failed);
                    self.phase = RunPhase::Halted;

                    // Rewrites the pre-step state, so a retry starts from the same place
                    persist_unchanged(&self.store, &self.state)?;

                    let error = StepExecutionError {
                        step: step.name.clone(),
                        source,
                    };
                    error!("*** STEP {} '{}' FAILED ***", index, step.name);
                    warn!(
                        "Fix the problem, then re-run with the same progress file to resume at '{}'",
                        step.name
                    );
                    return Ok(RunOutcome::Halted { summary, error });
                }
            }
        }

        self.phase = RunPhase::AllDone;
        info!("*** WORKFLOW COMPLETE ***");
        Ok(RunOutcome::AllDone(summary))
    }
}

/// Writes an editable progress file with no steps completed and runs nothing.
pub fn write_template(workflow: &Workflow, path: impl Into<PathBuf>) -> Result<PathBuf, StoreError> {
    let store = ProgressStore::new(path).with_annotations(annotations_for(workflow));
    store.save(&WorkflowState::new())?;
    info!("Template saved to: {}", store.path().display());
    Ok(store.path().to_path_buf())
}

fn annotations_for(workflow: &Workflow) -> Annotations {
    Annotations::new(workflow.name.clone(), workflow.step_names())
}

fn set_status(statuses: &mut [StepStatus], index: usize, next: StepStatus) {
    debug_assert!(
        statuses[index].can_become(next),
        "invalid step transition {} -> {}",
        statuses[index],
        next
    );
    statuses[index] = next;
}

fn persist_unchanged(store: &ProgressStore, state: &WorkflowState) -> Result<(), EngineError> {
    store.save(state).map_err(|e| {
        error!("Could not save progress after step failure: {}", e);
        EngineError::from(e)
    })
}
