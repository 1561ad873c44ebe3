//! Workflow Execution Module
//!
//! Runs workflow steps one at a time, in order, checkpointing progress after
//! each one so an interrupted procedure can be resumed.
//!
//! # Architecture
//!
//! - [`engine`]: Main execution engine driving a workflow run
//! - [`step`]: Single step invocation and the context a step body sees
//! - [`status`]: Run phases and per-step statuses

pub mod engine;
pub mod status;
pub mod step;

pub use engine::{
    write_template, Engine, RunOutcome, RunSummary, EXIT_ALL_DONE, EXIT_FATAL, EXIT_HALTED,
};
pub use status::{RunPhase, StepStatus};
pub use step::{execute_step, StepContext};
