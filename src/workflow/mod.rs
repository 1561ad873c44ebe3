//! Workflow Definition Module
//!
//! Data structures for describing a do-nothing workflow and persisting its
//! progress.
//!
//! # Structure
//!
//! - [`model`]: Steps and the ordered workflow that holds them
//! - [`state`]: Completed steps and captured values
//! - [`store`]: Crash-safe, hand-editable progress file
//! - [`validator`]: Name checks and progress/step consistency

pub mod model;
pub mod state;
pub mod store;
pub mod validator;

pub use model::{Step, StepResult, Workflow};
pub use state::{Values, WorkflowState};
pub use store::{Annotations, ProgressStore};
pub use validator::{check_state, validate_workflow, StateIssue};
