//! donothing - Resumable Do-Nothing Scripting
//!
//! Encodes a manual procedure as an ordered list of named steps. Each step
//! either tells the operator what to do and waits, or does a little of the
//! work itself. Progress is saved after every step to a hand-editable JSON
//! file, so the procedure can be interrupted, resumed, or adjusted between
//! runs, and automated one step at a time.
//!
//! # Architecture
//!
//! - [`workflow`]: Steps, progress state and the progress file
//! - [`execution`]: The engine that runs steps in order and checkpoints them
//! - [`interaction`]: Blocking operator prompts used inside step bodies
//! - [`monitoring`]: Step timeline for the end-of-run summary
//! - [`cli`]: `new` / `load` / `template` command line for any workflow
//!
//! # Example
//!
//! ```rust,no_run
//! use donothing::interaction::{validators, ValueRequest};
//! use donothing::workflow::{Step, Workflow};
//!
//! fn main() -> std::process::ExitCode {
//!     let mut workflow = Workflow::new("RotateCredentials");
//!     workflow
//!         .add_step(Step::new("pick_service", |ctx| {
//!             ctx.set_value_from_input(
//!                 ValueRequest::new("service", "Which service?")
//!                     .with_validator(validators::non_empty()),
//!             )?;
//!             Ok(())
//!         }))
//!         .unwrap()
//!         .add_step(Step::new("rotate", |ctx| {
//!             let service = ctx.value_str("service").unwrap_or("the service").to_string();
//!             ctx.wait_for_done(&format!("Rotate the credentials for {}.", service))?;
//!             Ok(())
//!         }))
//!         .unwrap();
//!
//!     donothing::cli::run_main(workflow)
//! }
//! ```

pub mod cli;
pub mod error;
pub mod execution;
pub mod interaction;
pub mod monitoring;
pub mod workflow;

// Re-export commonly used types
pub use error::{EngineError, StoreError, ValidationError};
pub use execution::{Engine, RunOutcome, StepContext};
pub use interaction::{Prompter, ValueRequest};
pub use workflow::{Step, StepResult, Workflow, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "donothing";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "donothing");
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::new("test", |_| Ok(()));
        assert_eq!(step.name, "test");
    }

    #[test]
    fn test_module_exports_workflow() {
        let workflow = Workflow::new("Exports");
        assert!(workflow.is_empty());
        assert_eq!(WorkflowState::new().completed_steps.len(), 0);
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
