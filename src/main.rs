//! donothing Demo Entry Point
//!
//! A small do-nothing workflow showing each kind of step: one automated,
//! one capturing a validated value, one waiting for the operator.
//!
//! # Usage
//!
//! ```bash
//! # Start fresh
//! donothing new
//!
//! # Resume an interrupted run
//! donothing load .nothing/Demo_20261018-093000.json
//!
//! # Write an editable progress file
//! donothing template
//! ```

use std::process::ExitCode;

use chrono::{Datelike, Local};

use donothing::error::RegistryError;
use donothing::interaction::{validators, ValueRequest};
use donothing::workflow::{Step, Workflow};

/// Builds the demo workflow.
fn demo_workflow() -> Result<Workflow, RegistryError> {
    let mut workflow = Workflow::new("Demo").with_description("Demo workflow for donothing");

    workflow
        .add_step(
            Step::new("set_var_1", |ctx| {
                ctx.set_value("var_1", Local::now().day())?;
                Ok(())
            })
            .with_description("Record today's day of the month"),
        )?
        .add_step(
            Step::new("set_var_2", |ctx| {
                ctx.set_value_from_input(
                    ValueRequest::new("var_2", "Input a string")
                        .with_hint("Either A or B or C")
                        .with_validator(validators::one_of(["A", "B", "C"])),
                )?;
                Ok(())
            })
            .with_description("Choose an option"),
        )?
        .add_step(
            Step::new("confirm", |ctx| {
                let choice = ctx.value_str("var_2").unwrap_or("?").to_string();
                ctx.wait_for_done(&format!("Go and do the thing for option {}.", choice))?;
                Ok(())
            })
            .with_description("Do the manual part"),
        )?;

    Ok(workflow)
}

fn main() -> ExitCode {
    match demo_workflow() {
        Ok(workflow) => donothing::cli::run_main(workflow),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
