//! Individual Step Execution
//!
//! A step body receives a [`StepContext`]: read access to the values captured
//! by earlier steps, a scratch map for the values this step captures, and the
//! operator prompts. The scratch map is merged into the workflow state only
//! when the body returns `Ok`, so a failed step leaves no trace.

use std::io;

use log::{debug, error};
use serde_json::Value;

use crate::error::{BoxError, ValidationError};
use crate::interaction::{Prompter, ValueRequest};
use crate::workflow::state::{is_scalar, Values};
use crate::workflow::Step;

/// Everything a step body may touch while it runs.
pub struct StepContext<'p, 's> {
    step_name: &'p str,
    prompter: &'p mut Prompter<'s>,
    previous: &'p Values,
    captured: Values,
}

impl<'p, 's> StepContext<'p, 's> {
    pub fn new(step_name: &'p str, prompter: &'p mut Prompter<'s>, previous: &'p Values) -> Self {
        Self {
            step_name,
            prompter,
            previous,
            captured: Values::new(),
        }
    }

    /// Name of the running step.
    pub fn step_name(&self) -> &str {
        self.step_name
    }

    /// Latest value for a key: captured by this step, else by an earlier one.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.captured.get(key).or_else(|| self.previous.get(key))
    }

    /// Latest value for a key as text, if it is a string.
    pub fn value_str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    /// Captures a value without asking the operator.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), ValidationError> {
        let key = key.into();
        let value = value.into();
        if !is_scalar(&value) {
            return Err(ValidationError::new(format!(
                "value for '{}' must be a string, number, boolean or null",
                key
            )));
        }

        self.captured.insert(key, value);
        Ok(())
    }

    /// Values captured so far by this step.
    pub fn captured(&self) -> &Values {
        &self.captured
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        self.prompter.say(message)
    }

    pub fn get_input(&mut self, message: &str) -> io::Result<String> {
        self.prompter.get_input(message)
    }

    pub fn get_input_with_hint(&mut self, message: &str, hint: &str) -> io::Result<String> {
        self.prompter.get_input_with_hint(message, hint)
    }

    pub fn wait_for_done(&mut self, message: &str) -> io::Result<()> {
        self.prompter.wait_for_done(message)
    }

    pub fn report_problem(&mut self, message: &str) -> io::Result<()> {
        self.prompter.report_problem(message)
    }

    /// Asks the operator for a value and captures it under the request's key.
    ///
    /// An existing value (from this step, an earlier step, or a hand edit of
    /// the progress file) is offered as the default.
    pub fn set_value_from_input(&mut self, request: ValueRequest) -> io::Result<Value> {
        let current = self.value(&request.key).cloned();
        let value = self.prompter.prompt_value(&request, current)?;
        self.captured.insert(request.key, value.clone());
        Ok(value)
    }

    fn into_captured(self) -> Values {
        self.captured
    }
}

/// Runs one step body and returns what it captured.
///
/// # Returns
///
/// * `Ok(values)` - Step finished; `values` should be merged into the state
/// * `Err` - Step failed; nothing it captured is kept
pub fn execute_step(
    step: &mut Step,
    prompter: &mut Prompter<'_>,
    previous: &Values,
) -> Result<Values, BoxError> {
    let name = step.name.clone();
    let mut ctx = StepContext::new(&name, prompter, previous);

    match step.run(&mut ctx) {
        Ok(()) => {
            let captured = ctx.into_captured();
            debug!("Step '{}' captured {} value(s)", name, captured.len());
            Ok(captured)
        }
        Err(e) => {
            error!("Step '{}' failed: {}", name, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::validators;
    use serde_json::json;

    #[test]
    fn test_execute_step_returns_captured_values() {
        let mut step = Step::new("pick_env", |ctx| {
            ctx.set_value_from_input(
                ValueRequest::new("env", "Environment")
                    .with_validator(validators::one_of(["dev", "prod"])),
            )?;
            ctx.set_value("checked", true)?;
            Ok(())
        });

        let mut prompter = Prompter::new("qa\nprod\n".as_bytes(), io::sink(), io::sink());
        let captured = execute_step(&mut step, &mut prompter, &Values::new()).unwrap();

        assert_eq!(captured.get("env"), Some(&json!("prod")));
        assert_eq!(captured.get("checked"), Some(&json!(true)));
    }

    #[test]
    fn test_execute_step_failure_discards_values() {
        let mut step = Step::new("flaky", |ctx| {
            ctx.set_value("partial", "yes")?;
            Err("remote API returned 503".into())
        });

        let mut prompter = Prompter::new("".as_bytes(), io::sink(), io::sink());
        let err = execute_step(&mut step, &mut prompter, &Values::new()).unwrap_err();

        assert_eq!(err.to_string(), "remote API returned 503");
    }

    #[test]
    fn test_context_reads_previous_values() {
        let mut previous = Values::new();
        previous.insert("host".to_string(), json!("db-1"));
        previous.insert("port".to_string(), json!(5432));

        let mut prompter = Prompter::new("".as_bytes(), io::sink(), io::sink());
        let mut ctx = StepContext::new("connect", &mut prompter, &previous);

        assert_eq!(ctx.step_name(), "connect");
        assert_eq!(ctx.value_str("host"), Some("db-1"));

        ctx.set_value("host", "db-2").unwrap();
        assert_eq!(ctx.value_str("host"), Some("db-2"));
        assert_eq!(ctx.value("port"), Some(&json!(5432)));
        assert_eq!(ctx.captured().len(), 1);
    }

    #[test]
    fn test_set_value_rejects_nested() {
        let previous = Values::new();
        let mut prompter = Prompter::new("".as_bytes(), io::sink(), io::sink());
        let mut ctx = StepContext::new("s", &mut prompter, &previous);

        assert!(ctx.set_value("hosts", json!(["a", "b"])).is_err());
        assert!(ctx.captured().is_empty());
    }

    #[test]
    fn test_prompt_default_comes_from_previous_run() {
        let mut previous = Values::new();
        previous.insert("env".to_string(), json!("staging"));

        let mut prompter = Prompter::new("\n".as_bytes(), io::sink(), io::sink());
        let mut ctx = StepContext::new("s", &mut prompter, &previous);

        let value = ctx
            .set_value_from_input(ValueRequest::new("env", "Environment").with_default("prod"))
            .unwrap();
        assert_eq!(value, json!("staging"));
    }
}
