//! Operator Prompts
//!
//! Blocking helpers used from inside step bodies. All I/O goes through the
//! streams handed to [`Prompter::new`], so tests can script the operator with
//! in-memory buffers. Prompts go to the output stream; problems go to the
//! error stream only.

use std::fmt;
use std::io::{self, BufRead, Write};

use log::debug;
use serde_json::Value;

use crate::error::ValidationError;
use crate::workflow::state::{is_scalar, Values};

/// Confirmation question asked by [`Prompter::wait_for_done`].
const DONE_QUESTION: &str = "Step complete? y / [n] : ";

/// Hint used when a value request does not supply one.
const DEFAULT_HINT: &str = "Enter a value";

/// Converts raw operator input into the value to store.
pub type Validator = Box<dyn Fn(&str) -> Result<Value, ValidationError>>;

/// Description of a value to capture from the operator.
pub struct ValueRequest {
    /// Key under which the value is stored
    pub key: String,

    /// Message shown before asking
    pub message: String,

    /// Expected inputs, e.g. `Either A or B or C`
    pub hint: Option<String>,

    /// Value used when the operator enters nothing
    pub default: Option<Value>,

    validator: Option<Validator>,
}

impl ValueRequest {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            hint: None,
            default: None,
            validator: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn accept(&self, raw: &str) -> Result<Value, ValidationError> {
        match &self.validator {
            Some(validator) => validator(raw),
            None => Ok(Value::String(raw.to_string())),
        }
    }
}

impl fmt::Debug for ValueRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRequest")
            .field("key", &self.key)
            .field("message", &self.message)
            .field("hint", &self.hint)
            .field("default", &self.default)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Operator-facing input and output streams.
pub struct Prompter<'s> {
    input: Box<dyn BufRead + 's>,
    output: Box<dyn Write + 's>,
    error: Box<dyn Write + 's>,
}

impl Prompter<'static> {
    /// Prompter bound to the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout(), io::stderr())
    }
}

impl<'s> Prompter<'s> {
    pub fn new(
        input: impl BufRead + 's,
        output: impl Write + 's,
        error: impl Write + 's,
    ) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            error: Box::new(error),
        }
    }

    /// Prints a blank line, then the message.
    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", message)?;
        self.output.flush()
    }

    /// Shows the message and returns the operator's line, without validation.
    pub fn get_input(&mut self, message: &str) -> io::Result<String> {
        self.say(message)?;
        write!(self.output, "> ")?;
        self.read_line()
    }

    /// Like [`get_input`](Self::get_input), with the expected inputs shown
    /// before the input marker.
    pub fn get_input_with_hint(&mut self, message: &str, hint: &str) -> io::Result<String> {
        self.say(message)?;
        write!(self.output, "{} : ", hint)?;
        self.read_line()
    }

    /// Shows the message and blocks until the operator confirms with `y`.
    pub fn wait_for_done(&mut self, message: &str) -> io::Result<()> {
        self.say(message)?;
        loop {
            write!(self.output, "{}", DONE_QUESTION)?;
            let answer = self.read_line()?;
            let answer = answer.trim();
            if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
                return Ok(());
            }
        }
    }

    /// Writes the message to the error stream.
    pub fn report_problem(&mut self, message: &str) -> io::Result<()> {
        // Keep ordering sensible when both streams share a terminal
        self.output.flush()?;
        writeln!(self.error, "{}", message)?;
        self.error.flush()
    }

    /// Asks until the operator gives acceptable input, stores it under the
    /// request's key in `values` and returns it.
    ///
    /// A value already present under the key is offered as the default in
    /// preference to the request's own default.
    pub fn set_value_from_input(
        &mut self,
        values: &mut Values,
        request: &ValueRequest,
    ) -> io::Result<Value> {
        let current = values.get(&request.key).cloned();
        let value = self.prompt_value(request, current)?;
        values.insert(request.key.clone(), value.clone());
        Ok(value)
    }

    /// The retry loop behind [`set_value_from_input`](Self::set_value_from_input).
    ///
    /// There is no attempt limit: it returns on valid input or on a closed
    /// input stream.
    pub(crate) fn prompt_value(
        &mut self,
        request: &ValueRequest,
        current: Option<Value>,
    ) -> io::Result<Value> {
        let default = current
            .filter(|value| !value.is_null())
            .or_else(|| request.default.clone())
            .filter(is_scalar);

        let base_hint = request.hint.as_deref().unwrap_or(DEFAULT_HINT);
        let hint = match &default {
            Some(value) => format!("{}\nOR input nothing for `{}`", base_hint, display_value(value)),
            None => base_hint.to_string(),
        };

        loop {
            let raw = self.get_input_with_hint(&request.message, &hint)?;

            if raw.is_empty() {
                match &default {
                    Some(value) => {
                        debug!("Using default for '{}'", request.key);
                        return Ok(value.clone());
                    }
                    None => {
                        self.report_problem("A value is required.")?;
                        continue;
                    }
                }
            }

            match request.accept(&raw).and_then(|value| scalar_only(&request.key, value)) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Rejected input for '{}': {}", request.key, e);
                    self.report_problem(&format!("Invalid input: {}", e))?;
                }
            }
        }
    }

    /// Reads one line, without its line terminator.
    fn read_line(&mut self) -> io::Result<String> {
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed while waiting for the operator",
            ));
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }
}

/// Only scalars can be stored in the progress file.
fn scalar_only(key: &str, value: Value) -> Result<Value, ValidationError> {
    if is_scalar(&value) {
        Ok(value)
    } else {
        Err(ValidationError::new(format!(
            "value for '{}' must be a string, number, boolean or null",
            key
        )))
    }
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::validators;
    use serde_json::json;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_get_input_returns_raw_line() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let line = {
            let mut prompter = Prompter::new("  spaced value \r\nnext\n".as_bytes(), &mut out, &mut err);
            prompter.get_input("Name?").unwrap()
        };

        assert_eq!(line, "  spaced value ");
        assert!(text(&out).contains("Name?"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_get_input_at_eof_fails() {
        let mut prompter = Prompter::new("".as_bytes(), io::sink(), io::sink());
        let err = prompter.get_input("Anything?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_hint_shown_before_marker() {
        let mut out = Vec::new();
        {
            let mut prompter = Prompter::new("B\n".as_bytes(), &mut out, io::sink());
            prompter
                .get_input_with_hint("Pick one", "Either A or B")
                .unwrap();
        }
        assert!(text(&out).contains("Either A or B : "));
    }

    #[test]
    fn test_wait_for_done_requires_yes() {
        let mut out = Vec::new();
        {
            let mut prompter = Prompter::new("\nn\nmaybe\nY\n".as_bytes(), &mut out, io::sink());
            prompter.wait_for_done("Restart the server.").unwrap();
        }

        let shown = text(&out);
        assert!(shown.contains("Restart the server."));
        assert_eq!(shown.matches(DONE_QUESTION).count(), 4);
    }

    #[test]
    fn test_wait_for_done_eof_is_error() {
        let mut prompter = Prompter::new("n\n".as_bytes(), io::sink(), io::sink());
        assert!(prompter.wait_for_done("Do it").is_err());
    }

    #[test]
    fn test_report_problem_uses_error_stream() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut prompter = Prompter::new("".as_bytes(), &mut out, &mut err);
            prompter.report_problem("disk nearly full").unwrap();
        }

        assert!(out.is_empty());
        assert_eq!(text(&err), "disk nearly full\n");
    }

    #[test]
    fn test_validation_retry() {
        let mut err = Vec::new();
        let mut values = Values::new();
        let request = ValueRequest::new("age", "Enter age").with_validator(validators::digits());

        let value = {
            let mut prompter = Prompter::new("abc\n-1\n30\n".as_bytes(), io::sink(), &mut err);
            prompter.set_value_from_input(&mut values, &request).unwrap()
        };

        assert_eq!(value, json!("30"));
        assert_eq!(values.get("age"), Some(&json!("30")));
        assert_eq!(text(&err).lines().count(), 2);
    }

    #[test]
    fn test_default_accepted_on_empty_input() {
        let mut out = Vec::new();
        let mut values = Values::new();
        let request = ValueRequest::new("env", "Environment").with_default("prod");

        let value = {
            let mut prompter = Prompter::new("\n".as_bytes(), &mut out, io::sink());
            prompter.set_value_from_input(&mut values, &request).unwrap()
        };

        assert_eq!(value, json!("prod"));
        assert_eq!(values.get("env"), Some(&json!("prod")));
        assert!(text(&out).contains("OR input nothing for `prod`"));
    }

    #[test]
    fn test_existing_value_beats_coded_default() {
        let mut values = Values::new();
        values.insert("env".to_string(), json!("staging"));
        let request = ValueRequest::new("env", "Environment").with_default("prod");

        let mut prompter = Prompter::new("\n".as_bytes(), io::sink(), io::sink());
        let value = prompter.set_value_from_input(&mut values, &request).unwrap();

        assert_eq!(value, json!("staging"));
    }

    #[test]
    fn test_empty_without_default_reprompts() {
        let mut err = Vec::new();
        let mut values = Values::new();
        let request = ValueRequest::new("ticket", "Ticket number");

        let value = {
            let mut prompter = Prompter::new("\nOPS-12\n".as_bytes(), io::sink(), &mut err);
            prompter.set_value_from_input(&mut values, &request).unwrap()
        };

        assert_eq!(value, json!("OPS-12"));
        assert!(text(&err).contains("A value is required."));
    }

    #[test]
    fn test_validator_can_convert() {
        let mut values = Values::new();
        let request = ValueRequest::new("replicas", "How many?").with_validator(validators::integer());

        let mut prompter = Prompter::new("three\n3\n".as_bytes(), io::sink(), io::sink());
        let value = prompter.set_value_from_input(&mut values, &request).unwrap();

        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_list_from_validator_is_rejected() {
        let mut err = Vec::new();
        let mut values = Values::new();
        let request = ValueRequest::new("hosts", "Which hosts?").with_validator(Box::new(
            |raw: &str| -> Result<Value, ValidationError> {
                if raw.contains(',') {
                    Ok(json!(raw.split(',').collect::<Vec<_>>()))
                } else {
                    Ok(json!(raw))
                }
            },
        ));

        let value = {
            let mut prompter = Prompter::new("a,b
web-1
".as_bytes(), io::sink(), &mut err);
            prompter.set_value_from_input(&mut values, &request).unwrap()
        };

        assert_eq!(value, json!("web-1"));
        assert_eq!(values.get("hosts"), Some(&json!("web-1")));
        assert!(text(&err).contains("value for 'hosts' must be a string, number, boolean or null"));
        assert_eq!(text(&err).lines().count(), 1);
    }

    #[test]
    fn test_input_closed_during_value_loop() {
        let mut values = Values::new();
        let request = ValueRequest::new("age", "Enter age").with_validator(validators::digits());

        let mut prompter = Prompter::new("abc\n".as_bytes(), io::sink(), io::sink());
        assert!(prompter.set_value_from_input(&mut values, &request).is_err());
        assert!(values.is_empty());
    }
}
