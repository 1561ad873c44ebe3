//! Ready-made validators for [`ValueRequest`](super::ValueRequest).

use serde_json::Value;

use crate::error::ValidationError;

use super::prompt::Validator;

/// Rejects input that is only whitespace.
pub fn non_empty() -> Validator {
    Box::new(|raw: &str| {
        if raw.trim().is_empty() {
            Err(ValidationError::new("input must not be blank"))
        } else {
            Ok(Value::String(raw.to_string()))
        }
    })
}

/// Accepts only ASCII digits; stores the text unchanged.
pub fn digits() -> Validator {
    Box::new(|raw: &str| {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            Ok(Value::String(raw.to_string()))
        } else {
            Err(ValidationError::new(format!("'{}' is not made of digits only", raw)))
        }
    })
}

/// Parses a whole number and stores it as a JSON number.
pub fn integer() -> Validator {
    Box::new(|raw: &str| {
        raw.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| ValidationError::new(format!("'{}' is not a whole number", raw)))
    })
}

/// Accepts one of the listed options exactly.
pub fn one_of<I, S>(options: I) -> Validator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let options: Vec<String> = options.into_iter().map(Into::into).collect();
    Box::new(move |raw: &str| {
        if options.iter().any(|option| option == raw) {
            Ok(Value::String(raw.to_string()))
        } else {
            Err(ValidationError::new(format!(
                "'{}' is not one of: {}",
                raw,
                options.join(", ")
            )))
        }
    })
}

/// Accepts input for which `predicate` holds, reporting `reason` otherwise.
pub fn from_fn<F>(predicate: F, reason: impl Into<String>) -> Validator
where
    F: Fn(&str) -> bool + 'static,
{
    let reason = reason.into();
    Box::new(move |raw: &str| {
        if predicate(raw) {
            Ok(Value::String(raw.to_string()))
        } else {
            Err(ValidationError::new(reason.clone()))
        }
    })
}
