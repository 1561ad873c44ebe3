//! Interaction Helpers
//!
//! Blocking, validated operator input for use inside step bodies.
//!
//! - [`prompt`]: The [`Prompter`] and value requests
//! - [`validators`]: Common input checks

pub mod prompt;
pub mod validators;

pub use prompt::{Prompter, ValueRequest, Validator};
