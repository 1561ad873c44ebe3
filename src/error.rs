//! Error Types
//!
//! Fatal conditions (corrupt progress file, failed writes, bad step
//! registration) are separate from the recoverable ones (validation of
//! operator input) and from step failures, which halt a run but are
//! reported through [`crate::execution::RunOutcome`] rather than as errors.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error produced by a step body.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Problems reading or writing the progress file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exists but is not a valid progress document.
    #[error("progress file '{}' is corrupt: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// The filesystem refused an operation.
    #[error("failed to {action} progress file '{}': {source}", path.display())]
    Persistence {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Persistence {
            action,
            path: path.into(),
            source,
        }
    }

    /// Returns true for a corrupt or malformed progress file.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }
}

/// Problems assembling the ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("step has an empty or whitespace-only name")]
    EmptyName,

    #[error("duplicate step name: '{0}'")]
    DuplicateStep(String),
}

/// Operator input rejected by a value validator.
///
/// Never escapes `set_value_from_input`: the reason is reported on the
/// error stream and the operator is asked again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A step body returned an error.
#[derive(Debug, Error)]
#[error("step '{step}' failed: {source}")]
pub struct StepExecutionError {
    pub step: String,
    #[source]
    pub source: BoxError,
}

/// Fatal errors that stop the engine before or between steps.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
