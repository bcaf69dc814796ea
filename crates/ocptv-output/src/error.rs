use std::error::Error as StdError;
use std::io;

use ocptv_core::{CheckError, ErrorKind, SerializeError, TestResult, TestStatus};
use thiserror::Error;

/// Failure of a single emission.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("runtime type check failed: {0}")]
    TypeCheck(#[from] CheckError),

    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("schema version preamble could not be written ({kind}): {message}")]
    PreambleFailed { kind: ErrorKind, message: String },

    #[error("measurement series '{series_id}' has already ended")]
    SeriesEnded { series_id: String },
}

impl OutputError {
    /// Configuration, data or I/O.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Serialize(error) => error.kind(),
            Self::TypeCheck(error) => error.kind(),
            Self::Io(_) => ErrorKind::Io,
            Self::PreambleFailed { kind, .. } => *kind,
            Self::SeriesEnded { .. } => ErrorKind::Data,
        }
    }
}

/// Ends the enclosing run scope early with the carried outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("test run ended early with status {status} and result {result}")]
pub struct TestRunError {
    pub status: TestStatus,
    pub result: TestResult,
}

impl TestRunError {
    /// Signal ending the run with `status` and `result`.
    pub const fn new(status: TestStatus, result: TestResult) -> Self {
        Self { status, result }
    }
}

/// Ends the enclosing step scope early with the carried status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("test step ended early with status {status}")]
pub struct TestStepError {
    pub status: TestStatus,
}

impl TestStepError {
    /// Signal ending the step with `status`.
    pub const fn new(status: TestStatus) -> Self {
        Self { status }
    }
}

/// Error type returned by scope bodies.
///
/// `Run` and `Step` are control-flow signals consumed by the matching
/// scope; everything else passes through after the end record is written.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error(transparent)]
    Run(#[from] TestRunError),

    #[error(transparent)]
    Step(#[from] TestStepError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl ScopeError {
    /// Wrap any error raised by user code.
    pub fn other(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(error.into())
    }
}

impl From<io::Error> for ScopeError {
    fn from(error: io::Error) -> Self {
        Self::Other(Box::new(error))
    }
}
