use ocptv_output::{OutputError, ScopeError, StreamValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown demo '{0}' (see `ocptv-demo list`)")]
    UnknownDemo(String),

    #[error("invalid utc offset: {0}")]
    InvalidOffset(#[from] time::error::ComponentRange),

    #[error("demo '{demo}' failed: {source}")]
    Demo {
        demo: &'static str,
        #[source]
        source: ScopeError,
    },

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("demo '{demo}' produced an invalid stream: {source}")]
    InvalidStream {
        demo: &'static str,
        #[source]
        source: StreamValidationError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownDemo(_) | Self::InvalidOffset(_) => 2,
            Self::Demo { .. } => 3,
            Self::Output(_) => 4,
            Self::InvalidStream { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let unknown = CliError::UnknownDemo("nope".to_owned());
        assert_eq!(unknown.exit_code(), 2);
        assert!(unknown.to_string().contains("nope"));

        let invalid = CliError::InvalidStream {
            demo: "diagnosis",
            source: StreamValidationError {
                line_number: 2,
                message: "expected sequenceNumber 1, found 3".to_owned(),
            },
        };
        assert_eq!(invalid.exit_code(), 5);

        let io = CliError::from(std::io::Error::other("disk full"));
        assert_eq!(io.exit_code(), 10);
    }
}
