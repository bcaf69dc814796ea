use std::panic::Location;

use ocptv_core::SourceLocation as SourceRecord;

/// Where a log, error or diagnosis was produced.
///
/// API methods that accept a location are `#[track_caller]`; `Caller`
/// resolves to the user code line that invoked them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceLocation {
    #[default]
    Caller,
    /// Leave the `sourceLocation` field out.
    Omit,
    At { file: String, line: u32 },
}

impl SourceLocation {
    /// Explicit file and line.
    pub fn at(file: impl Into<String>, line: u32) -> Self {
        Self::At {
            file: file.into(),
            line,
        }
    }

    pub(crate) fn resolve(self, caller: &Location<'_>) -> Option<SourceRecord> {
        match self {
            Self::Caller => Some(SourceRecord {
                file: caller.file().to_owned(),
                line: caller.line(),
            }),
            Self::Omit => None,
            Self::At { file, line } => Some(SourceRecord { file, line }),
        }
    }
}
