//! # Stream validation
//!
//! Parses an emitted NDJSON stream back into JSON values and checks the
//! envelope invariants a consumer relies on.
//!
//! | Rule | Applies to |
//! |------|------------|
//! | `schemaVersion` payload with `sequenceNumber` 0 | first line only |
//! | exactly one of `schemaVersion`, `testRunArtifact`, `testStepArtifact` | every line |
//! | `sequenceNumber` equals the previous one plus one | every line after the first |
//! | `timestamp` is a string | every line |
//!
//! Blank lines are skipped; line numbers in errors are 1-based and count
//! blank lines.

use serde_json::Value;
use thiserror::Error;

const PAYLOAD_KEYS: [&str; 3] = ["schemaVersion", "testRunArtifact", "testStepArtifact"];

/// Parse every non-blank line as a JSON value.
pub fn parse_stream(input: &str) -> Result<Vec<Value>, StreamValidationError> {
    non_blank_lines(input)
        .map(|(line_number, line)| {
            serde_json::from_str(line)
                .map_err(|error| StreamValidationError::new(line_number, error.to_string()))
        })
        .collect()
}

/// Validate a whole stream; returns the number of records.
pub fn validate_stream(input: &str) -> Result<usize, StreamValidationError> {
    let mut expected_seq = 0_u64;
    let mut count = 0;
    for (line_number, line) in non_blank_lines(input) {
        let value: Value = serde_json::from_str(line)
            .map_err(|error| StreamValidationError::new(line_number, error.to_string()))?;
        let fail = |message: String| StreamValidationError::new(line_number, message);

        let object = value
            .as_object()
            .ok_or_else(|| fail("record must be a JSON object".to_owned()))?;

        let payloads: Vec<&str> = PAYLOAD_KEYS
            .iter()
            .copied()
            .filter(|key| object.contains_key(*key))
            .collect();
        let payload = match payloads.as_slice() {
            [payload] => *payload,
            [] => return Err(fail("record carries no payload".to_owned())),
            many => {
                return Err(fail(format!(
                    "record carries several payloads: {}",
                    many.join(", ")
                )))
            }
        };

        if expected_seq == 0 && payload != "schemaVersion" {
            return Err(fail(format!(
                "first record must be schemaVersion, found {payload}"
            )));
        }
        if expected_seq > 0 && payload == "schemaVersion" {
            return Err(fail("schemaVersion may only appear first".to_owned()));
        }

        let seq = object
            .get("sequenceNumber")
            .and_then(Value::as_u64)
            .ok_or_else(|| fail("sequenceNumber must be a non-negative integer".to_owned()))?;
        if seq != expected_seq {
            return Err(fail(format!(
                "expected sequenceNumber {expected_seq}, found {seq}"
            )));
        }

        if !object.get("timestamp").is_some_and(Value::is_string) {
            return Err(fail("timestamp must be a string".to_owned()));
        }

        expected_seq += 1;
        count += 1;
    }
    Ok(count)
}

fn non_blank_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index + 1, line))
}

/// Error from stream validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream validation error at line {line_number}: {message}")]
pub struct StreamValidationError {
    /// 1-based line number where validation failed.
    pub line_number: usize,
    pub message: String,
}

impl StreamValidationError {
    fn new(line_number: usize, message: String) -> Self {
        Self {
            line_number,
            message,
        }
    }
}
