//! # Emission sequencer
//!
//! Turns artifacts into numbered output lines.
//!
//! ## Guarantees
//!
//! - The first line a fresh emitter writes is `schemaVersion` with
//!   `sequenceNumber` 0, even when many threads emit concurrently for the
//!   first time. Callers block on a one-shot gate until it is written.
//! - Sequence numbers are gap-free and follow write order: the number is
//!   claimed, the line is rendered and written under one lock, and the
//!   counter advances only after a successful write.
//! - A failed emission writes nothing.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use ocptv_core::{check_record, serialize, timestamp, ErrorKind, Root, RootArtifact, SchemaVersion};
use tracing::debug;

use crate::config::{Config, Settings};
use crate::error::OutputError;
use crate::writer::Writer;

type PreambleOutcome = Result<(), (ErrorKind, String)>;

/// Sequencer shared by a run and everything it creates.
pub struct ArtifactEmitter {
    config: Config,
    writer: Arc<dyn Writer>,
    next_seq: Mutex<u64>,
    preamble: OnceLock<PreambleOutcome>,
}

impl ArtifactEmitter {
    /// Captures the sink configured in `config` at this point.
    pub fn new(config: Config) -> Self {
        let writer = config.writer();
        Self {
            config,
            writer,
            next_seq: Mutex::new(0),
            preamble: OnceLock::new(),
        }
    }

    /// Emit one artifact; returns its sequence number.
    pub fn emit(&self, artifact: impl Into<RootArtifact>) -> Result<u64, OutputError> {
        self.ensure_preamble()?;
        let settings = self.config.snapshot();
        self.write_next(artifact.into(), &settings)
    }

    /// Sequence number the next artifact will receive.
    pub fn next_sequence_number(&self) -> u64 {
        *self.next_seq.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_preamble(&self) -> Result<(), OutputError> {
        let outcome = self.preamble.get_or_init(|| {
            let settings = self.config.snapshot();
            self.write_next(SchemaVersion::default().into(), &settings)
                .map(|_| ())
                .map_err(|error| (error.kind(), error.to_string()))
        });
        outcome
            .clone()
            .map_err(|(kind, message)| OutputError::PreambleFailed { kind, message })
    }

    fn write_next(&self, artifact: RootArtifact, settings: &Settings) -> Result<u64, OutputError> {
        let mut next_seq = self.next_seq.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence_number = *next_seq;
        let root = Root {
            artifact,
            sequence_number,
            timestamp: timestamp::now(),
        };

        if settings.runtime_checks {
            check_record(&root)?;
        }
        let line = serialize::to_json_string(&root, &settings.format_context())?;
        self.writer.write(&line)?;

        *next_seq += 1;
        debug!(
            sequence_number,
            artifact = root.artifact.wire_key(),
            "emitted artifact"
        );
        Ok(sequence_number)
    }
}

impl std::fmt::Debug for ArtifactEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactEmitter")
            .field("next_seq", &self.next_sequence_number())
            .field("preamble_written", &self.preamble.get().is_some())
            .finish_non_exhaustive()
    }
}
