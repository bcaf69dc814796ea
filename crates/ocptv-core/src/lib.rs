//! # ocptv-core
//!
//! Record model, runtime type checks and JSON serialization for the
//! OCP Test & Validation output schema.
//!
//! ## Overview
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`record`] | field tables, type descriptors, the [`Record`] trait |
//! | [`typecheck`] | recursive structural validation with field-path traces |
//! | [`serialize`] | record graph to `serde_json::Value` and compact text |
//! | [`timestamp`] | ISO-8601 rendering in a display timezone |
//! | [`model`] | every wire object of the schema |
//!
//! This crate holds no state. Sequencing, sinks and the user-facing API
//! live in `ocptv-output`.
//!
//! ```rust,ignore
//! use ocptv_core::model::{Root, SchemaVersion};
//! use ocptv_core::{serialize, FormatContext};
//!
//! let root = Root { artifact: SchemaVersion::default().into(), sequence_number: 0, timestamp: 0.0 };
//! let line = serialize::to_json_string(&root, &FormatContext::default())?;
//! assert!(line.starts_with(r#"{"schemaVersion":{"major":2,"minor":0}"#));
//! ```

pub mod error;
pub mod model;
pub mod record;
pub mod serialize;
pub mod timestamp;
pub mod typecheck;

pub use error::{ErrorKind, SerializeError};
pub use model::artifacts::{
    Diagnosis, Error, Extension, File, Log, Measurement, MeasurementSeriesElement,
    MeasurementSeriesEnd, MeasurementSeriesStart, MeasurementValue, RunEnd, RunStart,
    SchemaVersion, SourceLocation, StepEnd, StepStart, Validator, ValidatorValue,
};
pub use model::dut::{DutInfo, HardwareInfo, PlatformInfo, SoftwareInfo, Subcomponent};
pub use model::enums::{
    DiagnosisType, LogSeverity, SoftwareType, SubcomponentType, TestResult, TestStatus,
    UnknownVariant, ValidatorType,
};
pub use model::root::{Root, RootArtifact, RunArtifact, StepArtifact, StepPayload};
pub use model::Metadata;
pub use record::{Field, FieldValue, Node, Record, ToNode, TypeDesc};
pub use timestamp::{format_timestamp, FormatContext};
pub use typecheck::{check_record, CheckError, TypeMismatch};
