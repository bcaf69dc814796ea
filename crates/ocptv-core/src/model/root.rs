//! Output envelope and the tagged unions it carries.
//!
//! ```text
//! Root ── impl: SchemaVersion | RunArtifact | StepArtifact
//!         sequenceNumber, timestamp
//! RunArtifact ── RunStart | RunEnd | Log | Error
//! StepArtifact ── testStepId + StepStart | StepEnd | Measurement | series records
//!                 | Diagnosis | Log | Error | File | Extension
//! ```

use crate::record::{zip_fields, Field, FieldValue, Node, Record, ToNode, TypeDesc};

use super::artifacts::{
    Diagnosis, Error, Extension, File, Log, Measurement, MeasurementSeriesElement,
    MeasurementSeriesEnd, MeasurementSeriesStart, RunEnd, RunStart, SchemaVersion, StepEnd,
    StepStart,
};
use super::format_timestamp_field;

/// Run level payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RunArtifact {
    Start(RunStart),
    End(RunEnd),
    Log(Log),
    Error(Error),
}

const RUN_ARTIFACT_FIELDS: &[Field] = &[Field::object(
    "impl",
    TypeDesc::Union(&[
        TypeDesc::Record("RunStart"),
        TypeDesc::Record("RunEnd"),
        TypeDesc::Record("Log"),
        TypeDesc::Record("Error"),
    ]),
)];

impl Record for RunArtifact {
    fn type_name(&self) -> &'static str {
        "RunArtifact"
    }

    fn spec_object(&self) -> Option<&'static str> {
        Some("testRunArtifact")
    }

    fn fields(&self) -> Vec<FieldValue<'_>> {
        let payload = match self {
            Self::Start(start) => start.to_node(),
            Self::End(end) => end.to_node(),
            Self::Log(log) => log.to_node(),
            Self::Error(error) => error.to_node(),
        };
        zip_fields(RUN_ARTIFACT_FIELDS, vec![payload])
    }
}

crate::record_to_node!(RunArtifact);

/// Step level payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum StepPayload {
    Start(StepStart),
    End(StepEnd),
    Measurement(Measurement),
    SeriesStart(MeasurementSeriesStart),
    SeriesEnd(MeasurementSeriesEnd),
    SeriesElement(MeasurementSeriesElement),
    Diagnosis(Diagnosis),
    Log(Log),
    Error(Error),
    File(File),
    Extension(Extension),
}

impl ToNode for StepPayload {
    fn to_node(&self) -> Node<'_> {
        match self {
            Self::Start(start) => start.to_node(),
            Self::End(end) => end.to_node(),
            Self::Measurement(measurement) => measurement.to_node(),
            Self::SeriesStart(start) => start.to_node(),
            Self::SeriesEnd(end) => end.to_node(),
            Self::SeriesElement(element) => element.to_node(),
            Self::Diagnosis(diagnosis) => diagnosis.to_node(),
            Self::Log(log) => log.to_node(),
            Self::Error(error) => error.to_node(),
            Self::File(file) => file.to_node(),
            Self::Extension(extension) => extension.to_node(),
        }
    }
}

/// Step payload tagged with the id of the step that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepArtifact {
    pub id: String,
    pub payload: StepPayload,
}

const STEP_ARTIFACT_FIELDS: &[Field] = &[
    Field::wire("id", "testStepId", TypeDesc::Str),
    Field::object(
        "payload",
        TypeDesc::Union(&[
            TypeDesc::Record("StepStart"),
            TypeDesc::Record("StepEnd"),
            TypeDesc::Record("Measurement"),
            TypeDesc::Record("MeasurementSeriesStart"),
            TypeDesc::Record("MeasurementSeriesEnd"),
            TypeDesc::Record("MeasurementSeriesElement"),
            TypeDesc::Record("Diagnosis"),
            TypeDesc::Record("Log"),
            TypeDesc::Record("Error"),
            TypeDesc::Record("File"),
            TypeDesc::Record("Extension"),
        ]),
    ),
];

impl_record!(StepArtifact, Some("testStepArtifact"), STEP_ARTIFACT_FIELDS, [id, payload]);

/// Any payload that may sit directly in the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum RootArtifact {
    SchemaVersion(SchemaVersion),
    Run(RunArtifact),
    Step(StepArtifact),
}

impl RootArtifact {
    /// Wire key the payload is emitted under.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::SchemaVersion(_) => "schemaVersion",
            Self::Run(_) => "testRunArtifact",
            Self::Step(_) => "testStepArtifact",
        }
    }
}

impl ToNode for RootArtifact {
    fn to_node(&self) -> Node<'_> {
        match self {
            Self::SchemaVersion(version) => version.to_node(),
            Self::Run(run) => run.to_node(),
            Self::Step(step) => step.to_node(),
        }
    }
}

impl From<RunArtifact> for RootArtifact {
    fn from(artifact: RunArtifact) -> Self {
        Self::Run(artifact)
    }
}

impl From<StepArtifact> for RootArtifact {
    fn from(artifact: StepArtifact) -> Self {
        Self::Step(artifact)
    }
}

impl From<SchemaVersion> for RootArtifact {
    fn from(version: SchemaVersion) -> Self {
        Self::SchemaVersion(version)
    }
}

/// One output line before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub artifact: RootArtifact,
    pub sequence_number: u64,
    /// Unix epoch seconds.
    pub timestamp: f64,
}

const ROOT_FIELDS: &[Field] = &[
    Field::object(
        "artifact",
        TypeDesc::Union(&[
            TypeDesc::Record("SchemaVersion"),
            TypeDesc::Record("RunArtifact"),
            TypeDesc::Record("StepArtifact"),
        ]),
    ),
    Field::wire("sequence_number", "sequenceNumber", TypeDesc::Int),
    Field::wire("timestamp", "timestamp", TypeDesc::Float).formatted(format_timestamp_field),
];

impl_record!(Root, None, ROOT_FIELDS, [artifact, sequence_number, timestamp]);
