use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Field, Node, ToNode, TypeDesc};

use super::dut::{HardwareInfo, SoftwareInfo, Subcomponent};
use super::enums::{DiagnosisType, LogSeverity, TestResult, TestStatus, ValidatorType};
use super::{
    format_hardware_id, format_software_ids, format_timestamp_field, Metadata, METADATA,
    OPTIONAL_STR,
};

const MEASUREMENT_VALUE: TypeDesc = TypeDesc::Union(&[
    TypeDesc::Float,
    TypeDesc::Int,
    TypeDesc::Bool,
    TypeDesc::Str,
]);

const VALIDATOR_VALUE: TypeDesc = TypeDesc::Union(&[
    TypeDesc::List(Some(&TypeDesc::Float)),
    TypeDesc::List(Some(&TypeDesc::Int)),
    TypeDesc::List(Some(&TypeDesc::Bool)),
    TypeDesc::List(Some(&TypeDesc::Str)),
    TypeDesc::Float,
    TypeDesc::Int,
    TypeDesc::Bool,
    TypeDesc::Str,
]);

const OPTIONAL_HARDWARE: TypeDesc = TypeDesc::Optional(&TypeDesc::Record("HardwareInfo"));
const OPTIONAL_SUBCOMPONENT: TypeDesc = TypeDesc::Optional(&TypeDesc::Record("Subcomponent"));
const OPTIONAL_SOURCE: TypeDesc = TypeDesc::Optional(&TypeDesc::Record("SourceLocation"));
const VALIDATORS: TypeDesc = TypeDesc::List(Some(&TypeDesc::Record("Validator")));

/// Primitive value carried by measurements and series elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ToNode for MeasurementValue {
    fn to_node(&self) -> Node<'_> {
        match self {
            Self::Bool(flag) => Node::Bool(*flag),
            Self::Int(int) => Node::Int(*int),
            Self::Float(float) => Node::Float(*float),
            Self::Str(text) => Node::Str(text),
        }
    }
}

impl From<bool> for MeasurementValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MeasurementValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MeasurementValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for MeasurementValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for MeasurementValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for MeasurementValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<&str> for MeasurementValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for MeasurementValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Value a validator compares against: one primitive, or a list of
/// primitives of the same kind for the set operators.
///
/// List homogeneity is enforced by the runtime type check, not by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidatorValue {
    Single(MeasurementValue),
    List(Vec<MeasurementValue>),
}

impl ToNode for ValidatorValue {
    fn to_node(&self) -> Node<'_> {
        match self {
            Self::Single(value) => value.to_node(),
            Self::List(values) => values.to_node(),
        }
    }
}

impl<T: Into<MeasurementValue>> From<Vec<T>> for ValidatorValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! validator_value_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for ValidatorValue {
                fn from(value: $ty) -> Self {
                    Self::Single(value.into())
                }
            }
        )+
    };
}

validator_value_from!(bool, i64, i32, u32, f64, f32, &str, String, MeasurementValue);

/// Schema version preamble; always the first record of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self { major: 2, minor: 0 }
    }
}

const SCHEMA_VERSION_FIELDS: &[Field] = &[
    Field::wire("major", "major", TypeDesc::Int),
    Field::wire("minor", "minor", TypeDesc::Int),
];

impl_record!(SchemaVersion, Some("schemaVersion"), SCHEMA_VERSION_FIELDS, [major, minor]);

/// File and line an artifact was emitted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

const SOURCE_LOCATION_FIELDS: &[Field] = &[
    Field::wire("file", "file", TypeDesc::Str),
    Field::wire("line", "line", TypeDesc::Int),
];

impl_record!(SourceLocation, Some("sourceLocation"), SOURCE_LOCATION_FIELDS, [file, line]);

/// Free-form log line.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub severity: LogSeverity,
    pub message: String,
    pub source_location: Option<SourceLocation>,
}

const LOG_FIELDS: &[Field] = &[
    Field::wire("severity", "severity", TypeDesc::Enum("LogSeverity")),
    Field::wire("message", "message", TypeDesc::Str),
    Field::wire("source_location", "sourceLocation", OPTIONAL_SOURCE),
];

impl_record!(Log, Some("log"), LOG_FIELDS, [severity, message, source_location]);

/// Reference to a file produced by the diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub name: String,
    pub uri: String,
    /// Provisional artifact rather than a final production.
    pub is_snapshot: bool,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub metadata: Option<Metadata>,
}

impl File {
    /// New snapshot file reference.
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            is_snapshot: true,
            description: None,
            content_type: None,
            metadata: None,
        }
    }

    /// Mark the file as provisional (`true`, the default) or final.
    pub fn snapshot(mut self, is_snapshot: bool) -> Self {
        self.is_snapshot = is_snapshot;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

const FILE_FIELDS: &[Field] = &[
    Field::wire("name", "displayName", TypeDesc::Str),
    Field::wire("uri", "uri", TypeDesc::Str),
    Field::wire("is_snapshot", "isSnapshot", TypeDesc::Bool),
    Field::wire("description", "description", OPTIONAL_STR),
    Field::wire("content_type", "contentType", OPTIONAL_STR),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    File,
    Some("file"),
    FILE_FIELDS,
    [name, uri, is_snapshot, description, content_type, metadata]
);

/// Verdict about the DUT reached by the diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub verdict: String,
    pub diagnosis_type: DiagnosisType,
    pub message: Option<String>,
    pub hardware_info: Option<HardwareInfo>,
    pub subcomponent: Option<Subcomponent>,
    pub source_location: Option<SourceLocation>,
}

const DIAGNOSIS_FIELDS: &[Field] = &[
    Field::wire("verdict", "verdict", TypeDesc::Str),
    Field::wire("diagnosis_type", "type", TypeDesc::Enum("DiagnosisType")),
    Field::wire("message", "message", OPTIONAL_STR),
    Field::wire("hardware_info", "hardwareInfoId", OPTIONAL_HARDWARE).formatted(format_hardware_id),
    Field::object("subcomponent", OPTIONAL_SUBCOMPONENT),
    Field::wire("source_location", "sourceLocation", OPTIONAL_SOURCE),
];

impl_record!(
    Diagnosis,
    Some("diagnosis"),
    DIAGNOSIS_FIELDS,
    [verdict, diagnosis_type, message, hardware_info, subcomponent, source_location]
);

/// Error artifact. Related software is emitted as a list of ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub symptom: String,
    pub message: Option<String>,
    pub software_infos: Vec<SoftwareInfo>,
    pub source_location: Option<SourceLocation>,
}

const ERROR_FIELDS: &[Field] = &[
    Field::wire("symptom", "symptom", TypeDesc::Str),
    Field::wire("message", "message", OPTIONAL_STR),
    Field::wire(
        "software_infos",
        "softwareInfoIds",
        TypeDesc::List(Some(&TypeDesc::Record("SoftwareInfo"))),
    )
    .formatted(format_software_ids),
    Field::wire("source_location", "sourceLocation", OPTIONAL_SOURCE),
];

impl_record!(
    Error,
    Some("error"),
    ERROR_FIELDS,
    [symptom, message, software_infos, source_location]
);

/// Acceptance criterion attached to a measurement or series.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    pub name: Option<String>,
    pub validator_type: ValidatorType,
    pub value: ValidatorValue,
    pub metadata: Option<Metadata>,
}

impl Validator {
    /// Validator comparing against `value` with the given operator.
    pub fn new(validator_type: ValidatorType, value: impl Into<ValidatorValue>) -> Self {
        Self {
            name: None,
            validator_type,
            value: value.into(),
            metadata: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

const VALIDATOR_FIELDS: &[Field] = &[
    Field::wire("name", "name", OPTIONAL_STR),
    Field::wire("validator_type", "type", TypeDesc::Enum("ValidatorType")),
    Field::wire("value", "value", VALIDATOR_VALUE),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    Validator,
    Some("validator"),
    VALIDATOR_FIELDS,
    [name, validator_type, value, metadata]
);

/// Single-shot measured value.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: MeasurementValue,
    pub unit: Option<String>,
    pub validators: Vec<Validator>,
    pub hardware_info: Option<HardwareInfo>,
    pub subcomponent: Option<Subcomponent>,
    pub metadata: Option<Metadata>,
}

impl Measurement {
    /// Measurement with no unit, validators or hardware reference.
    pub fn new(name: impl Into<String>, value: impl Into<MeasurementValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
            validators: Vec::new(),
            hardware_info: None,
            subcomponent: None,
            metadata: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Append a validator; may be called repeatedly.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Hardware the value was measured on. Serialized as its id.
    pub fn with_hardware_info(mut self, hardware_info: HardwareInfo) -> Self {
        self.hardware_info = Some(hardware_info);
        self
    }

    pub fn with_subcomponent(mut self, subcomponent: Subcomponent) -> Self {
        self.subcomponent = Some(subcomponent);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

const MEASUREMENT_FIELDS: &[Field] = &[
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("value", "value", MEASUREMENT_VALUE),
    Field::wire("unit", "unit", OPTIONAL_STR),
    Field::wire("validators", "validators", VALIDATORS),
    Field::wire("hardware_info", "hardwareInfoId", OPTIONAL_HARDWARE).formatted(format_hardware_id),
    Field::object("subcomponent", OPTIONAL_SUBCOMPONENT),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    Measurement,
    Some("measurement"),
    MEASUREMENT_FIELDS,
    [name, value, unit, validators, hardware_info, subcomponent, metadata]
);

/// Opens a measurement series.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeriesStart {
    pub name: String,
    pub unit: Option<String>,
    pub series_id: String,
    pub validators: Vec<Validator>,
    pub hardware_info: Option<HardwareInfo>,
    pub subcomponent: Option<Subcomponent>,
    pub metadata: Option<Metadata>,
}

const SERIES_START_FIELDS: &[Field] = &[
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("unit", "unit", OPTIONAL_STR),
    Field::wire("series_id", "measurementSeriesId", TypeDesc::Str),
    Field::wire("validators", "validators", VALIDATORS),
    Field::wire("hardware_info", "hardwareInfoId", OPTIONAL_HARDWARE).formatted(format_hardware_id),
    Field::object("subcomponent", OPTIONAL_SUBCOMPONENT),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    MeasurementSeriesStart,
    Some("measurementSeriesStart"),
    SERIES_START_FIELDS,
    [name, unit, series_id, validators, hardware_info, subcomponent, metadata]
);

/// Closes a measurement series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementSeriesEnd {
    pub series_id: String,
    pub total_count: u64,
}

const SERIES_END_FIELDS: &[Field] = &[
    Field::wire("series_id", "measurementSeriesId", TypeDesc::Str),
    Field::wire("total_count", "totalCount", TypeDesc::Int),
];

impl_record!(
    MeasurementSeriesEnd,
    Some("measurementSeriesEnd"),
    SERIES_END_FIELDS,
    [series_id, total_count]
);

/// One value of a measurement series.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeriesElement {
    pub index: u64,
    pub value: MeasurementValue,
    /// Unix epoch seconds.
    pub timestamp: f64,
    pub series_id: String,
    pub metadata: Option<Metadata>,
}

const SERIES_ELEMENT_FIELDS: &[Field] = &[
    Field::wire("index", "index", TypeDesc::Int),
    Field::wire("value", "value", MEASUREMENT_VALUE),
    Field::wire("timestamp", "timestamp", TypeDesc::Float).formatted(format_timestamp_field),
    Field::wire("series_id", "measurementSeriesId", TypeDesc::Str),
    Field::wire("metadata", "metadata", METADATA),
];

impl_record!(
    MeasurementSeriesElement,
    Some("measurementSeriesElement"),
    SERIES_ELEMENT_FIELDS,
    [index, value, timestamp, series_id, metadata]
);

/// Vendor specific payload with arbitrary JSON content.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub name: String,
    pub content: Value,
}

const EXTENSION_FIELDS: &[Field] = &[
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("content", "content", TypeDesc::Any),
];

impl_record!(Extension, Some("extension"), EXTENSION_FIELDS, [name, content]);

/// First run-level record; carries the DUT snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStart {
    pub name: String,
    pub version: String,
    pub command_line: String,
    pub parameters: Metadata,
    pub dut_info: super::dut::DutInfo,
}

const RUN_START_FIELDS: &[Field] = &[
    Field::wire("name", "name", TypeDesc::Str),
    Field::wire("version", "version", TypeDesc::Str),
    Field::wire("command_line", "commandLine", TypeDesc::Str),
    Field::wire(
        "parameters",
        "parameters",
        TypeDesc::Map(Some((&TypeDesc::Str, &TypeDesc::Any))),
    ),
    Field::object("dut_info", TypeDesc::Record("DutInfo")),
];

impl_record!(
    RunStart,
    Some("testRunStart"),
    RUN_START_FIELDS,
    [name, version, command_line, parameters, dut_info]
);

/// Last run-level record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunEnd {
    pub status: TestStatus,
    pub result: TestResult,
}

const RUN_END_FIELDS: &[Field] = &[
    Field::wire("status", "status", TypeDesc::Enum("TestStatus")),
    Field::wire("result", "result", TypeDesc::Enum("TestResult")),
];

impl_record!(RunEnd, Some("testRunEnd"), RUN_END_FIELDS, [status, result]);

/// Opens a test step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStart {
    pub name: String,
}

const STEP_START_FIELDS: &[Field] = &[Field::wire("name", "name", TypeDesc::Str)];

impl_record!(StepStart, Some("testStepStart"), STEP_START_FIELDS, [name]);

/// Closes a test step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEnd {
    pub status: TestStatus,
}

const STEP_END_FIELDS: &[Field] = &[Field::wire("status", "status", TypeDesc::Enum("TestStatus"))];

impl_record!(StepEnd, Some("testStepEnd"), STEP_END_FIELDS, [status]);
