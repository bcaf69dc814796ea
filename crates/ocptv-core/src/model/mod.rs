//! # Wire model
//!
//! Typed records for every object of the OCP Test & Validation output
//! schema. Each record carries a `const` field table (see
//! [`crate::record`]) and implements [`Record`] through `impl_record!`.
//!
//! | Module | Records |
//! |--------|---------|
//! | [`enums`] | `LogSeverity`, `DiagnosisType`, `TestStatus`, `TestResult`, `SoftwareType`, `SubcomponentType`, `ValidatorType` |
//! | [`dut`] | `PlatformInfo`, `SoftwareInfo`, `HardwareInfo`, `Subcomponent`, `DutInfo` |
//! | [`artifacts`] | run and step level payloads, measurements, validators |
//! | [`root`] | `Root` envelope and the `RunArtifact` / `StepArtifact` unions |

use serde_json::Value;

use crate::error::SerializeError;
use crate::record::{Node, Record, TypeDesc};
use crate::timestamp::{format_timestamp, FormatContext};

/// Implements [`Record`] and [`crate::record::ToNode`] for a struct whose
/// fields are listed in the same order as its field table.
///
/// Declared ahead of the submodules so they see it through textual scope.
macro_rules! impl_record {
    ($ty:ident, $spec:expr, $table:expr, [$($field:ident),* $(,)?]) => {
        impl $crate::record::Record for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn spec_object(&self) -> Option<&'static str> {
                $spec
            }

            fn fields(&self) -> Vec<$crate::record::FieldValue<'_>> {
                $crate::record::zip_fields(
                    $table,
                    vec![$($crate::record::ToNode::to_node(&self.$field)),*],
                )
            }
        }

        $crate::record_to_node!($ty);
    };
}

pub mod artifacts;
pub mod dut;
pub mod enums;
pub mod root;

/// Free-form keyed data attached to several records.
pub type Metadata = serde_json::Map<String, Value>;

pub(crate) const METADATA: TypeDesc =
    TypeDesc::Optional(&TypeDesc::Map(Some((&TypeDesc::Str, &TypeDesc::Any))));

pub(crate) const OPTIONAL_STR: TypeDesc = TypeDesc::Optional(&TypeDesc::Str);

/// Renders epoch seconds in the configured display timezone.
pub(crate) fn format_timestamp_field(
    node: &Node<'_>,
    ctx: &FormatContext,
) -> Result<Value, SerializeError> {
    match node {
        Node::Float(seconds) => Ok(Value::String(format_timestamp(
            *seconds,
            ctx.resolved_offset(),
        )?)),
        other => Err(SerializeError::FormatterInput {
            field: "timestamp",
            expected: "epoch seconds",
            found: other.type_name(),
        }),
    }
}

/// Replaces a referenced hardware info with its id.
pub(crate) fn format_hardware_id(
    node: &Node<'_>,
    _ctx: &FormatContext,
) -> Result<Value, SerializeError> {
    record_id(node, "hardwareInfoId").map(Value::String)
}

/// Replaces a list of software infos with their ids.
pub(crate) fn format_software_ids(
    node: &Node<'_>,
    _ctx: &FormatContext,
) -> Result<Value, SerializeError> {
    let Node::List(items) = node else {
        return Err(SerializeError::FormatterInput {
            field: "softwareInfoIds",
            expected: "a list of software infos",
            found: node.type_name(),
        });
    };
    items
        .iter()
        .map(|item| record_id(item, "softwareInfoIds").map(Value::String))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn record_id(node: &Node<'_>, field: &'static str) -> Result<String, SerializeError> {
    if let Node::Record(record) = node {
        if let Some(id) = id_of(*record) {
            return Ok(id);
        }
    }
    Err(SerializeError::FormatterInput {
        field,
        expected: "a record with an id",
        found: node.type_name(),
    })
}

fn id_of(record: &dyn Record) -> Option<String> {
    record
        .fields()
        .into_iter()
        .find(|field_value| field_value.field.name == "id")
        .and_then(|field_value| match field_value.value {
            Node::Str(id) => Some(id.to_owned()),
            _ => None,
        })
}
