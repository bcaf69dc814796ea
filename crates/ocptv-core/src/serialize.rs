//! Record graph to JSON conversion.
//!
//! The output is a `serde_json::Value` tree; object keys are kept in a
//! sorted map so the rendered text is canonical for a given record.

use serde_json::{Map, Number, Value};

use crate::error::SerializeError;
use crate::record::{Node, Record};
use crate::timestamp::FormatContext;

/// Serialize one record and everything it references.
pub fn to_value(record: &dyn Record, ctx: &FormatContext) -> Result<Value, SerializeError> {
    serialize_record(record, ctx).map(Value::Object)
}

/// Serialize and render as compact JSON text.
pub fn to_json_string(record: &dyn Record, ctx: &FormatContext) -> Result<String, SerializeError> {
    let value = to_value(record, ctx)?;
    Ok(serde_json::to_string(&value)?)
}

fn serialize_record(
    record: &dyn Record,
    ctx: &FormatContext,
) -> Result<Map<String, Value>, SerializeError> {
    let mut object = Map::new();

    for field_value in record.fields() {
        let field = field_value.field;
        let value = &field_value.value;

        match value {
            Node::Absent | Node::Null if field.ty.allows_absence() => continue,
            Node::Absent => {
                return Err(SerializeError::MissingRequiredField {
                    record: record.type_name(),
                    field: field.name,
                })
            }
            // an explicit null on a required field is written as `null`
            _ => {}
        }

        // a declared wire key wins over the value's own object name
        let Some(key) = field.wire.or_else(|| value.spec_object()) else {
            return Err(SerializeError::MissingWireName {
                record: record.type_name(),
                field: field.name,
            });
        };

        let rendered = match field.format {
            Some(format) => format(value, ctx)?,
            None => serialize_node(value, ctx)?,
        };
        object.insert(key.to_owned(), rendered);
    }

    Ok(object)
}

/// Serialize a free-standing value.
pub fn serialize_node(node: &Node<'_>, ctx: &FormatContext) -> Result<Value, SerializeError> {
    match node {
        Node::Absent | Node::Null => Ok(Value::Null),
        Node::Bool(flag) => Ok(Value::Bool(*flag)),
        Node::Int(int) => Ok(Value::from(*int)),
        Node::UInt(uint) => Ok(Value::from(*uint)),
        Node::Float(float) => Number::from_f64(*float)
            .map(Value::Number)
            .ok_or(SerializeError::NonFiniteNumber { value: *float }),
        Node::Str(text) => Ok(Value::String((*text).to_owned())),
        Node::Enum { value, .. } => Ok(Value::String((*value).to_owned())),
        Node::List(items) => items
            .iter()
            .map(|item| serialize_node(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Node::Map(entries) => {
            let mut object = Map::new();
            for (key, value) in entries {
                let Node::Str(key) = key else {
                    return Err(SerializeError::NonStringKey {
                        type_name: key.type_name(),
                    });
                };
                object.insert((*key).to_owned(), serialize_node(value, ctx)?);
            }
            Ok(Value::Object(object))
        }
        Node::Record(record) => serialize_record(*record, ctx).map(Value::Object),
        Node::Opaque(type_name) => Err(SerializeError::Unserializable {
            type_name: *type_name,
        }),
    }
}
