//! # Runtime type checks
//!
//! Recursively verifies that the [`Node`] values a record exposes agree with
//! the [`TypeDesc`] declared in its field table.
//!
//! Mismatches carry the exact path to the offending field, e.g.
//! `A.f1 -> Dict[4] -> List[1] -> B.f2`. When a union fails, every tried
//! alternative is reported with its own path.
//!
//! An [`TypeDesc::Unsupported`] descriptor is a configuration error and is
//! never swallowed by union matching.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::record::{Node, Record, TypeDesc};

const MAX_VALUE_CHARS: usize = 64;

/// Error type for type-check failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("{0}")]
    Mismatch(TypeMismatch),

    #[error("unsupported type descriptor '{descriptor}' at '{path}'")]
    UnsupportedDescriptor {
        descriptor: &'static str,
        path: String,
    },
}

impl CheckError {
    /// Configuration for unsupported descriptors, data otherwise.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mismatch(_) => ErrorKind::Data,
            Self::UnsupportedDescriptor { .. } => ErrorKind::Configuration,
        }
    }

    /// The value mismatch, if this is one.
    pub fn mismatch(&self) -> Option<&TypeMismatch> {
        match self {
            Self::Mismatch(mismatch) => Some(mismatch),
            Self::UnsupportedDescriptor { .. } => None,
        }
    }
}

/// A value that does not fit its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Runtime type name of the value.
    pub found: String,
    /// Shortened rendering of the value.
    pub value: String,
    /// Rendering of the expected descriptor.
    pub expected: String,
    /// Path to the offending field.
    pub trace: Vec<String>,
    /// Failed alternatives, for union checks.
    pub tries: Vec<TypeMismatch>,
}

impl TypeMismatch {
    fn new(node: &Node<'_>, expected: impl Into<String>, trace: &[String]) -> Self {
        Self {
            found: node.type_name().to_owned(),
            value: ellipsis(&node.to_string()),
            expected: expected.into(),
            trace: trace.to_vec(),
            tries: Vec::new(),
        }
    }

    /// Field path joined with ` -> `.
    pub fn path(&self) -> String {
        self.trace.join(" -> ")
    }

    fn write_tries(&self, f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for attempt in &self.tries {
            write!(
                f,
                "\n{indent}Value '{}' did not match expected type '{}'\n{indent}Path to field is '{}'",
                attempt.value,
                attempt.expected,
                attempt.path()
            )?;
            attempt.write_tries(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for TypeMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.tries.is_empty() {
            write!(f, "Cannot use type '{}'", self.found)?;
        } else {
            write!(f, "Cannot use type '{}' for field value", self.found)?;
        }
        write!(f, "\n  Expected type '{}'", self.expected)?;
        write!(f, "\n  Path to offending field is '{}'", self.path())?;
        if !self.tries.is_empty() {
            f.write_str("\n  Tried checks:")?;
            self.write_tries(f, 1)?;
        }
        Ok(())
    }
}

fn ellipsis(value: &str) -> String {
    match value.char_indices().nth(MAX_VALUE_CHARS) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_owned(),
    }
}

/// Check every field of `record` against its declared type.
pub fn check_record(record: &dyn Record) -> Result<(), CheckError> {
    check(
        &Node::Record(record),
        &TypeDesc::Record(record.type_name()),
        &[],
    )
}

/// Check a single value against a descriptor.
pub fn check(node: &Node<'_>, desc: &TypeDesc, trace: &[String]) -> Result<(), CheckError> {
    match desc {
        TypeDesc::Any => Ok(()),
        TypeDesc::Unsupported(descriptor) => Err(CheckError::UnsupportedDescriptor {
            descriptor: *descriptor,
            path: trace.join(" -> "),
        }),
        TypeDesc::List(item) => check_list(node, desc, *item, trace),
        TypeDesc::Map(entry) => check_map(node, desc, *entry, trace),
        TypeDesc::Union(alternatives) => {
            let alternatives: Vec<&TypeDesc> = alternatives.iter().collect();
            check_alternatives(node, desc, &alternatives, trace)
        }
        TypeDesc::Optional(inner) => check_alternatives(node, desc, &[*inner, &TypeDesc::Absent], trace),
        TypeDesc::Record(name) => check_nested(node, name, trace),
        primitive => {
            if primitive_matches(node, primitive) {
                Ok(())
            } else {
                Err(CheckError::Mismatch(TypeMismatch::new(
                    node,
                    primitive.to_string(),
                    trace,
                )))
            }
        }
    }
}

fn primitive_matches(node: &Node<'_>, desc: &TypeDesc) -> bool {
    match (desc, node) {
        (TypeDesc::Bool, Node::Bool(_)) => true,
        (TypeDesc::Int, Node::Int(_) | Node::UInt(_)) => true,
        (TypeDesc::Float, Node::Float(_)) => true,
        (TypeDesc::Str, Node::Str(_)) => true,
        (TypeDesc::Enum(expected), Node::Enum { type_name, .. }) => expected == type_name,
        (TypeDesc::Absent, node) => node.is_none(),
        _ => false,
    }
}

fn check_list(
    node: &Node<'_>,
    desc: &TypeDesc,
    item: Option<&'static TypeDesc>,
    trace: &[String],
) -> Result<(), CheckError> {
    let Node::List(items) = node else {
        return Err(CheckError::Mismatch(TypeMismatch::new(
            node,
            desc.to_string(),
            trace,
        )));
    };

    // non-parametrized list: nothing to say about the elements
    let Some(item) = item else {
        return Ok(());
    };

    for (index, value) in items.iter().enumerate() {
        let subtrace = extend(trace, format!("List[{index}]"));
        check(value, item, &subtrace)?;
    }
    Ok(())
}

fn check_map(
    node: &Node<'_>,
    desc: &TypeDesc,
    entry: Option<(&'static TypeDesc, &'static TypeDesc)>,
    trace: &[String],
) -> Result<(), CheckError> {
    let Node::Map(entries) = node else {
        return Err(CheckError::Mismatch(TypeMismatch::new(
            node,
            desc.to_string(),
            trace,
        )));
    };

    let Some((key_desc, value_desc)) = entry else {
        return Ok(());
    };

    for (key, value) in entries {
        let subtrace = extend(trace, format!("Dict[{key}]"));
        check(key, key_desc, &subtrace)?;
        check(value, value_desc, &subtrace)?;
    }
    Ok(())
}

fn check_alternatives(
    node: &Node<'_>,
    desc: &TypeDesc,
    alternatives: &[&TypeDesc],
    trace: &[String],
) -> Result<(), CheckError> {
    let mut tries = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        match check(node, alternative, trace) {
            Ok(()) => return Ok(()),
            Err(CheckError::Mismatch(mismatch)) => tries.push(mismatch),
            Err(unsupported) => return Err(unsupported),
        }
    }

    let mut mismatch = TypeMismatch::new(node, desc.to_string(), trace);
    mismatch.tries = tries;
    Err(CheckError::Mismatch(mismatch))
}

fn check_nested(node: &Node<'_>, name: &'static str, trace: &[String]) -> Result<(), CheckError> {
    let Node::Record(record) = node else {
        return Err(CheckError::Mismatch(TypeMismatch::new(node, name, trace)));
    };
    if record.type_name() != name {
        return Err(CheckError::Mismatch(TypeMismatch::new(node, name, trace)));
    }

    for field_value in record.fields() {
        let subtrace = extend(trace, format!("{name}.{}", field_value.field.name));
        check(&field_value.value, &field_value.field.ty, &subtrace)?;
    }
    Ok(())
}

fn extend(trace: &[String], segment: String) -> Vec<String> {
    let mut extended = Vec::with_capacity(trace.len() + 1);
    extended.extend_from_slice(trace);
    extended.push(segment);
    extended
}
