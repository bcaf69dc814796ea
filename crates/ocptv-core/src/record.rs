//! # Record descriptors
//!
//! Every wire object is a [`Record`]: a Rust struct that exposes a static
//! field table (Rust field name, wire key, structural type, optional
//! formatter) and a borrowed view of its current values as [`Node`]s.
//!
//! The table is plain `const` data, so the serializer and the type-check
//! engine walk records without any runtime reflection.
//!
//! ## Naming rules
//!
//! | Source | Used when |
//! |--------|-----------|
//! | [`Field::wire`] | always, if present |
//! | [`Record::spec_object`] of the value | the field has no wire key (tagged-union members, `dutInfo`, `metadata`, ...) |
//!
//! A field with neither is a malformed declaration and fails serialization
//! with a configuration error.

use std::fmt::{self, Debug, Display, Formatter};

use serde_json::Value;

use crate::error::SerializeError;
use crate::timestamp::FormatContext;

/// Formatter hook for a single field. Output is used verbatim.
pub type FieldFormatter = fn(&Node<'_>, &FormatContext) -> Result<Value, SerializeError>;

/// Structural type descriptor checked by [`crate::typecheck`].
#[derive(Debug, Clone, Copy)]
pub enum TypeDesc {
    Bool,
    Int,
    Float,
    Str,
    /// Enumerated value; the payload is the enum's type name.
    Enum(&'static str),
    /// The "no value" type. Only meaningful inside unions.
    Absent,
    /// Homogeneous list. `None` means non-parametrized: only the container is checked.
    List(Option<&'static TypeDesc>),
    /// Homogeneous mapping. `None` means non-parametrized.
    Map(Option<(&'static TypeDesc, &'static TypeDesc)>),
    /// Alternatives tried in declared order.
    Union(&'static [TypeDesc]),
    /// Shorthand for `Union[T, Absent]`.
    Optional(&'static TypeDesc),
    /// Nested record, identified by [`Record::type_name`].
    Record(&'static str),
    /// Accepts anything.
    Any,
    /// A descriptor kind the engine has no rule for.
    Unsupported(&'static str),
}

impl TypeDesc {
    /// Whether a field of this type may be left without a value.
    ///
    /// `Any` accepts every value but still requires one.
    pub fn allows_absence(&self) -> bool {
        match self {
            Self::Absent | Self::Optional(_) => true,
            Self::Union(alternatives) => alternatives.iter().any(Self::allows_absence),
            _ => false,
        }
    }
}

impl Display for TypeDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Enum(name) | Self::Record(name) => f.write_str(name),
            Self::Absent => f.write_str("NoneType"),
            Self::List(None) => f.write_str("List"),
            Self::List(Some(item)) => write!(f, "List[{item}]"),
            Self::Map(None) => f.write_str("Dict"),
            Self::Map(Some((key, value))) => write!(f, "Dict[{key}, {value}]"),
            Self::Union(alternatives) => {
                f.write_str("Union[")?;
                for (index, alternative) in alternatives.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                f.write_str("]")
            }
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::Any => f.write_str("Any"),
            Self::Unsupported(name) => f.write_str(name),
        }
    }
}

/// One row of a record's field table.
#[derive(Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub wire: Option<&'static str>,
    pub ty: TypeDesc,
    pub format: Option<FieldFormatter>,
}

impl Field {
    /// Field serialized under a fixed wire key.
    pub const fn wire(name: &'static str, wire: &'static str, ty: TypeDesc) -> Self {
        Self {
            name,
            wire: Some(wire),
            ty,
            format: None,
        }
    }

    /// Field named after the object name its value declares.
    pub const fn object(name: &'static str, ty: TypeDesc) -> Self {
        Self {
            name,
            wire: None,
            ty,
            format: None,
        }
    }

    /// Attach a formatter whose output replaces the default rendering.
    pub const fn formatted(mut self, format: FieldFormatter) -> Self {
        self.format = Some(format);
        self
    }
}

impl Debug for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("wire", &self.wire)
            .field("ty", &self.ty)
            .field("formatted", &self.format.is_some())
            .finish()
    }
}

/// Borrowed, untyped view of a value held by a record.
#[derive(Debug, Clone)]
pub enum Node<'a> {
    /// No value was provided.
    Absent,
    /// An explicit JSON `null` coming from free-form content.
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(&'a str),
    Enum {
        type_name: &'static str,
        value: &'static str,
    },
    List(Vec<Node<'a>>),
    Map(Vec<(Node<'a>, Node<'a>)>),
    Record(&'a dyn Record),
    /// A value of a type the serializer has no strategy for.
    Opaque(&'static str),
}

impl<'a> Node<'a> {
    /// `Absent` or an explicit `null`.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::Absent | Self::Null)
    }

    /// Object name declared by the value itself, if any.
    pub fn spec_object(&self) -> Option<&'static str> {
        match self {
            Self::Record(record) => record.spec_object(),
            _ => None,
        }
    }

    /// Runtime type name used in type-check diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Absent | Self::Null => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Enum { type_name, .. } => *type_name,
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Record(record) => record.type_name(),
            Self::Opaque(type_name) => *type_name,
        }
    }

    /// View a free-form JSON value as a node tree.
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Self::Int(int)
                } else if let Some(uint) = number.as_u64() {
                    Self::UInt(uint)
                } else {
                    Self::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(text) => Self::Str(text),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (Self::Str(key), Self::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl Display for Node<'_> {
    /// Short rendering used in type-check traces and messages.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent | Self::Null => f.write_str("None"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(int) => write!(f, "{int}"),
            Self::UInt(uint) => write!(f, "{uint}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::Str(text) => f.write_str(text),
            Self::Enum { value, .. } => f.write_str(value),
            Self::List(items) => write!(f, "<list of {}>", items.len()),
            Self::Map(entries) => write!(f, "<dict of {}>", entries.len()),
            Self::Record(record) => write!(f, "<{}>", record.type_name()),
            Self::Opaque(type_name) => write!(f, "<{type_name}>"),
        }
    }
}

/// A field table row paired with the value currently held.
#[derive(Debug, Clone)]
pub struct FieldValue<'a> {
    pub field: &'static Field,
    pub value: Node<'a>,
}

/// A serializable wire object.
pub trait Record: Debug + Send + Sync {
    /// Name used in type-check traces, e.g. `Measurement`.
    fn type_name(&self) -> &'static str;

    /// Wire name this record takes when it fills a field with no wire key.
    fn spec_object(&self) -> Option<&'static str>;

    /// Current values, in field-table order.
    fn fields(&self) -> Vec<FieldValue<'_>>;
}

/// Pair a static field table with a value list built in the same order.
pub fn zip_fields<'a>(table: &'static [Field], values: Vec<Node<'a>>) -> Vec<FieldValue<'a>> {
    debug_assert_eq!(table.len(), values.len(), "field table/value count mismatch");
    table
        .iter()
        .zip(values)
        .map(|(field, value)| FieldValue { field, value })
        .collect()
}

/// Conversion of model values into [`Node`]s.
pub trait ToNode {
    fn to_node(&self) -> Node<'_>;
}

impl ToNode for String {
    fn to_node(&self) -> Node<'_> {
        Node::Str(self)
    }
}

impl ToNode for bool {
    fn to_node(&self) -> Node<'_> {
        Node::Bool(*self)
    }
}

impl ToNode for i64 {
    fn to_node(&self) -> Node<'_> {
        Node::Int(*self)
    }
}

impl ToNode for u32 {
    fn to_node(&self) -> Node<'_> {
        Node::Int(i64::from(*self))
    }
}

impl ToNode for u64 {
    fn to_node(&self) -> Node<'_> {
        Node::UInt(*self)
    }
}

impl ToNode for f64 {
    fn to_node(&self) -> Node<'_> {
        Node::Float(*self)
    }
}

impl ToNode for Value {
    fn to_node(&self) -> Node<'_> {
        Node::from_json(self)
    }
}

impl ToNode for serde_json::Map<String, Value> {
    fn to_node(&self) -> Node<'_> {
        Node::Map(
            self.iter()
                .map(|(key, value)| (Node::Str(key), Node::from_json(value)))
                .collect(),
        )
    }
}

impl<T: ToNode> ToNode for Option<T> {
    fn to_node(&self) -> Node<'_> {
        match self {
            Some(value) => value.to_node(),
            None => Node::Absent,
        }
    }
}

impl<T: ToNode> ToNode for Vec<T> {
    fn to_node(&self) -> Node<'_> {
        Node::List(self.iter().map(ToNode::to_node).collect())
    }
}

/// Implements [`ToNode`] for record types as `Node::Record`.
#[macro_export]
macro_rules! record_to_node {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::record::ToNode for $ty {
                fn to_node(&self) -> $crate::record::Node<'_> {
                    $crate::record::Node::Record(self)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_optional_types_allow_absence() {
        assert!(TypeDesc::Optional(&TypeDesc::Int).allows_absence());
        assert!(!TypeDesc::Any.allows_absence());
        assert!(TypeDesc::Union(&[TypeDesc::Int, TypeDesc::Absent]).allows_absence());
        assert!(!TypeDesc::Union(&[TypeDesc::Int, TypeDesc::Str]).allows_absence());
        assert!(!TypeDesc::List(Some(&TypeDesc::Int)).allows_absence());
    }

    #[test]
    fn descriptors_render_like_type_hints() {
        let desc = TypeDesc::Map(Some((&TypeDesc::Int, &TypeDesc::Optional(&TypeDesc::List(Some(&TypeDesc::Record("B")))))));
        assert_eq!(desc.to_string(), "Dict[int, Optional[List[B]]]");
    }

    #[test]
    fn json_values_map_onto_nodes() {
        let value = json!({ "a": [1, 2.5, "x", null, true] });
        let node = Node::from_json(&value);
        let Node::Map(entries) = node else {
            panic!("expected map node");
        };
        assert_eq!(entries.len(), 1);
        let Node::List(items) = &entries[0].1 else {
            panic!("expected list node");
        };
        let names: Vec<_> = items.iter().map(Node::type_name).collect();
        assert_eq!(names, ["int", "float", "str", "NoneType", "bool"]);
    }
}
