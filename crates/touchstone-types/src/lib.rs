// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed value tree for captured test results.
//!
//! Every value captured against a test case is stored as a [`DataPoint`] — a
//! tagged union over eight kinds: boolean, four distinct numeric variants,
//! string, array, and object. The four numeric variants are deliberately kept
//! apart: the wire format and the comparison semantics both depend on the
//! distinction, so a `Signed(2)` never silently becomes an `Unsigned(2)`.
//!
//! Two projections are provided here:
//! - [`DataPoint::to_json`] — a deterministic JSON rendering (floats rounded
//!   to at most three fractional digits, object members ordered by name);
//! - [`DataPoint::to_string`] via `Display` — the canonical string form used
//!   inside comparison records, which is simply the compact serialization of
//!   the JSON projection.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value, json};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by mutating operations on a [`DataPoint`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValueError {
    /// `push_back` was called on a node that is not an array.
    #[error("cannot append: node is {actual}, not an array")]
    NotAnArray {
        /// Kind of the node that rejected the operation.
        actual: ValueKind,
    },

    /// `add_member` was called on a node that is not an object.
    #[error("cannot add member: node is {actual}, not an object")]
    NotAnObject {
        /// Kind of the node that rejected the operation.
        actual: ValueKind,
    },

    /// `increment` was called on a node that is not an unsigned number.
    #[error("cannot increment: node is {actual}, not an unsigned number")]
    NotUnsigned {
        /// Kind of the node that rejected the operation.
        actual: ValueKind,
    },

    /// An object member was given an empty name.
    #[error("object member name may not be empty")]
    EmptyMemberName,
}

// ---------------------------------------------------------------------------
// ValueKind
// ---------------------------------------------------------------------------

/// Discriminant of a [`DataPoint`].
///
/// The wire format encodes this tag and the comparator dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean leaf.
    Boolean,
    /// Signed 64-bit integer leaf.
    Signed,
    /// Unsigned 64-bit integer leaf.
    Unsigned,
    /// 32-bit float leaf.
    Float,
    /// 64-bit float leaf.
    Double,
    /// UTF-8 string leaf.
    String,
    /// Ordered sequence of nodes.
    Array,
    /// Named members with an optional type tag.
    Object,
}

impl ValueKind {
    /// Human-readable label used in comparison records.
    ///
    /// All four numeric variants collapse to `"number"`: the distinction
    /// matters for comparison dispatch, not for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::Signed | Self::Unsigned | Self::Float | Self::Double => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether this kind is one of the four numeric variants.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Signed | Self::Unsigned | Self::Float | Self::Double
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// DataPoint
// ---------------------------------------------------------------------------

/// A node in the captured-value tree.
///
/// Interior nodes are arrays or objects; every other variant is a leaf.
/// Nodes are immutable once inserted except through the explicitly provided
/// mutations: [`push_back`](DataPoint::push_back) on arrays and
/// [`increment`](DataPoint::increment) on unsigned numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPoint {
    /// Boolean leaf.
    Boolean(bool),
    /// Signed 64-bit integer leaf.
    Signed(i64),
    /// Unsigned 64-bit integer leaf.
    Unsigned(u64),
    /// 32-bit float leaf.
    Float(f32),
    /// 64-bit float leaf.
    Double(f64),
    /// UTF-8 string leaf.
    Text(String),
    /// Ordered sequence of nodes; insertion order is preserved.
    Array(Vec<DataPoint>),
    /// Named members ordered by name, with an optional type-tag.
    Object {
        /// Type-tag of the object; empty means untagged.
        tag: String,
        /// Members, iterated in lexicographic name order.
        members: BTreeMap<String, DataPoint>,
    },
}

impl DataPoint {
    /// Construct a boolean leaf.
    pub fn boolean(value: bool) -> Self {
        Self::Boolean(value)
    }

    /// Construct a signed 64-bit integer leaf.
    pub fn number_signed(value: i64) -> Self {
        Self::Signed(value)
    }

    /// Construct an unsigned 64-bit integer leaf.
    pub fn number_unsigned(value: u64) -> Self {
        Self::Unsigned(value)
    }

    /// Construct a 32-bit float leaf.
    pub fn number_float(value: f32) -> Self {
        Self::Float(value)
    }

    /// Construct a 64-bit float leaf.
    pub fn number_double(value: f64) -> Self {
        Self::Double(value)
    }

    /// Construct a string leaf.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Construct an empty array.
    pub fn array() -> Self {
        Self::Array(Vec::new())
    }

    /// Construct an empty object with the given type-tag (may be empty).
    pub fn object(tag: impl Into<String>) -> Self {
        Self::Object {
            tag: tag.into(),
            members: BTreeMap::new(),
        }
    }

    /// Discriminant of this node.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Signed(_) => ValueKind::Signed,
            Self::Unsigned(_) => ValueKind::Unsigned,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Text(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object { .. } => ValueKind::Object,
        }
    }

    /// Append a node to this array.
    pub fn push_back(&mut self, value: DataPoint) -> Result<(), ValueError> {
        match self {
            Self::Array(values) => {
                values.push(value);
                Ok(())
            }
            other => Err(ValueError::NotAnArray {
                actual: other.kind(),
            }),
        }
    }

    /// Insert a named member into this object, replacing any existing member
    /// with the same name. Member names must be non-empty.
    pub fn add_member(
        &mut self,
        name: impl Into<String>,
        value: DataPoint,
    ) -> Result<(), ValueError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValueError::EmptyMemberName);
        }
        match self {
            Self::Object { members, .. } => {
                members.insert(name, value);
                Ok(())
            }
            other => Err(ValueError::NotAnObject {
                actual: other.kind(),
            }),
        }
    }

    /// Increment this unsigned number by one.
    pub fn increment(&mut self) -> Result<(), ValueError> {
        match self {
            Self::Unsigned(value) => {
                *value += 1;
                Ok(())
            }
            other => Err(ValueError::NotUnsigned {
                actual: other.kind(),
            }),
        }
    }

    /// Deterministic JSON projection of this node.
    ///
    /// Floats and doubles are rounded to at most three fractional digits;
    /// non-finite floats render as `null`. An object with an empty type-tag
    /// renders as the bare member mapping; a tagged object renders as the
    /// single-key wrapper `{ tag: { members... } }`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(value) => json!(value),
            Self::Signed(value) => json!(value),
            Self::Unsigned(value) => json!(value),
            Self::Float(value) => float_json(f64::from(*value)),
            Self::Double(value) => float_json(*value),
            Self::Text(value) => json!(value),
            Self::Array(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            Self::Object { tag, members } => {
                let mapping: Map<String, Value> = members
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect();
                if tag.is_empty() {
                    Value::Object(mapping)
                } else {
                    let mut wrapper = Map::new();
                    wrapper.insert(tag.clone(), Value::Object(mapping));
                    Value::Object(wrapper)
                }
            }
        }
    }
}

/// Canonical string form: the compact serialization of the JSON projection.
/// String leaves therefore include their quotes.
impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json().to_string())
    }
}

/// Round to at most three fractional digits and project as a JSON number.
///
/// This is the single rounding rule for every floating-point field the
/// system emits — captured leaves, comparison scores, and overview means —
/// so textual output stays stable across hosts. Non-finite values project
/// as `null`.
pub fn float_json(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    serde_json::Number::from_f64(rounded).map_or(Value::Null, Value::Number)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_kinds() {
        assert_eq!(DataPoint::boolean(true).kind(), ValueKind::Boolean);
        assert_eq!(DataPoint::number_signed(-4).kind(), ValueKind::Signed);
        assert_eq!(DataPoint::number_unsigned(4).kind(), ValueKind::Unsigned);
        assert_eq!(DataPoint::number_float(1.5).kind(), ValueKind::Float);
        assert_eq!(DataPoint::number_double(1.5).kind(), ValueKind::Double);
        assert_eq!(DataPoint::string("x").kind(), ValueKind::String);
        assert_eq!(DataPoint::array().kind(), ValueKind::Array);
        assert_eq!(DataPoint::object("").kind(), ValueKind::Object);
    }

    #[test]
    fn numeric_variants_do_not_compare_equal() {
        assert_ne!(DataPoint::number_signed(2), DataPoint::number_unsigned(2));
        assert_ne!(DataPoint::boolean(true), DataPoint::number_unsigned(1));
    }

    #[test]
    fn kind_labels() {
        assert_eq!(ValueKind::Boolean.label(), "bool");
        assert_eq!(ValueKind::Signed.label(), "number");
        assert_eq!(ValueKind::Unsigned.label(), "number");
        assert_eq!(ValueKind::Float.label(), "number");
        assert_eq!(ValueKind::Double.label(), "number");
        assert_eq!(ValueKind::String.label(), "string");
        assert_eq!(ValueKind::Array.label(), "array");
        assert_eq!(ValueKind::Object.label(), "object");
    }

    #[test]
    fn push_back_appends_in_order() {
        let mut arr = DataPoint::array();
        arr.push_back(DataPoint::number_signed(1)).unwrap();
        arr.push_back(DataPoint::number_signed(2)).unwrap();
        assert_eq!(arr.to_string(), "[1,2]");
    }

    #[test]
    fn push_back_rejects_non_array() {
        let mut leaf = DataPoint::boolean(true);
        let err = leaf.push_back(DataPoint::boolean(false)).unwrap_err();
        assert_eq!(
            err,
            ValueError::NotAnArray {
                actual: ValueKind::Boolean
            }
        );
    }

    #[test]
    fn add_member_orders_by_name() {
        let mut obj = DataPoint::object("");
        obj.add_member("zeta", DataPoint::number_signed(1)).unwrap();
        obj.add_member("alpha", DataPoint::number_signed(2))
            .unwrap();
        assert_eq!(obj.to_string(), r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn add_member_rejects_empty_name() {
        let mut obj = DataPoint::object("");
        let err = obj.add_member("", DataPoint::boolean(true)).unwrap_err();
        assert_eq!(err, ValueError::EmptyMemberName);
    }

    #[test]
    fn add_member_replaces_existing() {
        let mut obj = DataPoint::object("");
        obj.add_member("k", DataPoint::number_signed(1)).unwrap();
        obj.add_member("k", DataPoint::number_signed(2)).unwrap();
        assert_eq!(obj.to_string(), r#"{"k":2}"#);
    }

    #[test]
    fn tagged_object_renders_wrapped() {
        let mut obj = DataPoint::object("Point");
        obj.add_member("x", DataPoint::number_signed(1)).unwrap();
        obj.add_member("y", DataPoint::number_signed(2)).unwrap();
        assert_eq!(obj.to_string(), r#"{"Point":{"x":1,"y":2}}"#);
    }

    #[test]
    fn increment_unsigned() {
        let mut counter = DataPoint::number_unsigned(1);
        counter.increment().unwrap();
        assert_eq!(counter, DataPoint::number_unsigned(2));
    }

    #[test]
    fn increment_rejects_other_kinds() {
        let mut signed = DataPoint::number_signed(1);
        let err = signed.increment().unwrap_err();
        assert_eq!(
            err,
            ValueError::NotUnsigned {
                actual: ValueKind::Signed
            }
        );
    }

    #[test]
    fn float_rounds_to_three_digits() {
        assert_eq!(DataPoint::number_double(0.123456).to_string(), "0.123");
        assert_eq!(DataPoint::number_double(0.1 + 0.2).to_string(), "0.3");
        assert_eq!(DataPoint::number_double(2.0).to_string(), "2.0");
    }

    #[test]
    fn non_finite_floats_render_null() {
        assert_eq!(DataPoint::number_double(f64::NAN).to_string(), "null");
        assert_eq!(DataPoint::number_double(f64::INFINITY).to_string(), "null");
    }

    #[test]
    fn string_canonical_form_is_quoted() {
        assert_eq!(DataPoint::string("leo-ferre").to_string(), "\"leo-ferre\"");
    }

    #[test]
    fn nested_tree_projection() {
        let mut inner = DataPoint::array();
        inner.push_back(DataPoint::string("a")).unwrap();
        let mut obj = DataPoint::object("");
        obj.add_member("list", inner).unwrap();
        obj.add_member("flag", DataPoint::boolean(false)).unwrap();
        assert_eq!(obj.to_string(), r#"{"flag":false,"list":["a"]}"#);
    }
}
