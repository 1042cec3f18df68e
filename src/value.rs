//! Dynamic value model for encoded object graphs.
//!
//! Reference kinds (`Array`, `Map`, `Object`) are shared through
//! `Rc<RefCell<_>>`, so a graph can contain the same instance twice or
//! point back at an ancestor. Identity is the `Rc` pointer.
//!
//! # Example
//!
//! ```
//! use xlang_wire::Value;
//!
//! let node = Value::object("node", [("id", Value::Int32(1))]);
//! let list = Value::array(vec![node.clone(), node]);
//! if let Value::Array(items) = &list {
//!     let items = items.borrow();
//!     assert!(items[0].same_instance(&items[1]));
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use bytes::Bytes;

/// Shared list.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Shared map with ordered entries.
pub type MapRef = Rc<RefCell<Vec<(Value, Value)>>>;
/// Shared tagged record.
pub type ObjectRef = Rc<RefCell<Object>>;

/// A tagged record: type tag plus named fields.
///
/// An absent field reads as `Value::Null`, and compares equal to one.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub tag: String,
    pub fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Get a field, `Value::Null` if absent.
    pub fn get(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self
                .fields
                .iter()
                .all(|(name, value)| other.fields.get(name).unwrap_or(&Value::Null) == value)
            && other
                .fields
                .iter()
                .filter(|(name, _)| !self.fields.contains_key(*name))
                .all(|(_, value)| value.is_null())
    }
}

/// Any value the engine can encode.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The null sentinel.
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Binary(Bytes),
    Array(ArrayRef),
    Map(MapRef),
    Object(ObjectRef),
}

impl Value {
    /// Build a shared array.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Build a shared map.
    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    /// Build a shared object from `(name, value)` pairs.
    pub fn object<'a>(
        tag: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        let mut object = Object::new(tag);
        for (name, value) in fields {
            object.set(name, value);
        }
        Value::Object(Rc::new(RefCell::new(object)))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Identity key of a reference kind, `None` for inline values.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// Whether both values are the same shared instance.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Borrow the object and read one field.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => Some(obj.borrow().get(name)),
            _ => None,
        }
    }
}

/// Structural equality; shared instances compare equal without descending.
///
/// Comparing two distinct cyclic graphs does not terminate.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Binary(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Value::object("point", [("x", Value::Int32(1)), ("y", Value::Int32(2))]);
        let b = Value::object("point", [("y", Value::Int32(2)), ("x", Value::Int32(1))]);
        assert_eq!(a, b);
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn test_identity_only_for_reference_kinds() {
        assert!(Value::Int32(1).identity().is_none());
        assert!(Value::from("s").identity().is_none());
        let list = Value::array(vec![]);
        assert!(list.identity().is_some());
        assert!(list.same_instance(&list.clone()));
    }

    #[test]
    fn test_self_referencing_object_equals_itself() {
        let node = Value::object("node", []);
        if let Value::Object(obj) = &node {
            obj.borrow_mut().set("next", node.clone());
        }
        // Pointer identity short-circuits the cycle
        assert_eq!(node, node.clone());
    }

    #[test]
    fn test_absent_field_equals_null() {
        let sparse = Value::object("t", [("a", Value::Int32(1))]);
        let filled = Value::object("t", [("a", Value::Int32(1)), ("b", Value::Null)]);
        assert_eq!(sparse, filled);
        assert_eq!(filled, sparse);

        let other = Value::object("t", [("a", Value::Int32(1)), ("b", Value::Int32(0))]);
        assert_ne!(sparse, other);
        assert_ne!(other, sparse);
        assert_ne!(Value::object("u", []), Value::object("t", []));
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some(5)), Value::Int32(5));
    }

    #[test]
    fn test_missing_field_is_null() {
        let obj = Value::object("t", []);
        assert_eq!(obj.field("missing"), Some(Value::Null));
        assert_eq!(Value::Int8(0).field("x"), None);
    }
}
