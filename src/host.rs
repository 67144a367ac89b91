//! Host object model
//!
//! The engines never touch application types directly. They read and write a
//! dynamic [`Value`] graph through an [`Accessor`], which resolves members,
//! instantiates classes and builds collections by name.

use crate::error::{Error, Result};
use crate::types::XsdType;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A host-side value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value
    UInt(u64),
    /// Decimal value
    Decimal(Decimal),
    /// Double or float value
    Double(f64),
    /// String value
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Timestamp, normalized to UTC
    DateTime(DateTime<Utc>),
    /// Object with named members
    Object(Object),
    /// Generic growable collection
    List(Vec<Value>),
    /// Fixed-size native array
    Array(Vec<Value>),
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Decimal(_) => "decimal",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Object(_) => "object",
            Value::List(_) => "list",
            Value::Array(_) => "array",
        }
    }

    /// Get the object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get a member of an object value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(name))
    }

    /// Convert from JSON
    ///
    /// Integral numbers become `Int` (or `UInt` above `i64::MAX`), other
    /// numbers become `Decimal` when exactly representable, else `Double`.
    pub fn from_json(json: &JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    n.to_string()
                        .parse::<Decimal>()
                        .map(Value::Decimal)
                        .unwrap_or(Value::Double(f))
                }
            }
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => {
                let mut obj = Object::new("");
                for (key, value) in map {
                    obj.set(key, Value::from_json(value));
                }
                Value::Object(obj)
            }
        }
    }

    /// Convert to JSON; temporal values become ISO-8601 strings
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::UInt(u) => JsonValue::from(*u),
            Value::Decimal(d) => d
                .to_f64()
                .and_then(Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            Value::Double(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.to_string())),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => JsonValue::String(t.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            Value::Object(obj) => {
                let mut map = Map::new();
                for (key, value) in obj.fields() {
                    map.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Value::List(items) | Value::Array(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Serialize any `Serialize` type into a [`Value`] graph
pub fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    let json = serde_json::to_value(data)
        .map_err(|e| Error::Accessor(format!("cannot serialize host data: {}", e)))?;
    Ok(Value::from_json(&json))
}

/// A host object: a class label plus named members in insertion order
#[derive(Debug, Clone, Default)]
pub struct Object {
    class: String,
    fields: IndexMap<String, Value>,
}

impl Object {
    /// Create an empty object of the given class
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: IndexMap::new(),
        }
    }

    /// Add a member, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Class label
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Get a member
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a member mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Set a member
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Iterate over members
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

// Objects compare by mapped members only; the class label is informational
// and a null member equals an absent one.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        let present = |obj: &Object| obj.fields.values().filter(|v| !v.is_null()).count();
        present(self) == present(other)
            && self
                .fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .all(|(k, v)| other.fields.get(k) == Some(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Member access, instantiation and collection building by name
///
/// Schema nodes store names only; an accessor binds them to host data.
pub trait Accessor {
    /// Read a member; `None` when the member is unset
    fn get<'v>(&self, object: &'v Value, member: &str) -> Result<Option<&'v Value>>;

    /// Write a member
    fn set(&self, object: &mut Value, member: &str, value: Value) -> Result<()>;

    /// Take a member out of an object, leaving it unset
    fn take(&self, object: &mut Value, member: &str) -> Result<Option<Value>>;

    /// Create a new, empty instance of a class
    fn instantiate(&self, class: &str) -> Result<Value>;

    /// Create a new, empty generic collection
    fn new_collection(&self, kind: &str) -> Result<Value>;

    /// Borrow the items of a generic collection
    fn collection_items<'v>(&self, collection: &'v Value) -> Result<&'v [Value]>;

    /// Append to a generic collection
    fn push_item(&self, collection: &mut Value, item: Value) -> Result<()>;

    /// Build a fixed-size native array of primitive items
    fn new_array(&self, item_type: XsdType, items: Vec<Value>) -> Result<Value>;

    /// Borrow the items of a native array
    fn array_items<'v>(&self, array: &'v Value) -> Result<&'v [Value]>;
}

/// Default accessor over [`Value`] graphs
///
/// Without registered classes any member name is accepted. Once a class is
/// registered, instantiating an unknown class or touching an undeclared
/// member of a registered class is an [`Error::Accessor`].
#[derive(Debug, Clone, Default)]
pub struct DynamicAccessor {
    classes: HashMap<String, HashSet<String>>,
}

impl DynamicAccessor {
    /// Create an accessor without a class registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class and its members
    pub fn with_class<I, S>(mut self, class: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes
            .insert(class.into(), members.into_iter().map(Into::into).collect());
        self
    }

    fn check_member(&self, object: &Object, member: &str) -> Result<()> {
        if let Some(members) = self.classes.get(object.class()) {
            if !members.contains(member) {
                return Err(Error::Accessor(format!(
                    "class '{}' has no member '{}'",
                    object.class(),
                    member
                )));
            }
        }
        Ok(())
    }
}

fn not_an_object(value: &Value, member: &str) -> Error {
    Error::Accessor(format!(
        "cannot access member '{}' on a {} value",
        member,
        value.type_name()
    ))
}

impl Accessor for DynamicAccessor {
    fn get<'v>(&self, object: &'v Value, member: &str) -> Result<Option<&'v Value>> {
        match object {
            Value::Object(obj) => {
                self.check_member(obj, member)?;
                Ok(obj.get(member).filter(|v| !v.is_null()))
            }
            other => Err(not_an_object(other, member)),
        }
    }

    fn set(&self, object: &mut Value, member: &str, value: Value) -> Result<()> {
        match object {
            Value::Object(obj) => {
                self.check_member(obj, member)?;
                obj.set(member, value);
                Ok(())
            }
            other => Err(not_an_object(other, member)),
        }
    }

    fn take(&self, object: &mut Value, member: &str) -> Result<Option<Value>> {
        match object {
            Value::Object(obj) => {
                self.check_member(obj, member)?;
                Ok(obj
                    .get_mut(member)
                    .map(std::mem::take)
                    .filter(|v| !v.is_null()))
            }
            other => Err(not_an_object(other, member)),
        }
    }

    fn instantiate(&self, class: &str) -> Result<Value> {
        if !self.classes.is_empty() && !self.classes.contains_key(class) {
            return Err(Error::Accessor(format!("unknown class '{}'", class)));
        }
        Ok(Value::Object(Object::new(class)))
    }

    fn new_collection(&self, _kind: &str) -> Result<Value> {
        Ok(Value::List(Vec::new()))
    }

    fn collection_items<'v>(&self, collection: &'v Value) -> Result<&'v [Value]> {
        match collection {
            Value::List(items) | Value::Array(items) => Ok(items),
            other => Err(Error::Accessor(format!(
                "expected a collection, found a {} value",
                other.type_name()
            ))),
        }
    }

    fn push_item(&self, collection: &mut Value, item: Value) -> Result<()> {
        match collection {
            Value::List(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(Error::Accessor(format!(
                "cannot append to a {} value",
                other.type_name()
            ))),
        }
    }

    fn new_array(&self, _item_type: XsdType, items: Vec<Value>) -> Result<Value> {
        Ok(Value::Array(items))
    }

    fn array_items<'v>(&self, array: &'v Value) -> Result<&'v [Value]> {
        match array {
            Value::Array(items) | Value::List(items) => Ok(items),
            other => Err(Error::Accessor(format!(
                "expected an array, found a {} value",
                other.type_name()
            ))),
        }
    }
}

/// Accessor that builds nothing
///
/// Drives the decode traversal for validation: every write is dropped and
/// every instance is `Null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardAccessor;

impl Accessor for DiscardAccessor {
    fn get<'v>(&self, _object: &'v Value, _member: &str) -> Result<Option<&'v Value>> {
        Ok(None)
    }

    fn set(&self, _object: &mut Value, _member: &str, _value: Value) -> Result<()> {
        Ok(())
    }

    fn take(&self, _object: &mut Value, _member: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn instantiate(&self, _class: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn new_collection(&self, _kind: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn collection_items<'v>(&self, _collection: &'v Value) -> Result<&'v [Value]> {
        Ok(&[])
    }

    fn push_item(&self, _collection: &mut Value, _item: Value) -> Result<()> {
        Ok(())
    }

    fn new_array(&self, _item_type: XsdType, _items: Vec<Value>) -> Result<Value> {
        Ok(Value::Null)
    }

    fn array_items<'v>(&self, _array: &'v Value) -> Result<&'v [Value]> {
        Ok(&[])
    }
}

/// Lossless numeric widening used by the codec
pub(crate) fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(d) => Some(*d),
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::UInt(u) => Some(Decimal::from(*u)),
        Value::Double(f) => Decimal::from_f64(*f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_equality_ignores_class_and_order() {
        let a = Object::new("Person").with("name", "Ann").with("age", 3);
        let b = Object::new("").with("age", 3).with("name", "Ann");
        assert_eq!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_object_equality_null_is_absent() {
        let a = Object::new("P").with("name", "Ann").with("age", Value::Null);
        let b = Object::new("P").with("name", "Ann");
        assert_eq!(a, b);
        assert_ne!(a, Object::new("P").with("name", "Bo"));
    }

    #[test]
    fn test_dynamic_accessor_open_mode() {
        let accessor = DynamicAccessor::new();
        let mut obj = accessor.instantiate("Anything").unwrap();
        accessor.set(&mut obj, "x", Value::Int(1)).unwrap();
        assert_eq!(accessor.get(&obj, "x").unwrap(), Some(&Value::Int(1)));
        assert_eq!(accessor.get(&obj, "missing").unwrap(), None);
    }

    #[test]
    fn test_dynamic_accessor_registry() {
        let accessor = DynamicAccessor::new().with_class("Person", ["name"]);
        assert!(accessor.instantiate("Robot").is_err());

        let mut person = accessor.instantiate("Person").unwrap();
        assert!(accessor.set(&mut person, "name", "Ann".into()).is_ok());
        let err = accessor.set(&mut person, "age", Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::Accessor(_)));
    }

    #[test]
    fn test_get_on_scalar_fails() {
        let accessor = DynamicAccessor::new();
        assert!(accessor.get(&Value::Int(3), "x").is_err());
    }

    #[test]
    fn test_json_bridge() {
        let json: JsonValue =
            serde_json::from_str(r#"{"name": "Ann", "age": 31, "tags": ["a", "b"], "score": 1.5}"#)
                .unwrap();
        let value = Value::from_json(&json);
        assert_eq!(value.field("age"), Some(&Value::Int(31)));
        assert_eq!(value.field("score"), Some(&Value::Decimal(Decimal::new(15, 1))));
        assert_eq!(value.to_json()["tags"][1], "b");
    }

    #[test]
    fn test_to_value_from_serialize() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            label: Option<String>,
        }
        let value = to_value(&Point { x: 4, label: None }).unwrap();
        assert_eq!(value.field("x"), Some(&Value::Int(4)));
        assert_eq!(value.field("label"), Some(&Value::Null));
    }
}
