//! # Dynamic values
//!
//! `Value` is the state model for path-based selection. It mirrors JSON, but
//! arrays and objects are `Rc`-shared: cloning a value is cheap, and two values
//! can be asked whether they are the *same* node rather than merely equal.
//! Writes through [`Value::set_path`] copy only the nodes along the path, so
//! untouched subtrees keep their identity from one snapshot to the next.
//!
//! ```rust
//! use hookwork_core::Value;
//!
//! let before = Value::from(serde_json::json!({ "user": { "name": "A" }, "count": 1 }));
//! let mut after = before.clone();
//! after.set_path("count", Value::from(2)).unwrap();
//!
//! assert!(before.get("user").unwrap().is_same(after.get("user").unwrap()));
//! assert!(!before.is_same(&after));
//! assert_eq!(after.get_path("user.name"), Some(&Value::from("A")));
//! assert_eq!(after.get_path("user.email.domain"), None);
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Error, Result};

pub type Object = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
}

impl Value {
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Identity comparison.
    ///
    /// Scalars compare by value (numbers bitwise, except that NaN is the same as
    /// NaN and `0.0` is not the same as `-0.0`). Arrays and objects are the same
    /// only when they are the same shared node.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// One property step. Arrays accept decimal indices.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(o) => o.get(key),
            Value::Array(a) => key.parse::<usize>().ok().and_then(|i| a.get(i)),
            _ => None,
        }
    }

    /// Follows a dot-separated path. Any missing step yields `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.get_segments(path.split('.'))
    }

    pub fn get_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Option<&Value> {
        segments
            .into_iter()
            .try_fold(self, |node, segment| node.get(segment))
    }

    /// Writes `value` at a dot-separated path, creating missing objects on the way.
    ///
    /// Only nodes on the path are copied (and only when shared); siblings keep
    /// their identity. On error `self` is left untouched.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        if path.is_empty() {
            return Err(Error::EmptyPath);
        }
        let mut next = self.clone();
        next.write_segments(path, value)?;
        *self = next;
        Ok(())
    }

    fn write_segments(&mut self, path: &str, value: Value) -> Result<()> {
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = segments.split_last().ok_or(Error::EmptyPath)?;
        let mut node = self;
        for segment in parents {
            node = node.child_mut(path, segment)?;
        }
        *node.child_mut(path, leaf)? = value;
        Ok(())
    }

    /// The slot for `segment` inside this node, promoting `Null` to an empty object.
    fn child_mut(&mut self, path: &str, segment: &str) -> Result<&mut Value> {
        if self.is_null() {
            *self = Value::Object(Rc::default());
        }
        match self {
            Value::Object(o) => Ok(Rc::make_mut(o).entry(segment.to_owned()).or_default()),
            Value::Array(a) => {
                let items = Rc::make_mut(a);
                match segment.parse::<usize>().ok().filter(|idx| *idx < items.len()) {
                    Some(idx) => Ok(&mut items[idx]),
                    None => Err(Error::IndexOutOfBounds {
                        path: path.to_owned(),
                        segment: segment.to_owned(),
                    }),
                }
            }
            _ => Err(Error::NotAContainer {
                path: path.to_owned(),
                segment: segment.to_owned(),
            }),
        }
    }
}

fn same_number(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Rc::from(v))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => items.iter().map(serde_json::Value::from).collect(),
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}
