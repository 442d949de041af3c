//! Dynamic Values
//!
//! `Value` is the dynamically typed currency of the observation layer. Scalars
//! are held inline; composite values are held as [`Container`] handles (raw)
//! or [`Observed`] handles (intercepted).
//!
//! # Equality
//!
//! Equality follows strict identity semantics, which is what decides whether a
//! write notifies anyone:
//!
//! - scalars compare by value, without numeric coercion (`Int(1) != Float(1.0)`)
//! - `NaN` is never equal to itself
//! - containers compare by identity, and an observed handle is the same
//!   identity as the raw container it wraps

use std::cmp::Ordering;
use std::sync::Arc;

use super::{Container, ContainerId, Observed};
use crate::error::{Error, Result};

/// A dynamically typed value stored in, or read from, a container.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// A raw container. Reads and writes through it are not tracked.
    Container(Container),
    /// An observed container. Reads and writes through it are tracked.
    Observed(Observed),
}

impl Value {
    /// Build a record value from `(name, value)` pairs.
    pub fn record<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arc<str>>,
        V: Into<Value>,
    {
        Value::Container(Container::record_from(entries))
    }

    /// Build a list value from items.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Container(Container::list_from(items))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is composite (raw or observed).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Container(_) | Value::Observed(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Either numeric variant, widened to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The observed handle, if this value was read through an observed container.
    pub fn as_observed(&self) -> Option<&Observed> {
        match self {
            Value::Observed(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_observed(self) -> Option<Observed> {
        match self {
            Value::Observed(o) => Some(o),
            _ => None,
        }
    }

    /// The raw container behind this value, unwrapping observed handles.
    pub fn as_container(&self) -> Option<Container> {
        match self {
            Value::Container(c) => Some(c.clone()),
            Value::Observed(o) => Some(o.raw().clone()),
            _ => None,
        }
    }

    /// Identity of the container behind this value, if any.
    pub fn container_id(&self) -> Option<ContainerId> {
        match self {
            Value::Container(c) => Some(c.id()),
            Value::Observed(o) => Some(o.container_id()),
            _ => None,
        }
    }

    /// A short name for the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Container(_) => "container",
            Value::Observed(_) => "observed",
        }
    }

    /// The form in which the value is kept inside a container.
    ///
    /// Containers never store observed handles, only the raw containers
    /// behind them.
    pub(crate) fn into_stored(self) -> Value {
        match self {
            Value::Observed(o) => Value::Container(o.raw().clone()),
            other => other,
        }
    }

    /// Total ordering used by list sorting.
    ///
    /// Null sorts first, then booleans, numbers, strings, and finally
    /// containers in order of creation.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Float(_) => 2,
                Value::Str(_) => 3,
                Value::Container(_) | Value::Observed(_) => 4,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) if rank(a) == 2 && rank(b) == 2 => {
                let (x, y) = (a.as_number().unwrap_or_default(), b.as_number().unwrap_or_default());
                x.total_cmp(&y)
            }
            (a, b) if rank(a) == 4 && rank(b) == 4 => a.container_id().cmp(&b.container_id()),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Convert to JSON.
    ///
    /// Shared sub-structures are duplicated; cyclic ones fail with
    /// [`Error::Cycle`]. Non-finite floats become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut visiting = Vec::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut Vec<ContainerId>) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        let container = match self {
            Value::Null => return Ok(Json::Null),
            Value::Bool(b) => return Ok(Json::Bool(*b)),
            Value::Int(i) => return Ok(Json::from(*i)),
            Value::Float(f) => {
                return Ok(serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number))
            }
            Value::Str(s) => return Ok(Json::String(s.to_string())),
            Value::Container(c) => c.clone(),
            Value::Observed(o) => o.raw().clone(),
        };

        if visiting.contains(&container.id()) {
            return Err(Error::Cycle);
        }
        visiting.push(container.id());

        let entries = container.snapshot();
        let json = match container.kind() {
            super::ContainerKind::Record => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = key.map(|k| k.to_string()).unwrap_or_default();
                    map.insert(key, value.to_json_inner(visiting)?);
                }
                Json::Object(map)
            }
            super::ContainerKind::List => Json::Array(
                entries
                    .into_iter()
                    .map(|(_, value)| value.to_json_inner(visiting))
                    .collect::<Result<_>>()?,
            ),
        };

        visiting.pop();
        Ok(json)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (a, b) if a.is_container() && b.is_container() => a.container_id() == b.container_id(),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self {
        Value::Str(value)
    }
}

impl From<Container> for Value {
    fn from(value: Container) -> Self {
        Value::Container(value)
    }
}

impl From<Observed> for Value {
    fn from(value: Observed) -> Self {
        Value::Observed(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Builds fresh raw containers for every JSON object and array.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.into()),
            Json::Array(items) => Value::list(items.into_iter().map(Value::from)),
            Json::Object(map) => Value::record(map.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_equality_is_strict() {
        assert_eq!(Value::Int(1), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Value::record([("x", 1)]);
        let b = Value::record([("x", 1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn json_objects_become_records() {
        let value = Value::from(json!({ "price": 10, "tags": ["a", "b"], "ratio": 0.5 }));
        let record = value.as_container().unwrap();

        assert_eq!(record.get("price"), Some(Value::Int(10)));
        assert_eq!(record.get("ratio"), Some(Value::Float(0.5)));
        assert_eq!(record.get("tags").unwrap().as_container().unwrap().len(), 2);
    }

    #[test]
    fn to_json_rejects_cycles() {
        let record = Container::new_record();
        record.insert("me", record.clone()).unwrap();

        assert!(matches!(Value::from(record).to_json(), Err(Error::Cycle)));
    }

    #[test]
    fn to_json_allows_shared_substructure() {
        let shared = Container::list_from([1, 2]);
        let root = Value::record([("a", shared.clone()), ("b", shared)]);

        assert_eq!(root.to_json().unwrap(), json!({ "a": [1, 2], "b": [1, 2] }));
    }

    #[test]
    fn natural_order_ranks_types_then_values() {
        let mut values = vec![
            Value::from("b"),
            Value::Int(3),
            Value::Null,
            Value::Float(1.5),
            Value::from("a"),
            Value::Bool(true),
        ];
        values.sort_by(Value::natural_cmp);

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Float(1.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }
}
