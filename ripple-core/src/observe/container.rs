//! Raw Containers
//!
//! A container is a composite value that holds keyed sub-values: either a
//! record (named fields, insertion ordered) or a list (positional items).
//!
//! Containers have reference identity. Two containers with equal contents
//! are still distinct, and cloning a `Container` clones the handle, not the
//! data. All access through this type is *raw*: nothing is tracked and
//! nothing is triggered. Observation happens through [`Observed`] handles
//! obtained from a [`Runtime`].
//!
//! [`Observed`]: super::Observed
//! [`Runtime`]: crate::reactive::Runtime

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::Value;
use crate::error::{Error, Result};

/// Field storage for record containers.
pub(crate) type Fields = IndexMap<Arc<str>, Value>;

/// Counter for generating unique container IDs.
static CONTAINER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of a container.
///
/// Dependencies are keyed by this ID, never by container contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Allocate a fresh, process-unique ID.
    pub(crate) fn next() -> Self {
        Self(CONTAINER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// The two shapes a container can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Named fields.
    Record,
    /// Ordered, positional items.
    List,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Record => f.write_str("record"),
            ContainerKind::List => f.write_str("list"),
        }
    }
}

/// Backing storage. The variant is fixed when the container is created.
pub(crate) enum ContainerData {
    Record(RwLock<Fields>),
    List(RwLock<Vec<Value>>),
}

struct ContainerCell {
    id: ContainerId,
    data: ContainerData,
}

/// A shared handle to a raw record or list.
#[derive(Clone)]
pub struct Container {
    cell: Arc<ContainerCell>,
}

impl Container {
    fn from_data(data: ContainerData) -> Self {
        Self {
            cell: Arc::new(ContainerCell {
                id: ContainerId::next(),
                data,
            }),
        }
    }

    /// Create an empty record.
    pub fn new_record() -> Self {
        Self::from_data(ContainerData::Record(RwLock::new(Fields::new())))
    }

    /// Create an empty list.
    pub fn new_list() -> Self {
        Self::from_data(ContainerData::List(RwLock::new(Vec::new())))
    }

    /// Create a record from `(name, value)` pairs.
    pub fn record_from<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arc<str>>,
        V: Into<Value>,
    {
        let fields = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().into_stored()))
            .collect();
        Self::from_data(ContainerData::Record(RwLock::new(fields)))
    }

    /// Create a list from items.
    pub fn list_from<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items = items.into_iter().map(|v| v.into().into_stored()).collect();
        Self::from_data(ContainerData::List(RwLock::new(items)))
    }

    /// The identity of this container.
    pub fn id(&self) -> ContainerId {
        self.cell.id
    }

    /// Whether this is a record or a list.
    pub fn kind(&self) -> ContainerKind {
        match self.cell.data {
            ContainerData::Record(_) => ContainerKind::Record,
            ContainerData::List(_) => ContainerKind::List,
        }
    }

    /// Whether two handles point at the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Number of fields or items.
    pub fn len(&self) -> usize {
        match &self.cell.data {
            ContainerData::Record(fields) => fields.read().len(),
            ContainerData::List(items) => items.read().len(),
        }
    }

    /// Whether the container holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a record field. Always `None` for lists.
    pub fn get(&self, key: &str) -> Option<Value> {
        match &self.cell.data {
            ContainerData::Record(fields) => fields.read().get(key).cloned(),
            ContainerData::List(_) => None,
        }
    }

    /// Read a list item. Always `None` for records.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match &self.cell.data {
            ContainerData::Record(_) => None,
            ContainerData::List(items) => items.read().get(index).cloned(),
        }
    }

    /// Write a record field without notifying anyone.
    ///
    /// Returns the previous value, if the field existed.
    pub fn insert(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Result<Option<Value>> {
        let fields = self.expect_record()?;
        Ok(fields.write().insert(key.into(), value.into().into_stored()))
    }

    /// Remove a record field without notifying anyone.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let fields = self.expect_record()?;
        Ok(fields.write().shift_remove(key))
    }

    /// Append a list item without notifying anyone.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let items = self.expect_list()?;
        items.write().push(value.into().into_stored());
        Ok(())
    }

    /// Copy out the record fields or list items, in order.
    ///
    /// List items are keyed by `None`.
    pub fn snapshot(&self) -> Vec<(Option<Arc<str>>, Value)> {
        match &self.cell.data {
            ContainerData::Record(fields) => fields
                .read()
                .iter()
                .map(|(k, v)| (Some(k.clone()), v.clone()))
                .collect(),
            ContainerData::List(items) => items.read().iter().map(|v| (None, v.clone())).collect(),
        }
    }

    pub(crate) fn data(&self) -> &ContainerData {
        &self.cell.data
    }

    /// Containers stored directly in this one.
    pub(crate) fn child_containers(&self) -> Vec<Container> {
        let direct = |value: &Value| match value {
            Value::Container(c) => Some(c.clone()),
            _ => None,
        };
        match &self.cell.data {
            ContainerData::Record(fields) => fields.read().values().filter_map(direct).collect(),
            ContainerData::List(items) => items.read().iter().filter_map(direct).collect(),
        }
    }

    fn expect_record(&self) -> Result<&RwLock<Fields>> {
        match &self.cell.data {
            ContainerData::Record(fields) => Ok(fields),
            ContainerData::List(_) => Err(Error::KindMismatch {
                expected: ContainerKind::Record,
                found: ContainerKind::List,
            }),
        }
    }

    fn expect_list(&self) -> Result<&RwLock<Vec<Value>>> {
        match &self.cell.data {
            ContainerData::List(items) => Ok(items),
            ContainerData::Record(_) => Err(Error::KindMismatch {
                expected: ContainerKind::List,
                found: ContainerKind::Record,
            }),
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Container {}

impl std::hash::Hash for Container {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// Contents are left out: containers may be cyclic.
impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_ids_are_unique() {
        let a = Container::new_record();
        let b = Container::new_record();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn equal_contents_are_distinct_containers() {
        let a = Container::record_from([("x", 1)]);
        let b = Container::record_from([("x", 1)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn raw_record_access() {
        let record = Container::new_record();
        assert_eq!(record.insert("name", "ripple").unwrap(), None);
        assert_eq!(record.get("name"), Some(Value::from("ripple")));
        assert_eq!(record.remove("name").unwrap(), Some(Value::from("ripple")));
        assert!(record.is_empty());
    }

    #[test]
    fn raw_list_rejects_record_operations() {
        let list = Container::list_from([1, 2]);
        assert_eq!(list.kind(), ContainerKind::List);
        assert!(matches!(
            list.insert("x", 1),
            Err(Error::KindMismatch { expected: ContainerKind::Record, found: ContainerKind::List })
        ));
        list.push(3).unwrap();
        assert_eq!(list.get_index(2), Some(Value::Int(3)));
        assert_eq!(list.get("x"), None);
    }

    #[test]
    fn child_containers_lists_direct_children_only() {
        let leaf = Container::new_record();
        let mid = Container::record_from([("leaf", leaf.clone())]);
        let root = Container::list_from([Value::from(mid.clone()), Value::Int(1)]);

        let children = root.child_containers();
        assert_eq!(children, vec![mid]);
    }
}
