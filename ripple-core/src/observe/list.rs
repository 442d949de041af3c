//! Observed Lists
//!
//! Lists are tracked at collection granularity only: every read depends on
//! the list's own [`Key::Contents`] dependency, and every mutation notifies it.
//! Individual indices are never tracked.
//!
//! The mutators wrap the plain `Vec` operations. Each one:
//!
//! 1. applies the mutation to the backing storage
//! 2. observes the values it inserted, so reads into them are tracked
//! 3. notifies the list's dependents, unconditionally
//!
//! Inserted values are the pushed/unshifted items and the replacement items
//! of `splice`. `pop`, `shift`, `sort` and `reverse` insert nothing.
//!
//! Raw lists are untouched by all of this: mutating a [`Container`] directly
//! notifies nobody.
//!
//! [`Container`]: super::Container

use std::cmp::Ordering;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use super::container::ContainerData;
use super::{ContainerId, Observed, Value};
use crate::error::{Error, Result};
use crate::reactive::{Key, Runtime};

type Inserted = SmallVec<[Value; 4]>;

/// Tracked view over an observed list.
#[derive(Debug, Clone)]
pub struct ObservedList {
    observed: Observed,
}

impl ObservedList {
    pub(crate) fn new(observed: Observed) -> Self {
        Self { observed }
    }

    /// The handle this view was taken from.
    pub fn observed(&self) -> &Observed {
        &self.observed
    }

    fn runtime(&self) -> &Runtime {
        self.observed.runtime()
    }

    fn id(&self) -> ContainerId {
        self.observed.container_id()
    }

    fn items(&self) -> &RwLock<Vec<Value>> {
        match self.observed.raw().data() {
            ContainerData::List(items) => items,
            ContainerData::Record(_) => unreachable!("list view over a record container"),
        }
    }

    fn track(&self) {
        self.runtime().track(self.id(), Key::Contents);
    }

    /// Apply a mutation, observe what it inserted, and notify dependents.
    fn intercept<R>(
        &self,
        operation: &'static str,
        inserted: &[Value],
        mutation: impl FnOnce(&mut Vec<Value>) -> R,
    ) -> R {
        let result = {
            let mut items = self.items().write();
            mutation(&mut *items)
        };
        self.notify(operation, inserted);
        result
    }

    /// Observe inserted values and trigger the list's dependents.
    fn notify(&self, operation: &'static str, inserted: &[Value]) {
        let runtime = self.runtime();
        for value in inserted {
            runtime.deep_observe(value);
        }
        trace!(container = %self.id(), operation, inserted = inserted.len(), "list mutation");
        runtime.trigger(self.id(), Key::Contents);
    }

    pub fn len(&self) -> usize {
        self.track();
        self.items().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an item.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.track();
        let value = self.items().read().get(index).cloned();
        value.map(|v| self.runtime().wrap_value(v))
    }

    /// All items, in order.
    pub fn items_vec(&self) -> Vec<Value> {
        self.track();
        let items = self.items().read().clone();
        let runtime = self.runtime();
        items.into_iter().map(|v| runtime.wrap_value(v)).collect()
    }

    /// Assign an item.
    ///
    /// `index == len` appends. Notifies dependents when the item changed or
    /// was added.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<bool> {
        let value = value.into().into_stored();

        let changed = {
            let mut items = self.items().write();
            let len = items.len();
            match index.cmp(&len) {
                Ordering::Greater => return Err(Error::IndexOutOfBounds { index, len }),
                Ordering::Equal => {
                    items.push(value.clone());
                    true
                }
                Ordering::Less if items[index] != value => {
                    items[index] = value.clone();
                    true
                }
                Ordering::Less => false,
            }
        };

        if changed {
            let runtime = self.runtime();
            runtime.observe_written(&value);
            runtime.trigger(self.id(), Key::Contents);
        }
        Ok(changed)
    }

    /// Append items. Returns the new length.
    pub fn push<I, V>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let inserted: Inserted = values.into_iter().map(|v| v.into().into_stored()).collect();
        self.intercept("push", &inserted, |items| {
            items.extend(inserted.iter().cloned());
            items.len()
        })
    }

    /// Remove the last item.
    pub fn pop(&self) -> Option<Value> {
        self.intercept("pop", &[], |items| items.pop())
    }

    /// Remove the first item.
    pub fn shift(&self) -> Option<Value> {
        self.intercept("shift", &[], |items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Prepend items, keeping their order. Returns the new length.
    pub fn unshift<I, V>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let inserted: Inserted = values.into_iter().map(|v| v.into().into_stored()).collect();
        self.intercept("unshift", &inserted, |items| {
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        })
    }

    /// Remove `delete_count` items starting at `start` and insert `values`
    /// in their place. Returns the removed items.
    ///
    /// `start` and `delete_count` are clamped to the list bounds.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, values: I) -> Vec<Value>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let inserted: Inserted = values.into_iter().map(|v| v.into().into_stored()).collect();
        self.intercept("splice", &inserted, |items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, inserted.iter().cloned()).collect()
        })
    }

    /// Sort items by [`Value::natural_cmp`].
    pub fn sort(&self) {
        self.sort_by(Value::natural_cmp);
    }

    /// Sort items with a comparator.
    ///
    /// The comparator sees raw values and runs without any lock held. If the
    /// list is mutated while it runs, the sort starts over on the new items,
    /// so a comparator must not mutate the list on every call.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        loop {
            let original = self.items().read().clone();
            let mut sorted = original.clone();
            sorted.sort_by(&mut compare);

            let committed = {
                let mut items = self.items().write();
                let unchanged = items.len() == original.len()
                    && items.iter().zip(&original).all(|(a, b)| same_item(a, b));
                if unchanged {
                    *items = sorted;
                }
                unchanged
            };
            if committed {
                break;
            }
            trace!(container = %self.id(), "list changed during sort; retrying");
        }
        self.notify("sort", &[]);
    }

    /// Reverse the items in place.
    pub fn reverse(&self) {
        self.intercept("reverse", &[], |items| items.reverse());
    }
}

/// Whether two stored items are the same value. Unlike `==`, a NaN is the
/// same as itself.
fn same_item(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}
