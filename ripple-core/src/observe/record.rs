//! Observed Records
//!
//! Property interception for records. Every read goes through `track` and
//! every write decides whether to `trigger`.
//!
//! # Read Rules
//!
//! - `get`/`has` track the field's own key.
//! - `keys`/`len`/`is_empty` track the record's shape ([`Key::Contents`]).
//! - `entries` tracks the shape and every field it returns.
//! - A container value is handed out as an observed handle. In lazy mode the
//!   handle is created here, on first read; in eager mode it already exists.
//!
//! # Write Rules
//!
//! | previous state        | notifies                         |
//! |-----------------------|----------------------------------|
//! | key absent            | the key and the record's shape   |
//! | key present, `!=` new | the key                          |
//! | key present, `==` new | nobody                           |
//!
//! Deleting a present key notifies the key and the shape, unless the runtime
//! was configured with `trigger_on_delete = false`.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::container::{ContainerData, Fields};
use super::{ContainerId, Observed, Value};
use crate::reactive::{Key, Runtime};

/// Tracked view over an observed record.
#[derive(Debug, Clone)]
pub struct ObservedRecord {
    observed: Observed,
}

impl ObservedRecord {
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

    fn fields(&self) -> &RwLock<Fields> {
        match self.observed.raw().data() {
            ContainerData::Record(fields) => fields,
            ContainerData::List(_) => unreachable!("record view over a list container"),
        }
    }

    /// Read a field.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.runtime().track(self.id(), Key::from(key));
        let value = self.fields().read().get(key).cloned();
        value.map(|v| self.runtime().wrap_value(v))
    }

    /// Whether a field exists.
    pub fn has(&self, key: &str) -> bool {
        self.runtime().track(self.id(), Key::from(key));
        self.fields().read().contains_key(key)
    }

    /// Field names, in insertion order.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.runtime().track(self.id(), Key::Contents);
        self.fields().read().keys().cloned().collect()
    }

    /// Fields and their values, in insertion order.
    pub fn entries(&self) -> Vec<(Arc<str>, Value)> {
        let runtime = self.runtime();
        runtime.track(self.id(), Key::Contents);

        let entries: Vec<_> = self
            .fields()
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        entries
            .into_iter()
            .map(|(key, value)| {
                runtime.track(self.id(), Key::Name(key.clone()));
                (key, runtime.wrap_value(value))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runtime().track(self.id(), Key::Contents);
        self.fields().read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a field, notifying dependents if the record changed.
    ///
    /// Observed values are stored as their raw containers. Returns `true`
    /// when the write changed the record.
    pub fn set(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into().into_stored();

        let previous = self.fields().write().insert(key.clone(), value.clone());

        let runtime = self.runtime();
        match previous {
            None => {
                trace!(container = %self.id(), key = %key, "new field");
                runtime.observe_written(&value);
                runtime.trigger_all(self.id(), &[Key::Name(key), Key::Contents]);
                true
            }
            Some(old) if old != value => {
                runtime.observe_written(&value);
                runtime.trigger(self.id(), Key::Name(key));
                true
            }
            Some(_) => false,
        }
    }

    /// Remove a field. Returns the removed value, as stored.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.fields().write().shift_remove(key)?;

        let runtime = self.runtime();
        if runtime.config().trigger_on_delete {
            runtime.trigger_all(self.id(), &[Key::from(key), Key::Contents]);
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ObservationMode, RuntimeConfig};
    use crate::observe::Container;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_reaction(
        runtime: &Runtime,
        read: impl Fn() + Send + Sync + 'static,
    ) -> Arc<AtomicI32> {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        runtime.run_reaction(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            read();
        });
        runs
    }

    fn record(runtime: &Runtime, json: serde_json::Value) -> ObservedRecord {
        runtime
            .observe(Value::from(json))
            .into_observed()
            .unwrap()
            .record()
            .unwrap()
    }

    #[test]
    fn unchanged_write_does_not_trigger() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "price": 10 }));

        let reader = state.clone();
        let runs = counting_reaction(&runtime, move || {
            reader.get("price");
        });

        assert!(!state.set("price", 10));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert!(state.set("price", 20));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn new_key_triggers_readers_of_missing_key() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({}));

        let reader = state.clone();
        let runs = counting_reaction(&runtime, move || {
            reader.get("name");
        });

        assert!(state.set("name", "ripple"));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn new_key_notifies_a_shape_and_key_reader_once() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({}));

        let reader = state.clone();
        let runs = counting_reaction(&runtime, move || {
            reader.get("name");
            reader.keys();
        });

        state.set("name", "ripple");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delete_triggers_by_default() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "name": "ripple" }));

        let reader = state.clone();
        let runs = counting_reaction(&runtime, move || {
            reader.has("name");
        });

        assert_eq!(state.delete("name"), Some(Value::from("ripple")));
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Deleting an absent key is a no-op.
        assert_eq!(state.delete("name"), None);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn delete_can_be_pass_through() {
        let runtime = Runtime::with_config(RuntimeConfig::new().with_trigger_on_delete(false));
        let state = record(&runtime, serde_json::json!({ "name": "ripple" }));

        let reader = state.clone();
        let runs = counting_reaction(&runtime, move || {
            reader.get("name");
        });

        state.delete("name");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(state.observed().raw().get("name").is_none());
    }

    #[test]
    fn lazy_mode_wraps_nested_containers_on_read() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "info": { "age": 0 } }));
        let info_raw = state.observed().raw().get("info").unwrap().as_container().unwrap();

        assert!(!runtime.is_observed(&info_raw));

        let info = state.get("info").unwrap();
        assert!(info.as_observed().is_some());
        assert!(runtime.is_observed(&info_raw));
    }

    #[test]
    fn eager_mode_wraps_nested_containers_up_front() {
        let runtime = Runtime::with_config(RuntimeConfig::new().with_mode(ObservationMode::Eager));
        let state = record(&runtime, serde_json::json!({ "info": { "tags": [] } }));
        let info_raw = state.observed().raw().get("info").unwrap().as_container().unwrap();
        let tags_raw = info_raw.get("tags").unwrap().as_container().unwrap();

        assert!(runtime.is_observed(&info_raw));
        assert!(runtime.is_observed(&tags_raw));

        // Written containers are observed immediately too.
        let fresh = Container::new_record();
        state.set("extra", fresh.clone());
        assert!(runtime.is_observed(&fresh));
    }

    #[test]
    fn storing_an_observed_value_keeps_its_identity() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "a": {} }));

        let a = state.get("a").unwrap();
        assert!(!state.set("a", a.clone()));

        assert!(state.set("b", a));
        assert!(matches!(state.observed().raw().get("b"), Some(Value::Container(_))));
        assert_eq!(state.get("a"), state.get("b"));
    }
}
