//! Dependency Registry
//!
//! Maps `(container, key)` pairs to the [`SubscriptionSet`] of reactions that
//! read them. Sets are created on first subscription and are not cleaned up
//! when reactions stop reading a key; they go away only when a reaction is
//! disposed or a container is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{Reactive, ReactionId, Runtime, SubscriptionSet};
use crate::observe::ContainerId;

/// What was read within a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A record field.
    Name(Arc<str>),
    /// A list position.
    Index(usize),
    /// The container as a whole: its length, its key set, its order.
    Contents,
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.into())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name.into())
    }
}

impl From<Arc<str>> for Key {
    fn from(name: Arc<str>) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "[{index}]"),
            Key::Contents => f.write_str("<contents>"),
        }
    }
}

type KeyMap = HashMap<Key, SubscriptionSet>;

#[derive(Default)]
pub(crate) struct DependencyRegistry {
    targets: Mutex<HashMap<ContainerId, KeyMap>>,
}

impl DependencyRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribe a reaction. Returns `false` if it was already subscribed.
    pub(crate) fn subscribe(
        &self,
        container: ContainerId,
        key: Key,
        reaction: Arc<dyn Reactive>,
    ) -> bool {
        self.targets
            .lock()
            .entry(container)
            .or_default()
            .entry(key)
            .or_default()
            .insert(reaction)
    }

    /// The subscribers of one key, in notification order.
    pub(crate) fn subscribers(&self, container: ContainerId, key: &Key) -> Vec<Arc<dyn Reactive>> {
        self.targets
            .lock()
            .get(&container)
            .and_then(|keys| keys.get(key))
            .map(SubscriptionSet::snapshot)
            .unwrap_or_default()
    }

    /// The union of several keys' subscribers.
    ///
    /// Subscribers of earlier keys come first; a reaction subscribed to more
    /// than one of the keys appears once.
    pub(crate) fn subscribers_of(
        &self,
        container: ContainerId,
        keys: &[Key],
    ) -> Vec<Arc<dyn Reactive>> {
        let targets = self.targets.lock();
        let Some(key_map) = targets.get(&container) else {
            return Vec::new();
        };

        let mut merged: IndexMap<ReactionId, Arc<dyn Reactive>> = IndexMap::new();
        for set in keys.iter().filter_map(|key| key_map.get(key)) {
            for reaction in set.snapshot() {
                merged.entry(reaction.reaction_id()).or_insert(reaction);
            }
        }
        merged.into_values().collect()
    }

    pub(crate) fn subscriber_count(&self, container: ContainerId, key: &Key) -> usize {
        self.targets
            .lock()
            .get(&container)
            .and_then(|keys| keys.get(key))
            .map_or(0, SubscriptionSet::len)
    }

    /// Drop a reaction from every set. Returns how many sets it was in.
    pub(crate) fn remove_reaction(&self, id: ReactionId) -> usize {
        let mut targets = self.targets.lock();
        targets
            .values_mut()
            .flat_map(|keys| keys.values_mut())
            .map(|set| set.remove(id))
            .filter(|removed| *removed)
            .count()
    }

    /// Drop every set belonging to a container.
    pub(crate) fn forget_container(&self, container: ContainerId) -> bool {
        self.targets.lock().remove(&container).is_some()
    }

    /// Number of `(container, key)` pairs with a subscription set.
    pub(crate) fn len(&self) -> usize {
        self.targets.lock().values().map(HashMap::len).sum()
    }
}

/// A dependency driven by hand.
///
/// Not tied to any container: reactions call [`depend`](Self::depend) to
/// subscribe, and whoever owns the underlying state calls
/// [`notify`](Self::notify) after changing it.
#[derive(Clone)]
pub struct Dependency {
    id: ContainerId,
    runtime: Runtime,
}

impl Dependency {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Self {
            id: ContainerId::next(),
            runtime,
        }
    }

    /// Subscribe the running reaction, if any.
    pub fn depend(&self) {
        self.runtime.track(self.id, Key::Contents);
    }

    /// Re-run every subscribed reaction.
    pub fn notify(&self) {
        self.runtime.trigger(self.id, Key::Contents);
    }

    pub fn subscriber_count(&self) -> usize {
        self.runtime.subscriber_count(self.id, &Key::Contents)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
