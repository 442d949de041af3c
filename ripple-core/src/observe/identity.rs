//! Identity Map
//!
//! Bidirectional mapping between raw containers and the observed handles that
//! wrap them. Both directions are keyed by identity, never by contents.
//!
//! The map is what keeps wrapping idempotent: a container is wrapped at most
//! once per runtime, and a handle the runtime already issued is recognised
//! and handed back unchanged.
//!
//! Entries are held strongly. A container stays registered until it is
//! explicitly released through the runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{Container, ContainerId};

/// Identity of an observed handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservedId(u64);

impl ObservedId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObservedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// Outcome of [`IdentityMap::wrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wrapped {
    /// The container was already registered under this ID.
    Existing(ObservedId),
    /// The container was registered just now.
    Created(ObservedId),
}

impl Wrapped {
    pub(crate) fn id(self) -> ObservedId {
        match self {
            Wrapped::Existing(id) | Wrapped::Created(id) => id,
        }
    }
}

#[derive(Default)]
struct Tables {
    to_observed: HashMap<ContainerId, ObservedId>,
    to_raw: HashMap<ObservedId, Container>,
}

#[derive(Default)]
pub(crate) struct IdentityMap {
    tables: Mutex<Tables>,
}

impl IdentityMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Look up the handle for `raw`, registering one if there is none.
    pub(crate) fn wrap(&self, raw: &Container) -> Wrapped {
        let mut tables = self.tables.lock();
        if let Some(id) = tables.to_observed.get(&raw.id()) {
            return Wrapped::Existing(*id);
        }

        let id = ObservedId::next();
        tables.to_observed.insert(raw.id(), id);
        tables.to_raw.insert(id, raw.clone());
        Wrapped::Created(id)
    }

    pub(crate) fn observed_id(&self, raw: ContainerId) -> Option<ObservedId> {
        self.tables.lock().to_observed.get(&raw).copied()
    }

    /// Whether `id` names a handle issued by this map.
    pub(crate) fn is_wrapper(&self, id: ObservedId) -> bool {
        self.tables.lock().to_raw.contains_key(&id)
    }

    /// Forget both directions for a handle. Returns the raw container.
    pub(crate) fn release(&self, id: ObservedId) -> Option<Container> {
        let mut tables = self.tables.lock();
        let raw = tables.to_raw.remove(&id)?;
        tables.to_observed.remove(&raw.id());
        Some(raw)
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.lock().to_raw.len()
    }
}
