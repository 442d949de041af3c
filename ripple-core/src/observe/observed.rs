//! Observed Handles
//!
//! An [`Observed`] is the externally visible form of a container under
//! observation. It pairs the raw container with the runtime that observes it
//! and hands out typed views for reading and writing:
//!
//! - [`ObservedRecord`] for records (property interception)
//! - [`ObservedList`] for lists (collection mutation interception)
//!
//! Handles are cheap to clone. Every handle for the same container in the same
//! runtime carries the same [`ObservedId`].

use std::fmt;

use super::{Container, ContainerId, ContainerKind, ObservedId, ObservedList, ObservedRecord};
use crate::error::{Error, Result};
use crate::reactive::Runtime;

#[derive(Clone)]
pub struct Observed {
    id: ObservedId,
    raw: Container,
    runtime: Runtime,
}

impl Observed {
    pub(crate) fn new(id: ObservedId, raw: Container, runtime: Runtime) -> Self {
        Self { id, raw, runtime }
    }

    pub fn id(&self) -> ObservedId {
        self.id
    }

    /// Identity of the wrapped container.
    pub fn container_id(&self) -> ContainerId {
        self.raw.id()
    }

    pub fn kind(&self) -> ContainerKind {
        self.raw.kind()
    }

    /// The wrapped container. Access through it is untracked.
    pub fn raw(&self) -> &Container {
        &self.raw
    }

    /// The runtime observing this container.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn is_record(&self) -> bool {
        self.kind() == ContainerKind::Record
    }

    pub fn is_list(&self) -> bool {
        self.kind() == ContainerKind::List
    }

    /// Tracked record view.
    pub fn record(&self) -> Result<ObservedRecord> {
        match self.kind() {
            ContainerKind::Record => Ok(ObservedRecord::new(self.clone())),
            found => Err(Error::KindMismatch {
                expected: ContainerKind::Record,
                found,
            }),
        }
    }

    /// Tracked list view. This is the only way to mutate an observed list.
    pub fn list(&self) -> Result<ObservedList> {
        match self.kind() {
            ContainerKind::List => Ok(ObservedList::new(self.clone())),
            found => Err(Error::KindMismatch {
                expected: ContainerKind::List,
                found,
            }),
        }
    }
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Observed {}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("id", &self.id)
            .field("container", &self.raw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_views_check_kind() {
        let runtime = Runtime::new();
        let list = runtime.observe_container(&Container::new_list());

        assert!(list.list().is_ok());
        assert!(matches!(
            list.record(),
            Err(Error::KindMismatch { expected: ContainerKind::Record, found: ContainerKind::List })
        ));
    }

    #[test]
    fn handles_for_one_container_are_equal() {
        let runtime = Runtime::new();
        let raw = Container::new_record();

        let a = runtime.observe_container(&raw);
        let b = runtime.observe_container(&raw);
        assert_eq!(a, b);
        assert_eq!(a.container_id(), raw.id());
    }
}
