//! Observation Layer
//!
//! This module turns plain reads and writes on containers into dependency
//! events. A raw [`Container`] is wrapped into an [`Observed`] handle by a
//! runtime; reads through the handle's typed views call `track`, and writes
//! call `trigger`.
//!
//! # Deep Observation
//!
//! Nested containers are observed too, using one of two strategies selected by
//! [`ObservationMode`](crate::config::ObservationMode):
//!
//! - **Lazy** (default): a nested container is wrapped the first time it is
//!   read. Containers nobody reads are never wrapped.
//! - **Eager**: the whole reachable structure is wrapped when the root is
//!   observed, and every container written later is wrapped as it is stored.
//!
//! Both strategies notify identically; they differ only in when wrapping
//! happens. Cyclic and shared structures are safe in both: the identity map
//! registers a container before visiting its children, so each container is
//! wrapped once.

mod container;
mod identity;
mod list;
mod observed;
mod record;
mod value;

pub use container::{Container, ContainerId, ContainerKind};
pub use identity::ObservedId;
pub use list::ObservedList;
pub use observed::Observed;
pub use record::ObservedRecord;
pub use value::Value;

pub(crate) use identity::{IdentityMap, Wrapped};
