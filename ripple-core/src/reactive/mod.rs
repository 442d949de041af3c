//! Reactive Core
//!
//! This module implements dependency tracking and change propagation: the
//! registry of who read what, the stack of running computations, and the
//! reactions themselves.
//!
//! # Concepts
//!
//! ## Reactions
//!
//! A Reaction wraps a computation. Whenever it runs, every tracked read it
//! performs subscribes it to the `(container, key)` that was read. When any of
//! those keys is written, the reaction runs again.
//!
//! ## Tracking
//!
//! [`Runtime::track`] records that the reaction on top of the execution stack
//! read a key. Reads made while no reaction is running are not tracked.
//!
//! ## Triggering
//!
//! [`Runtime::trigger`] re-runs the subscribers of a key immediately, in the
//! order they subscribed. Writes made by those re-runs trigger in turn,
//! depth-first.
//!
//! # Implementation Notes
//!
//! Observed containers call `track` and `trigger` for you; see
//! [`crate::observe`]. The primitives are public for state that lives outside
//! containers, and [`Dependency`] packages them as a hand-driven dependency.

mod context;
mod reaction;
mod registry;
mod runtime;
mod subscriber;

pub use reaction::Reaction;
pub use registry::{Dependency, Key};
pub use runtime::{Reactive, Runtime};
pub use subscriber::{ReactionId, SubscriptionSet};
