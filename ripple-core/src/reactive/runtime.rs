//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects observed containers
//! and reactions. It owns the three tables the engine needs:
//!
//! - the dependency registry: `(container, key)` → subscribed reactions
//! - the identity map: raw container ↔ observed handle
//! - the execution stack: the reactions currently running
//!
//! # How It Works
//!
//! 1. A reaction runs and pushes itself onto the execution stack.
//!
//! 2. Reads through observed handles call [`Runtime::track`], which subscribes
//!    the reaction on top of the stack to the `(container, key)` just read.
//!
//! 3. The reaction finishes and pops itself off the stack.
//!
//! 4. A later write calls [`Runtime::trigger`], which re-runs every subscriber
//!    of the written key, synchronously and in subscription order. Writes made
//!    by those re-runs cascade depth-first through the call stack.
//!
//! There is no batching and no deduplication across a cascade: a reaction
//! reachable along two paths from one write runs twice.
//!
//! # Isolation
//!
//! Nothing is global. Each `Runtime` is an independent engine, and handles
//! from one runtime never subscribe to another. A `Runtime` is a cheap,
//! shareable handle; clones refer to the same engine.
//!
//! # Threading
//!
//! All tables sit behind locks and no lock is held while user code runs, so
//! the handles are `Send + Sync`. The execution stack is kept per thread:
//! reads are attributed to the reaction running on the reading thread, and a
//! thread with no running reaction tracks nothing.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::context::ExecutionStack;
use super::registry::DependencyRegistry;
use super::{Dependency, Key, Reaction, ReactionId};
use crate::config::{ObservationMode, RuntimeConfig};
use crate::observe::{Container, ContainerId, IdentityMap, Observed, Value, Wrapped};

/// A computation the runtime can re-run.
pub trait Reactive: Send + Sync {
    /// Stable identity, used for idempotent subscription and the
    /// re-entrancy check.
    fn reaction_id(&self) -> ReactionId;

    /// Run the computation with tracking attributed to it.
    fn run(self: Arc<Self>);

    /// Whether the computation has been permanently stopped.
    fn is_disposed(&self) -> bool;
}

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: DependencyRegistry,
    pub(crate) identity: IdentityMap,
    pub(crate) stack: ExecutionStack,
}

/// Handle to a reactive engine.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(mode = ?config.mode, trigger_on_delete = config.trigger_on_delete, "runtime created");
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                registry: DependencyRegistry::new(),
                identity: IdentityMap::new(),
                stack: ExecutionStack::new(),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same engine.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------------

    /// Create a reaction and run it once to collect its dependencies.
    pub fn run_reaction<T, F>(&self, body: F) -> Reaction<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let reaction = Reaction::new(&self.inner, body);
        reaction.run();
        reaction
    }

    /// Create a reaction without running it.
    pub fn run_reaction_lazy<T, F>(&self, body: F) -> Reaction<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Reaction::new(&self.inner, body)
    }

    /// Run `f` with tracking suspended.
    ///
    /// Reads inside `f` subscribe nothing. Writes inside `f` still trigger,
    /// and the reactions running outside `f` still cannot be re-entered.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _barrier = self.inner.stack.untracked();
        f()
    }

    /// The reaction reads are currently attributed to.
    pub fn current_reaction(&self) -> Option<ReactionId> {
        self.inner.stack.current_id()
    }

    /// Whether a read right now would be tracked.
    pub fn is_tracking(&self) -> bool {
        self.current_reaction().is_some()
    }

    /// Number of frames on the execution stack.
    pub fn stack_depth(&self) -> usize {
        self.inner.stack.depth()
    }

    // ------------------------------------------------------------------------
    // Dependencies
    // ------------------------------------------------------------------------

    /// Subscribe the running reaction to `(container, key)`.
    ///
    /// No-op when no reaction is running, or when the running reaction was
    /// disposed during this run.
    pub fn track(&self, container: ContainerId, key: Key) {
        let Some(reaction) = self.inner.stack.current() else {
            return;
        };
        if reaction.is_disposed() {
            return;
        }
        let reaction_id = reaction.reaction_id();
        trace!(container = %container, key = %key, reaction = %reaction_id, "track");
        self.inner.registry.subscribe(container, key, reaction);
    }

    /// Re-run every reaction subscribed to `(container, key)`.
    pub fn trigger(&self, container: ContainerId, key: Key) {
        let subscribers = self.inner.registry.subscribers(container, &key);
        if subscribers.is_empty() {
            return;
        }
        trace!(container = %container, key = %key, subscribers = subscribers.len(), "trigger");
        for reaction in subscribers.into_iter().filter(|r| !r.is_disposed()) {
            reaction.run();
        }
    }

    /// Re-run the subscribers of several keys as one notification.
    ///
    /// A reaction subscribed to more than one of the keys runs once.
    pub fn trigger_all(&self, container: ContainerId, keys: &[Key]) {
        let subscribers = self.inner.registry.subscribers_of(container, keys);
        if subscribers.is_empty() {
            return;
        }
        trace!(container = %container, keys = keys.len(), subscribers = subscribers.len(), "trigger");
        for reaction in subscribers.into_iter().filter(|r| !r.is_disposed()) {
            reaction.run();
        }
    }

    /// Create a hand-driven dependency.
    pub fn dependency(&self) -> Dependency {
        Dependency::new(self.clone())
    }

    pub fn subscriber_count(&self, container: ContainerId, key: &Key) -> usize {
        self.inner.registry.subscriber_count(container, key)
    }

    /// Number of `(container, key)` pairs anyone has subscribed to.
    pub fn tracked_keys(&self) -> usize {
        self.inner.registry.len()
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Observe a value.
    ///
    /// Containers come back as observed handles; scalars come back unchanged.
    /// Observing a container twice, or observing a handle this runtime
    /// issued, returns the same handle.
    pub fn observe(&self, value: Value) -> Value {
        match value {
            Value::Container(raw) => Value::Observed(self.wrap_container(&raw)),
            Value::Observed(observed) if self.owns(&observed) => Value::Observed(observed),
            Value::Observed(foreign) => Value::Observed(self.wrap_container(foreign.raw())),
            scalar => scalar,
        }
    }

    /// Observe a container.
    pub fn observe_container(&self, raw: &Container) -> Observed {
        self.wrap_container(raw)
    }

    /// The raw form of a value: observed handles are unwrapped.
    pub fn to_raw(&self, value: &Value) -> Value {
        match value {
            Value::Observed(observed) => Value::Container(observed.raw().clone()),
            other => other.clone(),
        }
    }

    /// Whether this runtime has wrapped `raw`.
    pub fn is_observed(&self, raw: &Container) -> bool {
        self.inner.identity.observed_id(raw.id()).is_some()
    }

    /// Number of containers under observation.
    pub fn observed_count(&self) -> usize {
        self.inner.identity.len()
    }

    /// Stop observing a container and drop every subscription to it.
    ///
    /// Handles already given out keep working, but the container is wrapped
    /// afresh the next time it is observed.
    pub fn release(&self, observed: &Observed) {
        let released = self.inner.identity.release(observed.id()).is_some();
        let forgotten = self.inner.registry.forget_container(observed.container_id());
        debug!(
            container = %observed.container_id(),
            released,
            forgotten,
            "container released"
        );
    }

    fn owns(&self, observed: &Observed) -> bool {
        self.ptr_eq(observed.runtime()) && self.inner.identity.is_wrapper(observed.id())
    }

    /// Wrap a container, walking its children first-time in eager mode.
    ///
    /// The container is registered before its children are visited, which
    /// is what terminates the walk on cyclic structures.
    pub(crate) fn wrap_container(&self, raw: &Container) -> Observed {
        let wrapped = self.inner.identity.wrap(raw);
        if let Wrapped::Created(id) = wrapped {
            trace!(container = %raw.id(), observed = %id, "wrap");
            if self.inner.config.mode == ObservationMode::Eager {
                for child in raw.child_containers() {
                    self.wrap_container(&child);
                }
            }
        }
        Observed::new(wrapped.id(), raw.clone(), self.clone())
    }

    /// The form a value takes when read through an observed handle.
    pub(crate) fn wrap_value(&self, value: Value) -> Value {
        match value {
            Value::Container(raw) => Value::Observed(self.wrap_container(&raw)),
            other => other,
        }
    }

    /// Observe a value that was just inserted into an observed container.
    pub(crate) fn deep_observe(&self, value: &Value) {
        if let Value::Container(raw) = value {
            self.wrap_container(raw);
        }
    }

    /// Observe a value that was just assigned, if the mode asks for it.
    pub(crate) fn observe_written(&self, value: &Value) {
        if self.inner.config.mode == ObservationMode::Eager {
            self.deep_observe(value);
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("tracked_keys", &self.tracked_keys())
            .field("observed_count", &self.observed_count())
            .field("stack_depth", &self.stack_depth())
            .finish()
    }
}
