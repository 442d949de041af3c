//! Reaction Implementation
//!
//! A Reaction is a computation that re-runs whenever something it read
//! changes.
//!
//! # How Reactions Work
//!
//! 1. When created through [`Runtime::run_reaction`], the reaction runs its
//!    body immediately to establish its initial dependencies.
//!
//! 2. While the body runs, the reaction is on top of the execution stack, so
//!    every tracked read subscribes it.
//!
//! 3. When a dependency is triggered, the reaction runs again, synchronously,
//!    before the write that triggered it returns.
//!
//! Dependencies are never cleared between runs. A reaction stays subscribed
//! to everything it ever read; re-reading the same key is a no-op thanks to
//! the idempotent subscription set.
//!
//! # Re-entrancy
//!
//! A reaction that is already running is skipped rather than re-entered.
//! This covers a body writing to a key it also read, and longer cycles such
//! as A → B → A, which stop after each side has run once.
//!
//! # Disposal
//!
//! Reactions are retained by the subscription sets they belong to, so
//! dropping the handle does not stop them. Call [`Reaction::dispose`].
//!
//! [`Runtime::run_reaction`]: super::Runtime::run_reaction

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::runtime::RuntimeInner;
use super::{Reactive, ReactionId};

/// A re-runnable computation whose reads are tracked each time it runs.
///
/// `T` is the type the body returns; the most recent result is cached.
pub struct Reaction<T = ()> {
    inner: Arc<ReactionInner<T>>,
}

pub(crate) struct ReactionInner<T> {
    id: ReactionId,

    /// The owning runtime. Weak: the runtime's registry owns reactions.
    runtime: Weak<RuntimeInner>,

    body: Box<dyn Fn() -> T + Send + Sync>,

    /// Result of the most recent completed run.
    value: Mutex<Option<Arc<T>>>,

    run_count: AtomicUsize,

    disposed: AtomicBool,
}

impl<T: Send + Sync + 'static> Reaction<T> {
    pub(crate) fn new<F>(runtime: &Arc<RuntimeInner>, body: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ReactionInner {
                id: ReactionId::new(),
                runtime: Arc::downgrade(runtime),
                body: Box::new(body),
                value: Mutex::new(None),
                run_count: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Run the body now, tracking its reads.
    ///
    /// Does nothing if the reaction is disposed or already running.
    pub fn run(&self) {
        Reactive::run(Arc::clone(&self.inner));
    }

    /// Stop the reaction for good and unsubscribe it everywhere.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(runtime) = self.inner.runtime.upgrade() {
            let removed = runtime.registry.remove_reaction(self.inner.id);
            debug!(reaction = %self.inner.id, subscriptions = removed, "reaction disposed");
        }
    }
}

impl<T> Reaction<T> {
    pub fn id(&self) -> ReactionId {
        self.inner.id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether the body is executing right now on the calling thread.
    pub fn is_running(&self) -> bool {
        self.inner
            .runtime
            .upgrade()
            .is_some_and(|runtime| runtime.stack.contains(self.inner.id))
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Inspect the most recent result without cloning it.
    ///
    /// `f` runs with no lock held, so it may write to state the reaction
    /// reads. It sees the result as it was when `with_value` was called.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let value = self.inner.value.lock().clone();
        f(value.as_deref())
    }
}

impl<T: Clone> Reaction<T> {
    /// The most recent result, or `None` before the first completed run.
    pub fn value(&self) -> Option<T> {
        self.inner.value.lock().as_deref().cloned()
    }
}

impl<T: Send + Sync + 'static> Reactive for ReactionInner<T> {
    fn reaction_id(&self) -> ReactionId {
        self.id
    }

    fn run(self: Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };

        let this: Arc<dyn Reactive> = self.clone();
        let Some(_frame) = runtime.stack.enter(this) else {
            debug!(reaction = %self.id, "reaction already running; skipped");
            return;
        };

        debug!(reaction = %self.id, "running reaction");
        let value = (self.body)();
        *self.value.lock() = Some(Arc::new(value));

        let runs = self.run_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(reaction = %self.id, run_count = runs, "reaction finished");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl<T> Clone for Reaction<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Reaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicI32;

    use super::super::{Key, Runtime};
    use super::*;
    use crate::observe::{ObservedRecord, Value};

    fn record(runtime: &Runtime, json: serde_json::Value) -> ObservedRecord {
        runtime
            .observe(Value::from(json))
            .into_observed()
            .unwrap()
            .record()
            .unwrap()
    }

    #[test]
    fn reaction_runs_on_creation() {
        let runtime = Runtime::new();
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let reaction = runtime.run_reaction(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn lazy_reaction_does_not_run_on_creation() {
        let runtime = Runtime::new();
        let reaction = runtime.run_reaction_lazy(|| 7);

        assert_eq!(reaction.run_count(), 0);
        assert_eq!(reaction.value(), None);

        reaction.run();
        assert_eq!(reaction.run_count(), 1);
        assert_eq!(reaction.value(), Some(7));
    }

    #[test]
    fn reaction_caches_last_value() {
        let runtime = Runtime::new();
        let counter = Arc::new(AtomicI32::new(0));
        let counter_clone = counter.clone();

        let reaction = runtime.run_reaction(move || counter_clone.fetch_add(1, Ordering::SeqCst) * 10);
        assert_eq!(reaction.value(), Some(0));

        reaction.run();
        assert_eq!(reaction.value(), Some(10));
        assert!(reaction.with_value(|v| v == Some(&10)));
    }

    #[test]
    fn reaction_does_not_run_after_disposal() {
        let runtime = Runtime::new();
        let dependency = runtime.dependency();
        let dep = dependency.clone();

        let reaction = runtime.run_reaction(move || dep.depend());
        assert_eq!(dependency.subscriber_count(), 1);

        reaction.dispose();
        assert!(reaction.is_disposed());
        assert_eq!(dependency.subscriber_count(), 0);

        reaction.run();
        dependency.notify();
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn panicking_body_leaves_stack_clean() {
        let runtime = Runtime::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            runtime.run_reaction::<(), _>(|| panic!("render failed"));
        }));

        assert!(result.is_err());
        assert_eq!(runtime.stack_depth(), 0);
        assert!(runtime.current_reaction().is_none());
    }

    #[test]
    fn reaction_knows_when_it_is_running() {
        let runtime = Runtime::new();
        let observed_running = Arc::new(AtomicBool::new(false));
        let flag = observed_running.clone();
        let rt = runtime.clone();

        let reaction = runtime.run_reaction_lazy(move || {
            flag.store(rt.is_tracking(), Ordering::SeqCst);
        });
        reaction.run();

        assert!(observed_running.load(Ordering::SeqCst));
        assert!(!reaction.is_running());
    }

    #[test]
    fn reaction_clone_shares_state() {
        let runtime = Runtime::new();
        let reaction1 = runtime.run_reaction(|| {});
        let reaction2 = reaction1.clone();

        assert_eq!(reaction1.id(), reaction2.id());

        reaction1.run();
        assert_eq!(reaction2.run_count(), 2);

        reaction1.dispose();
        assert!(reaction2.is_disposed());
    }

    #[test]
    fn with_value_may_write_to_dependencies() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "x": 1 }));

        let reader = state.clone();
        let reaction = runtime.run_reaction(move || reader.get("x").and_then(|v| v.as_int()));

        // The write re-runs the reaction, which stores a new value.
        let seen = reaction.with_value(|value| {
            state.set("x", 5);
            value.copied().flatten()
        });

        assert_eq!(seen, Some(1));
        assert_eq!(reaction.run_count(), 2);
        assert_eq!(reaction.value(), Some(Some(5)));
    }

    #[test]
    fn reads_after_dispose_in_same_run_subscribe_nothing() {
        let runtime = Runtime::new();
        let state = record(&runtime, serde_json::json!({ "x": 1 }));
        let slot: Arc<Mutex<Option<Reaction>>> = Arc::new(Mutex::new(None));

        let (reader, me) = (state.clone(), slot.clone());
        let reaction = runtime.run_reaction_lazy(move || {
            let current = me.lock().clone();
            if let Some(current) = current {
                current.dispose();
            }
            reader.get("x");
        });
        *slot.lock() = Some(reaction.clone());

        reaction.run();
        assert!(reaction.is_disposed());
        assert_eq!(
            runtime.subscriber_count(state.observed().container_id(), &Key::from("x")),
            0
        );

        state.set("x", 2);
        assert_eq!(reaction.run_count(), 1);
    }
}
