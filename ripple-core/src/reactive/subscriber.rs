//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on observed values. The
//! dependency storage unit is the [`SubscriptionSet`]: the reactions that read
//! one (container, key) pair, in the order they first read it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::Reactive;

/// Unique identifier for a reaction.
///
/// The ID is stable across re-runs, which is what makes re-subscription
/// during a re-run idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactionId(u64);

impl ReactionId {
    /// Generate a new unique reaction ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across runtimes.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ReactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The reactions subscribed to one (container, key) pair.
///
/// Insertion is idempotent and iteration follows first-subscription order.
#[derive(Clone, Default)]
pub struct SubscriptionSet {
    subscribers: IndexMap<ReactionId, Arc<dyn Reactive>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn insert(&mut self, reaction: Arc<dyn Reactive>) -> bool {
        let id = reaction.reaction_id();
        if self.subscribers.contains_key(&id) {
            return false;
        }
        self.subscribers.insert(id, reaction);
        true
    }

    /// Remove a subscriber, keeping the order of the rest.
    pub fn remove(&mut self, id: ReactionId) -> bool {
        self.subscribers.shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: ReactionId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Subscriber IDs in notification order.
    pub fn ids(&self) -> impl Iterator<Item = ReactionId> + '_ {
        self.subscribers.keys().copied()
    }

    /// Copy out the subscribers so they can run without the set borrowed.
    pub fn snapshot(&self) -> Vec<Arc<dyn Reactive>> {
        self.subscribers.values().cloned().collect()
    }
}

impl fmt::Debug for SubscriptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    /// A reaction stand-in that only counts runs.
    pub(crate) struct MockReactive {
        pub(crate) id: ReactionId,
        pub(crate) runs: AtomicI32,
    }

    impl MockReactive {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ReactionId::new(),
                runs: AtomicI32::new(0),
            })
        }
    }

    impl Reactive for MockReactive {
        fn reaction_id(&self) -> ReactionId {
            self.id
        }

        fn run(self: Arc<Self>) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn is_disposed(&self) -> bool {
            false
        }
    }

    #[test]
    fn reaction_ids_are_unique() {
        let id1 = ReactionId::new();
        let id2 = ReactionId::new();
        let id3 = ReactionId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = SubscriptionSet::new();
        let reaction = MockReactive::new();

        assert!(set.insert(reaction.clone()));
        assert!(!set.insert(reaction.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.contains(reaction.id));
    }

    #[test]
    fn order_follows_first_subscription() {
        let mut set = SubscriptionSet::new();
        let a = MockReactive::new();
        let b = MockReactive::new();
        let c = MockReactive::new();

        set.insert(a.clone());
        set.insert(b.clone());
        set.insert(c.clone());
        set.insert(a.clone());
        assert!(set.remove(b.id));

        assert_eq!(set.ids().collect::<Vec<_>>(), vec![a.id, c.id]);
    }
}
