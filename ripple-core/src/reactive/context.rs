//! Execution Stack
//!
//! The execution stack tracks which reactions are currently running. Reads
//! are attributed to the innermost running reaction, so a parent that calls
//! into a child only tracks against the child while the child runs.
//!
//! # Implementation
//!
//! Each runtime owns one stack per thread, keyed by [`ThreadId`], so reactions
//! of one runtime running on different threads never see each other's frames.
//! Entering a reaction pushes a frame and returns a [`StackFrame`] guard;
//! dropping the guard pops it. The pop happens on every exit path, including
//! unwinding out of a panicking reaction body.
//!
//! A reaction that is already on the current thread's stack cannot be entered
//! again. This is the only protection against a reaction re-triggering itself
//! forever.
//!
//! [`ExecutionStack::untracked`] pushes a barrier frame: while it is on top,
//! there is no current reaction, but the reactions below it still count as
//! running for the re-entrancy check.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::warn;

use super::{Reactive, ReactionId};

enum Frame {
    Reaction(Arc<dyn Reactive>),
    Untracked,
}

impl Frame {
    fn reaction_id(&self) -> Option<ReactionId> {
        match self {
            Frame::Reaction(reaction) => Some(reaction.reaction_id()),
            Frame::Untracked => None,
        }
    }
}

type Frames = SmallVec<[Frame; 8]>;

#[derive(Default)]
pub(crate) struct ExecutionStack {
    stacks: Mutex<HashMap<ThreadId, Frames>>,
}

impl ExecutionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mutate the calling thread's frames. Empty stacks are dropped.
    fn with_frames<R>(&self, f: impl FnOnce(&mut Frames) -> R) -> R {
        let thread = thread::current().id();
        let mut stacks = self.stacks.lock();
        let frames = stacks.entry(thread).or_default();
        let result = f(frames);
        if frames.is_empty() {
            stacks.remove(&thread);
        }
        result
    }

    /// Inspect the calling thread's frames.
    fn read_frames<R>(&self, f: impl FnOnce(&[Frame]) -> R) -> R {
        let thread = thread::current().id();
        let stacks = self.stacks.lock();
        f(stacks.get(&thread).map(|frames| frames.as_slice()).unwrap_or(&[]))
    }

    /// Push a reaction frame.
    ///
    /// Returns `None`, pushing nothing, if the reaction is already running
    /// on this thread.
    pub(crate) fn enter(&self, reaction: Arc<dyn Reactive>) -> Option<StackFrame<'_>> {
        let id = reaction.reaction_id();
        let entered = self.with_frames(|frames| {
            if frames.iter().any(|frame| frame.reaction_id() == Some(id)) {
                return false;
            }
            frames.push(Frame::Reaction(reaction));
            true
        });

        entered.then(|| StackFrame::new(self, Some(id)))
    }

    /// Push a barrier that hides the running reactions from tracking.
    pub(crate) fn untracked(&self) -> StackFrame<'_> {
        self.with_frames(|frames| frames.push(Frame::Untracked));
        StackFrame::new(self, None)
    }

    /// The reaction reads are currently attributed to.
    pub(crate) fn current(&self) -> Option<Arc<dyn Reactive>> {
        self.read_frames(|frames| match frames.last() {
            Some(Frame::Reaction(reaction)) => Some(reaction.clone()),
            _ => None,
        })
    }

    pub(crate) fn current_id(&self) -> Option<ReactionId> {
        self.read_frames(|frames| frames.last().and_then(Frame::reaction_id))
    }

    /// Whether `id` is running anywhere on this thread's stack.
    pub(crate) fn contains(&self, id: ReactionId) -> bool {
        self.read_frames(|frames| frames.iter().any(|frame| frame.reaction_id() == Some(id)))
    }

    /// Number of frames on this thread, barriers included.
    pub(crate) fn depth(&self) -> usize {
        self.read_frames(<[Frame]>::len)
    }
}

/// Guard that pops its frame when dropped.
///
/// Not `Send`: the frame lives on the stack of the thread that pushed it.
pub(crate) struct StackFrame<'a> {
    stack: &'a ExecutionStack,
    reaction_id: Option<ReactionId>,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a> StackFrame<'a> {
    fn new(stack: &'a ExecutionStack, reaction_id: Option<ReactionId>) -> Self {
        Self {
            stack,
            reaction_id,
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        let popped = self.stack.with_frames(|frames| frames.pop());

        if thread::panicking() {
            warn!(reaction = ?self.reaction_id, "reaction body panicked; unwinding its frame");
        }

        // Frames must be popped in the order they were pushed.
        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.reaction_id(),
                self.reaction_id,
                "execution stack mismatch"
            );
        }
    }
}
