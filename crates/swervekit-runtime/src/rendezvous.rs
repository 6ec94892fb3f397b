//! [`ConcurrentEvent`] – one-shot broadcast rendezvous between tasks.
//!
//! Waiters register a [`Block`] with the event.  A single
//! [`ConcurrentEvent::set`] releases every block registered at that moment;
//! blocks created afterwards are unaffected.  A block unregisters itself the
//! first time it observes readiness, so each waiter is released exactly once.
//!
//! ```rust
//! use swervekit_runtime::rendezvous::ConcurrentEvent;
//!
//! let event = ConcurrentEvent::new();
//! let early = event.create_block();
//! event.set();
//! let late = event.create_block();
//!
//! assert!(early.is_ready());
//! assert!(!late.is_ready());
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use swervekit_types::SwerveError;
use tracing::trace;

use crate::task::{Step, Task, TickInfo};

#[derive(Default)]
struct EventInner {
    next_id: Cell<u64>,
    /// Outstanding blocks, weakly held so a dropped waiter does not leak.
    blocks: RefCell<Vec<(u64, Weak<Cell<bool>>)>>,
}

impl EventInner {
    fn unregister(&self, id: u64) {
        self.blocks.borrow_mut().retain(|(block_id, _)| *block_id != id);
    }
}

/// A one-shot broadcast signal.  Cloning yields another handle to the same
/// event.
#[derive(Clone, Default)]
pub struct ConcurrentEvent {
    inner: Rc<EventInner>,
}

impl ConcurrentEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new waiter.
    pub fn create_block(&self) -> Block {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let ready = Rc::new(Cell::new(false));
        self.inner
            .blocks
            .borrow_mut()
            .push((id, Rc::downgrade(&ready)));
        Block {
            id,
            ready,
            event: Rc::downgrade(&self.inner),
        }
    }

    /// Release every block registered right now.
    pub fn set(&self) {
        let mut blocks = self.inner.blocks.borrow_mut();
        blocks.retain(|(_, ready)| match ready.upgrade() {
            Some(ready) => {
                ready.set(true);
                true
            }
            None => false,
        });
        trace!(released = blocks.len(), "rendezvous set");
    }

    /// Number of blocks registered and not yet consumed.
    pub fn pending(&self) -> usize {
        self.inner
            .blocks
            .borrow()
            .iter()
            .filter(|(_, ready)| ready.strong_count() > 0)
            .count()
    }
}

/// One waiter on a [`ConcurrentEvent`].
#[derive(Clone)]
pub struct Block {
    id: u64,
    ready: Rc<Cell<bool>>,
    event: Weak<EventInner>,
}

impl Block {
    /// Whether the event was set after this block was created.
    ///
    /// The first call that observes readiness removes the block from the
    /// event, so later `set` calls no longer see it.
    pub fn is_ready(&self) -> bool {
        if !self.ready.get() {
            return false;
        }
        if let Some(event) = self.event.upgrade() {
            event.unregister(self.id);
        }
        true
    }

    /// A task that yields until this block is ready, then completes.
    pub fn wait_task(&self) -> BlockWait {
        BlockWait {
            block: self.clone(),
        }
    }
}

/// Task returned by [`Block::wait_task`].
pub struct BlockWait {
    block: Block,
}

impl Task for BlockWait {
    fn name(&self) -> &str {
        "rendezvous_wait"
    }

    fn step(&mut self, _tick: &TickInfo) -> Result<Step, SwerveError> {
        if self.block.is_ready() {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Order, Scheduler};

    #[test]
    fn block_created_before_set_becomes_ready() {
        let event = ConcurrentEvent::new();
        let block = event.create_block();
        assert!(!block.is_ready());
        event.set();
        assert!(block.is_ready());
    }

    #[test]
    fn block_created_after_set_stays_waiting() {
        let event = ConcurrentEvent::new();
        event.set();
        let block = event.create_block();
        assert!(!block.is_ready());
        assert_eq!(event.pending(), 1);
    }

    #[test]
    fn observed_block_unregisters() {
        let event = ConcurrentEvent::new();
        let a = event.create_block();
        let b = event.create_block();
        event.set();
        assert_eq!(event.pending(), 2);
        assert!(a.is_ready());
        assert_eq!(event.pending(), 1);
        assert!(b.is_ready());
        assert_eq!(event.pending(), 0);
        // Still ready on later observations, and a later set is harmless.
        event.set();
        assert!(a.is_ready());
    }

    #[test]
    fn dropped_blocks_are_pruned() {
        let event = ConcurrentEvent::new();
        drop(event.create_block());
        let kept = event.create_block();
        assert_eq!(event.pending(), 1);
        event.set();
        assert!(kept.is_ready());
        assert_eq!(event.pending(), 0);
    }

    #[test]
    fn block_outlives_event() {
        let event = ConcurrentEvent::new();
        let block = event.create_block();
        event.set();
        drop(event);
        assert!(block.is_ready());
    }

    #[test]
    fn wait_tasks_release_every_waiter_once() {
        let event = ConcurrentEvent::new();
        let mut s = Scheduler::new(0.0);
        let w1 = s.schedule(event.create_block().wait_task(), Order::Normal);
        let w2 = s.schedule(event.create_block().wait_task(), Order::Late);

        s.advance_clock(0.02);
        s.run_phase(Order::Normal);
        s.run_phase(Order::Late);
        assert!(!w1.is_done() && !w2.is_done());

        event.set();
        s.advance_clock(0.04);
        s.run_phase(Order::Normal);
        s.run_phase(Order::Late);
        assert!(w1.is_done() && w2.is_done());
        assert_eq!(event.pending(), 0);
        assert!(s.is_empty());
    }
}
