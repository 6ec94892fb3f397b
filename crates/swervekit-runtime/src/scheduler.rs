//! [`Scheduler`] – single-threaded cooperative task scheduler.
//!
//! Tasks live in one of four ordered queues ([`Order`]).  Per tick the host
//! advances the clock and calls [`Scheduler::run_phase`] for `Early`, `Normal`
//! and `Late`, in that order; `Always` is advanced by its own explicit call so
//! it keeps running while the robot is disabled.
//!
//! # Ownership
//!
//! The scheduler exclusively owns queue membership.  Callers keep a
//! [`TaskHandle`], a weak view that can report completion and be passed back to
//! [`Scheduler::cancel`].
//!
//! # Fault isolation
//!
//! A step that returns an error (or panics) is logged and counted as
//! [`Step::Continue`]: the task stays queued and the rest of the phase still
//! runs.  One misbehaving task cannot stop the control loop.
//!
//! # Exemption vs. `Always`
//!
//! `Order::Always` only decides *when* a task is stepped.  Whether
//! [`Scheduler::stop_all`] removes it is decided solely by the exempt flag
//! given at [`Scheduler::schedule_exempt`] time.  The two are independent.
//!
//! # Example
//!
//! ```rust
//! use swervekit_runtime::scheduler::{Order, Scheduler};
//! use swervekit_runtime::task::WaitFrames;
//!
//! let mut scheduler = Scheduler::new(0.0);
//! let handle = scheduler.schedule(WaitFrames::new(0), Order::Normal);
//!
//! scheduler.advance_clock(0.02);
//! scheduler.run_phase(Order::Normal);
//! assert!(!handle.is_done());
//!
//! scheduler.advance_clock(0.04);
//! scheduler.run_phase(Order::Normal);
//! assert!(handle.is_done());
//! ```

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use swervekit_types::{SwerveError, TaskId};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::task::{Step, Task, TickInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Order
// ─────────────────────────────────────────────────────────────────────────────

/// Phase in which a task is advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Early,
    Normal,
    Late,
    /// Advanced by a separate call, independent of the enabled phases.
    Always,
}

impl Order {
    /// All phases, in queue order.
    pub const ALL: [Order; 4] = [Order::Early, Order::Normal, Order::Late, Order::Always];

    /// The phases run by an enabled tick, in execution order.
    pub const ENABLED_SEQUENCE: [Order; 3] = [Order::Early, Order::Normal, Order::Late];

    const fn index(self) -> usize {
        match self {
            Order::Early => 0,
            Order::Normal => 1,
            Order::Late => 2,
            Order::Always => 3,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Early => write!(f, "early"),
            Order::Normal => write!(f, "normal"),
            Order::Late => write!(f, "late"),
            Order::Always => write!(f, "always"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TaskHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-side view of a scheduled task.
///
/// Cloning a handle is cheap; all clones observe the same completion flag.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    order: Order,
    done: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// `true` once the task finished, was cancelled, or was removed by
    /// [`Scheduler::stop_all`].
    pub fn is_done(&self) -> bool {
        self.done.get()
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.done, &other.done)
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("done", &self.done.get())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

struct Entry {
    id: TaskId,
    name: String,
    exempt: bool,
    done: Rc<Cell<bool>>,
    task: Box<dyn Task>,
}

/// Owns the four task queues and the tick clock.
pub struct Scheduler {
    queues: [Vec<Entry>; 4],
    next_id: u64,
    clock: Clock,
}

impl Scheduler {
    /// Create an empty scheduler whose clock starts at `now` seconds.
    pub fn new(now: f64) -> Self {
        Self {
            queues: Default::default(),
            next_id: 0,
            clock: Clock::new(now),
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Queue `task` at the end of the `order` phase.
    pub fn schedule(&mut self, task: impl Task + 'static, order: Order) -> TaskHandle {
        self.insert(Box::new(task), order, false)
    }

    /// Queue `task` so that [`stop_all`][Self::stop_all] leaves it running.
    pub fn schedule_exempt(&mut self, task: impl Task + 'static, order: Order) -> TaskHandle {
        self.insert(Box::new(task), order, true)
    }

    /// Return `handle` unchanged while its task is still live; otherwise build
    /// a fresh task with `factory` and schedule it.
    ///
    /// Calling this every tick with the handle it returned installs a
    /// background task exactly once and reinstalls it after it finishes or is
    /// stopped.
    pub fn restart_if_finished<T, F>(
        &mut self,
        handle: Option<TaskHandle>,
        factory: F,
        order: Order,
    ) -> TaskHandle
    where
        T: Task + 'static,
        F: FnOnce() -> T,
    {
        match handle {
            Some(handle) if !handle.is_done() => handle,
            _ => self.schedule(factory(), order),
        }
    }

    fn insert(&mut self, task: Box<dyn Task>, order: Order, exempt: bool) -> TaskHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let done = Rc::new(Cell::new(false));
        let name = task.name().to_string();
        debug!(task = %name, %id, %order, exempt, "task scheduled");
        self.queues[order.index()].push(Entry {
            id,
            name,
            exempt,
            done: done.clone(),
            task,
        });
        TaskHandle { id, order, done }
    }

    // ── Removal ──────────────────────────────────────────────────────────────

    /// Remove the task from its queue and mark it done.  The task body is
    /// never resumed again and gets no cleanup call.
    ///
    /// # Errors
    ///
    /// Returns [`SwerveError::InvalidHandle`] if the task is not queued (it
    /// already finished, was already stopped, or belongs to another
    /// scheduler).
    pub fn cancel(&mut self, handle: &TaskHandle) -> Result<(), SwerveError> {
        let queue = &mut self.queues[handle.order.index()];
        let position = queue
            .iter()
            .position(|entry| entry.id == handle.id && Rc::ptr_eq(&entry.done, &handle.done))
            .ok_or(SwerveError::InvalidHandle(handle.id))?;
        let entry = queue.remove(position);
        entry.done.set(true);
        debug!(task = %entry.name, id = %entry.id, "task cancelled");
        Ok(())
    }

    /// Remove every task not scheduled as exempt, from every queue.
    pub fn stop_all(&mut self) {
        let mut stopped = 0usize;
        for queue in &mut self.queues {
            queue.retain(|entry| {
                if entry.exempt {
                    true
                } else {
                    entry.done.set(true);
                    stopped += 1;
                    false
                }
            });
        }
        info!(stopped, remaining = self.len(), "stop_all");
    }

    /// Restart the clock at `now` and [`stop_all`][Self::stop_all].
    pub fn reset(&mut self, now: f64) {
        self.clock.reset(now);
        self.stop_all();
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    /// Whether the task behind `handle` has finished.
    ///
    /// # Errors
    ///
    /// Returns [`SwerveError::InvalidHandle`] when the handle is neither done
    /// nor queued here.
    pub fn is_done(&self, handle: &TaskHandle) -> Result<bool, SwerveError> {
        if handle.is_done() {
            Ok(true)
        } else if self.contains(handle) {
            Ok(false)
        } else {
            Err(SwerveError::InvalidHandle(handle.id))
        }
    }

    pub fn contains(&self, handle: &TaskHandle) -> bool {
        self.queues[handle.order.index()]
            .iter()
            .any(|entry| entry.id == handle.id && Rc::ptr_eq(&entry.done, &handle.done))
    }

    /// Number of tasks queued in `order`.
    pub fn queued(&self, order: Order) -> usize {
        self.queues[order.index()].len()
    }

    /// Total number of queued tasks.
    pub fn len(&self) -> usize {
        self.queues.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Clock ────────────────────────────────────────────────────────────────

    /// Record a new tick at host time `now` (seconds).
    pub fn advance_clock(&mut self, now: f64) -> TickInfo {
        self.clock.advance(now)
    }

    pub fn tick_info(&self) -> TickInfo {
        self.clock.tick_info()
    }

    // ── Execution ────────────────────────────────────────────────────────────

    /// Step every task queued in `order` once, in insertion order.
    ///
    /// Finished tasks are removed after their final step.  Step errors and
    /// panics are logged and the task stays queued.
    pub fn run_phase(&mut self, order: Order) {
        let tick = self.clock.tick_info();
        self.queues[order.index()].retain_mut(|entry| {
            if entry.done.get() {
                return false;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.task.step(&tick)));
            match outcome {
                Ok(Ok(Step::Continue)) => true,
                Ok(Ok(Step::Done)) => {
                    entry.done.set(true);
                    debug!(task = %entry.name, id = %entry.id, %order, "task finished");
                    false
                }
                Ok(Err(e)) => {
                    warn!(
                        task = %entry.name,
                        id = %entry.id,
                        %order,
                        error = %e,
                        "task step failed"
                    );
                    true
                }
                Err(payload) => {
                    warn!(
                        task = %entry.name,
                        id = %entry.id,
                        %order,
                        panic = panic_message(payload.as_ref()),
                        "task step panicked"
                    );
                    true
                }
            }
        });
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(0.0)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{WaitFrames, forever, from_fn};
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_task(log: &Log, label: &str) -> impl Task + 'static {
        let log = log.clone();
        let label = label.to_string();
        forever(label.clone(), move |tick| {
            log.borrow_mut().push(format!("{}:{label}", tick.frame));
            Ok(())
        })
    }

    fn run_tick(s: &mut Scheduler, now: f64) {
        s.advance_clock(now);
        for order in Order::ENABLED_SEQUENCE {
            s.run_phase(order);
        }
    }

    #[test]
    fn phases_run_early_normal_late_each_tick() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        // Registered out of phase order on purpose.
        s.schedule(logging_task(&log, "late"), Order::Late);
        s.schedule(logging_task(&log, "normal"), Order::Normal);
        s.schedule(logging_task(&log, "early"), Order::Early);

        run_tick(&mut s, 0.02);
        run_tick(&mut s, 0.04);

        assert_eq!(
            *log.borrow(),
            vec!["1:early", "1:normal", "1:late", "2:early", "2:normal", "2:late"]
        );
    }

    #[test]
    fn insertion_order_within_a_phase() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        s.schedule(logging_task(&log, "a"), Order::Normal);
        s.schedule(logging_task(&log, "b"), Order::Normal);
        s.schedule(logging_task(&log, "c"), Order::Normal);
        run_tick(&mut s, 0.02);
        assert_eq!(*log.borrow(), vec!["1:a", "1:b", "1:c"]);
    }

    #[test]
    fn always_phase_is_not_run_by_enabled_sequence() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        s.schedule(logging_task(&log, "always"), Order::Always);
        run_tick(&mut s, 0.02);
        assert!(log.borrow().is_empty());
        s.run_phase(Order::Always);
        assert_eq!(*log.borrow(), vec!["1:always"]);
    }

    #[test]
    fn finished_task_is_removed_and_marked_done() {
        let mut s = Scheduler::new(0.0);
        let handle = s.schedule(from_fn("once", |_: &TickInfo| Ok(Step::Done)), Order::Early);
        assert_eq!(s.queued(Order::Early), 1);
        run_tick(&mut s, 0.02);
        assert!(handle.is_done());
        assert_eq!(s.queued(Order::Early), 0);
        assert_eq!(s.is_done(&handle), Ok(true));
    }

    #[test]
    fn restart_if_finished_is_idempotent_for_live_task() {
        let mut s = Scheduler::new(0.0);
        let factory_calls = Rc::new(Cell::new(0));
        let make = |calls: &Rc<Cell<u32>>| {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                WaitFrames::new(100)
            }
        };

        let first = s.restart_if_finished(None, make(&factory_calls), Order::Late);
        let second = s.restart_if_finished(Some(first.clone()), make(&factory_calls), Order::Late);
        let third = s.restart_if_finished(Some(second.clone()), make(&factory_calls), Order::Late);

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(factory_calls.get(), 1);
        assert_eq!(s.queued(Order::Late), 1);
    }

    #[test]
    fn restart_if_finished_replaces_done_task() {
        let mut s = Scheduler::new(0.0);
        let first = s.restart_if_finished(None, || WaitFrames::new(5), Order::Normal);
        s.cancel(&first).unwrap();
        let second =
            s.restart_if_finished(Some(first.clone()), || WaitFrames::new(5), Order::Normal);
        assert_ne!(first, second);
        assert!(!second.is_done());
        assert_eq!(s.queued(Order::Normal), 1);
    }

    #[test]
    fn cancel_stops_resumption() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        let handle = s.schedule(logging_task(&log, "victim"), Order::Normal);
        run_tick(&mut s, 0.02);
        s.cancel(&handle).unwrap();
        run_tick(&mut s, 0.04);
        assert_eq!(*log.borrow(), vec!["1:victim"]);
        assert!(handle.is_done());
    }

    #[test]
    fn cancel_twice_is_invalid_handle() {
        let mut s = Scheduler::new(0.0);
        let handle = s.schedule(WaitFrames::new(10), Order::Normal);
        s.cancel(&handle).unwrap();
        assert_eq!(s.cancel(&handle), Err(SwerveError::InvalidHandle(handle.id())));
    }

    #[test]
    fn foreign_handle_is_invalid() {
        let mut a = Scheduler::new(0.0);
        let b = Scheduler::new(0.0);
        let handle = a.schedule(WaitFrames::new(10), Order::Early);
        assert!(matches!(b.is_done(&handle), Err(SwerveError::InvalidHandle(_))));
        assert_eq!(a.is_done(&handle), Ok(false));
    }

    #[test]
    fn stop_all_respects_exemption_not_order() {
        let mut s = Scheduler::new(0.0);
        let normal = s.schedule(WaitFrames::new(100), Order::Normal);
        let always = s.schedule(WaitFrames::new(100), Order::Always);
        let exempt_early = s.schedule_exempt(WaitFrames::new(100), Order::Early);
        let exempt_always = s.schedule_exempt(WaitFrames::new(100), Order::Always);

        s.stop_all();

        assert!(normal.is_done());
        assert!(always.is_done(), "Always membership must not imply exemption");
        assert!(!exempt_early.is_done());
        assert!(!exempt_always.is_done());
        assert_eq!(s.len(), 2);
        assert!(s.contains(&exempt_early));
        assert!(s.contains(&exempt_always));
    }

    #[test]
    fn exempt_task_keeps_running_after_stop_all() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        s.schedule_exempt(logging_task(&log, "input"), Order::Early);
        s.schedule(logging_task(&log, "auto"), Order::Normal);
        s.stop_all();
        run_tick(&mut s, 0.02);
        assert_eq!(*log.borrow(), vec!["1:input"]);
    }

    #[test]
    fn failing_step_is_isolated_and_retried() {
        let log: Log = Rc::default();
        let attempts = Rc::new(Cell::new(0));
        let a = attempts.clone();
        let mut s = Scheduler::new(0.0);
        let flaky = s.schedule(
            from_fn("flaky", move |_: &TickInfo| {
                a.set(a.get() + 1);
                Err(SwerveError::hardware("steer", "timeout"))
            }),
            Order::Normal,
        );
        s.schedule(logging_task(&log, "after"), Order::Normal);

        run_tick(&mut s, 0.02);
        run_tick(&mut s, 0.04);

        assert_eq!(attempts.get(), 2);
        assert!(!flaky.is_done());
        assert_eq!(*log.borrow(), vec!["1:after", "2:after"]);
    }

    #[test]
    fn panicking_step_does_not_crash_the_phase() {
        let log: Log = Rc::default();
        let mut s = Scheduler::new(0.0);
        let bad = s.schedule(
            from_fn("bad", |_: &TickInfo| -> Result<Step, SwerveError> { panic!("boom") }),
            Order::Late,
        );
        s.schedule(logging_task(&log, "good"), Order::Late);
        run_tick(&mut s, 0.02);
        assert_eq!(*log.borrow(), vec!["1:good"]);
        assert!(s.contains(&bad));
    }

    #[test]
    fn reset_restarts_clock_and_stops_tasks() {
        let mut s = Scheduler::new(0.0);
        run_tick(&mut s, 0.02);
        run_tick(&mut s, 0.04);
        let handle = s.schedule(WaitFrames::new(100), Order::Always);
        s.reset(1.0);
        assert_eq!(s.tick_info().frame, 0);
        assert!(handle.is_done());
        assert!(s.is_empty());
    }

    #[test]
    fn step_sees_current_tick() {
        let seen = Rc::new(Cell::new(TickInfo::default()));
        let probe = seen.clone();
        let mut s = Scheduler::new(0.0);
        s.schedule(
            forever("probe", move |tick| {
                probe.set(*tick);
                Ok(())
            }),
            Order::Early,
        );
        run_tick(&mut s, 0.02);
        run_tick(&mut s, 0.05);
        let tick = seen.get();
        assert_eq!(tick.frame, 2);
        assert!((tick.dt - 0.03).abs() < 1e-9);
    }
}
