//! Poll-based tasks.
//!
//! A [`Task`] is a suspendable unit of work.  The scheduler calls
//! [`Task::step`] once per phase invocation; the task does a bounded amount of
//! work and reports [`Step::Continue`] ("not done yet, resume me next tick") or
//! [`Step::Done`].
//!
//! Composition is explicit delegation: a parent's `step` calls its child's
//! `step` and forwards `Continue` until the child reports `Done`.  [`Chain`]
//! packages that pattern for running sub-tasks one after another.
//!
//! # Example
//!
//! ```rust
//! use swervekit_runtime::task::{Chain, Step, Task, TickInfo, WaitFrames, from_fn};
//!
//! let mut seq = Chain::new("delayed")
//!     .then(WaitFrames::new(1))
//!     .then(from_fn("fire", |_tick: &TickInfo| Ok(Step::Done)));
//!
//! let mut tick = TickInfo::default();
//! let mut resumptions = 1;
//! while seq.step(&tick).unwrap() == Step::Continue {
//!     tick.frame += 1;
//!     resumptions += 1;
//! }
//! assert_eq!(resumptions, 3);
//! ```

use std::collections::VecDeque;

use swervekit_types::SwerveError;

/// Outcome of one resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Not finished; resume on the next phase invocation.
    Continue,
    /// Finished; the scheduler drops the task after this step.
    Done,
}

/// Snapshot of the scheduler clock handed to every step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInfo {
    /// Number of ticks since the last clock reset.
    pub frame: u64,
    /// Seconds between the previous tick and this one.
    pub dt: f64,
    /// Host time of this tick, in seconds.
    pub now: f64,
    /// Seconds since the last clock reset.
    pub elapsed: f64,
}

/// A suspendable unit of scheduled work.
pub trait Task {
    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        "task"
    }

    /// Advance by one step.
    ///
    /// # Errors
    ///
    /// An error is logged by the scheduler and treated as [`Step::Continue`];
    /// the task is resumed again on the next tick.
    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError>;
}

impl Task for Box<dyn Task> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        self.as_mut().step(tick)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure tasks
// ─────────────────────────────────────────────────────────────────────────────

/// A task whose body is a closure.  Built with [`from_fn`].
pub struct FnTask<F> {
    name: String,
    body: F,
}

/// Wrap a closure as a named [`Task`].
pub fn from_fn<F>(name: impl Into<String>, body: F) -> FnTask<F>
where
    F: FnMut(&TickInfo) -> Result<Step, SwerveError>,
{
    FnTask {
        name: name.into(),
        body,
    }
}

impl<F> Task for FnTask<F>
where
    F: FnMut(&TickInfo) -> Result<Step, SwerveError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        (self.body)(tick)
    }
}

/// A task that runs `body` every tick and never finishes on its own.
pub fn forever<F>(
    name: impl Into<String>,
    mut body: F,
) -> FnTask<impl FnMut(&TickInfo) -> Result<Step, SwerveError>>
where
    F: FnMut(&TickInfo) -> Result<(), SwerveError>,
{
    from_fn(name, move |tick: &TickInfo| {
        body(tick)?;
        Ok(Step::Continue)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Waits
// ─────────────────────────────────────────────────────────────────────────────

/// Yields until more than `frames` ticks have passed since its first step.
pub struct WaitFrames {
    frames: u64,
    start: Option<u64>,
}

impl WaitFrames {
    pub fn new(frames: u64) -> Self {
        Self { frames, start: None }
    }
}

impl Task for WaitFrames {
    fn name(&self) -> &str {
        "wait_frames"
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        let start = *self.start.get_or_insert(tick.frame);
        if tick.frame.saturating_sub(start) <= self.frames {
            Ok(Step::Continue)
        } else {
            Ok(Step::Done)
        }
    }
}

/// Yields until more than `seconds` have passed since its first step.
pub struct WaitSeconds {
    seconds: f64,
    start: Option<f64>,
}

impl WaitSeconds {
    pub fn new(seconds: f64) -> Self {
        Self { seconds, start: None }
    }
}

impl Task for WaitSeconds {
    fn name(&self) -> &str {
        "wait_seconds"
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        let start = *self.start.get_or_insert(tick.now);
        if tick.now - start <= self.seconds {
            Ok(Step::Continue)
        } else {
            Ok(Step::Done)
        }
    }
}

/// Polls `condition` every tick and finishes once it returns `true`.
pub struct WaitUntil<F> {
    name: String,
    condition: F,
}

impl<F: FnMut() -> bool> WaitUntil<F> {
    pub fn new(name: impl Into<String>, condition: F) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }
}

impl<F: FnMut() -> bool> Task for WaitUntil<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, _tick: &TickInfo) -> Result<Step, SwerveError> {
        if (self.condition)() {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chain
// ─────────────────────────────────────────────────────────────────────────────

/// Runs sub-tasks in order.
///
/// When a child reports `Done`, the next child is stepped within the same
/// resumption, so a chain of instantly-finishing children completes in one
/// step.  An empty chain is done immediately.  A child error is propagated
/// unchanged and the same child is resumed on the next step.
pub struct Chain {
    name: String,
    children: VecDeque<Box<dyn Task>>,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: VecDeque::new(),
        }
    }

    /// Append a child to run after the current ones.
    pub fn then(mut self, child: impl Task + 'static) -> Self {
        self.children.push_back(Box::new(child));
        self
    }

    /// Number of children that have not finished yet.
    pub fn remaining(&self) -> usize {
        self.children.len()
    }
}

impl Task for Chain {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        while let Some(child) = self.children.front_mut() {
            match child.step(tick)? {
                Step::Continue => return Ok(Step::Continue),
                Step::Done => {
                    self.children.pop_front();
                }
            }
        }
        Ok(Step::Done)
    }
}
