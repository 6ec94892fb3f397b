//! `swervekit-runtime` – cooperative, phase-ordered task execution.
//!
//! Everything here is single-threaded: the host calls into the runtime from
//! one periodic callback and tasks share state through `Rc`/`Cell`.
//!
//! # Modules
//!
//! - [`task`] – the [`Task`] trait plus the stock waits and [`Chain`].
//! - [`clock`] – frame counter and delta time owned by the scheduler.
//! - [`scheduler`] – [`Scheduler`] with its `Early`/`Normal`/`Late`/`Always`
//!   queues, [`TaskHandle`] and per-step fault isolation.
//! - [`rendezvous`] – [`ConcurrentEvent`], a one-shot broadcast that releases
//!   every waiter registered before it was set.
//! - [`period`] – [`Period`] bitflags for the robot's operating mode.
//! - [`autonomous`] – [`AutonomousManager`] running a [`Sequence`] with
//!   start and end hooks.
//! - [`robot`] – [`Robot`], the host driver that wires periods, the
//!   scheduler and [`Component`] hooks into one tick.
//! - [`telemetry`] – [`init_tracing`] for the `tracing` subscriber and
//!   optional OTLP export.

pub mod autonomous;
pub mod clock;
pub mod period;
pub mod rendezvous;
pub mod robot;
pub mod scheduler;
pub mod task;
pub mod telemetry;

pub use autonomous::{AutonomousManager, Sequence};
pub use clock::Clock;
pub use period::{Period, has_flag};
pub use rendezvous::{Block, BlockWait, ConcurrentEvent};
pub use robot::{Component, Robot};
pub use scheduler::{Order, Scheduler, TaskHandle};
pub use task::{
    Chain, FnTask, Step, Task, TickInfo, WaitFrames, WaitSeconds, WaitUntil, forever, from_fn,
};
pub use telemetry::{LogFormat, TelemetryConfig, TracerProviderGuard, init_tracing};
