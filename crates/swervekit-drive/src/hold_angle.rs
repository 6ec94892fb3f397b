//! [`SwerveHoldAngle`] – closed-loop heading hold layered on a [`SwerveDrive`].
//!
//! The controller owns one `Late` task.  While [`HoldState::Running`] it
//! compares the drive's heading with the hold target and injects the feedback
//! output as a horizontal axis override; while [`HoldState::Stopped`] it idles.
//! The task never finishes by itself, so the owner cancels it via
//! [`SwerveHoldAngle::cancel`] when the hold is no longer wanted.
//!
//! [`SwerveDrive`]: crate::drive::SwerveDrive

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use swervekit_hal::FeedbackController;
use swervekit_runtime::{
    Block, Chain, Order, Scheduler, Step, TaskHandle, TickInfo, forever, from_fn,
};
use swervekit_types::{SwerveError, Vector2, normalize_angle};
use tracing::debug;

use crate::drive::DriveHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
    Running,
    #[default]
    Stopped,
}

struct HoldShared {
    state: Cell<HoldState>,
    target: Cell<f64>,
    last_output: Cell<f64>,
    controller: RefCell<Box<dyn FeedbackController>>,
}

impl HoldShared {
    fn set_state(&self, state: HoldState) {
        if self.state.replace(state) != state {
            debug!(?state, heading = self.target.get(), "hold angle state changed");
            if state == HoldState::Stopped {
                self.controller.borrow_mut().reset();
                self.last_output.set(0.0);
            }
        }
    }

    fn step(&self, drive: &DriveHandle, tick: &TickInfo) {
        if self.state.get() != HoldState::Running {
            return;
        }
        let current = Vector2::from_angle(drive.get_heading());
        let error = current.dot(Vector2::from_angle(self.target.get()));
        let output = self.controller.borrow_mut().evaluate(error, tick.dt);
        self.last_output.set(output);
        drive.override_axes(Some(output), None, None);
    }
}

pub struct SwerveHoldAngle {
    drive: DriveHandle,
    shared: Rc<HoldShared>,
    task: Option<TaskHandle>,
}

impl SwerveHoldAngle {
    /// A stopped hold controller targeting heading `0`.
    pub fn new(drive: DriveHandle, controller: Box<dyn FeedbackController>) -> Self {
        Self {
            drive,
            shared: Rc::new(HoldShared {
                state: Cell::new(HoldState::Stopped),
                target: Cell::new(0.0),
                last_output: Cell::new(0.0),
                controller: RefCell::new(controller),
            }),
            task: None,
        }
    }

    pub fn state(&self) -> HoldState {
        self.shared.state.get()
    }

    pub fn set_state(&self, state: HoldState) {
        self.shared.set_state(state);
    }

    pub fn run(&self) {
        self.set_state(HoldState::Running);
    }

    /// Stop holding and forget the controller's accumulated state.
    pub fn stop(&self) {
        self.set_state(HoldState::Stopped);
    }

    pub fn target(&self) -> f64 {
        self.shared.target.get()
    }

    pub fn set_target(&self, heading: f64) {
        self.shared.target.set(normalize_angle(heading));
    }

    /// Hold whatever heading the drive reports right now.
    pub fn hold_current_heading(&self) {
        self.set_target(self.drive.get_heading());
    }

    /// Controller output from the last running step.
    pub fn last_output(&self) -> f64 {
        self.shared.last_output.get()
    }

    /// Install the hold task in `Late`, unless it is already live.
    ///
    /// Tasks in a phase run in registration order.  Start the hold before
    /// the drive first installs its control task (for example from a
    /// component's mode init, ahead of the drive in component order) and
    /// each correction reaches the modules in the same tick.  Started later,
    /// the hold runs after the control step and every correction applies one
    /// tick late.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> TaskHandle {
        let shared = self.shared.clone();
        let drive = self.drive.clone();
        let handle = scheduler.restart_if_finished(
            self.task.take(),
            move || {
                forever("swerve_hold_angle", move |tick: &TickInfo| {
                    shared.step(&drive, tick);
                    Ok(())
                })
            },
            Order::Late,
        );
        self.task = Some(handle.clone());
        handle
    }

    /// Remove the hold task.  A task that already ended (for example through
    /// `stop_all`) is not an error.
    pub fn cancel(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        match self.task.take() {
            Some(handle) if !handle.is_done() => scheduler.cancel(&handle),
            _ => Ok(()),
        }
    }

    pub fn task(&self) -> Option<&TaskHandle> {
        self.task.as_ref()
    }

    /// Switch to [`HoldState::Running`] once `block` is released.
    ///
    /// Schedules a `Normal` task that waits on the block, so the state flips
    /// during the `Normal` phase of the tick the event is observed in.
    pub fn arm_on(&self, scheduler: &mut Scheduler, block: &Block) -> TaskHandle {
        let shared = self.shared.clone();
        let arm = Chain::new("swerve_hold_angle_arm")
            .then(block.wait_task())
            .then(from_fn("hold_angle_run", move |_tick: &TickInfo| {
                shared.set_state(HoldState::Running);
                Ok(Step::Done)
            }));
        scheduler.schedule(arm, Order::Normal)
    }
}
