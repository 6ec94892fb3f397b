//! Scripted operator: plays a fixed input pattern and exercises heading hold.
//!
//! The pattern runs as an autonomous [`Sequence`] lasting one 10 s cycle and
//! is restarted whenever it finishes:
//!
//! | time | command |
//! |---|---|
//! | 0–2 s | drive forward |
//! | 2–4 s | strafe left while turning |
//! | 4–6 s | turn in place |
//! | 6–8 s | drive diagonally while holding the current heading |
//! | 8–10 s | idle |

use std::cell::Cell;
use std::rc::Rc;

use swervekit_drive::{DriveHandle, SwerveHoldAngle};
use swervekit_hal::sim::SimInput;
use swervekit_runtime::{
    AutonomousManager, Component, ConcurrentEvent, Scheduler, Sequence, Step, TickInfo,
};
use swervekit_types::SwerveError;
use tracing::info;

const CYCLE_S: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Forward,
    StrafeAndTurn,
    Turn,
    Hold,
    Idle,
}

impl Segment {
    pub fn at(elapsed: f64) -> Self {
        match elapsed.rem_euclid(CYCLE_S) {
            t if t < 2.0 => Segment::Forward,
            t if t < 4.0 => Segment::StrafeAndTurn,
            t if t < 6.0 => Segment::Turn,
            t if t < 8.0 => Segment::Hold,
            _ => Segment::Idle,
        }
    }

    /// `(horizontal, vertical, rotation)` for this segment.
    pub fn command(self) -> (f64, f64, f64) {
        match self {
            Segment::Forward => (0.6, 0.0, 0.0),
            Segment::StrafeAndTurn => (0.0, 0.5, 0.3),
            Segment::Turn => (0.0, 0.0, 0.5),
            Segment::Hold => (0.4, 0.4, 0.0),
            Segment::Idle => (0.0, 0.0, 0.0),
        }
    }
}

/// The simulated joystick axes the drive samples.
#[derive(Clone)]
pub struct SimSticks {
    pub horizontal: SimInput,
    pub vertical: SimInput,
    pub rotation: SimInput,
}

impl SimSticks {
    fn apply(&self, (h, v, r): (f64, f64, f64)) {
        self.horizontal.set_axis(h);
        self.vertical.set_axis(v);
        self.rotation.set_axis(r);
    }
}

/// One cycle of the input pattern.  Publishes the active segment so the
/// operator can react to it.
pub struct Pattern {
    sticks: SimSticks,
    segment: Rc<Cell<Segment>>,
    start: f64,
}

impl Sequence for Pattern {
    fn name(&self) -> &str {
        "drive_pattern"
    }

    fn on_start(&mut self, tick: &TickInfo) {
        self.start = tick.elapsed;
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        let t = tick.elapsed - self.start;
        if t >= CYCLE_S {
            return Ok(Step::Done);
        }
        let segment = Segment::at(t);
        self.sticks.apply(segment.command());
        self.segment.set(segment);
        Ok(Step::Continue)
    }

    fn on_end(&mut self) {
        self.sticks.apply(Segment::Idle.command());
        self.segment.set(Segment::Idle);
    }
}

pub struct Operator {
    drive: DriveHandle,
    hold: SwerveHoldAngle,
    sticks: SimSticks,
    segment: Rc<Cell<Segment>>,
    autos: AutonomousManager,
    hold_request: ConcurrentEvent,
    holding: bool,
}

impl Operator {
    pub fn new(drive: DriveHandle, hold: SwerveHoldAngle, sticks: SimSticks) -> Self {
        Self {
            drive,
            hold,
            sticks,
            segment: Rc::new(Cell::new(Segment::Idle)),
            autos: AutonomousManager::new(),
            hold_request: ConcurrentEvent::new(),
            holding: false,
        }
    }

    fn start_pattern(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        let pattern = Pattern {
            sticks: self.sticks.clone(),
            segment: self.segment.clone(),
            start: 0.0,
        };
        self.autos.start_auto(scheduler, Box::new(pattern))?;
        Ok(())
    }

    fn arm_hold(&mut self, scheduler: &mut Scheduler) {
        self.hold.stop();
        self.hold.arm_on(scheduler, &self.hold_request.create_block());
        self.holding = false;
    }

    fn begin(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        // A pattern cut off by the last disable still owes its end hook.
        self.autos.end_auto(scheduler)?;
        self.drive.zero_heading();
        self.hold.start(scheduler);
        self.arm_hold(scheduler);
        self.start_pattern(scheduler)
    }
}

impl Component for Operator {
    fn init_auto(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        self.begin(scheduler)
    }

    fn init_teleop(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        self.begin(scheduler)
    }

    fn update(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        if self.autos.task().is_some_and(|task| task.is_done()) {
            self.start_pattern(scheduler)?;
        }

        match self.segment.get() {
            Segment::Hold if !self.holding => {
                self.hold.hold_current_heading();
                self.hold_request.set();
                self.holding = true;
                info!(heading = self.hold.target(), "heading hold requested");
            }
            Segment::Idle if self.holding => {
                self.arm_hold(scheduler);
                info!("heading hold released");
            }
            _ => {}
        }
        Ok(())
    }
}
