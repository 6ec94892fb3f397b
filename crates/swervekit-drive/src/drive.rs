//! [`SwerveDrive`] – heading reference, drive frame and the per-tick control
//! task for a set of [`SwerveModule`]s.
//!
//! The drive state lives behind a shared core so that other subsystems (the
//! heading-hold controller, calibration buttons, the host) can reach it
//! through a cloneable [`DriveHandle`] while the control task owns nothing but
//! another handle.
//!
//! # Tick contract
//!
//! [`SwerveDrive::update`] runs once per tick before the `Late` phase.  It
//! (re)installs the control task in `Late` and adds the latest operator input
//! to the command accumulators.  The control task then consumes the
//! accumulators, applies any pending axis overrides, rotates the translation
//! into the robot frame when field-centric, and updates every module.
//!
//! # Example
//!
//! ```rust
//! use swervekit_drive::SwerveDrive;
//! use swervekit_hal::sim::SimImu;
//!
//! let imu = SimImu::new();
//! let drive = SwerveDrive::new(Vec::new(), Box::new(imu.clone()));
//! imu.set_angle(370.0);
//! assert!((drive.get_heading() - 10f64.to_radians()).abs() < 1e-9);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use swervekit_hal::{Imu, Input};
use swervekit_runtime::{Component, Order, Scheduler, TaskHandle, TickInfo, forever};
use swervekit_types::{SwerveError, Vector2, normalize_angle, shortest_signed_delta};
use tracing::{info, warn};

use crate::module::{ModuleOutput, SwerveModule};

// ─────────────────────────────────────────────────────────────────────────────
// Public types
// ─────────────────────────────────────────────────────────────────────────────

/// Frame in which translation commands are expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Relative to the field; rotated by the current heading.
    #[default]
    FieldCentric,
    /// Relative to the robot.
    RobotCentric,
}

/// Per-axis replacements applied to the next control step only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisOverride {
    pub horizontal: Option<f64>,
    pub vertical: Option<f64>,
    pub rotation: Option<f64>,
}

impl AxisOverride {
    fn merge(&mut self, other: AxisOverride) {
        if other.horizontal.is_some() {
            self.horizontal = other.horizontal;
        }
        if other.vertical.is_some() {
            self.vertical = other.vertical;
        }
        if other.rotation.is_some() {
            self.rotation = other.rotation;
        }
    }
}

/// Operator inputs sampled by [`SwerveDrive::update`].
pub struct DriveInputs {
    pub horizontal: Box<dyn Input>,
    pub vertical: Box<dyn Input>,
    pub rotation: Box<dyn Input>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared core
// ─────────────────────────────────────────────────────────────────────────────

struct DriveCore {
    modules: Vec<SwerveModule>,
    imu: Box<dyn Imu>,
    /// Radians.
    imu_offset: f64,
    heading_offset: f64,
    drive_mode: DriveMode,
    translation: Vector2,
    rotation: f64,
    overrides: AxisOverride,
    outputs: Vec<ModuleOutput>,
}

impl DriveCore {
    fn heading(&self) -> f64 {
        normalize_angle(self.imu.get_angle().to_radians() - self.imu_offset - self.heading_offset)
    }

    fn set_current_heading(&mut self, target: f64) {
        self.heading_offset -= shortest_signed_delta(self.heading(), target);
    }

    /// Consume the accumulated command and drive every module once.
    ///
    /// Every module is updated even when an earlier one fails; the first
    /// failure is returned.
    fn control_step(&mut self, tick: &TickInfo) -> Result<(), SwerveError> {
        let overrides = std::mem::take(&mut self.overrides);
        let mut translation = std::mem::replace(&mut self.translation, Vector2::zero());
        let mut rotation = std::mem::replace(&mut self.rotation, 0.0);

        if let Some(h) = overrides.horizontal {
            translation.x = h;
        }
        if let Some(v) = overrides.vertical {
            translation.y = v;
        }
        if let Some(r) = overrides.rotation {
            rotation = r;
        }

        if self.drive_mode == DriveMode::FieldCentric {
            translation = translation.rotate(-self.heading());
        }

        let mut first_error = None;
        self.outputs.clear();
        for module in &mut self.modules {
            match module.update(translation, rotation, tick) {
                Ok(output) => self.outputs.push(output),
                Err(e) => {
                    warn!(module = module.name(), error = %e, "module update failed");
                    self.outputs.push(ModuleOutput::default());
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DriveHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable access to a [`SwerveDrive`]'s heading, frame and command.
#[derive(Clone)]
pub struct DriveHandle {
    core: Rc<RefCell<DriveCore>>,
}

impl DriveHandle {
    /// Robot heading in `(-π, π]`.
    pub fn get_heading(&self) -> f64 {
        self.core.borrow().heading()
    }

    /// Shift the heading offset so that [`get_heading`][Self::get_heading]
    /// reports `target` right away.  Uses the shortest angular delta, so
    /// targets near ±π do not jump.
    pub fn set_current_heading(&self, target: f64) {
        let mut core = self.core.borrow_mut();
        core.set_current_heading(target);
        info!(heading = target, heading_offset = core.heading_offset, "heading set");
    }

    pub fn zero_heading(&self) {
        self.set_current_heading(0.0);
    }

    pub fn heading_offset(&self) -> f64 {
        self.core.borrow().heading_offset
    }

    /// Replace individual command axes for the next control step only.
    /// `None` leaves that axis as commanded.  Repeated calls within one tick
    /// merge, the latest value per axis winning.
    pub fn override_axes(
        &self,
        horizontal: Option<f64>,
        vertical: Option<f64>,
        rotation: Option<f64>,
    ) {
        self.core.borrow_mut().overrides.merge(AxisOverride {
            horizontal,
            vertical,
            rotation,
        });
    }

    /// Overrides waiting for the next control step.
    pub fn pending_overrides(&self) -> AxisOverride {
        self.core.borrow().overrides
    }

    /// Add to this tick's command.  Contributions accumulate until the
    /// control task consumes them.
    pub fn drive(&self, translation: Vector2, rotation: f64) {
        let mut core = self.core.borrow_mut();
        core.translation += translation;
        core.rotation += rotation;
    }

    pub fn drive_mode(&self) -> DriveMode {
        self.core.borrow().drive_mode
    }

    pub fn set_drive_mode(&self, mode: DriveMode) {
        self.core.borrow_mut().drive_mode = mode;
    }

    /// Module outputs from the most recent control step, in module order.
    pub fn module_outputs(&self) -> Vec<ModuleOutput> {
        self.core.borrow().outputs.clone()
    }

    pub fn module_count(&self) -> usize {
        self.core.borrow().modules.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SwerveDrive
// ─────────────────────────────────────────────────────────────────────────────

pub struct SwerveDrive {
    handle: DriveHandle,
    inputs: Option<DriveInputs>,
    control: Option<TaskHandle>,
}

impl SwerveDrive {
    pub fn new(modules: Vec<SwerveModule>, imu: Box<dyn Imu>) -> Self {
        let outputs = Vec::with_capacity(modules.len());
        Self {
            handle: DriveHandle {
                core: Rc::new(RefCell::new(DriveCore {
                    modules,
                    imu,
                    imu_offset: 0.0,
                    heading_offset: 0.0,
                    drive_mode: DriveMode::default(),
                    translation: Vector2::zero(),
                    rotation: 0.0,
                    overrides: AxisOverride::default(),
                    outputs,
                })),
            },
            inputs: None,
            control: None,
        }
    }

    pub fn with_inputs(mut self, inputs: DriveInputs) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_mode(self, mode: DriveMode) -> Self {
        self.handle.set_drive_mode(mode);
        self
    }

    /// Fixed mounting offset of the IMU, in degrees.
    pub fn with_imu_offset_degrees(self, degrees: f64) -> Self {
        self.handle.core.borrow_mut().imu_offset = degrees.to_radians();
        self
    }

    pub fn handle(&self) -> DriveHandle {
        self.handle.clone()
    }

    /// Handle of the installed control task, if any.
    pub fn control_task(&self) -> Option<&TaskHandle> {
        self.control.as_ref()
    }

    /// Per-tick entry point: keep the control task installed and sample the
    /// operator inputs.
    pub fn update(&mut self, scheduler: &mut Scheduler) {
        let core = self.handle.core.clone();
        self.control = Some(scheduler.restart_if_finished(
            self.control.take(),
            move || {
                forever("swerve_drive_control", move |tick: &TickInfo| {
                    core.borrow_mut().control_step(tick)
                })
            },
            Order::Late,
        ));

        if let Some(inputs) = &self.inputs {
            let translation = Vector2::new(
                inputs.horizontal.get().as_axis(),
                inputs.vertical.get().as_axis(),
            );
            self.handle.drive(translation, inputs.rotation.get().as_axis());
        }
    }

    pub fn get_heading(&self) -> f64 {
        self.handle.get_heading()
    }

    pub fn set_current_heading(&self, target: f64) {
        self.handle.set_current_heading(target);
    }

    pub fn zero_heading(&self) {
        self.handle.zero_heading();
    }

    pub fn override_axes(
        &self,
        horizontal: Option<f64>,
        vertical: Option<f64>,
        rotation: Option<f64>,
    ) {
        self.handle.override_axes(horizontal, vertical, rotation);
    }
}

impl Component for SwerveDrive {
    /// Drop commands, overrides and flip state left over from before the
    /// mode change.  Flip ticks are only meaningful against the clock that
    /// recorded them, and enabling restarts it.
    fn init(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        let mut core = self.handle.core.borrow_mut();
        core.translation = Vector2::zero();
        core.rotation = 0.0;
        core.overrides = AxisOverride::default();
        for module in &mut core.modules {
            module.reset_flip_state();
        }
        Ok(())
    }

    fn update(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        SwerveDrive::update(self, scheduler);
        Ok(())
    }
}
