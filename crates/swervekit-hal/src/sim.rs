//! In-process simulated hardware for CI and the simulator binary.
//!
//! Every sim device is a cheap, cloneable handle over shared cells: hand one
//! clone to the swerve engine as a boxed capability and keep another to
//! inspect or script it from the test or the host loop.  Everything runs on
//! the control thread, so the cells are plain `Rc<Cell<_>>`.
//!
//! # Example
//!
//! ```rust
//! use swervekit_hal::sim::SimModuleRig;
//! use swervekit_hal::DriveActuator;
//!
//! let rig = SimModuleRig::new("front_left", 1.0);
//! let mut steer = rig.steer.clone();
//! steer.set(0.5).unwrap();
//! rig.integrate(0.1); // 0.5 * 1.0 rev/s * 0.1 s
//! assert!((rig.encoder.position() - 0.05).abs() < 1e-12);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use swervekit_types::{SwerveError, repeat};
use tracing::trace;

use crate::actuator::DriveActuator;
use crate::encoder::SteeringEncoder;
use crate::imu::Imu;
use crate::input::{Input, InputValue};

// ────────────────────────────────────────────────────────────────────────────
// Motor
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motor that records the last commanded output.
#[derive(Clone)]
pub struct SimMotor {
    id: Rc<str>,
    output: Rc<Cell<f64>>,
    faulted: Rc<Cell<bool>>,
}

impl SimMotor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Rc::from(id.into()),
            output: Rc::new(Cell::new(0.0)),
            faulted: Rc::new(Cell::new(false)),
        }
    }

    /// Last commanded output.
    pub fn output(&self) -> f64 {
        self.output.get()
    }

    /// While faulted every `set` call fails with a hardware fault.
    pub fn set_faulted(&self, faulted: bool) {
        self.faulted.set(faulted);
    }
}

impl DriveActuator for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set(&mut self, value: f64) -> Result<(), SwerveError> {
        if self.faulted.get() {
            return Err(SwerveError::hardware(self.id.as_ref(), "simulated fault"));
        }
        self.output.set(value.clamp(-1.0, 1.0));
        Ok(())
    }

    fn get(&self) -> f64 {
        self.output.get()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Encoder
// ────────────────────────────────────────────────────────────────────────────

/// A simulated absolute encoder.  The stored position is unbounded; readings
/// wrap into `[0, 1)`.
#[derive(Clone)]
pub struct SimEncoder {
    id: Rc<str>,
    position: Rc<Cell<f64>>,
}

impl SimEncoder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Rc::from(id.into()),
            position: Rc::new(Cell::new(0.0)),
        }
    }

    /// Unwrapped position in turns.
    pub fn position(&self) -> f64 {
        self.position.get()
    }

    pub fn set_position(&self, turns: f64) {
        self.position.set(turns);
    }

    /// Place the encoder so its reading corresponds to `angle` radians.
    pub fn set_angle(&self, angle: f64) {
        self.position.set(repeat(angle / std::f64::consts::TAU, 1.0));
    }
}

impl SteeringEncoder for SimEncoder {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self) -> f64 {
        repeat(self.position.get(), 1.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// IMU
// ────────────────────────────────────────────────────────────────────────────

/// A simulated gyro reporting an unbounded angle in degrees.
#[derive(Clone)]
pub struct SimImu {
    angle_deg: Rc<Cell<f64>>,
}

impl SimImu {
    pub fn new() -> Self {
        Self {
            angle_deg: Rc::new(Cell::new(0.0)),
        }
    }

    pub fn set_angle(&self, degrees: f64) {
        self.angle_deg.set(degrees);
    }

    /// Accumulate `rate_deg_per_s * dt` degrees of yaw.
    pub fn integrate(&self, rate_deg_per_s: f64, dt: f64) {
        self.angle_deg.set(self.angle_deg.get() + rate_deg_per_s * dt);
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new()
    }
}

impl Imu for SimImu {
    fn id(&self) -> &str {
        "sim_imu"
    }

    fn get_angle(&self) -> f64 {
        self.angle_deg.get()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// A scripted operator input.
#[derive(Clone)]
pub struct SimInput {
    name: Rc<str>,
    value: Rc<Cell<InputValue>>,
}

impl SimInput {
    pub fn axis(name: impl Into<String>) -> Self {
        Self {
            name: Rc::from(name.into()),
            value: Rc::new(Cell::new(InputValue::Axis(0.0))),
        }
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self {
            name: Rc::from(name.into()),
            value: Rc::new(Cell::new(InputValue::Button(false))),
        }
    }

    pub fn set(&self, value: InputValue) {
        self.value.set(value);
    }

    pub fn set_axis(&self, value: f64) {
        self.value.set(InputValue::Axis(value));
    }
}

impl Input for SimInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> InputValue {
        self.value.get()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Module rig
// ────────────────────────────────────────────────────────────────────────────

/// The three devices of one swerve module, with a first-order steering model:
/// the steering motor output turns the encoder at `turn_rate` revolutions per
/// second at full output.
#[derive(Clone)]
pub struct SimModuleRig {
    pub drive: SimMotor,
    pub steer: SimMotor,
    pub encoder: SimEncoder,
    turn_rate: f64,
}

impl SimModuleRig {
    pub fn new(name: &str, turn_rate: f64) -> Self {
        Self {
            drive: SimMotor::new(format!("{name}.drive")),
            steer: SimMotor::new(format!("{name}.steer")),
            encoder: SimEncoder::new(format!("{name}.encoder")),
            turn_rate,
        }
    }

    /// Advance the steering model by `dt` seconds.
    pub fn integrate(&self, dt: f64) {
        let delta = self.steer.output() * self.turn_rate * dt;
        self.encoder.set_position(self.encoder.position() + delta);
        trace!(
            encoder = self.encoder.id(),
            position = self.encoder.position(),
            "sim steering integrated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_clamps_and_shares_state_between_clones() {
        let motor = SimMotor::new("fl.drive");
        let mut boxed: Box<dyn DriveActuator> = Box::new(motor.clone());
        boxed.set(3.0).unwrap();
        assert_eq!(motor.output(), 1.0);
        assert_eq!(boxed.id(), "fl.drive");
    }

    #[test]
    fn faulted_motor_rejects_commands() {
        let motor = SimMotor::new("fl.steer");
        motor.set_faulted(true);
        let mut handle = motor.clone();
        assert!(matches!(handle.set(0.2), Err(SwerveError::HardwareFault { .. })));
        assert_eq!(motor.output(), 0.0);
    }

    #[test]
    fn encoder_wraps_reading() {
        let enc = SimEncoder::new("fl.encoder");
        enc.set_position(2.25);
        assert!((enc.get() - 0.25).abs() < 1e-12);
        enc.set_angle(-std::f64::consts::FRAC_PI_2);
        assert!((enc.get() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn imu_integrates_rate() {
        let imu = SimImu::new();
        imu.integrate(90.0, 0.5);
        imu.integrate(90.0, 0.5);
        assert!((imu.get_angle() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn input_reports_scripted_value() {
        let input = SimInput::axis("drive_x");
        input.set_axis(-0.4);
        assert_eq!(input.get(), InputValue::Axis(-0.4));
        let button = SimInput::button("zero");
        button.set(InputValue::Button(true));
        assert!(button.get().as_button());
    }

    #[test]
    fn rig_steering_moves_encoder() {
        let rig = SimModuleRig::new("rr", 2.0);
        let mut steer = rig.steer.clone();
        steer.set(-0.5).unwrap();
        rig.integrate(0.1);
        assert!((rig.encoder.position() + 0.1).abs() < 1e-12);
        assert!((rig.encoder.get() - 0.9).abs() < 1e-12);
    }
}
