//! `DriveActuator` trait for any motor driven by a normalized output.
//!
//! Both the wheel drive motor and the steering motor of a swerve module are
//! driven through this trait, so vendor motor controllers can be swapped
//! without touching kinematics code.

use swervekit_types::SwerveError;

/// A motor commanded with a normalized output in `[-1, 1]`.
pub trait DriveActuator {
    /// Stable identifier for this motor, e.g. `"front_left.drive"`.
    fn id(&self) -> &str;

    /// Command the motor.  Callers clamp `value` to `[-1, 1]` before calling.
    ///
    /// # Errors
    ///
    /// Returns [`SwerveError::HardwareFault`] if the command cannot be applied
    /// (e.g. the controller dropped off the CAN bus).
    fn set(&mut self, value: f64) -> Result<(), SwerveError>;

    /// Current normalized velocity/voltage feedback.
    fn get(&self) -> f64;
}
