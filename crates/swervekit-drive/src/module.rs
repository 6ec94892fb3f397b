//! [`SwerveModule`] – kinematics and flip minimization for one wheel.
//!
//! Each tick the module turns the robot-frame command (translation plus
//! rotation) into a wheel vector, projects it onto the wheel's current
//! steering direction and writes a drive output and a steering output.
//!
//! Rather than ever steering more than 90°, the module may *flip*: drive
//! backwards and aim the opposite way.  Flips are rate-limited by
//! [`ModuleTuning::flip_hysteresis_ticks`] so a target hovering near ±90°
//! does not make the wheel chatter.
//!
//! Angles are radians with 0 along the robot's +x axis.  A positive rotation
//! command moves each wheel along `(y, -x)` of its mount position.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use swervekit_hal::{DriveActuator, FeedbackController, OffsetEncoder, SteeringEncoder};
use swervekit_runtime::TickInfo;
use swervekit_types::{SwerveError, Vector2, normalize_angle};
use tracing::{debug, trace};

/// Kinematic tunables shared by every module of a drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleTuning {
    /// Minimum number of ticks between two flips.
    pub flip_hysteresis_ticks: u64,
    /// Command magnitudes below this are treated as "stop".
    pub zero_epsilon: f64,
}

impl Default for ModuleTuning {
    fn default() -> Self {
        Self {
            flip_hysteresis_ticks: 5,
            zero_epsilon: 1e-3,
        }
    }
}

/// The devices one module drives.
pub struct ModuleHardware {
    pub drive: Box<dyn DriveActuator>,
    pub steer: Box<dyn DriveActuator>,
    pub encoder: OffsetEncoder,
}

/// What a module commanded on its last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModuleOutput {
    /// Signed drive output in `[-1, 1]`.
    pub drive: f64,
    /// Lateral error fed to the steering controller.
    pub steering_error: f64,
    /// Steering motor output in `[-1, 1]`.
    pub steering_command: f64,
    /// Direction the wheel is being steered towards, after any flip.
    pub target_angle: f64,
    /// `true` when this update flipped the wheel.
    pub flipped: bool,
}

pub struct SwerveModule {
    name: String,
    position: Vector2,
    rotation_vector: Vector2,
    hardware: ModuleHardware,
    steering: Box<dyn FeedbackController>,
    tuning: ModuleTuning,
    target_vector: Vector2,
    last_flip_sign: f64,
    last_flip_tick: u64,
}

impl SwerveModule {
    /// Build a module mounted at `position` (robot frame, any unit).
    ///
    /// # Errors
    ///
    /// [`SwerveError::InvalidModulePosition`] if `position` is zero or not
    /// finite, since no rotation direction can be derived from it.
    pub fn new(
        name: impl Into<String>,
        position: Vector2,
        hardware: ModuleHardware,
        steering: Box<dyn FeedbackController>,
    ) -> Result<Self, SwerveError> {
        let rotation_vector = if position.is_finite() {
            Vector2::new(position.y, -position.x).normalized()
        } else {
            None
        }
        .ok_or(SwerveError::InvalidModulePosition {
            x: position.x,
            y: position.y,
        })?;

        Ok(Self {
            name: name.into(),
            position,
            rotation_vector,
            hardware,
            steering,
            tuning: ModuleTuning::default(),
            target_vector: Vector2::zero(),
            last_flip_sign: 1.0,
            last_flip_tick: 0,
        })
    }

    pub fn with_tuning(mut self, tuning: ModuleTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    /// Unit direction this wheel moves in for a positive rotation command.
    pub fn rotation_vector(&self) -> Vector2 {
        self.rotation_vector
    }

    /// Combined command vector from the last update, before normalization.
    pub fn target_vector(&self) -> Vector2 {
        self.target_vector
    }

    /// `1.0` or `-1.0`: whether the wheel currently runs flipped.
    pub fn flip_sign(&self) -> f64 {
        self.last_flip_sign
    }

    pub fn last_flip_tick(&self) -> u64 {
        self.last_flip_tick
    }

    /// Forget any flip and the steering controller's memory.
    ///
    /// Call whenever the tick counter restarts, e.g. on enable.
    pub fn reset_flip_state(&mut self) {
        self.last_flip_sign = 1.0;
        self.last_flip_tick = 0;
        self.steering.reset();
    }

    /// Current steering angle in `(-π, π]`, from the calibrated encoder.
    pub fn steering_angle(&self) -> f64 {
        normalize_angle(self.hardware.encoder.get() * TAU)
    }

    /// Command the wheel for one tick.
    ///
    /// # Errors
    ///
    /// Propagates actuator faults.  Flip state is updated before the
    /// actuators are written, so a fault does not desynchronize it.
    pub fn update(
        &mut self,
        translation: Vector2,
        rotation: f64,
        tick: &TickInfo,
    ) -> Result<ModuleOutput, SwerveError> {
        self.target_vector = translation + self.rotation_vector * rotation;
        let magnitude = self.target_vector.magnitude();

        if magnitude.is_nan() || magnitude < self.tuning.zero_epsilon {
            self.reset_flip_state();
            self.hardware.drive.set(0.0)?;
            self.hardware.steer.set(0.0)?;
            return Ok(ModuleOutput {
                target_angle: self.steering_angle(),
                ..ModuleOutput::default()
            });
        }

        let sign = self.last_flip_sign;
        let target = self.target_vector * (sign / magnitude);
        let mut drive = magnitude.min(1.0) * sign;

        let forward = Vector2::from_angle(self.steering_angle());
        let left = forward.left_perpendicular();
        let forward_dot = forward.dot(target);
        let mut left_dot = left.dot(target);

        // A flip tick ahead of the clock belongs to a previous clock epoch.
        let hysteresis_elapsed = match tick.frame.checked_sub(self.last_flip_tick) {
            Some(since_flip) => since_flip >= self.tuning.flip_hysteresis_ticks,
            None => true,
        };
        let flipped = forward_dot < 0.0 && hysteresis_elapsed;
        let target_angle = if flipped {
            drive = -drive;
            left_dot = -left_dot;
            self.last_flip_sign = -sign;
            self.last_flip_tick = tick.frame;
            debug!(
                module = %self.name,
                frame = tick.frame,
                sign = self.last_flip_sign,
                "module flipped"
            );
            (-target).angle()
        } else {
            target.angle()
        };

        let steering_command = self.steering.evaluate(left_dot, tick.dt).clamp(-1.0, 1.0);
        let drive = drive.clamp(-1.0, 1.0);
        self.hardware.drive.set(drive)?;
        self.hardware.steer.set(steering_command)?;

        trace!(
            module = %self.name,
            drive,
            steering_command,
            forward_dot,
            left_dot,
            "module update"
        );

        Ok(ModuleOutput {
            drive,
            steering_error: left_dot,
            steering_command,
            target_angle,
            flipped,
        })
    }
}
