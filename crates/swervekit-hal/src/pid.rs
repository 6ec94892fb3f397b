//! Feedback controller capability and a reference PID implementation.
//!
//! The swerve engine only depends on [`FeedbackController`]: it hands over an
//! error signal and the tick's `dt` and applies whatever comes back.
//! [`PidController`] is the default plug.
//!
//! # Example
//!
//! ```rust
//! use swervekit_hal::pid::{FeedbackController, PidController, PidGains};
//!
//! let mut pid = PidController::new(PidGains::new(1.0, 0.1, 0.05));
//! let output = pid.evaluate(0.5, 0.02); // error = 0.5, dt = 20 ms
//! assert!(output > 0.0);
//! ```

use serde::{Deserialize, Serialize};

/// Anything that turns an error signal into a corrective output.
pub trait FeedbackController {
    /// Compute the next output for `error`, `dt` seconds after the previous
    /// call.
    fn evaluate(&mut self, error: f64, dt: f64) -> f64;

    /// Forget accumulated state.
    fn reset(&mut self) {}
}

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

/// A tunable error-driven PID controller.
///
/// Output is unclamped by default; use [`PidController::with_output_limits`]
/// to bound it (the integral contribution is clamped to the same range).
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral: f64,
    last_error: Option<f64>,
    output_min: f64,
    output_max: f64,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: None,
            output_min: f64::NEG_INFINITY,
            output_max: f64::INFINITY,
        }
    }

    /// Clamp the controller output to `[min, max]`.
    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }
}

impl FeedbackController for PidController {
    /// Returns the clamped control output.
    ///
    /// A non-positive `dt` (the first tick after a clock reset) yields the
    /// proportional term only and leaves integral and derivative memory
    /// untouched.
    fn evaluate(&mut self, error: f64, dt: f64) -> f64 {
        let p = self.gains.kp * error;
        if dt <= 0.0 || !dt.is_finite() {
            return p.clamp(self.output_min, self.output_max);
        }

        self.integral += error * dt;
        let i = (self.gains.ki * self.integral).clamp(self.output_min, self.output_max);
        // Back-calculate so the accumulator cannot wind up past the limits.
        if self.gains.ki.abs() > f64::EPSILON {
            self.integral = i / self.gains.ki;
        }

        let d = match self.last_error {
            Some(prev) => self.gains.kd * (error - prev) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        (p + i + d).clamp(self.output_min, self.output_max)
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }
}
