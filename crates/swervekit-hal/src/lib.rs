//! `swervekit-hal` – hardware capability seams.
//!
//! The swerve engine never touches vendor APIs.  It consumes the small traits
//! defined here, and drivers (or the simulator in [`sim`]) implement them.
//!
//! # Modules
//!
//! - [`actuator`] – [`DriveActuator`][actuator::DriveActuator]: normalized
//!   `[-1, 1]` motor output with velocity/voltage feedback.
//! - [`encoder`] – [`SteeringEncoder`][encoder::SteeringEncoder] and the
//!   calibrating [`OffsetEncoder`][encoder::OffsetEncoder].
//! - [`imu`] – [`Imu`][imu::Imu]: unbounded heading in degrees.
//! - [`input`] – [`Input`][input::Input]: one pre-normalized logical operator
//!   input (axis or button).
//! - [`pid`] – [`FeedbackController`][pid::FeedbackController] and the
//!   reference [`PidController`][pid::PidController].
//! - [`sim`] – in-process simulated hardware for tests and the simulator
//!   binary.

pub mod actuator;
pub mod encoder;
pub mod imu;
pub mod input;
pub mod pid;
pub mod sim;

pub use actuator::DriveActuator;
pub use encoder::{OffsetEncoder, SteeringEncoder};
pub use imu::Imu;
pub use input::{Input, InputValue};
pub use pid::{FeedbackController, PidController, PidGains};
