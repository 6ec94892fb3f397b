//! `swervekit-drive` – swerve kinematics and heading control.
//!
//! # Modules
//!
//! - [`module`] – [`SwerveModule`]: per-wheel inverse kinematics with
//!   rate-limited flip minimization.
//! - [`drive`] – [`SwerveDrive`]: heading reference, field/robot-centric
//!   frame, command accumulation and the `Late` control task.
//! - [`hold_angle`] – [`SwerveHoldAngle`]: heading-hold controller feeding
//!   axis overrides into the drive.

pub mod drive;
pub mod hold_angle;
pub mod module;

pub use drive::{AxisOverride, DriveHandle, DriveInputs, DriveMode, SwerveDrive};
pub use hold_angle::{HoldState, SwerveHoldAngle};
pub use module::{ModuleHardware, ModuleOutput, ModuleTuning, SwerveModule};
