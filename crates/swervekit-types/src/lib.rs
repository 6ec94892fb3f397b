//! `swervekit-types` – shared vocabulary for the SwerveKit workspace.
//!
//! Holds the planar math used by the swerve engine ([`geometry`]), task
//! identifiers, and the workspace-wide [`SwerveError`].

pub mod geometry;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geometry::{Vector2, normalize_angle, repeat, shortest_signed_delta};

/// Stable identifier assigned to every task a scheduler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Global error type spanning hardware faults, task failures, and caller-side
/// lifecycle mistakes.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwerveError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    /// Raised by a task body during a phase advance.  The scheduler logs it and
    /// keeps the task scheduled.
    #[error("Task '{task}' step failed: {reason}")]
    TaskStep { task: String, reason: String },

    /// The handle is not queued and was never completed by this scheduler.
    #[error("Invalid task handle: {0}")]
    InvalidHandle(TaskId),

    #[error("Invalid swerve module position ({x}, {y}): must be finite and non-zero")]
    InvalidModulePosition { x: f64, y: f64 },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl SwerveError {
    /// Shorthand for a [`SwerveError::HardwareFault`].
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        Self::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}
