//! Absolute steering encoders.
//!
//! A [`SteeringEncoder`] reports the module's rotational position as a
//! fraction of a turn.  [`OffsetEncoder`] applies the per-module calibration
//! (zero offset and direction) that every physical module needs.

use swervekit_types::repeat;

/// An absolute rotational sensor reporting a normalized position in `[0, 1)`.
pub trait SteeringEncoder {
    /// Stable identifier, e.g. `"front_left.encoder"`.
    fn id(&self) -> &str;

    /// Normalized rotational position in `[0, 1)`.
    fn get(&self) -> f64;
}

/// Wraps a raw [`SteeringEncoder`] with a calibration offset and an optional
/// direction reversal.
///
/// The calibrated reading is `repeat(raw - offset, 1)`, or
/// `repeat(1 - (raw - offset), 1)` when reversed, so it always lies in `[0, 1)`.
pub struct OffsetEncoder {
    inner: Box<dyn SteeringEncoder>,
    offset: f64,
    reversed: bool,
}

impl OffsetEncoder {
    pub fn new(inner: Box<dyn SteeringEncoder>, offset: f64, reversed: bool) -> Self {
        Self {
            inner,
            offset,
            reversed,
        }
    }

    /// An encoder with no calibration applied.
    pub fn uncalibrated(inner: Box<dyn SteeringEncoder>) -> Self {
        Self::new(inner, 0.0, false)
    }

    /// Reading of the wrapped encoder with no calibration.
    pub fn raw(&self) -> f64 {
        self.inner.get()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }
}

impl SteeringEncoder for OffsetEncoder {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn get(&self) -> f64 {
        let shifted = self.inner.get() - self.offset;
        let value = if self.reversed { 1.0 - shifted } else { shifted };
        repeat(value, 1.0)
    }
}
