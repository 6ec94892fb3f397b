//! Tick bookkeeping: frame counter, delta time and time since reset.
//!
//! The host supplies timestamps (seconds, any monotonic origin), which keeps
//! the clock deterministic under test.  Only the owning [`Scheduler`] advances
//! it; everything else sees read-only [`TickInfo`] snapshots.
//!
//! [`Scheduler`]: crate::scheduler::Scheduler

use crate::task::TickInfo;

#[derive(Debug, Clone, Default)]
pub struct Clock {
    start: f64,
    last: f64,
    dt: f64,
    frame: u64,
}

impl Clock {
    pub fn new(now: f64) -> Self {
        Self {
            start: now,
            last: now,
            dt: 0.0,
            frame: 0,
        }
    }

    /// Restart counting from `now`: frame 0, zero `dt`.
    pub fn reset(&mut self, now: f64) {
        *self = Self::new(now);
    }

    /// Record a new tick at `now` and return its snapshot.
    ///
    /// A timestamp older than the previous one yields `dt = 0` rather than a
    /// negative delta.
    pub fn advance(&mut self, now: f64) -> TickInfo {
        self.dt = (now - self.last).max(0.0);
        self.last = self.last.max(now);
        self.frame += 1;
        self.tick_info()
    }

    pub fn tick_info(&self) -> TickInfo {
        TickInfo {
            frame: self.frame,
            dt: self.dt,
            now: self.last,
            elapsed: self.last - self.start,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_frames_and_delta() {
        let mut clock = Clock::new(10.0);
        let t1 = clock.advance(10.02);
        assert_eq!(t1.frame, 1);
        assert!((t1.dt - 0.02).abs() < 1e-9);
        let t2 = clock.advance(10.06);
        assert_eq!(t2.frame, 2);
        assert!((t2.dt - 0.04).abs() < 1e-9);
        assert!((t2.elapsed - 0.06).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut clock = Clock::new(0.0);
        clock.advance(1.0);
        clock.advance(2.0);
        clock.reset(5.0);
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.dt(), 0.0);
        assert_eq!(clock.tick_info().elapsed, 0.0);
    }

    #[test]
    fn backwards_timestamp_is_clamped() {
        let mut clock = Clock::new(1.0);
        clock.advance(2.0);
        let tick = clock.advance(1.5);
        assert_eq!(tick.dt, 0.0);
        assert_eq!(tick.frame, 2);
        assert_eq!(tick.now, 2.0);
    }
}
