//! [`Robot`] – the host-side periodic driver.
//!
//! Owns the [`Scheduler`], the registered [`Component`]s and the current
//! [`Period`].  The host's fixed-rate callback calls [`Robot::periodic`] once
//! per tick and [`Robot::set_period`] whenever the field reports a mode
//! change.
//!
//! Per enabled tick:
//!
//! 1. advance the clock;
//! 2. run the `Early` and `Normal` phases;
//! 3. call `update` plus the mode-specific update on every component, in
//!    registration order (this is where a drivetrain samples its input);
//! 4. run the `Late` phase, so late tasks consume this tick's input.
//!
//! The `Always` phase runs at the end of every tick, enabled or not.

use swervekit_types::SwerveError;
use tracing::{info, warn};

use crate::period::{Period, has_flag};
use crate::scheduler::{Order, Scheduler};

/// A subsystem driven by the [`Robot`] lifecycle.
///
/// Every hook defaults to a no-op.  Hooks receive the scheduler so they can
/// install or restart their own tasks.
pub trait Component {
    /// Called when any enabled mode starts.
    fn init(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }

    /// Called every enabled tick.
    fn update(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }

    fn init_auto(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }

    fn update_auto(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }

    fn init_teleop(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }

    fn update_teleop(&mut self, _scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        Ok(())
    }
}

/// Periodic host driver.
pub struct Robot {
    scheduler: Scheduler,
    components: Vec<(String, Box<dyn Component>)>,
    period: Period,
}

impl Robot {
    /// A disabled robot with an empty scheduler whose clock starts at `now`.
    pub fn new(now: f64) -> Self {
        Self {
            scheduler: Scheduler::new(now),
            components: Vec::new(),
            period: Period::DISABLED,
        }
    }

    /// Register a component.  A component already registered under `name`
    /// is replaced in place, keeping its update position.
    pub fn add_component(&mut self, name: impl Into<String>, component: Box<dyn Component>) {
        let name = name.into();
        match self.components.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = component,
            None => self.components.push((name, component)),
        }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Switch to `period` at host time `now`.
    ///
    /// Leaving the enabled modes stops every non-exempt task.  Entering an
    /// enabled mode from `DISABLED` resets the clock (which also stops
    /// non-exempt tasks); then `init` and the mode init run on every
    /// component.  Setting the current period again is a no-op.
    pub fn set_period(&mut self, period: Period, now: f64) {
        if period == self.period {
            return;
        }
        let previous = std::mem::replace(&mut self.period, period);
        info!(from = ?previous, to = ?period, "period transition");

        if !period.is_enabled() {
            self.scheduler.stop_all();
            return;
        }

        if !previous.is_enabled() {
            self.scheduler.reset(now);
        }

        let scheduler = &mut self.scheduler;
        for (name, component) in &mut self.components {
            let result = component.init(scheduler).and_then(|()| {
                if has_flag(period, Period::AUTONOMOUS) {
                    component.init_auto(scheduler)
                } else if has_flag(period, Period::TELEOP) {
                    component.init_teleop(scheduler)
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                warn!(component = %name, error = %e, "component init failed");
            }
        }
    }

    /// Run one tick at host time `now`.
    pub fn periodic(&mut self, now: f64) {
        if self.period.is_enabled() {
            self.scheduler.advance_clock(now);
            self.scheduler.run_phase(Order::Early);
            self.scheduler.run_phase(Order::Normal);
            self.update_components();
            self.scheduler.run_phase(Order::Late);
        }
        self.scheduler.run_phase(Order::Always);
    }

    fn update_components(&mut self) {
        let period = self.period;
        let scheduler = &mut self.scheduler;
        for (name, component) in &mut self.components {
            let result = component.update(scheduler).and_then(|()| {
                if has_flag(period, Period::AUTONOMOUS) {
                    component.update_auto(scheduler)
                } else if has_flag(period, Period::TELEOP) {
                    component.update_teleop(scheduler)
                } else {
                    Ok(())
                }
            });
            if let Err(e) = result {
                warn!(component = %name, error = %e, "component update failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TickInfo, forever};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        log: Log,
        fail_update: bool,
    }

    impl Component for Recorder {
        fn init(&mut self, _: &mut Scheduler) -> Result<(), SwerveError> {
            self.log.borrow_mut().push("init".into());
            Ok(())
        }

        fn init_teleop(&mut self, _: &mut Scheduler) -> Result<(), SwerveError> {
            self.log.borrow_mut().push("init_teleop".into());
            Ok(())
        }

        fn init_auto(&mut self, _: &mut Scheduler) -> Result<(), SwerveError> {
            self.log.borrow_mut().push("init_auto".into());
            Ok(())
        }

        fn update(&mut self, _: &mut Scheduler) -> Result<(), SwerveError> {
            self.log.borrow_mut().push("update".into());
            if self.fail_update {
                return Err(SwerveError::hardware("recorder", "unplugged"));
            }
            Ok(())
        }

        fn update_teleop(&mut self, _: &mut Scheduler) -> Result<(), SwerveError> {
            self.log.borrow_mut().push("update_teleop".into());
            Ok(())
        }
    }

    fn phase_logger(log: &Log, label: &'static str) -> impl crate::task::Task + 'static {
        let log = log.clone();
        forever(label, move |_: &TickInfo| {
            log.borrow_mut().push(label.into());
            Ok(())
        })
    }

    #[test]
    fn component_updates_sit_between_normal_and_late() {
        let log: Log = Rc::default();
        let mut robot = Robot::new(0.0);
        robot.add_component(
            "recorder",
            Box::new(Recorder {
                log: log.clone(),
                fail_update: false,
            }),
        );
        robot.set_period(Period::TELEOP, 0.0);
        let s = robot.scheduler_mut();
        s.schedule(phase_logger(&log, "late"), Order::Late);
        s.schedule(phase_logger(&log, "always"), Order::Always);
        s.schedule(phase_logger(&log, "normal"), Order::Normal);
        s.schedule(phase_logger(&log, "early"), Order::Early);
        log.borrow_mut().clear();

        robot.periodic(0.02);

        assert_eq!(
            *log.borrow(),
            vec!["early", "normal", "update", "update_teleop", "late", "always"]
        );
    }

    #[test]
    fn entering_auto_runs_init_hooks() {
        let log: Log = Rc::default();
        let mut robot = Robot::new(0.0);
        robot.add_component(
            "recorder",
            Box::new(Recorder {
                log: log.clone(),
                fail_update: false,
            }),
        );
        robot.set_period(Period::AUTONOMOUS, 1.0);
        assert_eq!(*log.borrow(), vec!["init", "init_auto"]);
        // Same period again is a no-op.
        robot.set_period(Period::AUTONOMOUS, 1.5);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn disabling_stops_non_exempt_tasks_and_only_always_runs() {
        let log: Log = Rc::default();
        let mut robot = Robot::new(0.0);
        robot.set_period(Period::TELEOP, 0.0);
        let normal = robot
            .scheduler_mut()
            .schedule(phase_logger(&log, "normal"), Order::Normal);
        let exempt = robot
            .scheduler_mut()
            .schedule_exempt(phase_logger(&log, "poll"), Order::Always);

        robot.set_period(Period::DISABLED, 0.5);
        robot.periodic(0.52);

        assert!(normal.is_done());
        assert!(!exempt.is_done());
        assert_eq!(*log.borrow(), vec!["poll"]);
    }

    #[test]
    fn enabling_resets_clock() {
        let mut robot = Robot::new(0.0);
        robot.set_period(Period::TELEOP, 0.0);
        robot.periodic(0.02);
        robot.periodic(0.04);
        assert_eq!(robot.scheduler().tick_info().frame, 2);
        robot.set_period(Period::DISABLED, 0.05);
        robot.set_period(Period::AUTONOMOUS, 3.0);
        assert_eq!(robot.scheduler().tick_info().frame, 0);
        robot.periodic(3.02);
        assert_eq!(robot.scheduler().tick_info().frame, 1);
    }

    #[test]
    fn failing_component_does_not_block_the_tick() {
        let log: Log = Rc::default();
        let mut robot = Robot::new(0.0);
        robot.add_component(
            "broken",
            Box::new(Recorder {
                log: log.clone(),
                fail_update: true,
            }),
        );
        robot.set_period(Period::TEST, 0.0);
        robot
            .scheduler_mut()
            .schedule(phase_logger(&log, "late"), Order::Late);
        log.borrow_mut().clear();
        robot.periodic(0.02);
        assert_eq!(*log.borrow(), vec!["update", "late"]);
    }

    #[test]
    fn re_adding_component_replaces_it() {
        let log_a: Log = Rc::default();
        let log_b: Log = Rc::default();
        let mut robot = Robot::new(0.0);
        robot.add_component("drive", Box::new(Recorder { log: log_a.clone(), fail_update: false }));
        robot.add_component("drive", Box::new(Recorder { log: log_b.clone(), fail_update: false }));
        robot.set_period(Period::TEST, 0.0);
        robot.periodic(0.02);
        assert!(log_a.borrow().is_empty());
        assert_eq!(*log_b.borrow(), vec!["init", "update"]);
    }
}
