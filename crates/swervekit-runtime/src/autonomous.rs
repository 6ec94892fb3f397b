//! Autonomous routines: a [`Sequence`] with start and end hooks, run as one
//! `Normal` task by an [`AutonomousManager`].
//!
//! A run calls [`Sequence::on_start`] and the first [`Sequence::step`] in the
//! same resumption, keeps stepping until the sequence reports
//! [`Step::Done`], then calls [`Sequence::on_end`].  Ending a run early with
//! [`AutonomousManager::end_auto`] calls `on_end` if the sequence had
//! started and had not ended yet, and removes its task.

use std::cell::RefCell;
use std::rc::Rc;

use swervekit_types::SwerveError;
use tracing::{debug, info};

use crate::scheduler::{Order, Scheduler, TaskHandle};
use crate::task::{Step, Task, TickInfo};

/// A routine with explicit start and end hooks.
pub trait Sequence {
    fn name(&self) -> &str;

    fn on_start(&mut self, _tick: &TickInfo) {}

    /// Advance the routine by one resumption.
    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError>;

    /// Called once, whether the routine finished or was ended early.
    fn on_end(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Pending,
    Running,
    Ended,
}

struct Run {
    sequence: Box<dyn Sequence>,
    state: RunState,
}

impl Run {
    fn end(&mut self) {
        if self.state == RunState::Running {
            self.sequence.on_end();
        }
        self.state = RunState::Ended;
    }
}

struct SequenceTask {
    name: String,
    run: Rc<RefCell<Run>>,
}

impl Task for SequenceTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, tick: &TickInfo) -> Result<Step, SwerveError> {
        let mut run = self.run.borrow_mut();
        match run.state {
            RunState::Ended => return Ok(Step::Done),
            RunState::Pending => {
                run.state = RunState::Running;
                run.sequence.on_start(tick);
            }
            RunState::Running => {}
        }
        let step = run.sequence.step(tick)?;
        if step == Step::Done {
            run.end();
            debug!(sequence = %self.name, frame = tick.frame, "autonomous sequence finished");
        }
        Ok(step)
    }
}

struct Active {
    run: Rc<RefCell<Run>>,
    task: TaskHandle,
}

/// Owns at most one running [`Sequence`].
#[derive(Default)]
pub struct AutonomousManager {
    current: Option<Active>,
}

impl AutonomousManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `sequence` in `Normal`.  A sequence still running from an
    /// earlier call is ended first.
    pub fn start_auto(
        &mut self,
        scheduler: &mut Scheduler,
        sequence: Box<dyn Sequence>,
    ) -> Result<TaskHandle, SwerveError> {
        self.end_auto(scheduler)?;

        let name = sequence.name().to_string();
        let run = Rc::new(RefCell::new(Run {
            sequence,
            state: RunState::Pending,
        }));
        let task = scheduler.schedule(
            SequenceTask {
                name: name.clone(),
                run: run.clone(),
            },
            Order::Normal,
        );
        info!(sequence = %name, "autonomous sequence started");
        self.current = Some(Active {
            run,
            task: task.clone(),
        });
        Ok(task)
    }

    /// Stop the current sequence, if any.
    ///
    /// `on_end` runs only for a sequence that started and has not ended.  A
    /// task already removed from the scheduler (finished, or dropped by
    /// `stop_all`) is not an error.
    pub fn end_auto(&mut self, scheduler: &mut Scheduler) -> Result<(), SwerveError> {
        let Some(active) = self.current.take() else {
            return Ok(());
        };
        active.run.borrow_mut().end();
        if !active.task.is_done() {
            scheduler.cancel(&active.task)?;
        }
        Ok(())
    }

    /// `true` between the first step of the current sequence and its end.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|active| active.run.borrow().state == RunState::Running)
    }

    pub fn task(&self) -> Option<&TaskHandle> {
        self.current.as_ref().map(|active| &active.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Calls {
        starts: Cell<u32>,
        steps: Cell<u32>,
        ends: Cell<u32>,
    }

    struct Counted {
        calls: Rc<Calls>,
        steps_to_finish: Option<u32>,
    }

    impl Sequence for Counted {
        fn name(&self) -> &str {
            "counted"
        }

        fn on_start(&mut self, _tick: &TickInfo) {
            self.calls.starts.set(self.calls.starts.get() + 1);
        }

        fn step(&mut self, _tick: &TickInfo) -> Result<Step, SwerveError> {
            let n = self.calls.steps.get() + 1;
            self.calls.steps.set(n);
            Ok(match self.steps_to_finish {
                Some(limit) if n >= limit => Step::Done,
                _ => Step::Continue,
            })
        }

        fn on_end(&mut self) {
            self.calls.ends.set(self.calls.ends.get() + 1);
        }
    }

    fn counted(steps_to_finish: Option<u32>) -> (Box<dyn Sequence>, Rc<Calls>) {
        let calls = Rc::new(Calls::default());
        let seq = Counted {
            calls: calls.clone(),
            steps_to_finish,
        };
        (Box::new(seq), calls)
    }

    fn tick(s: &mut Scheduler, now: f64) {
        s.advance_clock(now);
        for order in Order::ENABLED_SEQUENCE {
            s.run_phase(order);
        }
    }

    #[test]
    fn start_step_and_end_in_order() {
        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let (seq, calls) = counted(Some(3));
        let task = autos.start_auto(&mut s, seq).unwrap();
        assert_eq!(task.order(), Order::Normal);
        assert!(!autos.is_running());

        tick(&mut s, 0.02);
        assert_eq!(calls.starts.get(), 1);
        assert_eq!(calls.steps.get(), 1);
        assert!(autos.is_running());

        tick(&mut s, 0.04);
        tick(&mut s, 0.06);
        assert_eq!(calls.steps.get(), 3);
        assert_eq!(calls.ends.get(), 1);
        assert!(task.is_done());
        assert!(!autos.is_running());

        // Finished on its own: ending it again must not call on_end twice.
        autos.end_auto(&mut s).unwrap();
        assert_eq!(calls.ends.get(), 1);
    }

    #[test]
    fn end_auto_calls_on_end_and_cancels() {
        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let (seq, calls) = counted(None);
        let task = autos.start_auto(&mut s, seq).unwrap();
        tick(&mut s, 0.02);

        autos.end_auto(&mut s).unwrap();
        assert_eq!(calls.ends.get(), 1);
        assert!(task.is_done());
        assert!(s.is_empty());

        tick(&mut s, 0.04);
        assert_eq!(calls.steps.get(), 1);
    }

    #[test]
    fn ending_before_first_step_skips_hooks() {
        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let (seq, calls) = counted(None);
        autos.start_auto(&mut s, seq).unwrap();
        autos.end_auto(&mut s).unwrap();
        tick(&mut s, 0.02);
        assert_eq!(calls.starts.get(), 0);
        assert_eq!(calls.ends.get(), 0);
    }

    #[test]
    fn stop_all_then_end_auto_still_runs_on_end() {
        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let (seq, calls) = counted(None);
        let task = autos.start_auto(&mut s, seq).unwrap();
        tick(&mut s, 0.02);

        s.stop_all();
        assert!(task.is_done());
        assert_eq!(calls.ends.get(), 0);

        autos.end_auto(&mut s).unwrap();
        assert_eq!(calls.ends.get(), 1);
    }

    #[test]
    fn starting_again_replaces_the_running_sequence() {
        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let (first, first_calls) = counted(None);
        let (second, second_calls) = counted(None);
        let first_task = autos.start_auto(&mut s, first).unwrap();
        tick(&mut s, 0.02);

        let second_task = autos.start_auto(&mut s, second).unwrap();
        assert_eq!(first_calls.ends.get(), 1);
        assert!(first_task.is_done());
        assert_eq!(autos.task(), Some(&second_task));

        tick(&mut s, 0.04);
        assert_eq!(first_calls.steps.get(), 1);
        assert_eq!(second_calls.starts.get(), 1);
        assert_eq!(s.queued(Order::Normal), 1);
    }

    #[test]
    fn failing_step_is_retried_without_ending() {
        struct Flaky(u32);

        impl Sequence for Flaky {
            fn name(&self) -> &str {
                "flaky"
            }

            fn step(&mut self, _tick: &TickInfo) -> Result<Step, SwerveError> {
                self.0 += 1;
                if self.0 == 1 {
                    Err(SwerveError::hardware("arm", "stalled"))
                } else {
                    Ok(Step::Done)
                }
            }
        }

        let mut s = Scheduler::new(0.0);
        let mut autos = AutonomousManager::new();
        let task = autos.start_auto(&mut s, Box::new(Flaky(0))).unwrap();
        tick(&mut s, 0.02);
        assert!(autos.is_running());
        assert!(!task.is_done());
        tick(&mut s, 0.04);
        assert!(task.is_done());
        assert!(!autos.is_running());
    }
}
