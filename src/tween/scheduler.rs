//! Tween registry advanced once per frame
//!
//! The scheduler owns every tween and hands out `TweenId`s. Only tweens in
//! the active list are advanced; `stop` takes a tween out of that list right
//! away from the caller's point of view (it will never run a callback again),
//! and the stale slot is purged on the next `update`.

use std::collections::HashMap;

use super::animation::{Tween, TweenState, TweenStatus};
use crate::error::TweenError;

/// Handle to a tween owned by a [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

#[derive(Debug, Default)]
pub struct Scheduler {
    tweens: HashMap<TweenId, Tween>,
    active: Vec<TweenId>,
    next_id: u64,
}

impl Scheduler {
    /// Create the scheduler at program start.
    pub fn init() -> Self {
        log::debug!("tween scheduler initialised");
        Self::default()
    }

    /// Stop and drop every tween. The scheduler stays usable.
    pub fn shutdown(&mut self) {
        log::debug!(
            "tween scheduler shutting down ({} tweens, {} active)",
            self.tweens.len(),
            self.active_count()
        );
        self.active.clear();
        self.tweens.clear();
    }

    /// Register an idle tween.
    pub fn insert(&mut self, tween: Tween) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.insert(id, tween);
        id
    }

    /// Drop a tween. Any pending run is abandoned.
    pub fn remove(&mut self, id: TweenId) -> Option<Tween> {
        self.tweens.remove(&id)
    }

    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(&id)
    }

    pub fn get_mut(&mut self, id: TweenId) -> Option<&mut Tween> {
        self.tweens.get_mut(&id)
    }

    /// Number of registered tweens, running or not
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.tweens.get(&id).is_some_and(Tween::is_running)
    }

    /// Number of tweens scheduled or running
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|id| self.is_active(**id)).count()
    }

    /// Schedule `id` to run from `time` plus its delay.
    pub fn start(&mut self, id: TweenId, time: f64) -> Result<(), TweenError> {
        let tween = self.tweens.get_mut(&id).ok_or(TweenError::UnknownTween(id))?;
        tween.start(time);
        if !tween.queued {
            tween.queued = true;
            self.active.push(id);
        }
        Ok(())
    }

    /// Cancel `id` regardless of progress. Values stay where they are.
    pub fn stop(&mut self, id: TweenId) -> Result<(), TweenError> {
        let tween = self.tweens.get_mut(&id).ok_or(TweenError::UnknownTween(id))?;
        tween.stop();
        Ok(())
    }

    /// Stop every active tween.
    pub fn remove_all(&mut self) {
        for id in &self.active {
            if let Some(tween) = self.tweens.get_mut(id) {
                tween.stop();
            }
        }
    }

    /// Tweens started, in order, when `id` completes.
    pub fn chain(&mut self, id: TweenId, next: &[TweenId]) -> Result<(), TweenError> {
        if let Some(missing) = next.iter().find(|n| !self.tweens.contains_key(n)) {
            return Err(TweenError::UnknownTween(*missing));
        }
        let tween = self.tweens.get_mut(&id).ok_or(TweenError::UnknownTween(id))?;
        tween.set_chain(next.to_vec());
        Ok(())
    }

    /// Advance every active tween to `time`.
    ///
    /// Returns false when nothing was active. Tweens chained to one that
    /// completes are started at `time` and first advance on the next call.
    pub fn update(&mut self, time: f64) -> bool {
        if self.active.is_empty() {
            return false;
        }

        let mut chained = Vec::new();
        let Self { tweens, active, .. } = self;

        active.retain(|id| {
            let Some(tween) = tweens.get_mut(id) else {
                return false;
            };
            let keep = match tween.update(time) {
                TweenStatus::Pending | TweenStatus::Running => true,
                TweenStatus::Completed => {
                    chained.extend_from_slice(tween.chain());
                    false
                }
                TweenStatus::Inactive => false,
            };
            tween.queued = keep;
            keep
        });

        for id in chained {
            if let Err(e) = self.start(id, time) {
                log::warn!("chained tween not started: {}", e);
            }
        }

        true
    }

    /// State of `id`, if registered
    pub fn state(&self, id: TweenId) -> Option<TweenState> {
        self.tweens.get(&id).map(Tween::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::{Easing, EaseMode, Tweenable};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Gauge {
        level: f64,
    }

    impl Tweenable for Gauge {
        fn property(&self, name: &str) -> Option<f64> {
            (name == "level").then_some(self.level)
        }

        fn set_property(&mut self, name: &str, value: f64) -> bool {
            if name == "level" {
                self.level = value;
            }
            name == "level"
        }
    }

    fn gauge() -> Rc<RefCell<Gauge>> {
        Rc::new(RefCell::new(Gauge { level: 0.0 }))
    }

    #[test]
    fn test_empty_update_reports_idle() {
        let mut scheduler = Scheduler::init();
        assert!(!scheduler.update(0.0));
    }

    #[test]
    fn test_completion_removes_and_fires_once() {
        let mut scheduler = Scheduler::init();
        let g = gauge();
        let completions = Rc::new(Cell::new(0));
        let counter = completions.clone();

        let id = scheduler.insert(
            Tween::builder(g.clone())
                .to("level", 1.0)
                .duration(100.0)
                .easing(Easing::Quadratic(EaseMode::Out))
                .on_complete(move || counter.set(counter.get() + 1))
                .build()
                .unwrap(),
        );
        scheduler.start(id, 0.0).unwrap();

        assert!(scheduler.update(50.0));
        assert!((g.borrow().level - 0.75).abs() < 1e-12);
        assert!(scheduler.update(100.0));
        // Completed on the previous step, so nothing is left to advance
        assert!(!scheduler.update(200.0));

        assert_eq!(completions.get(), 1);
        assert_eq!(scheduler.state(id), Some(TweenState::Completed));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_double_start_registers_once() {
        let mut scheduler = Scheduler::init();
        let id = scheduler.insert(Tween::builder(gauge()).to("level", 1.0).build().unwrap());
        scheduler.start(id, 0.0).unwrap();
        scheduler.start(id, 10.0).unwrap();
        assert_eq!(scheduler.active.len(), 1);
        assert_eq!(scheduler.get(id).unwrap().start_time(), 10.0);
    }

    #[test]
    fn test_stop_then_restart_before_update() {
        let mut scheduler = Scheduler::init();
        let g = gauge();
        let id = scheduler.insert(
            Tween::builder(g.clone()).to("level", 8.0).duration(100.0).build().unwrap(),
        );
        scheduler.start(id, 0.0).unwrap();
        scheduler.stop(id).unwrap();
        assert!(!scheduler.is_active(id));
        scheduler.start(id, 0.0).unwrap();
        assert_eq!(scheduler.active.len(), 1);

        scheduler.update(50.0);
        assert!((g.borrow().level - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_ids() {
        let mut scheduler = Scheduler::init();
        let id = scheduler.insert(Tween::builder(gauge()).build().unwrap());
        let removed = scheduler.remove(id);
        assert!(removed.is_some());
        assert_eq!(scheduler.start(id, 0.0), Err(TweenError::UnknownTween(id)));
        assert_eq!(scheduler.stop(id), Err(TweenError::UnknownTween(id)));
    }

    #[test]
    fn test_shutdown_clears_everything() {
        let mut scheduler = Scheduler::init();
        let id = scheduler.insert(Tween::builder(gauge()).to("level", 1.0).build().unwrap());
        scheduler.start(id, 0.0).unwrap();
        scheduler.shutdown();
        assert!(scheduler.is_empty());
        assert!(!scheduler.update(10.0));
    }
}
