//! A single tween: time-bounded, eased interpolation of target properties.

use std::fmt;

use super::easing::Easing;
use super::interpolation::Interpolation;
use super::property::{Destination, PropertyTrack, Snapshot, Target};
use super::scheduler::TweenId;
use crate::error::TweenError;

/// Default duration in milliseconds
pub const DEFAULT_DURATION: f64 = 1000.0;

type Callback = Box<dyn FnMut()>;
type UpdateCallback = Box<dyn FnMut(f64)>;

/// Lifecycle of a tween.
///
/// `Idle -> Scheduled -> Active -> Completed`, with `Stopped` reachable from
/// `Scheduled` or `Active`. Only a new start leaves `Completed` or `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenState {
    Idle,
    Scheduled,
    Active,
    Completed,
    Stopped,
}

/// Result of advancing a tween to a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    /// Start time not reached yet
    Pending,
    Running,
    /// Reached the end on this step
    Completed,
    /// Not scheduled; nothing happened
    Inactive,
}

pub struct Tween {
    target: Target,
    tracks: Vec<PropertyTrack>,
    snapshots: Vec<Option<Snapshot>>,
    duration: f64,
    delay: f64,
    start_time: f64,
    easing: Easing,
    chain: Vec<TweenId>,
    state: TweenState,
    /// Set while the id sits in the scheduler's active list
    pub(crate) queued: bool,
    on_start: Option<Callback>,
    on_update: Option<UpdateCallback>,
    on_complete: Option<Callback>,
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("tracks", &self.tracks)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("start_time", &self.start_time)
            .field("easing", &self.easing)
            .field("chain", &self.chain)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn check_timing(what: &'static str, value: f64) -> Result<f64, TweenError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(TweenError::InvalidTiming { what, value })
    }
}

fn validate_tracks(target: &Target, tracks: &[PropertyTrack]) -> Result<(), TweenError> {
    let target = target.borrow();
    tracks.iter().try_for_each(|track| track.validate(&*target))
}

impl Tween {
    /// Start describing a tween on `target`.
    pub fn builder(target: Target) -> TweenBuilder {
        TweenBuilder::new(target)
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Logical start (start call time plus delay) of the current run
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn tracks(&self) -> &[PropertyTrack] {
        &self.tracks
    }

    pub fn chain(&self) -> &[TweenId] {
        &self.chain
    }

    /// Replace the destination and duration. Takes effect on the next start.
    pub fn retarget(&mut self, tracks: Vec<PropertyTrack>, duration: f64) -> Result<(), TweenError> {
        let duration = check_timing("duration", duration)?;
        validate_tracks(&self.target, &tracks)?;
        self.tracks = tracks;
        self.duration = duration;
        Ok(())
    }

    pub fn set_delay(&mut self, delay: f64) -> Result<(), TweenError> {
        self.delay = check_timing("delay", delay)?;
        Ok(())
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.easing = easing;
    }

    pub(crate) fn set_chain(&mut self, chain: Vec<TweenId>) {
        self.chain = chain;
    }

    pub fn set_on_start(&mut self, callback: impl FnMut() + 'static) {
        self.on_start = Some(Box::new(callback));
    }

    pub fn set_on_update(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_update = Some(Box::new(callback));
    }

    pub fn set_on_complete(&mut self, callback: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Schedule a fresh run at `time + delay`, discarding previous progress.
    pub(crate) fn start(&mut self, time: f64) {
        self.start_time = time + self.delay;
        self.state = TweenState::Scheduled;

        let target = self.target.borrow();
        self.snapshots = self
            .tracks
            .iter()
            .map(|track| match target.property(&track.name) {
                Some(current) => Some(Snapshot::capture(current, &track.destination)),
                None => {
                    log::warn!("tween target lost property `{}`; track skipped", track.name);
                    None
                }
            })
            .collect();
    }

    pub(crate) fn stop(&mut self) {
        if matches!(self.state, TweenState::Scheduled | TweenState::Active) {
            self.state = TweenState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TweenState::Scheduled | TweenState::Active)
    }

    /// Advance to `time`.
    pub(crate) fn update(&mut self, time: f64) -> TweenStatus {
        if !self.is_running() {
            return TweenStatus::Inactive;
        }
        if time < self.start_time {
            return TweenStatus::Pending;
        }

        if self.state == TweenState::Scheduled {
            self.state = TweenState::Active;
            if let Some(on_start) = self.on_start.as_mut() {
                on_start();
            }
        }

        let elapsed = if self.duration > 0.0 {
            ((time - self.start_time) / self.duration).min(1.0)
        } else {
            1.0
        };
        let eased = self.easing.apply(elapsed);

        {
            let mut target = self.target.borrow_mut();
            for (track, snapshot) in self.tracks.iter().zip(&self.snapshots) {
                if let Some(snapshot) = snapshot {
                    target.set_property(&track.name, snapshot.sample(eased, track.interpolation));
                }
            }
        }

        if let Some(on_update) = self.on_update.as_mut() {
            on_update(eased);
        }

        if elapsed >= 1.0 {
            self.state = TweenState::Completed;
            if let Some(on_complete) = self.on_complete.as_mut() {
                on_complete();
            }
            return TweenStatus::Completed;
        }

        TweenStatus::Running
    }
}

/// Collects a tween description and validates it against the target.
pub struct TweenBuilder {
    target: Target,
    tracks: Vec<PropertyTrack>,
    duration: f64,
    delay: f64,
    easing: Easing,
    interpolation: Interpolation,
    on_start: Option<Callback>,
    on_update: Option<UpdateCallback>,
    on_complete: Option<Callback>,
}

impl TweenBuilder {
    fn new(target: Target) -> Self {
        Self {
            target,
            tracks: Vec::new(),
            duration: DEFAULT_DURATION,
            delay: 0.0,
            easing: Easing::Linear,
            interpolation: Interpolation::Linear,
            on_start: None,
            on_update: None,
            on_complete: None,
        }
    }

    /// Animate `name` towards `destination` using the builder's interpolation.
    pub fn to(mut self, name: &str, destination: impl Into<Destination>) -> Self {
        self.tracks.push(PropertyTrack::new(name, destination));
        self
    }

    /// Add a fully specified track.
    pub fn track(mut self, track: PropertyTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Strategy for every track still on the default linear strategy.
    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_update(mut self, callback: impl FnMut(f64) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Result<Tween, TweenError> {
        let duration = check_timing("duration", self.duration)?;
        let delay = check_timing("delay", self.delay)?;

        let interpolation = self.interpolation;
        let tracks: Vec<PropertyTrack> = self
            .tracks
            .into_iter()
            .map(|track| {
                if track.interpolation == Interpolation::Linear {
                    track.with_interpolation(interpolation)
                } else {
                    track
                }
            })
            .collect();
        validate_tracks(&self.target, &tracks)?;

        Ok(Tween {
            target: self.target,
            tracks,
            snapshots: Vec::new(),
            duration,
            delay,
            start_time: 0.0,
            easing: self.easing,
            chain: Vec::new(),
            state: TweenState::Idle,
            queued: false,
            on_start: self.on_start,
            on_update: self.on_update,
            on_complete: self.on_complete,
        })
    }
}
