//! Declarative property access for tween targets

use std::cell::RefCell;
use std::rc::Rc;

use super::interpolation::Interpolation;
use crate::error::TweenError;

/// An object whose named numeric properties can be animated.
///
/// Implementors list what they expose; a tween checks every property it
/// declares against this list when it is built, not when it first runs.
pub trait Tweenable {
    /// Current value of `name`, or `None` if the property does not exist.
    fn property(&self, name: &str) -> Option<f64>;

    /// Write `value` into `name`. Returns false for unknown properties.
    fn set_property(&mut self, name: &str, value: f64) -> bool;
}

/// Shared handle to a tween target. Tweens never copy their target.
pub type Target = Rc<RefCell<dyn Tweenable>>;

/// Where a property should end up.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Single end value, reached by linear blend of start and end
    Value(f64),
    /// Control points visited after the start value
    Path(Vec<f64>),
}

impl From<f64> for Destination {
    fn from(value: f64) -> Self {
        Destination::Value(value)
    }
}

impl From<Vec<f64>> for Destination {
    fn from(points: Vec<f64>) -> Self {
        Destination::Path(points)
    }
}

/// One animated property: name, end state and path strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTrack {
    pub name: String,
    pub destination: Destination,
    /// Strategy for `Destination::Path`; ignored for single values
    pub interpolation: Interpolation,
}

impl PropertyTrack {
    pub fn new(name: impl Into<String>, destination: impl Into<Destination>) -> Self {
        Self {
            name: name.into(),
            destination: destination.into(),
            interpolation: Interpolation::Linear,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Check the track against a target.
    pub fn validate(&self, target: &dyn Tweenable) -> Result<(), TweenError> {
        if target.property(&self.name).is_none() {
            return Err(TweenError::UnknownProperty(self.name.clone()));
        }
        if let Destination::Path(points) = &self.destination {
            if points.is_empty() {
                return Err(TweenError::EmptyPath(self.name.clone()));
            }
        }
        Ok(())
    }
}

/// Values captured when a tween starts
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Snapshot {
    Value { start: f64, end: f64 },
    Path(Vec<f64>),
}

impl Snapshot {
    pub(crate) fn capture(current: f64, destination: &Destination) -> Self {
        match destination {
            Destination::Value(end) => Snapshot::Value { start: current, end: *end },
            Destination::Path(points) => {
                let mut path = Vec::with_capacity(points.len() + 1);
                path.push(current);
                path.extend_from_slice(points);
                Snapshot::Path(path)
            }
        }
    }

    pub(crate) fn sample(&self, eased: f64, interpolation: Interpolation) -> f64 {
        match self {
            Snapshot::Value { start, end } => start + (end - start) * eased,
            Snapshot::Path(points) => interpolation.apply(points, eased),
        }
    }
}
