//! Tween engine: eased property animation driven by a per-frame scheduler
//!
//! Times are milliseconds on whatever clock the frame loop uses; the
//! scheduler only compares them.

pub mod animation;
pub mod easing;
pub mod interpolation;
pub mod property;
pub mod scheduler;

pub use animation::{Tween, TweenBuilder, TweenState, TweenStatus};
pub use easing::{EaseMode, Easing};
pub use interpolation::Interpolation;
pub use property::{Destination, PropertyTrack, Target, Tweenable};
pub use scheduler::{Scheduler, TweenId};
