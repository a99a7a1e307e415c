//! Central error types for the showcase
//!
//! `TweenError` covers animation setup mistakes that are caught when a tween
//! is built; `ShowcaseError` is what the application seam returns.

use crate::tween::TweenId;

/// Rejected tween configuration
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    #[error("target has no animatable property `{0}`")]
    UnknownProperty(String),

    #[error("path destination for `{0}` has no control points")]
    EmptyPath(String),

    #[error("{what} must be finite and non-negative, got {value}")]
    InvalidTiming { what: &'static str, value: f64 },

    #[error("no tween registered under {0:?}")]
    UnknownTween(TweenId),
}

/// Errors surfaced by the application
#[derive(thiserror::Error, Debug)]
pub enum ShowcaseError {
    #[error("GPU setup failed: {0}")]
    Gpu(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(String),

    #[error("animation error: {0}")]
    Tween(#[from] TweenError),
}

impl ShowcaseError {
    pub fn gpu<T: ToString>(msg: T) -> Self {
        ShowcaseError::Gpu(msg.to_string())
    }

    pub fn event_loop<T: ToString>(msg: T) -> Self {
        ShowcaseError::EventLoop(msg.to_string())
    }
}
