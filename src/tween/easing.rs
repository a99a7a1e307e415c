//! Easing curves: pure maps from normalized time to normalized progress.
//!
//! Every curve maps 0 to 0 and 1 to 1. Elastic and Back overshoot the
//! `[0, 1]` range in between, which is why interpolation has to tolerate
//! fractions slightly outside it.

use std::f64::consts::PI;

/// Which end of the curve gets the shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EaseMode {
    In,
    Out,
    InOut,
}

/// Easing function selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    Quadratic(EaseMode),
    Cubic(EaseMode),
    Quartic(EaseMode),
    Quintic(EaseMode),
    Sinusoidal(EaseMode),
    Exponential(EaseMode),
    Circular(EaseMode),
    Elastic(EaseMode),
    Back(EaseMode),
    Bounce(EaseMode),
    /// Caller-supplied curve
    Custom(fn(f64) -> f64),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Linear
    }
}

impl Easing {
    /// Map normalized time `k` to eased progress.
    pub fn apply(self, k: f64) -> f64 {
        use EaseMode::*;

        match self {
            Easing::Linear => k,
            Easing::Custom(f) => f(k),

            Easing::Quadratic(In) => k * k,
            Easing::Quadratic(Out) => k * (2.0 - k),
            Easing::Quadratic(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k
                } else {
                    let k = k - 1.0;
                    -0.5 * (k * (k - 2.0) - 1.0)
                }
            }

            Easing::Cubic(In) => k * k * k,
            Easing::Cubic(Out) => {
                let k = k - 1.0;
                k * k * k + 1.0
            }
            Easing::Cubic(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k * k
                } else {
                    let k = k - 2.0;
                    0.5 * (k * k * k + 2.0)
                }
            }

            Easing::Quartic(In) => k * k * k * k,
            Easing::Quartic(Out) => {
                let k = k - 1.0;
                1.0 - k * k * k * k
            }
            Easing::Quartic(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k * k * k
                } else {
                    let k = k - 2.0;
                    -0.5 * (k * k * k * k - 2.0)
                }
            }

            Easing::Quintic(In) => k * k * k * k * k,
            Easing::Quintic(Out) => {
                let k = k - 1.0;
                k * k * k * k * k + 1.0
            }
            Easing::Quintic(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * k * k * k * k * k
                } else {
                    let k = k - 2.0;
                    0.5 * (k * k * k * k * k + 2.0)
                }
            }

            Easing::Sinusoidal(In) => 1.0 - (k * PI / 2.0).cos(),
            Easing::Sinusoidal(Out) => (k * PI / 2.0).sin(),
            Easing::Sinusoidal(InOut) => 0.5 * (1.0 - (PI * k).cos()),

            Easing::Exponential(In) => {
                if k == 0.0 {
                    0.0
                } else {
                    1024f64.powf(k - 1.0)
                }
            }
            Easing::Exponential(Out) => {
                if k == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * k)
                }
            }
            Easing::Exponential(InOut) => {
                if k == 0.0 {
                    return 0.0;
                }
                if k == 1.0 {
                    return 1.0;
                }
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * 1024f64.powf(k - 1.0)
                } else {
                    0.5 * (-(2f64.powf(-10.0 * (k - 1.0))) + 2.0)
                }
            }

            Easing::Circular(In) => 1.0 - (1.0 - k * k).sqrt(),
            Easing::Circular(Out) => {
                let k = k - 1.0;
                (1.0 - k * k).sqrt()
            }
            Easing::Circular(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    -0.5 * ((1.0 - k * k).sqrt() - 1.0)
                } else {
                    let k = k - 2.0;
                    0.5 * ((1.0 - k * k).sqrt() + 1.0)
                }
            }

            Easing::Elastic(mode) => elastic(mode, k),

            Easing::Back(In) => k * k * (2.70158 * k - 1.70158),
            Easing::Back(Out) => {
                let k = k - 1.0;
                k * k * (2.70158 * k + 1.70158) + 1.0
            }
            Easing::Back(InOut) => {
                let k = k * 2.0;
                if k < 1.0 {
                    0.5 * (k * k * (3.5949095 * k - 2.5949095))
                } else {
                    let k = k - 2.0;
                    0.5 * (k * k * (3.5949095 * k + 2.5949095) + 2.0)
                }
            }

            Easing::Bounce(In) => bounce_in(k),
            Easing::Bounce(Out) => bounce_out(k),
            Easing::Bounce(InOut) => {
                if k < 0.5 {
                    bounce_in(k * 2.0) * 0.5
                } else {
                    bounce_out(k * 2.0 - 1.0) * 0.5 + 0.5
                }
            }
        }
    }
}

// Amplitude 1, period 0.4, phase shift 0.1
fn elastic(mode: EaseMode, k: f64) -> f64 {
    const PERIOD: f64 = 0.4;
    const SHIFT: f64 = 0.1;

    if k == 0.0 {
        return 0.0;
    }
    if k == 1.0 {
        return 1.0;
    }

    let wave = |k: f64| ((k - SHIFT) * 2.0 * PI / PERIOD).sin();

    match mode {
        EaseMode::In => {
            let k = k - 1.0;
            -(2f64.powf(10.0 * k) * wave(k))
        }
        EaseMode::Out => 2f64.powf(-10.0 * k) * wave(k) + 1.0,
        EaseMode::InOut => {
            let k = k * 2.0 - 1.0;
            if k < 0.0 {
                -0.5 * 2f64.powf(10.0 * k) * wave(k)
            } else {
                0.5 * 2f64.powf(-10.0 * k) * wave(k) + 1.0
            }
        }
    }
}

fn bounce_out(k: f64) -> f64 {
    if k < 1.0 / 2.75 {
        7.5625 * k * k
    } else if k < 2.0 / 2.75 {
        let k = k - 1.5 / 2.75;
        7.5625 * k * k + 0.75
    } else if k < 2.5 / 2.75 {
        let k = k - 2.25 / 2.75;
        7.5625 * k * k + 0.9375
    } else {
        let k = k - 2.625 / 2.75;
        7.5625 * k * k + 0.984375
    }
}

fn bounce_in(k: f64) -> f64 {
    1.0 - bounce_out(1.0 - k)
}
