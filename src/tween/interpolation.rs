//! Multi-point interpolation over a control-point sequence.
//!
//! Used for path destinations: the tween eases a fraction and the selected
//! strategy turns it into a value along the path.

use std::sync::OnceLock;

/// Largest n for which n! is finite in f64.
const MAX_FACTORIAL: usize = 170;

/// Interpolation strategy for path destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Piecewise linear, extrapolating linearly past either end
    #[default]
    Linear,
    /// Full-degree Bezier curve through the control polygon
    Bezier,
    /// Catmull-Rom spline, closed when the first and last points coincide
    CatmullRom,
}

impl Interpolation {
    /// Evaluate the path at fraction `t`. An empty path yields 0.
    pub fn apply(self, points: &[f64], t: f64) -> f64 {
        match points.len() {
            0 => 0.0,
            1 => points[0],
            _ => match self {
                Interpolation::Linear => linear(points, t),
                Interpolation::Bezier => bezier(points, t),
                Interpolation::CatmullRom => catmull_rom(points, t),
            },
        }
    }
}

fn lerp(p0: f64, p1: f64, t: f64) -> f64 {
    (p1 - p0) * t + p0
}

fn linear(v: &[f64], t: f64) -> f64 {
    let m = v.len() - 1;
    let f = m as f64 * t;

    if t < 0.0 {
        return lerp(v[0], v[1], f);
    }
    if t > 1.0 {
        return lerp(v[m], v[m - 1], m as f64 - f);
    }

    let i = (f.floor() as usize).min(m);
    lerp(v[i], v[(i + 1).min(m)], f - i as f64)
}

fn bezier(v: &[f64], t: f64) -> f64 {
    let n = v.len() - 1;
    v.iter()
        .enumerate()
        .map(|(i, &p)| {
            (1.0 - t).powi((n - i) as i32) * t.powi(i as i32) * p * bernstein(n, i)
        })
        .sum()
}

fn catmull_rom(v: &[f64], t: f64) -> f64 {
    let m = v.len() - 1;
    let mut f = m as f64 * t;
    let mut i = f.floor();

    if v[0] == v[m] {
        // Closed loop: indices wrap modulo the segment count
        if t < 0.0 {
            f = m as f64 * (1.0 + t);
            i = f.floor();
        }
        let m = m as i64;
        let base = i as i64;
        let at = |offset: i64| v[(base + offset).rem_euclid(m) as usize];
        return catmull_rom_segment(at(-1), at(0), at(1), at(2), f - i);
    }

    if t < 0.0 {
        return v[0] - (catmull_rom_segment(v[0], v[0], v[1], v[1], -f) - v[0]);
    }
    if t > 1.0 {
        return v[m] - (catmull_rom_segment(v[m], v[m], v[m - 1], v[m - 1], f - m as f64) - v[m]);
    }

    let i = (i as usize).min(m);
    catmull_rom_segment(
        v[i.saturating_sub(1)],
        v[i],
        v[(i + 1).min(m)],
        v[(i + 2).min(m)],
        f - i as f64,
    )
}

/// Cardinal spline segment between `p1` and `p2` with tension 0.5.
fn catmull_rom_segment(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let v0 = (p2 - p0) * 0.5;
    let v1 = (p3 - p1) * 0.5;
    let t2 = t * t;
    let t3 = t * t2;

    (2.0 * p1 - 2.0 * p2 + v0 + v1) * t3 + (-3.0 * p1 + 3.0 * p2 - 2.0 * v0 - v1) * t2 + v0 * t + p1
}

fn bernstein(n: usize, i: usize) -> f64 {
    factorial(n) / factorial(i) / factorial(n - i)
}

fn factorial(n: usize) -> f64 {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();

    let table = TABLE.get_or_init(|| {
        let mut table = Vec::with_capacity(MAX_FACTORIAL + 1);
        let mut acc = 1.0f64;
        table.push(acc);
        for k in 1..=MAX_FACTORIAL {
            acc *= k as f64;
            table.push(acc);
        }
        table
    });

    table.get(n).copied().unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_endpoints_exact() {
        let path = [3.0, -7.5, 12.25, 40.0];
        assert_eq!(Interpolation::Linear.apply(&path, 0.0), 3.0);
        assert_eq!(Interpolation::Linear.apply(&path, 1.0), 40.0);
    }

    #[test]
    fn test_linear_segments_and_extrapolation() {
        let path = [0.0, 10.0, 30.0];
        // Halfway through the second segment
        assert!((Interpolation::Linear.apply(&path, 0.75) - 20.0).abs() < 1e-12);
        // Past either end the outer segment is extended
        assert!((Interpolation::Linear.apply(&path, -0.5) - (-10.0)).abs() < 1e-12);
        assert!((Interpolation::Linear.apply(&path, 1.5) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_bezier_matches_quadratic_closed_form() {
        let path = [0.0, 10.0, 0.0];
        // (1-t)^2*0 + 2t(1-t)*10 + t^2*0 at t = 0.5
        assert!((Interpolation::Bezier.apply(&path, 0.5) - 5.0).abs() < 1e-12);
        assert!((Interpolation::Bezier.apply(&path, 0.0)).abs() < 1e-12);
        assert!((Interpolation::Bezier.apply(&path, 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_factorial_table() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(5), 120.0);
        assert!(factorial(MAX_FACTORIAL).is_finite());
        assert!(factorial(MAX_FACTORIAL + 1).is_infinite());
        assert_eq!(bernstein(4, 2), 6.0);
    }

    #[test]
    fn test_catmull_rom_passes_through_control_points() {
        let path = [0.0, 4.0, 2.0, 8.0, 5.0];
        for (k, &expected) in path.iter().enumerate() {
            let t = k as f64 / (path.len() - 1) as f64;
            let value = Interpolation::CatmullRom.apply(&path, t);
            assert!((value - expected).abs() < 1e-9, "t={} got {}", t, value);
        }
    }

    #[test]
    fn test_catmull_rom_closed_loop_tangent_is_continuous() {
        // First and last points coincide, so the curve wraps around
        let path = [0.0, 10.0, 5.0, -5.0, 0.0];
        let eps = 1e-6;

        // Slope leaving the loop start vs slope arriving at the loop end
        let at_start = Interpolation::CatmullRom.apply(&path, 0.0);
        let after_start = Interpolation::CatmullRom.apply(&path, eps);
        let before_end = Interpolation::CatmullRom.apply(&path, 1.0 - eps);
        let at_end = Interpolation::CatmullRom.apply(&path, 1.0);

        let slope_out = (after_start - at_start) / eps;
        let slope_in = (at_end - before_end) / eps;

        assert!((at_start - at_end).abs() < 1e-9);
        assert!(
            (slope_out - slope_in).abs() < 1e-2,
            "slope mismatch: {} vs {}",
            slope_out,
            slope_in
        );
    }

    #[test]
    fn test_degenerate_paths() {
        assert_eq!(Interpolation::CatmullRom.apply(&[], 0.5), 0.0);
        assert_eq!(Interpolation::Bezier.apply(&[7.0], 0.3), 7.0);
    }
}
