//! Procedural particle shapes and their placement tables
//!
//! Every shape is generated around the origin, then centered, normalized to
//! a unit bounding sphere, rotated X then Y then Z, scaled and translated
//! according to the active layout table.

use std::f32::consts::{PI, TAU};

use glam::{Mat3, Vec3};
use rayon::prelude::*;

use super::rng::SimpleRng;
use crate::color;

/// Degree factor used by the placement tables
pub const DEG_TO_RAD: f32 = 3.14 / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Knot,
    Sphere,
    Book,
    Reel,
    /// Flat grid; the director ripples this one
    Wave,
    QrCode,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 6] = [
        ShapeKind::Knot,
        ShapeKind::Sphere,
        ShapeKind::Book,
        ShapeKind::Reel,
        ShapeKind::Wave,
        ShapeKind::QrCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Knot => "knot",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Book => "book",
            ShapeKind::Reel => "reel",
            ShapeKind::Wave => "wave",
            ShapeKind::QrCode => "qrcode",
        }
    }

    fn generate(self) -> Vec<Vec3> {
        match self {
            ShapeKind::Knot => torus_knot(400, 12),
            ShapeKind::Sphere => fibonacci_sphere(4000),
            ShapeKind::Book => open_book(60, 40),
            ShapeKind::Reel => film_reel(96, 28),
            ShapeKind::Wave => wave_grid(70),
            ShapeKind::QrCode => qr_pattern(25, 3, 0x51c0de),
        }
    }
}

/// Placement of one shape: uniform scale, Euler degrees, offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTransform {
    pub scale: f32,
    pub rotation: [f32; 3],
    pub offset: [f32; 3],
}

const fn place(scale: f32, rotation: [f32; 3], offset: [f32; 3]) -> ShapeTransform {
    ShapeTransform { scale, rotation, offset }
}

pub const DESKTOP_LAYOUT: [ShapeTransform; 6] = [
    place(700.0, [72.0, 30.0, 60.0], [-400.0, 100.0, 0.0]),
    place(700.0, [0.0, -30.0, 0.0], [400.0, 0.0, 0.0]),
    place(1000.0, [0.0, 0.0, 0.0], [-500.0, 150.0, 0.0]),
    place(1200.0, [90.0, 180.0, 0.0], [0.0, 0.0, 0.0]),
    place(1500.0, [10.0, 0.0, 0.0], [0.0, -500.0, 0.0]),
    place(500.0, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
];

pub const MOBILE_LAYOUT: [ShapeTransform; 6] = [
    place(700.0, [72.0, 30.0, 60.0], [-250.0, 200.0, 0.0]),
    place(700.0, [0.0, -30.0, 0.0], [400.0, 50.0, 0.0]),
    place(1000.0, [10.0, 0.0, 0.0], [-100.0, 250.0, 0.0]),
    place(1200.0, [90.0, 180.0, 0.0], [0.0, 200.0, 0.0]),
    place(2000.0, [-10.0, 0.0, 0.0], [0.0, -800.0, 0.0]),
    place(500.0, [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
];

/// A target formation for the particle cloud
#[derive(Debug, Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    pub vertices: Vec<Vec3>,
    pub colors: Vec<Vec3>,
}

impl Shape {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Generate and place every shape of `layout`, in parallel.
pub fn build_shapes(layout: &[ShapeTransform; 6], hue: f32, lightness: f32) -> Vec<Shape> {
    ShapeKind::ALL[..]
        .par_iter()
        .zip(layout[..].par_iter())
        .map(|(&kind, transform)| {
            let mut vertices = kind.generate();
            center(&mut vertices);
            normalize(&mut vertices);
            apply_transform(&mut vertices, transform);
            let colors = vec![color::hsl(hue, 1.0, lightness); vertices.len()];
            log::debug!("shape {}: {} vertices", kind.name(), vertices.len());
            Shape { kind, vertices, colors }
        })
        .collect()
}

/// Move the bounding-box center to the origin.
pub fn center(vertices: &mut [Vec3]) {
    let Some((min, max)) = bounds(vertices) else {
        return;
    };
    let mid = (min + max) * 0.5;
    for v in vertices.iter_mut() {
        *v -= mid;
    }
}

/// Scale so the bounding sphere has radius 1.
pub fn normalize(vertices: &mut [Vec3]) {
    let Some((min, max)) = bounds(vertices) else {
        return;
    };
    let mid = (min + max) * 0.5;
    let radius = vertices.iter().map(|v| v.distance(mid)).fold(0.0f32, f32::max);
    let s = if radius == 0.0 { 1.0 } else { 1.0 / radius };
    for v in vertices.iter_mut() {
        *v = (*v - mid) * s;
    }
}

pub fn apply_transform(vertices: &mut [Vec3], transform: &ShapeTransform) {
    let [rx, ry, rz] = transform.rotation.map(|d| d * DEG_TO_RAD);
    // Each rotation is applied to the already rotated geometry
    let rotation = Mat3::from_rotation_z(rz) * Mat3::from_rotation_y(ry) * Mat3::from_rotation_x(rx);
    let offset = Vec3::from(transform.offset);
    for v in vertices.iter_mut() {
        *v = rotation * *v * transform.scale + offset;
    }
}

fn bounds(vertices: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *vertices.first()?;
    Some(
        vertices
            .iter()
            .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
    )
}

fn torus_knot(tubular: usize, radial: usize) -> Vec<Vec3> {
    let (p, q) = (2.0f32, 3.0f32);
    let curve = |u: f32| {
        let r = 2.0 + (q * u).cos();
        Vec3::new(r * (p * u).cos(), r * (p * u).sin(), -(q * u).sin())
    };

    let mut points = Vec::with_capacity(tubular * radial);
    for i in 0..tubular {
        let u = i as f32 / tubular as f32 * TAU;
        let here = curve(u);
        let tangent = (curve(u + 0.01) - here).normalize_or_zero();
        let normal = tangent.cross(Vec3::Z).normalize_or(Vec3::X);
        let binormal = tangent.cross(normal);
        for j in 0..radial {
            let v = j as f32 / radial as f32 * TAU;
            points.push(here + (normal * v.cos() + binormal * v.sin()) * 0.4);
        }
    }
    points
}

fn fibonacci_sphere(count: usize) -> Vec<Vec3> {
    let golden = PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            Vec3::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

fn open_book(columns: usize, rows: usize) -> Vec<Vec3> {
    let width = 1.4;
    let mut points = Vec::with_capacity(2 * columns * rows);
    for side in [-1.0f32, 1.0] {
        for i in 0..columns {
            let t = i as f32 / (columns - 1) as f32;
            let x = side * t * width;
            let z = 0.25 * (PI * t).sin();
            for j in 0..rows {
                let y = j as f32 / (rows - 1) as f32 * 2.0 - 1.0;
                points.push(Vec3::new(x, y, z));
            }
        }
    }
    points
}

fn film_reel(angular: usize, radial: usize) -> Vec<Vec3> {
    let holes: Vec<Vec3> = (0..5)
        .map(|k| {
            let a = k as f32 / 5.0 * TAU;
            Vec3::new(0.55 * a.cos(), 0.55 * a.sin(), 0.0)
        })
        .collect();

    let mut points = Vec::new();
    for layer in [-0.08f32, 0.08] {
        for i in 0..angular {
            let a = i as f32 / angular as f32 * TAU;
            for j in 0..radial {
                let r = 0.15 + 0.85 * j as f32 / (radial - 1) as f32;
                let p = Vec3::new(r * a.cos(), r * a.sin(), 0.0);
                if holes.iter().any(|h| h.distance(p) < 0.22) {
                    continue;
                }
                points.push(Vec3::new(p.x, p.y, layer));
            }
        }
    }
    points
}

fn wave_grid(n: usize) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        let x = i as f32 / (n - 1) as f32 * 2.0 - 1.0;
        for j in 0..n {
            let z = j as f32 / (n - 1) as f32 * 2.0 - 1.0;
            points.push(Vec3::new(x, 0.05 * (x * 3.0).sin() * (z * 3.0).cos(), z));
        }
    }
    points
}

fn qr_pattern(modules: usize, dots: usize, seed: u64) -> Vec<Vec3> {
    let mut rng = SimpleRng::new(seed);
    let finder = |x: usize, y: usize| -> Option<bool> {
        let corners = [(0, 0), (modules - 7, 0), (0, modules - 7)];
        corners.iter().find_map(|&(cx, cy)| {
            let (dx, dy) = (x.wrapping_sub(cx), y.wrapping_sub(cy));
            (dx < 7 && dy < 7).then(|| {
                let ring = dx.min(dy).min(6 - dx).min(6 - dy);
                ring != 1
            })
        })
    };

    let step = 1.0 / modules as f32;
    let mut points = Vec::new();
    for y in 0..modules {
        for x in 0..modules {
            let dark = match finder(x, y) {
                Some(dark) => dark,
                None => rng.next_f64() < 0.5,
            };
            if !dark {
                continue;
            }
            for dy in 0..dots {
                for dx in 0..dots {
                    let px = (x as f32 + (dx as f32 + 0.5) / dots as f32) * step;
                    let py = (y as f32 + (dy as f32 + 0.5) / dots as f32) * step;
                    points.push(Vec3::new(px - 0.5, 0.5 - py, 0.0));
                }
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_fits_unit_sphere() {
        for kind in ShapeKind::ALL {
            let mut vertices = kind.generate();
            assert!(!vertices.is_empty(), "{} is empty", kind.name());
            center(&mut vertices);
            normalize(&mut vertices);
            let radius = vertices.iter().map(|v| v.length()).fold(0.0f32, f32::max);
            assert!((radius - 1.0).abs() < 1e-3, "{} radius {}", kind.name(), radius);
        }
    }

    #[test]
    fn test_transform_scales_and_offsets() {
        let mut vertices = vec![Vec3::X];
        apply_transform(&mut vertices, &place(700.0, [0.0, 0.0, 0.0], [-400.0, 100.0, 0.0]));
        assert!((vertices[0] - Vec3::new(300.0, 100.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_rotation_order_x_then_y() {
        // X by 90 takes +Y to +Z, then Y by 90 takes +Z to +X
        let mut vertices = vec![Vec3::Y];
        let quarter = 90.0;
        apply_transform(&mut vertices, &place(1.0, [quarter, quarter, 0.0], [0.0; 3]));
        // 3.14 is not quite pi, so allow a little slack
        assert!((vertices[0] - Vec3::X).length() < 1e-2);
    }

    #[test]
    fn test_build_shapes_keeps_order() {
        let shapes = build_shapes(&DESKTOP_LAYOUT, 160.0, 1.0);
        assert_eq!(shapes.len(), 6);
        for (shape, kind) in shapes.iter().zip(ShapeKind::ALL) {
            assert_eq!(shape.kind, kind);
            assert_eq!(shape.colors.len(), shape.vertices.len());
        }
        // The QR code sits at the origin with radius 500
        let qr = &shapes[5];
        let radius = qr.vertices.iter().map(|v| v.length()).fold(0.0f32, f32::max);
        assert!((radius - 500.0).abs() < 1.0);
    }

    #[test]
    fn test_layout_tables() {
        assert_eq!(DESKTOP_LAYOUT[4].scale, 1500.0);
        assert_eq!(MOBILE_LAYOUT[4].scale, 2000.0);
        assert_eq!(MOBILE_LAYOUT[4].rotation, [-10.0, 0.0, 0.0]);
        assert_eq!(DESKTOP_LAYOUT[3].rotation, [90.0, 180.0, 0.0]);
    }
}
