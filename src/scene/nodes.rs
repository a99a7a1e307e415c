//! Animatable scene objects
//!
//! Each type exposes its numeric fields to the tween engine by name. Nodes
//! keep position and rotation behind shared handles so a tween and the
//! director can both hold them.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::tween::Tweenable;

/// Three components addressed as `x`, `y`, `z`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector(pub Vec3);

impl Tweenable for Vector {
    fn property(&self, name: &str) -> Option<f64> {
        match name {
            "x" => Some(self.0.x as f64),
            "y" => Some(self.0.y as f64),
            "z" => Some(self.0.z as f64),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: f64) -> bool {
        match name {
            "x" => self.0.x = value as f32,
            "y" => self.0.y = value as f32,
            "z" => self.0.z = value as f32,
            _ => return false,
        }
        true
    }
}

/// Position plus XYZ Euler rotation
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub position: Rc<RefCell<Vector>>,
    pub rotation: Rc<RefCell<Vector>>,
}

impl Node {
    pub fn at(position: Vec3) -> Self {
        Self {
            position: Rc::new(RefCell::new(Vector(position))),
            rotation: Rc::default(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position.borrow().0
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation.borrow().0
    }

    pub fn set_position(&self, position: Vec3) {
        self.position.borrow_mut().0 = position;
    }

    pub fn set_rotation(&self, rotation: Vec3) {
        self.rotation.borrow_mut().0 = rotation;
    }

    /// Local transform `T * Rx * Ry * Rz`
    pub fn matrix(&self) -> Mat4 {
        let r = self.rotation();
        let rotation = Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z);
        Mat4::from_rotation_translation(rotation, self.position())
    }
}

/// Point appearance shared by every particle of a cloud
#[derive(Debug, Clone, PartialEq)]
pub struct PointMaterial {
    pub size: f32,
    /// Draw the soft round sprite instead of a square
    pub sprite: bool,
    pub additive: bool,
}

impl Tweenable for PointMaterial {
    fn property(&self, name: &str) -> Option<f64> {
        (name == "size").then_some(self.size as f64)
    }

    fn set_property(&mut self, name: &str, value: f64) -> bool {
        if name != "size" {
            return false;
        }
        self.size = value as f32;
        true
    }
}

/// Rotation speeds for the fireflies and the final spin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pace {
    pub firefly: f64,
    pub qrcode: f64,
}

impl Pace {
    pub const FIREFLY_SLOW: f64 = 0.002;
    pub const FIREFLY_FAST: f64 = 0.04;
    pub const QRCODE_SLOW: f64 = 0.001;
    pub const QRCODE_FAST: f64 = 0.01;
}

impl Default for Pace {
    fn default() -> Self {
        Self {
            firefly: Self::FIREFLY_SLOW,
            qrcode: Self::QRCODE_SLOW,
        }
    }
}

impl Tweenable for Pace {
    fn property(&self, name: &str) -> Option<f64> {
        match name {
            "firefly" => Some(self.firefly),
            "qrcode" => Some(self.qrcode),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: f64) -> bool {
        match name {
            "firefly" => self.firefly = value,
            "qrcode" => self.qrcode = value,
            _ => return false,
        }
        true
    }
}

/// One point of the morphing cloud
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub color: Vec3,
    /// True while a morph tween owns the position
    pub morphing: bool,
}

impl Particle {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            morphing: false,
        }
    }
}

impl Tweenable for Particle {
    fn property(&self, name: &str) -> Option<f64> {
        Vector(self.position).property(name)
    }

    fn set_property(&mut self, name: &str, value: f64) -> bool {
        let mut v = Vector(self.position);
        let known = v.set_property(name, value);
        self.position = v.0;
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_properties() {
        let mut v = Vector(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.property("y"), Some(2.0));
        assert!(v.set_property("z", -4.0));
        assert!(!v.set_property("w", 0.0));
        assert_eq!(v.0, Vec3::new(1.0, 2.0, -4.0));
    }

    #[test]
    fn test_node_matrix_translates() {
        let node = Node::at(Vec3::new(0.0, 0.0, -1000.0));
        let p = node.matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(0.0, 0.0, -1000.0));
    }

    #[test]
    fn test_node_rotation_order() {
        let node = Node::default();
        node.set_rotation(Vec3::new(std::f32::consts::FRAC_PI_2, 0.0, std::f32::consts::FRAC_PI_2));
        // Z turns +X into +Y, then X turns +Y into +Z
        let p = node.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_particle_and_pace() {
        let mut particle = Particle::new(Vec3::ZERO, Vec3::ONE);
        assert!(particle.set_property("x", 5.0));
        assert_eq!(particle.position.x, 5.0);

        let mut pace = Pace::default();
        assert!(pace.set_property("firefly", Pace::FIREFLY_FAST));
        assert_eq!(pace.property("qrcode"), Some(Pace::QRCODE_SLOW));
    }
}
