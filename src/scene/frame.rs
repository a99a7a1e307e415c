//! Per-frame snapshot of what the renderer has to draw

use glam::{Mat4, Vec3};

/// Instance data of one point
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl PointInstance {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            _pad0: 0.0,
            color: color.to_array(),
            _pad1: 0.0,
        }
    }
}

/// A batch of points sharing a transform and material
#[derive(Debug, Clone, Default)]
pub struct PointLayer {
    pub model: Mat4,
    pub size: f32,
    pub sprite: bool,
    pub additive: bool,
    pub points: Vec<PointInstance>,
}

/// Exponential-squared fog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    pub density: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SceneFrame {
    pub view: Mat4,
    pub projection: Mat4,
    pub fog: Option<Fog>,
    pub layers: Vec<PointLayer>,
}

/// Perspective camera looking down -Z
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Camera {
    pub fn new(fov_degrees: f32, aspect: f32) -> Self {
        Self {
            fov_degrees,
            aspect,
            near: 1.0,
            far: 50000.0,
            position: Vec3::new(0.0, 0.0, 1000.0),
            target: Vec3::ZERO,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_origin_is_in_front() {
        let camera = Camera::new(75.0, 16.0 / 9.0);
        let clip = camera.projection() * camera.view() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!((0.0..1.0).contains(&ndc.z));
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<PointInstance>(), 32);
    }
}
