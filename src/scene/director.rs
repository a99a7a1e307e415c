//! Scene director: owns the particle cloud and reacts to host triggers
//!
//! The director never advances tweens itself. The frame loop owner calls
//! `Scheduler::update` and then [`Director::update`] with the same clock.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::{Mat4, Vec3};

use super::frame::{Camera, Fog, PointInstance, PointLayer, SceneFrame};
use super::nodes::{Node, Pace, Particle, PointMaterial};
use super::post::PostChain;
use super::rng::SimpleRng;
use super::shapes::{Shape, build_shapes};
use crate::color;
use crate::config::ShowcaseConfig;
use crate::error::TweenError;
use crate::fx::RenderBackend;
use crate::tween::{EaseMode, Easing, PropertyTrack, Scheduler, Tween, TweenId};

const CLOUD_SPREAD: f64 = 1000.0;
const FIREFLY_SPREAD: f64 = 1500.0;
const FIREFLY_COUNT: usize = 500;
const INTRO_SEGMENTS: usize = 5;
const INTRO_DELAY: f64 = 1000.0;
const SPIN_DURATION: f64 = 10000.0;
const CLOUD_POINT_SIZE: f32 = 5.0;
const QR_POINT_SIZE: f32 = 20.0;
const FIREFLY_POINT_SIZE: f32 = 7.0;

/// Three drifting layers sharing one point set
struct Fireflies {
    layers: [Node; 3],
    points: Vec<PointInstance>,
}

pub struct Director {
    config: ShowcaseConfig,
    shapes: Vec<Shape>,
    rng: SimpleRng,
    camera: Camera,
    pointer_center: (f32, f32),

    particles: Vec<Rc<RefCell<Particle>>>,
    particle_tweens: Vec<Option<TweenId>>,
    cloud: Node,
    cloud_material: Rc<RefCell<PointMaterial>>,
    material_tween: Option<TweenId>,
    spin_tween: Option<TweenId>,
    intro_group: Node,
    fireflies: Option<Fireflies>,
    pace: Rc<RefCell<Pace>>,
    pace_tweens: Option<(TweenId, TweenId)>,

    scene_rotation: Vec3,
    /// Rotation the scene eases toward (y from pointer x, x from pointer y)
    wobble_target: (f32, f32),

    intro_started: bool,
    introed: bool,
    stormed: Rc<Cell<bool>>,
    /// Pointer and spin are frozen while the ripple shape is selected
    ripple_locked: bool,
    current: Option<usize>,
    morph_duration: f64,
    delay_factor: f64,
    ripple_phase: f32,
    spin_phase: f64,
    intro_deadline: Option<f64>,
    sprite_restore_at: Option<f64>,
}

impl Director {
    pub fn new(config: ShowcaseConfig) -> Self {
        let layout = config.profile.layout();
        let shapes = build_shapes(layout, config.shape_hue, config.shape_lightness);
        let mut rng = SimpleRng::new(config.seed);

        let count = shapes.iter().map(Shape::len).max().unwrap_or(0);
        let particles: Vec<_> = (0..count)
            .map(|_| {
                let position = Vec3::new(
                    rng.range(-CLOUD_SPREAD, CLOUD_SPREAD) as f32,
                    rng.range(-CLOUD_SPREAD, CLOUD_SPREAD) as f32,
                    rng.range(-12.0 * CLOUD_SPREAD, CLOUD_SPREAD) as f32,
                );
                let hue = 180.0 + 10.0 * rng.next_f64() as f32;
                Rc::new(RefCell::new(Particle::new(position, color::hsl(hue, 1.0, 1.0))))
            })
            .collect();
        log::info!("particle cloud: {} points, {} shapes", count, shapes.len());

        let (width, height) = config.window_size;
        let mut camera = Camera::new(config.profile.fov(), 1.0);
        camera.set_aspect(width, height);

        Self {
            pointer_center: (width as f32 / 2.0, height as f32 / 2.0),
            camera,
            particle_tweens: vec![None; particles.len()],
            particles,
            cloud: Node::at(Vec3::new(0.0, 0.0, -CLOUD_SPREAD as f32)),
            cloud_material: Rc::new(RefCell::new(PointMaterial {
                size: CLOUD_POINT_SIZE,
                sprite: true,
                additive: true,
            })),
            material_tween: None,
            spin_tween: None,
            intro_group: Node::at(Vec3::new(0.0, 0.0, -2000.0)),
            fireflies: None,
            pace: Rc::new(RefCell::new(Pace::default())),
            pace_tweens: None,
            scene_rotation: Vec3::ZERO,
            wobble_target: (0.0, 0.0),
            intro_started: false,
            introed: false,
            stormed: Rc::new(Cell::new(false)),
            ripple_locked: false,
            current: None,
            morph_duration: 1500.0,
            delay_factor: 1.7,
            ripple_phase: 0.0,
            spin_phase: 0.0,
            intro_deadline: None,
            sprite_restore_at: None,
            shapes,
            rng,
            config,
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particle(&self, index: usize) -> Option<Particle> {
        self.particles.get(index).map(|p| *p.borrow())
    }

    pub fn cloud(&self) -> &Node {
        &self.cloud
    }

    pub fn intro_group(&self) -> &Node {
        &self.intro_group
    }

    pub fn point_size(&self) -> f32 {
        self.cloud_material.borrow().size
    }

    pub fn pace(&self) -> Pace {
        *self.pace.borrow()
    }

    pub fn scene_rotation(&self) -> Vec3 {
        self.scene_rotation
    }

    pub fn is_introed(&self) -> bool {
        self.introed
    }

    pub fn is_stormed(&self) -> bool {
        self.stormed.get()
    }

    pub fn current_shape(&self) -> Option<usize> {
        self.current
    }

    pub fn has_fireflies(&self) -> bool {
        self.fireflies.is_some()
    }

    /// Fly the cloud in and push the intro group back in five eased legs.
    pub fn start_intro(&mut self, scheduler: &mut Scheduler, now: f64) -> Result<(), TweenError> {
        if self.intro_started {
            log::debug!("intro already started");
            return Ok(());
        }
        self.intro_started = true;

        let duration = self.config.intro_duration();
        let approach = scheduler.insert(
            Tween::builder(self.cloud.position.clone())
                .to("z", 0.1)
                .duration(duration)
                .easing(Easing::Linear)
                .delay(INTRO_DELAY)
                .build()?,
        );

        let mut legs = Vec::with_capacity(INTRO_SEGMENTS);
        for c in 0..INTRO_SEGMENTS {
            legs.push(scheduler.insert(
                Tween::builder(self.intro_group.position.clone())
                    .to("z", 1000.0 + 3000.0 * c as f64)
                    .duration(duration / INTRO_SEGMENTS as f64)
                    .easing(Easing::Quintic(EaseMode::InOut))
                    .build()?,
            ));
        }
        for pair in legs.windows(2) {
            scheduler.chain(pair[0], &pair[1..])?;
        }

        scheduler.start(legs[0], now)?;
        scheduler.start(approach, now)?;

        self.intro_deadline = Some(now + duration - 1000.0);
        log::info!("intro started ({} ms)", duration);
        Ok(())
    }

    /// Drop every running tween and jump straight to the scattered cloud.
    pub fn skip_intro(&mut self, scheduler: &mut Scheduler) {
        scheduler.remove_all();
        let mut position = self.cloud.position();
        position.z = 0.1;
        self.cloud.set_position(position);
        self.intro_started = true;
        self.finish_intro();
    }

    fn finish_intro(&mut self) {
        if self.introed {
            return;
        }

        for i in 0..self.particles.len() {
            let position = self.random_cube(CLOUD_SPREAD);
            self.particles[i].borrow_mut().position = position;
        }

        let points = (0..FIREFLY_COUNT)
            .map(|_| {
                let hue = 190.0 + 30.0 * self.rng.next_f64() as f32;
                PointInstance::new(self.random_cube(FIREFLY_SPREAD), color::hsl(hue, 0.0, 1.0))
            })
            .collect();
        let s = FIREFLY_SPREAD as f32;
        self.fireflies = Some(Fireflies {
            layers: [
                Node::at(Vec3::new(-0.1 * s, 0.0, -s)),
                Node::at(Vec3::new(0.0, -0.2 * s, -1.1 * s)),
                Node::at(Vec3::new(0.0, 0.0, -1.2 * s)),
            ],
            points,
        });

        self.introed = true;
        log::info!("intro finished");
    }

    fn random_cube(&mut self, half: f64) -> Vec3 {
        Vec3::new(
            self.rng.range(-half, half) as f32,
            self.rng.range(-half, half) as f32,
            self.rng.range(-half, half) as f32,
        )
    }

    /// Unwind the cloud from a quarter turn; the slow spin starts afterwards.
    pub fn start_spin(&mut self, scheduler: &mut Scheduler, now: f64) -> Result<(), TweenError> {
        let mut rotation = self.cloud.rotation();
        rotation.y = -0.4 * 3.14;
        self.cloud.set_rotation(rotation);

        if let Some(old) = self.spin_tween.take() {
            scheduler.remove(old);
        }

        let stormed = self.stormed.clone();
        let id = scheduler.insert(
            Tween::builder(self.cloud.rotation.clone())
                .easing(Easing::Quintic(EaseMode::Out))
                .to("y", 0.0)
                .duration(SPIN_DURATION)
                .on_complete(move || stormed.set(true))
                .build()?,
        );
        scheduler.start(id, now)?;
        self.spin_tween = Some(id);
        Ok(())
    }

    /// Morph the cloud into the next shape, or into `index` modulo the
    /// shape count.
    pub fn change_shape(
        &mut self,
        index: Option<usize>,
        scheduler: &mut Scheduler,
        now: f64,
    ) -> Result<(), TweenError> {
        let count = self.shapes.len();
        if count == 0 {
            return Ok(());
        }

        let q = match index {
            Some(i) => i % count,
            None => self.current.map_or(0, |q| (q + 1) % count),
        };
        self.current = Some(q);
        self.ripple_locked = index == Some(count.saturating_sub(2));

        let duration = self.morph_duration;
        let settle = duration * (self.delay_factor + 1.0);

        self.retarget_material(scheduler, q == count - 1, settle, now)?;

        let shape = &self.shapes[q];
        let easing = Easing::Exponential(EaseMode::In);
        for (i, particle) in self.particles.iter().enumerate() {
            if shape.is_empty() {
                break;
            }
            let r = i % shape.len();
            let destination = shape.vertices[r];
            let to_color = shape.colors[r];
            let from_color = particle.borrow().color;
            let delay = self.delay_factor * duration * self.rng.next_f64();

            let id = match self.particle_tweens[i] {
                Some(id) => id,
                None => {
                    let owner = particle.clone();
                    let id = scheduler.insert(
                        Tween::builder(particle.clone())
                            .easing(easing)
                            .on_complete(move || owner.borrow_mut().morphing = false)
                            .build()?,
                    );
                    self.particle_tweens[i] = Some(id);
                    id
                }
            };

            scheduler.stop(id)?;
            particle.borrow_mut().morphing = true;

            let tween = scheduler.get_mut(id).ok_or(TweenError::UnknownTween(id))?;
            tween.retarget(
                vec![
                    PropertyTrack::new("x", destination.x as f64),
                    PropertyTrack::new("y", destination.y as f64),
                    PropertyTrack::new("z", destination.z as f64),
                ],
                duration,
            )?;
            tween.set_delay(delay)?;
            let tinted = particle.clone();
            tween.set_on_update(move |eased| {
                tinted.borrow_mut().color = from_color + (to_color - from_color) * eased as f32;
            });
            scheduler.start(id, now)?;
        }

        self.burst_fireflies(scheduler, settle * 0.5, now)?;

        log::debug!("shape {} ({})", q, self.shapes[q].kind.name());
        self.morph_duration = 1000.0;
        self.delay_factor = 0.5;
        Ok(())
    }

    fn retarget_material(
        &mut self,
        scheduler: &mut Scheduler,
        qr: bool,
        settle: f64,
        now: f64,
    ) -> Result<(), TweenError> {
        let id = match self.material_tween {
            Some(id) => id,
            None => {
                let id = scheduler.insert(
                    Tween::builder(self.cloud_material.clone())
                        .easing(Easing::Exponential(EaseMode::In))
                        .build()?,
                );
                self.material_tween = Some(id);
                id
            }
        };
        scheduler.stop(id)?;

        if self.config.profile.is_mobile() {
            return Ok(());
        }

        let size = if qr {
            self.pace.borrow_mut().qrcode = Pace::QRCODE_FAST;
            self.sprite_restore_at = None;
            self.cloud_material.borrow_mut().sprite = false;
            QR_POINT_SIZE
        } else {
            self.pace.borrow_mut().qrcode = Pace::QRCODE_SLOW;
            self.sprite_restore_at = Some(now + settle);
            CLOUD_POINT_SIZE
        };

        if self.cloud_material.borrow().size != size {
            let tween = scheduler.get_mut(id).ok_or(TweenError::UnknownTween(id))?;
            tween.retarget(vec![PropertyTrack::new("size", size as f64)], settle)?;
            scheduler.start(id, now)?;
        }
        Ok(())
    }

    fn burst_fireflies(&mut self, scheduler: &mut Scheduler, leg: f64, now: f64) -> Result<(), TweenError> {
        let (fast, slow) = match self.pace_tweens {
            Some(pair) => pair,
            None => {
                let easing = Easing::Exponential(EaseMode::In);
                let fast = scheduler.insert(Tween::builder(self.pace.clone()).easing(easing).build()?);
                let slow = scheduler.insert(Tween::builder(self.pace.clone()).easing(easing).build()?);
                scheduler.chain(fast, &[slow])?;
                self.pace_tweens = Some((fast, slow));
                (fast, slow)
            }
        };
        scheduler.stop(fast)?;
        scheduler.stop(slow)?;

        for (id, pace) in [(fast, Pace::FIREFLY_FAST), (slow, Pace::FIREFLY_SLOW)] {
            let tween = scheduler.get_mut(id).ok_or(TweenError::UnknownTween(id))?;
            tween.retarget(vec![PropertyTrack::new("firefly", pace)], leg)?;
        }
        scheduler.start(fast, now)
    }

    /// Track the pointer for the scene wobble (window pixels).
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.introed || self.ripple_locked {
            return;
        }
        let (cx, cy) = self.pointer_center;
        self.wobble_target = (3e-4 * (x - cx), 1e-4 * (y - cy));
    }

    /// Follow a window resize: camera, pointer center and the post chain.
    pub fn resize<B: RenderBackend>(&mut self, backend: &mut B, post: &mut PostChain<B>, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_aspect(width, height);
        self.pointer_center = (width as f32 / 2.0, height as f32 / 2.0);
        post.resize(backend, width, height);
    }

    /// Per-frame scene motion, after the scheduler has advanced to `now`.
    pub fn update(&mut self, now: f64) {
        if self.intro_deadline.is_some_and(|deadline| now >= deadline) {
            self.intro_deadline = None;
            self.finish_intro();
        }
        if self.sprite_restore_at.is_some_and(|at| now >= at) {
            self.sprite_restore_at = None;
            self.cloud_material.borrow_mut().sprite = true;
        }

        self.ripple();

        if self.introed && self.stormed.get() && !self.ripple_locked {
            self.spin_phase += self.pace.borrow().qrcode;
            let mut rotation = self.cloud.rotation();
            rotation.y = 0.2 * self.spin_phase.sin() as f32;
            self.cloud.set_rotation(rotation);
        }

        if self.ripple_locked {
            self.wobble_target = (0.0, 0.0);
        }
        let (target_y, target_x) = self.wobble_target;
        self.scene_rotation.y += (target_y - self.scene_rotation.y) / 50.0;
        self.scene_rotation.x += (target_x - self.scene_rotation.x) / 50.0;

        if let Some(fireflies) = self.fireflies.as_ref().filter(|_| self.introed) {
            let f = self.pace.borrow().firefly as f32;
            let [a, r, l] = &fireflies.layers;
            a.set_rotation(a.rotation() - Vec3::new(f / 1.5, 0.0, 0.0));
            r.set_rotation(r.rotation() + Vec3::new(0.0, f, 0.0));
            l.set_rotation(l.rotation() + Vec3::new(0.0, 0.0, f / 2.0));
        }
    }

    /// Ripple the second-to-last shape around its vertical axis.
    fn ripple(&mut self) {
        let count = self.shapes.len();
        if count < 2 || self.current != Some(count - 2) {
            return;
        }
        let shape = &self.shapes[count - 2];
        if shape.is_empty() {
            return;
        }

        for (i, particle) in self.particles.iter().enumerate() {
            let mut particle = particle.borrow_mut();
            if particle.morphing {
                continue;
            }
            let origin = shape.vertices[i % shape.len()];
            let p = particle.position;
            let d = (p.x * p.x + p.z * p.z).sqrt();
            particle.position.y = origin.y + (d / 70.0 + self.ripple_phase).sin() * d / 30.0;
        }
        self.ripple_phase -= 0.015;
    }

    /// Everything the renderer needs for this frame.
    pub fn frame(&self) -> SceneFrame {
        let root = Mat4::from_rotation_x(self.scene_rotation.x) * Mat4::from_rotation_y(self.scene_rotation.y);

        let cloud_parent = if self.introed { root } else { root * self.intro_group.matrix() };
        let material = self.cloud_material.borrow();
        let mut layers = vec![PointLayer {
            model: cloud_parent * self.cloud.matrix(),
            size: material.size,
            sprite: material.sprite,
            additive: material.additive,
            points: self
                .particles
                .iter()
                .map(|p| {
                    let p = p.borrow();
                    PointInstance::new(p.position, p.color)
                })
                .collect(),
        }];

        if let Some(fireflies) = &self.fireflies {
            layers.extend(fireflies.layers.iter().map(|node| PointLayer {
                model: root * node.matrix(),
                size: FIREFLY_POINT_SIZE,
                sprite: true,
                additive: false,
                points: fireflies.points.clone(),
            }));
        }

        SceneFrame {
            view: self.camera.view(),
            projection: self.camera.projection(),
            fog: (!self.config.debug).then(|| Fog {
                color: color::from_hex(self.config.fog_color),
                density: self.config.fog_density,
            }),
            layers,
        }
    }

    /// Background color (the fog color, or black in debug)
    pub fn clear_color(&self) -> Vec3 {
        if self.config.debug {
            Vec3::ZERO
        } else {
            color::from_hex(self.config.fog_color)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::TweenState;

    fn director() -> Director {
        Director::new(ShowcaseConfig {
            debug: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_particle_count_is_largest_shape() {
        let d = director();
        let largest = d.shapes().iter().map(Shape::len).max().unwrap();
        assert_eq!(d.particle_count(), largest);
        assert_eq!(d.cloud().position().z, -1000.0);
    }

    #[test]
    fn test_intro_runs_and_finishes() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.start_intro(&mut scheduler, 0.0).unwrap();

        // Debug intro lasts 2000 ms; first leg of the group is 400 ms
        scheduler.update(200.0);
        d.update(200.0);
        assert!(d.intro_group().position().z > -2000.0);
        assert_eq!(d.cloud().position().z, -1000.0);

        scheduler.update(999.0);
        d.update(999.0);
        assert!(!d.is_introed());

        scheduler.update(1000.0);
        d.update(1000.0);
        assert!(d.is_introed());
        assert!(d.has_fireflies());
    }

    #[test]
    fn test_intro_legs_reach_their_marks() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.start_intro(&mut scheduler, 0.0).unwrap();

        // Each leg completes and starts the next on the same timestamp
        let mut now = 0.0;
        for _ in 0..5 {
            now += 400.0;
            scheduler.update(now);
        }
        assert_eq!(d.intro_group().position().z, 13000.0);
    }

    #[test]
    fn test_skip_intro_scatters_cloud() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.start_intro(&mut scheduler, 0.0).unwrap();
        d.skip_intro(&mut scheduler);

        assert!(d.is_introed());
        assert_eq!(d.cloud().position().z, 0.1);
        assert_eq!(scheduler.active_count(), 0);
        for i in 0..d.particle_count() {
            let p = d.particle(i).unwrap().position;
            assert!(p.abs().max_element() <= 1000.0);
        }
    }

    #[test]
    fn test_change_shape_morphs_to_vertices() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.skip_intro(&mut scheduler);
        d.change_shape(None, &mut scheduler, 0.0).unwrap();
        assert_eq!(d.current_shape(), Some(0));

        // 1500 ms plus a delay of at most 1.7 * 1500
        scheduler.update(1500.0 * 2.7 + 1.0);
        let shape = &d.shapes()[0];
        for i in (0..d.particle_count()).step_by(97) {
            let p = d.particle(i).unwrap();
            assert!((p.position - shape.vertices[i % shape.len()]).length() < 1e-2);
            assert!(!p.morphing);
        }
        // The fast leg just finished; the slow leg starts from here
        assert!((d.pace().firefly - Pace::FIREFLY_FAST).abs() < 1e-12);
        scheduler.update(1500.0 * 2.7 + 1.0 + 2025.0);
        assert!((d.pace().firefly - Pace::FIREFLY_SLOW).abs() < 1e-12);
    }

    #[test]
    fn test_qr_shape_grows_points() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.skip_intro(&mut scheduler);
        d.change_shape(Some(5), &mut scheduler, 0.0).unwrap();
        assert_eq!(d.pace().qrcode, Pace::QRCODE_FAST);

        scheduler.update(1500.0 * 2.7);
        assert_eq!(d.point_size(), 20.0);
        assert!(!d.frame().layers[0].sprite);

        d.change_shape(Some(0), &mut scheduler, 5000.0).unwrap();
        scheduler.update(5000.0 + 1000.0 * 1.5);
        d.update(5000.0 + 1000.0 * 1.5);
        assert_eq!(d.point_size(), 5.0);
        assert!(d.frame().layers[0].sprite);
    }

    #[test]
    fn test_ripple_locks_pointer() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.skip_intro(&mut scheduler);
        d.pointer_moved(0.0, 0.0);
        d.update(0.0);
        let tilted = d.scene_rotation().y;
        assert!(tilted < 0.0);

        d.change_shape(Some(4), &mut scheduler, 0.0).unwrap();
        d.pointer_moved(0.0, 0.0);
        d.update(16.0);
        // Target reset, so the tilt decays toward zero
        assert!(d.scene_rotation().y.abs() < tilted.abs());
    }

    #[test]
    fn test_spin_sets_stormed() {
        let mut d = director();
        let mut scheduler = Scheduler::init();
        d.start_spin(&mut scheduler, 0.0).unwrap();
        assert!((d.cloud().rotation().y + 0.4 * 3.14).abs() < 1e-6);
        scheduler.update(10000.0);
        assert!(d.is_stormed());
        assert_eq!(d.cloud().rotation().y, 0.0);
        assert_eq!(scheduler.state(d.spin_tween.unwrap()), Some(TweenState::Completed));
    }

    #[test]
    fn test_frame_layers() {
        let mut d = director();
        assert_eq!(d.frame().layers.len(), 1);
        assert!(d.frame().fog.is_none());
        let mut scheduler = Scheduler::init();
        d.skip_intro(&mut scheduler);
        assert_eq!(d.frame().layers.len(), 4);
    }
}
