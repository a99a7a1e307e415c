//! Tests for the compositor and its passes, against a recording backend

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::FxConfig;
use crate::fx::{
    Blending, BloomPass, ClearMaskPass, Color, CompareFunction, EffectComposer, FilmPass, MaskPass, Pass, PassKind,
    RenderBackend, RenderPass, SceneId, ShaderMaterial, ShaderPass, ShaderProgram, StencilOperation, StencilState,
};
use crate::scene::PostChain;
use crate::scene::nodes::Vector;
use crate::tween::{Scheduler, Tween};

/// Stand-in render target: an id plus a size
#[derive(Debug)]
struct MockTarget {
    id: u32,
    size: (u32, u32),
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create { id: u32, label: String, size: (u32, u32) },
    Resize { id: u32, size: (u32, u32) },
    Dispose(u32),
    Scene {
        dest: Option<u32>,
        clear: bool,
        stencil: StencilState,
        locked: bool,
        clear_color: Color,
    },
    Draw {
        material: ShaderMaterial,
        input: Option<u32>,
        dest: Option<u32>,
        clear: bool,
        stencil: StencilState,
    },
    ClearDepth(Option<u32>),
}

/// Records every backend call instead of drawing
struct RecordingBackend {
    size: (u32, u32),
    next_id: u32,
    calls: Vec<Call>,
    stencil: StencilState,
    locked: bool,
    clear_color: Color,
}

impl RecordingBackend {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            next_id: 0,
            calls: Vec::new(),
            stencil: StencilState::default(),
            locked: false,
            clear_color: Color::BLACK,
        }
    }

    /// (program, input, dest) of every full-screen draw
    fn draws(&self) -> Vec<(ShaderProgram, Option<u32>, Option<u32>)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw {
                    material, input, dest, ..
                } => Some((material.program, *input, *dest)),
                _ => None,
            })
            .collect()
    }

    fn draw_calls(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Draw { .. })).collect()
    }
}

impl RenderBackend for RecordingBackend {
    type Target = MockTarget;

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> MockTarget {
        let id = self.next_id;
        self.next_id += 1;
        self.calls.push(Call::Create {
            id,
            label: label.to_string(),
            size: (width, height),
        });
        MockTarget {
            id,
            size: (width, height),
        }
    }

    fn render_target_size(&self, target: &MockTarget) -> (u32, u32) {
        target.size
    }

    fn resize_render_target(&mut self, target: &mut MockTarget, width: u32, height: u32) {
        target.size = (width, height);
        self.calls.push(Call::Resize {
            id: target.id,
            size: (width, height),
        });
    }

    fn dispose_render_target(&mut self, target: MockTarget) {
        self.calls.push(Call::Dispose(target.id));
    }

    fn render_scene(&mut self, _scene: SceneId, dest: Option<&MockTarget>, clear: bool) {
        self.calls.push(Call::Scene {
            dest: dest.map(|t| t.id),
            clear,
            stencil: self.stencil,
            locked: self.locked,
            clear_color: self.clear_color,
        });
    }

    fn draw_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        input: Option<&MockTarget>,
        dest: Option<&MockTarget>,
        clear: bool,
    ) {
        self.calls.push(Call::Draw {
            material: material.clone(),
            input: input.map(|t| t.id),
            dest: dest.map(|t| t.id),
            clear,
            stencil: self.stencil,
        });
    }

    fn clear_depth(&mut self, dest: Option<&MockTarget>) {
        self.calls.push(Call::ClearDepth(dest.map(|t| t.id)));
    }

    fn clear_color(&self) -> Color {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn stencil(&self) -> &StencilState {
        &self.stencil
    }

    fn stencil_mut(&mut self) -> &mut StencilState {
        &mut self.stencil
    }

    fn set_write_lock(&mut self, locked: bool) {
        self.locked = locked;
    }
}

const SCENE: SceneId = SceneId(7);

fn composer(backend: &mut RecordingBackend) -> EffectComposer<RecordingBackend> {
    let composer = EffectComposer::new(backend, None);
    backend.calls.clear();
    composer
}

#[test]
fn test_main() {
    crate::main();
}

#[test]
fn test_composer_allocates_two_matching_targets() {
    let mut backend = RecordingBackend::new(800, 600);
    let composer = EffectComposer::new(&mut backend, None);

    assert_eq!(
        backend.calls,
        vec![
            Call::Create {
                id: 0,
                label: "Composer A".to_string(),
                size: (800, 600)
            },
            Call::Create {
                id: 1,
                label: "Composer B".to_string(),
                size: (800, 600)
            },
        ]
    );
    assert_eq!(composer.write_buffer().id, 0);
    assert_eq!(composer.read_buffer().id, 1);
}

#[test]
fn test_composer_adopts_supplied_target_size() {
    let mut backend = RecordingBackend::new(800, 600);
    let target = backend.create_render_target("Custom", 320, 200);
    let composer = EffectComposer::new(&mut backend, Some(target));

    assert_eq!(composer.write_buffer().id, 0);
    assert_eq!(composer.read_buffer().size, (320, 200));
}

#[test]
fn test_swapping_passes_ping_pong() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));

    composer.render(&mut backend, 0.016);

    // Each pass reads what the previous one wrote
    assert_eq!(
        backend.draws(),
        vec![
            (ShaderProgram::Copy, Some(1), Some(0)),
            (ShaderProgram::Copy, Some(0), Some(1)),
            (ShaderProgram::Copy, Some(1), Some(0)),
        ]
    );
    assert_eq!(composer.read_buffer().id, 0);
}

#[test]
fn test_render_pass_draws_over_read_buffer() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, RenderPass::new(SCENE));
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));

    composer.render(&mut backend, 0.0);

    assert!(matches!(
        backend.calls[0],
        Call::Scene {
            dest: Some(1),
            clear: true,
            ..
        }
    ));
    assert_eq!(backend.draws(), vec![(ShaderProgram::Copy, Some(1), Some(0))]);
}

#[test]
fn test_render_pass_clear_color_is_temporary() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let red = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    let mut pass = RenderPass::new(SCENE).with_clear_color(red);
    pass.clear_depth = true;
    composer.add_pass(&backend, pass);

    composer.render(&mut backend, 0.0);

    assert_eq!(backend.calls[0], Call::ClearDepth(Some(1)));
    assert!(matches!(&backend.calls[1], Call::Scene { clear_color, .. } if *clear_color == red));
    assert_eq!(backend.clear_color, Color::BLACK);
}

#[test]
fn test_disabled_pass_is_skipped_without_swap() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let mut disabled = ShaderPass::new(ShaderProgram::Film);
    disabled.flags.enabled = false;
    composer.add_pass(&backend, disabled);
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));

    composer.render(&mut backend, 0.0);

    assert_eq!(backend.draws(), vec![(ShaderProgram::Copy, Some(1), Some(0))]);
}

#[test]
fn test_masked_region_is_carried_across_swap() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, MaskPass::new(SCENE));
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Film));
    composer.add_pass(&backend, ClearMaskPass::new());

    composer.render(&mut backend, 0.0);

    // Mask stamped into read then write, with writes locked
    let stamped: Vec<_> = backend
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Scene {
                dest, stencil, locked, ..
            } => Some((*dest, stencil.test, stencil.func, stencil.reference, *locked)),
            _ => None,
        })
        .collect();
    assert_eq!(
        stamped,
        vec![
            (Some(1), true, CompareFunction::Always, 1, true),
            (Some(0), true, CompareFunction::Always, 1, true),
        ]
    );

    let draws = backend.draw_calls();
    assert_eq!(draws.len(), 2);
    match (draws[0], draws[1]) {
        (
            Call::Draw {
                material: film,
                input: Some(1),
                dest: Some(0),
                stencil: inside,
                ..
            },
            Call::Draw {
                material: copy,
                input: Some(1),
                dest: Some(0),
                stencil: outside,
                ..
            },
        ) => {
            assert_eq!(film.program, ShaderProgram::Film);
            assert_eq!((inside.func, inside.reference), (CompareFunction::Equal, 1));
            assert_eq!(inside.pass, StencilOperation::Keep);
            assert_eq!(copy.program, ShaderProgram::Copy);
            assert_eq!((outside.func, outside.reference), (CompareFunction::NotEqual, 1));
        }
        other => panic!("unexpected draws {:?}", other),
    }

    // Clear mask leaves the test off and the equal func in place
    assert!(!backend.stencil.test);
    assert_eq!(backend.stencil.func, CompareFunction::Equal);
    assert!(!backend.locked);
    assert_eq!(composer.read_buffer().id, 0);
}

#[test]
fn test_unmasked_swap_does_not_copy() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, MaskPass::new(SCENE));
    composer.add_pass(&backend, ClearMaskPass::new());
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Film));

    composer.render(&mut backend, 0.0);

    assert_eq!(backend.draws(), vec![(ShaderProgram::Film, Some(1), Some(0))]);
}

#[test]
fn test_inverse_mask_swaps_stamp_values() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let mut mask = MaskPass::new(SCENE);
    mask.inverse = true;
    composer.add_pass(&backend, mask);

    composer.render(&mut backend, 0.0);

    match &backend.calls[0] {
        Call::Scene { stencil, clear, .. } => {
            assert!(*clear);
            assert_eq!(stencil.reference, 0);
            assert_eq!(stencil.clear, 1);
            assert_eq!(stencil.pass, StencilOperation::Replace);
        }
        other => panic!("unexpected call {:?}", other),
    }
    assert_eq!(backend.stencil.reference, 1);
    assert_eq!(backend.stencil.fail, StencilOperation::Keep);
}

#[test]
fn test_bloom_blurs_then_adds_onto_read() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let bloom = BloomPass::with_strength(&mut backend, 0.75);
    assert_eq!(bloom.strength(), 0.75);
    assert_eq!(bloom.convolution().uniforms.floats("cKernel").len(), 25);
    composer.add_pass(&backend, bloom);
    backend.calls.clear();

    composer.render(&mut backend, 0.0);

    assert_eq!(
        backend.draws(),
        vec![
            (ShaderProgram::Convolution, Some(1), Some(2)),
            (ShaderProgram::Convolution, Some(2), Some(3)),
            (ShaderProgram::Copy, Some(3), Some(1)),
        ]
    );
    let draws = backend.draw_calls();
    match (draws[0], draws[1], draws[2]) {
        (
            Call::Draw { material: x, clear: cx, .. },
            Call::Draw { material: y, clear: cy, .. },
            Call::Draw { material: add, clear, .. },
        ) => {
            assert_eq!(x.uniforms.vec2("uImageIncrement"), BloomPass::<MockTarget>::BLUR_X);
            assert_eq!(y.uniforms.vec2("uImageIncrement"), BloomPass::<MockTarget>::BLUR_Y);
            assert!(*cx && *cy);
            assert_eq!(add.blending, Blending::Additive);
            assert_eq!(add.uniforms.float("opacity"), 0.75);
            assert!(!*clear);
        }
        other => panic!("unexpected draws {:?}", other),
    }
    // Bloom draws in place
    assert_eq!(composer.read_buffer().id, 1);
}

#[test]
fn test_bloom_blurs_outside_the_mask() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, MaskPass::new(SCENE));
    let bloom = BloomPass::with_strength(&mut backend, 1.0);
    composer.add_pass(&backend, bloom);

    composer.render(&mut backend, 0.0);

    let tests: Vec<bool> = backend
        .draw_calls()
        .iter()
        .map(|c| match c {
            Call::Draw { stencil, .. } => stencil.test,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(tests, vec![false, false, true]);
    assert!(backend.stencil.test);
}

#[test]
fn test_film_time_accumulates() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, FilmPass::new(0.5, 0.5, 1500.0, false));

    composer.render(&mut backend, 0.25);
    composer.render(&mut backend, 0.5);

    let times: Vec<f32> = backend
        .draw_calls()
        .iter()
        .map(|c| match c {
            Call::Draw { material, .. } => material.uniforms.float("time"),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(times, vec![0.25, 0.75]);

    let film = FilmPass::default();
    assert_eq!(film.material.uniforms.float("sCount"), 4096.0);
    assert!(film.material.uniforms.flag("grayscale"));
}

#[test]
fn test_render_to_screen_targets_the_screen() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let mut pass = ShaderPass::new(ShaderProgram::Focus);
    pass.flags.render_to_screen = true;
    composer.add_pass(&backend, pass);

    composer.render(&mut backend, 0.0);

    assert_eq!(backend.draws(), vec![(ShaderProgram::Focus, Some(1), None)]);
}

#[test]
fn test_texture_slot_must_be_declared() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy).with_texture_slot("tMissing"));

    composer.render(&mut backend, 0.0);

    assert_eq!(backend.draws(), vec![(ShaderProgram::Copy, None, Some(0))]);
}

#[test]
fn test_reset_releases_before_replacing() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, ShaderPass::new(ShaderProgram::Copy));
    composer.swap_buffers();

    backend.set_drawing_buffer_size(1024, 768);
    composer.reset(&mut backend, None);

    assert_eq!(
        backend.calls,
        vec![
            Call::Create {
                id: 2,
                label: "Composer A".to_string(),
                size: (1024, 768)
            },
            Call::Dispose(0),
            Call::Dispose(1),
            Call::Create {
                id: 3,
                label: "Composer B".to_string(),
                size: (1024, 768)
            },
        ]
    );
    assert_eq!(composer.write_buffer().id, 2);
    assert_eq!(composer.passes()[0].flags().size, (1024, 768));
}

#[test]
fn test_set_size_reaches_targets_and_passes() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, RenderPass::new(SCENE));
    composer.add_pass(&backend, FilmPass::default());
    assert_eq!(composer.passes()[1].flags().size, (800, 600));

    composer.set_size(&mut backend, 640, 480);

    assert_eq!(
        backend.calls,
        vec![
            Call::Resize { id: 0, size: (640, 480) },
            Call::Resize { id: 1, size: (640, 480) },
        ]
    );
    assert!(composer.passes().iter().all(|p| p.flags().size == (640, 480)));
}

#[test]
fn test_insert_pass_clamps_index() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    composer.add_pass(&backend, FilmPass::default());
    composer.insert_pass(&backend, ClearMaskPass::new(), 99);
    composer.insert_pass(&backend, RenderPass::new(SCENE), 0);

    let kinds: Vec<PassKind> = composer.passes().iter().map(Pass::kind).collect();
    assert_eq!(kinds, vec![PassKind::Render, PassKind::Film, PassKind::ClearMask]);
    assert_eq!(composer.passes()[0].flags().size, (800, 600));
}

#[test]
fn test_dispose_releases_everything() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut composer = composer(&mut backend);
    let bloom = BloomPass::with_strength(&mut backend, 1.0);
    composer.add_pass(&backend, bloom);
    backend.calls.clear();

    composer.dispose(&mut backend);

    assert_eq!(
        backend.calls,
        vec![Call::Dispose(2), Call::Dispose(3), Call::Dispose(0), Call::Dispose(1)]
    );
}

#[test]
fn test_post_chain_order() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut post = PostChain::new(&mut backend, SCENE, &FxConfig::default());
    backend.calls.clear();

    post.render(&mut backend, 0.016);

    assert!(matches!(backend.calls[0], Call::Scene { dest: Some(1), .. }));
    assert_eq!(
        backend.draws(),
        vec![
            (ShaderProgram::Convolution, Some(1), Some(2)),
            (ShaderProgram::Convolution, Some(2), Some(3)),
            (ShaderProgram::Copy, Some(3), Some(1)),
            (ShaderProgram::Film, Some(1), Some(0)),
            (ShaderProgram::Focus, Some(0), None),
        ]
    );
}

#[test]
fn test_post_chain_resize_updates_focus() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut post = PostChain::new(&mut backend, SCENE, &FxConfig::default());
    backend.calls.clear();

    post.resize(&mut backend, 1024, 768);

    assert_eq!(backend.drawing_buffer_size(), (1024, 768));
    assert!(backend.calls.contains(&Call::Dispose(0)));
    assert!(backend.calls.contains(&Call::Dispose(1)));
    let passes = post.composer().passes();
    assert!(passes.iter().all(|p| p.flags().size == (1024, 768)));
    match passes.last() {
        Some(Pass::Shader(focus)) => {
            assert_eq!(focus.material.program, ShaderProgram::Focus);
            assert_eq!(focus.material.uniforms.float("screenWidth"), 1024.0);
            assert_eq!(focus.material.uniforms.float("screenHeight"), 768.0);
        }
        _ => panic!("focus pass missing"),
    }
}

#[test]
fn test_chained_tween_starts_at_completion() {
    let first_target = Rc::new(RefCell::new(Vector::default()));
    let second_target = Rc::new(RefCell::new(Vector::default()));
    let mut scheduler = Scheduler::init();

    let first = scheduler.insert(
        Tween::builder(first_target.clone())
            .to("x", 10.0)
            .duration(100.0)
            .build()
            .unwrap(),
    );
    let second = scheduler.insert(
        Tween::builder(second_target.clone())
            .to("x", 20.0)
            .duration(100.0)
            .build()
            .unwrap(),
    );
    scheduler.chain(first, &[second]).unwrap();
    scheduler.start(first, 0.0).unwrap();

    scheduler.update(100.0);
    assert_eq!(first_target.borrow().0.x, 10.0);
    assert!(scheduler.is_active(second));
    // Started, but not advanced within the same update
    assert_eq!(second_target.borrow().0.x, 0.0);
    assert_eq!(scheduler.get(second).map(Tween::start_time), Some(100.0));

    scheduler.update(150.0);
    assert!((second_target.borrow().0.x - 10.0).abs() < 1e-4);

    scheduler.update(200.0);
    assert_eq!(second_target.borrow().0.x, 20.0);
    assert!(!scheduler.update(250.0));
}

#[test]
fn test_stopped_tween_runs_no_callbacks() {
    let target = Rc::new(RefCell::new(Vector::default()));
    let calls = Rc::new(Cell::new(0));
    let mut scheduler = Scheduler::init();

    let counter = calls.clone();
    let id = scheduler.insert(
        Tween::builder(target.clone())
            .to("y", 5.0)
            .duration(100.0)
            .on_update(move |_| counter.set(counter.get() + 1))
            .build()
            .unwrap(),
    );
    scheduler.start(id, 0.0).unwrap();
    scheduler.update(50.0);
    assert_eq!(calls.get(), 1);

    scheduler.stop(id).unwrap();
    scheduler.update(60.0);
    scheduler.update(200.0);

    assert_eq!(calls.get(), 1);
    assert!(!scheduler.is_active(id));
    assert!((target.borrow().0.y - 2.5).abs() < 1e-4);
}
