//! Windowed showcase viewer using wgpu + winit
//!
//! Owns the frame loop: one clock feeds the tween scheduler, the director
//! and the post chain, in that order.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::color;
use crate::config::ShowcaseConfig;
use crate::error::{ShowcaseError, TweenError};
use crate::fx::{RenderBackend, SceneId};
use crate::gpu::{GpuContext, WgpuBackend};
use crate::scene::{Director, PostChain};
use crate::tween::Scheduler;

const SCENE: SceneId = SceneId(0);

/// Everything that lives as long as the window
struct ViewerState {
    backend: WgpuBackend,
    post: PostChain<WgpuBackend>,
    director: Director,
    scheduler: Scheduler,
    clock: Instant,
    last_frame: f64,
}

impl ViewerState {
    fn new(window: Arc<Window>, config: ShowcaseConfig) -> Result<Self, ShowcaseError> {
        let ctx = GpuContext::new(window)?;
        let mut backend = WgpuBackend::new(ctx);

        let mut director = Director::new(config.clone());
        backend.set_clear_color(color::to_wgpu(director.clear_color(), 1.0));
        let mut post = PostChain::new(&mut backend, SCENE, &config.fx);

        // The window may not have the requested size
        let (width, height) = backend.drawing_buffer_size();
        director.resize(&mut backend, &mut post, width, height);

        Ok(Self {
            backend,
            post,
            director,
            scheduler: Scheduler::init(),
            clock: Instant::now(),
            last_frame: 0.0,
        })
    }

    /// Milliseconds since the viewer started
    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    fn handle_key(&mut self, key: KeyCode) -> Result<(), TweenError> {
        let now = self.now();
        let scheduler = &mut self.scheduler;
        match key {
            KeyCode::Enter => {
                log::info!("intro");
                self.director.start_intro(scheduler, now)?;
            }
            KeyCode::KeyS => {
                log::info!("intro skipped");
                self.director.skip_intro(scheduler);
            }
            KeyCode::Space => self.director.change_shape(None, scheduler, now)?,
            KeyCode::KeyR => self.director.start_spin(scheduler, now)?,
            _ => {
                if let Some(index) = shape_key(key) {
                    self.director.change_shape(Some(index), scheduler, now)?;
                }
            }
        }
        if let Some(index) = self.director.current_shape() {
            log::debug!("shape {} ({})", index, self.director.shapes()[index].kind.name());
        }
        Ok(())
    }

    fn render_frame(&mut self) {
        let now = self.now();
        // Film grain time runs in seconds
        let delta = ((now - self.last_frame) / 1000.0) as f32;
        self.last_frame = now;

        self.scheduler.update(now);
        self.director.update(now);

        match self.backend.begin_frame() {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                log::error!("Render error: {}", e);
                return;
            }
        }
        self.backend.upload_scene(SCENE, &self.director.frame());
        self.post.render(&mut self.backend, delta);
        self.backend.end_frame();
    }
}

fn shape_key(key: KeyCode) -> Option<usize> {
    let digits = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
    ];
    digits.iter().position(|&d| d == key)
}

/// Application handler for winit event loop
struct ShowcaseApp {
    config: ShowcaseConfig,
    state: Option<ViewerState>,
    error: Option<ShowcaseError>,
}

impl ShowcaseApp {
    fn new(config: ShowcaseConfig) -> Self {
        Self {
            config,
            state: None,
            error: None,
        }
    }
}

impl ApplicationHandler for ShowcaseApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));

        let state = event_loop
            .create_window(window_attrs)
            .map_err(|e| ShowcaseError::gpu(format!("Failed to create window: {}", e)))
            .and_then(|window| ViewerState::new(Arc::new(window), self.config.clone()));

        match state {
            Ok(state) => {
                println!("=== Particle Showcase ===");
                println!("Controls:");
                println!("  Enter - Play intro");
                println!("  S     - Skip intro");
                println!("  Space - Next shape");
                println!("  1-6   - Select shape");
                println!("  R     - Spin");
                println!("  Mouse - Tilt scene");
                println!("  ESC   - Exit");
                println!();

                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Failed to create viewer state: {}", e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(s) => s,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                let ViewerState {
                    backend, post, director, ..
                } = state;
                director.resize(backend, post, size.width, size.height);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape {
                    event_loop.exit();
                } else if let Err(e) = state.handle_key(key) {
                    log::error!("{:?}: {}", key, e);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.director.pointer_moved(position.x as f32, position.y as f32);
            }

            WindowEvent::RedrawRequested => {
                state.render_frame();
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            // Request continuous redraw for smooth updates
            state.backend.context().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.scheduler.shutdown();
            state.post.dispose(&mut state.backend);
        }
    }
}

/// Run the showcase window until it is closed
pub fn run_viewer(config: ShowcaseConfig) -> Result<(), ShowcaseError> {
    let event_loop = EventLoop::new().map_err(|e| ShowcaseError::event_loop(format!("Failed to create event loop: {}", e)))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ShowcaseApp::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| ShowcaseError::event_loop(format!("Event loop error: {}", e)))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
