//! Rendering seam consumed by the compositor
//!
//! The compositor never talks to the GPU directly. It asks a backend for
//! render targets, full-screen material draws and scene draws, and flips the
//! backend's stencil state the way a GL state cache would be flipped.

pub use wgpu::{Color, CompareFunction, StencilOperation};

use super::shaders::ShaderMaterial;

/// Backend-side scene slot rendered by render and mask passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneId(pub u32);

/// Mutable stencil state applied to every subsequent draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilState {
    pub test: bool,
    pub func: CompareFunction,
    pub reference: u32,
    pub fail: StencilOperation,
    pub depth_fail: StencilOperation,
    pub pass: StencilOperation,
    /// Value written when a draw clears the stencil buffer
    pub clear: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            test: false,
            func: CompareFunction::Always,
            reference: 0,
            fail: StencilOperation::Keep,
            depth_fail: StencilOperation::Keep,
            pass: StencilOperation::Keep,
            clear: 0,
        }
    }
}

impl StencilState {
    pub fn set_func(&mut self, func: CompareFunction, reference: u32) {
        self.func = func;
        self.reference = reference;
    }

    pub fn set_op(&mut self, fail: StencilOperation, depth_fail: StencilOperation, pass: StencilOperation) {
        self.fail = fail;
        self.depth_fail = depth_fail;
        self.pass = pass;
    }

    /// Comparison actually applied by a draw (`Always` while the test is off)
    pub fn effective_func(&self) -> CompareFunction {
        if self.test { self.func } else { CompareFunction::Always }
    }
}

/// Rendering engine abstraction.
///
/// `dest: None` means the screen. A clearing draw clears color, depth and
/// stencil of its destination first, except for buffers whose writes are
/// locked.
pub trait RenderBackend {
    type Target;

    /// Size of the screen drawing buffer in pixels
    fn drawing_buffer_size(&self) -> (u32, u32);

    fn set_drawing_buffer_size(&mut self, width: u32, height: u32);

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> Self::Target;

    fn render_target_size(&self, target: &Self::Target) -> (u32, u32);

    fn resize_render_target(&mut self, target: &mut Self::Target, width: u32, height: u32);

    /// Release a target's GPU memory.
    fn dispose_render_target(&mut self, target: Self::Target);

    fn render_scene(&mut self, scene: SceneId, dest: Option<&Self::Target>, clear: bool);

    /// Draw a full-screen quad with `material`, sampling `input`.
    fn draw_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        input: Option<&Self::Target>,
        dest: Option<&Self::Target>,
        clear: bool,
    );

    fn clear_depth(&mut self, dest: Option<&Self::Target>);

    fn clear_color(&self) -> Color;

    fn set_clear_color(&mut self, color: Color);

    fn stencil(&self) -> &StencilState;

    fn stencil_mut(&mut self) -> &mut StencilState;

    /// Lock or unlock color and depth writes.
    fn set_write_lock(&mut self, locked: bool);
}
