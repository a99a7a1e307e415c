//! Post-processing passes
//!
//! Every pass renders with `(write, read)` buffers handed over by the
//! composer. Passes that leave their output in the write buffer set
//! `needs_swap` so the composer flips the pair afterwards; passes that draw
//! over the read buffer in place (scene render, bloom) do not.

use super::backend::{Color, CompareFunction, RenderBackend, SceneId, StencilOperation};
use super::shaders::{
    BLUR_STEP, Blending, DIFFUSE_SLOT, MAX_KERNEL_SIZE, ShaderMaterial, ShaderProgram, UniformValue,
    build_kernel,
};

/// Flags shared by every pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassFlags {
    pub enabled: bool,
    pub needs_swap: bool,
    pub clear: bool,
    pub render_to_screen: bool,
    /// Last size pushed by the composer
    pub size: (u32, u32),
}

impl Default for PassFlags {
    fn default() -> Self {
        Self {
            enabled: true,
            needs_swap: true,
            clear: false,
            render_to_screen: false,
            size: (0, 0),
        }
    }
}

/// Tag of a [`Pass`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Render,
    Mask,
    ClearMask,
    Shader,
    Bloom,
    Film,
}

/// Renders a scene over the read buffer (or onto the screen).
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub flags: PassFlags,
    pub scene: SceneId,
    /// Clear color used for this pass only
    pub clear_color: Option<Color>,
    pub clear_depth: bool,
}

impl RenderPass {
    pub fn new(scene: SceneId) -> Self {
        Self {
            flags: PassFlags {
                clear: true,
                needs_swap: false,
                ..Default::default()
            },
            scene,
            clear_color: None,
            clear_depth: false,
        }
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = Some(color);
        self
    }

    fn render<B: RenderBackend>(&mut self, backend: &mut B, read: &B::Target) {
        let dest = (!self.flags.render_to_screen).then_some(read);

        let previous = self.clear_color.map(|color| {
            let previous = backend.clear_color();
            backend.set_clear_color(color);
            previous
        });

        if self.clear_depth {
            backend.clear_depth(dest);
        }
        backend.render_scene(self.scene, dest, self.flags.clear);

        if let Some(previous) = previous {
            backend.set_clear_color(previous);
        }
    }
}

/// Stamps a scene's silhouette into the stencil buffer of both targets.
#[derive(Debug, Clone)]
pub struct MaskPass {
    pub flags: PassFlags,
    pub scene: SceneId,
    /// Mark everything outside the silhouette instead
    pub inverse: bool,
}

impl MaskPass {
    pub fn new(scene: SceneId) -> Self {
        Self {
            flags: PassFlags {
                clear: true,
                needs_swap: false,
                ..Default::default()
            },
            scene,
            inverse: false,
        }
    }

    fn render<B: RenderBackend>(&mut self, backend: &mut B, write: &B::Target, read: &B::Target) {
        let mut stamp = StencilStamp::begin(backend, self.inverse);
        let backend = stamp.backend();
        backend.render_scene(self.scene, Some(read), self.flags.clear);
        backend.render_scene(self.scene, Some(write), self.flags.clear);
    }
}

/// Write-locked stencil stamping scope.
///
/// While alive, color and depth writes are locked and every fragment
/// replaces the stencil with the mask value. Dropping it unlocks writes and
/// leaves the stencil test comparing `Equal 1` with `Keep` ops.
pub struct StencilStamp<'a, B: RenderBackend> {
    backend: &'a mut B,
}

impl<'a, B: RenderBackend> StencilStamp<'a, B> {
    pub fn begin(backend: &'a mut B, inverse: bool) -> Self {
        let (write_value, clear_value) = if inverse { (0, 1) } else { (1, 0) };

        backend.set_write_lock(true);
        let stencil = backend.stencil_mut();
        stencil.test = true;
        stencil.set_op(
            StencilOperation::Replace,
            StencilOperation::Replace,
            StencilOperation::Replace,
        );
        stencil.set_func(CompareFunction::Always, write_value);
        stencil.clear = clear_value;

        Self { backend }
    }

    pub fn backend(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: RenderBackend> Drop for StencilStamp<'_, B> {
    fn drop(&mut self) {
        self.backend.set_write_lock(false);
        let stencil = self.backend.stencil_mut();
        stencil.set_func(CompareFunction::Equal, 1);
        stencil.set_op(StencilOperation::Keep, StencilOperation::Keep, StencilOperation::Keep);
    }
}

#[derive(Debug, Clone)]
pub struct ClearMaskPass {
    pub flags: PassFlags,
}

impl ClearMaskPass {
    pub fn new() -> Self {
        Self {
            flags: PassFlags {
                needs_swap: false,
                ..Default::default()
            },
        }
    }
}

impl Default for ClearMaskPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Full-screen material applied to the read buffer
#[derive(Debug, Clone)]
pub struct ShaderPass {
    pub flags: PassFlags,
    pub material: ShaderMaterial,
    /// Uniform the read buffer is bound to
    pub texture_slot: String,
}

impl ShaderPass {
    pub fn new(program: ShaderProgram) -> Self {
        Self::from_material(ShaderMaterial::new(program))
    }

    pub fn from_material(material: ShaderMaterial) -> Self {
        Self {
            flags: PassFlags::default(),
            material,
            texture_slot: DIFFUSE_SLOT.to_string(),
        }
    }

    pub fn with_texture_slot(mut self, slot: &str) -> Self {
        self.texture_slot = slot.to_string();
        self
    }

    pub(crate) fn render<B: RenderBackend>(&mut self, backend: &mut B, write: &B::Target, read: &B::Target) {
        let input = self.material.uniforms.contains(&self.texture_slot).then_some(read);
        let dest = (!self.flags.render_to_screen).then_some(write);
        backend.draw_fullscreen(&self.material, input, dest, self.flags.clear);
    }
}

/// Blurs the read buffer at low resolution and adds it back on top.
pub struct BloomPass<T> {
    pub flags: PassFlags,
    targets: Option<(T, T)>,
    convolution: ShaderMaterial,
    copy: ShaderMaterial,
}

impl<T> BloomPass<T> {
    pub const DEFAULT_STRENGTH: f32 = 1.0;
    pub const DEFAULT_KERNEL_SIZE: u32 = MAX_KERNEL_SIZE as u32;
    pub const DEFAULT_SIGMA: f32 = 4.0;
    pub const DEFAULT_RESOLUTION: u32 = 256;

    pub const BLUR_X: [f32; 2] = [BLUR_STEP, 0.0];
    pub const BLUR_Y: [f32; 2] = [0.0, BLUR_STEP];

    pub fn new<B>(backend: &mut B, strength: f32, kernel_size: u32, sigma: f32, resolution: u32) -> Self
    where
        B: RenderBackend<Target = T>,
    {
        let resolution = resolution.max(1);
        let target_x = backend.create_render_target("Bloom X", resolution, resolution);
        let target_y = backend.create_render_target("Bloom Y", resolution, resolution);

        let mut copy = ShaderMaterial::new(ShaderProgram::Copy).with_blending(Blending::Additive);
        copy.uniforms.set_float("opacity", strength);

        let mut convolution = ShaderMaterial::new(ShaderProgram::Convolution).with_kernel_size(kernel_size);
        convolution
            .uniforms
            .set("uImageIncrement", UniformValue::Vec2(Self::BLUR_X));
        convolution
            .uniforms
            .set("cKernel", UniformValue::FloatArray(build_kernel(sigma)));

        log::debug!(
            "bloom pass: strength {}, {} taps, sigma {}, {}px",
            strength,
            convolution.kernel_size,
            sigma,
            resolution
        );

        Self {
            flags: PassFlags {
                needs_swap: false,
                ..Default::default()
            },
            targets: Some((target_x, target_y)),
            convolution,
            copy,
        }
    }

    /// Bloom with the given strength and default blur settings
    pub fn with_strength<B>(backend: &mut B, strength: f32) -> Self
    where
        B: RenderBackend<Target = T>,
    {
        Self::new(
            backend,
            strength,
            Self::DEFAULT_KERNEL_SIZE,
            Self::DEFAULT_SIGMA,
            Self::DEFAULT_RESOLUTION,
        )
    }

    pub fn strength(&self) -> f32 {
        self.copy.uniforms.float("opacity")
    }

    pub fn convolution(&self) -> &ShaderMaterial {
        &self.convolution
    }

    fn render<B>(&mut self, backend: &mut B, read: &T, mask_active: bool)
    where
        B: RenderBackend<Target = T>,
    {
        let Some((target_x, target_y)) = &self.targets else {
            log::warn!("bloom pass rendered after dispose");
            return;
        };

        if mask_active {
            backend.stencil_mut().test = false;
        }

        self.convolution
            .uniforms
            .set("uImageIncrement", UniformValue::Vec2(Self::BLUR_X));
        backend.draw_fullscreen(&self.convolution, Some(read), Some(target_x), true);

        self.convolution
            .uniforms
            .set("uImageIncrement", UniformValue::Vec2(Self::BLUR_Y));
        backend.draw_fullscreen(&self.convolution, Some(target_x), Some(target_y), true);

        if mask_active {
            backend.stencil_mut().test = true;
        }

        backend.draw_fullscreen(&self.copy, Some(target_y), Some(read), self.flags.clear);
    }

    fn dispose<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Target = T>,
    {
        if let Some((target_x, target_y)) = self.targets.take() {
            backend.dispose_render_target(target_x);
            backend.dispose_render_target(target_y);
        }
    }
}

/// Film grain and scanlines with an accumulating clock
#[derive(Debug, Clone)]
pub struct FilmPass {
    pub flags: PassFlags,
    pub material: ShaderMaterial,
}

impl FilmPass {
    pub fn new(noise_intensity: f32, scanline_intensity: f32, scanline_count: f32, grayscale: bool) -> Self {
        let mut material = ShaderMaterial::new(ShaderProgram::Film);
        let uniforms = &mut material.uniforms;
        uniforms.set_float("nIntensity", noise_intensity);
        uniforms.set_float("sIntensity", scanline_intensity);
        uniforms.set_float("sCount", scanline_count);
        uniforms.set("grayscale", UniformValue::Bool(grayscale));

        Self {
            flags: PassFlags::default(),
            material,
        }
    }

    pub fn time(&self) -> f32 {
        self.material.uniforms.float("time")
    }

    fn render<B: RenderBackend>(&mut self, backend: &mut B, write: &B::Target, read: &B::Target, delta: f32) {
        let time = self.time() + delta;
        self.material.uniforms.set_float("time", time);

        let dest = (!self.flags.render_to_screen).then_some(write);
        backend.draw_fullscreen(&self.material, Some(read), dest, self.flags.clear);
    }
}

impl Default for FilmPass {
    fn default() -> Self {
        let defaults = ShaderProgram::Film.uniforms();
        Self::new(
            defaults.float("nIntensity"),
            defaults.float("sIntensity"),
            defaults.float("sCount"),
            defaults.flag("grayscale"),
        )
    }
}

/// One step of the post-processing chain
pub enum Pass<B: RenderBackend> {
    Render(RenderPass),
    Mask(MaskPass),
    ClearMask(ClearMaskPass),
    Shader(ShaderPass),
    Bloom(BloomPass<B::Target>),
    Film(FilmPass),
}

impl<B: RenderBackend> Pass<B> {
    pub fn kind(&self) -> PassKind {
        match self {
            Pass::Render(_) => PassKind::Render,
            Pass::Mask(_) => PassKind::Mask,
            Pass::ClearMask(_) => PassKind::ClearMask,
            Pass::Shader(_) => PassKind::Shader,
            Pass::Bloom(_) => PassKind::Bloom,
            Pass::Film(_) => PassKind::Film,
        }
    }

    pub fn flags(&self) -> &PassFlags {
        match self {
            Pass::Render(p) => &p.flags,
            Pass::Mask(p) => &p.flags,
            Pass::ClearMask(p) => &p.flags,
            Pass::Shader(p) => &p.flags,
            Pass::Bloom(p) => &p.flags,
            Pass::Film(p) => &p.flags,
        }
    }

    pub fn flags_mut(&mut self) -> &mut PassFlags {
        match self {
            Pass::Render(p) => &mut p.flags,
            Pass::Mask(p) => &mut p.flags,
            Pass::ClearMask(p) => &mut p.flags,
            Pass::Shader(p) => &mut p.flags,
            Pass::Bloom(p) => &mut p.flags,
            Pass::Film(p) => &mut p.flags,
        }
    }

    /// Material of a full-screen pass, if it has exactly one
    pub fn material_mut(&mut self) -> Option<&mut ShaderMaterial> {
        match self {
            Pass::Shader(p) => Some(&mut p.material),
            Pass::Film(p) => Some(&mut p.material),
            _ => None,
        }
    }

    pub fn render(
        &mut self,
        backend: &mut B,
        write: &B::Target,
        read: &B::Target,
        delta: f32,
        mask_active: bool,
    ) {
        match self {
            Pass::Render(p) => p.render(backend, read),
            Pass::Mask(p) => p.render(backend, write, read),
            Pass::ClearMask(_) => backend.stencil_mut().test = false,
            Pass::Shader(p) => p.render(backend, write, read),
            Pass::Bloom(p) => p.render(backend, read, mask_active),
            Pass::Film(p) => p.render(backend, write, read, delta),
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.flags_mut().size = (width, height);
    }

    /// Release any targets the pass owns.
    pub fn dispose(&mut self, backend: &mut B) {
        if let Pass::Bloom(p) = self {
            p.dispose(backend);
        }
    }
}

impl<B: RenderBackend> From<RenderPass> for Pass<B> {
    fn from(pass: RenderPass) -> Self {
        Pass::Render(pass)
    }
}

impl<B: RenderBackend> From<MaskPass> for Pass<B> {
    fn from(pass: MaskPass) -> Self {
        Pass::Mask(pass)
    }
}

impl<B: RenderBackend> From<ClearMaskPass> for Pass<B> {
    fn from(pass: ClearMaskPass) -> Self {
        Pass::ClearMask(pass)
    }
}

impl<B: RenderBackend> From<ShaderPass> for Pass<B> {
    fn from(pass: ShaderPass) -> Self {
        Pass::Shader(pass)
    }
}

impl<B: RenderBackend> From<BloomPass<B::Target>> for Pass<B> {
    fn from(pass: BloomPass<B::Target>) -> Self {
        Pass::Bloom(pass)
    }
}

impl<B: RenderBackend> From<FilmPass> for Pass<B> {
    fn from(pass: FilmPass) -> Self {
        Pass::Film(pass)
    }
}
