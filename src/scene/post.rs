//! The showcase's post-processing chain: scene, bloom, film, focus

use crate::config::FxConfig;
use crate::fx::{BloomPass, EffectComposer, FilmPass, Pass, RenderBackend, RenderPass, SceneId, ShaderPass, ShaderProgram};

pub struct PostChain<B: RenderBackend> {
    composer: EffectComposer<B>,
    focus: usize,
}

impl<B: RenderBackend> PostChain<B> {
    pub fn new(backend: &mut B, scene: SceneId, fx: &FxConfig) -> Self {
        let mut composer = EffectComposer::new(backend, None);

        let bloom = BloomPass::with_strength(backend, fx.bloom_strength);
        let film = FilmPass::new(
            fx.film_noise,
            fx.film_scanlines,
            fx.film_scanline_count,
            fx.film_grayscale,
        );

        let (width, height) = backend.drawing_buffer_size();
        let mut focus = ShaderPass::new(ShaderProgram::Focus);
        focus.flags.render_to_screen = true;
        let uniforms = &mut focus.material.uniforms;
        uniforms.set_float("screenWidth", width as f32);
        uniforms.set_float("screenHeight", height as f32);
        uniforms.set_float("sampleDistance", fx.focus_sample_distance);
        uniforms.set_float("waveFactor", fx.focus_wave_factor);

        composer.add_pass(backend, RenderPass::new(scene));
        composer.add_pass(backend, bloom);
        composer.add_pass(backend, film);
        composer.add_pass(backend, focus);
        let focus = composer.passes().len() - 1;

        Self { composer, focus }
    }

    pub fn composer(&self) -> &EffectComposer<B> {
        &self.composer
    }

    pub fn render(&mut self, backend: &mut B, delta: f32) {
        self.composer.render(backend, delta);
    }

    /// Rebuild the buffers at the new drawing-buffer size.
    pub fn resize(&mut self, backend: &mut B, width: u32, height: u32) {
        backend.set_drawing_buffer_size(width, height);
        self.composer.reset(backend, None);

        if let Some(material) = self.composer.pass_mut(self.focus).and_then(Pass::material_mut) {
            material.uniforms.set_float("screenWidth", width as f32);
            material.uniforms.set_float("screenHeight", height as f32);
        }
    }

    pub fn dispose(self, backend: &mut B) {
        self.composer.dispose(backend);
    }
}
