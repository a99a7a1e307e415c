//! Ping-pong render-to-texture chain

use super::backend::{CompareFunction, RenderBackend};
use super::passes::{Pass, PassKind, ShaderPass};
use super::shaders::ShaderProgram;

/// Runs an ordered list of passes over two alternating buffers.
pub struct EffectComposer<B: RenderBackend> {
    /// Always exactly two targets
    targets: Vec<B::Target>,
    /// Index of the write buffer in `targets`
    write: usize,
    passes: Vec<Pass<B>>,
    copy_pass: ShaderPass,
}

impl<B: RenderBackend> EffectComposer<B> {
    /// Build a composer around `target`, or a drawing-buffer sized one.
    pub fn new(backend: &mut B, target: Option<B::Target>) -> Self {
        let mut composer = Self {
            targets: Vec::with_capacity(2),
            write: 0,
            passes: Vec::new(),
            copy_pass: ShaderPass::new(ShaderProgram::Copy),
        };
        composer.install_targets(backend, target);
        composer
    }

    fn install_targets(&mut self, backend: &mut B, target: Option<B::Target>) {
        let first = target.unwrap_or_else(|| {
            let (width, height) = backend.drawing_buffer_size();
            backend.create_render_target("Composer A", width, height)
        });
        let (width, height) = backend.render_target_size(&first);

        for old in self.targets.drain(..) {
            backend.dispose_render_target(old);
        }

        let second = backend.create_render_target("Composer B", width, height);
        self.targets.push(first);
        self.targets.push(second);
        self.write = 0;
        log::debug!("composer targets {}x{}", width, height);
    }

    pub fn write_buffer(&self) -> &B::Target {
        &self.targets[self.write]
    }

    pub fn read_buffer(&self) -> &B::Target {
        &self.targets[1 - self.write]
    }

    pub fn swap_buffers(&mut self) {
        self.write = 1 - self.write;
    }

    pub fn passes(&self) -> &[Pass<B>] {
        &self.passes
    }

    pub fn pass_mut(&mut self, index: usize) -> Option<&mut Pass<B>> {
        self.passes.get_mut(index)
    }

    /// Append a pass sized to the drawing buffer.
    pub fn add_pass(&mut self, backend: &B, pass: impl Into<Pass<B>>) {
        let mut pass = pass.into();
        let (width, height) = backend.drawing_buffer_size();
        pass.set_size(width, height);
        self.passes.push(pass);
    }

    /// Insert a pass at `index`, clamped to the end of the list.
    pub fn insert_pass(&mut self, backend: &B, pass: impl Into<Pass<B>>, index: usize) {
        let mut pass = pass.into();
        let (width, height) = backend.drawing_buffer_size();
        pass.set_size(width, height);
        let index = index.min(self.passes.len());
        self.passes.insert(index, pass);
    }

    /// Run every enabled pass once.
    pub fn render(&mut self, backend: &mut B, delta: f32) {
        let mut mask_active = false;

        for pass in self.passes.iter_mut() {
            if !pass.flags().enabled {
                continue;
            }

            let write = &self.targets[self.write];
            let read = &self.targets[1 - self.write];
            pass.render(backend, write, read, delta, mask_active);

            if pass.flags().needs_swap {
                if mask_active {
                    // Carry the unmasked region over so the swap keeps it
                    backend.stencil_mut().set_func(CompareFunction::NotEqual, 1);
                    self.copy_pass.render(backend, write, read);
                    backend.stencil_mut().set_func(CompareFunction::Equal, 1);
                }
                self.write = 1 - self.write;
            }

            match pass.kind() {
                PassKind::Mask => mask_active = true,
                PassKind::ClearMask => mask_active = false,
                _ => {}
            }
        }
    }

    /// Replace both buffers, releasing the current ones first.
    ///
    /// Every pass is resized to the new buffer size.
    pub fn reset(&mut self, backend: &mut B, target: Option<B::Target>) {
        self.install_targets(backend, target);
        let (width, height) = backend.render_target_size(self.write_buffer());
        for pass in &mut self.passes {
            pass.set_size(width, height);
        }
    }

    pub fn set_size(&mut self, backend: &mut B, width: u32, height: u32) {
        for target in &mut self.targets {
            backend.resize_render_target(target, width, height);
        }
        for pass in &mut self.passes {
            pass.set_size(width, height);
        }
    }

    /// Release both buffers and every pass's own targets.
    pub fn dispose(mut self, backend: &mut B) {
        for mut pass in self.passes.drain(..) {
            pass.dispose(backend);
        }
        for target in self.targets.drain(..) {
            backend.dispose_render_target(target);
        }
    }
}
