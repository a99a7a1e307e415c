//! wgpu implementation of the compositor's render backend
//!
//! Every draw is encoded and submitted on its own. Uniform buffers are shared
//! per program, and `queue.write_buffer` only lands before the next submit, so
//! one submit per draw keeps each draw paired with its own uniform values.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::context::GpuContext;
use super::pipelines::{PipelineCache, PipelineKey, PipelineProgram, TARGET_FORMAT};
use super::target::{DepthStencil, GpuRenderTarget};
use crate::error::ShowcaseError;
use crate::fx::{
    Blending, Color, CompareFunction, RenderBackend, SceneId, ShaderMaterial, ShaderProgram, StencilOperation,
    StencilState,
};
use crate::scene::frame::{PointInstance, SceneFrame};

/// Must match `LayerUniforms` in points.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct LayerUniforms {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    fog_color: [f32; 4],
    viewport: [f32; 2],
    size: f32,
    scale: f32,
    fog_density: f32,
    sprite: u32,
    _padding: [u32; 2],
}

struct GpuLayer {
    instances: wgpu::Buffer,
    capacity: usize,
    count: u32,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    additive: bool,
}

#[derive(Default)]
struct GpuScene {
    layers: Vec<GpuLayer>,
}

pub struct WgpuBackend {
    ctx: GpuContext,
    pipelines: PipelineCache,
    material_uniforms: HashMap<ShaderProgram, wgpu::Buffer>,
    // Bound when a material samples nothing
    fallback: GpuRenderTarget,
    screen_depth: DepthStencil,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    scenes: HashMap<SceneId, GpuScene>,
    stencil: StencilState,
    write_locked: bool,
    clear_color: Color,
}

/// Color view, depth/stencil view and color format of one destination
type Attachments<'a> = (&'a wgpu::TextureView, &'a wgpu::TextureView, wgpu::TextureFormat);

fn attachments<'a>(
    frame: &'a Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    screen_depth: &'a DepthStencil,
    screen_format: wgpu::TextureFormat,
    dest: Option<&'a GpuRenderTarget>,
) -> Option<Attachments<'a>> {
    match dest {
        Some(target) => Some((&target.color_view, target.depth_view(), TARGET_FORMAT)),
        None => frame.as_ref().map(|(_, view)| (view, &screen_depth.view, screen_format)),
    }
}

impl WgpuBackend {
    pub fn new(ctx: GpuContext) -> Self {
        let pipelines = PipelineCache::new(&ctx.device);

        let material_uniforms = ShaderProgram::ALL
            .iter()
            .map(|&program| {
                let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(program.label()),
                    size: program.uniform_block_size(),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (program, buffer)
            })
            .collect();

        let fallback = GpuRenderTarget::new(&ctx.device, "Fallback Texture", 1, 1);
        let screen_depth = DepthStencil::new(&ctx.device, "Screen", ctx.size);

        log::info!("Render backend ready ({}x{}, {:?})", ctx.size.0, ctx.size.1, ctx.format());

        Self {
            ctx,
            pipelines,
            material_uniforms,
            fallback,
            screen_depth,
            frame: None,
            scenes: HashMap::new(),
            stencil: StencilState::default(),
            write_locked: false,
            clear_color: Color::BLACK,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Acquire the next surface texture. `Ok(false)` means skip this frame.
    pub fn begin_frame(&mut self) -> Result<bool, ShowcaseError> {
        match self.ctx.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture.texture.create_view(&Default::default());
                self.frame = Some((texture, view));
                Ok(true)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.ctx.reconfigure();
                Ok(false)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout, skipping frame");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn end_frame(&mut self) {
        if let Some((texture, _)) = self.frame.take() {
            texture.present();
        }
    }

    /// Upload the point layers of `frame` under `scene`.
    pub fn upload_scene(&mut self, scene: SceneId, frame: &SceneFrame) {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let (width, height) = self.ctx.size;
        let gpu_scene = self.scenes.entry(scene).or_default();

        gpu_scene.layers.truncate(frame.layers.len());
        while gpu_scene.layers.len() < frame.layers.len() {
            let layer = new_layer(device, &self.pipelines, 1);
            gpu_scene.layers.push(layer);
        }

        let (fog_color, fog_density) = match frame.fog {
            Some(fog) => (fog.color.extend(1.0).to_array(), fog.density),
            None => ([0.0; 4], 0.0),
        };

        for (gpu_layer, layer) in gpu_scene.layers.iter_mut().zip(&frame.layers) {
            if layer.points.len() > gpu_layer.capacity {
                *gpu_layer = new_layer(device, &self.pipelines, layer.points.len().next_power_of_two());
            }
            if !layer.points.is_empty() {
                queue.write_buffer(&gpu_layer.instances, 0, bytemuck::cast_slice(&layer.points));
            }
            gpu_layer.count = layer.points.len() as u32;
            gpu_layer.additive = layer.additive;

            let uniforms = LayerUniforms {
                model_view: (frame.view * layer.model).to_cols_array_2d(),
                projection: frame.projection.to_cols_array_2d(),
                fog_color,
                viewport: [width as f32, height as f32],
                size: layer.size,
                scale: height as f32 / 2.0,
                fog_density,
                sprite: layer.sprite as u32,
                _padding: [0; 2],
            };
            queue.write_buffer(&gpu_layer.uniforms, 0, bytemuck::bytes_of(&uniforms));
        }
    }

    fn pipeline_key(&self, program: PipelineProgram, format: wgpu::TextureFormat, blending: Blending) -> PipelineKey {
        let (compare, fail, depth_fail, pass) = if self.stencil.test {
            (self.stencil.func, self.stencil.fail, self.stencil.depth_fail, self.stencil.pass)
        } else {
            let keep = StencilOperation::Keep;
            (CompareFunction::Always, keep, keep, keep)
        };
        PipelineKey {
            program,
            format,
            blending,
            stencil_compare: compare,
            stencil_fail: fail,
            stencil_depth_fail: depth_fail,
            stencil_pass: pass,
            write_color: !self.write_locked,
            write_depth: !self.write_locked,
        }
    }

    fn operations(&self, clear: bool) -> (wgpu::Operations<Color>, wgpu::Operations<f32>, wgpu::Operations<u32>) {
        // Locked buffers keep their contents even through a clearing draw
        let clear_unlocked = clear && !self.write_locked;
        let color = wgpu::Operations {
            load: if clear_unlocked {
                wgpu::LoadOp::Clear(self.clear_color)
            } else {
                wgpu::LoadOp::Load
            },
            store: wgpu::StoreOp::Store,
        };
        let depth = wgpu::Operations {
            load: if clear_unlocked { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load },
            store: wgpu::StoreOp::Store,
        };
        let stencil = wgpu::Operations {
            load: if clear {
                wgpu::LoadOp::Clear(self.stencil.clear)
            } else {
                wgpu::LoadOp::Load
            },
            store: wgpu::StoreOp::Store,
        };
        (color, depth, stencil)
    }
}

fn new_layer(device: &wgpu::Device, pipelines: &PipelineCache, capacity: usize) -> GpuLayer {
    let instances = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Point Instances"),
        size: (capacity.max(1) * std::mem::size_of::<PointInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Point Layer Uniforms"),
        size: std::mem::size_of::<LayerUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Point Layer Bind Group"),
        layout: pipelines.points_layout(),
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }],
    });
    GpuLayer {
        instances,
        capacity: capacity.max(1),
        count: 0,
        uniforms,
        bind_group,
        additive: false,
    }
}

impl RenderBackend for WgpuBackend {
    type Target = GpuRenderTarget;

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.ctx.size
    }

    fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.ctx.size {
            return;
        }
        self.ctx.resize((width, height));
        self.screen_depth = DepthStencil::new(&self.ctx.device, "Screen", self.ctx.size);
    }

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> GpuRenderTarget {
        log::debug!("creating render target {} ({}x{})", label, width, height);
        GpuRenderTarget::new(&self.ctx.device, label, width, height)
    }

    fn render_target_size(&self, target: &GpuRenderTarget) -> (u32, u32) {
        target.size()
    }

    fn resize_render_target(&mut self, target: &mut GpuRenderTarget, width: u32, height: u32) {
        target.resize(&self.ctx.device, width, height);
    }

    fn dispose_render_target(&mut self, target: GpuRenderTarget) {
        target.destroy();
    }

    fn render_scene(&mut self, scene: SceneId, dest: Option<&GpuRenderTarget>, clear: bool) {
        let screen_format = self.ctx.format();
        let Some((_, _, format)) = attachments(&self.frame, &self.screen_depth, screen_format, dest) else {
            log::trace!("no surface texture, dropping scene draw");
            return;
        };
        let (color_ops, depth_ops, stencil_ops) = self.operations(clear);
        let reference = self.stencil.reference;

        // Compile every pipeline this scene needs before borrowing them
        let keys: Vec<PipelineKey> = self
            .scenes
            .get(&scene)
            .map(|s| {
                s.layers
                    .iter()
                    .map(|layer| {
                        let blending = if layer.additive { Blending::Additive } else { Blending::Normal };
                        self.pipeline_key(PipelineProgram::Points, format, blending)
                    })
                    .collect()
            })
            .unwrap_or_default();
        for key in &keys {
            self.pipelines.get(&self.ctx.device, *key);
        }

        let Self {
            ctx,
            pipelines,
            frame,
            screen_depth,
            scenes,
            ..
        } = self;
        let Some((color_view, depth_view, _)) = attachments(frame, screen_depth, screen_format, dest) else {
            return;
        };

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: color_ops,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(depth_ops),
                    stencil_ops: Some(stencil_ops),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_stencil_reference(reference);

            if let Some(gpu_scene) = scenes.get(&scene) {
                for (layer, key) in gpu_scene.layers.iter().zip(&keys) {
                    if layer.count == 0 {
                        continue;
                    }
                    pass.set_pipeline(pipelines.get(&ctx.device, *key));
                    pass.set_bind_group(0, &layer.bind_group, &[]);
                    pass.set_vertex_buffer(0, layer.instances.slice(..));
                    pass.draw(0..6, 0..layer.count);
                }
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn draw_fullscreen(
        &mut self,
        material: &ShaderMaterial,
        input: Option<&GpuRenderTarget>,
        dest: Option<&GpuRenderTarget>,
        clear: bool,
    ) {
        let screen_format = self.ctx.format();
        let Some((_, _, format)) = attachments(&self.frame, &self.screen_depth, screen_format, dest) else {
            log::trace!("no surface texture, dropping {} draw", material.program.label());
            return;
        };
        let Some(uniform_buffer) = self.material_uniforms.get(&material.program) else {
            return;
        };
        self.ctx
            .queue
            .write_buffer(uniform_buffer, 0, &material.uniform_bytes());

        let source = input.unwrap_or(&self.fallback);
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(material.program.label()),
            layout: self.pipelines.fullscreen_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(self.pipelines.sampler()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let key = self.pipeline_key(PipelineProgram::Fullscreen(material.program), format, material.blending);
        let (color_ops, depth_ops, stencil_ops) = self.operations(clear);
        let reference = self.stencil.reference;

        let Self {
            ctx,
            pipelines,
            frame,
            screen_depth,
            ..
        } = self;
        let Some((color_view, depth_view, _)) = attachments(frame, screen_depth, screen_format, dest) else {
            return;
        };

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Fullscreen Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(material.program.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: color_ops,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(depth_ops),
                    stencil_ops: Some(stencil_ops),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipelines.get(&ctx.device, key));
            pass.set_stencil_reference(reference);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn clear_depth(&mut self, dest: Option<&GpuRenderTarget>) {
        if self.write_locked {
            return;
        }
        let screen_format = self.ctx.format();
        let Some((color_view, depth_view, _)) = attachments(&self.frame, &self.screen_depth, screen_format, dest)
        else {
            return;
        };

        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Clear Depth Encoder"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Depth"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
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
        self.write_locked = locked;
    }
}
