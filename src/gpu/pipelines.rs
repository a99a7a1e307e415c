//! Render pipelines, built lazily per fixed-function state

use std::collections::HashMap;

use crate::fx::{Blending, CompareFunction, ShaderProgram, StencilOperation};

/// Color format of every off-screen target
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Depth/stencil format of every attachment, screen included
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineProgram {
    Fullscreen(ShaderProgram),
    Points,
}

/// Everything that has to be baked into a wgpu pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: PipelineProgram,
    pub format: wgpu::TextureFormat,
    pub blending: Blending,
    pub stencil_compare: CompareFunction,
    pub stencil_fail: StencilOperation,
    pub stencil_depth_fail: StencilOperation,
    pub stencil_pass: StencilOperation,
    pub write_color: bool,
    pub write_depth: bool,
}

fn blend_state(blending: Blending) -> wgpu::BlendState {
    match blending {
        Blending::Replace => wgpu::BlendState::REPLACE,
        Blending::Normal => wgpu::BlendState::ALPHA_BLENDING,
        Blending::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

pub struct PipelineCache {
    modules: HashMap<PipelineProgram, wgpu::ShaderModule>,
    fullscreen_layout: wgpu::BindGroupLayout,
    fullscreen_pipeline_layout: wgpu::PipelineLayout,
    points_layout: wgpu::BindGroupLayout,
    points_pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device) -> Self {
        let mut modules = HashMap::new();
        for program in ShaderProgram::ALL {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.label()),
                source: wgpu::ShaderSource::Wgsl(program.source().into()),
            });
            modules.insert(PipelineProgram::Fullscreen(program), module);
        }
        modules.insert(
            PipelineProgram::Points,
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Points Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
            }),
        );

        // Texture, sampler, uniform block
        let fullscreen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fullscreen Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let points_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Points Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let fullscreen_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fullscreen Pipeline Layout"),
            bind_group_layouts: &[&fullscreen_layout],
            push_constant_ranges: &[],
        });
        let points_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points Pipeline Layout"),
            bind_group_layouts: &[&points_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            modules,
            fullscreen_layout,
            fullscreen_pipeline_layout,
            points_layout,
            points_pipeline_layout,
            pipelines: HashMap::new(),
            sampler,
        }
    }

    pub fn fullscreen_layout(&self) -> &wgpu::BindGroupLayout {
        &self.fullscreen_layout
    }

    pub fn points_layout(&self) -> &wgpu::BindGroupLayout {
        &self.points_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Pipeline for `key`, compiled on first use.
    pub fn get(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(&key) {
            log::debug!("compiling pipeline {:?}", key);
            let pipeline = self.build(device, &key);
            self.pipelines.insert(key, pipeline);
        }
        &self.pipelines[&key]
    }

    fn build(&self, device: &wgpu::Device, key: &PipelineKey) -> wgpu::RenderPipeline {
        let module = &self.modules[&key.program];

        let points = key.program == PipelineProgram::Points;
        let layout = if points {
            &self.points_pipeline_layout
        } else {
            &self.fullscreen_pipeline_layout
        };
        let buffers: &[wgpu::VertexBufferLayout] = if points { &POINT_BUFFERS } else { &[] };
        // Full-screen quads ignore depth entirely
        let depth_compare = if points { CompareFunction::Less } else { CompareFunction::Always };
        let depth_write = points && key.write_depth;

        let face = wgpu::StencilFaceState {
            compare: key.stencil_compare,
            fail_op: key.stencil_fail,
            depth_fail_op: key.stencil_depth_fail,
            pass_op: key.stencil_pass,
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Showcase Pipeline"),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(blend_state(key.blending)),
                    write_mask: if key.write_color {
                        wgpu::ColorWrites::ALL
                    } else {
                        wgpu::ColorWrites::empty()
                    },
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_STENCIL_FORMAT,
                depth_write_enabled: depth_write,
                depth_compare,
                stencil: wgpu::StencilState {
                    front: face,
                    back: face,
                    read_mask: 0xff,
                    write_mask: 0xff,
                },
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

// Matches the `PointInstance` layout: position at 0, color at 16
const POINT_ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 16,
        shader_location: 1,
    },
];

const POINT_BUFFERS: [wgpu::VertexBufferLayout<'static>; 1] = [wgpu::VertexBufferLayout {
    array_stride: 32,
    step_mode: wgpu::VertexStepMode::Instance,
    attributes: &POINT_ATTRIBUTES,
}];
