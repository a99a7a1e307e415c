//! Off-screen render targets: a sampled color texture plus depth/stencil

use super::pipelines::{DEPTH_STENCIL_FORMAT, TARGET_FORMAT};

pub struct GpuRenderTarget {
    label: String,
    color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    depth: DepthStencil,
    size: (u32, u32),
}

impl GpuRenderTarget {
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let size = (width.max(1), height.max(1));
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&Default::default());

        Self {
            label: label.to_string(),
            color,
            color_view,
            depth: DepthStencil::new(device, label, size),
            size,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Reallocate at a new size. Contents are lost.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (width.max(1), height.max(1)) != self.size {
            *self = Self::new(device, &self.label, width, height);
        }
    }

    pub fn destroy(self) {
        self.color.destroy();
        self.depth.texture.destroy();
    }
}

/// Depth/stencil attachment, also used on its own for the screen
pub struct DepthStencil {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthStencil {
    pub fn new(device: &wgpu::Device, label: &str, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{} Depth", label)),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Self { texture, view }
    }
}

fn extent((width, height): (u32, u32)) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}
