//! GPU rendering module using wgpu
//!
//! Surface setup, pipelines, off-screen targets and the render backend the
//! post-processing chain draws through.

pub mod backend;
pub mod context;
pub mod pipelines;
pub mod target;

pub use backend::WgpuBackend;
pub use context::GpuContext;
pub use target::GpuRenderTarget;
