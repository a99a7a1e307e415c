//! Post-processing: compositor, passes and their shader library

pub mod backend;
pub mod composer;
pub mod passes;
pub mod shaders;

pub use backend::{Color, CompareFunction, RenderBackend, SceneId, StencilOperation, StencilState};
pub use composer::EffectComposer;
pub use passes::{BloomPass, ClearMaskPass, FilmPass, MaskPass, Pass, PassFlags, PassKind, RenderPass, ShaderPass, StencilStamp};
pub use shaders::{build_kernel, Blending, ShaderMaterial, ShaderProgram, UniformValue, Uniforms};
