//! Shader library for the post-processing passes
//!
//! Each program ships its WGSL source and the named uniforms it declares,
//! with defaults. Materials carry a private copy of those uniforms and pack
//! them into the program's uniform block at draw time.

use std::collections::BTreeMap;

/// Upper bound on convolution taps; also the size of the kernel uniform array
pub const MAX_KERNEL_SIZE: usize = 25;

/// Texel step for a 512-wide blur source
pub const BLUR_STEP: f32 = 0.001953125;

/// Uniform name the compositor binds the read buffer to
pub const DIFFUSE_SLOT: &str = "tDiffuse";

/// Build a normalized 1-D Gaussian kernel.
///
/// Length is `2 * ceil(3 * sigma) + 1`, capped at [`MAX_KERNEL_SIZE`], so it
/// is always odd. A non-positive or non-finite sigma gives the identity
/// kernel `[1.0]`.
pub fn build_kernel(sigma: f32) -> Vec<f32> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return vec![1.0];
    }

    let sigma = sigma as f64;
    let size = (2.0 * (3.0 * sigma).ceil() + 1.0).min(MAX_KERNEL_SIZE as f64) as usize;
    let center = (size - 1) as f64 * 0.5;

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Value of a named uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Sampled texture slot, bound by the pass that owns the material
    Texture,
    Float(f32),
    Bool(bool),
    Vec2([f32; 2]),
    FloatArray(Vec<f32>),
}

/// Named uniform declarations of one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms(BTreeMap<&'static str, UniformValue>);

impl Uniforms {
    fn declare(mut self, name: &'static str, value: UniformValue) -> Self {
        self.0.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Overwrite a declared uniform. Undeclared names are ignored.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match self.0.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                log::warn!("ignoring undeclared uniform `{}`", name);
                false
            }
        }
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.set(name, UniformValue::Float(value))
    }

    pub fn float(&self, name: &str) -> f32 {
        match self.0.get(name) {
            Some(UniformValue::Float(v)) => *v,
            Some(UniformValue::Bool(b)) => *b as u32 as f32,
            _ => 0.0,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(UniformValue::Bool(b)) => *b,
            Some(UniformValue::Float(v)) => *v != 0.0,
            _ => false,
        }
    }

    pub fn vec2(&self, name: &str) -> [f32; 2] {
        match self.0.get(name) {
            Some(UniformValue::Vec2(v)) => *v,
            _ => [0.0; 2],
        }
    }

    pub fn floats(&self, name: &str) -> &[f32] {
        match self.0.get(name) {
            Some(UniformValue::FloatArray(v)) => v,
            _ => &[],
        }
    }
}

/// Static programs of the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderProgram {
    /// Textured full-screen quad scaled by opacity
    Copy,
    /// Separable convolution along one image increment
    Convolution,
    /// Film grain and scanlines
    Film,
    /// Radial focus blur
    Focus,
}

impl ShaderProgram {
    pub const ALL: [ShaderProgram; 4] = [
        ShaderProgram::Copy,
        ShaderProgram::Convolution,
        ShaderProgram::Film,
        ShaderProgram::Focus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShaderProgram::Copy => "Copy Shader",
            ShaderProgram::Convolution => "Convolution Shader",
            ShaderProgram::Film => "Film Shader",
            ShaderProgram::Focus => "Focus Shader",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            ShaderProgram::Copy => include_str!("shaders/copy.wgsl"),
            ShaderProgram::Convolution => include_str!("shaders/convolution.wgsl"),
            ShaderProgram::Film => include_str!("shaders/film.wgsl"),
            ShaderProgram::Focus => include_str!("shaders/focus.wgsl"),
        }
    }

    /// Uniform declarations with their default values
    pub fn uniforms(self) -> Uniforms {
        use UniformValue::*;

        let uniforms = Uniforms::default().declare(DIFFUSE_SLOT, Texture);
        match self {
            ShaderProgram::Copy => uniforms.declare("opacity", Float(1.0)),
            ShaderProgram::Convolution => uniforms
                .declare("uImageIncrement", Vec2([BLUR_STEP, 0.0]))
                .declare("cKernel", FloatArray(Vec::new())),
            ShaderProgram::Film => uniforms
                .declare("time", Float(0.0))
                .declare("nIntensity", Float(0.5))
                .declare("sIntensity", Float(0.05))
                .declare("sCount", Float(4096.0))
                .declare("grayscale", Bool(true)),
            ShaderProgram::Focus => uniforms
                .declare("screenWidth", Float(1024.0))
                .declare("screenHeight", Float(1024.0))
                .declare("sampleDistance", Float(0.794))
                .declare("waveFactor", Float(0.00125)),
        }
    }

    /// Size in bytes of the packed uniform block
    pub fn uniform_block_size(self) -> u64 {
        let size = match self {
            ShaderProgram::Copy => std::mem::size_of::<CopyUniforms>(),
            ShaderProgram::Convolution => std::mem::size_of::<ConvolutionUniforms>(),
            ShaderProgram::Film => std::mem::size_of::<FilmUniforms>(),
            ShaderProgram::Focus => std::mem::size_of::<FocusUniforms>(),
        };
        size as u64
    }
}

/// How a material's output combines with the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Blending {
    #[default]
    Replace,
    /// Source-alpha over destination
    Normal,
    Additive,
}

/// A program plus its uniform values and fixed-function settings
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    pub program: ShaderProgram,
    pub uniforms: Uniforms,
    /// Tap count of the convolution loop
    pub kernel_size: u32,
    pub blending: Blending,
}

impl ShaderMaterial {
    pub fn new(program: ShaderProgram) -> Self {
        Self {
            program,
            uniforms: program.uniforms(),
            kernel_size: MAX_KERNEL_SIZE as u32,
            blending: Blending::Replace,
        }
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn with_kernel_size(mut self, kernel_size: u32) -> Self {
        self.kernel_size = kernel_size.clamp(1, MAX_KERNEL_SIZE as u32);
        self
    }

    /// Pack the uniforms into the program's std140 block.
    pub fn uniform_bytes(&self) -> Vec<u8> {
        let u = &self.uniforms;
        match self.program {
            ShaderProgram::Copy => bytemuck::bytes_of(&CopyUniforms {
                opacity: u.float("opacity"),
                _padding: [0.0; 3],
            })
            .to_vec(),
            ShaderProgram::Convolution => {
                let mut kernel = [[0.0f32; 4]; MAX_KERNEL_SIZE.div_ceil(4)];
                for (i, w) in u.floats("cKernel").iter().take(MAX_KERNEL_SIZE).enumerate() {
                    kernel[i / 4][i % 4] = *w;
                }
                bytemuck::bytes_of(&ConvolutionUniforms {
                    image_increment: u.vec2("uImageIncrement"),
                    kernel_size: self.kernel_size,
                    _padding: 0,
                    kernel,
                })
                .to_vec()
            }
            ShaderProgram::Film => bytemuck::bytes_of(&FilmUniforms {
                time: u.float("time"),
                n_intensity: u.float("nIntensity"),
                s_intensity: u.float("sIntensity"),
                s_count: u.float("sCount"),
                grayscale: u.flag("grayscale") as u32,
                _padding: [0; 3],
            })
            .to_vec(),
            ShaderProgram::Focus => bytemuck::bytes_of(&FocusUniforms {
                screen_width: u.float("screenWidth"),
                screen_height: u.float("screenHeight"),
                sample_distance: u.float("sampleDistance"),
                wave_factor: u.float("waveFactor"),
            })
            .to_vec(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CopyUniforms {
    opacity: f32,
    _padding: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvolutionUniforms {
    image_increment: [f32; 2],
    kernel_size: u32,
    _padding: u32,
    kernel: [[f32; 4]; 7],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FilmUniforms {
    time: f32,
    n_intensity: f32,
    s_intensity: f32,
    s_count: f32,
    grayscale: u32,
    _padding: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FocusUniforms {
    screen_width: f32,
    screen_height: f32,
    sample_distance: f32,
    wave_factor: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_shape_for_many_sigmas() {
        let mut sigma = 0.05f32;
        while sigma < 40.0 {
            let kernel = build_kernel(sigma);
            let sum: f32 = kernel.iter().sum();

            assert_eq!(kernel.len() % 2, 1, "sigma {} gave even length", sigma);
            assert!(kernel.len() <= MAX_KERNEL_SIZE);
            assert!((sum - 1.0).abs() < 1e-5, "sigma {} sums to {}", sigma, sum);
            sigma *= 1.3;
        }
    }

    #[test]
    fn test_kernel_sigma_one() {
        let kernel = build_kernel(1.0);
        assert_eq!(kernel.len(), 7);
        // Symmetric around the center, peak in the middle
        for i in 0..3 {
            assert!((kernel[i] - kernel[6 - i]).abs() < 1e-7);
            assert!(kernel[i] < kernel[3]);
        }
    }

    #[test]
    fn test_kernel_is_capped() {
        assert_eq!(build_kernel(4.0).len(), 25);
        assert_eq!(build_kernel(1000.0).len(), 25);
    }

    #[test]
    fn test_degenerate_sigma() {
        assert_eq!(build_kernel(0.0), vec![1.0]);
        assert_eq!(build_kernel(-2.0), vec![1.0]);
        assert_eq!(build_kernel(f32::NAN), vec![1.0]);
    }

    #[test]
    fn test_uniform_defaults_and_packing() {
        let material = ShaderMaterial::new(ShaderProgram::Film);
        assert!(material.uniforms.contains(DIFFUSE_SLOT));
        assert_eq!(material.uniforms.float("sCount"), 4096.0);
        assert!(material.uniforms.flag("grayscale"));

        for program in ShaderProgram::ALL {
            let material = ShaderMaterial::new(program);
            assert_eq!(material.uniform_bytes().len() as u64, program.uniform_block_size());
            assert_eq!(program.uniform_block_size() % 16, 0);
        }
    }

    #[test]
    fn test_undeclared_uniform_is_ignored() {
        let mut material = ShaderMaterial::new(ShaderProgram::Copy);
        assert!(!material.uniforms.set_float("exposure", 2.0));
        assert!(material.uniforms.get("exposure").is_none());
        assert!(material.uniforms.set_float("opacity", 0.25));
        assert_eq!(material.uniforms.float("opacity"), 0.25);
    }

    #[test]
    fn test_convolution_packs_kernel_taps() {
        let mut material = ShaderMaterial::new(ShaderProgram::Convolution).with_kernel_size(7);
        material
            .uniforms
            .set("cKernel", UniformValue::FloatArray(build_kernel(1.0)));
        let bytes = material.uniform_bytes();
        let words: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        // increment (2) + size/padding (2), then the taps
        assert_eq!(u32::from_ne_bytes(bytes[8..12].try_into().unwrap()), 7);
        let taps: f32 = words[4..11].iter().sum();
        assert!((taps - 1.0).abs() < 1e-5);
        assert!(words[11..].iter().all(|w| *w == 0.0));
    }
}
