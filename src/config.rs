//! Showcase configuration
//!
//! Plain structs with defaults matching the shipped scene. The CLI flips a
//! few of them (`--mobile`, `--debug`).

use crate::scene::shapes::{DESKTOP_LAYOUT, MOBILE_LAYOUT, ShapeTransform};

/// Layout and feature set the scene is tuned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceProfile {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceProfile {
    pub fn layout(self) -> &'static [ShapeTransform; 6] {
        match self {
            DeviceProfile::Desktop => &DESKTOP_LAYOUT,
            DeviceProfile::Mobile => &MOBILE_LAYOUT,
        }
    }

    /// Vertical field of view in degrees
    pub fn fov(self) -> f32 {
        match self {
            DeviceProfile::Desktop => 75.0,
            DeviceProfile::Mobile => 100.0,
        }
    }

    pub fn is_mobile(self) -> bool {
        self == DeviceProfile::Mobile
    }
}

/// Post-processing chain settings
#[derive(Debug, Clone, PartialEq)]
pub struct FxConfig {
    pub bloom_strength: f32,
    pub film_noise: f32,
    pub film_scanlines: f32,
    pub film_scanline_count: f32,
    pub film_grayscale: bool,
    pub focus_sample_distance: f32,
    pub focus_wave_factor: f32,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            bloom_strength: 0.75,
            film_noise: 0.5,
            film_scanlines: 0.5,
            film_scanline_count: 1500.0,
            film_grayscale: false,
            focus_sample_distance: 0.794,
            focus_wave_factor: 0.00125,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowcaseConfig {
    pub profile: DeviceProfile,
    /// Short intro and no fog
    pub debug: bool,
    pub title: String,
    pub window_size: (u32, u32),
    pub seed: u64,
    /// Hue of the shape vertex colors, in degrees
    pub shape_hue: f32,
    pub shape_lightness: f32,
    pub fog_color: u32,
    pub fog_density: f32,
    pub fx: FxConfig,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            profile: DeviceProfile::Desktop,
            debug: false,
            title: "Particle Showcase (ESC to exit)".to_string(),
            window_size: (1280, 720),
            seed: 0x5eed,
            shape_hue: 160.0,
            shape_lightness: 1.0,
            fog_color: 0x05050c,
            fog_density: 5e-4,
            fx: FxConfig::default(),
        }
    }
}

impl ShowcaseConfig {
    /// Intro flight length in milliseconds
    pub fn intro_duration(&self) -> f64 {
        if self.debug { 2000.0 } else { 25000.0 }
    }

    /// Apply `--mobile` / `--debug` style flags.
    pub fn with_flags<'a>(mut self, flags: impl IntoIterator<Item = &'a str>) -> Self {
        for flag in flags {
            match flag {
                "--mobile" => self.profile = DeviceProfile::Mobile,
                "--debug" => self.debug = true,
                other => log::warn!("ignoring unknown flag `{}`", other),
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let config = ShowcaseConfig::default().with_flags(["--mobile", "--debug"]);
        assert!(config.profile.is_mobile());
        assert_eq!(config.intro_duration(), 2000.0);
        assert_eq!(config.profile.fov(), 100.0);
        assert_eq!(config.profile.layout()[4].scale, 2000.0);
    }

    #[test]
    fn test_defaults() {
        let config = ShowcaseConfig::default();
        assert_eq!(config.intro_duration(), 25000.0);
        assert_eq!(config.fx.film_scanline_count, 1500.0);
        assert!(!config.fx.film_grayscale);
    }
}
