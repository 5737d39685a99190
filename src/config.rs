use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Projection;
use crate::text::TextParams;

/// Font the demo uses when nothing else is configured.
pub const DEFAULT_FONT_URL: &str =
    "https://threejs.org/examples/fonts/helvetiker_regular.typeface.json";

/// Largest texture edge every backend accepts, WebGL2 included.
pub const MAX_TEXTURE_SIZE: u32 = 2048;

/// Every tunable of the demo. Missing fields in a config file fall back to
/// the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Scale applied to the pointer offset from the viewport center.
    pub pointer_sensitivity: f32,
    /// Fraction of the remaining distance the camera covers per frame.
    pub camera_easing: f32,
    /// Radians added to each animated axis per frame.
    pub rotation_step: f32,
    pub camera: CameraConfig,
    pub window: WindowConfig,
    pub text: TextConfig,
    pub shadow_texture_size: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pointer_sensitivity: 0.05,
            camera_easing: 0.05,
            rotation_step: 0.02,
            camera: CameraConfig::default(),
            window: WindowConfig::default(),
            text: TextConfig::default(),
            shadow_texture_size: crate::texture::SHADOW_TEXTURE_SIZE,
        }
    }
}

impl DemoConfig {
    /// Reads and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("config is not valid JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.camera_easing > 0.0 && self.camera_easing < 1.0,
            "camera_easing must be between 0 and 1 (exclusive), got {}",
            self.camera_easing
        );
        ensure!(
            self.pointer_sensitivity.is_finite(),
            "pointer_sensitivity must be finite"
        );
        ensure!(self.rotation_step.is_finite(), "rotation_step must be finite");
        ensure!(
            self.camera.near > 0.0 && self.camera.far > self.camera.near,
            "camera clip planes must satisfy 0 < near < far"
        );
        ensure!(
            self.camera.fov_y > 0.0 && self.camera.fov_y < 180.0,
            "camera fov_y must be between 0 and 180 degrees"
        );
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window size must be non-zero"
        );
        ensure!(
            self.shadow_texture_size > 0 && self.shadow_texture_size <= MAX_TEXTURE_SIZE,
            "shadow_texture_size must be between 1 and {MAX_TEXTURE_SIZE}, got {}",
            self.shadow_texture_size
        );
        ensure!(self.text.params.size > 0.0, "text size must be positive");
        ensure!(
            self.text.params.curve_segments > 0,
            "text curve_segments must be at least 1"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            fov_y: 40.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    pub fn projection(&self, aspect: f32) -> Projection {
        Projection {
            fov_y: self.fov_y,
            aspect,
            near: self.near,
            far: self.far,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Drift Scene".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub content: String,
    /// Path to a typeface JSON file, or an `http(s)` URL for the web build.
    pub font: String,
    pub position: Vec3,
    pub color: Vec3,
    #[serde(flatten)]
    pub params: TextParams,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: "Hello, I am Jay!".to_string(),
            font: DEFAULT_FONT_URL.to_string(),
            position: Vec3::new(-8.0, -3.0, 0.0),
            color: Vec3::new(1.0, 1.0, 0.0),
            params: TextParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = DemoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pointer_sensitivity, 0.05);
        assert_eq!(config.camera_easing, 0.05);
        assert_eq!(config.rotation_step, 0.02);
        assert_eq!(config.shadow_texture_size, 128);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            DemoConfig::from_json(r#"{ "camera_easing": 0.1, "text": { "size": 3.0 } }"#).unwrap();
        assert_eq!(config.camera_easing, 0.1);
        assert_eq!(config.text.params.size, 3.0);
        assert_eq!(config.text.params.curve_segments, 12);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn rejects_oversized_shadow_texture() {
        let err = DemoConfig::from_json(r#"{ "shadow_texture_size": 40000 }"#).unwrap_err();
        assert!(err.to_string().contains("shadow_texture_size"));
        let largest = format!(r#"{{ "shadow_texture_size": {MAX_TEXTURE_SIZE} }}"#);
        assert!(DemoConfig::from_json(&largest).is_ok());
    }

    #[test]
    fn rejects_overshooting_easing() {
        let err = DemoConfig::from_json(r#"{ "camera_easing": 1.5 }"#).unwrap_err();
        assert!(err.to_string().contains("camera_easing"));
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = DemoConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config"));
    }
}
