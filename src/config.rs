use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Runtime configuration, read from TOML. Every section and field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub mesh: MeshConfig,
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
            title: "phong-pass".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

/// Look-at camera. `position` doubles as the viewer position of the lighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Negate clip-space Y, for APIs whose framebuffer Y axis points down.
    pub flip_y: bool,
    pub rotation_degrees_per_second: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::ONE,
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_degrees: 45.0,
            near: 0.1,
            far: 10.0,
            flip_y: false,
            rotation_degrees_per_second: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub base_light: Vec3,
    pub ambient_strength: f32,
    pub light_pos: Vec3,
    pub specular_strength: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            base_light: Vec3::ONE,
            ambient_strength: 0.1,
            light_pos: Vec3::ONE,
            specular_strength: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Vertex color assigned to loaded meshes (gamma encoded).
    pub color: Vec3,
    pub normalize_extent: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            normalize_extent: true,
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid configuration TOML")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Width over height of the configured window.
    pub fn aspect(&self) -> f32 {
        self.window.width as f32 / self.window.height.max(1) as f32
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: &str| Err(ValidationError::InvalidConfig(msg.to_string()));
        let camera = &self.camera;
        let lighting = &self.lighting;

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be non-zero");
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return invalid("camera planes must satisfy 0 < near < far");
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return invalid("camera fov must lie strictly between 0 and 180 degrees");
        }
        if camera.up.length_squared() <= f32::EPSILON {
            return invalid("camera up vector must be non-zero");
        }
        if (camera.position - camera.target).length_squared() <= f32::EPSILON {
            return invalid("camera position must differ from its target");
        }
        let forward = (camera.target - camera.position).normalize();
        if forward.cross(camera.up.normalize()).length_squared() <= 1e-6 {
            return invalid("camera up vector must not be parallel to the view direction");
        }
        if !camera.rotation_degrees_per_second.is_finite() {
            return invalid("rotation speed must be finite");
        }
        if lighting.ambient_strength < 0.0 || lighting.specular_strength < 0.0 {
            return invalid("light strengths must be non-negative");
        }
        if lighting.base_light.min_element() < 0.0 || self.mesh.color.min_element() < 0.0 {
            return invalid("colors must be non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_viewer() {
        let config = RenderConfig::default();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 768);
        assert_eq!(config.camera.position, Vec3::ONE);
        assert_eq!(config.camera.up, Vec3::Z);
        assert_eq!(config.lighting.ambient_strength, 0.1);
        assert_eq!(config.lighting.specular_strength, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = RenderConfig::from_toml_str(
            r#"
            [lighting]
            specular_strength = 0.5
            light_pos = [2.0, 0.0, 3.0]

            [window]
            width = 320
            "#,
        )
        .unwrap();
        assert_eq!(config.lighting.specular_strength, 0.5);
        assert_eq!(config.lighting.light_pos, Vec3::new(2.0, 0.0, 3.0));
        assert_eq!(config.lighting.ambient_strength, 0.1);
        assert_eq!(config.window.width, 320);
        assert_eq!(config.window.height, 768);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn rejects_up_vector_along_view_direction() {
        let mut config = RenderConfig::default();
        config.camera.position = Vec3::new(0.0, 0.0, 2.0);
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidConfig(
                "camera up vector must not be parallel to the view direction".to_string()
            ))
        );

        config.camera.position = Vec3::new(0.0, 0.0, -2.0);
        assert!(config.validate().is_err());

        config.camera.up = Vec3::Y;
        assert!(config.validate().is_ok());
        let uniforms = crate::LightingUniforms::for_frame(&config, 0.0, 1.0);
        assert!(uniforms.view.is_finite());
    }

    #[test]
    fn rejects_bad_planes_and_colors() {
        let mut config = RenderConfig::default();
        config.camera.near = 5.0;
        config.camera.far = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidConfig(_))
        ));

        let mut config = RenderConfig::default();
        config.mesh.color = Vec3::new(1.0, -0.5, 0.0);
        assert!(config.validate().is_err());

        let mut config = RenderConfig::default();
        config.camera.target = config.camera.position;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(RenderConfig::from_toml_str("[camera]\nnear = \"close\"").is_err());
    }
}
