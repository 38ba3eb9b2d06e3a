use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::config::RenderConfig;
use crate::error::ValidationError;

/// Transform and lighting block shared by every invocation of a draw.
///
/// Field order is the binding 0 layout: model, view, proj, base light,
/// ambient strength, light position, specular strength, view position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightingUniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
    pub base_light: Vec3,
    pub ambient_strength: f32,
    pub light_pos: Vec3,
    pub specular_strength: f32,
    pub view_pos: Vec3,
}

/// std140 image of [`LightingUniforms`] as uploaded to the GPU.
///
/// Each scalar packs into the tail of the preceding `vec3`, so the only
/// padding is the last four bytes after `view_pos`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightingUniformsRaw {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub base_light: [f32; 3],
    pub ambient_strength: f32,
    pub light_pos: [f32; 3],
    pub specular_strength: f32,
    pub view_pos: [f32; 3],
    pub _padding: f32,
}

const MIN_MODEL_DETERMINANT: f32 = 1e-8;

impl LightingUniforms {
    pub fn new() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            base_light: Vec3::ONE,
            ambient_strength: 0.1,
            light_pos: Vec3::ONE,
            specular_strength: 0.8,
            view_pos: Vec3::ONE,
        }
    }

    /// Builds the block for the frame shown `seconds` after start-up.
    ///
    /// The model spins about +Z, the camera looks at its target, and the
    /// projection maps depth to `0..1`.
    pub fn for_frame(config: &RenderConfig, seconds: f32, aspect: f32) -> Self {
        let camera = &config.camera;
        let lighting = &config.lighting;

        let angle = (seconds * camera.rotation_degrees_per_second).to_radians();
        let model = Mat4::from_rotation_z(angle);
        let view = Mat4::look_at_rh(camera.position, camera.target, camera.up);
        let mut proj = Mat4::perspective_rh(
            camera.fov_degrees.to_radians(),
            aspect.max(0.01),
            camera.near,
            camera.far,
        );
        if camera.flip_y {
            proj.y_axis.y = -proj.y_axis.y;
        }

        Self {
            model,
            view,
            proj,
            base_light: lighting.base_light,
            ambient_strength: lighting.ambient_strength,
            light_pos: lighting.light_pos,
            specular_strength: lighting.specular_strength,
            view_pos: camera.position,
        }
    }

    pub fn to_raw(&self) -> LightingUniformsRaw {
        LightingUniformsRaw {
            model: self.model.to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            proj: self.proj.to_cols_array_2d(),
            base_light: self.base_light.into(),
            ambient_strength: self.ambient_strength,
            light_pos: self.light_pos.into(),
            specular_strength: self.specular_strength,
            view_pos: self.view_pos.into(),
            _padding: 0.0,
        }
    }

    /// Checks the preconditions of the vertex stage: finite values and an
    /// invertible, affine model matrix. The shader's normal matrix only
    /// agrees with [`crate::stage::normal_matrix`] for affine models.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let matrices = [
            ("model matrix", self.model),
            ("view matrix", self.view),
            ("projection matrix", self.proj),
        ];
        for (field, matrix) in matrices {
            if !matrix.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
        }
        let vectors = [
            ("base light", self.base_light),
            ("light position", self.light_pos),
            ("view position", self.view_pos),
        ];
        for (field, vector) in vectors {
            if !vector.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
        }
        if !self.ambient_strength.is_finite() || !self.specular_strength.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "light strength",
            });
        }

        let row = self.model.row(3);
        if !row.abs_diff_eq(Vec4::W, 1e-6) {
            return Err(ValidationError::ProjectiveModel {
                row: row.to_array(),
            });
        }

        let determinant = self.model.determinant();
        if determinant.abs() < MIN_MODEL_DETERMINANT {
            return Err(ValidationError::SingularModel { determinant });
        }
        Ok(())
    }
}

impl Default for LightingUniforms {
    fn default() -> Self {
        Self::new()
    }
}
