use std::hash::{Hash, Hasher};
use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::ValidationError;

/// Per-vertex attributes consumed at vertex input locations 0, 1 and 2.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub normal: [f32; 3],
}

const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: size_of::<[f32; 3]>() as u64,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x3,
        offset: (2 * size_of::<[f32; 3]>()) as u64,
        shader_location: 2,
    },
];

impl Vertex {
    pub fn new(position: Vec3, color: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.into(),
            color: color.into(),
            normal: normal.into(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from(self.color)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from(self.normal)
    }

    /// Interleaved layout of a vertex buffer holding [`Vertex`] records.
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    /// Checks the attribute preconditions the vertex stage relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut components = self.position.iter().chain(&self.color).chain(&self.normal);
        if components.any(|c| !c.is_finite()) {
            return Err(ValidationError::NonFinite { field: "vertex" });
        }
        if let Some(&value) = self.color.iter().find(|c| **c < 0.0) {
            return Err(ValidationError::NegativeColor(value));
        }
        if self.normal().length_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(ValidationError::ZeroNormal);
        }
        Ok(())
    }

    fn bits(&self) -> [u32; 9] {
        let mut bits = [0; 9];
        let components = self.position.iter().chain(&self.color).chain(&self.normal);
        for (slot, value) in bits.iter_mut().zip(components) {
            *slot = value.to_bits();
        }
        bits
    }
}

// Bitwise comparison so vertices can key a dedup map.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}
