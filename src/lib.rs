//! Blinn-Phong lighting pass with a CPU reference of both shader stages.
//!
//! The GPU side is a single WGSL program ([`SHADER`]) driven by
//! [`Renderer`]. The same math is available on the host through
//! [`vertex_stage`] and [`fragment_stage`], which the headless rasterizer in
//! [`raster`] uses to produce images without a GPU. Uniform and vertex types
//! are laid out so they can be uploaded byte-for-byte.

pub mod app;
pub mod config;
pub mod error;
pub mod mesh;
pub mod obj;
pub mod raster;
pub mod render;
pub mod stage;
pub mod uniforms;
pub mod vertex;

pub use config::RenderConfig;
pub use error::ValidationError;
pub use mesh::Mesh;
pub use obj::{load_obj, load_obj_from_str};
pub use raster::{draw_indexed, Framebuffer, RasterStats};
pub use render::{Renderer, SHADER};
pub use stage::{
    diffuse_term, fragment_stage, gamma_decode, light_terms, normal_matrix, specular_term,
    vertex_stage, LightTerms, Varyings, VertexOutput,
};
pub use uniforms::{LightingUniforms, LightingUniformsRaw};
pub use vertex::Vertex;
