//! Headless software rasterizer.
//!
//! Plays the part of the fixed-function hardware between the two stages:
//! it runs [`vertex_stage`] per vertex, maps triangles to pixels, interpolates
//! the varyings perspective-correctly, depth-tests and runs
//! [`fragment_stage`] per covered pixel centre. Triangles with any vertex at
//! or behind the eye plane (`w <= 0`) are dropped whole instead of clipped.

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3, Vec4};
use image::RgbaImage;
use log::debug;

use crate::mesh::Mesh;
use crate::stage::{fragment_stage, vertex_stage, Varyings, VertexOutput};
use crate::uniforms::LightingUniforms;

/// Linear RGBA color plane plus depth plane.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec4>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, clear: Vec4) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![clear; len],
            depth: vec![1.0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.color[self.offset(x, y)]
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.offset(x, y)]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Quantizes to 8 bits through the sRGB transfer function, the way an
    /// sRGB swapchain surface stores the shader output.
    pub fn to_rgba8(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (texel, color) in image.pixels_mut().zip(&self.color) {
            let encoded = [
                linear_to_srgb(color.x),
                linear_to_srgb(color.y),
                linear_to_srgb(color.z),
                color.w.clamp(0.0, 1.0),
            ];
            texel.0 = encoded.map(|c| (c * 255.0).round() as u8);
        }
        image
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.to_rgba8()
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("unable to write {}", path.display()))
    }
}

fn linear_to_srgb(value: f32) -> f32 {
    // NaN falls through clamp unchanged; treat it as black.
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Work done by one [`draw_indexed`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles: usize,
    /// Triangles dropped for crossing the eye plane or covering no area.
    pub discarded: usize,
    /// Fragments that passed the depth test and were shaded.
    pub fragments: usize,
}

/// Draws `mesh` as a triangle list into `target`.
pub fn draw_indexed(target: &mut Framebuffer, uniforms: &LightingUniforms, mesh: &Mesh) -> RasterStats {
    let outputs: Vec<VertexOutput> = mesh
        .vertices
        .iter()
        .map(|vertex| vertex_stage(uniforms, vertex))
        .collect();

    let mut stats = RasterStats::default();
    for triangle in mesh.indices.chunks_exact(3) {
        stats.triangles += 1;
        let corners = [triangle[0], triangle[1], triangle[2]].map(|i| outputs.get(i as usize));
        let [Some(a), Some(b), Some(c)] = corners else {
            stats.discarded += 1;
            continue;
        };
        match rasterize_triangle(target, [a, b, c]) {
            Some(fragments) => stats.fragments += fragments,
            None => stats.discarded += 1,
        }
    }

    debug!(
        "rasterized {} triangles ({} discarded), {} fragments",
        stats.triangles, stats.discarded, stats.fragments
    );
    stats
}

struct ScreenVertex {
    position: Vec2,
    depth: f32,
    inv_w: f32,
}

fn to_screen(clip: Vec4, width: f32, height: f32) -> Option<ScreenVertex> {
    if !(clip.w > 0.0) {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(ScreenVertex {
        position: Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height),
        depth: ndc.z,
        inv_w: 1.0 / clip.w,
    })
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Returns the number of shaded fragments, or `None` when the triangle was
/// discarded before coverage.
fn rasterize_triangle(target: &mut Framebuffer, corners: [&VertexOutput; 3]) -> Option<usize> {
    let (width, height) = (target.width as f32, target.height as f32);
    let [s0, s1, s2] = [
        to_screen(corners[0].clip_position, width, height)?,
        to_screen(corners[1].clip_position, width, height)?,
        to_screen(corners[2].clip_position, width, height)?,
    ];

    let area = edge(s0.position, s1.position, s2.position);
    if !(area.abs() > f32::EPSILON) {
        return None;
    }

    let min = s0.position.min(s1.position).min(s2.position).floor().max(Vec2::ZERO);
    let max = s0
        .position
        .max(s1.position)
        .max(s2.position)
        .ceil()
        .min(Vec2::new(width, height));
    if min.x >= max.x || min.y >= max.y {
        return Some(0);
    }

    let varyings = [
        &corners[0].varyings,
        &corners[1].varyings,
        &corners[2].varyings,
    ];
    let mut fragments = 0;
    for y in min.y as u32..max.y as u32 {
        for x in min.x as u32..max.x as u32 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            // Normalized by the signed area, so either winding gives
            // non-negative weights inside the triangle.
            let l0 = edge(s1.position, s2.position, p) / area;
            let l1 = edge(s2.position, s0.position, p) / area;
            let l2 = edge(s0.position, s1.position, p) / area;
            if l0 < 0.0 || l1 < 0.0 || l2 < 0.0 {
                continue;
            }

            let depth = l0 * s0.depth + l1 * s1.depth + l2 * s2.depth;
            if !(0.0..=1.0).contains(&depth) {
                continue;
            }
            let offset = target.offset(x, y);
            if depth >= target.depth[offset] {
                continue;
            }

            let perspective = Vec3::new(l0 * s0.inv_w, l1 * s1.inv_w, l2 * s2.inv_w);
            let weights = perspective / perspective.element_sum();
            let interpolated = Varyings::blend(varyings, weights.to_array());

            target.depth[offset] = depth;
            target.color[offset] = fragment_stage(&interpolated);
            fragments += 1;
        }
    }
    Some(fragments)
}
