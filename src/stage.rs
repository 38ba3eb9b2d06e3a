//! Host-side reference of the two programmable stages of the lighting pass.
//!
//! [`vertex_stage`] and [`fragment_stage`] compute what `vs_main` and
//! `fs_main` in [`crate::render::SHADER`] compute on the GPU, as long as the
//! model matrix is affine. The shader derives its normal matrix from the
//! upper 3x3 alone, while [`normal_matrix`] inverts the full 4x4, so the two
//! differ for a projective model matrix.
//!
//! Like the shaders these functions have no error channel: degenerate input
//! (a singular model matrix, a zero-length normal, NaN colors) yields NaN,
//! infinities or plainly wrong colors instead of an error. A light sitting
//! exactly on the fragment is the exception: its NaN direction is dropped by
//! the `max(.., 0)` clamps, leaving only the ambient term. Use the
//! `validate` methods on [`LightingUniforms`] and [`Vertex`] to catch all of
//! this up front.

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::uniforms::LightingUniforms;
use crate::vertex::Vertex;

/// Exponent of the display gamma the vertex colors are encoded with.
pub const GAMMA: f32 = 2.2;

/// Fixed specular exponent.
pub const SHININESS: f32 = 32.0;

/// Values handed from the vertex stage to the fragment stage, in varying
/// location order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Varyings {
    pub color: Vec3,
    pub normal: Vec3,
    pub base_light: Vec3,
    pub ambient_strength: f32,
    pub light_pos: Vec3,
    pub specular_strength: f32,
    pub view_pos: Vec3,
    pub frag_pos: Vec3,
}

impl Varyings {
    /// Weighted sum of three vertices' varyings. The weights should sum to one.
    pub fn blend(corners: [&Varyings; 3], weights: [f32; 3]) -> Varyings {
        let [a, b, c] = corners;
        let [wa, wb, wc] = weights;
        let mix3 = |pick: fn(&Varyings) -> Vec3| pick(a) * wa + pick(b) * wb + pick(c) * wc;
        let mix1 = |pick: fn(&Varyings) -> f32| pick(a) * wa + pick(b) * wb + pick(c) * wc;
        Varyings {
            color: mix3(|v| v.color),
            normal: mix3(|v| v.normal),
            base_light: mix3(|v| v.base_light),
            ambient_strength: mix1(|v| v.ambient_strength),
            light_pos: mix3(|v| v.light_pos),
            specular_strength: mix1(|v| v.specular_strength),
            view_pos: mix3(|v| v.view_pos),
            frag_pos: mix3(|v| v.frag_pos),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexOutput {
    pub clip_position: Vec4,
    pub varyings: Varyings,
}

/// Intermediate lighting quantities of one fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightTerms {
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// `(ambient + diffuse + specular) * base_light`.
    pub combined: Vec3,
}

pub fn vertex_stage(uniforms: &LightingUniforms, vertex: &Vertex) -> VertexOutput {
    let world = uniforms.model * vertex.position().extend(1.0);
    let clip_position = uniforms.proj * uniforms.view * world;

    VertexOutput {
        clip_position,
        varyings: Varyings {
            color: gamma_decode(vertex.color()),
            normal: normal_matrix(uniforms.model) * vertex.normal(),
            base_light: uniforms.base_light,
            ambient_strength: uniforms.ambient_strength,
            light_pos: uniforms.light_pos,
            specular_strength: uniforms.specular_strength,
            view_pos: uniforms.view_pos,
            frag_pos: world.truncate(),
        },
    }
}

/// Raises each channel to `1 / GAMMA`.
pub fn gamma_decode(color: Vec3) -> Vec3 {
    color.powf(1.0 / GAMMA)
}

/// Upper-left 3x3 of the inverse-transpose of `model`.
///
/// Matches the shader's cofactor form only when `model` is affine.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    Mat3::from_mat4(model.inverse().transpose())
}

pub fn fragment_stage(varyings: &Varyings) -> Vec4 {
    let terms = light_terms(varyings);
    (varyings.color * terms.combined).extend(1.0)
}

pub fn light_terms(varyings: &Varyings) -> LightTerms {
    let normal = varyings.normal.normalize();
    let light_dir = (varyings.light_pos - varyings.frag_pos).normalize();
    let view_dir = (varyings.view_pos - varyings.frag_pos).normalize();
    let halfway = (light_dir + view_dir).normalize();

    let diffuse = diffuse_term(normal, light_dir, varyings.base_light);
    let specular = specular_term(
        normal,
        halfway,
        varyings.specular_strength,
        varyings.base_light,
    );
    // base_light is applied again on top of the diffuse and specular terms.
    let combined = (varyings.ambient_strength + diffuse + specular) * varyings.base_light;

    LightTerms {
        diffuse,
        specular,
        combined,
    }
}

pub fn diffuse_term(normal: Vec3, light_dir: Vec3, base_light: Vec3) -> Vec3 {
    normal.dot(light_dir).max(0.0) * base_light
}

pub fn specular_term(normal: Vec3, halfway: Vec3, specular_strength: f32, base_light: Vec3) -> Vec3 {
    specular_strength * normal.dot(halfway).max(0.0).powf(SHININESS) * base_light
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    fn facing_varyings() -> Varyings {
        Varyings {
            color: Vec3::new(1.0, 0.0, 0.0),
            normal: Vec3::Z,
            base_light: Vec3::ONE,
            ambient_strength: 0.1,
            light_pos: Vec3::new(0.0, 0.0, 5.0),
            specular_strength: 0.5,
            view_pos: Vec3::new(0.0, 0.0, 3.0),
            frag_pos: Vec3::ZERO,
        }
    }

    #[test]
    fn head_on_light_matches_worked_example() {
        let varyings = facing_varyings();
        let terms = light_terms(&varyings);
        assert!(approx(terms.diffuse, Vec3::ONE));
        assert!(approx(terms.specular, Vec3::splat(0.5)));
        assert!(approx(terms.combined, Vec3::splat(1.6)));

        let color = fragment_stage(&varyings);
        assert!(color.abs_diff_eq(Vec4::new(1.6, 0.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn base_light_is_applied_twice() {
        let mut varyings = facing_varyings();
        varyings.base_light = Vec3::splat(0.5);
        varyings.color = Vec3::ONE;
        // diffuse 0.5, specular 0.25, combined (0.1 + 0.5 + 0.25) * 0.5
        let color = fragment_stage(&varyings);
        assert!(color.truncate().abs_diff_eq(Vec3::splat(0.425), 1e-5));
    }

    #[test]
    fn interpolated_normal_is_renormalized() {
        let mut varyings = facing_varyings();
        varyings.normal = Vec3::new(0.0, 0.0, 0.25);
        assert!(fragment_stage(&varyings).abs_diff_eq(Vec4::new(1.6, 0.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn gamma_decode_of_mid_grey() {
        let decoded = gamma_decode(Vec3::splat(0.5));
        assert!((decoded.x - 0.7297).abs() < 1e-3);

        let linear = Vec3::new(0.0, 0.2, 0.9);
        let encoded = linear.powf(GAMMA);
        assert!(approx(gamma_decode(encoded), linear));
    }

    #[test]
    fn diffuse_vanishes_when_facing_away() {
        let normal = Vec3::Z;
        assert_eq!(diffuse_term(normal, Vec3::X, Vec3::ONE), Vec3::ZERO);
        assert_eq!(diffuse_term(normal, -Vec3::Z, Vec3::ONE), Vec3::ZERO);
        let behind = Vec3::new(1.0, 0.0, -0.01).normalize();
        assert_eq!(diffuse_term(normal, behind, Vec3::ONE), Vec3::ZERO);

        for degrees in [0.0_f32, 10.0, 45.0, 80.0, 89.5] {
            let angle = degrees.to_radians();
            let light_dir = Vec3::new(angle.sin(), 0.0, angle.cos());
            let diffuse = diffuse_term(normal, light_dir, Vec3::ONE);
            assert!(diffuse.min_element() > 0.0, "no light at {degrees} degrees");
        }
    }

    #[test]
    fn specular_peaks_on_the_normal_and_falls_off() {
        let normal = Vec3::Z;
        let base_light = Vec3::new(1.0, 0.5, 0.25);
        let peak = specular_term(normal, normal, 0.5, base_light);
        assert!(approx(peak, 0.5 * base_light));

        let mut previous = peak.x;
        for step in 1..=18 {
            let angle = (step as f32 * 5.0).to_radians();
            let halfway = Vec3::new(angle.sin(), 0.0, angle.cos());
            let value = specular_term(normal, halfway, 0.5, base_light).x;
            assert!(value < previous, "not decreasing at step {step}");
            previous = value;
        }
    }

    #[test]
    fn position_round_trips_through_inverse_transform() {
        let uniforms = LightingUniforms {
            model: Mat4::from_scale_rotation_translation(
                Vec3::new(2.0, 0.5, 1.5),
                glam::Quat::from_rotation_y(0.7),
                Vec3::new(0.3, -1.0, 2.0),
            ),
            view: Mat4::look_at_rh(Vec3::new(4.0, 3.0, 5.0), Vec3::ZERO, Vec3::Y),
            proj: Mat4::perspective_rh(0.9, 1.5, 0.1, 50.0),
            ..LightingUniforms::new()
        };
        let combined = uniforms.proj * uniforms.view * uniforms.model;
        for position in [
            Vec3::ZERO,
            Vec3::new(0.5, -0.25, 1.0),
            Vec3::new(-1.0, 2.0, -0.5),
        ] {
            let vertex = Vertex::new(position, Vec3::ONE, Vec3::Y);
            let out = vertex_stage(&uniforms, &vertex);
            let recovered = combined.inverse() * out.clip_position;
            assert!(
                (recovered.truncate() / recovered.w).abs_diff_eq(position, 1e-4),
                "{position} came back as {recovered}"
            );
            let world = uniforms.model.transform_point3(position);
            assert!(approx(out.varyings.frag_pos, world));
        }
    }

    #[test]
    fn normals_stay_perpendicular_under_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0)) * Mat4::from_rotation_z(0.3);
        let uniforms = LightingUniforms {
            model,
            ..LightingUniforms::new()
        };
        // Surface x + y = 0 has normal (1, 1, 0) and tangent (1, -1, 0).
        let normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let tangent = Vec3::new(1.0, -1.0, 0.0);
        let vertex = Vertex::new(Vec3::ZERO, Vec3::ONE, normal);

        let transformed_normal = vertex_stage(&uniforms, &vertex).varyings.normal;
        let transformed_tangent = model.transform_vector3(tangent);
        assert!(transformed_normal.normalize().dot(transformed_tangent.normalize()).abs() < 1e-5);

        let naive = model.transform_vector3(normal);
        assert!(naive.normalize().dot(transformed_tangent.normalize()).abs() > 0.1);
    }

    #[test]
    fn lighting_parameters_pass_through() {
        let uniforms = LightingUniforms {
            base_light: Vec3::new(0.9, 0.8, 0.7),
            ambient_strength: 0.25,
            light_pos: Vec3::new(3.0, 2.0, 1.0),
            specular_strength: 0.6,
            view_pos: Vec3::new(-1.0, 0.0, 4.0),
            ..LightingUniforms::new()
        };
        let vertex = Vertex::new(Vec3::X, Vec3::splat(0.5), Vec3::Z);
        let varyings = vertex_stage(&uniforms, &vertex).varyings;
        assert_eq!(varyings.base_light, uniforms.base_light);
        assert_eq!(varyings.ambient_strength, 0.25);
        assert_eq!(varyings.light_pos, uniforms.light_pos);
        assert_eq!(varyings.specular_strength, 0.6);
        assert_eq!(varyings.view_pos, uniforms.view_pos);
        // Not renormalized by the vertex stage.
        let scaled = LightingUniforms {
            model: Mat4::from_scale(Vec3::splat(0.5)),
            ..uniforms
        };
        let normal = vertex_stage(&scaled, &vertex).varyings.normal;
        assert!(approx(normal, Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn light_on_fragment_gives_ambient_instead_of_nan() {
        // normalize(0) is NaN, but f32::max returns the non-NaN operand, so
        // the NaN does not reach the output here. Strict NaN propagation
        // does not hold for this degenerate input.
        let mut varyings = facing_varyings();
        varyings.light_pos = varyings.frag_pos;
        let color = fragment_stage(&varyings);
        assert!(color.abs_diff_eq(Vec4::new(0.1, 0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn nan_color_propagates() {
        let mut varyings = facing_varyings();
        varyings.color = Vec3::new(f32::NAN, 0.0, 0.0);
        assert!(fragment_stage(&varyings).x.is_nan());
    }

    #[test]
    fn blend_with_unit_weight_selects_corner() {
        let a = facing_varyings();
        let mut b = a;
        b.frag_pos = Vec3::X;
        b.ambient_strength = 0.3;
        let mixed = Varyings::blend([&a, &b, &a], [0.0, 1.0, 0.0]);
        assert_eq!(mixed, b);
        let half = Varyings::blend([&a, &b, &a], [0.5, 0.5, 0.0]);
        assert!(approx(half.frag_pos, Vec3::new(0.5, 0.0, 0.0)));
        assert!((half.ambient_strength - 0.2).abs() < 1e-6);
    }
}
