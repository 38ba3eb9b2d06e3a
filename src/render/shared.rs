/// WGSL source of the lighting pass.
///
/// `vs_main` and `fs_main` mirror [`crate::stage::vertex_stage`] and
/// [`crate::stage::fragment_stage`] for affine model matrices; the normal
/// matrix here is built from the upper 3x3 only. The uniform block lives at
/// group 0, binding 0 with the layout of [`crate::LightingUniformsRaw`].
pub const SHADER: &str = r#"
struct LightingUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    base_light: vec3<f32>,
    ambient_strength: f32,
    light_pos: vec3<f32>,
    specular_strength: f32,
    view_pos: vec3<f32>,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) base_light: vec3<f32>,
    @location(3) ambient_strength: f32,
    @location(4) light_pos: vec3<f32>,
    @location(5) specular_strength: f32,
    @location(6) view_pos: vec3<f32>,
    @location(7) frag_pos: vec3<f32>,
}

@group(0) @binding(0)
var<uniform> uniforms: LightingUniforms;

const GAMMA: f32 = 2.2;
const SHININESS: f32 = 32.0;

// Inverse-transpose of the upper-left 3x3 via cofactors; WGSL has no inverse().
// Equals the 4x4 inverse-transpose only while the model stays affine.
fn normal_matrix(m: mat4x4<f32>) -> mat3x3<f32> {
    let a = m[0].xyz;
    let b = m[1].xyz;
    let c = m[2].xyz;
    let bc = cross(b, c);
    let inv_det = 1.0 / dot(a, bc);
    return mat3x3<f32>(bc * inv_det, cross(c, a) * inv_det, cross(a, b) * inv_det);
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = uniforms.model * vec4<f32>(input.position, 1.0);
    out.clip_position = uniforms.proj * uniforms.view * world;
    out.frag_pos = world.xyz;
    out.color = pow(input.color, vec3<f32>(1.0 / GAMMA));
    out.normal = normal_matrix(uniforms.model) * input.normal;
    out.base_light = uniforms.base_light;
    out.ambient_strength = uniforms.ambient_strength;
    out.light_pos = uniforms.light_pos;
    out.specular_strength = uniforms.specular_strength;
    out.view_pos = uniforms.view_pos;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let light_dir = normalize(input.light_pos - input.frag_pos);
    let diffuse = max(dot(normal, light_dir), 0.0) * input.base_light;

    let view_dir = normalize(input.view_pos - input.frag_pos);
    let halfway = normalize(light_dir + view_dir);
    let specular = input.specular_strength
        * pow(max(dot(normal, halfway), 0.0), SHININESS)
        * input.base_light;

    let light = (input.ambient_strength + diffuse + specular) * input.base_light;
    return vec4<f32>(input.color * light, 1.0);
}
"#;
