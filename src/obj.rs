use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::debug;

use crate::mesh::Mesh;
use crate::vertex::Vertex;

/// Reads an OBJ file from disk. See [`load_obj_from_str`].
pub fn load_obj<P: AsRef<Path>>(path: P, color: Vec3) -> Result<Mesh> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    load_obj_from_str(&data, color).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parses an OBJ file from memory into an indexed triangle list.
///
/// Every vertex receives `color`. Polygons are fan-triangulated, identical
/// position/normal pairs share one vertex, and smooth normals are computed
/// when the file leaves any vertex without one.
pub fn load_obj_from_str(data: &str, color: Vec3) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                triangulate_face(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }
    if faces.is_empty() {
        return Err(anyhow!("OBJ file does not define any faces"));
    }

    let (mut mesh, missing_normals) = build_mesh(&positions, &normals, &faces, color)?;
    if missing_normals {
        compute_normals(&mut mesh);
    }
    debug!(
        "parsed OBJ: {} positions, {} normals -> {} vertices, {} triangles",
        positions.len(),
        normals.len(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut component = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i64>()
            .with_context(|| format!("bad vertex reference `{part}`"))?;
        // texture coordinates are not part of the vertex layout
        let _vt = segments.next();
        let vn = match segments.next() {
            Some(s) if !s.is_empty() => s
                .parse::<i64>()
                .with_context(|| format!("bad normal reference `{part}`"))?,
            _ => 0,
        };
        indices.push(FaceIndex { v, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..(polygon.len() - 1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i64,
    vn: i64,
}

fn build_mesh(
    positions: &[Vec3],
    normals: &[Vec3],
    faces: &[[FaceIndex; 3]],
    color: Vec3,
) -> Result<(Mesh, bool)> {
    let mut lookup: HashMap<Vertex, u32> = HashMap::new();
    let mut mesh = Mesh::default();
    let mut missing_normals = false;

    for face in faces {
        for idx in face {
            let position = fix_index(idx.v, positions.len())
                .map(|i| positions[i])
                .ok_or_else(|| anyhow!("vertex index {} is out of range", idx.v))?;
            let normal = match idx.vn {
                0 => None,
                vn => Some(
                    fix_index(vn, normals.len())
                        .map(|i| normals[i])
                        .ok_or_else(|| anyhow!("normal index {vn} is out of range"))?,
                ),
            };
            missing_normals |= normal.is_none();

            let vertex = Vertex::new(position, color, normal.unwrap_or(Vec3::ZERO));
            let next_index = mesh.vertices.len() as u32;
            let entry = lookup.entry(vertex).or_insert_with(|| {
                mesh.vertices.push(vertex);
                next_index
            });
            mesh.indices.push(*entry);
        }
    }

    Ok((mesh, missing_normals))
}

/// Resolves a 1-based (or negative, end-relative) OBJ index.
fn fix_index(index: i64, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = index.unsigned_abs() as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}

/// Replaces missing normals with the area-weighted average of the adjacent
/// face normals. Vertices that came with a normal keep it.
fn compute_normals(mesh: &mut Mesh) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len()];

    for triangle in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let p0 = mesh.vertices[i0].position();
        let p1 = mesh.vertices[i1].position();
        let p2 = mesh.vertices[i2].position();
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON * f32::EPSILON {
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (vertex, normal) in mesh.vertices.iter_mut().zip(accum) {
        if vertex.normal() == Vec3::ZERO {
            vertex.normal = normal.normalize_or_zero().into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj, Vec3::ONE).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        assert!(mesh.vertices.iter().all(|v| v.color() == Vec3::ONE));
    }

    #[test]
    fn computes_missing_normals() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(obj, Vec3::ONE).unwrap();
        for vertex in &mesh.vertices {
            assert!(vertex.normal().abs_diff_eq(Vec3::Z, 1e-6));
        }
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn quads_are_fan_triangulated_and_shared() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";
        let mesh = load_obj_from_str(obj, Vec3::splat(0.5)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices[2].position(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.vertices[0].normal(), Vec3::Z);
    }

    #[test]
    fn split_normals_keep_separate_vertices() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 1
vn 0 1 0
f 1//1 2//1 3//1
f 1//2 2//2 4//2
";
        let mesh = load_obj_from_str(obj, Vec3::ONE).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3/1/ -2 -1\n";
        let mesh = load_obj_from_str(obj, Vec3::ONE).unwrap();
        assert_eq!(mesh.vertices[0].position(), Vec3::ZERO);
        assert_eq!(mesh.vertices[2].position(), Vec3::Y);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(load_obj_from_str("# only a comment\n", Vec3::ONE).is_err());
        assert!(load_obj_from_str("v 0 0\n", Vec3::ONE).is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nf 1 2\n", Vec3::ONE).is_err());
        assert!(load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n", Vec3::ONE).is_err());
        let err = load_obj_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1//4 2 3\n", Vec3::ONE)
            .unwrap_err();
        assert!(err.to_string().contains("normal index 4"));
    }

    #[test]
    fn rejects_point_cloud_without_faces() {
        let err = load_obj_from_str("v 0 0 0\nv 1 0 0\n", Vec3::ONE).unwrap_err();
        assert!(err.to_string().contains("does not define any faces"));
    }
}
