use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Floats per vertex: position.xyz then normal.xyz.
pub const VERTEX_STRIDE: usize = 6;

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("mesh does not define any vertices")]
    Empty,
    #[error("face references missing vertex {0}")]
    BadIndex(i64),
}

/// Indexed triangle mesh with interleaved position/normal vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let start = index * VERTEX_STRIDE;
        Vec3::from_slice(&self.vertices[start..start + 3])
    }

    /// Torus around the Y axis, used when the scene names no mesh file.
    pub fn torus(major_radius: f32, minor_radius: f32, rings: u32, sides: u32) -> Self {
        let rings = rings.max(3);
        let sides = sides.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (sides + 1)) as usize * VERTEX_STRIDE);
        for ring in 0..=rings {
            let u = ring as f32 / rings as f32 * TAU;
            let ring_dir = Vec3::new(u.cos(), 0.0, u.sin());
            for side in 0..=sides {
                let v = side as f32 / sides as f32 * TAU;
                let normal = ring_dir * v.cos() + Vec3::Y * v.sin();
                let position = ring_dir * major_radius + normal * minor_radius;
                vertices.extend_from_slice(&position.to_array());
                vertices.extend_from_slice(&normal.to_array());
            }
        }

        let stride = sides + 1;
        let mut indices = Vec::with_capacity((rings * sides * 6) as usize);
        for ring in 0..rings {
            for side in 0..sides {
                let a = ring * stride + side;
                let b = (ring + 1) * stride + side;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self { vertices, indices }
    }

    /// Parses Wavefront OBJ text. Polygons are fan-triangulated and missing
    /// normals are rebuilt from face geometry.
    pub fn from_obj(data: &str) -> Result<Self, MeshError> {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut corners: Vec<Corner> = Vec::new();

        for (index, line) in data.lines().enumerate() {
            let line_no = index + 1;
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => positions.push(read_vec3(parts, line_no)?),
                Some("vn") => normals.push(read_vec3(parts, line_no)?),
                Some("f") => {
                    let polygon = parts
                        .map(|token| read_corner(token, line_no))
                        .collect::<Result<Vec<_>, _>>()?;
                    if polygon.len() < 3 {
                        return Err(MeshError::Syntax {
                            line: line_no,
                            message: "face needs at least three vertices".into(),
                        });
                    }
                    for i in 1..polygon.len() - 1 {
                        corners.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if positions.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut mesh = Mesh::default();
        let mut seen: HashMap<(usize, Option<usize>), u32> = HashMap::new();
        let mut missing_normals = false;
        for corner in corners {
            let position = resolve_index(corner.position, positions.len())
                .ok_or(MeshError::BadIndex(corner.position))?;
            let normal = corner
                .normal
                .and_then(|index| resolve_index(index, normals.len()));
            missing_normals |= normal.is_none();
            let next = mesh.vertex_count() as u32;
            let slot = *seen.entry((position, normal)).or_insert_with(|| {
                mesh.vertices
                    .extend_from_slice(&positions[position].to_array());
                let n = normal.map_or(Vec3::ZERO, |i| normals[i]);
                mesh.vertices.extend_from_slice(&n.to_array());
                next
            });
            mesh.indices.push(slot);
        }

        if missing_normals {
            mesh.rebuild_normals();
        }
        Ok(mesh)
    }

    fn rebuild_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertex_count()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| triangle[i] as usize);
            let face = (self.position(b) - self.position(a)).cross(self.position(c) - self.position(a));
            for index in [a, b, c] {
                sums[index] += face;
            }
        }
        // Only vertices still carrying a zero normal lack a `vn` entry.
        for (index, sum) in sums.into_iter().enumerate() {
            let start = index * VERTEX_STRIDE + 3;
            let normal = &mut self.vertices[start..start + 3];
            if normal.iter().all(|component| *component == 0.0) {
                normal.copy_from_slice(&sum.normalize_or_zero().to_array());
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Corner {
    position: i64,
    normal: Option<i64>,
}

fn read_vec3<'a>(parts: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3, MeshError> {
    let values = parts
        .take(3)
        .map(|part| part.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| MeshError::Syntax {
            line,
            message: err.to_string(),
        })?;
    match values.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(MeshError::Syntax {
            line,
            message: "expected three components".into(),
        }),
    }
}

// `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn read_corner(token: &str, line: usize) -> Result<Corner, MeshError> {
    let mut fields = token.split('/');
    let position = fields
        .next()
        .unwrap_or_default()
        .parse::<i64>()
        .map_err(|_| MeshError::Syntax {
            line,
            message: format!("bad face corner `{token}`"),
        })?;
    let normal = fields.nth(1).and_then(|field| field.parse::<i64>().ok());
    Ok(Corner { position, normal })
}

/// OBJ indices are 1-based; negative values count back from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = match index {
        0 => return None,
        i if i > 0 => i - 1,
        i => len as i64 + i,
    };
    usize::try_from(resolved).ok().filter(|&i| i < len)
}
