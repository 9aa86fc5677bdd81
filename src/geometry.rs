use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::scene::Mesh;

// Vertex (32 bytes). Matches `Vertex` in raycast.wgsl: two array<f32, 3> then vec2.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Three vertex indices. Local to a mesh until flattened, global after.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }

    pub fn offset(self, by: u32) -> Self {
        let [a, b, c] = self.indices;
        Self::new(a + by, b + by, c + by)
    }
}

/// Half-open triangle range `[triangle_start, triangle_end)` of one mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshRecord {
    pub triangle_start: u32,
    pub triangle_end: u32,
}

impl MeshRecord {
    pub fn len(&self) -> u32 {
        self.triangle_end - self.triangle_start
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_start == self.triangle_end
    }
}

/// Sentinel for a body without material.
pub const NO_MATERIAL: i32 = -1;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BodyRecord {
    pub mesh_index: u32,
    pub material_index: i32,
}

// Ray (24 bytes), row-major per pixel.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Ray {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin: origin.to_array(),
            direction: direction.to_array(),
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.direction)
    }
}

/// Scalar uniforms of the kernel (`params` in raycast.wgsl, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub body_data_count: u32,
    pub width: u32,
    pub height: u32,
    pub _padding: u32,
    pub background_color: [f32; 4],
}

// --- Primitive meshes (local space, unit size, centered at the origin) ---

/// 1x1 quad in the XZ plane facing +Y.
pub fn plane() -> Mesh {
    let n = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-0.5, 0.0, 0.5], n, [0.0, 1.0]),
        Vertex::new([0.5, 0.0, 0.5], n, [1.0, 1.0]),
        Vertex::new([-0.5, 0.0, -0.5], n, [0.0, 0.0]),
        Vertex::new([0.5, 0.0, -0.5], n, [1.0, 0.0]),
    ];
    let triangles = vec![Triangle::new(0, 1, 2), Triangle::new(2, 1, 3)];
    Mesh::from_parts(vertices, triangles)
}

pub fn cube() -> Mesh {
    let mut vertices = Vec::with_capacity(24);
    let mut triangles = Vec::with_capacity(12);

    let sides = [
        (
            [0.0, 0.0, 1.0],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ), // Front
        (
            [0.0, 0.0, -1.0],
            [0.5, -0.5, -0.5],
            [-0.5, -0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [0.5, 0.5, -0.5],
        ), // Back
        (
            [0.0, 1.0, 0.0],
            [-0.5, 0.5, 0.5],
            [0.5, 0.5, 0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
        ), // Top
        (
            [0.0, -1.0, 0.0],
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, -0.5, 0.5],
            [-0.5, -0.5, 0.5],
        ), // Bottom
        (
            [1.0, 0.0, 0.0],
            [0.5, -0.5, 0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [0.5, 0.5, 0.5],
        ), // Right
        (
            [-1.0, 0.0, 0.0],
            [-0.5, -0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [-0.5, 0.5, 0.5],
            [-0.5, 0.5, -0.5],
        ), // Left
    ];

    for (normal, v0, v1, v2, v3) in sides {
        let base = vertices.len() as u32;
        vertices.push(Vertex::new(v0, normal, [0.0, 1.0]));
        vertices.push(Vertex::new(v1, normal, [1.0, 1.0]));
        vertices.push(Vertex::new(v2, normal, [1.0, 0.0]));
        vertices.push(Vertex::new(v3, normal, [0.0, 0.0]));

        triangles.push(Triangle::new(base, base + 1, base + 2));
        triangles.push(Triangle::new(base, base + 2, base + 3));
    }

    Mesh::from_parts(vertices, triangles)
}

/// Icosphere of radius 0.5. Each subdivision multiplies the triangle count by 4,
/// so keep it low against the default 1000-triangle limit.
pub fn sphere(subdivisions: u32) -> Mesh {
    let mut vertices: Vec<Vertex> = Vec::new();
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;

    let seeds = [
        [-1.0, t, 0.0],
        [1.0, t, 0.0],
        [-1.0, -t, 0.0],
        [1.0, -t, 0.0],
        [0.0, -1.0, t],
        [0.0, 1.0, t],
        [0.0, -1.0, -t],
        [0.0, 1.0, -t],
        [t, 0.0, -1.0],
        [t, 0.0, 1.0],
        [-t, 0.0, -1.0],
        [-t, 0.0, 1.0],
    ];
    for p in seeds {
        push_sphere_vertex(&mut vertices, Vec3::from_array(p));
    }

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let mut midpoint_cache = HashMap::new();
    for _ in 0..subdivisions {
        let mut new_faces = Vec::with_capacity(faces.len() * 4);
        for [v1, v2, v3] in faces {
            let a = midpoint(v1, v2, &mut vertices, &mut midpoint_cache);
            let b = midpoint(v2, v3, &mut vertices, &mut midpoint_cache);
            let c = midpoint(v3, v1, &mut vertices, &mut midpoint_cache);

            new_faces.push([v1, a, c]);
            new_faces.push([v2, b, a]);
            new_faces.push([v3, c, b]);
            new_faces.push([a, b, c]);
        }
        faces = new_faces;
    }

    let triangles = faces
        .into_iter()
        .map(|[a, b, c]| Triangle::new(a, b, c))
        .collect();
    Mesh::from_parts(vertices, triangles)
}

fn push_sphere_vertex(vertices: &mut Vec<Vertex>, p: Vec3) -> u32 {
    let n = p.normalize();
    let u = 0.5 + n.z.atan2(n.x) / std::f32::consts::TAU;
    let v = 0.5 - n.y.asin() / std::f32::consts::PI;
    vertices.push(Vertex::new((n * 0.5).to_array(), n.to_array(), [u, v]));
    vertices.len() as u32 - 1
}

fn midpoint(
    p1: u32,
    p2: u32,
    vertices: &mut Vec<Vertex>,
    cache: &mut HashMap<(u32, u32), u32>,
) -> u32 {
    let key = if p1 < p2 { (p1, p2) } else { (p2, p1) };
    if let Some(&index) = cache.get(&key) {
        return index;
    }

    let a = Vec3::from_array(vertices[p1 as usize].position);
    let b = Vec3::from_array(vertices[p2 as usize].position);
    let index = push_sphere_vertex(vertices, (a + b) * 0.5);
    cache.insert(key, index);
    index
}

/// Hexagonal-ish crystal: two square pyramids joined by a prism. Flat shaded.
pub fn crystal() -> Mesh {
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();

    let top_tip = Vec3::new(0.0, 1.0, 0.0);
    let top_ring = [
        Vec3::new(0.3, 0.5, 0.3),
        Vec3::new(-0.3, 0.5, 0.3),
        Vec3::new(-0.3, 0.5, -0.3),
        Vec3::new(0.3, 0.5, -0.3),
    ];
    let bottom_ring = [
        Vec3::new(0.3, -0.5, 0.3),
        Vec3::new(-0.3, -0.5, 0.3),
        Vec3::new(-0.3, -0.5, -0.3),
        Vec3::new(0.3, -0.5, -0.3),
    ];
    let bottom_tip = Vec3::new(0.0, -1.0, 0.0);

    let mut add_face = |p0: Vec3, p1: Vec3, p2: Vec3| {
        // CCW winding, normal towards the viewer.
        let n = (p1 - p0).cross(p2 - p0).normalize().to_array();
        let base = vertices.len() as u32;
        vertices.push(Vertex::new(p0.to_array(), n, [0.0; 2]));
        vertices.push(Vertex::new(p1.to_array(), n, [0.0; 2]));
        vertices.push(Vertex::new(p2.to_array(), n, [0.0; 2]));
        triangles.push(Triangle::new(base, base + 1, base + 2));
    };

    for i in 0..4 {
        add_face(top_tip, top_ring[(i + 1) % 4], top_ring[i]);
    }
    for i in 0..4 {
        let next = (i + 1) % 4;
        add_face(top_ring[i], top_ring[next], bottom_ring[next]);
        add_face(top_ring[i], bottom_ring[next], bottom_ring[i]);
    }
    for i in 0..4 {
        add_face(bottom_tip, bottom_ring[i], bottom_ring[(i + 1) % 4]);
    }

    Mesh::from_parts(vertices, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_record_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<Triangle>(), 12);
        assert_eq!(std::mem::size_of::<MeshRecord>(), 8);
        assert_eq!(std::mem::size_of::<BodyRecord>(), 8);
        assert_eq!(std::mem::size_of::<Ray>(), 24);
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
    }

    #[test]
    fn primitives_have_in_range_indices() {
        for mesh in [plane(), cube(), sphere(1), crystal()] {
            let count = mesh.vertices().len() as u32;
            for tri in mesh.triangles() {
                assert!(tri.indices.iter().all(|&i| i < count));
            }
        }
    }

    #[test]
    fn sphere_subdivision_quadruples_faces() {
        assert_eq!(sphere(0).triangles().len(), 20);
        assert_eq!(sphere(1).triangles().len(), 80);
        assert_eq!(sphere(2).triangles().len(), 320);
    }

    #[test]
    fn cube_and_crystal_counts() {
        assert_eq!(cube().vertices().len(), 24);
        assert_eq!(cube().triangles().len(), 12);
        assert_eq!(crystal().triangles().len(), 16);
    }
}
