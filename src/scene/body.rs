use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::error::{RenderError, Result};
use crate::geometry::{Triangle, Vertex};

/// Host-assigned identity of a scene body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u64);

/// Stable identity of a mesh's content, used for dedup batching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshKey(pub u64);

/// Local-space mesh data. Immutable once built.
#[derive(Clone, Debug)]
pub struct Mesh {
    key: MeshKey,
    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Builds a mesh from a flat triangle index list (three indices per
    /// triangle) and per-vertex attribute arrays of equal length.
    pub fn from_indexed(
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        uvs: &[[f32; 2]],
        indices: &[u32],
    ) -> Result<Self> {
        if normals.len() != positions.len() || uvs.len() != positions.len() {
            return Err(RenderError::InvalidMesh(format!(
                "attribute count mismatch: {} positions, {} normals, {} uvs",
                positions.len(),
                normals.len(),
                uvs.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(RenderError::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                positions.len()
            )));
        }

        let vertices = positions
            .iter()
            .zip(normals)
            .zip(uvs)
            .map(|((&p, &n), &uv)| Vertex::new(p, n, uv))
            .collect();
        let triangles = indices
            .chunks_exact(3)
            .map(|t| Triangle::new(t[0], t[1], t[2]))
            .collect();
        Ok(Self::from_parts(vertices, triangles))
    }

    /// Wraps already-validated data, keyed by its content hash.
    pub(crate) fn from_parts(vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Self {
        let key = content_key(&vertices, &triangles);
        Self {
            key,
            vertices,
            triangles,
        }
    }

    /// Replaces the content-derived key with a caller-supplied one.
    pub fn with_key(mut self, key: MeshKey) -> Self {
        self.key = key;
        self
    }

    pub fn key(&self) -> MeshKey {
        self.key
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}

// SipHash with fixed keys: deterministic across runs and processes.
fn content_key(vertices: &[Vertex], triangles: &[Triangle]) -> MeshKey {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    hasher.write(bytemuck::cast_slice(vertices));
    triangles.hash(&mut hasher);
    MeshKey(hasher.finish())
}

/// World transform snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Inverse transpose of the linear part, for transforming normals.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.matrix()).inverse().transpose()
    }
}

/// One mesh instance placed in the scene.
#[derive(Clone, Debug)]
pub struct SceneBody {
    id: BodyId,
    mesh: Arc<Mesh>,
    pub transform: Transform,
    pub material: Option<u32>,
}

impl SceneBody {
    pub fn new(id: BodyId, mesh: Arc<Mesh>, transform: Transform) -> Self {
        Self {
            id,
            mesh,
            transform,
            material: None,
        }
    }

    pub fn with_material(mut self, material: u32) -> Self {
        self.material = Some(material);
        self
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_key(&self) -> MeshKey {
        self.mesh.key()
    }
}

/// Lookup of live bodies by id, provided by the host scene.
pub trait BodySource {
    fn body(&self, id: BodyId) -> Option<&SceneBody>;
}

impl BodySource for HashMap<BodyId, SceneBody> {
    fn body(&self, id: BodyId) -> Option<&SceneBody> {
        self.get(&id)
    }
}

impl BodySource for [SceneBody] {
    fn body(&self, id: BodyId) -> Option<&SceneBody> {
        self.iter().find(|b| b.id == id)
    }
}

impl BodySource for Vec<SceneBody> {
    fn body(&self, id: BodyId) -> Option<&SceneBody> {
        self.as_slice().body(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_indexed_rejects_partial_triangle() {
        let p = [[0.0; 3]; 3];
        let err = Mesh::from_indexed(&p, &p, &[[0.0; 2]; 3], &[0, 1]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidMesh(_)));
    }

    #[test]
    fn from_indexed_rejects_out_of_range_index() {
        let p = [[0.0; 3]; 3];
        let err = Mesh::from_indexed(&p, &p, &[[0.0; 2]; 3], &[0, 1, 3]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidMesh(_)));
    }

    #[test]
    fn from_indexed_rejects_attribute_mismatch() {
        let p = [[0.0; 3]; 3];
        let err = Mesh::from_indexed(&p, &p[..2], &[[0.0; 2]; 3], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidMesh(_)));
    }

    #[test]
    fn content_key_is_deterministic_and_content_sensitive() {
        let p = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let n = [[0.0, 0.0, 1.0]; 3];
        let uv = [[0.0; 2]; 3];
        let a = Mesh::from_indexed(&p, &n, &uv, &[0, 1, 2]).unwrap();
        let b = Mesh::from_indexed(&p, &n, &uv, &[0, 1, 2]).unwrap();
        let c = Mesh::from_indexed(&p, &n, &uv, &[0, 2, 1]).unwrap();
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(c.with_key(MeshKey(7)).key(), MeshKey(7));
    }

    #[test]
    fn slice_source_finds_by_id() {
        let mesh = Arc::new(crate::geometry::plane());
        let bodies = vec![
            SceneBody::new(BodyId(1), mesh.clone(), Transform::IDENTITY),
            SceneBody::new(BodyId(2), mesh, Transform::IDENTITY),
        ];
        assert_eq!(bodies.body(BodyId(2)).map(SceneBody::id), Some(BodyId(2)));
        assert!(bodies.body(BodyId(3)).is_none());
    }
}
