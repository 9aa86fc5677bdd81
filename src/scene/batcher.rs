use std::collections::{HashMap, HashSet};

use glam::Vec3;

use super::body::{BodyId, BodySource, MeshKey, SceneBody};
use crate::config::MeshDedup;
use crate::error::{RenderError, Result};
use crate::geometry::{BodyRecord, MeshRecord, Triangle, Vertex, NO_MATERIAL};

/// Borrowed view of the four flat arrays produced by [`SceneBatcher::flatten`].
#[derive(Clone, Copy, Debug)]
pub struct FlatScene<'a> {
    pub vertices: &'a [Vertex],
    pub triangles: &'a [Triangle],
    pub meshes: &'a [MeshRecord],
    pub bodies: &'a [BodyRecord],
}

/// Flattens registered bodies into global vertex/triangle/mesh/body arrays.
///
/// Bodies are referenced by id only; the host owns them and hands a
/// [`BodySource`] to every `flatten` call.
pub struct SceneBatcher {
    dedup: MeshDedup,
    order: Vec<BodyId>,
    registered: HashSet<BodyId>,
    mesh_key_to_index: HashMap<MeshKey, u32>,

    vertices: Vec<Vertex>,
    triangles: Vec<Triangle>,
    meshes: Vec<MeshRecord>,
    bodies: Vec<BodyRecord>,
}

impl Default for SceneBatcher {
    fn default() -> Self {
        Self::new(MeshDedup::default())
    }
}

impl SceneBatcher {
    pub fn new(dedup: MeshDedup) -> Self {
        Self {
            dedup,
            order: Vec::new(),
            registered: HashSet::new(),
            mesh_key_to_index: HashMap::new(),
            vertices: Vec::new(),
            triangles: Vec::new(),
            meshes: Vec::new(),
            bodies: Vec::new(),
        }
    }

    pub fn register(&mut self, body: &SceneBody) -> Result<()> {
        let id = body.id();
        if !self.registered.insert(id) {
            return Err(RenderError::DuplicateRegistration(id));
        }
        self.order.push(id);
        log::trace!("registered body {:?}", id);
        Ok(())
    }

    pub fn unregister(&mut self, body: &SceneBody) -> Result<()> {
        self.unregister_id(body.id())
    }

    /// Unregisters by id, for hosts that already dropped the body.
    pub fn unregister_id(&mut self, id: BodyId) -> Result<()> {
        if !self.registered.remove(&id) {
            return Err(RenderError::NotRegistered(id));
        }
        self.order.retain(|&b| b != id);
        log::trace!("unregistered body {:?}", id);
        Ok(())
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.registered.contains(&id)
    }

    /// Registered body ids in registration order.
    pub fn registered(&self) -> &[BodyId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rebuilds all four arrays from scratch, in registration order.
    ///
    /// Positions are baked into world space with each body's current
    /// transform. Normals are transformed by the inverse transpose of the
    /// world matrix and renormalized, so the kernel can shade in world space.
    pub fn flatten<S>(&mut self, source: &S) -> Result<FlatScene<'_>>
    where
        S: BodySource + ?Sized,
    {
        self.vertices.clear();
        self.triangles.clear();
        self.meshes.clear();
        self.bodies.clear();
        self.mesh_key_to_index.clear();

        for &id in &self.order {
            let body = source.body(id).ok_or(RenderError::BodyMissing(id))?;

            let reused = match self.dedup {
                MeshDedup::ByMeshKey => self.mesh_key_to_index.get(&body.mesh_key()).copied(),
                MeshDedup::Disabled => None,
            };
            let mesh_index = match reused {
                Some(index) => index,
                None => {
                    let index = append_mesh(
                        body,
                        &mut self.vertices,
                        &mut self.triangles,
                        &mut self.meshes,
                    );
                    if self.dedup == MeshDedup::ByMeshKey {
                        self.mesh_key_to_index.insert(body.mesh_key(), index);
                    }
                    index
                }
            };

            self.bodies.push(BodyRecord {
                mesh_index,
                material_index: body.material.map_or(NO_MATERIAL, |m| m as i32),
            });
        }

        log::debug!(
            "flattened {} bodies: {} vertices, {} triangles, {} meshes",
            self.bodies.len(),
            self.vertices.len(),
            self.triangles.len(),
            self.meshes.len()
        );

        Ok(self.output())
    }

    /// Arrays produced by the last `flatten` call.
    pub fn output(&self) -> FlatScene<'_> {
        FlatScene {
            vertices: &self.vertices,
            triangles: &self.triangles,
            meshes: &self.meshes,
            bodies: &self.bodies,
        }
    }
}

// Appends one body's world-space geometry and its mesh record; returns the record index.
fn append_mesh(
    body: &SceneBody,
    vertices: &mut Vec<Vertex>,
    triangles: &mut Vec<Triangle>,
    meshes: &mut Vec<MeshRecord>,
) -> u32 {
    let mesh = body.mesh();
    let world = body.transform.matrix();
    let normal_matrix = body.transform.normal_matrix();

    // All vertices share one global array, so local indices are shifted by this.
    let vertex_offset = vertices.len() as u32;
    vertices.extend(mesh.vertices().iter().map(|v| Vertex {
        position: world
            .transform_point3(Vec3::from_array(v.position))
            .to_array(),
        normal: (normal_matrix * Vec3::from_array(v.normal))
            .normalize_or_zero()
            .to_array(),
        uv: v.uv,
    }));

    let triangle_start = triangles.len() as u32;
    triangles.extend(mesh.triangles().iter().map(|t| t.offset(vertex_offset)));

    let index = meshes.len() as u32;
    meshes.push(MeshRecord {
        triangle_start,
        triangle_end: triangles.len() as u32,
    });
    index
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry;
    use crate::scene::Transform;

    fn body(id: u64, mesh: &Arc<crate::scene::Mesh>) -> SceneBody {
        SceneBody::new(BodyId(id), mesh.clone(), Transform::IDENTITY)
    }

    #[test]
    fn duplicate_registration_fails() {
        let mesh = Arc::new(geometry::plane());
        let a = body(1, &mesh);
        let mut batcher = SceneBatcher::default();
        batcher.register(&a).unwrap();
        assert!(matches!(
            batcher.register(&a),
            Err(RenderError::DuplicateRegistration(BodyId(1)))
        ));
        assert_eq!(batcher.len(), 1);
    }

    #[test]
    fn unregister_unknown_fails() {
        let mesh = Arc::new(geometry::plane());
        let mut batcher = SceneBatcher::default();
        assert!(matches!(
            batcher.unregister(&body(9, &mesh)),
            Err(RenderError::NotRegistered(BodyId(9)))
        ));
    }

    #[test]
    fn unregister_keeps_remaining_order() {
        let mesh = Arc::new(geometry::plane());
        let bodies: Vec<_> = (1..=4).map(|i| body(i, &mesh)).collect();
        let mut batcher = SceneBatcher::default();
        for b in &bodies {
            batcher.register(b).unwrap();
        }
        batcher.unregister(&bodies[1]).unwrap();
        assert_eq!(batcher.registered(), &[BodyId(1), BodyId(3), BodyId(4)]);
        assert!(!batcher.contains(BodyId(2)));
    }

    #[test]
    fn missing_body_is_reported() {
        let mesh = Arc::new(geometry::plane());
        let mut batcher = SceneBatcher::default();
        batcher.register(&body(5, &mesh)).unwrap();
        let source: Vec<SceneBody> = Vec::new();
        assert!(matches!(
            batcher.flatten(&source),
            Err(RenderError::BodyMissing(BodyId(5)))
        ));
    }

    #[test]
    fn triangles_are_offset_into_global_vertices() {
        let plane = Arc::new(geometry::plane());
        let cube = Arc::new(geometry::cube());
        let bodies = vec![body(1, &plane), body(2, &cube)];
        let mut batcher = SceneBatcher::default();
        for b in &bodies {
            batcher.register(b).unwrap();
        }
        let flat = batcher.flatten(&bodies).unwrap();

        assert_eq!(flat.vertices.len(), 4 + 24);
        assert_eq!(flat.triangles.len(), 2 + 12);
        assert_eq!(flat.triangles[2], cube.triangles()[0].offset(4));
        assert_eq!(
            flat.meshes,
            &[
                MeshRecord { triangle_start: 0, triangle_end: 2 },
                MeshRecord { triangle_start: 2, triangle_end: 14 },
            ]
        );
        assert_eq!(flat.bodies[1].mesh_index, 1);
        assert_eq!(flat.bodies[1].material_index, NO_MATERIAL);
    }

    #[test]
    fn dedup_reuses_mesh_record_for_equal_keys() {
        let plane = Arc::new(geometry::plane());
        let cube = Arc::new(geometry::cube());
        let bodies = vec![body(1, &plane), body(2, &cube), body(3, &plane)];
        let mut batcher = SceneBatcher::new(MeshDedup::ByMeshKey);
        for b in &bodies {
            batcher.register(b).unwrap();
        }
        let flat = batcher.flatten(&bodies).unwrap();

        assert_eq!(flat.meshes.len(), 2);
        assert_eq!(flat.vertices.len(), 4 + 24);
        let indices: Vec<u32> = flat.bodies.iter().map(|b| b.mesh_index).collect();
        assert_eq!(indices, vec![0, 1, 0]);
    }

    #[test]
    fn normals_follow_rotation() {
        let plane = Arc::new(geometry::plane());
        let rotated = SceneBody::new(
            BodyId(1),
            plane,
            Transform::IDENTITY
                .with_rotation(glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::new(3.0, 1.0, 3.0)),
        );
        let mut batcher = SceneBatcher::default();
        batcher.register(&rotated).unwrap();
        let bodies = [rotated];
        let flat = batcher.flatten(&bodies[..]).unwrap();
        let n = Vec3::from_array(flat.vertices[0].normal);
        assert!(n.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5), "{n:?}");
    }
}
