use std::sync::Arc;

use glam::{Quat, Vec3};

use super::{BodyId, SceneBody, Transform};
use crate::geometry;

/// Small box-room scene that fits the default buffer limits
/// (well under 1000 vertices / 1000 triangles).
pub fn create_demo_scene() -> Vec<SceneBody> {
    let plane = Arc::new(geometry::plane());
    let cube = Arc::new(geometry::cube());
    let sphere = Arc::new(geometry::sphere(1));
    let crystal = Arc::new(geometry::crystal());

    let mut next_id = 0;
    let mut id = || {
        next_id += 1;
        BodyId(next_id)
    };

    vec![
        // Floor
        SceneBody::new(
            id(),
            plane.clone(),
            Transform::from_translation(Vec3::new(0.0, -1.0, 0.0)).with_scale(Vec3::splat(2.0)),
        )
        .with_material(0),
        // Back wall
        SceneBody::new(
            id(),
            plane.clone(),
            Transform::from_translation(Vec3::new(0.0, 0.0, 1.0))
                .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(2.0)),
        ),
        // Left wall
        SceneBody::new(
            id(),
            plane.clone(),
            Transform::from_translation(Vec3::new(-1.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(2.0)),
        ),
        // Right wall
        SceneBody::new(
            id(),
            plane,
            Transform::from_translation(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(2.0)),
        ),
        // Tall box
        SceneBody::new(
            id(),
            cube,
            Transform::from_translation(Vec3::new(-0.35, -0.4, 0.3))
                .with_rotation(Quat::from_rotation_y(0.4))
                .with_scale(Vec3::new(0.6, 1.2, 0.6)),
        )
        .with_material(1),
        SceneBody::new(
            id(),
            sphere,
            Transform::from_translation(Vec3::new(0.45, -0.7, 0.0)).with_scale(Vec3::splat(0.6)),
        ),
        SceneBody::new(
            id(),
            crystal,
            Transform::from_translation(Vec3::new(0.4, 0.3, 0.4)).with_scale(Vec3::splat(0.35)),
        )
        .with_material(2),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneLimits;
    use crate::scene::SceneBatcher;

    #[test]
    fn demo_scene_fits_default_limits() {
        let bodies = create_demo_scene();
        let mut batcher = SceneBatcher::default();
        for b in &bodies {
            batcher.register(b).unwrap();
        }
        let flat = batcher.flatten(&bodies).unwrap();
        let limits = SceneLimits::default();
        assert!(flat.vertices.len() <= limits.max_vertices);
        assert!(flat.triangles.len() <= limits.max_triangles);
        assert!(flat.meshes.len() <= limits.max_meshes);
        assert!(flat.bodies.len() <= limits.max_bodies);
    }
}
