use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3};

use fast_raycasting_wgpu::geometry;
use fast_raycasting_wgpu::{BodyId, MeshDedup, MeshKey, RenderError, SceneBatcher, SceneBody, Transform};

fn demo_bodies() -> Vec<SceneBody> {
    let cube = Arc::new(geometry::cube());
    let sphere = Arc::new(geometry::sphere(1));
    let plane = Arc::new(geometry::plane());
    vec![
        SceneBody::new(BodyId(10), cube.clone(), Transform::from_translation(Vec3::X)),
        SceneBody::new(
            BodyId(11),
            sphere,
            Transform::from_translation(Vec3::new(0.0, 2.0, 5.0)).with_scale(Vec3::splat(0.5)),
        )
        .with_material(3),
        SceneBody::new(
            BodyId(12),
            plane,
            Transform::IDENTITY.with_rotation(Quat::from_rotation_y(1.0)),
        ),
        SceneBody::new(BodyId(13), cube, Transform::IDENTITY),
    ]
}

fn registered(bodies: &[SceneBody], dedup: MeshDedup) -> SceneBatcher {
    let mut batcher = SceneBatcher::new(dedup);
    for body in bodies {
        batcher.register(body).unwrap();
    }
    batcher
}

#[test]
fn every_triangle_index_addresses_the_global_vertex_array() {
    let bodies = demo_bodies();
    for dedup in [MeshDedup::Disabled, MeshDedup::ByMeshKey] {
        let mut batcher = registered(&bodies, dedup);
        let flat = batcher.flatten(&bodies).unwrap();
        let vertex_count = flat.vertices.len() as u32;
        assert!(flat
            .triangles
            .iter()
            .flat_map(|t| t.indices)
            .all(|i| i < vertex_count));
    }
}

#[test]
fn mesh_records_partition_the_triangle_array() {
    let bodies = demo_bodies();
    let mut batcher = registered(&bodies, MeshDedup::Disabled);
    let flat = batcher.flatten(&bodies).unwrap();

    let mut expected_start = 0;
    for record in flat.meshes {
        assert_eq!(record.triangle_start, expected_start);
        assert!(record.triangle_end >= record.triangle_start);
        expected_start = record.triangle_end;
    }
    assert_eq!(expected_start as usize, flat.triangles.len());

    assert_eq!(flat.bodies.len(), bodies.len());
    assert!(flat.bodies.iter().all(|b| (b.mesh_index as usize) < flat.meshes.len()));
    assert_eq!(flat.bodies[1].material_index, 3);
    assert_eq!(flat.bodies[0].material_index, geometry::NO_MATERIAL);
}

#[test]
fn flatten_twice_is_byte_identical() {
    let bodies = demo_bodies();
    let mut batcher = registered(&bodies, MeshDedup::Disabled);

    let first = batcher.flatten(&bodies).unwrap();
    let snapshot = (
        bytemuck::cast_slice::<_, u8>(first.vertices).to_vec(),
        bytemuck::cast_slice::<_, u8>(first.triangles).to_vec(),
        bytemuck::cast_slice::<_, u8>(first.meshes).to_vec(),
        bytemuck::cast_slice::<_, u8>(first.bodies).to_vec(),
    );

    let second = batcher.flatten(&bodies).unwrap();
    assert_eq!(snapshot.0, bytemuck::cast_slice::<_, u8>(second.vertices));
    assert_eq!(snapshot.1, bytemuck::cast_slice::<_, u8>(second.triangles));
    assert_eq!(snapshot.2, bytemuck::cast_slice::<_, u8>(second.meshes));
    assert_eq!(snapshot.3, bytemuck::cast_slice::<_, u8>(second.bodies));
}

#[test]
fn positions_are_baked_with_current_transform() {
    let mut bodies = demo_bodies();
    let mut batcher = registered(&bodies, MeshDedup::Disabled);

    let local = Vec3::from_array(bodies[0].mesh().vertices()[0].position);
    let flat = batcher.flatten(&bodies).unwrap();
    let world = Vec3::from_array(flat.vertices[0].position);
    assert!(world.abs_diff_eq(local + Vec3::X, 1e-6));

    // Moving the body shows up on the next flatten without re-registering.
    bodies[0].transform = Transform::from_translation(Vec3::new(0.0, 0.0, -4.0));
    let flat = batcher.flatten(&bodies).unwrap();
    let world = Vec3::from_array(flat.vertices[0].position);
    assert!(world.abs_diff_eq(local + Vec3::new(0.0, 0.0, -4.0), 1e-6));
}

#[test]
fn registration_order_drives_output_order() {
    let bodies = demo_bodies();
    let mut batcher = SceneBatcher::default();
    batcher.register(&bodies[2]).unwrap();
    batcher.register(&bodies[0]).unwrap();

    let flat = batcher.flatten(&bodies).unwrap();
    // Plane (2 triangles) first, then the cube (12).
    assert_eq!(flat.meshes[0].len(), 2);
    assert_eq!(flat.meshes[1].len(), 12);
}

#[test]
fn unregistered_bodies_drop_out_of_the_next_flatten() {
    let bodies = demo_bodies();
    let mut batcher = registered(&bodies, MeshDedup::Disabled);
    batcher.unregister(&bodies[1]).unwrap();
    assert_eq!(batcher.registered(), &[BodyId(10), BodyId(12), BodyId(13)]);

    let flat = batcher.flatten(&bodies).unwrap();
    assert_eq!(flat.bodies.len(), 3);
    assert!(matches!(
        batcher.unregister(&bodies[1]),
        Err(RenderError::NotRegistered(BodyId(11)))
    ));
}

#[test]
fn dedup_only_merges_equal_keys() {
    let cube = Arc::new(geometry::cube());
    let keyed = Arc::new(geometry::cube().with_key(MeshKey(7)));
    let bodies = vec![
        SceneBody::new(BodyId(1), cube.clone(), Transform::IDENTITY),
        SceneBody::new(BodyId(2), keyed, Transform::IDENTITY),
        SceneBody::new(BodyId(3), cube, Transform::from_translation(Vec3::Y)),
    ];
    let mut batcher = registered(&bodies, MeshDedup::ByMeshKey);
    let flat = batcher.flatten(&bodies).unwrap();
    let indices: Vec<u32> = flat.bodies.iter().map(|b| b.mesh_index).collect();
    assert_eq!(indices, vec![0, 1, 0]);
    assert_eq!(flat.meshes.len(), 2);
}

#[test]
fn hash_map_can_be_the_body_source() {
    let bodies: HashMap<BodyId, SceneBody> =
        demo_bodies().into_iter().map(|b| (b.id(), b)).collect();
    let mut batcher = SceneBatcher::default();
    for id in [BodyId(13), BodyId(11)] {
        batcher.register(&bodies[&id]).unwrap();
    }
    let flat = batcher.flatten(&bodies).unwrap();
    assert_eq!(flat.bodies.len(), 2);
    assert_eq!(flat.bodies[1].material_index, 3);
}

#[test]
fn every_position_is_baked_with_rotation_and_non_uniform_scale() {
    let cube = Arc::new(geometry::cube());
    let sphere = Arc::new(geometry::sphere(1));
    let transforms = [
        Transform::from_translation(Vec3::new(1.5, -2.0, 0.25))
            .with_rotation(Quat::from_euler(glam::EulerRot::XYZ, 0.3, -1.1, 0.7))
            .with_scale(Vec3::new(2.0, 0.5, 3.0)),
        Transform::from_translation(Vec3::new(-4.0, 0.0, 9.0))
            .with_rotation(Quat::from_rotation_z(2.5))
            .with_scale(Vec3::new(0.25, 4.0, 1.0)),
    ];
    let bodies = vec![
        SceneBody::new(BodyId(1), cube, transforms[0]),
        SceneBody::new(BodyId(2), sphere, transforms[1]),
    ];
    let mut batcher = registered(&bodies, MeshDedup::Disabled);
    let flat = batcher.flatten(&bodies).unwrap();

    let mut offset = 0;
    for (body, transform) in bodies.iter().zip(&transforms) {
        let matrix = transform.matrix();
        for (i, local) in body.mesh().vertices().iter().enumerate() {
            let expected = matrix.transform_point3(Vec3::from_array(local.position));
            let actual = Vec3::from_array(flat.vertices[offset + i].position);
            assert!(
                actual.abs_diff_eq(expected, 1e-5),
                "body {:?} vertex {i}: {actual:?} != {expected:?}",
                body.id()
            );
        }
        offset += body.mesh().vertices().len();
    }
    assert_eq!(offset, flat.vertices.len());
}

#[test]
fn indices_stay_valid_across_register_unregister_sequences() {
    let bodies = demo_bodies();
    let mut batcher = SceneBatcher::default();

    let check = |batcher: &mut SceneBatcher, expected_bodies: usize| {
        let flat = batcher.flatten(&bodies).unwrap();
        assert_eq!(flat.bodies.len(), expected_bodies);
        let vertex_count = flat.vertices.len() as u32;
        for triangle in flat.triangles {
            assert!(triangle.indices.iter().all(|&i| i < vertex_count), "{triangle:?}");
        }
        let triangle_count = flat.triangles.len() as u32;
        assert!(flat.meshes.iter().all(|m| m.triangle_end <= triangle_count));
    };

    batcher.register(&bodies[0]).unwrap();
    batcher.register(&bodies[1]).unwrap();
    check(&mut batcher, 2);

    batcher.unregister(&bodies[0]).unwrap();
    batcher.register(&bodies[2]).unwrap();
    check(&mut batcher, 2);

    batcher.register(&bodies[3]).unwrap();
    batcher.register(&bodies[0]).unwrap();
    check(&mut batcher, 4);
    assert_eq!(
        batcher.registered(),
        &[BodyId(11), BodyId(12), BodyId(13), BodyId(10)]
    );

    batcher.unregister_id(BodyId(11)).unwrap();
    batcher.unregister_id(BodyId(13)).unwrap();
    check(&mut batcher, 2);

    for body in &bodies {
        batcher.unregister_id(body.id()).ok();
    }
    check(&mut batcher, 0);
}
