use crate::camera::Camera;
use crate::dispatcher::{GpuBackend, GpuDispatcher};
use crate::error::Result;
use crate::scene::{BodySource, SceneBatcher};

/// Counts from one [`render_frame`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub bodies: usize,
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub rays: usize,
    pub groups: [u32; 3],
}

/// Runs one frame: flatten, generate rays, upload, dispatch.
///
/// The dispatch is submitted but not awaited. Nothing is uploaded if the
/// flattened scene does not fit the dispatcher's buffers.
pub fn render_frame<S, B>(
    batcher: &mut SceneBatcher,
    bodies: &S,
    camera: &mut Camera,
    dispatcher: &mut GpuDispatcher<B>,
    target: &B::Target,
) -> Result<FrameStats>
where
    S: BodySource + ?Sized,
    B: GpuBackend,
{
    let flat = batcher.flatten(bodies)?;
    camera.compute_rays();

    dispatcher.upload_scene_buffers(flat.vertices, flat.triangles, flat.meshes, flat.bodies)?;
    dispatcher.upload_rays(camera.rays())?;
    let groups = dispatcher.bind_and_dispatch(camera, flat.bodies.len(), target)?;

    let stats = FrameStats {
        bodies: flat.bodies.len(),
        meshes: flat.meshes.len(),
        vertices: flat.vertices.len(),
        triangles: flat.triangles.len(),
        rays: camera.pixel_count(),
        groups,
    };
    log::debug!("frame: {:?}", stats);
    Ok(stats)
}
