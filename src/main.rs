use std::path::Path;

use anyhow::Context;
use glam::Vec3;

use fast_raycasting_wgpu::camera::Camera;
use fast_raycasting_wgpu::config::RenderConfig;
use fast_raycasting_wgpu::dispatcher::GpuDispatcher;
use fast_raycasting_wgpu::logging::{init_logging, LoggingConfig};
use fast_raycasting_wgpu::passes::{RaycastKernel, RenderTarget};
use fast_raycasting_wgpu::renderer::render_frame;
use fast_raycasting_wgpu::scene::{create_demo_scene, SceneBatcher};
use fast_raycasting_wgpu::screenshot::{read_target, save_image};
use fast_raycasting_wgpu::wgpu_ctx::WgpuContext;

const RENDER_WIDTH: u32 = 512;
const RENDER_HEIGHT: u32 = 512;

fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::default());

    let config = RenderConfig::default();
    let ctx = pollster::block_on(WgpuContext::new_headless(config.threads_per_group))
        .context("creating headless wgpu device")?;
    let kernel = RaycastKernel::new(&ctx).context("compiling ray casting kernel")?;
    let target = RenderTarget::new(&ctx, RENDER_WIDTH, RENDER_HEIGHT);

    let bodies = create_demo_scene();
    let mut batcher = SceneBatcher::new(config.mesh_dedup);
    for body in &bodies {
        batcher.register(body)?;
    }

    let mut camera = Camera::new(RENDER_WIDTH, RENDER_HEIGHT)?;
    camera.position = Vec3::new(0.0, 0.0, -3.0);

    let mut dispatcher = GpuDispatcher::initialize(ctx, kernel, &config)?;
    let stats = render_frame(&mut batcher, &bodies, &mut camera, &mut dispatcher, &target)?;
    log::info!(
        "{} bodies, {} triangles, {} rays, workgroups {:?}",
        stats.bodies,
        stats.triangles,
        stats.rays,
        stats.groups
    );

    let task = read_target(dispatcher.backend(), &target)?;
    save_image(&task, Path::new("output"))?;
    Ok(())
}
