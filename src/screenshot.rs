use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use rayon::prelude::*;

use crate::error::{RenderError, Result};
use crate::passes::RenderTarget;
use crate::wgpu_ctx::WgpuContext;
use crate::wgpu_utils::{create_buffer, get_padded_bytes_per_row};

/// Raw RGBA8 rows copied back from the GPU, each padded to
/// `padded_bytes_per_row`.
pub struct ScreenshotTask {
    pub width: u32,
    pub height: u32,
    pub padded_bytes_per_row: u32,
    pub data: Vec<u8>,
}

/// Copies the render target into a mappable buffer and blocks until the
/// copy (and any dispatch queued before it) has finished.
pub fn read_target(ctx: &WgpuContext, target: &RenderTarget) -> Result<ScreenshotTask> {
    let (width, height) = (target.width, target.height);
    let padded_bytes_per_row = get_padded_bytes_per_row(width);
    let readback = create_buffer(
        &ctx.device,
        "Screenshot Readback",
        (padded_bytes_per_row * height) as u64,
        wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
    );

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Screenshot Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| RenderError::Readback(e.to_string()))?;
    rx.recv()
        .map_err(|e| RenderError::Readback(e.to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let data = slice.get_mapped_range().to_vec();
    readback.unmap();
    readback.destroy();

    Ok(ScreenshotTask {
        width,
        height,
        padded_bytes_per_row,
        data,
    })
}

/// Strips row padding and forces alpha to opaque.
pub fn unpad_rows(task: &ScreenshotTask) -> Vec<u8> {
    let unpadded_bytes_per_row = (task.width * 4) as usize;
    let mut rgba = vec![0u8; unpadded_bytes_per_row * task.height as usize];

    rgba.par_chunks_mut(unpadded_bytes_per_row)
        .zip(task.data.par_chunks(task.padded_bytes_per_row as usize))
        .for_each(|(dest_row, src_row)| {
            dest_row.copy_from_slice(&src_row[..unpadded_bytes_per_row]);
            for pixel in dest_row.chunks_exact_mut(4) {
                pixel[3] = 255;
            }
        });
    rgba
}

/// Writes `screenshot_<timestamp>.png` into `dir` and returns its path.
pub fn save_image(task: &ScreenshotTask, dir: &Path) -> Result<PathBuf> {
    let saving_start = chrono::Local::now();
    let rgba = unpad_rows(task);

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "screenshot_{}.png",
        saving_start.format("%Y-%m-%d_%H-%M-%S")
    ));

    let writer = BufWriter::new(File::create(&path)?);
    let encoder =
        PngEncoder::new_with_quality(writer, CompressionType::Fast, FilterType::NoFilter);
    encoder.write_image(&rgba, task.width, task.height, image::ExtendedColorType::Rgba8)?;

    log::info!(
        "Saved screenshot: {} ({}ms)",
        path.display(),
        chrono::Local::now().timestamp_millis() - saving_start.timestamp_millis()
    );
    Ok(path)
}
