use wgpu::util::DeviceExt;

/// Row pitch required by `copy_texture_to_buffer`.
pub const COPY_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

pub fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

pub fn create_buffer_init<T: bytemuck::Pod>(
    device: &wgpu::Device,
    label: &str,
    data: &[T],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage,
    })
}

/// RGBA8 texture the kernel writes into and the screenshot path copies from.
pub fn create_storage_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

pub fn get_padded_bytes_per_row(width: u32) -> u32 {
    let unpadded_bytes_per_row = width * 4;
    let padding = (COPY_ROW_ALIGNMENT - unpadded_bytes_per_row % COPY_ROW_ALIGNMENT)
        % COPY_ROW_ALIGNMENT;
    unpadded_bytes_per_row + padding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_aligned() {
        assert_eq!(get_padded_bytes_per_row(64), 256);
        assert_eq!(get_padded_bytes_per_row(65), 512);
        assert_eq!(get_padded_bytes_per_row(1), 256);
        assert_eq!(get_padded_bytes_per_row(256), 1024);
    }
}
