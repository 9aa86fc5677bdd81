//! GPU buffer ownership, upload and compute dispatch.
//!
//! [`GpuDispatcher`] holds the five storage buffers the ray casting kernel
//! reads. The four scene buffers are allocated once at their configured
//! maximum and overwritten every frame; the ray buffer grows on demand and
//! never shrinks. The GPU itself sits behind [`GpuBackend`], implemented for
//! wgpu by [`crate::wgpu_ctx::WgpuContext`].

use crate::camera::Camera;
use crate::config::{GroupRounding, RenderConfig, SceneLimits};
use crate::error::{RenderError, Result};
use crate::geometry::{BodyRecord, KernelParams, MeshRecord, Ray, Triangle, Vertex};

/// A compiled compute kernel whose workgroup declaration can be queried.
pub trait ComputeKernel {
    /// Workgroup size declared in the kernel source, `(x, y, z)`.
    fn workgroup_size(&self) -> [u32; 3];
}

/// Everything bound to the kernel for one dispatch.
pub struct KernelBindings<'a, B: GpuBackend + ?Sized> {
    pub vertices: &'a B::Buffer,
    pub triangles: &'a B::Buffer,
    pub meshes: &'a B::Buffer,
    pub bodies: &'a B::Buffer,
    pub rays: &'a B::Buffer,
    pub params: KernelParams,
    pub target: &'a B::Target,
}

/// GPU operations the dispatcher needs.
pub trait GpuBackend {
    type Buffer;
    type Kernel: ComputeKernel;
    /// Writable 2D output surface.
    type Target;

    /// Storage buffer of `size` bytes, writable from the CPU.
    fn create_storage_buffer(&self, label: &str, size: u64) -> Self::Buffer;
    /// Overwrites the buffer from offset 0.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);
    fn release_buffer(&self, buffer: Self::Buffer);
    /// Size of the output surface in pixels, `(width, height)`.
    fn target_extent(&self, target: &Self::Target) -> (u32, u32);
    /// Binds and dispatches `groups` workgroups. Does not wait for completion.
    fn dispatch(&self, kernel: &Self::Kernel, bindings: KernelBindings<'_, Self>, groups: [u32; 3]);
}

/// Number of workgroups covering `width x height`.
///
/// With [`GroupRounding::Floor`] a 257-pixel-wide image dispatches 8 groups
/// of 32 and the last column is never shaded.
pub fn workgroup_count(
    width: u32,
    height: u32,
    threads_per_group: u32,
    rounding: GroupRounding,
) -> [u32; 3] {
    match rounding {
        GroupRounding::Floor => [width / threads_per_group, height / threads_per_group, 1],
        GroupRounding::Ceil => [
            width.div_ceil(threads_per_group),
            height.div_ceil(threads_per_group),
            1,
        ],
    }
}

struct StorageBuffer<B> {
    buffer: Option<B>,
    capacity: usize,
}

impl<B> StorageBuffer<B> {
    fn empty() -> Self {
        Self {
            buffer: None,
            capacity: 0,
        }
    }
}

pub struct GpuDispatcher<B: GpuBackend> {
    backend: B,
    kernel: B::Kernel,
    threads_per_group: u32,
    rounding: GroupRounding,
    limits: SceneLimits,

    vertex_buffer: StorageBuffer<B::Buffer>,
    triangle_buffer: StorageBuffer<B::Buffer>,
    mesh_buffer: StorageBuffer<B::Buffer>,
    body_buffer: StorageBuffer<B::Buffer>,
    ray_buffer: StorageBuffer<B::Buffer>,
    /// Rays written by the last `upload_rays` into the current ray buffer.
    rays_uploaded: usize,
    released: bool,
}

impl<B: GpuBackend> GpuDispatcher<B> {
    /// Checks the kernel's workgroup declaration against the configured
    /// thread-group size and allocates the fixed scene buffers.
    pub fn initialize(backend: B, kernel: B::Kernel, config: &RenderConfig) -> Result<Self> {
        config.validate()?;

        let declared = kernel.workgroup_size();
        let expected = [config.threads_per_group, config.threads_per_group, 1];
        if declared != expected {
            return Err(RenderError::UnsupportedKernelLayout { declared, expected });
        }

        let limits = config.limits;
        let mut dispatcher = Self {
            backend,
            kernel,
            threads_per_group: config.threads_per_group,
            rounding: config.group_rounding,
            limits,
            vertex_buffer: StorageBuffer::empty(),
            triangle_buffer: StorageBuffer::empty(),
            mesh_buffer: StorageBuffer::empty(),
            body_buffer: StorageBuffer::empty(),
            ray_buffer: StorageBuffer::empty(),
            rays_uploaded: 0,
            released: false,
        };
        dispatcher.vertex_buffer =
            dispatcher.allocate::<Vertex>("vertexDataBuffer", limits.max_vertices);
        dispatcher.triangle_buffer =
            dispatcher.allocate::<Triangle>("triangleDataBuffer", limits.max_triangles);
        dispatcher.mesh_buffer = dispatcher.allocate::<MeshRecord>("meshDataBuffer", limits.max_meshes);
        dispatcher.body_buffer = dispatcher.allocate::<BodyRecord>("bodyDataBuffer", limits.max_bodies);

        log::info!(
            "dispatcher ready: workgroup {:?}, limits {:?}",
            declared,
            limits
        );
        Ok(dispatcher)
    }

    fn allocate<T>(&self, label: &str, count: usize) -> StorageBuffer<B::Buffer> {
        let size = (count * std::mem::size_of::<T>()) as u64;
        StorageBuffer {
            buffer: Some(self.backend.create_storage_buffer(label, size)),
            capacity: count,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn kernel(&self) -> &B::Kernel {
        &self.kernel
    }

    pub fn limits(&self) -> SceneLimits {
        self.limits
    }

    /// Current ray buffer capacity in rays (0 before the first upload).
    pub fn ray_capacity(&self) -> usize {
        self.ray_buffer.capacity
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(RenderError::Released);
        }
        Ok(())
    }

    /// Grows the ray buffer to hold at least `required` rays. Never shrinks.
    pub fn ensure_ray_buffer_capacity(&mut self, required: usize) -> Result<()> {
        self.ensure_live()?;
        if self.ray_buffer.buffer.is_some() && self.ray_buffer.capacity >= required {
            return Ok(());
        }
        if let Some(old) = self.ray_buffer.buffer.take() {
            self.backend.release_buffer(old);
        }
        // The replacement buffer holds no rays until the next upload.
        self.rays_uploaded = 0;
        let capacity = required.max(self.ray_buffer.capacity).max(1);
        log::debug!(
            "ray buffer: {} -> {} rays",
            self.ray_buffer.capacity,
            capacity
        );
        self.ray_buffer = self.allocate::<Ray>("rayDataBuffer", capacity);
        Ok(())
    }

    /// Uploads the flattened scene. All four lengths are checked before
    /// anything is written.
    pub fn upload_scene_buffers(
        &mut self,
        vertices: &[Vertex],
        triangles: &[Triangle],
        meshes: &[MeshRecord],
        bodies: &[BodyRecord],
    ) -> Result<()> {
        self.ensure_live()?;
        check_capacity("vertexDataBuffer", vertices.len(), self.vertex_buffer.capacity)?;
        check_capacity("triangleDataBuffer", triangles.len(), self.triangle_buffer.capacity)?;
        check_capacity("meshDataBuffer", meshes.len(), self.mesh_buffer.capacity)?;
        check_capacity("bodyDataBuffer", bodies.len(), self.body_buffer.capacity)?;

        self.write(&self.vertex_buffer, bytemuck::cast_slice(vertices));
        self.write(&self.triangle_buffer, bytemuck::cast_slice(triangles));
        self.write(&self.mesh_buffer, bytemuck::cast_slice(meshes));
        self.write(&self.body_buffer, bytemuck::cast_slice(bodies));
        Ok(())
    }

    /// Writes rays, growing the ray buffer first if needed.
    pub fn upload_rays(&mut self, rays: &[Ray]) -> Result<()> {
        self.ensure_ray_buffer_capacity(rays.len())?;
        self.write(&self.ray_buffer, bytemuck::cast_slice(rays));
        self.rays_uploaded = rays.len();
        Ok(())
    }

    fn write(&self, storage: &StorageBuffer<B::Buffer>, data: &[u8]) {
        if let (Some(buffer), false) = (&storage.buffer, data.is_empty()) {
            self.backend.write_buffer(buffer, data);
        }
    }

    /// Binds all buffers, the camera uniforms and `target`, then dispatches.
    /// Returns the workgroup counts used.
    ///
    /// The last `upload_rays` must have written exactly one ray per camera
    /// pixel, and `target` must match the camera resolution.
    pub fn bind_and_dispatch(
        &mut self,
        camera: &Camera,
        body_count: usize,
        target: &B::Target,
    ) -> Result<[u32; 3]> {
        self.ensure_live()?;
        let required = camera.pixel_count();
        if self.rays_uploaded != required {
            return Err(RenderError::RaysNotUploaded {
                required,
                uploaded: self.rays_uploaded,
            });
        }

        let (width, height) = (camera.width(), camera.height());
        let extent = self.backend.target_extent(target);
        if extent != (width, height) {
            return Err(RenderError::TargetMismatch {
                target: extent,
                camera: (width, height),
            });
        }
        check_capacity("bodyDataBuffer", body_count, self.body_buffer.capacity)?;

        // All five buffers live from their first allocation until release().
        let (Some(vertices), Some(triangles), Some(meshes), Some(bodies), Some(rays)) = (
            &self.vertex_buffer.buffer,
            &self.triangle_buffer.buffer,
            &self.mesh_buffer.buffer,
            &self.body_buffer.buffer,
            &self.ray_buffer.buffer,
        ) else {
            return Err(RenderError::Released);
        };

        let groups = workgroup_count(width, height, self.threads_per_group, self.rounding);
        let dropped = (
            width - (groups[0] * self.threads_per_group).min(width),
            height - (groups[1] * self.threads_per_group).min(height),
        );
        if dropped != (0, 0) {
            log::debug!(
                "{}x{} not a multiple of {}: {} columns and {} rows not dispatched",
                width,
                height,
                self.threads_per_group,
                dropped.0,
                dropped.1
            );
        }

        let bindings = KernelBindings {
            vertices,
            triangles,
            meshes,
            bodies,
            rays,
            params: KernelParams {
                body_data_count: body_count as u32,
                width,
                height,
                _padding: 0,
                background_color: camera.background_color,
            },
            target,
        };
        self.backend.dispatch(&self.kernel, bindings, groups);
        Ok(groups)
    }

    /// Releases every buffer that is currently allocated. Safe to call
    /// repeatedly; also runs on drop. Every later upload or dispatch fails
    /// with [`RenderError::Released`].
    pub fn release(&mut self) {
        self.released = true;
        self.rays_uploaded = 0;
        for storage in [
            &mut self.vertex_buffer,
            &mut self.triangle_buffer,
            &mut self.mesh_buffer,
            &mut self.body_buffer,
            &mut self.ray_buffer,
        ] {
            if let Some(buffer) = storage.buffer.take() {
                self.backend.release_buffer(buffer);
            }
            storage.capacity = 0;
        }
    }
}

impl<B: GpuBackend> Drop for GpuDispatcher<B> {
    fn drop(&mut self) {
        self.release();
    }
}

fn check_capacity(buffer: &'static str, len: usize, capacity: usize) -> Result<()> {
    if len > capacity {
        return Err(RenderError::CapacityExceeded {
            buffer,
            len,
            capacity,
        });
    }
    Ok(())
}
