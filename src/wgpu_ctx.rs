use crate::dispatcher::{GpuBackend, KernelBindings};
use crate::error::{RenderError, Result};
use crate::passes::{RaycastKernel, RenderTarget};
use crate::wgpu_utils::create_buffer;

/// Headless device and queue. Nothing is presented; output is read back.
pub struct WgpuContext {
    pub _instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WgpuContext {
    /// Requests an adapter able to run `threads_per_group x threads_per_group`
    /// invocations per workgroup.
    pub async fn new_headless(threads_per_group: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::from_env_or_default(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await?;

        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);
        log::debug!("Driver: {}", info.driver_info);

        let supported = adapter.limits();
        let invocations = threads_per_group * threads_per_group;
        if supported.max_compute_invocations_per_workgroup < invocations
            || supported.max_compute_workgroup_size_x < threads_per_group
            || supported.max_compute_workgroup_size_y < threads_per_group
        {
            return Err(RenderError::AdapterLimits(format!(
                "{}x{} workgroups need {} invocations, adapter allows {}",
                threads_per_group,
                threads_per_group,
                invocations,
                supported.max_compute_invocations_per_workgroup
            )));
        }

        let defaults = wgpu::Limits::default();
        let required_limits = wgpu::Limits {
            max_compute_invocations_per_workgroup: invocations
                .max(defaults.max_compute_invocations_per_workgroup),
            max_compute_workgroup_size_x: threads_per_group
                .max(defaults.max_compute_workgroup_size_x),
            max_compute_workgroup_size_y: threads_per_group
                .max(defaults.max_compute_workgroup_size_y),
            ..defaults
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Raycast Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                ..Default::default()
            })
            .await?;

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
        })
    }
}

impl GpuBackend for WgpuContext {
    type Buffer = wgpu::Buffer;
    type Kernel = RaycastKernel;
    type Target = RenderTarget;

    fn create_storage_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        create_buffer(
            &self.device,
            label,
            size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn release_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn target_extent(&self, target: &RenderTarget) -> (u32, u32) {
        (target.width, target.height)
    }

    fn dispatch(
        &self,
        kernel: &RaycastKernel,
        bindings: KernelBindings<'_, Self>,
        groups: [u32; 3],
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Raycast Encoder"),
            });
        kernel.execute(self, &mut encoder, &bindings, groups);
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
