use crate::dispatcher::{ComputeKernel, KernelBindings};
use crate::error::{RenderError, Result};
use crate::geometry::KernelParams;
use crate::wgpu_ctx::WgpuContext;
use crate::wgpu_utils::{create_buffer_init, create_storage_texture};

pub const RAYCAST_SOURCE: &str = include_str!("../shaders/raycast.wgsl");
pub const ENTRY_POINT: &str = "main";

/// Group-0 bindings the kernel must declare, by name.
pub const KERNEL_BINDINGS: [(&str, u32); 7] = [
    ("vertexDataBuffer", 0),
    ("triangleDataBuffer", 1),
    ("meshDataBuffer", 2),
    ("bodyDataBuffer", 3),
    ("rayDataBuffer", 4),
    ("params", 5),
    ("renderTarget", 6),
];

/// Members of the uniform block, in order. Mirrors [`KernelParams`].
pub const PARAMS_MEMBERS: [&str; 5] = [
    "bodyDataCount",
    "width",
    "height",
    "padding",
    "backgroundColor",
];

/// What the host needs to know about a kernel before dispatching it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelLayout {
    pub workgroup_size: [u32; 3],
}

/// Parses WGSL and checks it against the binding contract. Returns the
/// entry point's declared workgroup size.
pub fn reflect_kernel(source: &str, entry_point: &str) -> Result<KernelLayout> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| RenderError::KernelParse(e.emit_to_string(source)))?;

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| {
            RenderError::KernelParse(format!("no compute entry point named `{entry_point}`"))
        })?;

    for (name, binding) in KERNEL_BINDINGS {
        let (_, var) = module
            .global_variables
            .iter()
            .find(|(_, var)| var.name.as_deref() == Some(name))
            .ok_or_else(|| RenderError::KernelBinding(format!("`{name}` is not declared")))?;

        match &var.binding {
            Some(rb) if rb.group == 0 && rb.binding == binding => {}
            other => {
                return Err(RenderError::KernelBinding(format!(
                    "`{name}` must be @group(0) @binding({binding}), found {other:?}"
                )));
            }
        }

        if name == "params" {
            check_params_struct(&module, var)?;
        }
    }

    Ok(KernelLayout {
        workgroup_size: entry.workgroup_size,
    })
}

fn check_params_struct(module: &naga::Module, var: &naga::GlobalVariable) -> Result<()> {
    let naga::TypeInner::Struct { members, .. } = &module.types[var.ty].inner else {
        return Err(RenderError::KernelBinding(
            "`params` must be a struct".to_string(),
        ));
    };
    let names: Vec<&str> = members.iter().filter_map(|m| m.name.as_deref()).collect();
    if names != PARAMS_MEMBERS {
        return Err(RenderError::KernelBinding(format!(
            "`params` members {names:?}, expected {PARAMS_MEMBERS:?}"
        )));
    }
    Ok(())
}

/// Output surface of one dispatch.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(ctx: &WgpuContext, width: u32, height: u32) -> Self {
        let texture = create_storage_texture(&ctx.device, "Raycast Target", width, height);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }
}

pub struct RaycastKernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub params_buffer: wgpu::Buffer,
    layout: KernelLayout,
}

impl RaycastKernel {
    pub fn new(ctx: &WgpuContext) -> Result<Self> {
        Self::from_source(ctx, RAYCAST_SOURCE)
    }

    /// Compiles a kernel that honors the binding contract.
    pub fn from_source(ctx: &WgpuContext, source: &str) -> Result<Self> {
        let layout = reflect_kernel(source, ENTRY_POINT)?;

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Raycast Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let storage = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Raycast Bind Group Layout"),
                    entries: &[
                        storage(0),
                        storage(1),
                        storage(2),
                        storage(3),
                        storage(4),
                        wgpu::BindGroupLayoutEntry {
                            binding: 5,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 6,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::StorageTexture {
                                access: wgpu::StorageTextureAccess::WriteOnly,
                                format: wgpu::TextureFormat::Rgba8Unorm,
                                view_dimension: wgpu::TextureViewDimension::D2,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Raycast Pipeline"),
                layout: Some(&ctx.device.create_pipeline_layout(
                    &wgpu::PipelineLayoutDescriptor {
                        label: None,
                        bind_group_layouts: &[&bind_group_layout],
                        immediate_size: 0,
                    },
                )),
                module: &shader,
                entry_point: Some(ENTRY_POINT),
                compilation_options: Default::default(),
                cache: None,
            });

        let params_buffer = create_buffer_init(
            &ctx.device,
            "Raycast Params",
            &[KernelParams::default()],
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            params_buffer,
            layout,
        })
    }

    pub fn execute(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &KernelBindings<'_, WgpuContext>,
        groups: [u32; 3],
    ) {
        ctx.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&bindings.params));

        // Buffers can be reallocated between frames, so the group is rebuilt.
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Raycast Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: bindings.vertices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bindings.triangles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: bindings.meshes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: bindings.bodies.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: bindings.rays.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&bindings.target.view),
                },
            ],
        });

        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Raycast Pass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &bind_group, &[]);
        cpass.dispatch_workgroups(groups[0], groups[1], groups[2]);
    }
}

impl ComputeKernel for RaycastKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        self.layout.workgroup_size
    }
}
