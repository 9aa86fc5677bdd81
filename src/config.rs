//! Render configuration: buffer limits, thread-group size, batching strategy.

use crate::error::{RenderError, Result};

/// Thread-group edge length the reference kernel is compiled with.
pub const THREADS_PER_GROUP: u32 = 32;

/// Fixed capacities of the scene buffers (element counts).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneLimits {
    pub max_bodies: usize,
    pub max_vertices: usize,
    pub max_triangles: usize,
    pub max_meshes: usize,
}

impl Default for SceneLimits {
    fn default() -> Self {
        Self {
            max_bodies: 100,
            max_vertices: 1000,
            max_triangles: 1000,
            max_meshes: 100,
        }
    }
}

/// How bodies that share a mesh key are batched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshDedup {
    /// Every body appends its own world-space vertices and triangles.
    #[default]
    Disabled,
    /// Bodies with an already-seen mesh key reuse that mesh record.
    /// Only meaningful with a kernel that applies per-instance transforms.
    ByMeshKey,
}

/// Rounding of `resolution / threads_per_group` when sizing a dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupRounding {
    /// Integer division. A right/bottom strip narrower than one group is
    /// not rendered.
    #[default]
    Floor,
    /// Round up to cover every pixel. The kernel must bounds-check.
    Ceil,
}

/// Ray casting renderer configuration.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub limits: SceneLimits,
    /// Must equal the X and Y workgroup size declared by the kernel.
    pub threads_per_group: u32,
    pub mesh_dedup: MeshDedup,
    pub group_rounding: GroupRounding,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            limits: SceneLimits::default(),
            threads_per_group: THREADS_PER_GROUP,
            mesh_dedup: MeshDedup::default(),
            group_rounding: GroupRounding::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads_per_group == 0 {
            return Err(RenderError::InvalidConfig(
                "threads_per_group must be greater than zero".to_string(),
            ));
        }
        let limits = [
            ("max_bodies", self.limits.max_bodies),
            ("max_vertices", self.limits.max_vertices),
            ("max_triangles", self.limits.max_triangles),
            ("max_meshes", self.limits.max_meshes),
        ];
        for (name, value) in limits {
            // wgpu rejects zero-sized bindings.
            if value == 0 {
                return Err(RenderError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}
