//! Brute-force GPU ray casting.
//!
//! A [`scene::SceneBatcher`] flattens registered bodies into global
//! vertex/triangle/mesh/body arrays, a [`camera::Camera`] generates one ray
//! per pixel, and a [`dispatcher::GpuDispatcher`] uploads both and
//! dispatches the compute kernel in `shaders/raycast.wgsl`.

pub mod camera;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod passes;
pub mod renderer;
pub mod scene;
pub mod screenshot;
pub mod wgpu_ctx;
pub mod wgpu_utils;

pub use camera::{Camera, Projection};
pub use config::{GroupRounding, MeshDedup, RenderConfig, SceneLimits, THREADS_PER_GROUP};
pub use dispatcher::{workgroup_count, ComputeKernel, GpuBackend, GpuDispatcher, KernelBindings};
pub use error::{RenderError, Result};
pub use geometry::{BodyRecord, KernelParams, MeshRecord, Ray, Triangle, Vertex};
pub use renderer::{render_frame, FrameStats};
pub use scene::{BodyId, BodySource, Mesh, MeshKey, SceneBatcher, SceneBody, Transform};
