//! Error types for the ray casting core.

use thiserror::Error;

use crate::scene::BodyId;

/// Errors raised by batching, ray generation and GPU dispatch.
///
/// Every variant is a programmer or configuration error; none of them is
/// transient, so nothing in the crate retries.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Body registered twice with the same batcher
    #[error("body {0:?} is already registered")]
    DuplicateRegistration(BodyId),

    /// Unregister of a body that was never registered
    #[error("body {0:?} is not registered")]
    NotRegistered(BodyId),

    /// Registered body id not present in the body source at flatten time
    #[error("registered body {0:?} is missing from the body source")]
    BodyMissing(BodyId),

    /// Zero resolution
    #[error("invalid dimensions {width}x{height}: both must be greater than zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Malformed mesh input
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Flattened scene does not fit a fixed-size GPU buffer
    #[error("{buffer} holds {len} elements but capacity is {capacity}")]
    CapacityExceeded {
        buffer: &'static str,
        len: usize,
        capacity: usize,
    },

    /// Kernel workgroup declaration does not match the dispatcher
    #[error("kernel declares workgroup size {declared:?}, dispatcher requires {expected:?}")]
    UnsupportedKernelLayout { declared: [u32; 3], expected: [u32; 3] },

    /// WGSL source failed to parse
    #[error("kernel parse failed: {0}")]
    KernelParse(String),

    /// Kernel binding name or slot disagrees with the binding contract
    #[error("kernel binding mismatch: {0}")]
    KernelBinding(String),

    /// Last ray upload does not match the camera being dispatched
    #[error("{uploaded} rays uploaded, dispatch needs {required}")]
    RaysNotUploaded { required: usize, uploaded: usize },

    /// Output surface size differs from the camera resolution
    #[error("render target is {target:?}, camera renders {camera:?}")]
    TargetMismatch { target: (u32, u32), camera: (u32, u32) },

    /// Dispatcher used after `release()`
    #[error("dispatcher buffers have been released")]
    Released,

    /// Rejected configuration value
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Adapter cannot satisfy the compute limits of the kernel
    #[error("adapter limit too low: {0}")]
    AdapterLimits(String),

    /// Mapping the readback buffer failed
    #[error("readback failed: {0}")]
    Readback(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("adapter request failed: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Result type alias for ray casting operations.
pub type Result<T> = std::result::Result<T, RenderError>;
