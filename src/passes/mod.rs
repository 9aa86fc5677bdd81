pub mod raycast;

pub use raycast::{reflect_kernel, KernelLayout, RaycastKernel, RenderTarget};
