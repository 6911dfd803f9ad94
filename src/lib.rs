//! VR Warp - barrel-distortion post pass for stereo VR rendering
//!
//! The scene is captured into an offscreen target sized to the viewport,
//! then drawn onto the screen through a pre-distorted grid mesh so that a
//! headset lens sees an undistorted image. Rendering goes through the
//! [`GraphicsApi`] seam; [`wgpu_backend`] provides the wgpu implementation.
//!
//! ```no_run
//! use vr_warp::{DisplayMode, WarpCompositor, WarpConfig};
//! use vr_warp::wgpu_backend::{WgpuGraphics, WgpuWarpProgram};
//!
//! # fn main() -> vr_warp::Result<()> {
//! let mut gpu = WgpuGraphics::headless()?;
//! let program = WgpuWarpProgram::new(gpu.device(), wgpu::TextureFormat::Rgba8Unorm);
//! let mut warp = WarpCompositor::<WgpuGraphics>::new(program, &WarpConfig::default());
//!
//! warp.begin_capture(&mut gpu, 1280, 720, DisplayMode::Single)?;
//! // ... render the scene into gpu.capture_target() ...
//! warp.commit(&mut gpu, 0)?;
//! # Ok(())
//! # }
//! ```

pub mod compositor;
pub mod config;
pub mod director;
pub mod distortion;
pub mod error;
pub mod gpu;
pub mod logging;
pub mod mesh;
pub mod offscreen;
pub mod viewport;
pub mod wgpu_backend;

#[cfg(test)]
mod test_gpu;

pub use compositor::{Phase, WarpCompositor};
pub use config::{DistortionConfig, GridSize, WarpConfig};
pub use director::Director;
pub use distortion::barrel_distort;
pub use error::{Result, WarpError};
pub use gpu::{
    Extent, FramebufferId, FramebufferStatus, GraphicsApi, RenderbufferId, TextureId, WarpProgram,
};
pub use logging::{init_logging, LoggingConfig};
pub use mesh::{DisplayMode, GridMeshBuilder, Mesh};
pub use offscreen::OffscreenTarget;
pub use viewport::Viewport;
