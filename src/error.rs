//! Error types for the warp subsystem.

use thiserror::Error;

/// Errors surfaced by mesh construction, target management and compositing.
///
/// None of these are transient: each one means the current frame (or the
/// whole session) cannot produce a correct image.
#[derive(Error, Debug)]
pub enum WarpError {
    #[error("framebuffer is not complete: {status:#x}")]
    IncompleteFramebuffer { status: u32 },
    #[error("display mode {0} is not supported")]
    UnsupportedDisplayMode(i32),
    #[error("eye index {0} is out of range for dual display mode")]
    UnsupportedEye(usize),
    #[error("invalid warp grid {rows}x{cols}")]
    InvalidGrid { rows: u32, cols: u32 },
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

pub type Result<T> = std::result::Result<T, WarpError>;
