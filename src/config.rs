//! Configuration for the lens warp
//!
//! Holds the barrel distortion coefficients, the warp grid resolution and the
//! fixed parameters of the compositing draw.

use crate::error::{Result, WarpError};

/// Coefficients of the radial distortion polynomial plus a final scale.
///
/// The defaults suit a typical Cardboard-style lens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionConfig {
    pub param_a: f32, // affects only the outermost pixels
    pub param_b: f32, // most cases only require b
    pub param_c: f32, // most uniform correction
    pub scale: f32,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            param_a: -0.068,
            param_b: 0.32,
            param_c: -0.2,
            scale: 0.95,
        }
    }
}

impl DistortionConfig {
    pub fn new(param_a: f32, param_b: f32, param_c: f32, scale: f32) -> Self {
        Self { param_a, param_b, param_c, scale }
    }

    /// Coefficients that leave every point where it is.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn with_param_a(mut self, param_a: f32) -> Self {
        self.param_a = param_a;
        self
    }

    pub fn with_param_b(mut self, param_b: f32) -> Self {
        self.param_b = param_b;
        self
    }

    pub fn with_param_c(mut self, param_c: f32) -> Self {
        self.param_c = param_c;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Number of cells of the warp grid.
///
/// Only constructible through [`GridSize::new`], so every value in
/// circulation yields a non-empty mesh addressable with 16-bit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    rows: u32,
    cols: u32,
}

impl GridSize {
    /// Largest vertex count a `u16` index buffer can address.
    pub const MAX_VERTICES: u32 = u16::MAX as u32 + 1;

    pub fn new(rows: u32, cols: u32) -> Result<Self> {
        let vertices = (rows as u64 + 1) * (cols as u64 + 1);
        if rows == 0 || cols == 0 || vertices > Self::MAX_VERTICES as u64 {
            return Err(WarpError::InvalidGrid { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn vertex_count(&self) -> usize {
        (self.rows as usize + 1) * (self.cols as usize + 1)
    }

    pub fn index_count(&self) -> usize {
        self.rows as usize * self.cols as usize * 6
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self { rows: 10, cols: 10 }
    }
}

/// Everything the compositor needs at construction time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpConfig {
    pub grid: GridSize,
    /// Depth of every mesh vertex, in view space.
    pub depth: f32,
    /// Near plane of the orthographic warp projection.
    pub near: f32,
    pub distortion: DistortionConfig,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            depth: -8.0,
            near: 0.7,
            distortion: DistortionConfig::default(),
        }
    }
}

impl WarpConfig {
    pub fn with_distortion(mut self, distortion: DistortionConfig) -> Self {
        self.distortion = distortion;
        self
    }

    pub fn with_grid(mut self, grid: GridSize) -> Self {
        self.grid = grid;
        self
    }
}
