//! Warp mesh generation
//!
//! Builds the subdivided screen-space grid that carries the inverse lens
//! distortion. The distortion is baked into the vertex positions once, at
//! build time; texture coordinates stay on the regular grid so sampling the
//! captured scene through the mesh produces the warped image.

use glam::{Vec2, Vec3};
use log::debug;

use crate::config::{DistortionConfig, GridSize, WarpConfig};
use crate::distortion::barrel_distort;
use crate::error::{Result, WarpError};

/// How the captured scene texture is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// One image covering the whole texture.
    Single = 1,
    /// Side-by-side stereo: left eye in the left half, right eye in the right half.
    Dual = 2,
}

impl DisplayMode {
    /// Number of eyes drawn from one captured texture.
    pub fn eye_count(self) -> usize {
        self as usize
    }

    /// Buffer slot used for `eye` in this mode.
    pub fn slot(self, eye: usize) -> Result<usize> {
        match self {
            DisplayMode::Single => Ok(0),
            DisplayMode::Dual if eye < self.eye_count() => Ok(eye),
            DisplayMode::Dual => Err(WarpError::UnsupportedEye(eye)),
        }
    }
}

impl TryFrom<i32> for DisplayMode {
    type Error = WarpError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(DisplayMode::Single),
            2 => Ok(DisplayMode::Dual),
            other => Err(WarpError::UnsupportedDisplayMode(other)),
        }
    }
}

/// Distorted render geometry. Immutable once built.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    tex_coord_sets: [Vec<Vec2>; 2],
    single_tex_coords: Vec<Vec2>,
    indices: Vec<u16>,
}

impl Mesh {
    pub fn from_config(config: &WarpConfig) -> Self {
        GridMeshBuilder::new(config.grid, config.distortion)
            .with_depth(config.depth)
            .build()
    }

    /// Distorted positions, row-major.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn single_tex_coords(&self) -> &[Vec2] {
        &self.single_tex_coords
    }

    /// Per-eye half-texture layout: slot 0 is the left half, slot 1 the right.
    pub fn tex_coord_set(&self, slot: usize) -> Option<&[Vec2]> {
        self.tex_coord_sets.get(slot).map(Vec::as_slice)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Texture coordinates to sample with for `eye` under `mode`.
    pub fn tex_coords(&self, mode: DisplayMode, eye: usize) -> Result<&[Vec2]> {
        match mode {
            DisplayMode::Single => Ok(&self.single_tex_coords),
            DisplayMode::Dual => Ok(&self.tex_coord_sets[mode.slot(eye)?]),
        }
    }

    /// Same as [`Mesh::tex_coords`] for a mode value straight from host configuration.
    pub fn tex_coords_for_raw_mode(&self, raw_mode: i32, eye: usize) -> Result<&[Vec2]> {
        self.tex_coords(DisplayMode::try_from(raw_mode)?, eye)
    }

    /// Vertex slot and positions for `eye` under `mode`.
    ///
    /// Both slots carry the same distorted positions.
    pub fn positions(&self, mode: DisplayMode, eye: usize) -> Result<(usize, &[Vec3])> {
        Ok((mode.slot(eye)?, &self.vertices))
    }
}

/// Builds a [`Mesh`] from a grid resolution and distortion coefficients.
#[derive(Debug, Clone, Copy)]
pub struct GridMeshBuilder {
    grid: GridSize,
    distortion: DistortionConfig,
    depth: f32,
}

impl GridMeshBuilder {
    pub fn new(grid: GridSize, distortion: DistortionConfig) -> Self {
        Self {
            grid,
            distortion,
            depth: WarpConfig::default().depth,
        }
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn build(&self) -> Mesh {
        let rows = self.grid.rows();
        let cols = self.grid.cols();
        let count = self.grid.vertex_count();

        let mut vertices = Vec::with_capacity(count);
        let mut single = Vec::with_capacity(count);
        let mut left = Vec::with_capacity(count);
        let mut right = Vec::with_capacity(count);

        for r in 0..=rows {
            let v = r as f32 / rows as f32;
            for s in 0..=cols {
                let u = s as f32 / cols as f32;

                single.push(Vec2::new(u, v));
                left.push(Vec2::new(u * 0.5, v));
                right.push(Vec2::new(u * 0.5 + 0.5, v));

                vertices.push(Vec3::new(u * 2.0 - 1.0, v * 2.0 - 1.0, self.depth));
            }
        }

        self.apply_distortion(&mut vertices);
        let indices = triangulate(self.grid);

        debug!(
            "Built warp mesh {}x{}: {} vertices, {} indices",
            rows,
            cols,
            vertices.len(),
            indices.len()
        );

        Mesh {
            vertices,
            tex_coord_sets: [left, right],
            single_tex_coords: single,
            indices,
        }
    }

    fn apply_distortion(&self, vertices: &mut [Vec3]) {
        let DistortionConfig { param_a, param_b, param_c, scale } = self.distortion;
        for vertex in vertices.iter_mut() {
            let warped = barrel_distort(param_a, param_b, param_c, vertex.truncate()) * scale;
            vertex.x = warped.x;
            vertex.y = warped.y;
        }
    }
}

/// Two counter-clockwise triangles per cell, split along the
/// (r, s+1)-(r+1, s) diagonal.
fn triangulate(grid: GridSize) -> Vec<u16> {
    let stride = grid.cols() + 1;
    let mut indices = Vec::with_capacity(grid.index_count());

    // GridSize guarantees every index fits in u16
    let at = |r: u32, s: u32| (r * stride + s) as u16;

    for r in 0..grid.rows() {
        for s in 0..grid.cols() {
            let a = at(r, s);
            let b = at(r + 1, s);
            let c = at(r, s + 1);
            let d = at(r + 1, s + 1);

            indices.extend_from_slice(&[c, b, a, c, d, b]);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_mesh(rows: u32, cols: u32) -> Mesh {
        GridMeshBuilder::new(GridSize::new(rows, cols).unwrap(), DistortionConfig::identity())
            .build()
    }

    #[test]
    fn counts_and_index_bounds() {
        for (rows, cols) in [(1, 1), (2, 7), (10, 10), (31, 3)] {
            let mesh = GridMeshBuilder::new(
                GridSize::new(rows, cols).unwrap(),
                DistortionConfig::default(),
            )
            .build();
            let expected = ((rows + 1) * (cols + 1)) as usize;
            assert_eq!(mesh.vertex_count(), expected);
            assert_eq!(mesh.index_count(), (rows * cols * 6) as usize);
            assert!(mesh.indices().iter().all(|&i| (i as usize) < expected));
            assert_eq!(mesh.single_tex_coords().len(), expected);
            assert_eq!(mesh.tex_coord_set(0).unwrap().len(), expected);
            assert_eq!(mesh.tex_coord_set(1).unwrap().len(), expected);
        }
    }

    #[test]
    fn undistorted_grid_spans_ndc() {
        let mesh = GridMeshBuilder::new(GridSize::default(), DistortionConfig::identity())
            .with_depth(-8.0)
            .build();
        let v = mesh.vertices();
        assert_eq!(v[0], Vec3::new(-1.0, -1.0, -8.0));
        assert_eq!(v[10], Vec3::new(1.0, -1.0, -8.0));
        assert_eq!(v[110], Vec3::new(-1.0, 1.0, -8.0));
        assert_eq!(v[120], Vec3::new(1.0, 1.0, -8.0));
    }

    #[test]
    fn distortion_moves_xy_but_not_z() {
        let config = DistortionConfig::default();
        let mesh = GridMeshBuilder::new(GridSize::default(), config)
            .with_depth(-3.0)
            .build();
        let flat = flat_mesh(10, 10);

        assert!(mesh.vertices().iter().all(|v| v.z == -3.0));

        // Corner (1, 1): distorted once then scaled, never twice
        let corner = flat.vertices()[120].truncate();
        let expected =
            barrel_distort(config.param_a, config.param_b, config.param_c, corner) * config.scale;
        assert_eq!(mesh.vertices()[120].truncate(), expected);

        // Center stays at the origin
        assert_eq!(mesh.vertices()[60].truncate(), Vec2::ZERO);
    }

    #[test]
    fn triangles_share_winding() {
        let mesh = flat_mesh(4, 6);
        for tri in mesh.indices().chunks(3) {
            let p = |i: u16| mesh.vertices()[i as usize].truncate();
            let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
            assert!((b - a).perp_dot(c - a) > 0.0);
        }
    }

    #[test]
    fn first_cell_indices() {
        let mesh = flat_mesh(2, 2);
        // a = 0, c = 1, b = 3, d = 4
        assert_eq!(&mesh.indices()[..6], &[1, 3, 0, 1, 4, 3]);
    }

    #[test]
    fn tex_coord_layouts() {
        let mesh = flat_mesh(10, 10);
        let single = mesh.tex_coords(DisplayMode::Single, 0).unwrap();
        let left = mesh.tex_coords(DisplayMode::Dual, 0).unwrap();
        let right = mesh.tex_coords(DisplayMode::Dual, 1).unwrap();

        assert_eq!(single[0], Vec2::new(0.0, 0.0));
        assert_eq!(single[120], Vec2::new(1.0, 1.0));
        assert_eq!(left[10].x, 0.5);
        assert_eq!(right[0].x, 0.5);
        assert_eq!(right[10].x, 1.0);

        for i in 0..single.len() {
            assert!((0.0..=0.5).contains(&left[i].x));
            assert!((0.5..=1.0).contains(&right[i].x));
            assert_eq!(left[i].y, single[i].y);
            assert_eq!(right[i].y, single[i].y);
        }
    }

    #[test]
    fn single_mode_ignores_eye() {
        let mesh = flat_mesh(2, 2);
        let a = mesh.tex_coords(DisplayMode::Single, 0).unwrap();
        let b = mesh.tex_coords(DisplayMode::Single, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(mesh.positions(DisplayMode::Single, 1).unwrap().0, 0);
    }

    #[test]
    fn dual_mode_rejects_third_eye() {
        let mesh = flat_mesh(2, 2);
        assert!(matches!(
            mesh.tex_coords(DisplayMode::Dual, 2),
            Err(WarpError::UnsupportedEye(2))
        ));
    }

    #[test]
    fn raw_modes_outside_single_and_dual_fail() {
        let mesh = flat_mesh(2, 2);
        for raw in [0, 3, -1] {
            assert!(matches!(
                mesh.tex_coords_for_raw_mode(raw, 0),
                Err(WarpError::UnsupportedDisplayMode(v)) if v == raw
            ));
        }
        assert!(mesh.tex_coords_for_raw_mode(2, 1).is_ok());
    }

    #[test]
    fn both_vertex_slots_share_positions() {
        let mesh = flat_mesh(3, 3);
        let (slot0, p0) = mesh.positions(DisplayMode::Dual, 0).unwrap();
        let (slot1, p1) = mesh.positions(DisplayMode::Dual, 1).unwrap();
        assert_eq!((slot0, slot1), (0, 1));
        assert_eq!(p0, p1);
    }
}
