use glam::Vec3;
use vr_warp::{
    DisplayMode, DistortionConfig, GridMeshBuilder, GridSize, Mesh, WarpConfig, WarpError,
};

fn undistorted(rows: u32, cols: u32) -> Mesh {
    let grid = GridSize::new(rows, cols).unwrap();
    GridMeshBuilder::new(grid, DistortionConfig::identity()).build()
}

#[test]
fn counts_and_index_bounds_hold_for_many_grids() {
    for (rows, cols) in [(1, 1), (1, 7), (3, 2), (10, 10), (16, 9), (64, 64)] {
        let grid = GridSize::new(rows, cols).unwrap();
        let mesh = GridMeshBuilder::new(grid, DistortionConfig::default()).build();

        let vertex_count = ((rows + 1) * (cols + 1)) as usize;
        assert_eq!(mesh.vertex_count(), vertex_count, "{rows}x{cols}");
        assert_eq!(mesh.index_count(), (rows * cols * 6) as usize, "{rows}x{cols}");
        assert!(mesh.indices().iter().all(|&i| (i as usize) < vertex_count));
    }
}

#[test]
fn grid_too_large_for_u16_indices_is_rejected() {
    assert!(GridSize::new(255, 255).is_ok());
    assert!(matches!(
        GridSize::new(256, 256),
        Err(WarpError::InvalidGrid { rows: 256, cols: 256 })
    ));
    assert!(GridSize::new(0, 4).is_err());
}

#[test]
fn undistorted_ten_by_ten_spans_clip_square() {
    let mesh = undistorted(10, 10);
    let depth = WarpConfig::default().depth;
    let v = mesh.vertices();

    assert_eq!(v[0], Vec3::new(-1.0, -1.0, depth));
    assert_eq!(v[10], Vec3::new(1.0, -1.0, depth));
    assert_eq!(v[110], Vec3::new(-1.0, 1.0, depth));
    assert_eq!(v[120], Vec3::new(1.0, 1.0, depth));

    for p in v {
        assert!(p.x >= -1.0 && p.x <= 1.0);
        assert!(p.y >= -1.0 && p.y <= 1.0);
    }
}

#[test]
fn default_distortion_pulls_corners_inward() {
    let mesh = Mesh::from_config(&WarpConfig::default());
    let corner = mesh.vertices()[0];
    assert!(corner.x > -1.0 && corner.y > -1.0);
}

#[test]
fn display_modes_select_matching_tex_coord_layouts() {
    let mesh = undistorted(4, 6);

    let single = mesh.tex_coords(DisplayMode::Single, 0).unwrap();
    let left = mesh.tex_coords(DisplayMode::Dual, 0).unwrap();
    let right = mesh.tex_coords(DisplayMode::Dual, 1).unwrap();

    for i in 0..single.len() {
        assert!((0.0..=1.0).contains(&single[i].x));
        assert!((0.0..=0.5).contains(&left[i].x));
        assert!((0.5..=1.0).contains(&right[i].x));
        assert_eq!(left[i].y, single[i].y);
        assert_eq!(right[i].y, single[i].y);
    }
}

#[test]
fn raw_display_mode_values_are_validated() {
    let mesh = undistorted(2, 2);

    assert!(mesh.tex_coords_for_raw_mode(1, 0).is_ok());
    assert!(mesh.tex_coords_for_raw_mode(2, 1).is_ok());
    for raw in [0, 3, -1] {
        assert!(matches!(
            mesh.tex_coords_for_raw_mode(raw, 0),
            Err(WarpError::UnsupportedDisplayMode(m)) if m == raw
        ));
    }
}
