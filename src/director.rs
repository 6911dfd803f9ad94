//! Camera directors
//!
//! A director turns viewport size and head input into the matrices a draw
//! needs. The main scene uses a perspective director driven by the head
//! sensor; the warp draw uses a fixed orthographic one that ignores all input.

use glam::{EulerRot, Mat4, Quat};

use crate::gpu::WarpProgram;
use crate::viewport::Viewport;

/// Far plane shared by both directors.
pub const FAR: f32 = 500.0;

/// Perspective camera following the head sensor and touch drag.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveDirector {
    near: f32,
    fov_y: f32,
    aspect: f32,
    sensor: Quat,
    delta_x: f32, // degrees, yaw from drag
    delta_y: f32, // degrees, pitch from drag
    projection: Mat4,
}

impl PerspectiveDirector {
    pub fn new(near: f32, fov_y_degrees: f32) -> Self {
        let mut director = Self {
            near,
            fov_y: fov_y_degrees.to_radians(),
            aspect: 1.0,
            sensor: Quat::IDENTITY,
            delta_x: 0.0,
            delta_y: 0.0,
            projection: Mat4::IDENTITY,
        };
        director.update_projection();
        director
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, FAR);
    }

    fn view(&self) -> Mat4 {
        let drag = Quat::from_euler(
            EulerRot::YXZ,
            self.delta_x.to_radians(),
            self.delta_y.to_radians(),
            0.0,
        );
        Mat4::from_quat((self.sensor * drag).inverse())
    }
}

/// Screen-aligned orthographic camera for the warp draw.
#[derive(Debug, Clone, Copy)]
pub struct OrthoDirector {
    near: f32,
    projection: Mat4,
}

impl OrthoDirector {
    pub fn new(near: f32) -> Self {
        let mut director = Self {
            near,
            projection: Mat4::IDENTITY,
        };
        director.update_projection();
        director
    }

    /// Fixed (-1, 1, -1, 1, near, far) box, wgpu depth range.
    fn update_projection(&mut self) {
        let (left, right, bottom, top) = (-1.0, 1.0, -1.0, 1.0);
        self.projection = Mat4::orthographic_rh(left, right, bottom, top, self.near, FAR);
    }
}

/// Camera strategy, chosen at construction.
#[derive(Debug, Clone, Copy)]
pub enum Director {
    PerspectiveSensor(PerspectiveDirector),
    FixedOrtho(OrthoDirector),
}

impl Director {
    pub fn perspective(near: f32, fov_y_degrees: f32) -> Self {
        Director::PerspectiveSensor(PerspectiveDirector::new(near, fov_y_degrees))
    }

    pub fn ortho(near: f32) -> Self {
        Director::FixedOrtho(OrthoDirector::new(near))
    }

    pub fn update_viewport(&mut self, width: u32, height: u32) {
        match self {
            Director::PerspectiveSensor(d) => {
                d.aspect = Viewport::from_size(width, height).aspect();
                d.update_projection();
            }
            Director::FixedOrtho(_) => {}
        }
    }

    pub fn update_projection(&mut self) {
        match self {
            Director::PerspectiveSensor(d) => d.update_projection(),
            Director::FixedOrtho(d) => d.update_projection(),
        }
    }

    pub fn update_sensor(&mut self, orientation: Quat) {
        if let Director::PerspectiveSensor(d) = self {
            d.sensor = orientation;
        }
    }

    pub fn set_delta_x(&mut self, degrees: f32) {
        if let Director::PerspectiveSensor(d) = self {
            d.delta_x = degrees;
        }
    }

    pub fn set_delta_y(&mut self, degrees: f32) {
        if let Director::PerspectiveSensor(d) = self {
            d.delta_y = degrees;
        }
    }

    pub fn projection(&self) -> Mat4 {
        match self {
            Director::PerspectiveSensor(d) => d.projection,
            Director::FixedOrtho(d) => d.projection,
        }
    }

    pub fn view(&self) -> Mat4 {
        match self {
            Director::PerspectiveSensor(d) => d.view(),
            // Eye at the origin looking down -Z
            Director::FixedOrtho(_) => Mat4::IDENTITY,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Uploads the combined matrix to `program`.
    pub fn shot<P: WarpProgram>(&self, program: &mut P) {
        program.set_mvp(self.view_projection());
    }
}
