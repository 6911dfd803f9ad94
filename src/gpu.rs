//! Graphics API seam
//!
//! The warp only needs a GLES2-class surface: 2D textures, framebuffer
//! objects, 16-bit depth renderbuffers and one indexed draw. These traits
//! describe exactly that, so the compositor can run on wgpu (see
//! [`crate::wgpu_backend`]) or anything else that can express it.

use glam::{Mat4, Vec2, Vec3};

/// Opaque texture name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque renderbuffer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderbufferId(pub u32);

/// Opaque framebuffer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Size of a render target in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of a framebuffer completeness check.
///
/// Codes match the GLES2 `glCheckFramebufferStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    IncompleteDimensions,
    Unsupported,
}

impl FramebufferStatus {
    pub fn code(self) -> u32 {
        match self {
            FramebufferStatus::Complete => 0x8CD5,
            FramebufferStatus::IncompleteAttachment => 0x8CD6,
            FramebufferStatus::MissingAttachment => 0x8CD7,
            FramebufferStatus::IncompleteDimensions => 0x8CD9,
            FramebufferStatus::Unsupported => 0x8CDD,
        }
    }

    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }
}

/// Shader program used for the warp draw.
pub trait WarpProgram {
    /// Makes this program current for the next draw.
    fn use_program(&mut self);

    /// Uploads the combined model-view-projection matrix.
    fn set_mvp(&mut self, mvp: Mat4);

    /// Uploads vertex positions into buffer `slot`.
    fn upload_positions(&mut self, slot: usize, positions: &[Vec3]);

    /// Uploads texture coordinates into buffer `slot`.
    fn upload_tex_coords(&mut self, slot: usize, tex_coords: &[Vec2]);

    /// Drops any cached state referring to `texture` before it is deleted.
    fn release_texture(&mut self, texture: TextureId);
}

/// Immediate-mode graphics calls issued on the render thread.
pub trait GraphicsApi {
    type Program: WarpProgram;

    fn create_framebuffer(&mut self) -> FramebufferId;

    /// Allocates 16-bit depth storage of `size`.
    fn create_depth_renderbuffer(&mut self, size: Extent) -> RenderbufferId;

    /// Allocates an RGBA8 texture of `size`, linearly filtered and clamped to edge.
    fn create_color_texture(&mut self, size: Extent) -> TextureId;

    /// Attaches `color` as color attachment 0 and `depth` as the depth attachment.
    fn attach(&mut self, framebuffer: FramebufferId, color: TextureId, depth: RenderbufferId);

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus;

    fn delete_texture(&mut self, texture: TextureId);

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);

    /// Redirects rendering; `None` selects the default, visible target.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Draws indexed triangles with `program` and its uploaded buffers.
    fn draw_elements(&mut self, program: &mut Self::Program, indices: &[u16]);
}
