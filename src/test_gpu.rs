//! Recording graphics backend for unit tests.

use glam::{Mat4, Vec2, Vec3};

use crate::gpu::{
    Extent, FramebufferId, FramebufferStatus, GraphicsApi, RenderbufferId, TextureId, WarpProgram,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateFramebuffer(FramebufferId),
    CreateRenderbuffer(RenderbufferId, Extent),
    CreateTexture(TextureId, Extent),
    Attach(FramebufferId, TextureId, RenderbufferId),
    DeleteTexture(TextureId),
    DeleteRenderbuffer(RenderbufferId),
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    BindTexture(u32, TextureId),
    DrawElements(usize),
}

#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub calls: Vec<GpuCall>,
    pub status: Option<FramebufferStatus>,
    next_name: u32,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every completeness check report `status`.
    pub fn failing_with(status: FramebufferStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn allocations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    GpuCall::CreateFramebuffer(_)
                        | GpuCall::CreateRenderbuffer(..)
                        | GpuCall::CreateTexture(..)
                )
            })
            .count()
    }

    pub fn deletions(&self) -> Vec<GpuCall> {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    GpuCall::DeleteTexture(_)
                        | GpuCall::DeleteRenderbuffer(_)
                        | GpuCall::DeleteFramebuffer(_)
                )
            })
            .cloned()
            .collect()
    }

    fn name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgramCall {
    Use,
    Mvp(Mat4),
    Positions(usize, Vec<Vec3>),
    TexCoords(usize, Vec<Vec2>),
    ReleaseTexture(TextureId),
}

#[derive(Debug, Default)]
pub struct RecordingProgram {
    pub calls: Vec<ProgramCall>,
}

impl WarpProgram for RecordingProgram {
    fn use_program(&mut self) {
        self.calls.push(ProgramCall::Use);
    }

    fn set_mvp(&mut self, mvp: Mat4) {
        self.calls.push(ProgramCall::Mvp(mvp));
    }

    fn upload_positions(&mut self, slot: usize, positions: &[Vec3]) {
        self.calls.push(ProgramCall::Positions(slot, positions.to_vec()));
    }

    fn upload_tex_coords(&mut self, slot: usize, tex_coords: &[Vec2]) {
        self.calls.push(ProgramCall::TexCoords(slot, tex_coords.to_vec()));
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.calls.push(ProgramCall::ReleaseTexture(texture));
    }
}

impl GraphicsApi for RecordingGpu {
    type Program = RecordingProgram;

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.name());
        self.calls.push(GpuCall::CreateFramebuffer(id));
        id
    }

    fn create_depth_renderbuffer(&mut self, size: Extent) -> RenderbufferId {
        let id = RenderbufferId(self.name());
        self.calls.push(GpuCall::CreateRenderbuffer(id, size));
        id
    }

    fn create_color_texture(&mut self, size: Extent) -> TextureId {
        let id = TextureId(self.name());
        self.calls.push(GpuCall::CreateTexture(id, size));
        id
    }

    fn attach(&mut self, framebuffer: FramebufferId, color: TextureId, depth: RenderbufferId) {
        self.calls.push(GpuCall::Attach(framebuffer, color, depth));
    }

    fn framebuffer_status(&self, _framebuffer: FramebufferId) -> FramebufferStatus {
        self.status.unwrap_or(FramebufferStatus::Complete)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(GpuCall::DeleteTexture(texture));
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.calls.push(GpuCall::DeleteRenderbuffer(renderbuffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.calls.push(GpuCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.calls.push(GpuCall::BindFramebuffer(framebuffer));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(GpuCall::BindTexture(unit, texture));
    }

    fn draw_elements(&mut self, _program: &mut RecordingProgram, indices: &[u16]) {
        self.calls.push(GpuCall::DrawElements(indices.len()));
    }
}
