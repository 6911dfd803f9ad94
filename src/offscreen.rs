//! Offscreen render target
//!
//! Color texture + depth renderbuffer + framebuffer sized to the viewport.
//! The three handles are owned together: either none exist or all of them
//! exist and form one complete framebuffer.

use log::{debug, error, info};

use crate::error::{Result, WarpError};
use crate::gpu::{Extent, FramebufferId, GraphicsApi, RenderbufferId, TextureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TargetHandles {
    texture: TextureId,
    renderbuffer: RenderbufferId,
    framebuffer: FramebufferId,
}

/// Render target the scene is captured into before warping.
#[derive(Debug, Default)]
pub struct OffscreenTarget {
    handles: Option<TargetHandles>,
    size: Extent,
}

impl OffscreenTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a framebuffer of `size`, rebuilding it if the size changed.
    ///
    /// Unchanged size with live handles issues no GPU calls. On rebuild the
    /// previous handles are released first, and the framebuffer binding is
    /// reset to the default target before returning.
    pub fn ensure<G: GraphicsApi>(&mut self, gpu: &mut G, size: Extent) -> Result<FramebufferId> {
        if let Some(handles) = self.handles {
            if self.size == size {
                return Ok(handles.framebuffer);
            }
        }

        self.release(gpu);

        let framebuffer = gpu.create_framebuffer();
        gpu.bind_framebuffer(Some(framebuffer));
        let renderbuffer = gpu.create_depth_renderbuffer(size);
        let texture = gpu.create_color_texture(size);
        gpu.attach(framebuffer, texture, renderbuffer);

        let handles = TargetHandles {
            texture,
            renderbuffer,
            framebuffer,
        };

        let status = gpu.framebuffer_status(framebuffer);
        gpu.bind_framebuffer(None);

        if !status.is_complete() {
            error!(
                "Offscreen framebuffer {}x{} incomplete: {:#x}",
                size.width,
                size.height,
                status.code()
            );
            Self::delete(gpu, handles);
            return Err(WarpError::IncompleteFramebuffer {
                status: status.code(),
            });
        }

        info!("Offscreen target created: {}x{}", size.width, size.height);
        self.handles = Some(handles);
        self.size = size;
        Ok(framebuffer)
    }

    /// Deletes the texture, renderbuffer and framebuffer, in that order.
    pub fn release<G: GraphicsApi>(&mut self, gpu: &mut G) {
        if let Some(handles) = self.handles.take() {
            debug!(
                "Releasing offscreen target {}x{}",
                self.size.width, self.size.height
            );
            Self::delete(gpu, handles);
        }
        self.size = Extent::default();
    }

    fn delete<G: GraphicsApi>(gpu: &mut G, handles: TargetHandles) {
        gpu.delete_texture(handles.texture);
        gpu.delete_renderbuffer(handles.renderbuffer);
        gpu.delete_framebuffer(handles.framebuffer);
    }

    pub fn is_allocated(&self) -> bool {
        self.handles.is_some()
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn color_texture(&self) -> Option<TextureId> {
        self.handles.map(|h| h.texture)
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.handles.map(|h| h.framebuffer)
    }
}
