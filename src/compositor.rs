//! Capture-then-composite frame protocol
//!
//! Each frame the scene is redirected into an offscreen target by
//! [`WarpCompositor::begin_capture`], then [`WarpCompositor::commit`] draws
//! that target through the distorted mesh onto the visible framebuffer.

use log::info;

use crate::config::WarpConfig;
use crate::director::Director;
use crate::error::Result;
use crate::gpu::{Extent, GraphicsApi, WarpProgram};
use crate::mesh::{DisplayMode, Mesh};
use crate::offscreen::OffscreenTarget;
use crate::viewport::Viewport;

/// Where the compositor is in the per-frame protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
}

/// Lens-correcting compositor.
///
/// Owns the warp program, the prebuilt mesh and the offscreen target. All
/// calls must happen on the thread that owns the GPU context.
pub struct WarpCompositor<G: GraphicsApi> {
    program: G::Program,
    mesh: Mesh,
    target: OffscreenTarget,
    director: Director,
    viewport: Viewport,
    mode: DisplayMode,
    phase: Phase,
}

impl<G: GraphicsApi> WarpCompositor<G> {
    pub fn new(program: G::Program, config: &WarpConfig) -> Self {
        let mesh = Mesh::from_config(config);
        info!(
            "Warp compositor ready: {}x{} grid, {} vertices, {} indices",
            config.grid.rows(),
            config.grid.cols(),
            mesh.vertex_count(),
            mesh.index_count()
        );

        Self {
            program,
            mesh,
            target: OffscreenTarget::new(),
            director: Director::ortho(config.near),
            viewport: Viewport::default(),
            mode: DisplayMode::Single,
            phase: Phase::Idle,
        }
    }

    /// Redirects subsequent scene rendering into the offscreen target.
    ///
    /// Rebuilds the target whenever `width`/`height` differ from the last
    /// captured viewport. Fails only if the rebuilt framebuffer is incomplete.
    pub fn begin_capture(
        &mut self,
        gpu: &mut G,
        width: u32,
        height: u32,
        mode: DisplayMode,
    ) -> Result<()> {
        self.director.update_viewport(width, height);
        self.mode = mode;

        if !self.viewport.same_size(width, height) {
            self.release_program_texture();
        }
        let framebuffer = self.target.ensure(gpu, Extent::new(width, height))?;
        self.viewport = Viewport::from_size(width, height);

        gpu.bind_framebuffer(Some(framebuffer));
        self.phase = Phase::Capturing;
        Ok(())
    }

    /// Draws the captured scene through the warp mesh for `eye`.
    ///
    /// Must follow a [`WarpCompositor::begin_capture`] in the same frame;
    /// otherwise the result is whatever the offscreen texture last held.
    /// In dual mode `eye` selects the left (0) or right (1) half of the
    /// captured texture.
    pub fn commit(&mut self, gpu: &mut G, eye: usize) -> Result<()> {
        gpu.bind_framebuffer(None);
        self.program.use_program();

        let (slot, positions) = self.mesh.positions(self.mode, eye)?;
        let tex_coords = self.mesh.tex_coords(self.mode, eye)?;
        self.program.upload_positions(slot, positions);
        self.program.upload_tex_coords(slot, tex_coords);

        self.director.shot(&mut self.program);

        if let Some(texture) = self.target.color_texture() {
            gpu.bind_texture(0, texture);
        }

        gpu.draw_elements(&mut self.program, self.mesh.indices());
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Releases the offscreen target.
    pub fn destroy(&mut self, gpu: &mut G) {
        self.release_program_texture();
        self.target.release(gpu);
        self.viewport = Viewport::default();
        self.phase = Phase::Idle;
    }

    // The target texture is about to be deleted
    fn release_program_texture(&mut self) {
        if let Some(texture) = self.target.color_texture() {
            self.program.release_texture(texture);
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn offscreen(&self) -> &OffscreenTarget {
        &self.target
    }

    pub fn director(&self) -> &Director {
        &self.director
    }

    pub fn program(&self) -> &G::Program {
        &self.program
    }
}
