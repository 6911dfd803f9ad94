//! wgpu backend
//!
//! Expresses the GLES2-style [`GraphicsApi`] on top of wgpu. Opaque handles
//! index into slot maps of wgpu textures; a "framebuffer" is a pairing of a
//! color texture and a depth buffer that render passes are opened against.
//! Commands are recorded into one encoder per frame and submitted by
//! [`WgpuGraphics::finish_frame`].

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, CommandEncoder, Device, Queue, RenderPipeline, Sampler,
    TextureFormat, TextureView,
};

use crate::error::{Result, WarpError};
use crate::gpu::{
    Extent, FramebufferId, FramebufferStatus, GraphicsApi, RenderbufferId, TextureId, WarpProgram,
};
use crate::viewport::Viewport;

/// Format of offscreen color textures (RGBA, unsigned byte).
pub const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Format of offscreen depth renderbuffers.
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth16Unorm;

const VERTEX_SLOTS: usize = 2;

// Warp uniforms
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct WarpUniforms {
    mvp: [[f32; 4]; 4],
}

struct ColorTexture {
    size: Extent,
    // Kept alive for the view
    _texture: Option<wgpu::Texture>,
    view: Option<TextureView>,
}

struct DepthBuffer {
    size: Extent,
    _texture: Option<wgpu::Texture>,
    view: Option<TextureView>,
}

#[derive(Default)]
struct Framebuffer {
    color: Option<TextureId>,
    depth: Option<RenderbufferId>,
}

struct IndexCache {
    indices: Vec<u16>,
    buffer: Buffer,
}

/// Views and encoder for rendering into the currently bound framebuffer.
pub struct CaptureTarget<'a> {
    pub encoder: &'a mut CommandEncoder,
    pub color: &'a TextureView,
    /// Absent when the default target is bound.
    pub depth: Option<&'a TextureView>,
}

/// GLES2-class graphics context backed by a wgpu device.
pub struct WgpuGraphics {
    device: Device,
    queue: Queue,

    textures: HashMap<u32, ColorTexture>,
    renderbuffers: HashMap<u32, DepthBuffer>,
    framebuffers: HashMap<u32, Framebuffer>,
    next_name: u32,

    bound_framebuffer: Option<FramebufferId>,
    bound_texture: Option<TextureId>,
    viewport: Option<Viewport>,

    // Per frame
    default_target: Option<TextureView>,
    encoder: Option<CommandEncoder>,

    index_cache: Option<IndexCache>,
}

fn new_encoder(device: &Device) -> CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Warp Frame Encoder"),
    })
}

impl WgpuGraphics {
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            next_name: 0,
            bound_framebuffer: None,
            bound_texture: None,
            viewport: None,
            default_target: None,
            encoder: None,
            index_cache: None,
        }
    }

    /// Creates a context on the first available adapter, without a surface.
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(WarpError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Warp Device"),
                ..Default::default()
            },
            None,
        ))?;

        info!("Headless warp device on {}", adapter.get_info().name);
        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Starts a frame presenting into `view`, cleared to black.
    pub fn begin_frame(&mut self, view: TextureView) {
        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| new_encoder(device));
        {
            let _clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.default_target = Some(view);
    }

    /// Submits everything recorded since [`WgpuGraphics::begin_frame`].
    pub fn finish_frame(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        self.default_target = None;
    }

    /// Restricts subsequent warp draws to `viewport`, e.g. one half of the
    /// screen per eye. `None` draws over the whole target.
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    /// Encoder and attachments of the bound framebuffer, for the scene renderer.
    pub fn capture_target(&mut self) -> Option<CaptureTarget<'_>> {
        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| new_encoder(device));

        let (color, depth) = match self.bound_framebuffer {
            Some(fb) => {
                let slot = self.framebuffers.get(&fb.0)?;
                let color = slot
                    .color
                    .and_then(|id| self.textures.get(&id.0))
                    .and_then(|t| t.view.as_ref())?;
                let depth = slot
                    .depth
                    .and_then(|id| self.renderbuffers.get(&id.0))
                    .and_then(|d| d.view.as_ref());
                (color, depth)
            }
            None => (self.default_target.as_ref()?, None),
        };

        Some(CaptureTarget {
            encoder,
            color,
            depth,
        })
    }

    /// Clears color and depth of the bound framebuffer.
    pub fn clear_bound_target(&mut self, color: wgpu::Color) {
        let Some(target) = self.capture_target() else {
            warn!("clear_bound_target: no render target bound");
            return;
        };

        let depth_stencil_attachment =
            target
                .depth
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let _pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Capture Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    fn name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn allocatable(&self, size: Extent) -> bool {
        let max = self.device.limits().max_texture_dimension_2d;
        !size.is_empty() && size.width <= max && size.height <= max
    }

    fn create_texture(
        &self,
        label: &str,
        size: Extent,
        format: TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Option<(wgpu::Texture, TextureView)> {
        if !self.allocatable(size) {
            warn!("Refusing {} of {}x{}", label, size.width, size.height);
            return None;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Some((texture, view))
    }
}

fn upload_indices<'a>(
    device: &Device,
    cache: &'a mut Option<IndexCache>,
    indices: &[u16],
) -> &'a Buffer {
    let fresh = match cache.take() {
        Some(cached) if cached.indices == indices => cached,
        _ => IndexCache {
            indices: indices.to_vec(),
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Warp Indices"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
        },
    };
    &cache.insert(fresh).buffer
}

impl GraphicsApi for WgpuGraphics {
    type Program = WgpuWarpProgram;

    fn create_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.name());
        self.framebuffers.insert(id.0, Framebuffer::default());
        debug!("Created framebuffer {}", id.0);
        id
    }

    fn create_depth_renderbuffer(&mut self, size: Extent) -> RenderbufferId {
        let id = RenderbufferId(self.name());
        let created = self.create_texture(
            "Offscreen Depth",
            size,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let (texture, view) = created.unzip();
        self.renderbuffers.insert(
            id.0,
            DepthBuffer {
                size,
                _texture: texture,
                view,
            },
        );
        debug!("Created renderbuffer {} ({}x{})", id.0, size.width, size.height);
        id
    }

    fn create_color_texture(&mut self, size: Extent) -> TextureId {
        let id = TextureId(self.name());
        let created = self.create_texture(
            "Offscreen Texture",
            size,
            COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let (texture, view) = created.unzip();
        self.textures.insert(
            id.0,
            ColorTexture {
                size,
                _texture: texture,
                view,
            },
        );
        debug!("Created texture {} ({}x{})", id.0, size.width, size.height);
        id
    }

    fn attach(&mut self, framebuffer: FramebufferId, color: TextureId, depth: RenderbufferId) {
        match self.framebuffers.get_mut(&framebuffer.0) {
            Some(fb) => {
                fb.color = Some(color);
                fb.depth = Some(depth);
            }
            None => warn!("attach: unknown framebuffer {}", framebuffer.0),
        }
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer.0) else {
            return FramebufferStatus::Unsupported;
        };
        let (Some(color), Some(depth)) = (fb.color, fb.depth) else {
            return FramebufferStatus::MissingAttachment;
        };
        let (Some(color), Some(depth)) = (
            self.textures.get(&color.0),
            self.renderbuffers.get(&depth.0),
        ) else {
            return FramebufferStatus::MissingAttachment;
        };
        if color.view.is_none() || depth.view.is_none() {
            return FramebufferStatus::IncompleteAttachment;
        }
        if color.size != depth.size {
            return FramebufferStatus::IncompleteDimensions;
        }
        FramebufferStatus::Complete
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_some() {
            debug!("Deleted texture {}", texture.0);
        }
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        if self.renderbuffers.remove(&renderbuffer.0).is_some() {
            debug!("Deleted renderbuffer {}", renderbuffer.0);
        }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer.0).is_some() {
            debug!("Deleted framebuffer {}", framebuffer.0);
        }
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.bound_framebuffer = framebuffer;
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if unit != 0 {
            warn!("Only texture unit 0 is supported, got {}", unit);
            return;
        }
        self.bound_texture = Some(texture);
    }

    fn draw_elements(&mut self, program: &mut WgpuWarpProgram, indices: &[u16]) {
        if indices.is_empty() {
            return;
        }

        let Some(texture_id) = self.bound_texture else {
            warn!("draw_elements: no texture bound");
            return;
        };
        let Some(texture_view) = self
            .textures
            .get(&texture_id.0)
            .and_then(|t| t.view.as_ref())
        else {
            warn!("draw_elements: texture {} has no storage", texture_id.0);
            return;
        };

        let target = match self.bound_framebuffer {
            Some(fb) => self
                .framebuffers
                .get(&fb.0)
                .and_then(|f| f.color)
                .and_then(|id| self.textures.get(&id.0))
                .and_then(|t| t.view.as_ref()),
            None => self.default_target.as_ref(),
        };
        let Some(target) = target else {
            warn!("draw_elements: no render target");
            return;
        };

        program.sync(&self.device, &self.queue);
        program.ensure_bind_group(&self.device, texture_id, texture_view);
        let Some(state) = program.draw_state() else {
            warn!("draw_elements: program has no vertex data");
            return;
        };

        let device = &self.device;
        let index_buffer = upload_indices(device, &mut self.index_cache, indices);
        let encoder = self.encoder.get_or_insert_with(|| new_encoder(device));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Warp Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(vp) = self.viewport {
            pass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );
        }
        pass.set_pipeline(state.pipeline);
        pass.set_bind_group(0, state.bind_group, &[]);
        pass.set_vertex_buffer(0, state.positions.slice(..));
        pass.set_vertex_buffer(1, state.tex_coords.slice(..));
        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..indices.len() as u32, 0, 0..1);
    }
}

/// CPU copy of one vertex stream plus its GPU buffer, re-uploaded only on change.
struct VertexStream<T> {
    data: Vec<T>,
    buffer: Option<Buffer>,
    dirty: bool,
}

impl<T: Pod + PartialEq> VertexStream<T> {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            buffer: None,
            dirty: false,
        }
    }

    fn set(&mut self, data: &[T]) {
        if self.buffer.is_none() || self.data.as_slice() != data {
            self.data.clear();
            self.data.extend_from_slice(data);
            self.dirty = true;
        }
    }

    fn sync(&mut self, device: &Device, label: &str) {
        if !self.dirty {
            return;
        }
        self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&self.data),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.dirty = false;
    }
}

struct DrawState<'a> {
    pipeline: &'a RenderPipeline,
    bind_group: &'a BindGroup,
    positions: &'a Buffer,
    tex_coords: &'a Buffer,
}

/// The warp shader program: pipeline, MVP uniform, scene sampler and
/// per-slot vertex streams.
pub struct WgpuWarpProgram {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    sampler: Sampler,
    uniform_buffer: Buffer,
    bind_group: Option<(TextureId, BindGroup)>,

    positions: [VertexStream<Vec3>; VERTEX_SLOTS],
    tex_coords: [VertexStream<Vec2>; VERTEX_SLOTS],
    active_slot: usize,
    mvp: Mat4,
    in_use: bool,
}

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEX_COORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

impl WgpuWarpProgram {
    /// Builds the warp pipeline rendering into `target_format` (usually the surface format).
    pub fn new(device: &Device, target_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Warp Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/warp.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Warp Uniform Buffer"),
            size: std::mem::size_of::<WarpUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Linear filtering, clamped to edge on both axes
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Warp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Warp Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Warp Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Warp Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vec3>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vec2>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &TEX_COORD_ATTRIBUTES,
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            bind_group: None,
            positions: [VertexStream::new(), VertexStream::new()],
            tex_coords: [VertexStream::new(), VertexStream::new()],
            active_slot: 0,
            mvp: Mat4::IDENTITY,
            in_use: false,
        }
    }

    fn sync(&mut self, device: &Device, queue: &Queue) {
        for stream in &mut self.positions {
            stream.sync(device, "Warp Positions");
        }
        for stream in &mut self.tex_coords {
            stream.sync(device, "Warp Tex Coords");
        }

        let uniforms = WarpUniforms {
            mvp: self.mvp.to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn ensure_bind_group(&mut self, device: &Device, texture: TextureId, view: &TextureView) {
        if self.holds_texture(texture) {
            return;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Warp Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.bind_group = Some((texture, bind_group));
    }

    /// Whether a bind group for `texture` is cached.
    pub fn holds_texture(&self, texture: TextureId) -> bool {
        matches!(self.bind_group, Some((bound, _)) if bound == texture)
    }

    fn draw_state(&self) -> Option<DrawState<'_>> {
        if !self.in_use {
            return None;
        }
        Some(DrawState {
            pipeline: &self.pipeline,
            bind_group: self.bind_group.as_ref().map(|(_, bg)| bg)?,
            positions: self.positions[self.active_slot].buffer.as_ref()?,
            tex_coords: self.tex_coords[self.active_slot].buffer.as_ref()?,
        })
    }
}

impl WarpProgram for WgpuWarpProgram {
    fn use_program(&mut self) {
        self.in_use = true;
    }

    fn set_mvp(&mut self, mvp: Mat4) {
        self.mvp = mvp;
    }

    fn upload_positions(&mut self, slot: usize, positions: &[Vec3]) {
        match self.positions.get_mut(slot) {
            Some(stream) => {
                stream.set(positions);
                self.active_slot = slot;
            }
            None => warn!("upload_positions: slot {} out of range", slot),
        }
    }

    fn upload_tex_coords(&mut self, slot: usize, tex_coords: &[Vec2]) {
        match self.tex_coords.get_mut(slot) {
            Some(stream) => stream.set(tex_coords),
            None => warn!("upload_tex_coords: slot {} out of range", slot),
        }
    }

    fn release_texture(&mut self, texture: TextureId) {
        if self.holds_texture(texture) {
            debug!("Dropping warp bind group for texture {}", texture.0);
            self.bind_group = None;
        }
    }
}
