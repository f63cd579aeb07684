//! GPU painter using wgpu
//!
//! Every frame is drawn with two instanced pipelines:
//! - Rect pipeline: non-default cell backgrounds, underlines, the cursor
//! - Text pipeline: alpha-blended glyph quads sampled from an R8 atlas
//!
//! Swapchain images do not keep their contents between frames, so a region
//! refresh still draws the whole grid.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use ttk_core::{Canvas, DirtyRegion, Error, Result, Rgb, TextAttribute};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::font::{CellMetrics, FontFace};
use crate::painter::Painter;

const BACKEND: &str = "gpu";

pub const ATLAS_SIZE: u32 = 2048;
const INITIAL_RECT_CAPACITY: usize = 4096;
const INITIAL_GLYPH_CAPACITY: usize = 4096;

const RECT_SHADER: &str = r#"
struct Uniforms {
    screen_size: vec2<f32>,
    _padding: vec2<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

fn to_clip(pixel: vec2<f32>) -> vec4<f32> {
    let ndc = pixel / uniforms.screen_size * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0);
    return vec4<f32>(ndc, 0.0, 1.0);
}

@vertex
fn vs_main(
    @builtin(vertex_index) vi: u32,
    @location(0) origin: vec2<f32>,
    @location(1) extent: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    let corner = vec2<f32>(f32(vi & 1u), f32(vi >> 1u));
    var out: VertexOutput;
    out.position = to_clip(origin + corner * extent);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const TEXT_SHADER: &str = r#"
struct Uniforms {
    screen_size: vec2<f32>,
    _padding: vec2<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var atlas_tex: texture_2d<f32>;
@group(1) @binding(1) var atlas_samp: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

fn to_clip(pixel: vec2<f32>) -> vec4<f32> {
    let ndc = pixel / uniforms.screen_size * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0);
    return vec4<f32>(ndc, 0.0, 1.0);
}

@vertex
fn vs_main(
    @builtin(vertex_index) vi: u32,
    @location(0) origin: vec2<f32>,
    @location(1) extent: vec2<f32>,
    @location(2) uv_origin: vec2<f32>,
    @location(3) uv_extent: vec2<f32>,
    @location(4) color: vec4<f32>,
) -> VertexOutput {
    let corner = vec2<f32>(f32(vi & 1u), f32(vi >> 1u));
    var out: VertexOutput;
    out.position = to_clip(origin + corner * extent);
    out.uv = uv_origin + corner * uv_extent;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let coverage = textureSample(atlas_tex, atlas_samp, in.uv).r;
    return vec4<f32>(in.color.rgb, in.color.a * coverage);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    screen_size: [f32; 2],
    _padding: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct RectInstance {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub uv_pos: [f32; 2],
    pub uv_size: [f32; 2],
    pub color: [f32; 4],
}

/// Location of a glyph in the atlas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasSlot {
    pub uv: [f32; 4],
    pub width: u32,
    pub height: u32,
    pub xmin: i32,
    pub ymin: i32,
}

/// Row-packed single-channel glyph atlas
#[derive(Debug)]
pub struct GlyphAtlas {
    slots: HashMap<(char, bool), AtlasSlot>,
    size: u32,
    data: Vec<u8>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    dirty: bool,
}

impl GlyphAtlas {
    pub fn new(size: u32) -> Self {
        Self {
            slots: HashMap::with_capacity(256),
            size,
            data: vec![0u8; (size * size) as usize],
            cursor_x: 0,
            cursor_y: 0,
            row_height: 0,
            dirty: false,
        }
    }

    pub fn get(&self, key: &(char, bool)) -> Option<&AtlasSlot> {
        self.slots.get(key)
    }

    pub fn contains(&self, key: &(char, bool)) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copy a coverage bitmap in; false when the atlas has no room left
    pub fn insert(&mut self, key: (char, bool), bitmap: &[u8], width: u32, height: u32, xmin: i32, ymin: i32) -> bool {
        if width == 0 || height == 0 {
            self.slots.insert(
                key,
                AtlasSlot {
                    uv: [0.0; 4],
                    width: 0,
                    height: 0,
                    xmin,
                    ymin,
                },
            );
            return true;
        }

        // One pixel of padding keeps linear sampling from bleeding
        let padded_w = width + 1;
        let padded_h = height + 1;
        if padded_w > self.size {
            return false;
        }
        if self.cursor_x + padded_w > self.size {
            self.cursor_x = 0;
            self.cursor_y += self.row_height;
            self.row_height = 0;
        }
        if self.cursor_y + padded_h > self.size {
            return false;
        }

        let (x, y) = (self.cursor_x, self.cursor_y);
        for row in 0..height {
            let dst = ((y + row) * self.size + x) as usize;
            let src = (row * width) as usize;
            let len = width as usize;
            if let (Some(dst), Some(src)) = (self.data.get_mut(dst..dst + len), bitmap.get(src..src + len)) {
                dst.copy_from_slice(src);
            }
        }

        let s = self.size as f32;
        self.slots.insert(
            key,
            AtlasSlot {
                uv: [x as f32 / s, y as f32 / s, width as f32 / s, height as f32 / s],
                width,
                height,
                xmin,
                ymin,
            },
        );
        self.cursor_x += padded_w;
        self.row_height = self.row_height.max(padded_h);
        self.dirty = true;
        true
    }

    pub fn clear(&mut self) {
        log::debug!("glyph atlas cleared ({} glyphs)", self.slots.len());
        self.slots.clear();
        self.data.fill(0);
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.row_height = 0;
        self.dirty = true;
    }
}

/// Instance lists for one frame
#[derive(Debug, Default)]
pub struct FrameInstances {
    pub rects: Vec<RectInstance>,
    pub glyphs: Vec<GlyphInstance>,
}

fn color(c: Rgb) -> [f32; 4] {
    let [r, g, b] = c.normalized();
    [r, g, b, 1.0]
}

/// Convert the cells of `region` into background and glyph instances
///
/// Blank cells in the default pair are left to the clear color. Every other
/// cell gets a background quad, even when its color equals the default. The
/// visible cursor cell is drawn with swapped colors.
pub fn build_instances(canvas: &Canvas, region: &DirtyRegion, metrics: CellMetrics, atlas: &GlyphAtlas) -> FrameInstances {
    let mut frame = FrameInstances {
        rects: Vec::with_capacity(region.cell_count() / 4),
        glyphs: Vec::with_capacity(region.cell_count() / 2),
    };
    let cursor = canvas.cursor;

    for row in region.start_row..region.end_row {
        for col in region.start_col..region.end_col {
            let Some(cell) = canvas.cell(row, col) else {
                continue;
            };
            let is_cursor = cursor.visible && cursor.row == row && cursor.col == col;
            if cell.is_default_blank() && !is_cursor {
                continue;
            }

            let (mut fg, mut bg) = canvas.cell_colors(&cell);
            if is_cursor {
                std::mem::swap(&mut fg, &mut bg);
            }
            let x = col as f32 * metrics.width;
            let y = row as f32 * metrics.height;

            frame.rects.push(RectInstance {
                pos: [x, y],
                size: [metrics.width, metrics.height],
                color: color(bg),
            });

            if cell.has_glyph() {
                let key = (cell.ch, cell.attrs.contains(TextAttribute::BOLD));
                if let Some(slot) = atlas.get(&key).filter(|s| s.width > 0 && s.height > 0) {
                    frame.glyphs.push(GlyphInstance {
                        pos: [
                            x + slot.xmin as f32,
                            y + metrics.baseline - slot.ymin as f32 - slot.height as f32,
                        ],
                        size: [slot.width as f32, slot.height as f32],
                        uv_pos: [slot.uv[0], slot.uv[1]],
                        uv_size: [slot.uv[2], slot.uv[3]],
                        color: color(fg),
                    });
                }
            }

            if cell.attrs.contains(TextAttribute::UNDERLINE) {
                frame.rects.push(RectInstance {
                    pos: [x, y + metrics.baseline + 1.0],
                    size: [metrics.width, 1.0],
                    color: color(fg),
                });
            }
        }
    }
    frame
}

pub struct GpuPainter {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    rect_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,

    atlas: GlyphAtlas,
    atlas_texture: wgpu::Texture,
    atlas_bind_group: wgpu::BindGroup,

    rect_buffer: wgpu::Buffer,
    rect_capacity: usize,
    glyph_buffer: wgpu::Buffer,
    glyph_capacity: usize,

    font: FontFace,
    metrics: CellMetrics,
    width: u32,
    height: u32,
}

fn instance_attributes<const N: usize>(formats: [wgpu::VertexFormat; N]) -> [wgpu::VertexAttribute; N] {
    let mut offset = 0;
    let mut location = 0;
    formats.map(|format| {
        let attribute = wgpu::VertexAttribute {
            format,
            offset,
            shader_location: location,
        };
        offset += format.size();
        location += 1;
        attribute
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    instance_layout: wgpu::VertexBufferLayout<'_>,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn instance_buffer(device: &wgpu::Device, label: &str, bytes: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: bytes as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl Painter for GpuPainter {
    const BACKEND: &'static str = BACKEND;

    fn new(window: Arc<Window>, font: FontFace) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| Error::init(BACKEND, format!("cannot create GPU surface: {}", e)))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            Error::init(
                BACKEND,
                "no compatible GPU adapter found; the GPU backend needs Metal, Vulkan, DX12 or GL. \
                 Use the cpu or terminal backend instead",
            )
        })?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ttk"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| Error::init(BACKEND, format!("cannot open GPU device: {}", e)))?;

        let caps = surface.get_capabilities(&adapter);
        // Pair colors are sRGB bytes; a non-sRGB target shows them unconverted
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::init(BACKEND, "surface reports no texture formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniforms"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniforms"),
            contents: bytemuck::cast_slice(&[Uniforms {
                screen_size: [size.width.max(1) as f32, size.height.max(1) as f32],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniforms"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph atlas"),
            size: wgpu::Extent3d {
                width: ATLAS_SIZE,
                height: ATLAS_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glyph atlas"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glyph atlas"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glyph atlas"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        let rect_attributes = instance_attributes([
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x4,
        ]);
        let rect_pipeline = create_pipeline(
            &device,
            "rects",
            RECT_SHADER,
            &[&uniform_layout],
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<RectInstance>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &rect_attributes,
            },
            format,
            wgpu::BlendState::REPLACE,
        );

        let glyph_attributes = instance_attributes([
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x2,
            wgpu::VertexFormat::Float32x4,
        ]);
        let text_pipeline = create_pipeline(
            &device,
            "glyphs",
            TEXT_SHADER,
            &[&uniform_layout, &atlas_layout],
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<GlyphInstance>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &glyph_attributes,
            },
            format,
            wgpu::BlendState::ALPHA_BLENDING,
        );

        let rect_buffer = instance_buffer(
            &device,
            "rect instances",
            INITIAL_RECT_CAPACITY * std::mem::size_of::<RectInstance>(),
        );
        let glyph_buffer = instance_buffer(
            &device,
            "glyph instances",
            INITIAL_GLYPH_CAPACITY * std::mem::size_of::<GlyphInstance>(),
        );

        let metrics = font.metrics();
        let mut painter = Self {
            device,
            queue,
            surface,
            surface_config,
            rect_pipeline,
            text_pipeline,
            uniform_buffer,
            uniform_bind_group,
            atlas: GlyphAtlas::new(ATLAS_SIZE),
            atlas_texture,
            atlas_bind_group,
            rect_buffer,
            rect_capacity: INITIAL_RECT_CAPACITY,
            glyph_buffer,
            glyph_capacity: INITIAL_GLYPH_CAPACITY,
            font,
            metrics,
            width: size.width,
            height: size.height,
        };
        for c in ' '..='~' {
            painter.cache_glyph(c, false);
        }
        Ok(painter)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
        }
    }

    fn paint(&mut self, canvas: &Canvas, _region: DirtyRegion) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let (rows, cols) = canvas.dimensions();
        let full = DirtyRegion::full(rows, cols);

        self.cache_glyphs_for(canvas, &full);
        if self.atlas.dirty {
            self.upload_atlas();
        }
        let frame = build_instances(canvas, &full, self.metrics, &self.atlas);
        self.ensure_capacity(frame.rects.len(), frame.glyphs.len());

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[Uniforms {
                screen_size: [self.width as f32, self.height as f32],
                _padding: [0.0; 2],
            }]),
        );
        if !frame.rects.is_empty() {
            self.queue
                .write_buffer(&self.rect_buffer, 0, bytemuck::cast_slice(&frame.rects));
        }
        if !frame.glyphs.is_empty() {
            self.queue
                .write_buffer(&self.glyph_buffer, 0, bytemuck::cast_slice(&frame.glyphs));
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for a surface texture");
                return Ok(());
            }
            Err(e) => return Err(Error::init(BACKEND, format!("cannot acquire frame: {}", e))),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let [r, g, b] = canvas.colors.lookup(0).bg.normalized();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("grid"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !frame.rects.is_empty() {
                pass.set_pipeline(&self.rect_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, self.rect_buffer.slice(..));
                pass.draw(0..4, 0..frame.rects.len() as u32);
            }
            if !frame.glyphs.is_empty() {
                pass.set_pipeline(&self.text_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_bind_group(1, &self.atlas_bind_group, &[]);
                pass.set_vertex_buffer(0, self.glyph_buffer.slice(..));
                pass.draw(0..4, 0..frame.glyphs.len() as u32);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn clear_caches(&mut self) {
        self.atlas.clear();
    }
}

impl GpuPainter {
    fn cache_glyph(&mut self, c: char, bold: bool) -> bool {
        let key = (c, bold);
        if self.atlas.contains(&key) {
            return true;
        }
        let glyph = self.font.rasterize(c, bold);
        self.atlas.insert(
            key,
            &glyph.bitmap,
            glyph.width as u32,
            glyph.height as u32,
            glyph.xmin,
            glyph.ymin,
        )
    }

    fn cache_glyphs_for(&mut self, canvas: &Canvas, region: &DirtyRegion) {
        let mut retried = false;
        let mut row = region.start_row;
        while row < region.end_row {
            let mut full = false;
            for col in region.start_col..region.end_col {
                let Some(cell) = canvas.cell(row, col).filter(|c| c.has_glyph()) else {
                    continue;
                };
                if !self.cache_glyph(cell.ch, cell.attrs.contains(TextAttribute::BOLD)) {
                    full = true;
                    break;
                }
            }
            if full {
                if retried {
                    log::warn!("glyph atlas too small for one frame; some glyphs are missing");
                    return;
                }
                // Start over with only this frame's glyphs
                self.atlas.clear();
                retried = true;
                row = region.start_row;
                continue;
            }
            row += 1;
        }
    }

    fn upload_atlas(&mut self) {
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.atlas.data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.atlas.size),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: self.atlas.size,
                height: self.atlas.size,
                depth_or_array_layers: 1,
            },
        );
        self.atlas.dirty = false;
    }

    fn ensure_capacity(&mut self, rects: usize, glyphs: usize) {
        if rects > self.rect_capacity {
            self.rect_capacity = rects.next_power_of_two();
            self.rect_buffer = instance_buffer(
                &self.device,
                "rect instances",
                self.rect_capacity * std::mem::size_of::<RectInstance>(),
            );
        }
        if glyphs > self.glyph_capacity {
            self.glyph_capacity = glyphs.next_power_of_two();
            self.glyph_buffer = instance_buffer(
                &self.device,
                "glyph instances",
                self.glyph_capacity * std::mem::size_of::<GlyphInstance>(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: CellMetrics = CellMetrics {
        width: 8.0,
        height: 16.0,
        baseline: 12.0,
    };

    fn hidden_cursor(canvas: &mut Canvas) {
        canvas.cursor.visible = false;
    }

    #[test]
    fn test_blank_default_cells_skipped() {
        let mut canvas = Canvas::new(4, 10);
        hidden_cursor(&mut canvas);
        let atlas = GlyphAtlas::new(64);
        let frame = build_instances(&canvas, &DirtyRegion::full(4, 10), METRICS, &atlas);
        assert!(frame.rects.is_empty());
        assert!(frame.glyphs.is_empty());
    }

    #[test]
    fn test_non_default_cells_never_skipped() {
        let mut canvas = Canvas::new(2, 10);
        hidden_cursor(&mut canvas);
        // Same colors as pair 0, but a different pair id
        canvas.register_pair(1, (255, 255, 255), (0, 0, 0)).unwrap();
        canvas.draw_text(0, 2, "  ", 1, TextAttribute::NORMAL).unwrap();

        let atlas = GlyphAtlas::new(64);
        let frame = build_instances(&canvas, &DirtyRegion::full(2, 10), METRICS, &atlas);
        assert_eq!(frame.rects.len(), 2);
        assert_eq!(frame.rects[0].pos, [16.0, 0.0]);
        assert_eq!(frame.rects[0].color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_glyph_placement_from_atlas() {
        let mut canvas = Canvas::new(2, 4);
        hidden_cursor(&mut canvas);
        canvas.draw_text(1, 1, "A", 0, TextAttribute::NORMAL).unwrap();

        let mut atlas = GlyphAtlas::new(64);
        assert!(atlas.insert(('A', false), &[255; 6 * 9], 6, 9, 1, 0));
        let frame = build_instances(&canvas, &DirtyRegion::full(2, 4), METRICS, &atlas);

        assert_eq!(frame.rects.len(), 1);
        assert_eq!(frame.glyphs.len(), 1);
        let glyph = frame.glyphs[0];
        assert_eq!(glyph.pos, [9.0, 16.0 + 12.0 - 9.0]);
        assert_eq!(glyph.size, [6.0, 9.0]);
        assert_eq!(glyph.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_cursor_and_underline() {
        let mut canvas = Canvas::new(2, 4);
        canvas.move_cursor(0, 3);
        canvas.draw_text(1, 0, "_", 0, TextAttribute::UNDERLINE).unwrap();

        let atlas = GlyphAtlas::new(64);
        let frame = build_instances(&canvas, &DirtyRegion::full(2, 4), METRICS, &atlas);
        // Cursor block in white, then the underlined cell and its rule
        assert_eq!(frame.rects.len(), 3);
        assert_eq!(frame.rects[0].pos, [24.0, 0.0]);
        assert_eq!(frame.rects[0].color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(frame.rects[2].pos, [0.0, 16.0 + 13.0]);
        assert_eq!(frame.rects[2].size, [8.0, 1.0]);
    }

    #[test]
    fn test_region_limits_instances() {
        let mut canvas = Canvas::new(4, 10);
        hidden_cursor(&mut canvas);
        canvas.register_pair(2, (0, 0, 0), (0, 128, 0)).unwrap();
        canvas.grid.rect(0, 0, 4, 10, 2, true).unwrap();

        let atlas = GlyphAtlas::new(64);
        let region = DirtyRegion::from_cells(1, 1, 2, 3, 4, 10);
        let frame = build_instances(&canvas, &region, METRICS, &atlas);
        assert_eq!(frame.rects.len(), 6);
    }

    #[test]
    fn test_atlas_packs_rows_and_fills_up() {
        let mut atlas = GlyphAtlas::new(16);
        let bitmap = [200u8; 7 * 7];
        assert!(atlas.insert(('a', false), &bitmap, 7, 7, 0, 0));
        assert!(atlas.insert(('b', false), &bitmap, 7, 7, 0, 0));
        // Third glyph wraps to the next row
        assert!(atlas.insert(('c', false), &bitmap, 7, 7, 0, 0));
        assert_eq!(atlas.get(&('c', false)).unwrap().uv[1], 0.5);
        assert!(!atlas.insert(('d', false), &bitmap, 7, 9, 0, 0));

        // Empty glyphs never need space
        assert!(atlas.insert((' ', false), &[], 0, 0, 0, 0));
        assert_eq!(atlas.len(), 4);

        atlas.clear();
        assert!(atlas.is_empty());
        assert!(atlas.insert(('d', false), &bitmap, 7, 7, 0, 0));
    }
}
