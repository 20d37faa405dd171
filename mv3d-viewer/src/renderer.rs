/// WGPU frame renderer: pipeline setup, mesh buffer ownership, and
/// material-group-batched draw submission
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use nalgebra::Matrix4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use mv3d_core::{perspective_matrix, MeshData, OrbitCamera};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dark blue background, matching a typical studio viewer
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.051,
    g: 0.071,
    b: 0.149,
    a: 1.0,
};

// Fixed single point light in view space
const LIGHT_POSITION: [f32; 3] = [5.0, 5.0, 5.0];
const LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const LIGHT_INTENSITY: f32 = 1.0;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x3];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![1 => Float32x3];

/// Backbuffer dimensions derived from the window, with the device pixel
/// ratio capped at 2x to bound backbuffer cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceExtent {
    pub width: u32,
    pub height: u32,
}

impl SurfaceExtent {
    pub fn from_window(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        let dpr = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        let capped = dpr.min(2.0);
        let width = ((physical_width as f64 / dpr) * capped).floor().max(1.0) as u32;
        let height = ((physical_height as f64 / dpr) * capped).floor().max(1.0) as u32;
        Self { width, height }
    }

    /// Store `new` if it differs. Returns whether anything changed, so the
    /// caller can skip redundant surface/projection updates.
    pub fn update(&mut self, new: SurfaceExtent) -> bool {
        if *self == new {
            return false;
        }
        *self = new;
        true
    }
}

/// Per-frame uniform block; layout mirrors `FrameUniforms` in shader.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    light_position: [f32; 3],
    light_intensity: f32,
    light_color: [f32; 3],
    _padding: f32,
}

/// Per-material uniform block; layout mirrors `MaterialUniforms` in
/// shader.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniforms {
    ambient: [f32; 3],
    shininess: f32,
    diffuse: [f32; 3],
    opacity: f32,
    specular: [f32; 3],
    _padding: f32,
}

struct DrawGroup {
    bind_group: wgpu::BindGroup,
    start_index: u32,
    index_count: u32,
}

/// GPU-side buffers for the active mesh. Replaced wholesale on every
/// successful load; the previous generation's buffers drop here.
struct GpuMesh {
    position_buffer: wgpu::Buffer,
    normal_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    groups: Vec<DrawGroup>,
    generation: u64,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    extent: SurfaceExtent,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    projection: Matrix4<f32>,
    mesh: Option<GpuMesh>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let extent = SurfaceExtent::from_window(size.width, size.height, window.scale_factor());

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter found"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mv3d device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .context("failed to acquire GPU device")?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width,
            height: extent.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, extent);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mv3d shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let frame_layout = uniform_layout(&device, "frame uniforms layout", wgpu::ShaderStages::VERTEX_FRAGMENT);
        let material_layout = uniform_layout(&device, "material uniforms layout", wgpu::ShaderStages::FRAGMENT);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame uniforms bind group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mv3d pipeline layout"),
            bind_group_layouts: &[&frame_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mv3d pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &POSITION_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &NORMAL_ATTRIBUTES,
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        info!(
            "renderer initialized: {}x{} backbuffer, {:?} surface",
            extent.width, extent.height, format
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            extent,
            depth_view,
            pipeline,
            frame_buffer,
            frame_bind_group,
            material_layout,
            projection: perspective_matrix(extent.width, extent.height),
            mesh: None,
        })
    }

    /// Reconfigure the surface, depth buffer, and projection, but only when
    /// the capped-DPR backbuffer size actually changed.
    pub fn resize(&mut self, physical_width: u32, physical_height: u32, scale_factor: f64) {
        if physical_width == 0 || physical_height == 0 {
            return;
        }
        let new = SurfaceExtent::from_window(physical_width, physical_height, scale_factor);
        if !self.extent.update(new) {
            return;
        }

        debug!("backbuffer resized to {}x{}", new.width, new.height);
        self.config.width = new.width;
        self.config.height = new.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, new);
        self.projection = perspective_matrix(new.width, new.height);
    }

    /// Upload a freshly assembled mesh, replacing the previous one.
    pub fn upload_mesh(&mut self, mesh: &MeshData, generation: u64) {
        if mesh.indices.is_empty() {
            warn!("mesh generation {generation} has no triangles, nothing to display");
            self.mesh = None;
            return;
        }

        let position_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh positions"),
                contents: bytemuck::cast_slice(&mesh.positions),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let normal_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh normals"),
                contents: bytemuck::cast_slice(&mesh.normals),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let groups = mesh
            .material_groups
            .iter()
            .map(|(name, group)| {
                let material = mesh.material_or_default(name);
                let uniforms = MaterialUniforms {
                    ambient: material.ambient,
                    shininess: material.shininess,
                    diffuse: material.diffuse,
                    opacity: material.opacity,
                    specular: material.specular,
                    _padding: 0.0,
                };
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("material uniforms: {name}")),
                        contents: bytemuck::bytes_of(&uniforms),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("material bind group: {name}")),
                    layout: &self.material_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                DrawGroup {
                    bind_group,
                    start_index: group.start_index,
                    index_count: group.index_count,
                }
            })
            .collect();

        // The previous generation's buffers are released here
        self.mesh = Some(GpuMesh {
            position_buffer,
            normal_buffer,
            index_buffer,
            groups,
            generation,
        });
        debug!(
            "uploaded mesh generation {generation}: {} triangles",
            mesh.triangle_count()
        );
    }

    pub fn mesh_generation(&self) -> Option<u64> {
        self.mesh.as_ref().map(|mesh| mesh.generation)
    }

    /// Render one frame with the camera's current view transform.
    pub fn render(&mut self, camera: &OrbitCamera) -> Result<(), wgpu::SurfaceError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(err) => return Err(err),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let model_view = camera.view_matrix();
        // Normals need the inverse-transpose; they do not transform like
        // positions under general affine transforms
        let normal_matrix = model_view
            .try_inverse()
            .unwrap_or_else(Matrix4::identity)
            .transpose();

        let uniforms = FrameUniforms {
            model_view: model_view.into(),
            projection: self.projection.into(),
            normal_matrix: normal_matrix.into(),
            light_position: LIGHT_POSITION,
            light_intensity: LIGHT_INTENSITY,
            light_color: LIGHT_COLOR,
            _padding: 0.0,
        };
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mv3d frame"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mv3d pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(mesh) = &self.mesh {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.position_buffer.slice(..));
                pass.set_vertex_buffer(1, mesh.normal_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

                for group in &mesh.groups {
                    if group.index_count == 0 {
                        continue;
                    }
                    pass.set_bind_group(1, &group.bind_group, &[]);
                    pass.draw_indexed(
                        group.start_index..group.start_index + group.index_count,
                        0,
                        0..1,
                    );
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_depth_view(device: &wgpu::Device, extent: SurfaceExtent) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth buffer"),
        size: wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
