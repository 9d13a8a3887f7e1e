// renderer.rs — 核心渲染器：网格管线 + 天空盒 (Ray Casting) + egui

use std::collections::HashMap;

use glam::Mat4;
use image::RgbaImage;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::Camera;
use crate::config::{FloorConfig, LightConfig, Rgb};
use crate::error::{Result, ViewerError};
use crate::loader::SkyboxImages;
use crate::mesh::{self, MeshData, Vertex};
use crate::scene::Renderable;
use crate::viewer::ViewerContext;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light: [f32; 4], // x=ambient, y=directional
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    color: [f32; 4],
    flags: [f32; 4], // x=use texture
}

impl ObjectUniform {
    fn new(world: Mat4, color: [f32; 4], textured: bool) -> Self {
        // 法线矩阵：逆转置；不可逆时直接用原矩阵
        let inverse = world.inverse();
        let normal = if inverse.is_finite() { inverse.transpose() } else { world };
        Self {
            model: world.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            color,
            flags: [if textured { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }

    fn from_renderable(world: Mat4, renderable: &Renderable) -> Self {
        let material = &renderable.material;
        Self::new(world, material.base_color, material.screen_texture)
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuModel {
    /// One slot per renderable so uniforms stay aligned with `ModelGroup::renderables`.
    meshes: Vec<Option<GpuMesh>>,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    depth_view: wgpu::TextureView,

    mesh_pipeline: wgpu::RenderPipeline,
    skybox_pipeline: wgpu::RenderPipeline,

    // Uniform 资源
    globals: Globals,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    // 纹理资源
    object_layout: wgpu::BindGroupLayout,
    sky_layout: wgpu::BindGroupLayout,
    sky_bind_group: Option<wgpu::BindGroup>,
    sampler: wgpu::Sampler,
    white_view: wgpu::TextureView,
    screen_views: HashMap<String, wgpu::TextureView>,

    models: Vec<GpuModel>,
    floor: Option<GpuMesh>,
    clear_color: wgpu::Color,
    uploaded_revision: Option<u64>,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(
        window: std::sync::Arc<Window>,
        background: Rgb,
        light: &LightConfig,
        floor: Option<&FloorConfig>,
    ) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .map_err(|e| ViewerError::Gpu(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ViewerError::Gpu("no compatible adapter".to_owned()))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| ViewerError::Gpu(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| ViewerError::Gpu("surface reports no formats".to_owned()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync on
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        // --- 1. Globals ---
        let globals = Globals {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            inv_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: light.direction_from.normalize_or_zero().extend(0.0).to_array(),
            light: [light.ambient, light.directional, 0.0, 0.0],
        };
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[globals]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
            label: Some("globals_bind_group_layout"),
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });

        // --- 2. Per-object + texture ---
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                sampler_entry(2),
            ],
            label: Some("object_bind_group_layout"),
        });
        let sky_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::Cube),
                sampler_entry(1),
            ],
            label: Some("sky_bind_group_layout"),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let white_view = create_rgba_texture(
            &device,
            &queue,
            &RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])),
            "white_texture",
        );

        // --- 3. Pipelines ---
        let mesh_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/mesh.wgsl"));
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // glTF 模型可能是双面材质
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let sky_shader = device.create_shader_module(wgpu::include_wgsl!("shaders/skybox.wgsl"));
        let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &sky_layout],
            push_constant_ranges: &[],
        });
        let skybox_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&sky_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sky_shader,
                entry_point: "vs_main",
                buffers: &[], // 无顶点缓冲，Shader 自生成
            },
            fragment: Some(wgpu::FragmentState {
                module: &sky_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // 天空盒在最远处，不写深度
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        // --- 4. Egui Setup ---
        let egui_ctx = egui::Context::default();
        let mut egui_state = egui_winit::State::new(window.as_ref());
        // 高分屏：显式设置 pixels_per_point
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        let [r, g, b] = background.to_linear();
        let mut renderer = Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_view,
            mesh_pipeline,
            skybox_pipeline,
            globals,
            globals_buffer,
            globals_bind_group,
            object_layout,
            sky_layout,
            sky_bind_group: None,
            sampler,
            white_view,
            screen_views: HashMap::new(),
            models: Vec::new(),
            floor: None,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            uploaded_revision: None,
            egui_ctx,
            egui_state,
            egui_renderer,
        };

        if let Some(floor) = floor {
            let [r, g, b] = floor.color.to_linear();
            let uniform = ObjectUniform::new(Mat4::IDENTITY, [r, g, b, 1.0], false);
            renderer.floor =
                renderer.create_mesh(&mesh::build_plane(floor.size), uniform, &renderer.white_view, "floor");
        }

        Ok(renderer)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    pub fn update_camera(&mut self, camera: &Camera) {
        let view_proj = camera.build_matrix();
        self.globals.view_proj = view_proj.to_cols_array_2d();
        self.globals.inv_view_proj = view_proj.inverse().to_cols_array_2d();
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[self.globals]));
    }

    /// Uploads geometry when the scene revision changed, then refreshes per-object uniforms.
    pub fn sync_scene(&mut self, ctx: &ViewerContext) {
        if self.uploaded_revision != Some(ctx.scene_revision()) {
            self.upload_models(ctx);
            self.uploaded_revision = Some(ctx.scene_revision());
        }

        for (model, gpu) in ctx.ready_models().zip(&self.models) {
            for ((world, renderable), mesh) in model.renderables().into_iter().zip(&gpu.meshes) {
                let Some(mesh) = mesh else { continue };
                let uniform = ObjectUniform::from_renderable(world, renderable);
                self.queue
                    .write_buffer(&mesh.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
            }
        }
    }

    fn upload_models(&mut self, ctx: &ViewerContext) {
        let mut models = Vec::new();
        for model in ctx.ready_models() {
            let texture = self
                .screen_views
                .get(&model.product)
                .unwrap_or(&self.white_view);
            let meshes = model
                .renderables()
                .into_iter()
                .map(|(world, renderable)| {
                    self.create_mesh(
                        &renderable.mesh,
                        ObjectUniform::from_renderable(world, renderable),
                        texture,
                        &model.product,
                    )
                })
                .collect();
            models.push(GpuModel { meshes });
        }
        log::debug!("uploaded {} models to GPU", models.len());
        self.models = models;
    }

    fn create_mesh(
        &self,
        data: &MeshData,
        uniform: ObjectUniform,
        texture: &wgpu::TextureView,
        label: &str,
    ) -> Option<GpuMesh> {
        if data.positions.is_empty() || data.indices.is_empty() {
            log::debug!("{label}: skipping empty mesh");
            return None;
        }
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.object_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some(label),
        });
        Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
            uniform_buffer,
            bind_group,
        })
    }

    pub fn set_screen_texture(&mut self, product: &str, img: &RgbaImage) {
        let view = create_rgba_texture(&self.device, &self.queue, img, "screen_texture");
        self.screen_views.insert(product.to_owned(), view);
        // 绑定组需要重建
        self.uploaded_revision = None;
    }

    pub fn load_skybox(&mut self, sky: &SkyboxImages) {
        let size = sky.size.min(self.device.limits().max_texture_dimension_2d);
        let mut data = Vec::with_capacity(cube_upload_len(size));
        for face in &sky.faces {
            if face.dimensions() == (size, size) {
                data.extend_from_slice(face.as_raw());
            } else {
                // 超过 GPU 限制，缩小
                let scaled =
                    image::imageops::resize(face, size, size, image::imageops::FilterType::Lanczos3);
                data.extend_from_slice(scaled.as_raw());
            }
        }

        let texture_size = wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            size: texture_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some("skybox_texture"),
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * size),
                rows_per_image: Some(size),
            },
            texture_size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        self.sky_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.sky_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("sky_bind_group"),
        }));
        log::info!("skybox uploaded ({size}x{size})");
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // 1. Render Scene
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: true,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            if let Some(sky) = &self.sky_bind_group {
                render_pass.set_pipeline(&self.skybox_pipeline);
                render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
                render_pass.set_bind_group(1, sky, &[]);
                render_pass.draw(0..3, 0..1);
            }

            render_pass.set_pipeline(&self.mesh_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            let meshes = self
                .floor
                .iter()
                .chain(self.models.iter().flat_map(|m| m.meshes.iter().flatten()));
            for mesh in meshes {
                render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        // 2. Render UI
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
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

fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    img: &RgbaImage,
    label: &str,
) -> wgpu::TextureView {
    // 如果图片超过 GPU 限制，则缩放到限制内
    let max = device.limits().max_texture_dimension_2d;
    let (src_w, src_h) = img.dimensions();
    let scaled;
    let img = if src_w > max || src_h > max {
        let scale = max as f32 / src_w.max(src_h) as f32;
        let new_w = ((src_w as f32 * scale) as u32).max(1);
        let new_h = ((src_h as f32 * scale) as u32).max(1);
        log::warn!("{label}: {src_w}x{src_h} exceeds GPU limit {max}, scaled to {new_w}x{new_h}");
        scaled = image::imageops::resize(img, new_w, new_h, image::imageops::FilterType::Lanczos3);
        &scaled
    } else {
        img
    };

    let (width, height) = img.dimensions();
    let texture_size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size: texture_size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some(label),
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        img,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        texture_size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Bytes of RGBA8 data for six square faces; computed in `usize` so large faces can't wrap.
fn cube_upload_len(size: u32) -> usize {
    let size = size as usize;
    size * size * 4 * 6
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn object_uniform_normal_matrix_undoes_scale() {
        let world = Mat4::from_scale(Vec3::new(2.0, 2.0, 2.0));
        let u = ObjectUniform::new(world, [1.0, 0.0, 0.0, 1.0], true);
        let normal = Mat4::from_cols_array_2d(&u.normal);
        let n = normal.transform_vector3(Vec3::Y);
        assert!((n - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(u.flags[0], 1.0);
    }

    #[test]
    fn degenerate_world_matrix_is_tolerated() {
        let u = ObjectUniform::new(Mat4::from_scale(Vec3::ZERO), [1.0; 4], false);
        assert!(Mat4::from_cols_array_2d(&u.normal).is_finite());
    }

    #[test]
    fn tiny_uniform_scale_keeps_inverse_transpose() {
        let world = Mat4::from_scale(Vec3::splat(0.001));
        let u = ObjectUniform::new(world, [1.0; 4], false);
        let n = Mat4::from_cols_array_2d(&u.normal).transform_vector3(Vec3::Y);
        assert!((n - Vec3::new(0.0, 1000.0, 0.0)).length() < 1e-2);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn cube_upload_len_does_not_wrap() {
        assert_eq!(cube_upload_len(2), 96);
        assert_eq!(cube_upload_len(16384), 16384 * 16384 * 4 * 6usize);
    }

    #[test]
    fn uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<Globals>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
    }
}
