//! wgpu implementation of [`GraphicsContext`].
//!
//! Frames are rendered into HDR offscreen targets by [`GraphicsContext::draw`];
//! [`WgpuContext::present`] then tone maps the latest result onto the window
//! surface and overlays the egui interface.

mod gpu_types;
mod pipelines;
mod resources;
mod targets;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use glam::Vec2;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use self::gpu_types::{DisplayUniform, DrawUniform, FrameUniform, PostUniform};
use self::pipelines::{PostPipelines, ResolvePipelines, ScenePipelines, WORKGROUP_SIZE};
use self::resources::{create_float_texture, upload_environment, MapCache, MeshCache};
use self::targets::RenderTargets;
use super::context::{Backend, Capabilities, ContextInfo, FramePass, GraphicsContext, PostProcessParams};
use crate::camera::PerspectiveCamera;
use crate::scene::{DrawItem, Geometry, Material, RenderList, Scene, Shading, Topology};

/// Tessellated egui output for one frame
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplaySource {
    Scene,
    Effects,
    Accumulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawKind {
    Opaque,
    Lines,
    Transparent,
}

impl DrawKind {
    /// Pipeline for a mesh; `None` for shadow catchers, whose received shadows are not rasterized
    fn classify(geometry: &Geometry, material: &Material) -> Option<Self> {
        if material.shading == Shading::ShadowCatcher {
            None
        } else if geometry.topology == Topology::Lines {
            Some(Self::Lines)
        } else if material.transparent || material.opacity < 1.0 {
            Some(Self::Transparent)
        } else {
            Some(Self::Opaque)
        }
    }
}

struct PreparedDraw {
    kind: DrawKind,
    geometry_id: u64,
    map_id: Option<u64>,
    uniform_offset: u32,
}

/// Bind groups that reference the size-dependent targets
struct TargetBindings {
    accumulate: wgpu::BindGroup,
    display_scene: wgpu::BindGroup,
    display_accumulation: wgpu::BindGroup,
    display_effects: Option<wgpu::BindGroup>,
    ao_dof: Option<wgpu::BindGroup>,
    fxaa: Option<wgpu::BindGroup>,
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    info: ContextInfo,
    capabilities: Capabilities,
    targets: RenderTargets,
    bindings: TargetBindings,
    scene_pipelines: ScenePipelines,
    post_pipelines: Option<PostPipelines>,
    resolve_pipelines: ResolvePipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    environment_id: Option<u64>,
    default_environment: wgpu::TextureView,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: usize,
    draw_stride: u64,
    post_buffer: wgpu::Buffer,
    display_buffer: wgpu::Buffer,
    meshes: MeshCache,
    maps: MapCache,
    display_source: DisplaySource,
    egui_renderer: egui_wgpu::Renderer,
}

impl WgpuContext {
    pub async fn new(window: Arc<Window>, backend: Backend) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backend.wgpu_backends(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("Failed to find an adapter for {}", backend.renderer_name()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Scene Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("Failed to create device")?;

        let adapter_info = adapter.get_info();
        let info = ContextInfo {
            backend,
            api: format!("{:?}", adapter_info.backend),
            adapter: adapter_info.name.clone(),
        };

        let mut capabilities = Capabilities::ACCUMULATE;
        let compute = adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        if backend != Backend::Raster && compute {
            capabilities |= Capabilities::POST_PROCESS;
        }

        let surface_config = Self::create_surface_config(&surface, &adapter, size.width, size.height);
        surface.configure(&device, &surface_config);

        let maps = MapCache::new(&device, &queue);
        let scene_pipelines = ScenePipelines::new(&device, maps.layout());
        let post_pipelines = capabilities
            .contains(Capabilities::POST_PROCESS)
            .then(|| PostPipelines::new(&device));
        let resolve_pipelines = ResolvePipelines::new(&device, surface_config.format);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let default_environment = create_float_texture(&device, &queue, 1, 1, &[0.0; 4], "Default Environment")
            .create_view(&wgpu::TextureViewDescriptor::default());
        let frame_bind_group =
            Self::create_frame_bind_group(&device, &scene_pipelines, &frame_buffer, &default_environment);

        let draw_stride = wgpu::util::align_to(
            std::mem::size_of::<DrawUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let draw_capacity = 64;
        let (draw_buffer, draw_bind_group) =
            Self::create_draw_buffer(&device, &scene_pipelines, draw_stride, draw_capacity);

        let post_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Post Process Uniform Buffer"),
            size: std::mem::size_of::<PostUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let display_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Display Uniform Buffer"),
            contents: bytemuck::bytes_of(&DisplayUniform {
                encode_srgb: (!surface_config.format.is_srgb()) as u32,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let targets = RenderTargets::new(
            &device,
            surface_config.width,
            surface_config.height,
            post_pipelines.is_some(),
        );
        let bindings = Self::create_target_bindings(
            &device,
            &targets,
            &resolve_pipelines,
            post_pipelines.as_ref(),
            &post_buffer,
            &display_buffer,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_config.format,
            egui_wgpu::RendererOptions::default(),
        );

        info!(
            "Graphics context ready: {} on {} ({:?})",
            info.label(),
            info.adapter,
            capabilities
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            info,
            capabilities,
            targets,
            bindings,
            scene_pipelines,
            post_pipelines,
            resolve_pipelines,
            frame_buffer,
            frame_bind_group,
            environment_id: None,
            default_environment,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            draw_stride,
            post_buffer,
            display_buffer,
            meshes: MeshCache::default(),
            maps,
            display_source: DisplaySource::Scene,
            egui_renderer,
        })
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    fn create_frame_bind_group(
        device: &wgpu::Device,
        pipelines: &ScenePipelines,
        frame_buffer: &wgpu::Buffer,
        environment: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &pipelines.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(environment),
                },
            ],
        })
    }

    fn create_draw_buffer(
        device: &wgpu::Device,
        pipelines: &ScenePipelines,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &pipelines.draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn create_target_bindings(
        device: &wgpu::Device,
        targets: &RenderTargets,
        resolve: &ResolvePipelines,
        post: Option<&PostPipelines>,
        post_buffer: &wgpu::Buffer,
        display_buffer: &wgpu::Buffer,
    ) -> TargetBindings {
        let display = |source: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Display Bind Group"),
                layout: &resolve.display_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: display_buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let accumulate = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Accumulate Bind Group"),
            layout: &resolve.accumulate_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&targets.scene_color),
            }],
        });

        let (ao_dof, fxaa, display_effects) = match (post, &targets.effects) {
            (Some(post), Some((effect_a, effect_b))) => {
                let ao_dof = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("AO DOF Bind Group"),
                    layout: &post.ao_dof.get_bind_group_layout(0),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: post_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&targets.scene_color),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&targets.depth),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::TextureView(effect_a),
                        },
                    ],
                });
                let fxaa = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("FXAA Bind Group"),
                    layout: &post.fxaa.get_bind_group_layout(0),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: post_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: wgpu::BindingResource::TextureView(effect_a),
                        },
                        wgpu::BindGroupEntry {
                            binding: 5,
                            resource: wgpu::BindingResource::TextureView(effect_b),
                        },
                    ],
                });
                (Some(ao_dof), Some(fxaa), Some(display(effect_b)))
            }
            _ => (None, None, None),
        };

        TargetBindings {
            accumulate,
            display_scene: display(&targets.scene_color),
            display_accumulation: display(&targets.accumulation),
            display_effects,
            ao_dof,
            fxaa,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Uploads the scene environment when it changed since the last frame
    fn sync_environment(&mut self, scene: &Scene) {
        let id = scene.environment.as_ref().map(|texture| texture.id());
        if id == self.environment_id {
            return;
        }
        let view = match &scene.environment {
            Some(texture) => {
                debug!("Uploading {}x{} environment map", texture.width, texture.height);
                upload_environment(&self.device, &self.queue, texture)
                    .create_view(&wgpu::TextureViewDescriptor::default())
            }
            None => self.default_environment.clone(),
        };
        self.frame_bind_group =
            Self::create_frame_bind_group(&self.device, &self.scene_pipelines, &self.frame_buffer, &view);
        self.environment_id = id;
    }

    /// Uploads meshes and maps, writes per-draw uniforms and orders the draws
    fn prepare_draws(&mut self, list: &RenderList, camera: &PerspectiveCamera) -> Vec<PreparedDraw> {
        let mut items: Vec<(DrawKind, &DrawItem)> = list
            .draws
            .iter()
            .filter_map(|item| Some((DrawKind::classify(&item.mesh.geometry, &item.mesh.material)?, item)))
            .collect();

        // Opaque first, then transparent back to front
        let distance = |item: &DrawItem| item.world.w_axis.truncate().distance_squared(camera.position);
        items.sort_by(|(a_kind, a), (b_kind, b)| match (a_kind, b_kind) {
            (DrawKind::Transparent, DrawKind::Transparent) => distance(b).total_cmp(&distance(a)),
            (DrawKind::Transparent, _) => std::cmp::Ordering::Greater,
            (_, DrawKind::Transparent) => std::cmp::Ordering::Less,
            _ => std::cmp::Ordering::Equal,
        });

        if items.len() > self.draw_capacity {
            self.draw_capacity = items.len().next_power_of_two();
            let (buffer, bind_group) =
                Self::create_draw_buffer(&self.device, &self.scene_pipelines, self.draw_stride, self.draw_capacity);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            debug!("Grew draw uniform buffer to {} entries", self.draw_capacity);
        }

        let stride = self.draw_stride as usize;
        let mut uniforms = vec![0u8; stride * items.len()];
        let mut used_meshes = HashSet::new();
        let mut used_maps = HashSet::new();
        let mut prepared = Vec::with_capacity(items.len());

        for (index, (kind, item)) in items.into_iter().enumerate() {
            let geometry = &item.mesh.geometry;
            self.meshes.get_or_upload(&self.device, geometry);
            used_meshes.insert(geometry.id());

            let map_id = item.mesh.material.map.as_ref().map(|map| {
                self.maps.upload(&self.device, &self.queue, map);
                used_maps.insert(map.id());
                map.id()
            });

            let offset = index * stride;
            let uniform = DrawUniform::new(item);
            uniforms[offset..offset + std::mem::size_of::<DrawUniform>()]
                .copy_from_slice(bytemuck::bytes_of(&uniform));

            prepared.push(PreparedDraw {
                kind,
                geometry_id: geometry.id(),
                map_id,
                uniform_offset: offset as u32,
            });
        }

        if !uniforms.is_empty() {
            self.queue.write_buffer(&self.draw_buffer, 0, &uniforms);
        }
        self.meshes.retain(&used_meshes);
        self.maps.retain(&used_maps);
        prepared
    }

    fn encode_scene(&self, encoder: &mut wgpu::CommandEncoder, draws: &[PreparedDraw]) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.scene_color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.scene_pipelines.background);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.draw(0..3, 0..1);

        for draw in draws {
            let Some(mesh) = self.meshes.get(draw.geometry_id) else {
                continue;
            };
            let pipeline = match draw.kind {
                DrawKind::Opaque => &self.scene_pipelines.opaque,
                DrawKind::Lines => &self.scene_pipelines.lines,
                DrawKind::Transparent => &self.scene_pipelines.transparent,
            };
            let map = draw
                .map_id
                .and_then(|id| self.maps.get(id))
                .unwrap_or(self.maps.white());

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_bind_group(1, &self.draw_bind_group, &[draw.uniform_offset]);
            render_pass.set_bind_group(2, map, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    fn encode_post_process(&self, encoder: &mut wgpu::CommandEncoder, params: &PostProcessParams) -> Result<()> {
        let (Some(pipelines), Some(ao_dof), Some(fxaa)) =
            (self.post_pipelines.as_ref(), self.bindings.ao_dof.as_ref(), self.bindings.fxaa.as_ref())
        else {
            bail!("Post-processing is not available on {}", self.info.label());
        };

        let uniform = PostUniform::new(params, self.targets.width, self.targets.height);
        self.queue.write_buffer(&self.post_buffer, 0, bytemuck::bytes_of(&uniform));

        let groups_x = self.targets.width.div_ceil(WORKGROUP_SIZE);
        let groups_y = self.targets.height.div_ceil(WORKGROUP_SIZE);

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Post Process Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&pipelines.ao_dof);
        compute_pass.set_bind_group(0, ao_dof, &[]);
        compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        compute_pass.set_pipeline(&pipelines.fxaa);
        compute_pass.set_bind_group(0, fxaa, &[]);
        compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        Ok(())
    }

    fn encode_accumulate(&self, encoder: &mut wgpu::CommandEncoder, sample_index: u32) {
        let load = if sample_index == 0 {
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
        } else {
            wgpu::LoadOp::Load
        };
        let weight = 1.0 / (sample_index as f64 + 1.0);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Accumulate Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.accumulation,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.resolve_pipelines.accumulate);
        render_pass.set_blend_constant(wgpu::Color {
            r: weight,
            g: weight,
            b: weight,
            a: weight,
        });
        render_pass.set_bind_group(0, &self.bindings.accumulate, &[]);
        render_pass.draw(0..3, 0..1);
    }

    /// Shows the latest frame on the window, with `ui` drawn on top
    pub fn present(&mut self, ui: Option<UiFrame>) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(err) => return Err(err).context("Failed to acquire surface texture"),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Present Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: ui.as_ref().map_or(1.0, |ui| ui.pixels_per_point),
        };
        let mut ui_commands = Vec::new();
        if let Some(ui) = &ui {
            for (id, image_delta) in &ui.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }
            ui_commands = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &ui.primitives,
                &screen_descriptor,
            );
        }

        let source = match self.display_source {
            DisplaySource::Scene => &self.bindings.display_scene,
            DisplaySource::Accumulation => &self.bindings.display_accumulation,
            DisplaySource::Effects => self
                .bindings
                .display_effects
                .as_ref()
                .unwrap_or(&self.bindings.display_scene),
        };

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Display Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            render_pass.set_pipeline(&self.resolve_pipelines.display);
            render_pass.set_bind_group(0, source, &[]);
            render_pass.draw(0..3, 0..1);

            if let Some(ui) = &ui {
                self.egui_renderer
                    .render(&mut render_pass, &ui.primitives, &screen_descriptor);
            }
        }

        if let Some(ui) = &ui {
            for id in &ui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        self.queue
            .submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }
}

impl GraphicsContext for WgpuContext {
    fn info(&self) -> &ContextInfo {
        &self.info
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);

        self.targets = RenderTargets::new(&self.device, width, height, self.post_pipelines.is_some());
        self.bindings = Self::create_target_bindings(
            &self.device,
            &self.targets,
            &self.resolve_pipelines,
            self.post_pipelines.as_ref(),
            &self.post_buffer,
            &self.display_buffer,
        );
        self.display_source = DisplaySource::Scene;
        debug!("Resized render targets to {width}x{height}");
    }

    fn size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera, pass: &FramePass) -> Result<()> {
        match pass {
            FramePass::ShowAccumulated => {
                self.display_source = DisplaySource::Accumulation;
                return Ok(());
            }
            FramePass::PostProcess(_) if !self.capabilities.contains(Capabilities::POST_PROCESS) => {
                bail!("Post-processing is not supported by {}", self.info.label());
            }
            _ => {}
        }

        let viewport = Vec2::new(self.targets.width as f32, self.targets.height as f32);
        let projection = match pass {
            FramePass::Accumulate { jitter, .. } => camera.jittered_projection(*jitter, viewport),
            _ => camera.projection_matrix(),
        };
        let view_proj = projection * camera.view_matrix();

        self.sync_environment(scene);
        let list = scene.render_list();
        let frame = FrameUniform::new(scene, &list, camera, view_proj);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        let draws = self.prepare_draws(&list, camera);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });
        self.encode_scene(&mut encoder, &draws);

        self.display_source = match pass {
            FramePass::PostProcess(params) => {
                self.encode_post_process(&mut encoder, params)?;
                DisplaySource::Effects
            }
            FramePass::Accumulate { sample_index, .. } => {
                self.encode_accumulate(&mut encoder, *sample_index);
                DisplaySource::Accumulation
            }
            FramePass::Direct | FramePass::ShowAccumulated => DisplaySource::Scene,
        };

        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}
