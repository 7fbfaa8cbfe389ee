use anyhow::bail;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::model::{Model, Vertex, MODEL_VBL};
use crate::rendering::instances::{DrawCommand, InstanceTable, MeshDescriptor, VisibleInstance};
use crate::rendering::pipeline::{build_with_shader, ShaderDefinition};
use crate::samples::SpatialSamples;
use crate::texture::{DepthTexture, TextureArray};

const CULL_SHADER: ShaderDefinition = ShaderDefinition {
    name: "foliage_cull.wgsl",
    source: include_str!("../../assets/shaders/foliage_cull.wgsl"),
};

const RENDER_SHADER: ShaderDefinition = ShaderDefinition {
    name: "foliage.wgsl",
    source: include_str!("../../assets/shaders/foliage.wgsl"),
};

/// One invocation per raw instance, must match foliage_cull.wgsl.
const CULL_WORKGROUP_SIZE: u32 = 256;

/// Mesh sources: OBJ geometry, albedo (one texture array layer each) and the
/// poisson-sampled placement points.
const FOLIAGE_SOURCES: [(&str, &str, &str, &str); 3] = [
    (
        "grassB",
        "assets/models/foliages/grassB.obj",
        "assets/textures/grassB_albedo.png",
        "assets/models/spatialSamples/poissonPoints_155304s.ss2",
    ),
    (
        "bush01",
        "assets/models/foliages/bush01_lod2.obj",
        "assets/textures/bush01.png",
        "assets/models/spatialSamples/poissonPoints_1010s.ss2",
    ),
    (
        "bush05",
        "assets/models/foliages/bush05_lod2.obj",
        "assets/textures/bush05.png",
        "assets/models/spatialSamples/poissonPoints_2797s.ss2",
    ),
];

/// Binding slots of the cull kernel's single bind group. The numbering is a
/// contract with foliage_cull.wgsl.
#[repr(u32)]
#[derive(Debug, Copy, Clone)]
enum CullBinding {
    RawInstances = 0,
    VisibleInstances = 1,
    DrawCommands = 2,
    InstanceState = 3,
    Params = 4,
}

impl CullBinding {
    fn storage(self, read_only: bool) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: self as u32,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    fn uniform(self) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding: self as u32,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    fn entry(self, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
        wgpu::BindGroupEntry {
            binding: self as u32,
            resource: buffer.as_entire_binding(),
        }
    }
}

/// Uniform block of the cull kernel, must match `CullParams` in
/// foliage_cull.wgsl (160 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CullParams {
    view: Mat4,
    proj: Mat4,
    agent_position: Vec3,
    erase_radius: f32,
    total_instances: u32,
    mesh_count: u32,
    _pad: [u32; 2],
}

struct FoliageGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    command_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    command_template: Vec<DrawCommand>,
    cull_pipeline: wgpu::ComputePipeline,
    cull_bind_group: wgpu::BindGroup,
    render_pipeline: wgpu::RenderPipeline,
    material_bind_group: wgpu::BindGroup,
    total_instances: u32,
    mesh_count: u32,
    multi_draw: bool,
}

/// GPU-driven foliage: a compute pass culls the raw instance set into
/// per-mesh compacted slices and draw commands, a render pass then consumes
/// those commands indirectly. The visible set never round-trips to the CPU.
///
/// `gpu` stays `None` when no instances load; every frame hook is then a
/// no-op and the rest of the demo keeps running.
pub struct FoliageRenderer {
    gpu: Option<FoliageGpu>,
}

impl FoliageRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        features: wgpu::Features,
    ) -> anyhow::Result<FoliageRenderer> {
        if !features.contains(wgpu::Features::INDIRECT_FIRST_INSTANCE) {
            bail!("adapter does not support INDIRECT_FIRST_INSTANCE");
        }

        // Concatenate all mesh geometry into one vertex/index buffer pair so
        // the whole foliage pass binds buffers once. A mesh that fails to
        // load keeps its descriptor (with zero indices) so mesh indices stay
        // paired with texture layers and sample sets.
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut meshes = Vec::with_capacity(FOLIAGE_SOURCES.len());
        let mut points_per_mesh = Vec::with_capacity(FOLIAGE_SOURCES.len());

        for (layer, (name, obj_path, _, samples_path)) in FOLIAGE_SOURCES.iter().enumerate() {
            let descriptor = match Model::from_obj(obj_path) {
                Ok(model) => {
                    let descriptor = MeshDescriptor::new(
                        *name,
                        model.indices.len() as u32,
                        indices.len() as u32,
                        vertices.len() as u32,
                        layer as u32,
                    );
                    vertices.extend_from_slice(&model.vertices);
                    indices.extend_from_slice(&model.indices);
                    descriptor
                }
                Err(e) => {
                    log::warn!("failed to load foliage mesh {name}: {e}");
                    MeshDescriptor::new(*name, 0, 0, 0, layer as u32)
                }
            };

            let points = match SpatialSamples::from_file(samples_path) {
                Ok(samples) => samples.into_positions(),
                Err(e) => {
                    log::warn!("failed to load samples for {name}: {e}");
                    Vec::new()
                }
            };

            meshes.push(descriptor);
            points_per_mesh.push(points);
        }

        let table = InstanceTable::build(meshes, &points_per_mesh);
        let total_instances = table.total_instances();

        if total_instances == 0 || indices.is_empty() {
            log::warn!("no foliage instances available, foliage disabled");
            return Ok(FoliageRenderer { gpu: None });
        }

        log::info!(
            "foliage: {} instances across {} meshes",
            total_instances,
            table.meshes.len()
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage vertex buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage index buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let raw_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage raw instances"),
            contents: bytemuck::cast_slice(&table.raw_instances),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let visible_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Foliage visible instances"),
            size: (total_instances as u64) * std::mem::size_of::<VisibleInstance>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let state_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Foliage instance state"),
            size: (total_instances as u64) * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        // Written by the kernel, read by the indirect draw, reset from the
        // CPU template every frame.
        let command_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage draw commands"),
            contents: bytemuck::cast_slice(&table.draw_commands),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST,
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Foliage cull params"),
            size: std::mem::size_of::<CullParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let cull_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Foliage cull bind group layout"),
            entries: &[
                CullBinding::RawInstances.storage(true),
                CullBinding::VisibleInstances.storage(false),
                CullBinding::DrawCommands.storage(false),
                CullBinding::InstanceState.storage(false),
                CullBinding::Params.uniform(),
            ],
        });
        let cull_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Foliage cull bind group"),
            layout: &cull_layout,
            entries: &[
                CullBinding::RawInstances.entry(&raw_buffer),
                CullBinding::VisibleInstances.entry(&visible_buffer),
                CullBinding::DrawCommands.entry(&command_buffer),
                CullBinding::InstanceState.entry(&state_buffer),
                CullBinding::Params.entry(&params_buffer),
            ],
        });

        let cull_pipeline = build_with_shader(device, &CULL_SHADER, |device, module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Foliage cull pipeline layout"),
                bind_group_layouts: &[&cull_layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Foliage cull pipeline"),
                layout: Some(&layout),
                module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;

        let albedo_array = TextureArray::from_files(
            device,
            queue,
            &FOLIAGE_SOURCES.map(|(_, _, texture, _)| texture),
            "Foliage albedo array",
        );

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Foliage material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
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
                        view_dimension: wgpu::TextureViewDimension::D2Array,
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
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Foliage material bind group"),
            layout: &material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: visible_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&albedo_array.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&albedo_array.sampler),
                },
            ],
        });

        let render_pipeline = build_with_shader(device, &RENDER_SHADER, |device, module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Foliage render pipeline layout"),
                bind_group_layouts: &[camera_layout, &material_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Foliage render pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[MODEL_VBL],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    // Foliage cards are visible from both sides.
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthTexture::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let multi_draw = features.contains(wgpu::Features::MULTI_DRAW_INDIRECT);
        if !multi_draw {
            log::info!("MULTI_DRAW_INDIRECT unavailable, drawing foliage one mesh at a time");
        }

        let mesh_count = table.meshes.len() as u32;
        Ok(FoliageRenderer {
            gpu: Some(FoliageGpu {
                vertex_buffer,
                index_buffer,
                command_buffer,
                params_buffer,
                command_template: table.draw_commands,
                cull_pipeline,
                cull_bind_group,
                render_pipeline,
                material_bind_group,
                total_instances,
                mesh_count,
                multi_draw,
            }),
        })
    }

    /// Resets the draw command counters and uploads this frame's cull
    /// parameters. `write_buffer` is ordered before the frame's submission,
    /// so the kernel always starts from zeroed counts.
    pub fn prepare(
        &self,
        queue: &wgpu::Queue,
        camera: &Camera,
        agent_position: Vec3,
        erase_radius: f32,
    ) {
        let Some(gpu) = &self.gpu else { return };

        queue.write_buffer(
            &gpu.command_buffer,
            0,
            bytemuck::cast_slice(&gpu.command_template),
        );

        let params = CullParams {
            view: camera.view_matrix(),
            proj: camera.proj_matrix(),
            agent_position,
            erase_radius,
            total_instances: gpu.total_instances,
            mesh_count: gpu.mesh_count,
            _pad: [0; 2],
        };
        queue.write_buffer(&gpu.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    /// Records the cull pass. Running it in the same encoder as the draw
    /// pass makes wgpu insert the compute-to-indirect barrier.
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder) {
        let Some(gpu) = &self.gpu else { return };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Foliage cull pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&gpu.cull_pipeline);
        pass.set_bind_group(0, &gpu.cull_bind_group, &[]);
        pass.dispatch_workgroups(gpu.total_instances.div_ceil(CULL_WORKGROUP_SIZE), 1, 1);
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        let Some(gpu) = &self.gpu else { return };

        pass.set_pipeline(&gpu.render_pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_bind_group(1, &gpu.material_bind_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        if gpu.multi_draw {
            pass.multi_draw_indexed_indirect(&gpu.command_buffer, 0, gpu.mesh_count);
        } else {
            let stride = std::mem::size_of::<DrawCommand>() as u64;
            for mesh_index in 0..gpu.mesh_count as u64 {
                pass.draw_indexed_indirect(&gpu.command_buffer, mesh_index * stride);
            }
        }
    }
}
