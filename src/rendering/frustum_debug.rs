use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::math::frustum::Frustum;
use crate::rendering::pipeline::{build_with_shader, ShaderDefinition};
use crate::texture::DepthTexture;

const SHADER: ShaderDefinition = ShaderDefinition {
    name: "frustum_lines.wgsl",
    source: include_str!("../../assets/shaders/frustum_lines.wgsl"),
};

/// Edge list over the corner order produced by `Frustum::corners`
/// (near ring LB, RB, LT, RT, then the far ring).
const EDGES: [(usize, usize); 12] = [
    // Near ring
    (0, 1),
    (1, 3),
    (3, 2),
    (2, 0),
    // Far ring
    (4, 5),
    (5, 7),
    (7, 6),
    (6, 4),
    // Connecting edges
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Wireframe of the player camera's frustum, drawn in the god view so the
/// culling volume is visible from outside.
pub struct FrustumDebugRenderer {
    vertex_buffer: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
}

impl FrustumDebugRenderer {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> anyhow::Result<FrustumDebugRenderer> {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frustum line vertex buffer"),
            contents: bytemuck::cast_slice(&[Vec3::ZERO; EDGES.len() * 2]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let pipeline = build_with_shader(device, &SHADER, |device, module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Frustum line pipeline layout"),
                bind_group_layouts: &[camera_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Frustum line pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        }],
                    }],
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
                    topology: wgpu::PrimitiveTopology::LineList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthTexture::DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(FrustumDebugRenderer {
            vertex_buffer,
            pipeline,
        })
    }

    pub fn prepare(&self, queue: &wgpu::Queue, view_projection: Mat4) {
        let corners = Frustum::corners(view_projection);
        let mut lines = [Vec3::ZERO; EDGES.len() * 2];
        for (i, (a, b)) in EDGES.iter().enumerate() {
            lines[2 * i] = corners[*a];
            lines[2 * i + 1] = corners[*b];
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&lines));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..(EDGES.len() as u32 * 2), 0..1);
    }
}
