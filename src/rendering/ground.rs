use wgpu::util::DeviceExt;

use crate::model::{Vertex, MODEL_VBL};
use crate::rendering::pipeline::{build_with_shader, ShaderDefinition};
use crate::texture::DepthTexture;

const SHADER: ShaderDefinition = ShaderDefinition {
    name: "ground.wgsl",
    source: include_str!("../../assets/shaders/ground.wgsl"),
};

const HALF_EXTENT: f32 = 256.0;

/// Flat reference plane under the foliage field, shaded with a procedural
/// grid in the fragment shader.
pub struct GroundRenderer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
}

impl GroundRenderer {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> anyhow::Result<GroundRenderer> {
        let vertices = [
            [-HALF_EXTENT, 0.0, -HALF_EXTENT],
            [HALF_EXTENT, 0.0, -HALF_EXTENT],
            [HALF_EXTENT, 0.0, HALF_EXTENT],
            [-HALF_EXTENT, 0.0, HALF_EXTENT],
        ]
        .map(|position| Vertex {
            position: position.into(),
            normal: glam::Vec3::Y,
            uv: glam::Vec2::ZERO,
        });
        let indices: [u32; 6] = [0, 2, 1, 0, 3, 2];

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ground vertex buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ground index buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline = build_with_shader(device, &SHADER, |device, module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Ground pipeline layout"),
                bind_group_layouts: &[camera_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Ground pipeline"),
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
                    cull_mode: Some(wgpu::Face::Back),
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

        Ok(GroundRenderer {
            vertex_buffer,
            index_buffer,
            pipeline,
        })
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..6, 0, 0..1);
    }
}
