use std::sync::Arc;

use anyhow::Context;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::camera::CameraBinding;
use crate::demo::DemoState;
use crate::rendering::foliage::FoliageRenderer;
use crate::rendering::frustum_debug::FrustumDebugRenderer;
use crate::rendering::ground::GroundRenderer;
use crate::rendering::slime::SlimeRenderer;
use crate::texture::DepthTexture;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.07,
    b: 0.1,
    a: 1.0,
};

/// Logs the failure and disables the feature for the rest of the session.
fn feature_or_disable<T>(name: &str, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(feature) => Some(feature),
        Err(e) => {
            log::warn!("{name} disabled: {e:#}");
            None
        }
    }
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,

    depth_texture: DepthTexture,
    god_camera: CameraBinding,
    player_camera: CameraBinding,

    foliage: Option<FoliageRenderer>,
    slime: Option<SlimeRenderer>,
    ground: Option<GroundRenderer>,
    frustum_debug: Option<FrustumDebugRenderer>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible adapter")?;

        // Take the indirect-draw features when the adapter has them; the
        // foliage stage degrades (or disables itself) when they're missing.
        let required_features = adapter.features()
            & (wgpu::Features::MULTI_DRAW_INDIRECT | wgpu::Features::INDIRECT_FIRST_INSTANCE);
        log::info!("indirect draw features: {required_features:?}");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features,
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let mut config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .context("Surface is incompatible with the adapter")?;
        config.present_mode = wgpu::PresentMode::AutoVsync;
        surface.configure(&device, &config);

        let depth_texture = DepthTexture::new(&device, size, "Depth texture");

        let camera_layout = CameraBinding::layout(&device);
        let god_camera = CameraBinding::new(&device, &camera_layout, "God camera");
        let player_camera = CameraBinding::new(&device, &camera_layout, "Player camera");

        let foliage = feature_or_disable(
            "foliage",
            FoliageRenderer::new(
                &device,
                &queue,
                &camera_layout,
                config.format,
                required_features,
            ),
        );
        let slime = feature_or_disable(
            "slime",
            SlimeRenderer::new(&device, &queue, &camera_layout, config.format),
        );
        let ground = feature_or_disable(
            "ground",
            GroundRenderer::new(&device, &camera_layout, config.format),
        );
        let frustum_debug = feature_or_disable(
            "frustum wireframe",
            FrustumDebugRenderer::new(&device, &camera_layout, config.format),
        );

        Ok(Renderer {
            window,
            size,
            surface,
            config,
            device,
            queue,
            depth_texture,
            god_camera,
            player_camera,
            foliage,
            slime,
            ground,
            frustum_debug,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture.resize(&self.device, new_size);
        }
    }

    /// Records and submits one frame: the cull pass runs once against the
    /// player camera, then both viewports draw the resulting visible set.
    pub fn render(&mut self, demo: &DemoState) -> Result<(), wgpu::SurfaceError> {
        self.god_camera.update(&self.queue, &demo.god_camera);
        self.player_camera.update(&self.queue, &demo.player_camera);

        if let Some(foliage) = &self.foliage {
            foliage.prepare(
                &self.queue,
                &demo.player_camera,
                demo.agent_position(),
                demo.erase_radius(),
            );
        }
        if let Some(slime) = &self.slime {
            slime.prepare(&self.queue, demo.agent_position());
        }
        if let Some(frustum_debug) = &self.frustum_debug {
            frustum_debug.prepare(&self.queue, demo.player_camera.view_proj());
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame encoder"),
            });

        if let Some(foliage) = &self.foliage {
            foliage.dispatch(&mut encoder);
        }

        let width = self.config.width as f32;
        let half_height = (self.config.height / 2).max(1) as f32;

        // God view, top half. Clears the whole frame.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("God view pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(0.0, 0.0, width, half_height, 0.0, 1.0);
            self.draw_scene(&mut pass, &self.god_camera, true);
        }

        // Player view, bottom half. Keeps the god view's color output.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Player view pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.depth_texture.view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(0.0, half_height, width, half_height, 0.0, 1.0);
            self.draw_scene(&mut pass, &self.player_camera, false);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }

    fn draw_scene(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &CameraBinding,
        with_frustum: bool,
    ) {
        if let Some(ground) = &self.ground {
            ground.draw(pass, &camera.bind_group);
        }
        if let Some(slime) = &self.slime {
            slime.draw(pass, &camera.bind_group);
        }
        if let Some(foliage) = &self.foliage {
            foliage.draw(pass, &camera.bind_group);
        }
        if with_frustum {
            if let Some(frustum_debug) = &self.frustum_debug {
                frustum_debug.draw(pass, &camera.bind_group);
            }
        }
    }
}
