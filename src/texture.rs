use winit::dpi::PhysicalSize;

pub struct Texture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Loads an albedo texture, falling back to a 1x1 white pixel when the
    /// file is missing or unreadable so the dependent feature can still
    /// render (untextured).
    pub fn from_file_or_fallback(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &str,
        label: &str,
    ) -> Texture {
        match image::open(path) {
            Ok(img) => Self::from_rgba(device, queue, &img.flipv().to_rgba8(), label),
            Err(e) => {
                log::warn!("failed to load texture {path}: {e}");
                let white = image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4]));
                Self::from_rgba(device, queue, &white, label)
            }
        }
    }

    fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
        label: &str,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Texture {
            _texture: texture,
            view,
            sampler,
        }
    }
}

/// RGBA8 2D array texture merged from one image file per layer. Every mesh
/// type's albedo lives in its own layer so one bind group covers all
/// foliage draws.
pub struct TextureArray {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureArray {
    pub const LAYER_EXTENT: u32 = 1024;

    pub fn from_files(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        paths: &[&str],
        label: &str,
    ) -> TextureArray {
        let extent = Self::LAYER_EXTENT as usize;
        let layer_bytes = extent * extent * 4;
        let layers = paths.len().max(1);
        let mut merged = vec![0u8; layer_bytes * layers];

        for (layer, path) in paths.iter().enumerate() {
            let image = match image::open(path) {
                Ok(image) => image.flipv().to_rgba8(),
                Err(e) => {
                    log::warn!("failed to load foliage texture {path}: {e}");
                    continue;
                }
            };

            // Images smaller than the layer land in the corner; larger ones
            // are cropped.
            let copy_width = (image.width() as usize).min(extent);
            let copy_height = (image.height() as usize).min(extent);
            let src_stride = image.width() as usize * 4;
            let src = image.as_raw();
            for y in 0..copy_height {
                let dst_offset = layer * layer_bytes + y * extent * 4;
                let src_offset = y * src_stride;
                merged[dst_offset..dst_offset + copy_width * 4]
                    .copy_from_slice(&src[src_offset..src_offset + copy_width * 4]);
            }
        }

        let size = wgpu::Extent3d {
            width: Self::LAYER_EXTENT,
            height: Self::LAYER_EXTENT,
            depth_or_array_layers: layers as u32,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &merged,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * Self::LAYER_EXTENT),
                rows_per_image: Some(Self::LAYER_EXTENT),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        TextureArray {
            _texture: texture,
            view,
            sampler,
        }
    }
}

pub struct DepthTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
}

impl DepthTexture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, label: impl Into<String>) -> Self {
        let label = label.into();
        let texture = Self::create_wgpu_texture(device, size, &label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        DepthTexture {
            texture,
            view,
            label,
        }
    }

    fn create_wgpu_texture(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        label: &str,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.texture = Self::create_wgpu_texture(device, size, &self.label);
        self.view = self
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
