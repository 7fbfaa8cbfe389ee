use anyhow::Context;
use pollster::block_on;
use wgpu::PollType;

/// A WGSL shader embedded in the binary.
#[derive(Debug, Clone, Copy)]
pub struct ShaderDefinition {
    pub name: &'static str,
    pub source: &'static str,
}

/// Compiles `def` and runs `factory` under a validation error scope, so a
/// broken shader or pipeline surfaces as an `Err` the caller can use to
/// disable the dependent feature instead of panicking inside wgpu.
pub fn build_with_shader<T>(
    device: &wgpu::Device,
    def: &ShaderDefinition,
    factory: impl FnOnce(&wgpu::Device, &wgpu::ShaderModule) -> T,
) -> anyhow::Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(def.name),
        source: wgpu::ShaderSource::Wgsl(def.source.into()),
    });

    let result = factory(device, &module);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation")?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(anyhow::anyhow!(
            "shader build failed for {}: {}",
            def.name,
            error
        ));
    }

    Ok(result)
}
