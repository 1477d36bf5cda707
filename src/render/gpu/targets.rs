pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen attachments, recreated on every resize
pub struct RenderTargets {
    pub width: u32,
    pub height: u32,
    pub scene_color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    pub accumulation: wgpu::TextureView,
    /// Ping-pong storage images, only allocated when post-processing is supported
    pub effects: Option<(wgpu::TextureView, wgpu::TextureView)>,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, with_effects: bool) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let attachment = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let storage = wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING;

        let effects = with_effects.then(|| {
            (
                create_view(device, "Effect Target A", width, height, COLOR_FORMAT, storage),
                create_view(device, "Effect Target B", width, height, COLOR_FORMAT, storage),
            )
        });

        Self {
            width,
            height,
            scene_color: create_view(device, "Scene Color", width, height, COLOR_FORMAT, attachment),
            depth: create_view(device, "Scene Depth", width, height, DEPTH_FORMAT, attachment),
            accumulation: create_view(device, "Accumulation", width, height, COLOR_FORMAT, attachment),
            effects,
        }
    }
}

fn create_view(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
