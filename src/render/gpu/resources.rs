use std::collections::{HashMap, HashSet};

use wgpu::util::DeviceExt;

use super::gpu_types::interleave;
use crate::scene::Geometry;
use crate::texture::{TexelData, Texture, TextureWrap};

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Vertex and index buffers keyed by geometry id
#[derive(Default)]
pub struct MeshCache {
    meshes: HashMap<u64, GpuMesh>,
}

impl MeshCache {
    pub fn get_or_upload(&mut self, device: &wgpu::Device, geometry: &Geometry) -> &GpuMesh {
        self.meshes.entry(geometry.id()).or_insert_with(|| {
            let (vertices, indices) = interleave(geometry);
            GpuMesh {
                vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: indices.len() as u32,
            }
        })
    }

    pub fn get(&self, id: u64) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }

    /// Drops buffers of geometries that were not drawn
    pub fn retain(&mut self, used: &HashSet<u64>) {
        self.meshes.retain(|id, _| used.contains(id));
    }
}

/// Material maps as bind groups keyed by texture id
pub struct MapCache {
    layout: wgpu::BindGroupLayout,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    white: wgpu::BindGroup,
    maps: HashMap<u64, wgpu::BindGroup>,
}

impl MapCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Map Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = |address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Material Map Sampler"),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        };
        let repeat_sampler = sampler(wgpu::AddressMode::Repeat);
        let clamp_sampler = sampler(wgpu::AddressMode::ClampToEdge);

        let white_texture = upload_rgba8(device, queue, 1, 1, &[255, 255, 255, 255], "White Map");
        let white = Self::bind(device, &layout, &white_texture, &clamp_sampler);

        Self {
            layout,
            repeat_sampler,
            clamp_sampler,
            white,
            maps: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn white(&self) -> &wgpu::BindGroup {
        &self.white
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture) {
        if self.maps.contains_key(&texture.id()) {
            return;
        }
        let bytes = rgba8_bytes(texture);
        let gpu = upload_rgba8(device, queue, texture.width, texture.height, &bytes, "Material Map");
        let sampler = match texture.wrap {
            TextureWrap::Repeat => &self.repeat_sampler,
            TextureWrap::Clamp => &self.clamp_sampler,
        };
        let bind_group = Self::bind(device, &self.layout, &gpu, sampler);
        self.maps.insert(texture.id(), bind_group);
    }

    pub fn get(&self, id: u64) -> Option<&wgpu::BindGroup> {
        self.maps.get(&id)
    }

    pub fn retain(&mut self, used: &HashSet<u64>) {
        self.maps.retain(|id, _| used.contains(id));
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Map Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

/// Float texels are clamped to [0, 1]; maps are colour data
fn rgba8_bytes(texture: &Texture) -> Vec<u8> {
    match &texture.data {
        TexelData::Rgba8(bytes) => bytes.clone(),
        TexelData::Rgba32F(floats) => floats
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
    }
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    bytes: &[u8],
    label: &str,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
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
        texture.as_image_copy(),
        bytes,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

/// Uploads an environment as an unfilterable float texture read with `textureLoad`
pub fn upload_environment(device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture) -> wgpu::Texture {
    let floats: Vec<f32> = match &texture.data {
        TexelData::Rgba32F(floats) => floats.clone(),
        TexelData::Rgba8(bytes) => bytes.iter().map(|b| *b as f32 / 255.0).collect(),
    };
    create_float_texture(device, queue, texture.width, texture.height, &floats, "Environment Map")
}

pub fn create_float_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    floats: &[f32],
    label: &str,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        bytemuck::cast_slice(floats),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(16 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_maps_are_clamped_to_bytes() {
        let texture = Texture::rgba32f(1, 1, vec![2.0, 0.5, -1.0, 1.0]).unwrap();
        assert_eq!(rgba8_bytes(&texture), vec![255, 128, 0, 255]);
    }
}
