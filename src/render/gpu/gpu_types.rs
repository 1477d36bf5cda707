use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::camera::PerspectiveCamera;
use crate::render::context::PostProcessParams;
use crate::scene::{Background, DrawItem, Geometry, LightKind, RenderList, Scene, Shading};

pub const MAX_LIGHTS: usize = 8;

pub const LIGHT_DIRECTIONAL: f32 = 0.0;
pub const LIGHT_RECT_AREA: f32 = 1.0;

pub const SHADING_UNLIT: u32 = 0;
pub const SHADING_LIT: u32 = 1;

/// Interleaved vertex layout shared by every scene pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl GpuVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleaves a geometry; missing attributes get neutral defaults
pub fn interleave(geometry: &Geometry) -> (Vec<GpuVertex>, Vec<u32>) {
    let vertices = geometry
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| GpuVertex {
            position: position.to_array(),
            normal: geometry.normals.get(i).copied().unwrap_or(Vec3::ZERO).to_array(),
            uv: geometry.uvs.get(i).map(|uv| uv.to_array()).unwrap_or([0.0, 0.0]),
            color: geometry.colors.get(i).copied().unwrap_or(Vec3::ONE).to_array(),
        })
        .collect();
    let indices = if geometry.indices.is_empty() {
        (0..geometry.positions.len() as u32).collect()
    } else {
        geometry.indices.clone()
    };
    (vertices, indices)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz position, w light kind
    pub position: [f32; 4],
    /// xyz unit direction the light travels, w emitter area
    pub direction: [f32; 4],
    /// rgb radiance
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
    /// rgb colour, w = 1 to show the environment instead
    pub background: [f32; 4],
    /// rgb mean environment radiance, w = 1 when an environment is bound
    pub environment: [f32; 4],
    pub light_count: [u32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl FrameUniform {
    pub fn new(scene: &Scene, list: &RenderList, camera: &PerspectiveCamera, view_proj: Mat4) -> Self {
        let mut sky = Vec3::ZERO;
        let mut ground = Vec3::ZERO;
        let mut lights = [GpuLight::default(); MAX_LIGHTS];
        let mut count = 0;

        for item in &list.lights {
            let radiance = item.light.color * item.light.intensity;
            let direction = item.light.direction_from(item.position).unwrap_or(Vec3::NEG_Y);
            let (kind, area) = match &item.light.kind {
                LightKind::Ambient => {
                    sky += radiance;
                    ground += radiance;
                    continue;
                }
                LightKind::Hemisphere { ground_color } => {
                    sky += radiance;
                    ground += *ground_color * item.light.intensity;
                    continue;
                }
                LightKind::Directional { .. } => (LIGHT_DIRECTIONAL, 0.0),
                LightKind::RectArea { width, height, .. } => (LIGHT_RECT_AREA, width * height),
            };
            if count == MAX_LIGHTS {
                log::warn!("Dropping light beyond the first {MAX_LIGHTS}");
                continue;
            }
            lights[count] = GpuLight {
                position: item.position.extend(kind).to_array(),
                direction: direction.extend(area).to_array(),
                color: radiance.extend(1.0).to_array(),
            };
            count += 1;
        }

        let background = match &scene.background {
            Background::Color(color) => color.extend(0.0),
            Background::Environment if scene.environment.is_some() => Vec3::ZERO.extend(1.0),
            Background::Environment => Vec3::ONE.extend(0.0),
        };
        let environment = scene
            .environment
            .as_ref()
            .map(|texture| texture.average_color().extend(1.0))
            .unwrap_or(glam::Vec4::ZERO);

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            sky_color: sky.extend(1.0).to_array(),
            ground_color: ground.extend(1.0).to_array(),
            background: background.to_array(),
            environment: environment.to_array(),
            light_count: [count as u32, 0, 0, 0],
            lights,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb base colour, a opacity
    pub color: [f32; 4],
    /// metalness, roughness, reflectivity, env map intensity
    pub material: [f32; 4],
    /// shading, vertex colours, has map, unused
    pub flags: [u32; 4],
}

impl DrawUniform {
    pub fn new(item: &DrawItem) -> Self {
        let material = &item.mesh.material;
        let shading = match material.shading {
            Shading::Unlit => SHADING_UNLIT,
            Shading::Standard | Shading::Physical | Shading::ShadowCatcher => SHADING_LIT,
        };
        Self {
            model: item.world.to_cols_array_2d(),
            normal_matrix: item.world.inverse().transpose().to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            material: [
                material.metalness,
                material.roughness,
                material.reflectivity,
                material.env_map_intensity,
            ],
            flags: [
                shading,
                material.vertex_colors as u32,
                material.map.is_some() as u32,
                0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PostUniform {
    /// radius, intensity, distance exponent, thickness
    pub ao: [f32; 4],
    /// focus distance, aperture, near, far
    pub dof: [f32; 4],
    /// pass bits, width, height, unused
    pub flags: [u32; 4],
}

impl PostUniform {
    pub fn new(params: &PostProcessParams, width: u32, height: u32) -> Self {
        Self {
            ao: [
                params.ao_radius,
                params.ao_intensity,
                params.ao_distance_exponent,
                params.ao_thickness,
            ],
            dof: [params.dof_focus_distance, params.dof_aperture, params.near, params.far],
            flags: [params.passes.bits(), width, height, 0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DisplayUniform {
    /// 1 when the surface is not sRGB and the shader must encode
    pub encode_srgb: u32,
    pub _pad: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use crate::scene::{Light, Material, Node, Topology};
    use std::rc::Rc;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 44);
        assert_eq!(std::mem::size_of::<GpuLight>(), 48);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 64 * 2 + 16 * 6 + 48 * MAX_LIGHTS);
        assert_eq!(std::mem::size_of::<DrawUniform>(), 176);
    }

    #[test]
    fn non_indexed_geometry_gets_sequential_indices() {
        let geometry = Geometry::new(Topology::Lines, vec![Vec3::ZERO, Vec3::X]);
        let (vertices, indices) = interleave(&geometry);
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(vertices[1].color, [1.0, 1.0, 1.0]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn ambient_and_hemisphere_fold_into_sky_and_ground() {
        let mut scene = Scene::new();
        scene.add(Node::light(Light::ambient(Vec3::ONE, 0.5)).into_ref());
        scene.add(Node::light(Light::hemisphere(Vec3::ZERO, Vec3::ONE, 0.5)).into_ref());
        scene.add(
            Node::light(Light::directional(Vec3::ONE, 1.0))
                .with_position(Vec3::new(0.0, 10.0, 0.0))
                .into_ref(),
        );
        let camera = PerspectiveCamera::new(&CameraSettings::default(), 1.0);
        let list = scene.render_list();
        let frame = FrameUniform::new(&scene, &list, &camera, camera.view_projection());

        assert_eq!(frame.sky_color[..3], [0.5, 0.5, 0.5]);
        assert_eq!(frame.ground_color[..3], [1.0, 1.0, 1.0]);
        assert_eq!(frame.light_count[0], 1);
        assert_eq!(frame.lights[0].direction[..3], [0.0, -1.0, 0.0]);
    }

    #[test]
    fn draw_uniform_carries_material_flags() {
        let material = Material::unlit(Vec3::ONE).with_vertex_colors();
        let mut scene = Scene::new();
        scene.add(
            Node::mesh(
                Rc::new(Geometry::axes(1.0)),
                Rc::new(material),
            )
            .into_ref(),
        );
        let list = scene.render_list();
        let uniform = DrawUniform::new(&list.draws[0]);
        assert_eq!(uniform.flags, [SHADING_UNLIT, 1, 0, 0]);
    }
}
