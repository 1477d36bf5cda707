use std::rc::Rc;

use glam::Vec3;

use crate::texture::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Flat colour, no lighting (helpers)
    Unlit,
    Standard,
    Physical,
    /// Invisible except where shadowed
    ShadowCatcher,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub shading: Shading,
    pub color: Vec3,
    pub opacity: f32,
    pub transparent: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub reflectivity: f32,
    pub env_map_intensity: f32,
    pub vertex_colors: bool,
    pub map: Option<Rc<Texture>>,
}

impl Material {
    pub fn new(shading: Shading, color: Vec3) -> Self {
        Self {
            shading,
            color,
            opacity: 1.0,
            transparent: false,
            metalness: 0.0,
            roughness: 1.0,
            reflectivity: 0.5,
            env_map_intensity: 1.0,
            vertex_colors: false,
            map: None,
        }
    }

    pub fn unlit(color: Vec3) -> Self {
        Self::new(Shading::Unlit, color)
    }

    pub fn standard(color: Vec3) -> Self {
        Self::new(Shading::Standard, color)
    }

    pub fn physical(color: Vec3) -> Self {
        Self::new(Shading::Physical, color)
    }

    pub fn shadow_catcher() -> Self {
        Self {
            opacity: 0.5,
            transparent: true,
            ..Self::new(Shading::ShadowCatcher, Vec3::ZERO)
        }
    }

    pub fn with_vertex_colors(mut self) -> Self {
        self.vertex_colors = true;
        self
    }

    pub fn with_map(mut self, map: Rc<Texture>) -> Self {
        self.map = Some(map);
        self
    }

    pub fn is_lit(&self) -> bool {
        !matches!(self.shading, Shading::Unlit)
    }
}
