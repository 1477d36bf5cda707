use std::rc::Rc;

use anyhow::Result;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use glam::Vec3;

use super::SceneProvider;
use crate::math::hex_to_rgb;
use crate::scene::{Geometry, Material, Node, SceneObject};

/// Unit cube with one colour per face, raised above the ground
#[derive(Debug, Clone)]
pub struct CubeSceneProvider {
    pub height: f32,
}

impl CubeSceneProvider {
    pub fn new() -> Self {
        Self { height: 1.5 }
    }
}

impl Default for CubeSceneProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneProvider for CubeSceneProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        let face_colors = [0xff0000, 0x00ff00, 0x0000ff, 0xffff00, 0xff8000, 0xff00ff].map(hex_to_rgb);
        let geometry = Geometry::cuboid(1.0, 1.0, 1.0, Some(face_colors));
        let material = Material::physical(Vec3::ONE).with_vertex_colors();
        let cube = Node::mesh(Rc::new(geometry), Rc::new(material))
            .with_name("cube")
            .with_position(Vec3::new(0.0, self.height, 0.0))
            .into_ref();

        future::ready(Ok(SceneObject::new(vec![cube]))).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_provider_builds_one_mesh_without_animations() {
        let scene = pollster::block_on(CubeSceneProvider::new().create()).unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert!(scene.animations.is_empty());

        let cube = scene.objects[0].borrow();
        assert!(cube.is_mesh());
        assert_eq!(cube.position.y, 1.5);
        assert!(!cube.cast_shadow);
    }

    #[test]
    fn each_create_returns_fresh_nodes() {
        let provider = CubeSceneProvider::new();
        let a = pollster::block_on(provider.create()).unwrap();
        let b = pollster::block_on(provider.create()).unwrap();
        assert!(!Rc::ptr_eq(&a.objects[0], &b.objects[0]));
    }
}
