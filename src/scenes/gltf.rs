use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use super::SceneProvider;
use crate::loaders::{load_gltf_async, GltfSource};
use crate::scene::{traverse, NodeRef, SceneObject, Shading};

/// Loads one glTF document per batch
#[derive(Debug, Clone)]
pub struct GltfSceneProvider {
    source: GltfSource,
}

impl GltfSceneProvider {
    pub fn new(source: GltfSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &GltfSource {
        &self.source
    }
}

impl SceneProvider for GltfSceneProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        async move {
            let root = load_gltf_async(self.source.clone()).await?;
            use_full_env_map_intensity(&root);
            Ok(SceneObject::new(vec![root]))
        }
        .boxed_local()
    }
}

/// Standard materials reflect the environment at full strength
pub(super) fn use_full_env_map_intensity(root: &NodeRef) {
    traverse(root, &mut |node| {
        if let Some(mesh) = node.as_mesh_mut() {
            if mesh.material.shading == Shading::Standard && mesh.material.env_map_intensity != 1.0 {
                Rc::make_mut(&mut mesh.material).env_map_intensity = 1.0;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failure_is_reported_not_panicked() {
        let provider = GltfSceneProvider::new(GltfSource::path("/nonexistent/scene.glb"));
        assert!(pollster::block_on(provider.create()).is_err());
    }

    #[test]
    fn standard_materials_get_full_env_map_intensity() {
        use crate::scene::{Geometry, Material, Node};
        use glam::Vec3;

        let dimmed = Material {
            env_map_intensity: 0.25,
            ..Material::standard(Vec3::ONE)
        };
        let unlit = Material {
            env_map_intensity: 0.25,
            ..Material::unlit(Vec3::ONE)
        };
        let geometry = Rc::new(Geometry::cuboid(1.0, 1.0, 1.0, None));
        let root = Node::group().into_ref();
        root.borrow_mut()
            .add_child(Node::mesh(geometry.clone(), Rc::new(dimmed)).into_ref());
        root.borrow_mut().add_child(Node::mesh(geometry, Rc::new(unlit)).into_ref());

        use_full_env_map_intensity(&root);
        let root = root.borrow();
        let intensity = |i: usize| root.children()[i].borrow().as_mesh().unwrap().material.env_map_intensity;
        assert_eq!(intensity(0), 1.0);
        assert_eq!(intensity(1), 0.25);
    }

    #[test]
    fn garbage_bytes_fail() {
        let provider = GltfSceneProvider::new(GltfSource::Bytes(vec![0; 16]));
        assert!(pollster::block_on(provider.create()).is_err());
    }
}
