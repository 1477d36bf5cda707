use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use super::SceneProvider;
use crate::scene::{traverse, SceneObject};

/// Turns on shadow casting and receiving for every mesh of the inner batch
pub struct ShadowModifier {
    inner: Box<dyn SceneProvider>,
}

impl ShadowModifier {
    pub fn new(inner: impl SceneProvider + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl SceneProvider for ShadowModifier {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        async move {
            let scene = self.inner.create().await?;
            for object in &scene.objects {
                traverse(object, &mut |node| {
                    if node.is_mesh() {
                        node.cast_shadow = true;
                        node.receive_shadow = true;
                    }
                });
            }
            Ok(scene)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AnimationCommand, Node};
    use crate::scenes::CubeSceneProvider;
    use futures::future;

    struct FixedProvider(fn() -> SceneObject);

    impl SceneProvider for FixedProvider {
        fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
            future::ready(Ok((self.0)())).boxed_local()
        }
    }

    #[test]
    fn meshes_cast_and_receive_shadows() {
        let scene = pollster::block_on(ShadowModifier::new(CubeSceneProvider::new()).create()).unwrap();
        let cube = scene.objects[0].borrow();
        assert!(cube.cast_shadow);
        assert!(cube.receive_shadow);
    }

    #[test]
    fn groups_are_left_alone() {
        let provider = ShadowModifier::new(FixedProvider(|| SceneObject::new(vec![Node::group().into_ref()])));
        let scene = pollster::block_on(provider.create()).unwrap();
        assert!(!scene.objects[0].borrow().cast_shadow);
    }

    #[test]
    fn empty_batch_is_untouched() {
        let provider = ShadowModifier::new(FixedProvider(SceneObject::default));
        let scene = pollster::block_on(provider.create()).unwrap();
        assert!(scene.objects.is_empty());
        assert!(scene.animations.is_empty());
    }

    #[test]
    fn animations_pass_through() {
        let provider = ShadowModifier::new(FixedProvider(|| {
            let node = Node::group().into_ref();
            SceneObject::new(vec![node.clone()])
                .with_animations(vec![AnimationCommand::new(node, |_, _| {})])
        }));
        let scene = pollster::block_on(provider.create()).unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.animations.len(), 1);
        assert!(scene.animations_are_bound());
    }
}
