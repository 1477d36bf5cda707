use std::f32::consts::PI;
use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use super::SceneProvider;
use crate::scene::{AnimationCommand, Node, SceneObject};

/// Stateless per-frame motion applied to a node
pub trait AnimationBehavior {
    fn animate(&self, node: &mut Node, delta_time_ms: f32);
}

/// Half a turn per second around X, a quarter turn around Y
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationAnimation;

impl AnimationBehavior for RotationAnimation {
    fn animate(&self, node: &mut Node, delta_time_ms: f32) {
        let seconds = delta_time_ms / 1000.0;
        node.rotation.x += seconds * PI;
        node.rotation.y += seconds * (PI / 2.0);
    }
}

/// Binds one behavior to every top-level node of the inner batch
pub struct AnimatedProvider {
    inner: Box<dyn SceneProvider>,
    behavior: Rc<dyn AnimationBehavior>,
}

impl AnimatedProvider {
    pub fn new(inner: impl SceneProvider + 'static, behavior: impl AnimationBehavior + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            behavior: Rc::new(behavior),
        }
    }
}

impl SceneProvider for AnimatedProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        async move {
            let mut scene = self.inner.create().await?;
            let commands: Vec<AnimationCommand> = scene
                .objects
                .iter()
                .map(|object| {
                    let behavior = Rc::clone(&self.behavior);
                    AnimationCommand::new(object.clone(), move |node, dt| behavior.animate(node, dt))
                })
                .collect();
            scene.animations.extend(commands);
            Ok(scene)
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::{CubeSceneProvider, ShadowModifier};
    use glam::Vec3;

    #[test]
    fn rotation_after_one_second() {
        let mut node = Node::group();
        RotationAnimation.animate(&mut node, 1000.0);
        assert!((node.rotation.x - PI).abs() < 1e-6);
        assert!((node.rotation.y - PI / 2.0).abs() < 1e-6);
        assert_eq!(node.rotation.z, 0.0);
    }

    #[test]
    fn zero_elapsed_time_does_not_move() {
        let mut node = Node::group();
        RotationAnimation.animate(&mut node, 0.0);
        assert_eq!(node.rotation, Vec3::ZERO);
    }

    #[test]
    fn every_object_gets_a_bound_command() {
        let provider = AnimatedProvider::new(ShadowModifier::new(CubeSceneProvider::new()), RotationAnimation);
        let mut scene = pollster::block_on(provider.create()).unwrap();
        assert_eq!(scene.animations.len(), scene.objects.len());
        assert!(scene.animations_are_bound());

        scene.animate(500.0);
        let cube = scene.objects[0].borrow();
        assert!((cube.rotation.x - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn commands_are_appended_after_inner_commands() {
        let inner = AnimatedProvider::new(CubeSceneProvider::new(), RotationAnimation);
        let outer = AnimatedProvider::new(inner, RotationAnimation);
        let mut scene = pollster::block_on(outer.create()).unwrap();
        assert_eq!(scene.animations.len(), 2);

        scene.animate(1000.0);
        let cube = scene.objects[0].borrow();
        assert!((cube.rotation.x - 2.0 * PI).abs() < 1e-5);
    }
}
