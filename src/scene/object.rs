use std::fmt;
use std::rc::Rc;

use super::node::{contains, Node, NodeRef};

/// Per-frame update bound to one node; receives elapsed milliseconds
pub struct AnimationCommand {
    node: NodeRef,
    animate: Box<dyn FnMut(&mut Node, f32)>,
}

impl AnimationCommand {
    pub fn new(node: NodeRef, animate: impl FnMut(&mut Node, f32) + 'static) -> Self {
        Self {
            node,
            animate: Box::new(animate),
        }
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn run(&mut self, delta_time_ms: f32) {
        let mut node = self.node.borrow_mut();
        (self.animate)(&mut node, delta_time_ms);
    }
}

impl fmt::Debug for AnimationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationCommand")
            .field("node", &self.node.borrow().name)
            .finish_non_exhaustive()
    }
}

/// One batch of renderable nodes plus the animations bound to them
#[derive(Debug, Default)]
pub struct SceneObject {
    pub objects: Vec<NodeRef>,
    pub animations: Vec<AnimationCommand>,
}

impl SceneObject {
    pub fn new(objects: Vec<NodeRef>) -> Self {
        Self {
            objects,
            animations: Vec::new(),
        }
    }

    pub fn with_animations(mut self, animations: Vec<AnimationCommand>) -> Self {
        self.animations = animations;
        self
    }

    /// Runs every animation command once, in order
    pub fn animate(&mut self, delta_time_ms: f32) {
        for command in &mut self.animations {
            command.run(delta_time_ms);
        }
    }

    /// Every animated node is reachable from `objects`
    pub fn animations_are_bound(&self) -> bool {
        self.animations.iter().all(|command| {
            self.objects
                .iter()
                .any(|object| contains(object, command.node()))
        })
    }

    pub fn holds(&self, node: &NodeRef) -> bool {
        self.objects.iter().any(|object| Rc::ptr_eq(object, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn animate_runs_commands_with_elapsed_time() {
        let node = Node::group().into_ref();
        let mut scene = SceneObject::new(vec![node.clone()]).with_animations(vec![
            AnimationCommand::new(node.clone(), |n, dt| n.position.x += dt),
        ]);

        scene.animate(16.0);
        scene.animate(4.0);
        assert_eq!(node.borrow().position, Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn animations_bound_to_nested_nodes_count_as_bound() {
        let root = Node::group().into_ref();
        let child = Node::group().into_ref();
        root.borrow_mut().add_child(child.clone());
        let scene = SceneObject::new(vec![root])
            .with_animations(vec![AnimationCommand::new(child, |_, _| {})]);
        assert!(scene.animations_are_bound());
    }

    #[test]
    fn foreign_animation_is_detected() {
        let scene = SceneObject::new(vec![Node::group().into_ref()]).with_animations(vec![
            AnimationCommand::new(Node::group().into_ref(), |_, _| {}),
        ]);
        assert!(!scene.animations_are_bound());
    }
}
