use std::rc::Rc;

use glam::{Mat4, Vec3};

use super::light::Light;
use super::node::{traverse, Mesh, Node, NodeKind, NodeRef};
use crate::texture::Texture;

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Color(Vec3),
    Environment,
}

/// The live scene graph a renderer draws
#[derive(Debug)]
pub struct Scene {
    children: Vec<NodeRef>,
    pub environment: Option<Rc<Texture>>,
    pub background: Background,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            environment: None,
            background: Background::Color(Vec3::ONE),
        }
    }

    pub fn add(&mut self, node: NodeRef) {
        if !self.contains(&node) {
            self.children.push(node);
        }
    }

    /// Detaches `node`; returns false if it was not a direct child
    pub fn remove(&mut self, node: &NodeRef) -> bool {
        let before = self.children.len();
        self.children.retain(|child| !Rc::ptr_eq(child, node));
        self.children.len() != before
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        self.children.iter().any(|child| Rc::ptr_eq(child, node))
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn traverse(&self, visit: &mut dyn FnMut(&mut Node)) {
        for child in &self.children {
            traverse(child, visit);
        }
    }

    /// Flattens visible meshes and lights with their world transforms
    pub fn render_list(&self) -> RenderList {
        let mut list = RenderList::default();
        for child in &self.children {
            collect(child, Mat4::IDENTITY, &mut list);
        }
        list
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct DrawItem {
    pub world: Mat4,
    pub mesh: Mesh,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone)]
pub struct LightItem {
    pub position: Vec3,
    pub light: Light,
    pub cast_shadow: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderList {
    pub draws: Vec<DrawItem>,
    pub lights: Vec<LightItem>,
}

fn collect(node: &NodeRef, parent: Mat4, list: &mut RenderList) {
    let node = node.borrow();
    if !node.visible {
        return;
    }
    let world = parent * node.local_matrix();
    match &node.kind {
        NodeKind::Mesh(mesh) => list.draws.push(DrawItem {
            world,
            mesh: mesh.clone(),
            cast_shadow: node.cast_shadow,
            receive_shadow: node.receive_shadow,
        }),
        NodeKind::Light(light) => list.lights.push(LightItem {
            position: world.transform_point3(Vec3::ZERO),
            light: light.clone(),
            cast_shadow: node.cast_shadow,
        }),
        NodeKind::Group => {}
    }
    for child in node.children() {
        collect(child, world, list);
    }
}
