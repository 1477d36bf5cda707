use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use super::geometry::Geometry;
use super::light::Light;
use super::material::Material;
use crate::math::AABB;

/// Shared handle to a scene node; the event loop is single-threaded
pub type NodeRef = Rc<RefCell<Node>>;

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub material: Rc<Material>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z
    pub rotation: Vec3,
    pub scale: Vec3,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub kind: NodeKind,
    children: Vec<NodeRef>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            kind,
            children: Vec::new(),
        }
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn mesh(geometry: Rc<Geometry>, material: Rc<Material>) -> Self {
        Self::new(NodeKind::Mesh(Mesh { geometry, material }))
    }

    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn into_ref(self) -> NodeRef {
        Rc::new(RefCell::new(self))
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn add_child(&mut self, child: NodeRef) {
        self.children.push(child);
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn quaternion(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quaternion(), self.position)
    }
}

/// Visits `node` and every descendant depth-first, parent before children
pub fn traverse(node: &NodeRef, visit: &mut dyn FnMut(&mut Node)) {
    let children = {
        let mut current = node.borrow_mut();
        visit(&mut current);
        current.children.clone()
    };
    for child in &children {
        traverse(child, visit);
    }
}

/// World-space bounds of every mesh vertex under `node`, including `node`'s own transform
pub fn world_bounds(node: &NodeRef) -> AABB {
    let mut bounds = AABB::empty();
    expand_bounds(node, Mat4::IDENTITY, &mut bounds);
    bounds
}

fn expand_bounds(node: &NodeRef, parent: Mat4, bounds: &mut AABB) {
    let node = node.borrow();
    let world = parent * node.local_matrix();
    if let NodeKind::Mesh(mesh) = &node.kind {
        for p in &mesh.geometry.positions {
            bounds.expand_point(world.transform_point3(*p));
        }
    }
    for child in &node.children {
        expand_bounds(child, world, bounds);
    }
}

/// Copies the node tree; geometry and materials stay shared
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let source = node.borrow();
    let copy = Node {
        name: source.name.clone(),
        position: source.position,
        rotation: source.rotation,
        scale: source.scale,
        visible: source.visible,
        cast_shadow: source.cast_shadow,
        receive_shadow: source.receive_shadow,
        kind: source.kind.clone(),
        children: source.children.iter().map(deep_clone).collect(),
    };
    copy.into_ref()
}

/// True when `target` is `root` or one of its descendants
pub fn contains(root: &NodeRef, target: &NodeRef) -> bool {
    Rc::ptr_eq(root, target) || root.borrow().children.iter().any(|c| contains(c, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Material;

    fn cube_node() -> NodeRef {
        Node::mesh(
            Rc::new(Geometry::cuboid(1.0, 1.0, 1.0, None)),
            Rc::new(Material::standard(Vec3::ONE)),
        )
        .into_ref()
    }

    #[test]
    fn traverse_visits_parent_before_children() {
        let root = Node::group().with_name("root").into_ref();
        let child = Node::group().with_name("child").into_ref();
        child.borrow_mut().add_child(Node::group().with_name("leaf").into_ref());
        root.borrow_mut().add_child(child);

        let mut names = Vec::new();
        traverse(&root, &mut |node| names.push(node.name.clone()));
        assert_eq!(names, vec!["root", "child", "leaf"]);
    }

    #[test]
    fn world_bounds_apply_parent_transforms() {
        let group = Node::group().into_ref();
        let cube = cube_node();
        cube.borrow_mut().position = Vec3::new(0.0, 1.5, 0.0);
        group.borrow_mut().add_child(cube);
        group.borrow_mut().scale = Vec3::splat(2.0);

        let bounds = world_bounds(&group);
        assert!((bounds.min - Vec3::new(-1.0, 2.0, -1.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(1.0, 4.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn world_bounds_of_group_without_meshes_is_empty() {
        let group = Node::group().into_ref();
        group.borrow_mut().add_child(Node::group().into_ref());
        assert!(world_bounds(&group).is_empty());
    }

    #[test]
    fn deep_clone_detaches_nodes_but_shares_geometry() {
        let original = Node::group().into_ref();
        original.borrow_mut().add_child(cube_node());
        let copy = deep_clone(&original);

        copy.borrow_mut().position = Vec3::ONE;
        assert_eq!(original.borrow().position, Vec3::ZERO);

        let a = original.borrow().children()[0].clone();
        let b = copy.borrow().children()[0].clone();
        assert!(!Rc::ptr_eq(&a, &b));
        let (a, b) = (a.borrow(), b.borrow());
        assert!(Rc::ptr_eq(&a.as_mesh().unwrap().geometry, &b.as_mesh().unwrap().geometry));
    }

    #[test]
    fn contains_finds_descendants() {
        let root = Node::group().into_ref();
        let cube = cube_node();
        root.borrow_mut().add_child(cube.clone());
        assert!(contains(&root, &cube));
        assert!(!contains(&cube, &root));
    }
}
