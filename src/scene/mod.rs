mod geometry;
mod graph;
mod light;
mod material;
mod node;
mod object;

pub use geometry::{Geometry, Topology};
pub use graph::{Background, DrawItem, LightItem, RenderList, Scene};
pub use light::{Light, LightKind, ShadowCamera};
pub use material::{Material, Shading};
pub use node::{contains, deep_clone, traverse, world_bounds, Mesh, Node, NodeKind, NodeRef};
pub use object::{AnimationCommand, SceneObject};
