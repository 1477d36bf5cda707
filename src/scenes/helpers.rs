use std::rc::Rc;

use anyhow::Result;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use glam::Vec3;

use super::HelperProvider;
use crate::scene::{Geometry, Material, Node, NodeRef};

/// Ground grid plus coordinate axes
#[derive(Debug, Clone, Copy)]
pub struct AxisGridHelpers {
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub axes_size: f32,
}

impl Default for AxisGridHelpers {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            grid_divisions: 10,
            axes_size: 2.0,
        }
    }
}

impl HelperProvider for AxisGridHelpers {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>> {
        let line_material = Rc::new(Material::unlit(Vec3::ONE).with_vertex_colors());
        let grid = Node::mesh(
            Rc::new(Geometry::grid(self.grid_size, self.grid_divisions)),
            Rc::clone(&line_material),
        )
        .with_name("grid helper")
        .into_ref();
        let axes = Node::mesh(Rc::new(Geometry::axes(self.axes_size)), line_material)
            .with_name("axes helper")
            .into_ref();

        future::ready(Ok(vec![grid, axes])).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Topology;

    #[test]
    fn helpers_are_unlit_lines() {
        let helpers = pollster::block_on(AxisGridHelpers::default().create()).unwrap();
        assert_eq!(helpers.len(), 2);
        for helper in &helpers {
            let helper = helper.borrow();
            let mesh = helper.as_mesh().unwrap();
            assert_eq!(mesh.geometry.topology, Topology::Lines);
            assert!(!mesh.material.is_lit());
        }
    }
}
