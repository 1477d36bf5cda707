use std::cell::OnceCell;
use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use glam::Vec3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::SceneProvider;
use crate::scene::{world_bounds, Geometry, Material, Node, NodeRef, SceneObject};
use crate::texture::{radial_floor_texture, Texture};

/// Edge length of the square ground plane
pub const GROUND_PLANE_SIZE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowPlaneParameters {
    /// Physically shaded plane with a soft radial edge instead of a pure shadow catcher
    pub use_physical_material: bool,
    pub floor_texture_size: u32,
}

impl Default for ShadowPlaneParameters {
    fn default() -> Self {
        Self {
            use_physical_material: true,
            floor_texture_size: 1024,
        }
    }
}

/// Groups the inner batch, fits it onto the ground and adds a ground plane
pub struct ShadowPlaneProvider {
    inner: Box<dyn SceneProvider>,
    parameters: ShadowPlaneParameters,
    floor_texture: OnceCell<Rc<Texture>>,
}

impl ShadowPlaneProvider {
    pub fn new(inner: impl SceneProvider + 'static, parameters: ShadowPlaneParameters) -> Self {
        Self {
            inner: Box::new(inner),
            parameters,
            floor_texture: OnceCell::new(),
        }
    }

    fn new_ground_plane(&self) -> NodeRef {
        let material = if self.parameters.use_physical_material {
            let map = self
                .floor_texture
                .get_or_init(|| Rc::new(radial_floor_texture(self.parameters.floor_texture_size, 0.0)))
                .clone();
            Material {
                metalness: 0.0,
                roughness: 0.2,
                reflectivity: 0.8,
                transparent: true,
                ..Material::physical(Vec3::ONE)
            }
            .with_map(map)
        } else {
            Material::shadow_catcher()
        };

        let geometry = Geometry::ground_plane(GROUND_PLANE_SIZE, GROUND_PLANE_SIZE);
        let mut plane = Node::mesh(Rc::new(geometry), Rc::new(material)).with_name("ground plane");
        plane.receive_shadow = true;
        plane.into_ref()
    }
}

impl SceneProvider for ShadowPlaneProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        async move {
            let base = self.inner.create().await?;

            let group = Node::group().with_name("ground fit group").into_ref();
            for object in base.objects {
                group.borrow_mut().add_child(object);
            }
            ground_fit(&group);

            Ok(SceneObject {
                objects: vec![group, self.new_ground_plane()],
                animations: base.animations,
            })
        }
        .boxed_local()
    }
}

/// Scales `node` so its bounding diagonal is of order one, centres it on the
/// X/Z origin and rests its lowest point on y = 0.
///
/// Returns the applied scale, or `None` when the bounds are empty or degenerate
/// and the node was left untouched. `node` is expected to be a root.
pub fn ground_fit(node: &NodeRef) -> Option<f32> {
    let bounds = world_bounds(node);
    let diagonal = bounds.diagonal();
    if bounds.is_empty() || !diagonal.is_finite() || diagonal <= f32::EPSILON {
        warn!("Skipping ground fit: degenerate bounds (diagonal {diagonal})");
        return None;
    }

    let scale = 10f32.powi(-(diagonal.log10().floor() as i32));
    let anchor = Vec3::new(bounds.center().x, bounds.min.y, bounds.center().z);

    let mut node = node.borrow_mut();
    node.scale *= scale;
    node.position = node.position * scale - anchor * scale;
    debug!("Ground fit: diagonal {diagonal:.3}, scale {scale}");
    Some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::CubeSceneProvider;

    fn box_node(size: f32, position: Vec3) -> NodeRef {
        Node::mesh(
            Rc::new(Geometry::cuboid(size, size, size, None)),
            Rc::new(Material::standard(Vec3::ONE)),
        )
        .with_position(position)
        .into_ref()
    }

    fn grouped(child: NodeRef) -> NodeRef {
        let group = Node::group().into_ref();
        group.borrow_mut().add_child(child);
        group
    }

    #[test]
    fn diagonal_between_one_and_ten_keeps_scale() {
        let group = grouped(box_node(2.0, Vec3::new(3.0, 5.0, -1.0)));
        assert_eq!(ground_fit(&group), Some(1.0));

        let bounds = world_bounds(&group);
        assert!(bounds.min.y.abs() < 1e-5);
        assert!(bounds.center().x.abs() < 1e-5);
        assert!(bounds.center().z.abs() < 1e-5);
    }

    #[test]
    fn large_content_is_scaled_down_by_powers_of_ten() {
        let group = grouped(box_node(200.0, Vec3::new(0.0, -40.0, 0.0)));
        let scale = ground_fit(&group).unwrap();
        assert!((scale - 0.01).abs() < 1e-6);

        let bounds = world_bounds(&group);
        assert!(bounds.diagonal() >= 1.0 && bounds.diagonal() < 10.0);
        assert!(bounds.min.y.abs() < 1e-4);
    }

    #[test]
    fn small_content_is_scaled_up() {
        let group = grouped(box_node(0.05, Vec3::ZERO));
        let scale = ground_fit(&group).unwrap();
        assert!((scale - 100.0).abs() < 1e-3);
    }

    #[test]
    fn fitting_twice_is_stable() {
        let group = grouped(box_node(37.0, Vec3::new(10.0, 10.0, 10.0)));
        ground_fit(&group);
        assert_eq!(ground_fit(&group), Some(1.0));
    }

    #[test]
    fn empty_group_is_left_untouched() {
        let group = Node::group().into_ref();
        assert_eq!(ground_fit(&group), None);
        assert_eq!(group.borrow().scale, Vec3::ONE);
        assert_eq!(group.borrow().position, Vec3::ZERO);
    }

    #[test]
    fn flat_point_content_is_degenerate() {
        let point = Node::mesh(
            Rc::new(Geometry::new(crate::scene::Topology::Triangles, vec![Vec3::ONE; 3])),
            Rc::new(Material::standard(Vec3::ONE)),
        )
        .into_ref();
        assert_eq!(ground_fit(&grouped(point)), None);
    }

    #[test]
    fn provider_returns_group_and_ground_plane() {
        let provider = ShadowPlaneProvider::new(
            CubeSceneProvider::new(),
            ShadowPlaneParameters {
                use_physical_material: false,
                ..Default::default()
            },
        );
        let scene = pollster::block_on(provider.create()).unwrap();
        assert_eq!(scene.objects.len(), 2);

        let plane = scene.objects[1].borrow();
        assert!(plane.receive_shadow);
        let mesh = plane.as_mesh().unwrap();
        assert_eq!(mesh.material.shading, crate::scene::Shading::ShadowCatcher);
    }

    #[test]
    fn physical_plane_reuses_floor_texture() {
        let provider = ShadowPlaneProvider::new(
            CubeSceneProvider::new(),
            ShadowPlaneParameters {
                use_physical_material: true,
                floor_texture_size: 16,
            },
        );
        let first = pollster::block_on(provider.create()).unwrap();
        let second = pollster::block_on(provider.create()).unwrap();

        let map_of = |scene: &SceneObject| {
            scene.objects[1].borrow().as_mesh().unwrap().material.map.clone().unwrap()
        };
        assert!(Rc::ptr_eq(&map_of(&first), &map_of(&second)));
        assert_eq!(map_of(&first).width, 16);
    }
}
