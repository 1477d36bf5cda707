use anyhow::Result;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use glam::Vec3;

use super::LightProvider;
use crate::math::hex_to_rgb;
use crate::scene::{Light, LightKind, Node, NodeRef, ShadowCamera};

/// Dark-sky hemisphere fill plus one shadow-casting sun
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLights;

impl LightProvider for DefaultLights {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>> {
        let environment = Node::light(Light::hemisphere(hex_to_rgb(0x000000), hex_to_rgb(0xffffff), 0.5))
            .with_name("hemisphere light")
            .into_ref();

        let mut sun = Light::directional(Vec3::ONE, 1.0);
        if let LightKind::Directional { shadow, .. } = &mut sun.kind {
            *shadow = ShadowCamera {
                map_size: 1024,
                near: 50.0,
                far: 300.0,
            };
        }
        let mut sun = Node::light(sun)
            .with_name("directional light")
            .with_position(Vec3::new(100.0, 150.0, 100.0));
        sun.cast_shadow = true;

        future::ready(Ok(vec![environment, sun.into_ref()])).boxed_local()
    }
}

/// Flat ambient term plus a close directional light
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientDirectionalLights;

impl LightProvider for AmbientDirectionalLights {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>> {
        let ambient = Node::light(Light::ambient(Vec3::ONE, 0.5))
            .with_name("ambient light")
            .into_ref();
        let mut directional = Node::light(Light::directional(Vec3::ONE, 0.5))
            .with_name("directional light")
            .with_position(Vec3::new(5.0, 15.0, 5.0));
        directional.cast_shadow = true;

        future::ready(Ok(vec![ambient, directional.into_ref()])).boxed_local()
    }
}

/// Grey hemisphere fill plus four large rect area lights aimed at the origin,
/// for progressive rendering
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaLights;

impl LightProvider for AreaLights {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>> {
        let placements = [
            (100.0, Vec3::new(0.0, 500.0, 0.0)),
            (60.0, Vec3::new(-400.0, 400.0, 200.0)),
            (60.0, Vec3::new(400.0, 400.0, 200.0)),
            (60.0, Vec3::new(0.0, 400.0, -500.0)),
        ];
        let environment = Node::light(Light::hemisphere(hex_to_rgb(0x404040), hex_to_rgb(0xffffff), 2.0))
            .with_name("hemisphere light")
            .into_ref();
        let lights = std::iter::once(environment)
            .chain(placements.iter().enumerate().map(|(i, (intensity, position))| {
                Node::light(Light::rect_area(Vec3::ONE, *intensity, 100.0, 100.0))
                    .with_name(format!("area light {i}"))
                    .with_position(*position)
                    .into_ref()
            }))
            .collect();

        future::ready(Ok(lights)).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;

    #[test]
    fn default_lights_cast_one_shadow() {
        let lights = pollster::block_on(DefaultLights.create()).unwrap();
        assert_eq!(lights.len(), 2);
        let casting: Vec<_> = lights.iter().filter(|l| l.borrow().cast_shadow).collect();
        assert_eq!(casting.len(), 1);

        let sun = casting[0].borrow();
        match &sun.kind {
            NodeKind::Light(Light {
                kind: LightKind::Directional { shadow, .. },
                ..
            }) => {
                assert_eq!(shadow.map_size, 1024);
                assert_eq!(shadow.near, 50.0);
                assert_eq!(shadow.far, 300.0);
            }
            other => panic!("expected directional light, got {other:?}"),
        }
    }

    #[test]
    fn area_lights_point_at_origin() {
        let lights = pollster::block_on(AreaLights.create()).unwrap();
        assert_eq!(lights.len(), 5);
        for node in &lights[1..] {
            let node = node.borrow();
            let NodeKind::Light(light) = &node.kind else {
                panic!("expected light");
            };
            assert!(matches!(light.kind, LightKind::RectArea { .. }));
            let dir = light.direction_from(node.position).unwrap();
            assert!(dir.dot(-node.position.normalize()) > 0.999);
        }
    }

    #[test]
    fn ambient_directional_pair() {
        let lights = pollster::block_on(AmbientDirectionalLights.create()).unwrap();
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[1].borrow().position, Vec3::new(5.0, 15.0, 5.0));
    }
}
