use glam::Vec3;

/// Shadow frustum for a directional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCamera {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            map_size: 512,
            near: 0.5,
            far: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Sky colour is the light colour
    Hemisphere { ground_color: Vec3 },
    Directional { target: Vec3, shadow: ShadowCamera },
    RectArea { width: f32, height: f32, target: Vec3 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn hemisphere(sky_color: Vec3, ground_color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Hemisphere { ground_color },
            color: sky_color,
            intensity,
        }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional {
                target: Vec3::ZERO,
                shadow: ShadowCamera::default(),
            },
            color,
            intensity,
        }
    }

    pub fn rect_area(color: Vec3, intensity: f32, width: f32, height: f32) -> Self {
        Self {
            kind: LightKind::RectArea {
                width,
                height,
                target: Vec3::ZERO,
            },
            color,
            intensity,
        }
    }

    /// Unit vector from the light towards its target, for lights that have one
    pub fn direction_from(&self, position: Vec3) -> Option<Vec3> {
        match &self.kind {
            LightKind::Directional { target, .. } | LightKind::RectArea { target, .. } => {
                (*target - position).try_normalize()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_light_points_at_origin() {
        let light = Light::directional(Vec3::ONE, 1.0);
        let dir = light.direction_from(Vec3::new(0.0, 10.0, 0.0)).unwrap();
        assert!((dir - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn ambient_light_has_no_direction() {
        assert!(Light::ambient(Vec3::ONE, 0.5).direction_from(Vec3::ONE).is_none());
    }
}
