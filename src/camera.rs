use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Right-handed perspective camera looking at `target`
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        Self {
            fov_y_degrees: settings.fov_y_degrees,
            aspect,
            near: settings.near,
            far: settings.far,
            position: Vec3::from_array(settings.position),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    /// Screen-space up, orthogonal to `forward`
    pub fn screen_up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// Projection shifted by `offset` pixels, for sub-pixel jittered accumulation
    pub fn jittered_projection(&self, offset: Vec2, viewport: Vec2) -> Mat4 {
        let ndc = Vec2::new(2.0 * offset.x / viewport.x, -2.0 * offset.y / viewport.y);
        Mat4::from_translation(ndc.extend(0.0)) * self.projection_matrix()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 3.0],
        }
    }
}

/// Owns a camera and keeps it in sync with the viewport and user input
pub trait CameraControl {
    fn camera(&self) -> &PerspectiveCamera;
    fn camera_mut(&mut self) -> &mut PerspectiveCamera;
    /// Zero height is ignored
    fn set_sizes(&mut self, width: u32, height: u32);
    /// Advances any time-based motion; called once per frame
    fn update(&mut self) {}
}

pub struct StaticPerspectiveCamera {
    camera: PerspectiveCamera,
}

impl StaticPerspectiveCamera {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        Self {
            camera: PerspectiveCamera::new(settings, aspect),
        }
    }
}

impl CameraControl for StaticPerspectiveCamera {
    fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    fn set_sizes(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

const POLAR_EPSILON: f32 = 1e-6;
const CHANGE_EPSILON: f32 = 1e-6;

/// Orbits the wrapped camera around its target.
///
/// Left drag rotates, right or middle drag pans, the wheel dollies. Without
/// damping every input event is applied immediately; with damping the motion
/// is spread over subsequent [`CameraControl::update`] calls. Listeners run once
/// for every applied step that moved the camera.
pub struct OrbitCameraControl {
    inner: Box<dyn CameraControl>,
    settings: OrbitSettings,
    viewport: Vec2,
    drag: Option<DragMode>,
    cursor: Option<Vec2>,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vec3,
    listeners: Vec<Box<dyn FnMut()>>,
}

impl OrbitCameraControl {
    pub fn new(inner: impl CameraControl + 'static, settings: OrbitSettings) -> Self {
        Self {
            inner: Box::new(inner),
            settings,
            viewport: Vec2::new(1.0, 1.0),
            drag: None,
            cursor: None,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            listeners: Vec::new(),
        }
    }

    pub fn add_change_listener(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn set_damping(&mut self, enabled: bool) {
        self.settings.enable_damping = enabled;
    }

    /// Feeds a window event; returns true when the event was consumed
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let mode = match button {
                    MouseButton::Left => DragMode::Rotate,
                    MouseButton::Right | MouseButton::Middle => DragMode::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(mode),
                    ElementState::Released if self.drag == Some(mode) => self.drag = None,
                    ElementState::Released => {}
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                let previous = self.cursor.replace(position);
                match (self.drag, previous) {
                    (Some(mode), Some(previous)) => {
                        self.drag_by(mode, position - previous);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / 100.0,
                };
                self.zoom(lines);
                true
            }
            _ => false,
        }
    }

    /// Rotates by a pointer movement of `delta` pixels
    pub fn rotate(&mut self, delta: Vec2) {
        let height = self.viewport.y;
        self.theta_delta -= 2.0 * PI * delta.x / height * self.settings.rotate_speed;
        self.phi_delta -= 2.0 * PI * delta.y / height * self.settings.rotate_speed;
        self.apply_input();
    }

    /// Pans by a pointer movement of `delta` pixels, keeping the point under the cursor fixed
    pub fn pan(&mut self, delta: Vec2) {
        let camera = self.inner.camera();
        let distance = (camera.position - camera.target).length() * (camera.fov_y_degrees.to_radians() / 2.0).tan();
        let scale = 2.0 * distance / self.viewport.y * self.settings.pan_speed;
        self.pan_offset += -camera.right() * delta.x * scale + camera.screen_up() * delta.y * scale;
        self.apply_input();
    }

    /// Positive steps move towards the target
    pub fn zoom(&mut self, steps: f32) {
        if steps == 0.0 {
            return;
        }
        let zoom_scale = 0.95f32.powf(self.settings.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= zoom_scale;
        } else {
            self.scale /= zoom_scale;
        }
        self.apply_input();
    }

    fn drag_by(&mut self, mode: DragMode, delta: Vec2) {
        match mode {
            DragMode::Rotate => self.rotate(delta),
            DragMode::Pan => self.pan(delta),
        }
    }

    fn apply_input(&mut self) {
        if !self.settings.enable_damping {
            self.step();
        }
    }

    /// Applies pending motion to the camera; notifies listeners if it moved
    fn step(&mut self) -> bool {
        let damping = if self.settings.enable_damping {
            self.settings.damping_factor
        } else {
            1.0
        };

        let camera = self.inner.camera_mut();
        let before = (camera.position, camera.target);

        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI / 2.0
        };

        theta += self.theta_delta * damping;
        phi = (phi + self.phi_delta * damping).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        radius = (radius * self.scale).clamp(self.settings.min_distance, self.settings.max_distance);

        camera.target += self.pan_offset * damping;
        camera.position = camera.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );

        let moved = before.0.distance_squared(camera.position) > CHANGE_EPSILON
            || before.1.distance_squared(camera.target) > CHANGE_EPSILON;

        if self.settings.enable_damping {
            let decay = 1.0 - self.settings.damping_factor;
            self.theta_delta *= decay;
            self.phi_delta *= decay;
            self.pan_offset *= decay;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        if moved {
            for listener in &mut self.listeners {
                listener();
            }
        }
        moved
    }
}

impl CameraControl for OrbitCameraControl {
    fn camera(&self) -> &PerspectiveCamera {
        self.inner.camera()
    }

    fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        self.inner.camera_mut()
    }

    fn set_sizes(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.viewport = Vec2::new(width as f32, height as f32);
        self.inner.set_sizes(width, height);
    }

    fn update(&mut self) {
        self.inner.update();
        if self.settings.enable_damping {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn orbit(settings: OrbitSettings) -> (OrbitCameraControl, Rc<Cell<u32>>) {
        let mut control = OrbitCameraControl::new(StaticPerspectiveCamera::new(&CameraSettings::default(), 1.0), settings);
        control.set_sizes(800, 600);
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        control.add_change_listener(move || counter.set(counter.get() + 1));
        (control, changes)
    }

    #[test]
    fn static_camera_defaults() {
        let control = StaticPerspectiveCamera::new(&CameraSettings::default(), 1.5);
        let camera = control.camera();
        assert_eq!(camera.fov_y_degrees, 75.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(camera.aspect, 1.5);
    }

    #[test]
    fn set_sizes_updates_aspect_and_ignores_zero_height() {
        let mut control = StaticPerspectiveCamera::new(&CameraSettings::default(), 1.0);
        control.set_sizes(1920, 1080);
        assert!((control.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
        control.set_sizes(1920, 0);
        assert!((control.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn each_rotation_notifies_once() {
        let (mut control, changes) = orbit(OrbitSettings::default());
        control.rotate(Vec2::new(30.0, 0.0));
        assert_eq!(changes.get(), 1);
        control.rotate(Vec2::new(0.0, 10.0));
        assert_eq!(changes.get(), 2);

        let camera = control.camera();
        assert!((camera.position.length() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn update_without_input_is_silent() {
        let (mut control, changes) = orbit(OrbitSettings::default());
        control.update();
        control.update();
        assert_eq!(changes.get(), 0);
    }

    #[test]
    fn zoom_moves_towards_target() {
        let (mut control, changes) = orbit(OrbitSettings::default());
        control.zoom(1.0);
        assert!(control.camera().position.length() < 3.0);
        assert_eq!(changes.get(), 1);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let (mut control, _) = orbit(OrbitSettings {
            min_distance: 2.9,
            ..Default::default()
        });
        for _ in 0..20 {
            control.zoom(1.0);
        }
        assert!((control.camera().position.length() - 2.9).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_target_and_position_together() {
        let (mut control, _) = orbit(OrbitSettings::default());
        control.pan(Vec2::new(100.0, 0.0));
        let camera = control.camera();
        assert!(camera.target.x < 0.0);
        assert!((camera.position - camera.target - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn damping_spreads_motion_over_updates() {
        let (mut control, changes) = orbit(OrbitSettings {
            enable_damping: true,
            ..Default::default()
        });
        control.rotate(Vec2::new(100.0, 0.0));
        assert_eq!(changes.get(), 0);

        control.update();
        assert_eq!(changes.get(), 1);
        let first = control.camera().position;
        control.update();
        assert_eq!(changes.get(), 2);
        assert_ne!(control.camera().position, first);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let (mut control, _) = orbit(OrbitSettings::default());
        control.rotate(Vec2::new(0.0, 10_000.0));
        let camera = control.camera();
        assert!(camera.position.y.is_finite());
        assert!(camera.forward().is_finite());
    }
}
