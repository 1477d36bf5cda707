use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use bitflags::bitflags;
use glam::Vec3;
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::context::{FramePass, GraphicsContext};
use super::effects::{EffectsError, RenderEffects};
use crate::camera::PerspectiveCamera;
use crate::scene::{Background, Scene, SceneObject};
use crate::scenes::{HelperProvider, LightProvider, SceneProvider};
use crate::texture::Texture;

bitflags! {
    /// State that changed since the effects pipeline last saw it
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PendingUpdates: u8 {
        const SCENE = 1 << 0;
        const ENVIRONMENT = 1 << 1;
        const CAMERA = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub enable_effects: bool,
    pub show_environment_in_background: bool,
    /// Background when the environment is hidden or absent
    pub background_color: [f32; 3],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            enable_effects: true,
            show_environment_in_background: true,
            background_color: [1.0, 1.0, 1.0],
        }
    }
}

/// Owns the live scene and routes frames through the effects pipeline.
///
/// Mutating calls record what changed in a [`PendingUpdates`] set; the
/// matching effects hook runs on the next enabled frame and only then is the
/// bit cleared. While effects are disabled, invalid or absent, frames are
/// drawn directly and the hooks are left alone.
pub struct SceneRenderer<C: GraphicsContext> {
    context: C,
    scene: Scene,
    scene_object: Option<SceneObject>,
    effects: Option<Box<dyn RenderEffects>>,
    effects_failed: bool,
    pending: PendingUpdates,
    camera_changed: Rc<Cell<bool>>,
    settings: RendererSettings,
}

impl<C: GraphicsContext> SceneRenderer<C> {
    pub fn new(context: C, settings: RendererSettings) -> Self {
        let mut scene = Scene::new();
        scene.background = Background::Color(Vec3::from_array(settings.background_color));
        Self {
            context,
            scene,
            scene_object: None,
            effects: None,
            effects_failed: false,
            pending: PendingUpdates::empty(),
            camera_changed: Rc::new(Cell::new(false)),
            settings,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_object(&self) -> Option<&SceneObject> {
        self.scene_object.as_ref()
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn pending_updates(&self) -> PendingUpdates {
        self.pending | self.camera_flag_bits()
    }

    /// Pipeline present, valid, not failed, and switched on
    pub fn effects_enabled(&self) -> bool {
        self.settings.enable_effects
            && !self.effects_failed
            && self.effects.as_ref().is_some_and(|effects| effects.is_valid())
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.context.set_size(width, height);
        self.pending |= PendingUpdates::SCENE;
    }

    /// Builds a new batch and swaps it in for the current one.
    ///
    /// A failed build leaves the current batch installed.
    pub async fn create_scene(&mut self, provider: &dyn SceneProvider) -> Result<&SceneObject> {
        let batch = provider.create().await?;
        Ok(self.install_scene(batch))
    }

    /// Removes the previous batch's roots from the scene and adds `batch`'s
    pub fn install_scene(&mut self, batch: SceneObject) -> &SceneObject {
        if let Some(previous) = self.scene_object.take() {
            for object in &previous.objects {
                self.scene.remove(object);
            }
        }
        for object in &batch.objects {
            self.scene.add(object.clone());
        }
        info!(
            "Installed scene batch: {} objects, {} animations",
            batch.objects.len(),
            batch.animations.len()
        );
        self.pending |= PendingUpdates::SCENE;
        self.scene_object.insert(batch)
    }

    /// Runs the current batch's animation commands
    pub fn animate(&mut self, delta_time_ms: f32) {
        if let Some(batch) = self.scene_object.as_mut() {
            batch.animate(delta_time_ms);
        }
    }

    pub fn set_environment_map(&mut self, texture: Rc<Texture>) {
        self.scene.environment = Some(texture);
        self.apply_background();
        self.pending |= PendingUpdates::ENVIRONMENT;
    }

    pub fn set_show_environment_in_background(&mut self, show: bool) {
        if self.settings.show_environment_in_background != show {
            self.settings.show_environment_in_background = show;
            self.apply_background();
            self.pending |= PendingUpdates::ENVIRONMENT;
        }
    }

    pub fn set_effects_enabled(&mut self, enabled: bool) {
        if self.settings.enable_effects != enabled {
            self.settings.enable_effects = enabled;
            self.pending |= PendingUpdates::SCENE;
        }
    }

    pub async fn add_lights(&mut self, provider: &dyn LightProvider) -> Result<()> {
        for light in provider.create().await? {
            self.scene.add(light);
        }
        self.pending |= PendingUpdates::SCENE;
        Ok(())
    }

    pub async fn add_helper(&mut self, provider: &dyn HelperProvider) -> Result<()> {
        for helper in provider.create().await? {
            self.scene.add(helper);
        }
        Ok(())
    }

    /// Installs `effects` as the only pipeline, disposing any previous one
    pub fn add_effects(&mut self, effects: Box<dyn RenderEffects>) {
        if let Some(mut previous) = self.effects.replace(effects) {
            previous.dispose();
        }
        self.effects_failed = false;
        self.pending |= PendingUpdates::SCENE;
    }

    pub fn camera_has_changed(&mut self) {
        self.pending |= PendingUpdates::CAMERA;
    }

    /// Shared flag for camera listeners that cannot borrow the renderer
    pub fn camera_change_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.camera_changed)
    }

    pub async fn render(&mut self, camera: &PerspectiveCamera) -> Result<()> {
        if self.camera_changed.replace(false) {
            self.pending |= PendingUpdates::CAMERA;
        }

        if self.effects_enabled() {
            match self.render_effects(camera).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    error!("Effects pipeline failed, falling back to direct rendering: {err}");
                    self.effects_failed = true;
                }
            }
        }
        self.context.draw(&self.scene, camera, &FramePass::Direct)
    }

    async fn render_effects(&mut self, camera: &PerspectiveCamera) -> Result<(), EffectsError> {
        let Some(effects) = self.effects.as_mut() else {
            return Ok(());
        };

        if self.pending.contains(PendingUpdates::SCENE) {
            effects.update_scene(&mut self.context, &self.scene, camera)?;
            self.pending.remove(PendingUpdates::SCENE);
        }
        if self.pending.contains(PendingUpdates::ENVIRONMENT) {
            effects.update_environment(&mut self.context, &self.scene, camera)?;
            self.pending.remove(PendingUpdates::ENVIRONMENT);
        }
        if self.pending.contains(PendingUpdates::CAMERA) {
            effects.update_camera(&mut self.context, &self.scene, camera)?;
            self.pending.remove(PendingUpdates::CAMERA);
        }

        effects.render(&mut self.context, &self.scene, camera).await
    }

    pub fn render_status_message(&self) -> String {
        let label = self.context.info().label();
        match self.effects.as_ref() {
            Some(effects) if self.effects_enabled() => format!("{label} {}", effects.status_message()),
            _ => label,
        }
    }

    /// Renderer toggles followed by the pipeline's own settings
    pub fn add_ui(&mut self, ui: &mut egui::Ui) {
        let mut enable_effects = self.settings.enable_effects;
        if ui.checkbox(&mut enable_effects, "enable effects").changed() {
            self.set_effects_enabled(enable_effects);
        }
        let mut show_background = self.settings.show_environment_in_background;
        if ui
            .checkbox(&mut show_background, "environment in background")
            .changed()
        {
            self.set_show_environment_in_background(show_background);
        }
        if let Some(effects) = self.effects.as_mut() {
            if effects.add_ui(ui) {
                self.pending |= PendingUpdates::SCENE;
            }
        }
    }

    pub fn dispose(&mut self) {
        if let Some(mut effects) = self.effects.take() {
            effects.dispose();
        }
    }

    fn apply_background(&mut self) {
        self.scene.background = match self.scene.environment {
            Some(_) if self.settings.show_environment_in_background => Background::Environment,
            _ => Background::Color(Vec3::from_array(self.settings.background_color)),
        };
    }

    fn camera_flag_bits(&self) -> PendingUpdates {
        if self.camera_changed.get() {
            PendingUpdates::CAMERA
        } else {
            PendingUpdates::empty()
        }
    }
}

impl<C: GraphicsContext> Drop for SceneRenderer<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::Capabilities;
    use crate::render::testing::RecordingContext;

    #[test]
    fn effects_toggle_marks_scene_only_on_change() {
        let mut renderer = SceneRenderer::new(RecordingContext::new(Capabilities::all()), RendererSettings::default());
        renderer.set_effects_enabled(true);
        assert!(renderer.pending_updates().is_empty());
        renderer.set_effects_enabled(false);
        assert_eq!(renderer.pending_updates(), PendingUpdates::SCENE);
    }

    #[test]
    fn hidden_environment_keeps_background_colour() {
        let mut renderer = SceneRenderer::new(
            RecordingContext::new(Capabilities::all()),
            RendererSettings {
                show_environment_in_background: false,
                ..Default::default()
            },
        );
        let texture = Rc::new(crate::texture::radial_floor_texture(2, 0.0));
        renderer.set_environment_map(texture);
        assert_eq!(renderer.scene().background, Background::Color(Vec3::ONE));
        assert!(renderer.scene().environment.is_some());

        renderer.set_show_environment_in_background(true);
        assert_eq!(renderer.scene().background, Background::Environment);
        assert_eq!(renderer.pending_updates(), PendingUpdates::ENVIRONMENT);
    }

    #[test]
    fn camera_flag_is_reported_as_pending() {
        let renderer = SceneRenderer::new(RecordingContext::new(Capabilities::all()), RendererSettings::default());
        renderer.camera_change_flag().set(true);
        assert_eq!(renderer.pending_updates(), PendingUpdates::CAMERA);
    }
}
