use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use log::info;
use serde::{Deserialize, Serialize};

use super::{EffectsError, RenderEffects};
use crate::camera::PerspectiveCamera;
use crate::render::context::{Capabilities, FramePass, GraphicsContext, PostProcessParams, PostProcessPasses};
use crate::scene::Scene;

const NAME: &str = "post-process effects";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    pub ambient_occlusion: bool,
    pub ao_radius: f32,
    pub ao_intensity: f32,
    pub ao_distance_exponent: f32,
    pub ao_thickness: f32,
    pub depth_of_field: bool,
    pub dof_focus_distance: f32,
    pub dof_aperture: f32,
    pub fxaa: bool,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            ambient_occlusion: true,
            ao_radius: 0.1,
            ao_intensity: 1.0,
            ao_distance_exponent: 1.0,
            ao_thickness: 1.0,
            depth_of_field: false,
            dof_focus_distance: 3.0,
            dof_aperture: 0.025,
            fxaa: true,
        }
    }
}

impl PostProcessSettings {
    pub fn passes(&self) -> PostProcessPasses {
        let mut passes = PostProcessPasses::empty();
        passes.set(PostProcessPasses::AMBIENT_OCCLUSION, self.ambient_occlusion);
        passes.set(PostProcessPasses::DEPTH_OF_FIELD, self.depth_of_field);
        passes.set(PostProcessPasses::FXAA, self.fxaa);
        passes
    }
}

/// Screen-space AO, depth of field and FXAA in one compute pass
#[derive(Debug)]
pub struct PostProcessEffects {
    settings: PostProcessSettings,
    initialized: bool,
    disposed: bool,
    near: f32,
    far: f32,
}

impl PostProcessEffects {
    pub fn new(settings: PostProcessSettings) -> Self {
        Self {
            settings,
            initialized: false,
            disposed: false,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn settings(&self) -> &PostProcessSettings {
        &self.settings
    }

    pub fn params(&self) -> PostProcessParams {
        PostProcessParams {
            passes: self.settings.passes(),
            ao_radius: self.settings.ao_radius,
            ao_intensity: self.settings.ao_intensity,
            ao_distance_exponent: self.settings.ao_distance_exponent,
            ao_thickness: self.settings.ao_thickness,
            dof_focus_distance: self.settings.dof_focus_distance,
            dof_aperture: self.settings.dof_aperture,
            near: self.near,
            far: self.far,
        }
    }

    fn track_camera(&mut self, camera: &PerspectiveCamera) {
        self.near = camera.near;
        self.far = camera.far;
    }
}

impl RenderEffects for PostProcessEffects {
    fn is_valid(&self) -> bool {
        !self.disposed
    }

    fn status_message(&self) -> String {
        let passes = self.settings.passes();
        let names: Vec<&str> = [
            (PostProcessPasses::AMBIENT_OCCLUSION, "AO"),
            (PostProcessPasses::DEPTH_OF_FIELD, "DOF"),
            (PostProcessPasses::FXAA, "FXAA"),
        ]
        .into_iter()
        .filter(|(pass, _)| passes.contains(*pass))
        .map(|(_, name)| name)
        .collect();

        if names.is_empty() {
            "post-process (none)".to_string()
        } else {
            format!("post-process ({})", names.join(" + "))
        }
    }

    fn initialize(
        &mut self,
        context: &mut dyn GraphicsContext,
        _scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        if self.disposed {
            return Err(EffectsError::Disposed(NAME));
        }
        if !context.capabilities().contains(Capabilities::POST_PROCESS) {
            return Err(EffectsError::Unsupported {
                effect: NAME,
                capability: "compute post-processing",
            });
        }
        self.track_camera(camera);
        self.initialized = true;
        info!("Initialized {NAME} on {}", context.info().label());
        Ok(())
    }

    fn update_scene(
        &mut self,
        context: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        if !self.initialized {
            self.initialize(context, scene, camera)?;
        }
        self.track_camera(camera);
        Ok(())
    }

    fn update_camera(
        &mut self,
        _context: &mut dyn GraphicsContext,
        _scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        self.track_camera(camera);
        Ok(())
    }

    fn update_environment(
        &mut self,
        _context: &mut dyn GraphicsContext,
        _scene: &Scene,
        _camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        Ok(())
    }

    fn render<'a>(
        &'a mut self,
        context: &'a mut dyn GraphicsContext,
        scene: &'a Scene,
        camera: &'a PerspectiveCamera,
    ) -> LocalBoxFuture<'a, Result<(), EffectsError>> {
        let result = if !self.initialized {
            Err(EffectsError::NotInitialized(NAME))
        } else {
            context
                .draw(scene, camera, &FramePass::PostProcess(self.params()))
                .map_err(EffectsError::from)
        };
        future::ready(result).boxed_local()
    }

    fn dispose(&mut self) {
        self.initialized = false;
        self.disposed = true;
    }

    fn add_ui(&mut self, ui: &mut egui::Ui) -> bool {
        let settings = &mut self.settings;
        let mut changed = false;
        ui.collapsing("post-process", |ui| {
            changed |= ui.checkbox(&mut settings.ambient_occlusion, "ambient occlusion").changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.ao_radius, 0.01..=1.0).text("radius"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.ao_intensity, 0.0..=2.0).text("scale"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.ao_distance_exponent, 1.0..=4.0).text("distance exponent"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.ao_thickness, 0.01..=10.0).text("thickness"))
                .changed();
            ui.separator();
            changed |= ui.checkbox(&mut settings.depth_of_field, "depth of field").changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.dof_focus_distance, 0.1..=20.0).text("focus"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut settings.dof_aperture, 0.0..=0.1).text("aperture"))
                .changed();
            ui.separator();
            changed |= ui.checkbox(&mut settings.fxaa, "FXAA").changed();
        });
        changed
    }
}
