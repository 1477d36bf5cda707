use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use glam::Vec2;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{EffectsError, RenderEffects};
use crate::camera::PerspectiveCamera;
use crate::math::halton;
use crate::render::context::{Capabilities, FramePass, GraphicsContext};
use crate::scene::Scene;

const NAME: &str = "progressive effects";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressiveSettings {
    pub enable: bool,
    pub pause: bool,
    pub max_samples: u32,
}

impl Default for ProgressiveSettings {
    fn default() -> Self {
        Self {
            enable: true,
            pause: false,
            max_samples: 256,
        }
    }
}

/// Converges the raster image by averaging sub-pixel jittered frames.
///
/// Any scene, camera or environment update restarts the accumulation.
#[derive(Debug)]
pub struct ProgressiveEffects {
    settings: ProgressiveSettings,
    samples: u32,
    initialized: bool,
    disposed: bool,
}

impl ProgressiveEffects {
    pub fn new(settings: ProgressiveSettings) -> Self {
        Self {
            settings,
            samples: 0,
            initialized: false,
            disposed: false,
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn settings(&self) -> &ProgressiveSettings {
        &self.settings
    }

    fn reset(&mut self) {
        if self.samples > 0 {
            debug!("Restarting accumulation after {} samples", self.samples);
        }
        self.samples = 0;
    }

    fn next_pass(&mut self) -> FramePass {
        if !self.settings.enable {
            return FramePass::Direct;
        }
        if self.settings.pause || self.samples >= self.settings.max_samples {
            return if self.samples > 0 {
                FramePass::ShowAccumulated
            } else {
                FramePass::Direct
            };
        }

        // Halton indices start at 1 so the first sample is not pinned to the pixel corner
        let index = self.samples + 1;
        let jitter = Vec2::new(halton(index, 2), halton(index, 3)) - Vec2::splat(0.5);
        let pass = FramePass::Accumulate {
            sample_index: self.samples,
            jitter,
        };
        self.samples += 1;
        pass
    }
}

impl RenderEffects for ProgressiveEffects {
    fn is_valid(&self) -> bool {
        !self.disposed
    }

    fn status_message(&self) -> String {
        if self.initialized {
            format!("progressive samples {}", self.samples)
        } else {
            "#".to_string()
        }
    }

    fn initialize(
        &mut self,
        context: &mut dyn GraphicsContext,
        _scene: &Scene,
        _camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        if self.disposed {
            return Err(EffectsError::Disposed(NAME));
        }
        if !context.capabilities().contains(Capabilities::ACCUMULATE) {
            return Err(EffectsError::Unsupported {
                effect: NAME,
                capability: "float accumulation",
            });
        }
        self.initialized = true;
        self.samples = 0;
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
        self.reset();
        Ok(())
    }

    fn update_camera(
        &mut self,
        _context: &mut dyn GraphicsContext,
        _scene: &Scene,
        _camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        self.reset();
        Ok(())
    }

    fn update_environment(
        &mut self,
        _context: &mut dyn GraphicsContext,
        _scene: &Scene,
        _camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError> {
        self.reset();
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
            let pass = self.next_pass();
            context.draw(scene, camera, &pass).map_err(EffectsError::from)
        };
        future::ready(result).boxed_local()
    }

    fn dispose(&mut self) {
        self.initialized = false;
        self.disposed = true;
    }

    fn add_ui(&mut self, ui: &mut egui::Ui) -> bool {
        let mut restart = false;
        ui.collapsing("progressive", |ui| {
            restart |= ui.checkbox(&mut self.settings.enable, "enable").changed();
            ui.checkbox(&mut self.settings.pause, "pause");
            restart |= ui
                .add(egui::Slider::new(&mut self.settings.max_samples, 1..=4096).text("max samples"))
                .changed();
        });
        restart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use crate::render::testing::RecordingContext;

    fn setup(settings: ProgressiveSettings) -> (ProgressiveEffects, RecordingContext, Scene, PerspectiveCamera) {
        let mut effects = ProgressiveEffects::new(settings);
        let mut context = RecordingContext::new(Capabilities::ACCUMULATE);
        let scene = Scene::new();
        let camera = PerspectiveCamera::new(&CameraSettings::default(), 1.0);
        effects.update_scene(&mut context, &scene, &camera).unwrap();
        (effects, context, scene, camera)
    }

    #[test]
    fn accumulates_until_max_samples() {
        let (mut effects, mut context, scene, camera) = setup(ProgressiveSettings {
            max_samples: 2,
            ..Default::default()
        });
        for _ in 0..3 {
            pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        }

        assert!(matches!(context.passes[0], FramePass::Accumulate { sample_index: 0, .. }));
        assert!(matches!(context.passes[1], FramePass::Accumulate { sample_index: 1, .. }));
        assert_eq!(context.passes[2], FramePass::ShowAccumulated);
        assert_eq!(effects.status_message(), "progressive samples 2");
    }

    #[test]
    fn camera_update_restarts_accumulation() {
        let (mut effects, mut context, scene, camera) = setup(ProgressiveSettings::default());
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        assert_eq!(effects.samples(), 2);

        effects.update_camera(&mut context, &scene, &camera).unwrap();
        assert_eq!(effects.samples(), 0);
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        assert!(matches!(context.passes.last(), Some(FramePass::Accumulate { sample_index: 0, .. })));
    }

    #[test]
    fn jitter_stays_inside_the_pixel() {
        let (mut effects, mut context, scene, camera) = setup(ProgressiveSettings::default());
        for _ in 0..16 {
            pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        }
        for pass in &context.passes {
            let FramePass::Accumulate { jitter, .. } = pass else {
                panic!("expected accumulation, got {pass:?}");
            };
            assert!(jitter.abs().max_element() <= 0.5);
        }
    }

    #[test]
    fn disabled_draws_directly_and_paused_shows_result() {
        let (mut effects, mut context, scene, camera) = setup(ProgressiveSettings {
            enable: false,
            ..Default::default()
        });
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        assert_eq!(context.passes[0], FramePass::Direct);

        effects.settings.enable = true;
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        effects.settings.pause = true;
        pollster::block_on(effects.render(&mut context, &scene, &camera)).unwrap();
        assert_eq!(context.passes[2], FramePass::ShowAccumulated);
        assert_eq!(effects.samples(), 1);
    }

    #[test]
    fn needs_accumulation_support() {
        let mut effects = ProgressiveEffects::new(ProgressiveSettings::default());
        let mut context = RecordingContext::new(Capabilities::empty());
        let camera = PerspectiveCamera::new(&CameraSettings::default(), 1.0);
        assert!(effects.update_scene(&mut context, &Scene::new(), &camera).is_err());
    }
}
