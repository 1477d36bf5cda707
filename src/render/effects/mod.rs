//! Optional frame pipelines layered over the direct draw.

mod post_process;
mod progressive;

use futures::future::LocalBoxFuture;
use thiserror::Error;

use super::context::GraphicsContext;
use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

pub use post_process::{PostProcessEffects, PostProcessSettings};
pub use progressive::{ProgressiveEffects, ProgressiveSettings};

#[derive(Debug, Error)]
pub enum EffectsError {
    #[error("{effect} needs {capability} support, which this graphics context lacks")]
    Unsupported {
        effect: &'static str,
        capability: &'static str,
    },
    #[error("{0} rendered before initialization")]
    NotInitialized(&'static str),
    #[error("{0} used after dispose")]
    Disposed(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A frame pipeline owned by the renderer.
///
/// The renderer calls the `update_*` hooks only while the pipeline is enabled
/// and only for state that changed since the last call; implementations may
/// initialize lazily in [`RenderEffects::update_scene`].
pub trait RenderEffects {
    fn is_valid(&self) -> bool;
    fn status_message(&self) -> String;

    fn initialize(
        &mut self,
        context: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError>;

    fn update_scene(
        &mut self,
        context: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError>;

    fn update_camera(
        &mut self,
        context: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError>;

    fn update_environment(
        &mut self,
        context: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Result<(), EffectsError>;

    fn render<'a>(
        &'a mut self,
        context: &'a mut dyn GraphicsContext,
        scene: &'a Scene,
        camera: &'a PerspectiveCamera,
    ) -> LocalBoxFuture<'a, Result<(), EffectsError>>;

    fn dispose(&mut self);

    /// Draws the pipeline's settings; returns true when a change needs a scene refresh
    fn add_ui(&mut self, ui: &mut egui::Ui) -> bool;
}
