//! Device-free graphics context for tests and headless runs.

use anyhow::{bail, Result};

use super::context::{Backend, Capabilities, ContextInfo, FramePass, GraphicsContext};
use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

/// Records every frame pass instead of drawing it
#[derive(Debug)]
pub struct RecordingContext {
    info: ContextInfo,
    capabilities: Capabilities,
    size: (u32, u32),
    pub passes: Vec<FramePass>,
    /// Number of scene roots seen by each draw
    pub drawn_roots: Vec<usize>,
    /// Makes every non-direct pass fail, as a lost compute pipeline would
    pub fail_effect_passes: bool,
}

impl RecordingContext {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            info: ContextInfo {
                backend: Backend::Hybrid,
                api: "Recording".to_string(),
                adapter: "none".to_string(),
            },
            capabilities,
            size: (1, 1),
            passes: Vec::new(),
            drawn_roots: Vec::new(),
            fail_effect_passes: false,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.info.backend = backend;
        self
    }

    pub fn direct_draws(&self) -> usize {
        self.passes.iter().filter(|p| matches!(p, FramePass::Direct)).count()
    }
}

impl GraphicsContext for RecordingContext {
    fn info(&self) -> &ContextInfo {
        &self.info
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw(&mut self, scene: &Scene, _camera: &PerspectiveCamera, pass: &FramePass) -> Result<()> {
        if self.fail_effect_passes && *pass != FramePass::Direct {
            bail!("{pass:?} failed");
        }
        self.passes.push(*pass);
        self.drawn_roots.push(scene.len());
        Ok(())
    }
}
