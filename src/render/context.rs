use anyhow::Result;
use bitflags::bitflags;
use clap::ValueEnum;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;
use crate::scene::Scene;

bitflags! {
    /// Frame passes a graphics context can execute besides a direct draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Jittered accumulation into a float target
        const ACCUMULATE = 1 << 0;
        /// Compute-shader post-processing (AO, DOF, FXAA)
        const POST_PROCESS = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PostProcessPasses: u32 {
        const AMBIENT_OCCLUSION = 1 << 0;
        const DEPTH_OF_FIELD = 1 << 1;
        const FXAA = 1 << 2;
    }
}

/// Rendering backend selected at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
pub enum Backend {
    /// Raster-only pipeline on GL adapters, paired with progressive accumulation
    #[value(name = "webgl")]
    #[serde(rename = "webgl")]
    Raster,
    /// Raster plus compute post-processing on the primary native API
    #[default]
    #[value(name = "webgpu")]
    #[serde(rename = "webgpu")]
    Hybrid,
    /// Hybrid pipeline forced onto GL adapters; compute may be missing
    #[value(name = "webgpu-forcewebgl")]
    #[serde(rename = "webgpu-forcewebgl")]
    HybridForcedGl,
}

impl Backend {
    pub fn renderer_name(self) -> &'static str {
        match self {
            Backend::Raster => "RasterRenderer",
            Backend::Hybrid | Backend::HybridForcedGl => "HybridRenderer",
        }
    }

    pub fn wgpu_backends(self) -> wgpu::Backends {
        match self {
            Backend::Raster | Backend::HybridForcedGl => wgpu::Backends::GL,
            Backend::Hybrid => wgpu::Backends::PRIMARY,
        }
    }
}

/// What a context reports about itself for status lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub backend: Backend,
    /// Graphics API actually in use, e.g. "Vulkan" or "Gl"
    pub api: String,
    pub adapter: String,
}

impl ContextInfo {
    pub fn label(&self) -> String {
        match self.backend {
            Backend::Raster => self.backend.renderer_name().to_string(),
            Backend::Hybrid | Backend::HybridForcedGl => {
                format!("{} ({})", self.backend.renderer_name(), self.api)
            }
        }
    }
}

/// Parameters of one post-processing frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessParams {
    pub passes: PostProcessPasses,
    pub ao_radius: f32,
    pub ao_intensity: f32,
    pub ao_distance_exponent: f32,
    pub ao_thickness: f32,
    pub dof_focus_distance: f32,
    pub dof_aperture: f32,
    pub near: f32,
    pub far: f32,
}

/// How a context turns the scene into the next frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FramePass {
    /// Plain lit draw, tonemapped straight to the frame
    Direct,
    PostProcess(PostProcessParams),
    /// Adds one jittered sample to the accumulation target and shows the running mean.
    /// `sample_index` 0 restarts the accumulation.
    Accumulate { sample_index: u32, jitter: Vec2 },
    /// Shows the accumulation target without adding a sample
    ShowAccumulated,
}

/// GPU-facing half of the renderer.
///
/// Implemented by [`crate::render::WgpuContext`]; tests substitute a recording
/// context so renderer and effects logic can run without a device.
pub trait GraphicsContext {
    fn info(&self) -> &ContextInfo;
    fn capabilities(&self) -> Capabilities;
    fn set_size(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);
    fn draw(&mut self, scene: &Scene, camera: &PerspectiveCamera, pass: &FramePass) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(backend: Backend) -> ContextInfo {
        ContextInfo {
            backend,
            api: "Gl".into(),
            adapter: "test".into(),
        }
    }

    #[test]
    fn labels_name_the_api_for_hybrid_backends() {
        assert_eq!(info(Backend::Raster).label(), "RasterRenderer");
        assert_eq!(info(Backend::HybridForcedGl).label(), "HybridRenderer (Gl)");
    }

    #[test]
    fn backend_names_match_command_line_values() {
        assert_eq!(Backend::from_str("webgpu-forcewebgl", false), Ok(Backend::HybridForcedGl));
        assert_eq!(serde_json::to_string(&Backend::Raster).unwrap(), "\"webgl\"");
    }

    #[test]
    fn forced_gl_uses_gl_adapters() {
        assert_eq!(Backend::HybridForcedGl.wgpu_backends(), wgpu::Backends::GL);
        assert_eq!(Backend::Hybrid.wgpu_backends(), wgpu::Backends::PRIMARY);
    }
}
