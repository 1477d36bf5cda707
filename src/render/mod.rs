//! Scene rendering: the graphics context seam, the effects pipelines and the
//! renderer that ties them to the live scene.

pub mod context;
pub mod effects;
pub mod gpu;
mod renderer;
pub mod testing;

pub use context::{Backend, Capabilities, ContextInfo, FramePass, GraphicsContext, PostProcessParams, PostProcessPasses};
pub use gpu::{UiFrame, WgpuContext};
pub use renderer::{PendingUpdates, RendererSettings, SceneRenderer};
