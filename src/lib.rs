pub mod camera;
pub mod cli;
pub mod clock;
pub mod config;
pub mod drop;
pub mod loaders;
pub mod math;
pub mod render;
pub mod scene;
pub mod scenes;
pub mod stacks;
pub mod texture;
pub mod ui;

pub use render::{SceneRenderer, WgpuContext};
pub use scene::{Scene, SceneObject};
pub use scenes::SceneProvider;
