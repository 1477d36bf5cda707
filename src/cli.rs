// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::render::Backend;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-stack")]
#[command(about = "Composable 3D scene demo on wgpu", long_about = None)]
pub struct Cli {
    /// Rendering backend
    #[arg(long = "type", value_enum, default_value_t = Backend::Hybrid)]
    pub backend: Backend,

    /// Content id resolved through the content directory
    #[arg(long)]
    pub id: Option<String>,

    /// glTF or GLB file to show instead of the default cube
    #[arg(long, conflicts_with = "id")]
    pub gltf: Option<PathBuf>,

    /// Equirectangular .hdr or .exr environment map
    #[arg(long)]
    pub environment: Option<PathBuf>,

    /// Directory holding `<id>.glb` / `<id>.gltf` content
    #[arg(long, default_value = "content")]
    pub content_dir: PathBuf,

    /// JSON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show the ground grid and axes
    #[arg(long)]
    pub helpers: bool,

    /// Disable the settings panel
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_the_hybrid_backend() {
        let cli = Cli::parse_from(["scene-stack"]);
        assert_eq!(cli.backend, Backend::Hybrid);
        assert!(cli.id.is_none());
        assert_eq!(cli.content_dir, PathBuf::from("content"));
        assert!(!cli.no_ui);
    }

    #[test]
    fn parses_backend_names() {
        let cli = Cli::parse_from(["scene-stack", "--type", "webgl", "--id", "helmet"]);
        assert_eq!(cli.backend, Backend::Raster);
        assert_eq!(cli.id.as_deref(), Some("helmet"));

        let cli = Cli::parse_from(["scene-stack", "--type", "webgpu-forcewebgl"]);
        assert_eq!(cli.backend, Backend::HybridForcedGl);
    }

    #[test]
    fn rejects_unknown_backends_and_conflicting_sources() {
        assert!(Cli::try_parse_from(["scene-stack", "--type", "vulkan"]).is_err());
        assert!(Cli::try_parse_from(["scene-stack", "--id", "a", "--gltf", "a.glb"]).is_err());
    }
}
