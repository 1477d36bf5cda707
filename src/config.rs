//! Optional JSON settings file; every section and field falls back to its default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraSettings, OrbitSettings};
use crate::render::effects::{PostProcessSettings, ProgressiveSettings};
use crate::render::RendererSettings;
use crate::scenes::ShadowPlaneParameters;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub renderer: RendererSettings,
    pub shadow_plane: ShadowPlaneParameters,
    pub post_process: PostProcessSettings,
    pub progressive: ProgressiveSettings,
    pub orbit: OrbitSettings,
    pub camera: CameraSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{ "renderer": { "enable_effects": false }, "progressive": { "max_samples": 64 } }"#,
        )
        .unwrap();

        assert!(!config.renderer.enable_effects);
        assert!(config.renderer.show_environment_in_background);
        assert_eq!(config.progressive.max_samples, 64);
        assert!(config.progressive.enable);
        assert_eq!(config.camera, CameraSettings::default());
        assert_eq!(config.shadow_plane, ShadowPlaneParameters::default());
    }

    #[test]
    fn empty_object_is_the_default_config() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn load_reads_files_and_reports_bad_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "camera": {{ "fov_y_degrees": 50.0 }} }}"#).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.camera.fov_y_degrees, 50.0);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "{{ not json").unwrap();
        let err = AppConfig::load(broken.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));

        assert!(AppConfig::load(Path::new("/nonexistent/config.json")).is_err());
    }
}
