//! Provider chains and effects wiring for the demo's scene sources and backends.

use std::path::PathBuf;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::loaders::GltfSource;
use crate::render::effects::{PostProcessEffects, ProgressiveEffects, RenderEffects};
use crate::render::Backend;
use crate::scenes::{
    AnimatedProvider, AreaLights, CachedSceneProvider, ContentSource, CubeSceneProvider, DefaultLights,
    GltfSceneProvider, LightProvider, RotationAnimation, SceneCache, SceneProvider, ShadowModifier,
    ShadowPlaneParameters, ShadowPlaneProvider,
};

/// Where the displayed batch comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneSource {
    /// Rotating colour cube
    Cube,
    Gltf(PathBuf),
    Content(String),
}

/// Shared content resolution for cached scene sources
#[derive(Clone)]
pub struct ContentLibrary {
    pub source: Rc<dyn ContentSource>,
    pub cache: Rc<SceneCache>,
}

impl ContentLibrary {
    pub fn new(source: Rc<dyn ContentSource>) -> Self {
        Self {
            source,
            cache: Rc::new(SceneCache::new()),
        }
    }
}

/// Builds the provider chain for `source`:
/// cube as `ShadowPlane(Animated(ShadowModifier(Cube), Rotation))`,
/// assets as `ShadowPlane(ShadowModifier(asset))`
pub fn scene_stack(
    source: &SceneSource,
    shadow_plane: ShadowPlaneParameters,
    library: &ContentLibrary,
) -> Box<dyn SceneProvider> {
    match source {
        SceneSource::Cube => Box::new(ShadowPlaneProvider::new(
            AnimatedProvider::new(ShadowModifier::new(CubeSceneProvider::new()), RotationAnimation),
            shadow_plane,
        )),
        SceneSource::Gltf(path) => Box::new(ShadowPlaneProvider::new(
            ShadowModifier::new(GltfSceneProvider::new(GltfSource::Path(path.clone()))),
            shadow_plane,
        )),
        SceneSource::Content(id) => Box::new(ShadowPlaneProvider::new(
            ShadowModifier::new(CachedSceneProvider::new(
                id.clone(),
                Rc::clone(&library.source),
                Rc::clone(&library.cache),
            )),
            shadow_plane,
        )),
    }
}

/// Raster pairs with area lights for accumulation; hybrid backends use the default rig
pub fn light_provider(backend: Backend) -> Box<dyn LightProvider> {
    match backend {
        Backend::Raster => Box::new(AreaLights),
        Backend::Hybrid | Backend::HybridForcedGl => Box::new(DefaultLights),
    }
}

pub fn effects_for(backend: Backend, config: &AppConfig) -> Box<dyn RenderEffects> {
    match backend {
        Backend::Raster => Box::new(ProgressiveEffects::new(config.progressive)),
        Backend::Hybrid | Backend::HybridForcedGl => Box::new(PostProcessEffects::new(config.post_process)),
    }
}
