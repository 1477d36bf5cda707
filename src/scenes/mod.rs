//! Scene, light and helper providers.
//!
//! Providers are asynchronous factories. Decorators own one inner provider and
//! post-process its result, so chains like
//! `ShadowPlaneProvider(AnimatedProvider(ShadowModifier(CubeSceneProvider)))`
//! stack independent concerns without touching each other.

mod animation;
mod cached;
mod cube;
mod gltf;
mod ground;
mod helpers;
mod lights;
mod shadow;

use anyhow::Result;
use futures::future::LocalBoxFuture;

use crate::scene::{NodeRef, SceneObject};

pub use animation::{AnimatedProvider, AnimationBehavior, RotationAnimation};
pub use cached::{CachedSceneProvider, ContentSource, DirectoryContentSource, SceneCache};
pub use cube::CubeSceneProvider;
pub use self::gltf::GltfSceneProvider;
pub use ground::{ground_fit, ShadowPlaneParameters, ShadowPlaneProvider, GROUND_PLANE_SIZE};
pub use helpers::AxisGridHelpers;
pub use lights::{AmbientDirectionalLights, AreaLights, DefaultLights};
pub use shadow::ShadowModifier;

/// Asynchronous factory for one batch of scene content
pub trait SceneProvider {
    /// Builds a fresh batch; load failures surface as `Err`
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>>;
}

/// Asynchronous factory for a set of light nodes
pub trait LightProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>>;
}

/// Asynchronous factory for visual helpers (grid, axes)
pub trait HelperProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<Vec<NodeRef>>>;
}

impl<P: SceneProvider + ?Sized> SceneProvider for Box<P> {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        (**self).create()
    }
}
