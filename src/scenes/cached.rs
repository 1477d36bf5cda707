use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, info};

use super::gltf::use_full_env_map_intensity;
use super::SceneProvider;
use crate::loaders::{load_gltf_async, GltfSource};
use crate::scene::{deep_clone, NodeRef, SceneObject};

/// Resolves a content id to a freshly loaded node tree
pub trait ContentSource {
    fn load<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<NodeRef>>;
}

/// Looks up `<root>/<id>.glb`, then `<root>/<id>.gltf`
#[derive(Debug, Clone)]
pub struct DirectoryContentSource {
    root: PathBuf,
}

impl DirectoryContentSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            bail!("Invalid content id {id:?}");
        }
        for extension in ["glb", "gltf"] {
            let path = self.root.join(format!("{id}.{extension}"));
            if path.is_file() {
                return Ok(path);
            }
        }
        bail!("No content named {id:?} in {}", self.root.display())
    }
}

impl ContentSource for DirectoryContentSource {
    fn load<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, Result<NodeRef>> {
        async move {
            let path = self.resolve(id)?;
            load_gltf_async(GltfSource::Path(path)).await
        }
        .boxed_local()
    }
}

/// Prototype node trees by content id, shared between providers.
///
/// Every batch receives a deep clone, so animating or fitting one batch never
/// disturbs the cached prototype.
#[derive(Debug, Default)]
pub struct SceneCache {
    prototypes: RefCell<HashMap<String, NodeRef>>,
    loads: Cell<usize>,
}

impl SceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load(&self, id: &str, source: &dyn ContentSource) -> Result<NodeRef> {
        if let Some(prototype) = self.prototypes.borrow().get(id) {
            debug!("Scene cache hit for {id:?}");
            return Ok(deep_clone(prototype));
        }

        let prototype = source.load(id).await?;
        self.loads.set(self.loads.get() + 1);
        info!("Cached content {id:?}");

        let copy = deep_clone(&prototype);
        self.prototypes.borrow_mut().insert(id.to_string(), prototype);
        Ok(copy)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.prototypes.borrow().contains_key(id)
    }

    /// Number of loads that went to a content source
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }

    pub fn clear(&self) {
        self.prototypes.borrow_mut().clear();
    }
}

/// Scene provider for content addressed by id
pub struct CachedSceneProvider {
    id: String,
    source: Rc<dyn ContentSource>,
    cache: Rc<SceneCache>,
}

impl CachedSceneProvider {
    pub fn new(id: impl Into<String>, source: Rc<dyn ContentSource>, cache: Rc<SceneCache>) -> Self {
        Self {
            id: id.into(),
            source,
            cache,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl SceneProvider for CachedSceneProvider {
    fn create(&self) -> LocalBoxFuture<'_, Result<SceneObject>> {
        async move {
            let root = self.cache.get_or_load(&self.id, self.source.as_ref()).await?;
            use_full_env_map_intensity(&root);
            Ok(SceneObject::new(vec![root]))
        }
        .boxed_local()
    }
}
