use std::sync::Arc;

use crate::animation::Animator;
use crate::assets::ImportSettings;
use crate::scene::{Skeleton, Transform};

/// Names the location an asset is loaded from.
#[derive(Debug, Clone)]
pub struct ResourceVolume {
    pub uri: String,
}

impl ResourceVolume {
    #[must_use]
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
        }
    }
}

/// Prefab node: pure data, referencing children by index.
///
/// Prefabs carry no scene handles, so a loader can build them on a worker
/// thread and hand them over through the observer callback.
#[derive(Debug, Clone)]
pub struct PrefabNode {
    pub name: String,
    pub transform: Transform,
    /// Child indices into [`ModelPrefab::nodes`].
    pub children: Vec<usize>,
}

impl PrefabNode {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::new(),
            children: Vec::new(),
        }
    }
}

/// Flat node hierarchy parsed out of an asset file.
#[derive(Debug, Clone)]
pub struct ModelPrefab {
    pub nodes: Vec<PrefabNode>,
    /// Root node index into `nodes`.
    pub root: usize,
}

impl ModelPrefab {
    /// Builds a node hierarchy mirroring a skeleton's bone hierarchy, one
    /// node per bone at its bind transform, all rooted under a node carrying
    /// the skeleton's name. This is what importers of skeleton-only formats
    /// produce.
    #[must_use]
    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        let mut nodes = vec![PrefabNode::new(&skeleton.name)];
        for i in 0..skeleton.bone_count() {
            let Some(bone) = skeleton.bone(i) else { continue };
            let mut pnode = PrefabNode::new(&bone.name);
            pnode.transform = Transform::from_trs(
                bone.bind.translation,
                bone.bind.rotation,
                bone.bind.scale,
            );
            nodes.push(pnode);
            // Bone index i lands at node index i + 1; parents precede
            // children, so the parent node already exists.
            let parent = bone.parent.map_or(0, |p| p + 1);
            let child = nodes.len() - 1;
            nodes[parent].children.push(child);
        }
        Self { nodes, root: 0 }
    }
}

/// Typed output of a completed model or animation load.
///
/// The animation list is populated when the asset carried clips; the
/// skeleton when it carried one.
pub struct LoadedModel {
    pub prefab: ModelPrefab,
    pub skeleton: Option<Skeleton>,
    pub animations: Vec<Animator>,
}

/// Load-completion surface a loader reports through.
///
/// `errors` is `None` or empty on success and a non-empty diagnostic on
/// failure; loaders report, they never panic or return `Err` through this
/// channel. Callbacks may arrive on any thread.
pub trait AssetObserver: Send + Sync {
    fn on_asset_loaded(&self, model: Option<LoadedModel>, path: &str, errors: Option<String>);

    fn on_model_loaded(&self, path: &str) {
        let _ = path;
    }

    fn on_texture_loaded(&self, path: &str) {
        let _ = path;
    }

    fn on_model_error(&self, error: &str, path: &str) {
        let _ = (error, path);
    }

    fn on_texture_error(&self, error: &str, path: &str) {
        let _ = (error, path);
    }
}

/// The asset-loading collaborator.
///
/// Implementations own their concurrency: `load_model` returns immediately
/// and the observer hears about the result later, possibly from a worker
/// thread. There is no cancellation and no timeout; a loader that stalls
/// simply never calls back.
pub trait AssetLoader: Send + Sync {
    fn load_model(
        &self,
        volume: &ResourceVolume,
        settings: ImportSettings,
        center_on_load: bool,
        observer: Arc<dyn AssetObserver>,
    );
}
