use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::scene::{NodeHandle, SceneGraph};

/// A single bone's local transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The set of per-bone local transforms at one point in time.
///
/// Indexed in the owning skeleton's bone order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    transforms: Vec<BoneTransform>,
}

impl Pose {
    #[must_use]
    pub fn new(bone_count: usize) -> Self {
        Self {
            transforms: vec![BoneTransform::IDENTITY; bone_count],
        }
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.transforms.len()
    }

    #[must_use]
    pub fn get(&self, bone: usize) -> BoneTransform {
        self.transforms
            .get(bone)
            .copied()
            .unwrap_or(BoneTransform::IDENTITY)
    }

    pub fn set(&mut self, bone: usize, transform: BoneTransform) {
        if let Some(slot) = self.transforms.get_mut(bone) {
            *slot = transform;
        }
    }

    pub(crate) fn push(&mut self, transform: BoneTransform) {
        self.transforms.push(transform);
    }
}

/// One entry of the named bone hierarchy.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Parent bone index; root bones have none. Parents always precede
    /// children in the bone array.
    pub parent: Option<usize>,
    /// Bind-time local transform.
    pub bind: BoneTransform,
    /// Scene node driven by this bone, once wired.
    node: Option<NodeHandle>,
}

impl Bone {
    #[must_use]
    pub fn new(name: &str, parent: Option<usize>, bind: BoneTransform) -> Self {
        Self {
            name: name.to_string(),
            parent,
            bind,
            node: None,
        }
    }
}

/// Named bone hierarchy plus the current pose.
///
/// One skeleton per avatar; every animation track that targets it shares it
/// by reference (see [`SkeletonRef`]).
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub id: Uuid,
    pub name: String,

    bones: Vec<Bone>,
    by_name: FxHashMap<String, usize>,
    pose: Pose,
}

/// Shared skeleton handle. The pose behind it is written by whichever track
/// is currently evaluating; see the avatar lock-order notes.
pub type SkeletonRef = Arc<RwLock<Skeleton>>;

impl Skeleton {
    #[must_use]
    pub fn new(name: &str, bones: Vec<Bone>) -> Self {
        let by_name = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        let mut pose = Pose::new(0);
        for bone in &bones {
            pose.push(bone.bind);
        }
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            bones,
            by_name,
            pose,
        }
    }

    /// Wraps a skeleton in the shared handle used across animators.
    #[must_use]
    pub fn into_ref(self) -> SkeletonRef {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[must_use]
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn bone_node(&self, index: usize) -> Option<NodeHandle> {
        self.bones.get(index).and_then(|b| b.node)
    }

    pub fn attach_bone_node(&mut self, index: usize, node: NodeHandle) {
        if let Some(bone) = self.bones.get_mut(index) {
            bone.node = Some(node);
        }
    }

    #[must_use]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut Pose {
        &mut self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Merges another skeleton into this one as a bone union.
    ///
    /// Bones already present by name are kept as-is; new bones are appended
    /// with their parent remapped by name. The current pose is extended with
    /// the new bones' bind transforms.
    pub fn merge(&mut self, other: &Skeleton) {
        for bone in &other.bones {
            if self.by_name.contains_key(&bone.name) {
                continue;
            }
            let parent = bone
                .parent
                .and_then(|p| other.bones.get(p))
                .and_then(|p| self.bone_index(&p.name));
            let index = self.bones.len();
            self.bones.push(Bone {
                name: bone.name.clone(),
                parent,
                bind: bone.bind,
                node: None,
            });
            self.by_name.insert(bone.name.clone(), index);
            self.pose.push(bone.bind);
        }
    }

    /// Wires each bone to the scene node of the same name under `root`.
    /// Bones without a matching node are left unwired.
    pub fn bind_nodes(&mut self, graph: &SceneGraph, root: NodeHandle) {
        for bone in &mut self.bones {
            if bone.node.is_none() {
                bone.node = graph.find_by_name(root, &bone.name);
            }
        }
    }

    /// Reads the current pose back from the wired bone nodes' local
    /// transforms. Unwired bones keep their previous pose entry.
    pub fn pose_from_bones(&mut self, graph: &SceneGraph) {
        for (i, bone) in self.bones.iter().enumerate() {
            let Some(node) = bone.node.and_then(|h| graph.get_node(h)) else {
                continue;
            };
            self.pose.set(
                i,
                BoneTransform {
                    translation: node.transform.position,
                    rotation: node.transform.rotation,
                    scale: node.transform.scale,
                },
            );
        }
    }

    /// Pushes the current pose onto the wired bone nodes and refreshes their
    /// world matrices so skinning sees the new pose.
    pub fn update_skin_pose(&self, graph: &mut SceneGraph) {
        for (i, bone) in self.bones.iter().enumerate() {
            let transform = self.pose.get(i);
            let Some(node) = bone.node.and_then(|h| graph.get_node_mut(h)) else {
                continue;
            };
            node.transform.position = transform.translation;
            node.transform.rotation = transform.rotation;
            node.transform.scale = transform.scale;
            node.transform.mark_dirty();
        }
        for bone in &self.bones {
            // Refresh from the roots down; child bones are covered by the
            // subtree pass of their root.
            if bone.parent.is_none() {
                if let Some(node) = bone.node {
                    graph.update_world_transforms(node);
                }
            }
        }
    }
}
