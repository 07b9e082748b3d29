//! Scene graph module.
//!
//! Manages the node hierarchy the avatar model lives in:
//! - `Node`: scene node (parent/child links and a transform)
//! - `Transform`: TRS component with matrix caching
//! - `SceneGraph`: node storage and hierarchy operations
//! - `Skeleton`: named bone hierarchy plus the current pose

pub mod graph;
pub mod node;
pub mod skeleton;
pub mod transform;

pub use graph::SceneGraph;
pub use node::Node;
pub use skeleton::{Bone, BoneTransform, Pose, Skeleton, SkeletonRef};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
}
