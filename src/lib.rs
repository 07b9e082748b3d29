#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod assets;
pub mod avatar;
pub mod errors;
pub mod scene;

pub use animation::{
    AnimationOrder, AnimationTrack, Animator, AnimatorRef, BoneMap, InterpolationMode,
    KeyframeTrack, PoseInterpolator, PoseMapper, RepeatMode, SkeletonAnimation,
};
pub use assets::{AssetLoader, AssetObserver, ImportSettings, LoadedModel, ModelPrefab, ResourceVolume};
pub use avatar::{Avatar, AvatarEvents};
pub use errors::{MarionetteError, Result};
pub use scene::{
    Bone, BoneTransform, Node, NodeHandle, Pose, SceneGraph, Skeleton, SkeletonRef, Transform,
};
