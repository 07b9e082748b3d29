//! Animation module.
//!
//! Pose-producing tracks and the animator that bundles them:
//! - `KeyframeTrack`: sorted keyframes over one value channel
//! - `SkeletonAnimation`: keyframe playback against a skeleton
//! - `PoseInterpolator`: cross-fade between two poses
//! - `PoseMapper`: bone retargeting between skeletons
//! - `Animator`: an ordered bundle of tracks played as one unit

pub mod animator;
pub mod clip;
pub mod interpolator;
pub mod mapper;
pub mod track;
pub mod tracks;
pub mod values;

pub use animator::{AnimationOrder, Animator, AnimatorRef, RepeatMode};
pub use clip::{BoneChannel, SkeletonAnimation};
pub use interpolator::PoseInterpolator;
pub use mapper::{BoneMap, PoseMapper};
pub use track::AnimationTrack;
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::Interpolatable;
