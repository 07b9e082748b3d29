use glam::{Quat, Vec3};

use crate::animation::tracks::KeyframeTrack;
use crate::scene::{BoneTransform, Pose, SkeletonRef};

/// Keyframe channels targeting a single named bone.
#[derive(Debug, Clone, Default)]
pub struct BoneChannel {
    pub bone: String,
    pub translation: Option<KeyframeTrack<Vec3>>,
    pub rotation: Option<KeyframeTrack<Quat>>,
    pub scale: Option<KeyframeTrack<Vec3>>,
}

impl BoneChannel {
    #[must_use]
    pub fn new(bone: &str) -> Self {
        Self {
            bone: bone.to_string(),
            ..Self::default()
        }
    }

    fn last_time(&self) -> f32 {
        let t = self.translation.as_ref().map_or(0.0, KeyframeTrack::last_time);
        let r = self.rotation.as_ref().map_or(0.0, KeyframeTrack::last_time);
        let s = self.scale.as_ref().map_or(0.0, KeyframeTrack::last_time);
        t.max(r).max(s)
    }
}

/// Keyframe playback against a skeleton.
///
/// Bone indices are resolved once at construction; channels naming a bone
/// the skeleton does not have simply never apply.
#[derive(Debug, Clone)]
pub struct SkeletonAnimation {
    name: String,
    skeleton: SkeletonRef,
    channels: Vec<BoneChannel>,
    bone_indices: Vec<Option<usize>>,
    duration: f32,
}

impl SkeletonAnimation {
    #[must_use]
    pub fn new(name: &str, skeleton: SkeletonRef, channels: Vec<BoneChannel>) -> Self {
        let duration = channels
            .iter()
            .map(BoneChannel::last_time)
            .fold(0.0_f32, f32::max);
        let bone_indices = {
            let skel = skeleton.read();
            channels.iter().map(|c| skel.bone_index(&c.bone)).collect()
        };
        Self {
            name: name.to_string(),
            skeleton,
            channels,
            bone_indices,
            duration,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn skeleton(&self) -> &SkeletonRef {
        &self.skeleton
    }

    fn apply(&self, pose: &mut Pose, time: f32) {
        for (channel, bone) in self.channels.iter().zip(&self.bone_indices) {
            let Some(bone) = *bone else { continue };
            let base = pose.get(bone);
            pose.set(
                bone,
                BoneTransform {
                    translation: channel
                        .translation
                        .as_ref()
                        .map_or(base.translation, |t| t.sample(time)),
                    rotation: channel
                        .rotation
                        .as_ref()
                        .map_or(base.rotation, |t| t.sample(time)),
                    scale: channel.scale.as_ref().map_or(base.scale, |t| t.sample(time)),
                },
            );
        }
    }

    /// Writes the sampled pose into the skeleton's current pose.
    pub fn animate(&self, time: f32) {
        let mut skel = self.skeleton.write();
        let mut pose = skel.pose().clone();
        self.apply(&mut pose, time);
        skel.set_pose(pose);
    }

    /// Samples the pose at `time` without mutating the skeleton. Bones this
    /// clip does not animate keep the skeleton's current pose.
    #[must_use]
    pub fn sample_pose(&self, time: f32) -> Pose {
        let skel = self.skeleton.read();
        let mut pose = skel.pose().clone();
        drop(skel);
        self.apply(&mut pose, time);
        pose
    }
}
