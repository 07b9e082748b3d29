use crate::animation::clip::SkeletonAnimation;
use crate::scene::{BoneTransform, Pose, SkeletonRef};

/// Cross-fade between two skeletal poses over a blend window.
///
/// Rotations interpolate by slerp, translations and scales linearly. The
/// blend weight follows normalized time `f = t / duration`; with `reverse`
/// set the weight runs from 1 to 0 instead.
#[derive(Debug, Clone)]
pub struct PoseInterpolator {
    skeleton: SkeletonRef,
    start: Pose,
    end: Pose,
    duration: f32,
    reverse: bool,
}

impl PoseInterpolator {
    /// Blend from the final pose of `from` into the starting pose of `to`.
    #[must_use]
    pub fn between_clips(
        duration: f32,
        from: &SkeletonAnimation,
        to: &SkeletonAnimation,
        reverse: bool,
    ) -> Self {
        let start = from.sample_pose(from.duration());
        let end = to.sample_pose(0.0);
        Self {
            skeleton: from.skeleton().clone(),
            start,
            end,
            duration,
            reverse,
        }
    }

    /// Blend between two explicit poses on the given skeleton.
    #[must_use]
    pub fn from_poses(
        duration: f32,
        start: Pose,
        end: Pose,
        skeleton: SkeletonRef,
        reverse: bool,
    ) -> Self {
        Self {
            skeleton,
            start,
            end,
            duration,
            reverse,
        }
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn skeleton(&self) -> &SkeletonRef {
        &self.skeleton
    }

    /// Produces the blended pose at weight `w` in `[0, 1]`.
    ///
    /// The endpoints short-circuit to clones of the source poses so that
    /// weight 0 reproduces the start pose exactly and weight 1 the end pose
    /// exactly, not merely within interpolation tolerance.
    #[must_use]
    pub fn blend_at(&self, w: f32) -> Pose {
        if w <= 0.0 {
            return self.start.clone();
        }
        if w >= 1.0 {
            return self.end.clone();
        }
        let count = self.start.bone_count().min(self.end.bone_count());
        let mut pose = Pose::new(count);
        for bone in 0..count {
            let a = self.start.get(bone);
            let b = self.end.get(bone);
            pose.set(
                bone,
                BoneTransform {
                    translation: a.translation.lerp(b.translation, w),
                    rotation: a.rotation.slerp(b.rotation, w),
                    scale: a.scale.lerp(b.scale, w),
                },
            );
        }
        pose
    }

    /// Evaluates the blend at time `t` and writes the result into the
    /// reference skeleton's current pose.
    pub fn animate(&self, t: f32) {
        let f = if self.duration > 0.0 {
            (t / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let w = if self.reverse { 1.0 - f } else { f };
        let pose = self.blend_at(w);
        self.skeleton.write().set_pose(pose);
    }
}
