use crate::animation::clip::SkeletonAnimation;
use crate::animation::interpolator::PoseInterpolator;
use crate::animation::mapper::PoseMapper;

/// A pose-producing unit inside an [`Animator`](crate::animation::Animator).
///
/// Sequencing logic that cares whether a track is keyframe playback, a
/// blend or a retarget dispatches on the variant.
#[derive(Debug, Clone)]
pub enum AnimationTrack {
    /// Keyframe playback against a skeleton.
    Keyframe(SkeletonAnimation),
    /// Cross-fade between two poses over a blend window.
    Blend(PoseInterpolator),
    /// Retarget the source skeleton's pose onto the target skeleton.
    Retarget(PoseMapper),
}

impl AnimationTrack {
    #[must_use]
    pub fn duration(&self) -> f32 {
        match self {
            Self::Keyframe(clip) => clip.duration(),
            Self::Blend(blend) => blend.duration(),
            Self::Retarget(mapper) => mapper.duration(),
        }
    }

    /// Evaluates the track at an explicit time offset.
    pub fn animate(&self, t: f32) {
        match self {
            Self::Keyframe(clip) => clip.animate(t),
            Self::Blend(blend) => blend.animate(t),
            Self::Retarget(mapper) => mapper.animate(t),
        }
    }

    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        matches!(self, Self::Keyframe(_))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Keyframe(clip) => clip.name(),
            Self::Blend(_) => "blend",
            Self::Retarget(_) => "retarget",
        }
    }
}
