use crate::animation::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
}

/// A sorted sequence of keyframes over one value channel.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// # Panics
    ///
    /// Panics when the track is empty or times and values disagree in
    /// length; keyframe data is importer output and those are construction
    /// bugs, not runtime conditions.
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        assert!(!times.is_empty(), "keyframe track is empty");
        assert_eq!(times.len(), values.len(), "keyframe times/values mismatch");
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Time of the last keyframe.
    #[must_use]
    pub fn last_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track at `time`, clamping outside the keyframe range.
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        let len = self.times.len();
        if len == 1 {
            return self.values[0];
        }

        // partition_point finds the first index with t > time.
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return self.values[0];
        }
        if next >= len {
            return self.values[len - 1];
        }

        let index = next - 1;
        match self.interpolation {
            InterpolationMode::Step => self.values[index],
            InterpolationMode::Linear => {
                let t0 = self.times[index];
                let t1 = self.times[next];
                let dt = t1 - t0;
                // Degenerate key spacing collapses to the left key.
                let u = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
                T::interpolate_linear(self.values[index], self.values[next], u.clamp(0.0, 1.0))
            }
        }
    }
}
