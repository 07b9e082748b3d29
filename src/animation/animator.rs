use std::sync::Arc;

use parking_lot::Mutex;

use crate::animation::track::AnimationTrack;

/// Repeat policy, at both the animator and the avatar level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Once,
    Repeated,
    PingPong,
}

/// Position of an animator inside an avatar's playback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationOrder {
    #[default]
    First,
    Middle,
    Last,
}

impl AnimationOrder {
    /// Order tag as a pure function of queue position.
    #[must_use]
    pub fn for_position(index: usize, len: usize) -> Self {
        if index == 0 {
            Self::First
        } else if index + 1 == len {
            Self::Last
        } else {
            Self::Middle
        }
    }
}

/// Shared animator handle; the avatar play queue and the animation list
/// reference the same instances.
pub type AnimatorRef = Arc<Mutex<Animator>>;

/// An ordered list of animation tracks played as one unit.
///
/// The unit's duration is taken from track 0; tracks with differing
/// durations are not supported and simply stop being advanced past their
/// own end (a long-standing quirk kept for compatibility).
#[derive(Debug, Clone)]
pub struct Animator {
    name: String,
    tracks: Vec<AnimationTrack>,

    time: f32,
    running: bool,

    repeat_mode: RepeatMode,
    repeat_count: i32,
    reverse: bool,

    blend: bool,
    blend_factor: f32,

    order: AnimationOrder,
}

impl Animator {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracks: Vec::new(),
            time: 0.0,
            running: false,
            repeat_mode: RepeatMode::Once,
            repeat_count: 1,
            reverse: false,
            blend: false,
            blend_factor: 0.0,
            order: AnimationOrder::First,
        }
    }

    /// Convenience constructor for the shared handle form.
    #[must_use]
    pub fn new_ref(name: &str) -> AnimatorRef {
        Arc::new(Mutex::new(Self::new(name)))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn add_track(&mut self, track: AnimationTrack) {
        self.tracks.push(track);
    }

    #[must_use]
    pub fn track(&self, index: usize) -> Option<&AnimationTrack> {
        self.tracks.get(index)
    }

    #[must_use]
    pub fn first_track(&self) -> Option<&AnimationTrack> {
        self.tracks.first()
    }

    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Duration of the playable unit, taken from track 0.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.tracks.first().map_or(0.0, AnimationTrack::duration)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn set_repeat_count(&mut self, count: i32) {
        self.repeat_count = count;
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    #[must_use]
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn set_blend(&mut self, blend: bool, blend_factor: f32) {
        self.blend = blend;
        self.blend_factor = blend_factor;
    }

    pub fn set_order(&mut self, order: AnimationOrder) {
        self.order = order;
    }

    #[must_use]
    pub fn order(&self) -> AnimationOrder {
        self.order
    }

    /// Begins playback from t = 0.
    pub fn start(&mut self) {
        self.time = 0.0;
        self.running = true;
    }

    /// Halts immediately; no completion is reported.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advances playback by `dt` seconds and evaluates every track.
    ///
    /// Returns `true` exactly once, when playback completes under the
    /// animator-level repeat policy; the final evaluation lands exactly on
    /// the boundary time so end poses are exact.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.time += dt;

        let duration = self.duration();
        if duration <= 0.0 {
            self.running = false;
            self.evaluate(0.0);
            return true;
        }

        match self.repeat_mode {
            RepeatMode::Once => {
                if self.time >= duration {
                    self.running = false;
                    self.evaluate(duration);
                    return true;
                }
                self.evaluate(self.time);
            }
            RepeatMode::Repeated => {
                let total = duration * self.repeat_count as f32;
                if self.repeat_count >= 0 && self.time >= total {
                    self.running = false;
                    self.evaluate(duration);
                    return true;
                }
                self.evaluate(self.time % duration);
            }
            RepeatMode::PingPong => {
                let cycle = duration * 2.0;
                let total = cycle * self.repeat_count as f32;
                if self.repeat_count >= 0 && self.time >= total {
                    self.running = false;
                    // A full ping-pong cycle ends back at the start pose.
                    self.evaluate(0.0);
                    return true;
                }
                let mut t = self.time % cycle;
                if t > duration {
                    t = cycle - t;
                }
                self.evaluate(t);
            }
        }
        false
    }

    /// Evaluates every track at an explicit timestamp, for scrubbing.
    /// Never drives completion.
    pub fn animate(&self, t: f32) {
        self.evaluate(t);
    }

    fn evaluate(&self, t: f32) {
        let t = if self.reverse {
            (self.duration() - t).max(0.0)
        } else {
            t
        };
        for track in &self.tracks {
            track.animate(t);
        }
    }
}
