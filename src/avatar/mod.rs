//! Avatar orchestration.
//!
//! The [`Avatar`] owns a skeleton, a set of [`Animator`]s and a FIFO play
//! queue, and implements the sequencing state machine: queued playback,
//! cross-fade insertion between consecutive clips, and the once / repeated /
//! ping-pong repeat policies.

pub mod events;

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::animation::{
    AnimationOrder, AnimationTrack, Animator, AnimatorRef, BoneMap, PoseInterpolator, PoseMapper,
    RepeatMode,
};
use crate::assets::{AssetLoader, AssetObserver, ImportSettings, LoadedModel, ResourceVolume};
use crate::errors::{MarionetteError, Result};
use crate::scene::{Node, NodeHandle, SceneGraph, SkeletonRef};

pub use events::{AvatarEvents, EventReceiver};

/// Duration of the filler blend played between ping-pong half-cycles, to
/// desynchronize the completion from other in-flight chains before the
/// queue is rebuilt in reverse.
const FILLER_DURATION: f32 = 0.1;

/// Everything the sequencing state machine mutates, behind one lock.
///
/// The play queue head is always the animator currently advancing. Every
/// queue read or write (`start`, `stop`, the completion handler, the load
/// handlers) goes through this mutex; events are emitted only after it is
/// released.
struct PlaybackState {
    animations: Vec<AnimatorRef>,
    queue: VecDeque<AnimatorRef>,
    is_running: bool,

    repeat_mode: RepeatMode,
    repeat_count: i32,
    /// Fractional: +1 per repeated pass, +0.5 per ping-pong half-cycle.
    repeat_counter: f32,
    reverse: bool,

    blend: bool,
    blend_factor: f32,
    /// Whether order tags have been assigned to the current queue.
    ordered: bool,
    /// Whether the ping-pong filler is the animation that just drained.
    filler_pending: bool,

    bone_map: Option<BoneMap>,
}

/// Events recorded under the playback lock and dispatched after release.
enum Pending {
    Started(AnimatorRef),
    Finished(AnimatorRef),
}

/// Group of animations that can be collectively manipulated.
///
/// Typically the animations belong to one model and represent a sequence of
/// poses for it over time. Starting several animators plays them one at a
/// time in succession; observers hear about starts, finishes and loads on
/// the avatar's event channel.
pub struct Avatar {
    name: String,
    graph: RwLock<SceneGraph>,
    root: NodeHandle,
    skeleton: RwLock<Option<SkeletonRef>>,
    state: Mutex<PlaybackState>,
    events: EventReceiver,
}

impl Avatar {
    /// Creates an avatar with an empty model root node carrying `name`.
    /// Playback does not auto-start; call one of the `start` methods.
    #[must_use]
    pub fn new(name: &str) -> Arc<Self> {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(Node::new(name));
        Arc::new(Self {
            name: name.to_string(),
            graph: RwLock::new(graph),
            root,
            skeleton: RwLock::new(None),
            state: Mutex::new(PlaybackState {
                animations: Vec::new(),
                queue: VecDeque::new(),
                is_running: false,
                repeat_mode: RepeatMode::Once,
                repeat_count: 1,
                repeat_counter: 0.0,
                reverse: false,
                blend: false,
                blend_factor: 0.0,
                ordered: false,
                filler_pending: false,
                bone_map: None,
            }),
            events: EventReceiver::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the avatar's node hierarchy.
    #[must_use]
    pub fn model_root(&self) -> NodeHandle {
        self.root
    }

    #[must_use]
    pub fn graph(&self) -> &RwLock<SceneGraph> {
        &self.graph
    }

    /// The skeleton adopted from the first loaded model, if any.
    #[must_use]
    pub fn skeleton(&self) -> Option<SkeletonRef> {
        self.skeleton.read().clone()
    }

    /// Event channel for load and playback notifications.
    #[must_use]
    pub fn events(&self) -> &EventReceiver {
        &self.events
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().is_running
    }

    #[must_use]
    pub fn animation_count(&self) -> usize {
        self.state.lock().animations.len()
    }

    /// Enables cross-fade blending between consecutive clips, with the
    /// given blend window in seconds.
    pub fn set_blend(&self, blend: bool, blend_factor: f32) {
        let mut st = self.state.lock();
        st.blend = blend;
        st.blend_factor = blend_factor;
    }

    /// Sets the bone map used when synthesizing retargets.
    pub fn set_bone_map(&self, map: &str) -> Result<()> {
        let parsed: BoneMap = map.parse()?;
        self.state.lock().bone_map = Some(parsed);
        Ok(())
    }

    // ========================================================================
    // Animation list
    // ========================================================================

    pub fn add_animation(&self, animator: AnimatorRef) {
        self.state.lock().animations.push(animator);
    }

    pub fn animation(&self, index: usize) -> Result<AnimatorRef> {
        let st = self.state.lock();
        st.animations
            .get(index)
            .cloned()
            .ok_or(MarionetteError::AnimationIndexOutOfBounds {
                index,
                count: st.animations.len(),
            })
    }

    #[must_use]
    pub fn find_animation(&self, name: &str) -> Option<AnimatorRef> {
        self.state
            .lock()
            .animations
            .iter()
            .find(|a| a.lock().name() == name)
            .cloned()
    }

    pub fn remove_animation(&self, animator: &AnimatorRef) {
        self.state
            .lock()
            .animations
            .retain(|a| !Arc::ptr_eq(a, animator));
    }

    /// Removes every animation. Running state is not touched: items already
    /// playing keep playing.
    pub fn clear(&self) {
        self.state.lock().animations.clear();
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Starts the named animation.
    pub fn start(&self, name: &str) -> Result<AnimatorRef> {
        let animator = self
            .find_animation(name)
            .ok_or_else(|| MarionetteError::AnimationNotFound(name.to_string()))?;
        self.start_animator(&animator);
        Ok(animator)
    }

    /// Starts the animation with the given index.
    pub fn start_index(&self, index: usize) -> Result<AnimatorRef> {
        let animator = self.animation(index)?;
        self.start_animator(&animator);
        Ok(animator)
    }

    /// Enqueues an animator. Playback only actually launches when the queue
    /// was empty; otherwise the animator waits its turn.
    pub fn start_animator(&self, animator: &AnimatorRef) {
        let mut pending = Vec::new();
        {
            let mut st = self.state.lock();
            Self::enqueue_locked(&mut st, animator, &mut pending);
        }
        self.dispatch(pending);
    }

    /// Starts all avatar animations, playing one at a time in succession
    /// under the given repeat policy. A count of −1 repeats until `stop`.
    pub fn start_all(&self, mode: RepeatMode, count: i32) {
        let mut pending = Vec::new();
        {
            let mut st = self.state.lock();
            Self::start_all_locked(&mut st, mode, count, &mut pending);
        }
        self.dispatch(pending);
    }

    /// Evaluates the animation with the given index at an explicit time,
    /// without affecting the play queue.
    pub fn animate(&self, index: usize, time: f32) -> Result<AnimatorRef> {
        let animator = self.animation(index)?;
        animator.lock().animate(time);
        Ok(animator)
    }

    /// Stops the currently running animation, if any, and clears the queue.
    /// No finish events fire for the cleared items.
    pub fn stop(&self) {
        let head = {
            let mut st = self.state.lock();
            if !st.is_running || st.queue.is_empty() {
                return;
            }
            st.is_running = false;
            let head = st.queue.front().cloned();
            st.queue.clear();
            head
        };
        if let Some(head) = head {
            head.lock().stop();
        }
    }

    /// Stops the named animation without clearing the queue.
    pub fn stop_named(&self, name: &str) {
        if let Some(animator) = self.find_animation(name) {
            self.state.lock().is_running = false;
            animator.lock().stop();
        }
    }

    /// Advances the playing animator by `dt` seconds. Call once per frame
    /// from the render/update thread; completion of the queue head drives
    /// the sequencing state machine.
    pub fn update(&self, dt: f32) {
        let head = {
            let st = self.state.lock();
            if !st.is_running {
                return;
            }
            st.queue.front().cloned()
        };
        let Some(head) = head else { return };
        let finished = head.lock().update(dt);
        if finished {
            self.on_animator_finished(&head);
        }
    }

    // ========================================================================
    // Sequencing state machine
    // ========================================================================

    fn on_animator_finished(&self, finished: &AnimatorRef) {
        let mut pending = Vec::new();
        {
            let mut st = self.state.lock();
            // Guard against stale completions racing a stop() or clear():
            // the finished animator must still be the queue head.
            let Some(head) = st.queue.front() else { return };
            if !Arc::ptr_eq(head, finished) {
                return;
            }

            if st.blend {
                if !st.ordered {
                    Self::assign_order(&mut st);
                }
                self.insert_blend(&mut st);
            }

            let Some(head) = st.queue.pop_front() else {
                return;
            };
            st.is_running = false;

            if let Some(next) = st.queue.front().cloned() {
                {
                    let mut animator = next.lock();
                    animator.set_blend(st.blend, st.blend_factor);
                    animator.start();
                }
                st.is_running = true;
                log::debug!("avatar {}: next animator {}", self.name, next.lock().name());
                pending.push(Pending::Finished(head));
                pending.push(Pending::Started(next));
            } else {
                pending.push(Pending::Finished(head));
                match st.repeat_mode {
                    RepeatMode::Repeated => {
                        st.repeat_counter += 1.0;
                        let (mode, count) = (st.repeat_mode, st.repeat_count);
                        if st.repeat_counter < count as f32 || count < 0 {
                            Self::start_all_locked(&mut st, mode, count, &mut pending);
                        }
                    }
                    RepeatMode::PingPong => self.ping_pong_locked(&mut st, &mut pending),
                    RepeatMode::Once => {}
                }
            }
        }
        self.dispatch(pending);
    }

    /// Tags every queued animator by its position. The head keeps the First
    /// tag it was given when enqueued.
    fn assign_order(st: &mut PlaybackState) {
        let len = st.queue.len();
        for (i, animator) in st.queue.iter().enumerate().skip(1) {
            animator.lock().set_order(AnimationOrder::for_position(i, len));
        }
        st.ordered = true;
    }

    /// When the completing head and the next queued item are both keyframe
    /// clips, synthesizes a blend-plus-retarget animator and inserts it at
    /// queue position 1 so it plays before the original next item.
    fn insert_blend(&self, st: &mut PlaybackState) {
        if st.queue.len() < 2 {
            return;
        }
        let a0 = st.queue[0].clone();
        let a1 = st.queue[1].clone();
        if Arc::ptr_eq(&a0, &a1) {
            return;
        }

        let blend_animator = {
            let g0 = a0.lock();
            let g1 = a1.lock();
            let (Some(AnimationTrack::Keyframe(from)), Some(AnimationTrack::Keyframe(to))) =
                (g0.first_track(), g1.first_track())
            else {
                return;
            };

            let blend =
                PoseInterpolator::between_clips(st.blend_factor, from, to, st.reverse);
            let mut animator = Animator::new("blend");
            animator.add_track(AnimationTrack::Blend(blend));
            if let Some(target) = self.skeleton() {
                let mut mapper =
                    PoseMapper::new(target, from.skeleton().clone(), st.blend_factor);
                mapper.set_bone_map(st.bone_map.clone());
                animator.add_track(AnimationTrack::Retarget(mapper));
            }
            animator
        };
        st.queue.insert(1, Arc::new(Mutex::new(blend_animator)));
    }

    /// Ping-pong policy at the end of a queue pass: first play the short
    /// filler blend, then on its completion count the half-cycle and rebuild
    /// the queue in reverse while the budget allows.
    fn ping_pong_locked(&self, st: &mut PlaybackState, pending: &mut Vec<Pending>) {
        if st.filler_pending {
            st.filler_pending = false;
        } else if self.start_filler_locked(st) {
            return;
        }

        st.repeat_counter += 0.5;
        let (mode, count) = (st.repeat_mode, st.repeat_count);
        if st.repeat_counter < count as f32 || count < 0 {
            st.reverse = !st.reverse;
            st.animations.reverse();
            let len = st.animations.len();
            for (i, animator) in st.animations.iter().enumerate() {
                let mut a = animator.lock();
                a.set_order(AnimationOrder::for_position(i, len));
                a.set_repeat_count(1);
                a.set_repeat_mode(mode);
                a.set_reverse(st.reverse);
            }
            Self::start_all_locked(st, mode, count, pending);
        }
    }

    /// Builds and starts the filler: the last animation's current pose
    /// blended against itself for a fraction of a second. Bypasses
    /// `start_animator`, so no started event fires for it. Returns whether
    /// a filler is now playing.
    fn start_filler_locked(&self, st: &mut PlaybackState) -> bool {
        let Some(last) = st.animations.last() else {
            return false;
        };
        let filler = {
            let guard = last.lock();
            let Some(AnimationTrack::Keyframe(clip)) = guard.first_track() else {
                return false;
            };
            let pose = clip.skeleton().read().pose().clone();
            let blend = PoseInterpolator::from_poses(
                FILLER_DURATION,
                pose.clone(),
                pose,
                clip.skeleton().clone(),
                false,
            );
            let mut animator = Animator::new("filler");
            animator.add_track(AnimationTrack::Blend(blend));
            if let Some(target) = self.skeleton() {
                let mut mapper =
                    PoseMapper::new(target, clip.skeleton().clone(), FILLER_DURATION);
                mapper.set_bone_map(st.bone_map.clone());
                animator.add_track(AnimationTrack::Retarget(mapper));
            }
            Arc::new(Mutex::new(animator))
        };
        filler.lock().start();
        st.queue.push_front(filler);
        st.is_running = true;
        st.filler_pending = true;
        true
    }

    fn start_all_locked(
        st: &mut PlaybackState,
        mode: RepeatMode,
        count: i32,
        pending: &mut Vec<Pending>,
    ) {
        st.repeat_mode = mode;
        st.repeat_count = count;
        for animator in st.animations.clone() {
            if st.blend && !st.ordered {
                let mut a = animator.lock();
                a.set_blend(st.blend, st.blend_factor);
                a.set_order(AnimationOrder::First);
            }
            Self::enqueue_locked(st, &animator, pending);
        }
    }

    fn enqueue_locked(
        st: &mut PlaybackState,
        animator: &AnimatorRef,
        pending: &mut Vec<Pending>,
    ) {
        st.queue.push_back(animator.clone());
        if st.queue.len() > 1 {
            return;
        }
        st.is_running = true;
        animator.lock().start();
        pending.push(Pending::Started(animator.clone()));
    }

    fn dispatch(&self, pending: Vec<Pending>) {
        for event in pending {
            match event {
                Pending::Started(animator) => self
                    .events
                    .for_each(|l| l.on_animation_started(self, &animator)),
                Pending::Finished(animator) => self
                    .events
                    .for_each(|l| l.on_animation_finished(self, &animator)),
            }
        }
    }

    // ========================================================================
    // Asset loading
    // ========================================================================

    /// Loads the avatar base model. The result arrives asynchronously on the
    /// event channel as `on_avatar_loaded` (first model) or
    /// `on_model_loaded`.
    pub fn load_model(self: &Arc<Self>, loader: &dyn AssetLoader, volume: &ResourceVolume) {
        let settings = ImportSettings::recommended_with(
            ImportSettings::OPTIMIZE_GRAPH | ImportSettings::NO_ANIMATION,
        );
        loader.load_model(
            volume,
            settings,
            false,
            Arc::new(ModelLoadHandler {
                avatar: self.clone(),
                attach_parent: None,
            }),
        );
    }

    /// Loads a model to attach to a named bone of the avatar skeleton.
    /// Rejects the call when there is no skeleton, the bone is unknown, or
    /// the bone has no scene node.
    pub fn load_model_attached(
        self: &Arc<Self>,
        loader: &dyn AssetLoader,
        volume: &ResourceVolume,
        attach_bone: &str,
    ) -> Result<()> {
        let skeleton = self.skeleton().ok_or(MarionetteError::NoSkeleton)?;
        let node = {
            let skel = skeleton.read();
            let index = skel
                .bone_index(attach_bone)
                .ok_or_else(|| MarionetteError::BoneNotFound(attach_bone.to_string()))?;
            skel.bone_node(index)
                .ok_or_else(|| MarionetteError::BoneNotAttached(attach_bone.to_string()))?
        };
        let settings = ImportSettings::recommended_with(
            ImportSettings::OPTIMIZE_GRAPH | ImportSettings::NO_ANIMATION,
        );
        loader.load_model(
            volume,
            settings,
            false,
            Arc::new(ModelLoadHandler {
                avatar: self.clone(),
                attach_parent: Some(node),
            }),
        );
        Ok(())
    }

    /// Loads an animation for the current avatar. The optional bone map is
    /// kept for retargets synthesized later.
    pub fn load_animation(
        self: &Arc<Self>,
        loader: &dyn AssetLoader,
        volume: &ResourceVolume,
        bone_map: Option<&str>,
    ) -> Result<()> {
        if let Some(map) = bone_map {
            self.set_bone_map(map)?;
        }
        let settings = ImportSettings::recommended_with(
            ImportSettings::OPTIMIZE_GRAPH | ImportSettings::NO_TEXTURING,
        );
        loader.load_model(
            volume,
            settings,
            false,
            Arc::new(AnimationLoadHandler {
                avatar: self.clone(),
            }),
        );
        Ok(())
    }

    /// Removes the previously instantiated model subtree, if any.
    pub fn clear_model(&self) {
        let mut graph = self.graph.write();
        let first_child = graph
            .get_node(self.root)
            .and_then(|n| n.children().first().copied());
        if let Some(child) = first_child {
            graph.remove_subtree(child);
        }
    }

    fn handle_model_loaded(
        &self,
        model: Option<LoadedModel>,
        attach_parent: Option<NodeHandle>,
        path: &str,
        errors: Option<String>,
    ) {
        if let Some(err) = errors.as_deref().filter(|e| !e.is_empty()) {
            log::error!("asset load errors: {err}");
        }

        let mut adopted = false;
        let mut event_root = self.root;
        if let Some(model) = model {
            let parent = attach_parent.unwrap_or(self.root);
            let instanced = self.graph.write().instantiate(&model.prefab, parent);
            event_root = instanced;

            if let Some(new_skeleton) = model.skeleton {
                let existing = self.skeleton();
                match existing {
                    Some(skeleton) => {
                        let mut graph = self.graph.write();
                        let mut skel = skeleton.write();
                        skel.merge(&new_skeleton);
                        skel.bind_nodes(&graph, self.root);
                        skel.pose_from_bones(&graph);
                        skel.update_skin_pose(&mut graph);
                    }
                    None => {
                        let skeleton = new_skeleton.into_ref();
                        {
                            let mut graph = self.graph.write();
                            let mut skel = skeleton.write();
                            skel.bind_nodes(&graph, instanced);
                            skel.pose_from_bones(&graph);
                            skel.update_skin_pose(&mut graph);
                        }
                        *self.skeleton.write() = Some(skeleton);
                        adopted = true;
                        event_root = self.root;
                    }
                }
            } else {
                log::error!("avatar skeleton not found in asset file {path}");
            }
        }

        let errors = errors.as_deref();
        if adopted {
            self.events
                .for_each(|l| l.on_avatar_loaded(self, event_root, path, errors));
        } else {
            self.events
                .for_each(|l| l.on_model_loaded(self, event_root, path, errors));
        }
    }

    fn handle_animation_loaded(
        &self,
        model: Option<LoadedModel>,
        path: &str,
        errors: Option<String>,
    ) {
        let animator = model.and_then(|m| m.animations.into_iter().next());
        let Some(mut animator) = animator else {
            let errors = errors
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("No animations found in {path}"));
            self.events
                .for_each(|l| l.on_animation_loaded(self, None, path, Some(&errors)));
            return;
        };

        // Clips authored on a foreign skeleton get an on-the-fly retarget.
        let retarget = match (self.skeleton(), animator.first_track()) {
            (Some(target), Some(AnimationTrack::Keyframe(clip)))
                if !Arc::ptr_eq(&target, clip.skeleton()) =>
            {
                Some(PoseMapper::new(
                    target,
                    clip.skeleton().clone(),
                    clip.duration(),
                ))
            }
            _ => None,
        };
        if let Some(mapper) = retarget {
            animator.add_track(AnimationTrack::Retarget(mapper));
        }

        let animator = Arc::new(Mutex::new(animator));
        self.add_animation(animator.clone());
        let errors = errors.as_deref().filter(|e| !e.is_empty());
        self.events
            .for_each(|l| l.on_animation_loaded(self, Some(&animator), path, errors));
    }
}

/// Routes model-load completions back into the avatar.
struct ModelLoadHandler {
    avatar: Arc<Avatar>,
    attach_parent: Option<NodeHandle>,
}

impl AssetObserver for ModelLoadHandler {
    fn on_asset_loaded(&self, model: Option<LoadedModel>, path: &str, errors: Option<String>) {
        self.avatar
            .handle_model_loaded(model, self.attach_parent, path, errors);
    }
}

/// Routes animation-load completions back into the avatar.
struct AnimationLoadHandler {
    avatar: Arc<Avatar>,
}

impl AssetObserver for AnimationLoadHandler {
    fn on_asset_loaded(&self, model: Option<LoadedModel>, path: &str, errors: Option<String>) {
        self.avatar.handle_animation_loaded(model, path, errors);
    }
}
