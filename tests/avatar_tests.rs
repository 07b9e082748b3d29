//! Avatar Sequencing Tests
//!
//! Tests for:
//! - Animation list management and index/name error reporting
//! - Queued playback: one started and one finished event per animator
//! - Avatar-level repeat policies (Once, Repeated, PingPong)
//! - Cross-fade insertion between consecutive clips
//! - stop() clearing the queue without further events
//! - Model/animation loading through a stub loader: skeleton adoption,
//!   merge on later loads, bone attachment and on-the-fly retargets

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use marionette::animation::{
    AnimationTrack, Animator, AnimatorRef, BoneChannel, InterpolationMode, KeyframeTrack,
    RepeatMode, SkeletonAnimation,
};
use marionette::assets::{
    AssetLoader, AssetObserver, ImportSettings, LoadedModel, ModelPrefab, PrefabNode,
    ResourceVolume,
};
use marionette::avatar::{Avatar, AvatarEvents};
use marionette::errors::MarionetteError;
use marionette::scene::{Bone, BoneTransform, NodeHandle, Skeleton, SkeletonRef};

fn make_skeleton_ref(name: &str) -> SkeletonRef {
    make_skeleton(name).into_ref()
}

fn make_skeleton(name: &str) -> Skeleton {
    Skeleton::new(
        name,
        vec![
            Bone::new("root", None, BoneTransform::IDENTITY),
            Bone::new("spine", Some(0), BoneTransform::IDENTITY),
            Bone::new("head", Some(1), BoneTransform::IDENTITY),
        ],
    )
}

fn make_clip(name: &str, skeleton: &SkeletonRef, duration: f32) -> SkeletonAnimation {
    let mut channel = BoneChannel::new("spine");
    channel.translation = Some(KeyframeTrack::new(
        vec![0.0, duration],
        vec![Vec3::ZERO, Vec3::X],
        InterpolationMode::Linear,
    ));
    SkeletonAnimation::new(name, skeleton.clone(), vec![channel])
}

fn make_animator(name: &str, skeleton: &SkeletonRef, duration: f32) -> AnimatorRef {
    let mut animator = Animator::new(name);
    animator.add_track(AnimationTrack::Keyframe(make_clip(name, skeleton, duration)));
    Arc::new(Mutex::new(animator))
}

/// Pumps the avatar until playback goes idle.
fn drive(avatar: &Avatar, dt: f32, max_steps: usize) {
    for _ in 0..max_steps {
        if !avatar.is_running() {
            return;
        }
        avatar.update(dt);
    }
    panic!("avatar still running after {max_steps} steps");
}

/// Listener that records every event as a readable string.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn snapshot(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn count_prefixed(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl AvatarEvents for Recorder {
    fn on_avatar_loaded(
        &self,
        _avatar: &Avatar,
        _root: NodeHandle,
        _path: &str,
        _errors: Option<&str>,
    ) {
        self.events.lock().push("avatar_loaded".to_string());
    }

    fn on_model_loaded(
        &self,
        _avatar: &Avatar,
        _root: NodeHandle,
        _path: &str,
        _errors: Option<&str>,
    ) {
        self.events.lock().push("model_loaded".to_string());
    }

    fn on_animation_loaded(
        &self,
        _avatar: &Avatar,
        animator: Option<&AnimatorRef>,
        _path: &str,
        _errors: Option<&str>,
    ) {
        match animator {
            Some(a) => self
                .events
                .lock()
                .push(format!("anim_loaded:{}", a.lock().name())),
            None => self.events.lock().push("anim_failed".to_string()),
        }
    }

    fn on_animation_started(&self, _avatar: &Avatar, animator: &AnimatorRef) {
        self.events
            .lock()
            .push(format!("start:{}", animator.lock().name()));
    }

    fn on_animation_finished(&self, _avatar: &Avatar, animator: &AnimatorRef) {
        self.events
            .lock()
            .push(format!("finish:{}", animator.lock().name()));
    }
}

fn avatar_with_recorder() -> (Arc<Avatar>, Arc<Recorder>) {
    let avatar = Avatar::new("eva");
    let recorder = Arc::new(Recorder::default());
    avatar.events().add_listener(recorder.clone());
    (avatar, recorder)
}

// ============================================================================
// Animation List and Errors
// ============================================================================

#[test]
fn animation_index_out_of_bounds() {
    let (avatar, _recorder) = avatar_with_recorder();
    assert!(matches!(
        avatar.start_index(5),
        Err(MarionetteError::AnimationIndexOutOfBounds { index: 5, count: 0 })
    ));
    assert!(matches!(
        avatar.animate(9, 0.0),
        Err(MarionetteError::AnimationIndexOutOfBounds { index: 9, .. })
    ));
}

#[test]
fn animation_not_found_by_name() {
    let (avatar, _recorder) = avatar_with_recorder();
    assert!(matches!(
        avatar.start("nope"),
        Err(MarionetteError::AnimationNotFound(_))
    ));
}

#[test]
fn bad_bone_map_is_rejected() {
    let (avatar, _recorder) = avatar_with_recorder();
    assert!(matches!(
        avatar.set_bone_map("no separator here"),
        Err(MarionetteError::BoneMapParse(_))
    ));
}

#[test]
fn find_and_remove_animation() {
    let (avatar, _recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    let walk = make_animator("walk", &skeleton, 1.0);
    avatar.add_animation(walk.clone());
    avatar.add_animation(make_animator("run", &skeleton, 1.0));

    assert_eq!(avatar.animation_count(), 2);
    assert!(avatar.find_animation("run").is_some());
    avatar.remove_animation(&walk);
    assert_eq!(avatar.animation_count(), 1);
    assert!(avatar.find_animation("walk").is_none());
}

#[test]
fn scrub_evaluates_without_running() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("walk", &skeleton, 1.0));

    avatar.animate(0, 0.5).unwrap();
    let x = skeleton.read().pose().get(1).translation.x;
    assert!((x - 0.5).abs() < 1e-5);
    assert!(!avatar.is_running());
    assert!(recorder.snapshot().is_empty());
}

// ============================================================================
// Queued Playback
// ============================================================================

#[test]
fn start_all_once_plays_in_order() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));
    avatar.add_animation(make_animator("b", &skeleton, 1.0));

    avatar.start_all(RepeatMode::Once, 1);
    assert!(avatar.is_running());
    drive(&avatar, 0.05, 200);

    assert_eq!(
        recorder.snapshot(),
        vec!["start:a", "finish:a", "start:b", "finish:b"]
    );
    assert!(!avatar.is_running());

    // Idle updates stay silent.
    avatar.update(0.05);
    assert_eq!(recorder.snapshot().len(), 4);
}

#[test]
fn second_start_waits_for_the_first() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));
    avatar.add_animation(make_animator("b", &skeleton, 1.0));

    avatar.start("a").unwrap();
    avatar.start("b").unwrap();
    // Only the head is playing so far.
    assert_eq!(recorder.snapshot(), vec!["start:a"]);

    drive(&avatar, 0.05, 200);
    assert_eq!(
        recorder.snapshot(),
        vec!["start:a", "finish:a", "start:b", "finish:b"]
    );
}

#[test]
fn repeated_replays_count_times() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));

    avatar.start_all(RepeatMode::Repeated, 3);
    drive(&avatar, 0.05, 500);

    assert_eq!(recorder.count_prefixed("start:a"), 3);
    assert_eq!(recorder.count_prefixed("finish:a"), 3);
    assert!(!avatar.is_running());
}

#[test]
fn ping_pong_reverses_and_stops() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    let a = make_animator("a", &skeleton, 1.0);
    avatar.add_animation(a.clone());

    avatar.start_all(RepeatMode::PingPong, 1);
    drive(&avatar, 0.05, 500);

    // Forward pass plus one reversed pass, with a filler after each.
    assert_eq!(recorder.count_prefixed("start:a"), 2);
    assert_eq!(recorder.count_prefixed("finish:a"), 2);
    assert_eq!(recorder.count_prefixed("finish:filler"), 2);
    assert!(a.lock().reverse(), "second pass should run reversed");
    assert!(!avatar.is_running());
}

#[test]
fn ping_pong_count_two_runs_four_half_cycles() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    let a = make_animator("a", &skeleton, 1.0);
    avatar.add_animation(a.clone());

    avatar.start_all(RepeatMode::PingPong, 2);
    drive(&avatar, 0.05, 1000);

    // The half-cycle counter reaches 2 through four 0.5 increments, one per
    // filler completion.
    assert_eq!(recorder.count_prefixed("start:a"), 4);
    assert_eq!(recorder.count_prefixed("finish:a"), 4);
    assert_eq!(recorder.count_prefixed("finish:filler"), 4);
    assert!(a.lock().reverse(), "fourth pass runs reversed");
    assert!(!avatar.is_running());
}

#[test]
fn stop_clears_queue_without_finish_events() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));
    avatar.add_animation(make_animator("b", &skeleton, 1.0));

    avatar.start_all(RepeatMode::Once, 1);
    avatar.update(0.1);
    avatar.stop();

    assert!(!avatar.is_running());
    avatar.update(0.1);
    avatar.update(0.1);
    assert_eq!(recorder.snapshot(), vec!["start:a"]);
}

#[test]
fn stop_named_halts_playback() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));

    avatar.start("a").unwrap();
    avatar.update(0.1);
    avatar.stop_named("a");

    assert!(!avatar.is_running());
    avatar.update(0.1);
    assert_eq!(recorder.snapshot(), vec!["start:a"]);
}

// ============================================================================
// Cross-Fade Insertion
// ============================================================================

#[test]
fn blend_plays_between_consecutive_clips() {
    let (avatar, recorder) = avatar_with_recorder();
    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));
    avatar.add_animation(make_animator("b", &skeleton, 1.0));

    avatar.set_blend(true, 0.5);
    avatar.start_all(RepeatMode::Once, 1);
    drive(&avatar, 0.05, 300);

    let starts: Vec<String> = recorder
        .snapshot()
        .into_iter()
        .filter(|e| e.starts_with("start:"))
        .collect();
    assert_eq!(starts, vec!["start:a", "start:blend", "start:b"]);
    assert!(!avatar.is_running());
}

/// Listener that calls back into the avatar from inside an event.
struct StopOnFinish {
    avatar: Mutex<Option<Arc<Avatar>>>,
}

impl AvatarEvents for StopOnFinish {
    fn on_animation_finished(&self, _avatar: &Avatar, _animator: &AnimatorRef) {
        if let Some(avatar) = self.avatar.lock().as_ref() {
            avatar.stop();
        }
    }
}

#[test]
fn reentrant_listener_stop_does_not_deadlock() {
    let avatar = Avatar::new("eva");
    let listener = Arc::new(StopOnFinish {
        avatar: Mutex::new(None),
    });
    *listener.avatar.lock() = Some(avatar.clone());
    avatar.events().add_listener(listener.clone());

    let skeleton = make_skeleton_ref("skel");
    avatar.add_animation(make_animator("a", &skeleton, 1.0));
    avatar.add_animation(make_animator("b", &skeleton, 1.0));

    avatar.start_all(RepeatMode::Once, 1);
    // Events fire outside the playback lock, so stopping from inside the
    // finished callback must complete without deadlocking.
    drive(&avatar, 0.05, 100);
    assert!(!avatar.is_running());
}

// ============================================================================
// Asset Loading
// ============================================================================

/// Loader stub that completes synchronously with a canned result.
struct ImmediateLoader {
    result: Mutex<Option<LoadedModel>>,
}

impl ImmediateLoader {
    fn new(model: LoadedModel) -> Self {
        Self {
            result: Mutex::new(Some(model)),
        }
    }

    fn empty() -> Self {
        Self {
            result: Mutex::new(Some(LoadedModel {
                prefab: ModelPrefab {
                    nodes: vec![PrefabNode::new("empty")],
                    root: 0,
                },
                skeleton: None,
                animations: Vec::new(),
            })),
        }
    }
}

impl AssetLoader for ImmediateLoader {
    fn load_model(
        &self,
        volume: &ResourceVolume,
        _settings: ImportSettings,
        _center_on_load: bool,
        observer: Arc<dyn AssetObserver>,
    ) {
        observer.on_asset_loaded(self.result.lock().take(), &volume.uri, None);
    }
}

fn model_with_skeleton(skeleton: Skeleton) -> LoadedModel {
    LoadedModel {
        prefab: ModelPrefab::from_skeleton(&skeleton),
        skeleton: Some(skeleton),
        animations: Vec::new(),
    }
}

fn animation_asset(animator: Animator) -> LoadedModel {
    LoadedModel {
        prefab: ModelPrefab {
            nodes: vec![PrefabNode::new("anim")],
            root: 0,
        },
        skeleton: None,
        animations: vec![animator],
    }
}

fn load_base_model(avatar: &Arc<Avatar>) {
    let loader = ImmediateLoader::new(model_with_skeleton(make_skeleton("biped")));
    avatar.load_model(&loader, &ResourceVolume::new("biped.model"));
}

#[test]
fn first_model_load_adopts_skeleton() {
    let (avatar, recorder) = avatar_with_recorder();
    load_base_model(&avatar);

    assert_eq!(recorder.snapshot(), vec!["avatar_loaded"]);
    let skeleton = avatar.skeleton().expect("skeleton adopted");
    assert_eq!(skeleton.read().bone_count(), 3);
    // Every bone found its scene node under the instantiated subtree.
    for i in 0..3 {
        assert!(skeleton.read().bone_node(i).is_some(), "bone {i} unwired");
    }
    let graph = avatar.graph().read();
    assert!(graph.find_by_name(avatar.model_root(), "head").is_some());
}

#[test]
fn later_model_load_merges_skeleton() {
    let (avatar, recorder) = avatar_with_recorder();
    load_base_model(&avatar);

    let extra = Skeleton::new(
        "tail-rig",
        vec![
            Bone::new("root", None, BoneTransform::IDENTITY),
            Bone::new("tail", Some(0), BoneTransform::IDENTITY),
        ],
    );
    let loader = ImmediateLoader::new(model_with_skeleton(extra));
    avatar.load_model(&loader, &ResourceVolume::new("tail.model"));

    assert_eq!(recorder.snapshot(), vec!["avatar_loaded", "model_loaded"]);
    let skeleton = avatar.skeleton().unwrap();
    assert_eq!(skeleton.read().bone_count(), 4);
    assert!(skeleton.read().bone_index("tail").is_some());
}

#[test]
fn attach_requires_a_wired_bone() {
    let (avatar, recorder) = avatar_with_recorder();
    let loader = ImmediateLoader::empty();
    let volume = ResourceVolume::new("hat.model");

    assert!(matches!(
        avatar.load_model_attached(&loader, &volume, "head"),
        Err(MarionetteError::NoSkeleton)
    ));

    load_base_model(&avatar);
    assert!(matches!(
        avatar.load_model_attached(&loader, &volume, "antenna"),
        Err(MarionetteError::BoneNotFound(_))
    ));

    avatar
        .load_model_attached(&loader, &volume, "head")
        .unwrap();
    assert!(recorder.snapshot().contains(&"model_loaded".to_string()));
    // The attachment landed under the head node.
    let graph = avatar.graph().read();
    let head = graph.find_by_name(avatar.model_root(), "head").unwrap();
    assert!(graph.find_by_name(head, "empty").is_some());
}

#[test]
fn foreign_clip_gets_a_retarget_track() {
    let (avatar, recorder) = avatar_with_recorder();
    load_base_model(&avatar);

    let foreign = make_skeleton_ref("mocap");
    let mut animator = Animator::new("wave");
    animator.add_track(AnimationTrack::Keyframe(make_clip("wave", &foreign, 1.0)));
    let loader = ImmediateLoader::new(animation_asset(animator));
    avatar
        .load_animation(&loader, &ResourceVolume::new("wave.anim"), None)
        .unwrap();

    assert!(recorder.snapshot().contains(&"anim_loaded:wave".to_string()));
    assert_eq!(avatar.animation_count(), 1);
    let animator = avatar.animation(0).unwrap();
    let guard = animator.lock();
    assert_eq!(guard.track_count(), 2);
    assert!(matches!(
        guard.track(1),
        Some(AnimationTrack::Retarget(_))
    ));
}

#[test]
fn native_clip_needs_no_retarget() {
    let (avatar, _recorder) = avatar_with_recorder();
    load_base_model(&avatar);

    let skeleton = avatar.skeleton().unwrap();
    let mut animator = Animator::new("idle");
    animator.add_track(AnimationTrack::Keyframe(make_clip("idle", &skeleton, 1.0)));
    let loader = ImmediateLoader::new(animation_asset(animator));
    avatar
        .load_animation(&loader, &ResourceVolume::new("idle.anim"), None)
        .unwrap();

    let animator = avatar.animation(0).unwrap();
    assert_eq!(animator.lock().track_count(), 1);
}

#[test]
fn clear_model_removes_instantiated_subtree() {
    let (avatar, _recorder) = avatar_with_recorder();
    load_base_model(&avatar);
    assert!(
        avatar
            .graph()
            .read()
            .find_by_name(avatar.model_root(), "head")
            .is_some()
    );

    avatar.clear_model();
    let graph = avatar.graph().read();
    assert!(graph.find_by_name(avatar.model_root(), "head").is_none());
    assert!(graph.get_node(avatar.model_root()).is_some());
}

#[test]
fn animation_asset_without_clips_reports_failure() {
    let (avatar, recorder) = avatar_with_recorder();
    load_base_model(&avatar);

    let loader = ImmediateLoader::empty();
    avatar
        .load_animation(&loader, &ResourceVolume::new("broken.anim"), None)
        .unwrap();

    assert!(recorder.snapshot().contains(&"anim_failed".to_string()));
    assert_eq!(avatar.animation_count(), 0);
}
