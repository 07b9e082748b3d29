use std::sync::Arc;

use parking_lot::Mutex;

use crate::animation::AnimatorRef;
use crate::avatar::Avatar;
use crate::scene::NodeHandle;

/// Observer surface for avatar lifecycle events.
///
/// All methods default to no-ops so listeners only override what they care
/// about. `errors` is `None` on success and a diagnostic string on failure;
/// load failures are only ever reported here, never thrown.
pub trait AvatarEvents: Send + Sync {
    fn on_avatar_loaded(&self, avatar: &Avatar, root: NodeHandle, path: &str, errors: Option<&str>) {
        let _ = (avatar, root, path, errors);
    }

    fn on_model_loaded(&self, avatar: &Avatar, root: NodeHandle, path: &str, errors: Option<&str>) {
        let _ = (avatar, root, path, errors);
    }

    fn on_animation_loaded(
        &self,
        avatar: &Avatar,
        animator: Option<&AnimatorRef>,
        path: &str,
        errors: Option<&str>,
    ) {
        let _ = (avatar, animator, path, errors);
    }

    fn on_animation_started(&self, avatar: &Avatar, animator: &AnimatorRef) {
        let _ = (avatar, animator);
    }

    fn on_animation_finished(&self, avatar: &Avatar, animator: &AnimatorRef) {
        let _ = (avatar, animator);
    }
}

/// Listener registry for one avatar.
///
/// Dispatch snapshots the listener list first, so a listener may register
/// further listeners, or call back into the avatar, without deadlocking.
#[derive(Default)]
pub struct EventReceiver {
    listeners: Mutex<Vec<Arc<dyn AvatarEvents>>>,
}

impl EventReceiver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn AvatarEvents>) {
        self.listeners.lock().push(listener);
    }

    pub(crate) fn for_each(&self, f: impl Fn(&Arc<dyn AvatarEvents>)) {
        let listeners = self.listeners.lock().clone();
        for listener in &listeners {
            f(listener);
        }
    }
}
