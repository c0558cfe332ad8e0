//! Animator listeners
//!
//! Lifecycle listeners implement [`AnimatorListener`]; every method has an
//! empty default so implementors only override what they need. Update
//! listeners are plain closures called after each emitted value.
//!
//! Notification always iterates a snapshot of the registered listeners, so a
//! listener may add or remove listeners (or start and cancel animators) while
//! being notified.

use crate::animator::ValueAnimator;
use smallvec::SmallVec;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives lifecycle notifications from an animator
pub trait AnimatorListener {
    fn on_start(&self, _animator: &ValueAnimator) {}

    /// Fired once when the animator finishes, is cancelled, or is ended
    fn on_end(&self, _animator: &ValueAnimator) {}

    /// Fired before `on_end` when the animator is cancelled
    fn on_cancel(&self, _animator: &ValueAnimator) {}

    /// Fired once per repeat boundary crossed
    fn on_repeat(&self, _animator: &ValueAnimator) {}

    fn on_pause(&self, _animator: &ValueAnimator) {}

    fn on_resume(&self, _animator: &ValueAnimator) {}
}

/// Closure invoked after every emitted value
pub type UpdateListener = dyn Fn(&ValueAnimator);

/// Handle returned when registering a listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Registered listeners in registration order
pub(crate) struct ListenerList<L: ?Sized> {
    entries: Vec<(ListenerId, Rc<L>)>,
}

impl<L: ?Sized> ListenerList<L> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, listener: Rc<L>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy of the current listeners, safe to iterate while the list changes
    pub(crate) fn snapshot(&self) -> SmallVec<[Rc<L>; 4]> {
        self.entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }

    /// Copy sharing the same listener instances under fresh ids
    pub(crate) fn duplicate(&self) -> Self {
        let mut copy = Self::new();
        for (_, listener) in &self.entries {
            copy.add(Rc::clone(listener));
        }
        copy
    }
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Closure Adapter
// ============================================================================

type Callback = Box<dyn Fn(&ValueAnimator)>;

/// An [`AnimatorListener`] assembled from closures
///
/// ```ignore
/// animator.add_listener(
///     AnimatorCallbacks::new()
///         .on_start(|_| tracing::info!("started"))
///         .on_end(|_| tracing::info!("done")),
/// );
/// ```
#[derive(Default)]
pub struct AnimatorCallbacks {
    start: Option<Callback>,
    end: Option<Callback>,
    cancel: Option<Callback>,
    repeat: Option<Callback>,
    pause: Option<Callback>,
    resume: Option<Callback>,
}

impl AnimatorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_end<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    pub fn on_cancel<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.cancel = Some(Box::new(f));
        self
    }

    pub fn on_repeat<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.repeat = Some(Box::new(f));
        self
    }

    pub fn on_pause<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.pause = Some(Box::new(f));
        self
    }

    pub fn on_resume<F: Fn(&ValueAnimator) + 'static>(mut self, f: F) -> Self {
        self.resume = Some(Box::new(f));
        self
    }
}

fn call(callback: &Option<Callback>, animator: &ValueAnimator) {
    if let Some(callback) = callback {
        callback(animator);
    }
}

impl AnimatorListener for AnimatorCallbacks {
    fn on_start(&self, animator: &ValueAnimator) {
        call(&self.start, animator);
    }

    fn on_end(&self, animator: &ValueAnimator) {
        call(&self.end, animator);
    }

    fn on_cancel(&self, animator: &ValueAnimator) {
        call(&self.cancel, animator);
    }

    fn on_repeat(&self, animator: &ValueAnimator) {
        call(&self.repeat, animator);
    }

    fn on_pause(&self, animator: &ValueAnimator) {
        call(&self.pause, animator);
    }

    fn on_resume(&self, animator: &ValueAnimator) {
        call(&self.resume, animator);
    }
}
