//! Animation scheduler
//!
//! Drives every animator of one [`AnimationContext`](crate::AnimationContext)
//! from a single frame pulse, so all of them observe the same time on each
//! frame. Animators move through four insertion-ordered sets:
//!
//! - **pending**: started since the last frame
//! - **delayed**: waiting out a start delay
//! - **active**: advancing every frame
//! - **ending**: finished this frame, retired at the end of it
//!
//! The scheduler holds weak references only. Every set is snapshotted before
//! iteration and membership is re-checked per member, since listeners may
//! start or cancel animators while a frame is in progress.

use crate::animator::{AnimatorCell, AnimatorId, ValueAnimator};
use cadence_core::{CallbackKind, FrameClock};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type MemberSet = IndexMap<AnimatorId, Weak<AnimatorCell>, FxBuildHasher>;

type Snapshot = SmallVec<[(AnimatorId, Weak<AnimatorCell>); 8]>;

#[derive(Default)]
struct SchedulerSets {
    pending: MemberSet,
    delayed: MemberSet,
    active: MemberSet,
    ending: MemberSet,
    /// An animate callback is outstanding
    armed: bool,
    last_frame_time_ms: i64,
}

impl SchedulerSets {
    fn remove(&mut self, id: AnimatorId) -> bool {
        let pending = self.pending.shift_remove(&id).is_some();
        let delayed = self.delayed.shift_remove(&id).is_some();
        let active = self.active.shift_remove(&id).is_some();
        self.ending.shift_remove(&id);
        pending || delayed || active
    }
}

fn snapshot(set: &MemberSet) -> Snapshot {
    set.iter().map(|(id, weak)| (*id, weak.clone())).collect()
}

/// The per-context frame scheduler
pub struct AnimationScheduler {
    sets: RefCell<SchedulerSets>,
    clock: Rc<dyn FrameClock>,
}

impl AnimationScheduler {
    pub(crate) fn new(clock: Rc<dyn FrameClock>) -> Self {
        Self {
            sets: RefCell::new(SchedulerSets::default()),
            clock,
        }
    }

    // ========================================================================
    // Membership
    // ========================================================================

    pub(crate) fn add_pending(&self, animator: &ValueAnimator) {
        let mut sets = self.sets.borrow_mut();
        sets.remove(animator.id());
        sets.pending.insert(animator.id(), animator.downgrade());
    }

    pub(crate) fn admit_active(&self, animator: &ValueAnimator) {
        let mut sets = self.sets.borrow_mut();
        sets.remove(animator.id());
        sets.active.insert(animator.id(), animator.downgrade());
    }

    /// Remove from every set; returns whether it was scheduled
    pub(crate) fn remove(&self, id: AnimatorId) -> bool {
        self.sets.borrow_mut().remove(id)
    }

    /// Pending, delayed or active
    pub fn contains(&self, id: AnimatorId) -> bool {
        let sets = self.sets.borrow();
        sets.pending.contains_key(&id)
            || sets.delayed.contains_key(&id)
            || sets.active.contains_key(&id)
    }

    pub fn is_pending(&self, id: AnimatorId) -> bool {
        self.sets.borrow().pending.contains_key(&id)
    }

    pub fn is_delayed(&self, id: AnimatorId) -> bool {
        self.sets.borrow().delayed.contains_key(&id)
    }

    pub fn is_active(&self, id: AnimatorId) -> bool {
        self.sets.borrow().active.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.sets.borrow().pending.len()
    }

    pub fn delayed_count(&self) -> usize {
        self.sets.borrow().delayed.len()
    }

    pub fn active_count(&self) -> usize {
        self.sets.borrow().active.len()
    }

    pub fn last_frame_time_ms(&self) -> i64 {
        self.sets.borrow().last_frame_time_ms
    }

    pub fn is_armed(&self) -> bool {
        self.sets.borrow().armed
    }

    /// Drop every animator without notifying listeners
    ///
    /// Cleared animators end up [`Ended`](crate::Lifecycle::Ended) and can be
    /// started again.
    pub fn clear(&self) {
        let members: Vec<Weak<AnimatorCell>> = {
            let mut sets = self.sets.borrow_mut();
            let pending = std::mem::take(&mut sets.pending);
            let delayed = std::mem::take(&mut sets.delayed);
            let active = std::mem::take(&mut sets.active);
            sets.ending.clear();
            pending
                .into_values()
                .chain(delayed.into_values())
                .chain(active.into_values())
                .collect()
        };
        tracing::debug!("AnimationScheduler: clearing {} animators", members.len());
        for weak in &members {
            if let Some(animator) = ValueAnimator::from_weak(weak) {
                animator.detach();
            }
        }
    }

    // ========================================================================
    // Frame Loop
    // ========================================================================

    /// Request the next animate callback unless one is outstanding
    pub fn schedule_animation(&self) {
        let request = {
            let mut sets = self.sets.borrow_mut();
            !std::mem::replace(&mut sets.armed, true)
        };
        if request {
            self.clock.request_callback(CallbackKind::Animate);
        }
    }

    /// Entry point for a delivered animate callback
    pub(crate) fn on_animate(&self, frame_time: i64) {
        self.sets.borrow_mut().armed = false;
        self.do_animation_frame(frame_time);
    }

    /// Process one frame for every scheduled animator
    pub fn do_animation_frame(&self, frame_time: i64) {
        tracing::trace!("AnimationScheduler: frame at {}", frame_time);

        // Listeners may start more animators while pending ones are admitted
        loop {
            let pending = {
                let mut sets = self.sets.borrow_mut();
                if sets.pending.is_empty() {
                    break;
                }
                std::mem::take(&mut sets.pending)
            };
            for (id, weak) in pending {
                let Some(animator) = ValueAnimator::from_weak(&weak) else {
                    continue;
                };
                if !animator.is_started() {
                    continue;
                }
                if animator.effective_start_delay_ms() == 0 {
                    self.start_animation(&animator);
                } else {
                    animator.enter_delayed();
                    let mut sets = self.sets.borrow_mut();
                    sets.remove(id);
                    sets.delayed.insert(id, weak);
                }
            }
        }

        let delayed = snapshot(&self.sets.borrow().delayed);
        let mut ready: SmallVec<[(AnimatorId, ValueAnimator); 4]> = SmallVec::new();
        for (id, weak) in delayed {
            match ValueAnimator::from_weak(&weak) {
                Some(animator) => {
                    if animator.delay_tick(frame_time) {
                        ready.push((id, animator));
                    }
                }
                None => {
                    self.remove(id);
                }
            }
        }

        for (id, animator) in ready {
            if !self.is_delayed(id) {
                continue;
            }
            tracing::debug!("AnimationScheduler: {:?} finished its start delay", id);
            self.start_animation(&animator);
            if self.is_active(id) {
                animator.mark_running();
            }
        }

        let active = snapshot(&self.sets.borrow().active);
        for (id, weak) in active {
            if !self.is_active(id) {
                continue;
            }
            let Some(animator) = ValueAnimator::from_weak(&weak) else {
                self.remove(id);
                continue;
            };
            if animator.do_animation_frame(frame_time) {
                let mut sets = self.sets.borrow_mut();
                if sets.active.contains_key(&id) {
                    sets.ending.insert(id, weak);
                }
            }
        }

        let ending = std::mem::take(&mut self.sets.borrow_mut().ending);
        for (id, weak) in ending {
            if !self.is_active(id) {
                continue;
            }
            if let Some(animator) = ValueAnimator::from_weak(&weak) {
                animator.end_animation();
            }
        }

        self.clock.request_callback(CallbackKind::Commit);

        let more = {
            let mut sets = self.sets.borrow_mut();
            sets.last_frame_time_ms = frame_time;
            !sets.active.is_empty() || !sets.delayed.is_empty()
        };
        if more {
            self.schedule_animation();
        }
    }

    /// Apply jank compensation once the frame was committed at `commit_time`
    pub fn commit_animation_frame(&self, commit_time: i64) {
        let (adjustment, active) = {
            let sets = self.sets.borrow();
            (commit_time - sets.last_frame_time_ms, snapshot(&sets.active))
        };
        for (id, weak) in active {
            if !self.is_active(id) {
                continue;
            }
            if let Some(animator) = ValueAnimator::from_weak(&weak) {
                animator.commit_start_time(adjustment);
            }
        }
    }

    fn start_animation(&self, animator: &ValueAnimator) {
        tracing::debug!("AnimationScheduler: {:?} is now active", animator.id());
        animator.start_animation(Some(self));
    }
}
