//! The five animation loops and the capability they share.
//!
//! Each loop owns a disjoint subset of element handles and at most one
//! scheduled driver. Callbacks arrive through [`AnimationLoop::on_fire`]; a
//! step that returns an error is halted by the coordinator without touching
//! sibling loops.

pub mod blink;
pub mod breath;
pub mod equalizer;
pub mod lights;
pub mod signal;

pub use blink::*;
pub use breath::*;
pub use equalizer::*;
pub use lights::*;
pub use signal::*;

use crate::elements::{ElementId, ElementSet, Visual};
use crate::error::AnimationError;
use crate::scheduler::{DriverHandle, DriverId, LoopKind, Scheduler};

/// What a loop may touch while handling a callback or a control call.
pub struct LoopCtx<'a> {
    pub scheduler: &'a mut Scheduler,
    pub elements: &'a mut ElementSet,
}

impl LoopCtx<'_> {
    #[inline]
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    pub(crate) fn visual(
        &mut self,
        owner: LoopKind,
        id: ElementId,
    ) -> Result<&mut Visual, AnimationError> {
        self.elements
            .visual_mut(id)
            .ok_or(AnimationError::MissingElement { owner, id })
    }
}

pub trait AnimationLoop {
    fn kind(&self) -> LoopKind;

    fn is_running(&self) -> bool;

    /// Start the loop. A second call while running only logs a warning.
    fn start(&mut self, ctx: &mut LoopCtx<'_>);

    /// Stop the loop and leave its elements at their terminal values.
    /// Safe to call redundantly and from any state.
    fn stop(&mut self, ctx: &mut LoopCtx<'_>);

    /// One of this loop's drivers fired.
    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError>;

    /// Cancel scheduling after a failed step, leaving visuals untouched.
    fn halt(&mut self, scheduler: &mut Scheduler);

    /// Suspend the driver while keeping the running flag and element state.
    fn pause(&mut self, _scheduler: &mut Scheduler) {}

    fn resume(&mut self, _scheduler: &mut Scheduler) {}
}

#[inline]
pub(crate) fn owns(slot: &Option<DriverHandle>, driver: DriverId) -> bool {
    slot.as_ref().map(DriverHandle::id) == Some(driver)
}

#[inline]
pub(crate) fn ensure_finite(owner: LoopKind, what: &'static str, v: f32) -> Result<f32, AnimationError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AnimationError::NonFinite { owner, what })
    }
}
