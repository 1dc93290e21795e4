use super::{owns, AnimationLoop, LoopCtx};
use crate::constants::*;
use crate::elements::{ElementId, Repeat, Visual};
use crate::error::AnimationError;
use crate::profile::{BlinkMethod, BlinkProfile};
use crate::rig::EyePair;
use crate::scheduler::{cancel_slot, DriverHandle, DriverId, LoopKind, Scheduler};
use glam::Vec2;
use rand::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkPhase {
    /// Waiting for the next randomized blink.
    Waiting,
    Closing { second: bool },
    Opening { second: bool },
    /// Short pause before the second blink of a double blink.
    Gap,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlinkStats {
    pub cycles: u64,
    pub double_blinks: u64,
}

/// Delay until the next blink: `base ± base * jitter`, uniformly.
pub fn blink_delay(profile: &BlinkProfile, rng: &mut impl Rng) -> f64 {
    let variation = profile.base_interval * profile.jitter_ratio;
    profile.base_interval + (rng.gen::<f64>() * 2.0 - 1.0) * variation
}

/// Randomly timed eye blinks driven by one-shot timers.
///
/// A cycle is: wait, close over half the blink duration, open over the other
/// half, optionally pause and blink once more, then re-arm with a freshly
/// randomized delay.
pub struct BlinkLoop {
    eyes: EyePair,
    profile: BlinkProfile,
    rng: StdRng,
    running: bool,
    timer: Option<DriverHandle>,
    phase: BlinkPhase,
    lid_rest: [f32; 2],
    last_delay: Option<f64>,
    stats: BlinkStats,
}

impl BlinkLoop {
    pub fn new(eyes: EyePair, profile: BlinkProfile, rng: StdRng) -> Self {
        log::debug!(
            "[blink] interval={} jitter={} duration={} double={} method={:?}",
            profile.base_interval,
            profile.jitter_ratio,
            profile.blink_duration,
            profile.double_blink_probability,
            profile.visual_method
        );
        Self {
            eyes,
            profile,
            rng,
            running: false,
            timer: None,
            phase: BlinkPhase::Waiting,
            lid_rest: [0.0; 2],
            last_delay: None,
            stats: BlinkStats::default(),
        }
    }

    pub fn profile(&self) -> &BlinkProfile {
        &self.profile
    }

    /// Replace the profile; takes effect from the next scheduled step.
    pub fn update_params(&mut self, profile: BlinkProfile) {
        self.profile = profile;
        log::info!("[blink] parameters updated");
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    /// The most recently drawn inter-blink delay.
    pub fn last_delay(&self) -> Option<f64> {
        self.last_delay
    }

    pub fn stats(&self) -> BlinkStats {
        self.stats
    }

    /// Time of the next blink, if one is armed.
    pub fn next_blink_at(&self, scheduler: &Scheduler) -> Option<f64> {
        match (self.phase, &self.timer) {
            (BlinkPhase::Waiting, Some(timer)) => scheduler.due_at(timer),
            _ => None,
        }
    }

    fn schedule_next(&mut self, scheduler: &mut Scheduler) {
        let delay = blink_delay(&self.profile, &mut self.rng);
        log::debug!("[blink] next in {:.0}ms", delay);
        self.last_delay = Some(delay);
        self.phase = BlinkPhase::Waiting;
        self.timer = Some(scheduler.after(LoopKind::Blink, delay));
    }

    fn eye_ids(&self) -> [ElementId; 2] {
        [self.eyes.left, self.eyes.right]
    }

    fn close(&mut self, second: bool, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        let half = self.profile.blink_duration / 2.0;
        let now = ctx.now();
        let method = self.profile.visual_method;
        for (slot, id) in self.eye_ids().into_iter().enumerate() {
            let current = ctx.elements.resolved(id, now).ok_or(AnimationError::MissingElement {
                owner: LoopKind::Blink,
                id,
            })?;
            self.lid_rest[slot] = current.offset.y;
            let rest = self.lid_rest[slot];
            animate_eye(ctx, id, half, |v| match method {
                BlinkMethod::Opacity => v.opacity = 1.0,
                BlinkMethod::Scale => {
                    v.scale = Vec2::new(1.0, BLINK_SCALE_CLOSED_Y);
                    v.opacity = 1.0;
                }
                BlinkMethod::Offset => {
                    v.offset.y = rest + BLINK_OFFSET_DROP;
                    v.opacity = BLINK_OFFSET_OPACITY;
                }
            })?;
        }
        self.phase = BlinkPhase::Closing { second };
        self.timer = Some(ctx.scheduler.after(LoopKind::Blink, half));
        Ok(())
    }

    fn open(&mut self, second: bool, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        let half = self.profile.blink_duration / 2.0;
        let method = self.profile.visual_method;
        for (slot, id) in self.eye_ids().into_iter().enumerate() {
            let rest = self.lid_rest[slot];
            animate_eye(ctx, id, half, |v| {
                v.opacity = 0.0;
                match method {
                    BlinkMethod::Opacity => {}
                    BlinkMethod::Scale => v.scale = Vec2::ONE,
                    BlinkMethod::Offset => v.offset.y = rest,
                }
            })?;
        }
        self.phase = BlinkPhase::Opening { second };
        self.timer = Some(ctx.scheduler.after(LoopKind::Blink, half));
        Ok(())
    }
}

fn animate_eye(
    ctx: &mut LoopCtx<'_>,
    id: ElementId,
    duration: f64,
    target: impl FnOnce(&mut Visual),
) -> Result<(), AnimationError> {
    let now = ctx.now();
    ctx.elements
        .animate(id, now, duration, Repeat::Once, target)
        .ok_or(AnimationError::MissingElement {
            owner: LoopKind::Blink,
            id,
        })
}

impl AnimationLoop for BlinkLoop {
    fn kind(&self) -> LoopKind {
        LoopKind::Blink
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[blink] already running");
            return;
        }
        self.running = true;
        log::info!("[blink] started");
        self.schedule_next(ctx.scheduler);
    }

    // Eyes are left to finish their current transition; the open state is the
    // element default so a half-finished blink resolves on its own.
    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[blink] stopped");
        }
        self.running = false;
        self.phase = BlinkPhase::Waiting;
        cancel_slot(&mut self.timer, ctx.scheduler);
    }

    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        if !owns(&self.timer, driver) {
            return Ok(());
        }
        // One-shot timers are consumed by firing.
        self.timer = None;
        if !self.running {
            return Ok(());
        }
        let phase = self.phase;
        match phase {
            BlinkPhase::Waiting => {
                self.stats.cycles += 1;
                self.close(false, ctx)
            }
            BlinkPhase::Closing { second } => self.open(second, ctx),
            BlinkPhase::Opening { second: false }
                if self.rng.gen::<f64>() < self.profile.double_blink_probability =>
            {
                self.stats.double_blinks += 1;
                self.phase = BlinkPhase::Gap;
                self.timer = Some(ctx.scheduler.after(LoopKind::Blink, DOUBLE_BLINK_GAP_MS));
                Ok(())
            }
            BlinkPhase::Opening { .. } => {
                self.schedule_next(ctx.scheduler);
                Ok(())
            }
            BlinkPhase::Gap => self.close(true, ctx),
        }
    }

    fn halt(&mut self, scheduler: &mut Scheduler) {
        self.running = false;
        self.phase = BlinkPhase::Waiting;
        cancel_slot(&mut self.timer, scheduler);
    }
}
