use super::{ensure_finite, owns, AnimationLoop, LoopCtx};
use crate::constants::*;
use crate::error::AnimationError;
use crate::profile::EqualizerProfile;
use crate::rig::DisplayHandles;
use crate::scheduler::{cancel_slot, DriverHandle, DriverId, LoopKind, Scheduler};
use rand::prelude::*;
use smallvec::SmallVec;

/// One damping step towards `target`. Returns the new height and whether the
/// bar has arrived (snapped).
#[inline]
pub fn approach(current: f32, target: f32) -> (f32, bool) {
    let diff = target - current;
    if diff.abs() > EQ_SNAP_THRESHOLD {
        (current + diff * EQ_DAMPING, false)
    } else {
        (target, true)
    }
}

/// "Thinking" display: bars chase random target heights and pick a fresh
/// batch once every bar has arrived.
pub struct EqualizerLoop {
    display: DisplayHandles,
    profile: EqualizerProfile,
    rng: StdRng,
    running: bool,
    frame: Option<DriverHandle>,
    current: SmallVec<[f32; 16]>,
    targets: SmallVec<[f32; 16]>,
    batches: u64,
}

impl EqualizerLoop {
    pub fn new(display: DisplayHandles, profile: EqualizerProfile, rng: StdRng) -> Self {
        let n = display.bars.len();
        let floor = display.min_height;
        Self {
            current: SmallVec::from_elem(floor, n),
            targets: SmallVec::from_elem(floor, n),
            display,
            profile,
            rng,
            running: false,
            frame: None,
            batches: 0,
        }
    }

    pub fn profile(&self) -> &EqualizerProfile {
        &self.profile
    }

    pub fn heights(&self) -> &[f32] {
        &self.current
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Target batches generated since construction.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn is_paused(&self) -> bool {
        self.running && self.frame.is_none()
    }

    fn generate_targets(&mut self) {
        let (lo, hi) = (self.display.min_height, self.display.max_height);
        for t in self.targets.iter_mut() {
            *t = lo + self.rng.gen::<f32>() * (hi - lo);
        }
        self.batches += 1;
        log::debug!("[equalizer] batch {} targets={:?}", self.batches, self.targets);
    }

    fn set_visible(&self, ctx: &mut LoopCtx<'_>, opacity: f32) {
        ctx.elements.set_opacity(self.display.background, opacity);
        for &bar in &self.display.bars {
            ctx.elements.set_opacity(bar, opacity);
        }
    }
}

impl AnimationLoop for EqualizerLoop {
    fn kind(&self) -> LoopKind {
        LoopKind::Equalizer
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[equalizer] already running");
            return;
        }
        self.running = true;
        self.set_visible(ctx, EQ_DISPLAY_OPACITY);
        self.generate_targets();
        self.frame = Some(ctx.scheduler.every_frame(LoopKind::Equalizer));
        log::info!("[equalizer] started");
    }

    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[equalizer] stopped");
        }
        self.running = false;
        cancel_slot(&mut self.frame, ctx.scheduler);
        self.set_visible(ctx, 0.0);
    }

    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        if !self.running || !owns(&self.frame, driver) {
            return Ok(());
        }
        let mut settled = true;
        for (i, &bar) in self.display.bars.iter().enumerate() {
            let (height, arrived) = approach(self.current[i], self.targets[i]);
            let height = ensure_finite(LoopKind::Equalizer, "bar height", height)?;
            self.current[i] = height;
            ctx.visual(LoopKind::Equalizer, bar)?.size.y = height;
            settled &= arrived;
        }
        if settled {
            self.generate_targets();
        }
        Ok(())
    }

    fn halt(&mut self, scheduler: &mut Scheduler) {
        self.running = false;
        cancel_slot(&mut self.frame, scheduler);
    }

    fn pause(&mut self, scheduler: &mut Scheduler) {
        cancel_slot(&mut self.frame, scheduler);
    }

    fn resume(&mut self, scheduler: &mut Scheduler) {
        if self.running && self.frame.is_none() {
            self.frame = Some(scheduler.every_frame(LoopKind::Equalizer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approach_damps_then_snaps() {
        let (h, arrived) = approach(4.0, 14.0);
        assert!(!arrived);
        assert!((h - 5.5).abs() < 1e-6);

        let (h, arrived) = approach(13.6, 14.0);
        assert!(arrived);
        assert_eq!(h, 14.0);
    }

    #[test]
    fn approach_converges_within_a_bounded_number_of_frames() {
        let mut h = 4.0;
        let mut frames = 0;
        loop {
            let (next, arrived) = approach(h, 14.0);
            h = next;
            frames += 1;
            if arrived {
                break;
            }
            assert!(frames < 100);
        }
        assert_eq!(h, 14.0);
    }
}
