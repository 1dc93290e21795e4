use super::{ensure_finite, owns, AnimationLoop, LoopCtx};
use crate::elements::ElementId;
use crate::error::AnimationError;
use crate::profile::{LightsPattern, LightsProfile};
use crate::scheduler::{cancel_slot, DriverHandle, DriverId, LoopKind, Scheduler};
use smallvec::SmallVec;
use std::f64::consts::TAU;

/// Opacity shared by every light `elapsed_ms` after start.
pub fn lights_opacity(profile: &LightsProfile, elapsed_ms: f64) -> f32 {
    match profile.pattern {
        LightsPattern::Static => profile.intensity,
        LightsPattern::Pulse => {
            let phase = elapsed_ms.rem_euclid(profile.period) / profile.period;
            profile.intensity * (0.5 + 0.5 * (phase * TAU).sin()) as f32
        }
    }
}

/// Ambient body lights pulsing in one shared phase.
pub struct LightsLoop {
    lights: SmallVec<[ElementId; 8]>,
    profile: LightsProfile,
    running: bool,
    frame: Option<DriverHandle>,
    started_at: f64,
}

impl LightsLoop {
    pub fn new(lights: SmallVec<[ElementId; 8]>, profile: LightsProfile) -> Self {
        log::debug!(
            "[lights] count={} pattern={:?} period={} intensity={}",
            lights.len(),
            profile.pattern,
            profile.period,
            profile.intensity
        );
        Self {
            lights,
            profile,
            running: false,
            frame: None,
            started_at: 0.0,
        }
    }

    pub fn profile(&self) -> &LightsProfile {
        &self.profile
    }

    pub fn update_params(&mut self, profile: LightsProfile) {
        self.profile = profile;
        log::info!("[lights] parameters updated");
    }

    pub fn is_paused(&self) -> bool {
        self.running && self.frame.is_none()
    }
}

impl AnimationLoop for LightsLoop {
    fn kind(&self) -> LoopKind {
        LoopKind::Lights
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[lights] already running");
            return;
        }
        self.running = true;
        self.started_at = ctx.now();
        self.frame = Some(ctx.scheduler.every_frame(LoopKind::Lights));
        log::info!("[lights] started");
    }

    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[lights] stopped");
        }
        self.running = false;
        cancel_slot(&mut self.frame, ctx.scheduler);
        for &id in &self.lights {
            ctx.elements.set_opacity(id, 0.0);
        }
    }

    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        if !self.running || !owns(&self.frame, driver) {
            return Ok(());
        }
        let opacity = ensure_finite(
            LoopKind::Lights,
            "light opacity",
            lights_opacity(&self.profile, ctx.now() - self.started_at),
        )?;
        for &id in &self.lights {
            ctx.visual(LoopKind::Lights, id)?.opacity = opacity;
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
            self.frame = Some(scheduler.every_frame(LoopKind::Lights));
        }
    }
}
