use super::{ensure_finite, owns, AnimationLoop, LoopCtx};
use crate::constants::BREATH_DRIFT_PER_MS;
use crate::elements::ElementId;
use crate::error::AnimationError;
use crate::profile::{BreathProfile, BreathWaveform};
use crate::scheduler::{cancel_slot, DriverHandle, DriverId, LoopKind, Scheduler};
use glam::Vec2;
use std::f64::consts::TAU;

/// Position within the breathing cycle, in `[0, 1)`.
#[inline]
pub fn breath_phase(cycle_period: f64, elapsed_ms: f64) -> f64 {
    elapsed_ms.rem_euclid(cycle_period) / cycle_period
}

/// Body scale `elapsed_ms` into the cycle. Always within `[1, 1 + amount]`.
pub fn breath_scale(profile: &BreathProfile, elapsed_ms: f64) -> f32 {
    let angle = breath_phase(profile.cycle_period, elapsed_ms) * TAU;
    let wave = match profile.waveform {
        BreathWaveform::Sine => angle.sin(),
        // Time drift keeps successive cycles from repeating exactly.
        BreathWaveform::Random => (angle + elapsed_ms * BREATH_DRIFT_PER_MS).sin(),
    };
    1.0 + ((wave + 1.0) / 2.0) as f32 * profile.scale_amount()
}

/// Idle sway of the body image, rendered as a gentle uniform scale pulse.
pub struct BreathLoop {
    body: ElementId,
    profile: BreathProfile,
    running: bool,
    frame: Option<DriverHandle>,
    started_at: f64,
}

impl BreathLoop {
    pub fn new(body: ElementId, profile: BreathProfile) -> Self {
        log::debug!(
            "[breath] angle={} period={} axis={} waveform={:?}",
            profile.amplitude_angle,
            profile.cycle_period,
            profile.axis,
            profile.waveform
        );
        Self {
            body,
            profile,
            running: false,
            frame: None,
            started_at: 0.0,
        }
    }

    pub fn profile(&self) -> &BreathProfile {
        &self.profile
    }

    pub fn update_params(&mut self, profile: BreathProfile) {
        self.profile = profile;
        log::info!("[breath] parameters updated");
    }

    /// Current cycle phase in `[0, 1)`; 0 when not running.
    pub fn current_phase(&self, now_ms: f64) -> f64 {
        if !self.running {
            return 0.0;
        }
        breath_phase(self.profile.cycle_period, now_ms - self.started_at)
    }

    fn reset_scale(&self, ctx: &mut LoopCtx<'_>) {
        if let Some(v) = ctx.elements.visual_mut(self.body) {
            v.scale = Vec2::ONE;
        }
    }
}

impl AnimationLoop for BreathLoop {
    fn kind(&self) -> LoopKind {
        LoopKind::Breath
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[breath] already running");
            return;
        }
        self.running = true;
        self.started_at = ctx.now();
        self.frame = Some(ctx.scheduler.every_frame(LoopKind::Breath));
        log::info!("[breath] started");
    }

    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[breath] stopped");
        }
        self.running = false;
        cancel_slot(&mut self.frame, ctx.scheduler);
        // Unconditional: an interrupted cycle must never leave the body distorted.
        self.reset_scale(ctx);
    }

    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        if !self.running || !owns(&self.frame, driver) {
            return Ok(());
        }
        let elapsed = ctx.now() - self.started_at;
        let scale = ensure_finite(
            LoopKind::Breath,
            "body scale",
            breath_scale(&self.profile, elapsed),
        )?;
        ctx.visual(LoopKind::Breath, self.body)?.scale = Vec2::splat(scale);
        Ok(())
    }

    fn halt(&mut self, scheduler: &mut Scheduler) {
        self.running = false;
        cancel_slot(&mut self.frame, scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(angle: f32, period: f64) -> BreathProfile {
        BreathProfile {
            amplitude_angle: angle,
            cycle_period: period,
            ..BreathProfile::default()
        }
    }

    #[test]
    fn sine_scale_hits_rest_mid_and_peak() {
        let p = sine(5.0, 4000.0);
        let amount = p.scale_amount();
        assert!((amount - 0.015).abs() < 1e-6);
        assert!((breath_scale(&p, 0.0) - (1.0 + amount / 2.0)).abs() < 1e-6);
        assert!((breath_scale(&p, 1000.0) - (1.0 + amount)).abs() < 1e-6);
        assert!((breath_scale(&p, 3000.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn phase_wraps_every_period() {
        assert_eq!(breath_phase(4000.0, 0.0), 0.0);
        assert_eq!(breath_phase(4000.0, 5000.0), 0.25);
        assert_eq!(breath_phase(4000.0, 8000.0), 0.0);
    }

    #[test]
    fn random_waveform_keeps_the_same_amplitude() {
        let p = BreathProfile {
            waveform: BreathWaveform::Random,
            ..sine(10.0, 3000.0)
        };
        let amount = p.scale_amount();
        for step in 0..2_000 {
            let s = breath_scale(&p, step as f64 * 16.7);
            assert!(s >= 1.0 - 1e-6 && s <= 1.0 + amount + 1e-6, "scale {s}");
        }
    }
}
