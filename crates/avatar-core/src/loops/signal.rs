//! Mouth signal indicator.
//!
//! Two timing families drive the same row of signal elements, so they are two
//! separate types behind [`SignalDriver`]: [`ShimmerSignal`] runs a per-frame
//! oscillator per element (speaking) and [`PulseSignal`] hands one repeating
//! transition to the host (listening). An instance never changes family; the
//! coordinator replaces it instead.

use super::{ensure_finite, owns, AnimationLoop, LoopCtx};
use crate::constants::*;
use crate::elements::{ElementId, Repeat, Stroke};
use crate::error::AnimationError;
use crate::profile::MouthSignalProfile;
use crate::scheduler::{cancel_slot, DriverHandle, DriverId, LoopKind, Scheduler};
use rand::prelude::*;
use smallvec::SmallVec;
use std::f64::consts::TAU;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalMode {
    /// Independent per-element shimmer, used while speaking.
    Shimmer,
    /// All elements pulse together, used while listening.
    Pulse,
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalMode::Shimmer => "shimmer",
            SignalMode::Pulse => "pulse",
        })
    }
}

pub trait SignalDriver: AnimationLoop {
    fn mode(&self) -> SignalMode;

    fn as_loop(&self) -> &dyn AnimationLoop;

    fn as_loop_mut(&mut self) -> &mut dyn AnimationLoop;

    /// Regenerate per-element oscillation. Meaningless for synchronized modes.
    fn set_frequency_range(&mut self, _min_ms: f64, _max_ms: f64) {}
}

/// Cancel any transition and blank every signal element at once.
fn blank(signals: &[ElementId], ctx: &mut LoopCtx<'_>) {
    let now = ctx.now();
    for &id in signals {
        ctx.elements.clear_transition(id, now);
        ctx.elements.set_opacity(id, 0.0);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oscillator {
    /// Full sine period in milliseconds.
    pub period: f64,
    /// Phase offset in radians, `[0, 2π)`.
    pub phase: f64,
}

impl Oscillator {
    fn random(min_ms: f64, max_ms: f64, rng: &mut impl Rng) -> Self {
        Self {
            period: min_ms + rng.gen::<f64>() * (max_ms - min_ms),
            phase: rng.gen::<f64>() * TAU,
        }
    }

    /// Intensity in `[0.4, 1.0]`.
    pub fn intensity(&self, elapsed_ms: f64) -> f32 {
        let wave = (elapsed_ms / self.period * TAU + self.phase).sin();
        SHIMMER_FLOOR + SHIMMER_SPAN * (0.5 + 0.5 * wave) as f32
    }
}

pub struct ShimmerSignal {
    signals: SmallVec<[ElementId; 16]>,
    profile: MouthSignalProfile,
    oscillators: SmallVec<[Oscillator; 16]>,
    rng: StdRng,
    running: bool,
    frame: Option<DriverHandle>,
    started_at: f64,
}

impl ShimmerSignal {
    pub fn new(signals: SmallVec<[ElementId; 16]>, profile: MouthSignalProfile, mut rng: StdRng) -> Self {
        let oscillators = signals
            .iter()
            .map(|_| Oscillator::random(profile.min_frequency, profile.max_frequency, &mut rng))
            .collect();
        Self {
            signals,
            profile,
            oscillators,
            rng,
            running: false,
            frame: None,
            started_at: 0.0,
        }
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    pub fn profile(&self) -> &MouthSignalProfile {
        &self.profile
    }

    pub fn is_paused(&self) -> bool {
        self.running && self.frame.is_none()
    }
}

impl AnimationLoop for ShimmerSignal {
    fn kind(&self) -> LoopKind {
        LoopKind::MouthSignal
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[signal] shimmer already running");
            return;
        }
        // A leftover host transition would fight the frame driver.
        let now = ctx.now();
        for &id in &self.signals {
            ctx.elements.clear_transition(id, now);
        }
        self.running = true;
        self.started_at = now;
        self.frame = Some(ctx.scheduler.every_frame(LoopKind::MouthSignal));
        log::info!("[signal] shimmer started ({} elements)", self.signals.len());
    }

    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[signal] shimmer stopped");
        }
        self.running = false;
        cancel_slot(&mut self.frame, ctx.scheduler);
        blank(&self.signals, ctx);
    }

    fn on_fire(&mut self, driver: DriverId, ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        if !self.running || !owns(&self.frame, driver) {
            return Ok(());
        }
        let elapsed = ctx.now() - self.started_at;
        for (&id, osc) in self.signals.iter().zip(&self.oscillators) {
            let opacity = ensure_finite(LoopKind::MouthSignal, "signal intensity", osc.intensity(elapsed))?;
            ctx.visual(LoopKind::MouthSignal, id)?.opacity = opacity;
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
            self.frame = Some(scheduler.every_frame(LoopKind::MouthSignal));
        }
    }
}

impl SignalDriver for ShimmerSignal {
    fn mode(&self) -> SignalMode {
        SignalMode::Shimmer
    }

    fn as_loop(&self) -> &dyn AnimationLoop {
        self
    }

    fn as_loop_mut(&mut self) -> &mut dyn AnimationLoop {
        self
    }

    fn set_frequency_range(&mut self, min_ms: f64, max_ms: f64) {
        let (lo, hi) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        self.profile.min_frequency = lo;
        self.profile.max_frequency = hi;
        let rng = &mut self.rng;
        for osc in self.oscillators.iter_mut() {
            *osc = Oscillator::random(lo, hi, rng);
        }
        log::info!("[signal] frequency range {lo}-{hi}ms");
    }
}

/// Synchronized pulse. The host runs the repeating transition, so this loop
/// never holds a scheduler driver.
pub struct PulseSignal {
    signals: SmallVec<[ElementId; 16]>,
    running: bool,
}

impl PulseSignal {
    pub fn new(signals: SmallVec<[ElementId; 16]>) -> Self {
        Self {
            signals,
            running: false,
        }
    }
}

impl AnimationLoop for PulseSignal {
    fn kind(&self) -> LoopKind {
        LoopKind::MouthSignal
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::warn!("[signal] pulse already running");
            return;
        }
        let now = ctx.now();
        for &id in &self.signals {
            ctx.elements.clear_transition(id, now);
            ctx.elements.set_fill(id, PULSE_FILL);
            ctx.elements.set_stroke(
                id,
                Stroke {
                    color: SIGNAL_STROKE.to_string(),
                    width: SIGNAL_STROKE_WIDTH,
                    opacity: PULSE_HIGH,
                },
            );
            ctx.elements.set_opacity(id, PULSE_HIGH);
            ctx.elements
                .animate(id, now, PULSE_HALF_PERIOD_MS, Repeat::PingPong, |v| {
                    v.opacity = PULSE_LOW
                });
        }
        self.running = true;
        log::info!("[signal] pulse started ({} elements)", self.signals.len());
    }

    fn stop(&mut self, ctx: &mut LoopCtx<'_>) {
        if self.running {
            log::info!("[signal] pulse stopped");
        }
        self.running = false;
        blank(&self.signals, ctx);
    }

    fn on_fire(&mut self, _driver: DriverId, _ctx: &mut LoopCtx<'_>) -> Result<(), AnimationError> {
        Ok(())
    }

    fn halt(&mut self, _scheduler: &mut Scheduler) {
        self.running = false;
    }
}

impl SignalDriver for PulseSignal {
    fn mode(&self) -> SignalMode {
        SignalMode::Pulse
    }

    fn as_loop(&self) -> &dyn AnimationLoop {
        self
    }

    fn as_loop_mut(&mut self) -> &mut dyn AnimationLoop {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementRecord, ElementRole, ElementSet};
    use glam::Vec2;

    fn row(set: &mut ElementSet, n: usize) -> SmallVec<[ElementId; 16]> {
        (0..n)
            .map(|i| {
                let center = Vec2::new(100.0 + i as f32 * SIGNAL_SPACING, 180.0);
                set.push(
                    ElementRecord::circle(ElementRole::MouthSignal, center, SIGNAL_SIZE, SIGNAL_FILL)
                        .with_opacity(0.0),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn oscillators_respect_the_frequency_range() {
        let mut set = ElementSet::new();
        let ids = row(&mut set, 12);
        let profile = MouthSignalProfile {
            min_frequency: 250.0,
            max_frequency: 400.0,
        };
        let mut shimmer = ShimmerSignal::new(ids, profile, StdRng::seed_from_u64(9));
        for osc in shimmer.oscillators() {
            assert!((250.0..=400.0).contains(&osc.period));
            assert!((0.0..TAU).contains(&osc.phase));
        }
        shimmer.set_frequency_range(900.0, 800.0);
        for osc in shimmer.oscillators() {
            assert!((800.0..=900.0).contains(&osc.period));
        }
    }

    #[test]
    fn shimmer_intensity_stays_in_band() {
        let osc = Oscillator {
            period: 300.0,
            phase: 1.0,
        };
        for step in 0..1_000 {
            let v = osc.intensity(step as f64 * 7.3);
            assert!((0.4 - 1e-6..=1.0 + 1e-6).contains(&v), "intensity {v}");
        }
    }

    #[test]
    fn pulse_hands_a_ping_pong_transition_to_the_host() {
        let mut scheduler = Scheduler::new();
        let mut set = ElementSet::new();
        let ids = row(&mut set, 4);
        let mut pulse = PulseSignal::new(ids.clone());
        let mut ctx = LoopCtx {
            scheduler: &mut scheduler,
            elements: &mut set,
        };
        pulse.start(&mut ctx);
        assert_eq!(ctx.scheduler.pending_count(), 0);
        assert_eq!(ctx.elements.active_transitions(), 4);
        let first = ctx.elements.get(ids[0]).unwrap();
        assert_eq!(first.fill, PULSE_FILL);
        assert_eq!(ctx.elements.resolved(ids[0], 0.0).unwrap().opacity, PULSE_HIGH);
        assert!((ctx.elements.resolved(ids[2], 700.0).unwrap().opacity - PULSE_LOW).abs() < 1e-6);

        pulse.stop(&mut ctx);
        assert_eq!(ctx.elements.active_transitions(), 0);
        for &id in &ids {
            assert_eq!(ctx.elements.resolved(id, 350.0).unwrap().opacity, 0.0);
        }
    }
}
