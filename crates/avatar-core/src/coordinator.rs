//! The living avatar: owns the element arena and the five loops, and maps
//! interaction states onto the two state-dependent loops.

use crate::descriptor::{AvatarDescriptor, PersonalityDescriptor};
use crate::elements::{ElementId, ElementSet, Visual};
use crate::error::{InitError, ProfileError};
use crate::loops::*;
use crate::profile::AnimationProfiles;
use crate::provider::AvatarDataProvider;
use crate::rig::{self, Rig};
use crate::scheduler::{DriverId, LoopKind, Scheduler};
use glam::Vec2;
use rand::prelude::*;
use smallvec::SmallVec;
use std::fmt;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
    /// A name the host sent that maps to no state. Loops are left untouched.
    Unrecognized(String),
}

impl InteractionState {
    pub fn parse(name: &str) -> Self {
        match name {
            "idle" => Self::Idle,
            "listening" => Self::Listening,
            "thinking" => Self::Thinking,
            "speaking" => Self::Speaking,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
            Self::Unrecognized(name) => name,
        }
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The host container the avatar draws onto.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub id: String,
    pub size: Vec2,
}

impl Surface {
    pub fn new(id: &str, size: Vec2) -> Self {
        Self {
            id: id.to_string(),
            size,
        }
    }

    pub fn square(id: &str, side: f32) -> Self {
        Self::new(id, Vec2::splat(side))
    }

    fn validate(&self) -> Result<(), InitError> {
        let usable = self.size.is_finite() && self.size.x > 0.0 && self.size.y > 0.0;
        if self.id.trim().is_empty() || !usable {
            return Err(InitError::InvalidContainer(self.id.clone()));
        }
        Ok(())
    }
}

/// What `destroy` tore down.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Teardown {
    /// Loops that were running when destroy was called.
    pub stopped: SmallVec<[LoopKind; 5]>,
    /// Drivers still armed after every loop stopped. Always 0 unless a loop
    /// leaks its driver.
    pub pending_drivers: usize,
}

/// Point-in-time summary for the host and for logging.
#[derive(Clone, Debug, PartialEq)]
pub struct AvatarSnapshot {
    pub state: InteractionState,
    pub now_ms: f64,
    pub running: SmallVec<[LoopKind; 5]>,
    pub signal_mode: Option<SignalMode>,
    pub pending_drivers: usize,
    pub active_transitions: usize,
    pub blinks: u64,
    pub double_blinks: u64,
    pub equalizer_batches: u64,
}

impl fmt::Display for AvatarSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.0}ms state={} running={:?} signal={} drivers={} transitions={} blinks={}/{} eq_batches={}",
            self.now_ms,
            self.state,
            self.running,
            self.signal_mode.map_or("-".to_string(), |m| m.to_string()),
            self.pending_drivers,
            self.active_transitions,
            self.blinks,
            self.double_blinks,
            self.equalizer_batches
        )
    }
}

const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const SPAWN_MIX: u64 = 0xD1B5_4A32_D192_ED03;

/// Independent RNG per loop derived from the avatar seed.
fn loop_rng(seed: u64, kind: LoopKind, spawn: u64) -> StdRng {
    let mix = seed
        ^ (kind.index() as u64 + 1).wrapping_mul(SEED_MIX)
        ^ spawn.wrapping_mul(SPAWN_MIX);
    StdRng::seed_from_u64(mix)
}

#[derive(Default)]
struct Loops {
    blink: Option<BlinkLoop>,
    breath: Option<BreathLoop>,
    lights: Option<LightsLoop>,
    equalizer: Option<EqualizerLoop>,
    signal: Option<Box<dyn SignalDriver>>,
}

impl Loops {
    fn get(&self, kind: LoopKind) -> Option<&dyn AnimationLoop> {
        match kind {
            LoopKind::Blink => self.blink.as_ref().map(|l| l as &dyn AnimationLoop),
            LoopKind::Breath => self.breath.as_ref().map(|l| l as &dyn AnimationLoop),
            LoopKind::Lights => self.lights.as_ref().map(|l| l as &dyn AnimationLoop),
            LoopKind::Equalizer => self.equalizer.as_ref().map(|l| l as &dyn AnimationLoop),
            LoopKind::MouthSignal => self.signal.as_deref().map(|s| s.as_loop()),
        }
    }

    fn get_mut(&mut self, kind: LoopKind) -> Option<&mut dyn AnimationLoop> {
        match kind {
            LoopKind::Blink => self.blink.as_mut().map(|l| l as &mut dyn AnimationLoop),
            LoopKind::Breath => self.breath.as_mut().map(|l| l as &mut dyn AnimationLoop),
            LoopKind::Lights => self.lights.as_mut().map(|l| l as &mut dyn AnimationLoop),
            LoopKind::Equalizer => self.equalizer.as_mut().map(|l| l as &mut dyn AnimationLoop),
            LoopKind::MouthSignal => self.signal.as_deref_mut().map(|s| s.as_loop_mut()),
        }
    }

    fn running(&self) -> SmallVec<[LoopKind; 5]> {
        LoopKind::ALL
            .into_iter()
            .filter(|&k| self.get(k).is_some_and(|l| l.is_running()))
            .collect()
    }
}

struct Runtime {
    avatar: AvatarDescriptor,
    personality: PersonalityDescriptor,
    elements: ElementSet,
    rig: Rig,
    scheduler: Scheduler,
    loops: Loops,
    seed: u64,
    signal_spawns: u64,
}

impl Runtime {
    fn with_loop<R>(
        &mut self,
        kind: LoopKind,
        f: impl FnOnce(&mut dyn AnimationLoop, &mut LoopCtx<'_>) -> R,
    ) -> Option<R> {
        let Runtime {
            loops,
            scheduler,
            elements,
            ..
        } = self;
        let anim = loops.get_mut(kind)?;
        let mut ctx = LoopCtx {
            scheduler,
            elements,
        };
        Some(f(anim, &mut ctx))
    }

    fn start(&mut self, kind: LoopKind) {
        self.with_loop(kind, |anim, ctx| anim.start(ctx));
    }

    fn stop(&mut self, kind: LoopKind) {
        self.with_loop(kind, |anim, ctx| anim.stop(ctx));
    }

    fn build_continuous(&mut self, kind: LoopKind) {
        let profiles = &self.personality.animations;
        match kind {
            LoopKind::Blink if profiles.eyes_blink.enabled => {
                self.loops.blink = Some(BlinkLoop::new(
                    self.rig.eyes,
                    profiles.eyes_blink.clone(),
                    loop_rng(self.seed, kind, 0),
                ));
            }
            LoopKind::Breath if profiles.head_idle_swaying.enabled => {
                self.loops.breath = Some(BreathLoop::new(
                    self.rig.body,
                    profiles.head_idle_swaying.clone(),
                ));
            }
            LoopKind::Lights if profiles.lights_pulse.enabled => {
                self.loops.lights = Some(LightsLoop::new(
                    self.rig.lights.clone(),
                    profiles.lights_pulse.clone(),
                ));
            }
            _ => log::info!("[avatar] {:?} disabled", kind),
        }
    }

    fn ensure_equalizer(&mut self) -> bool {
        if self.loops.equalizer.is_some() {
            return true;
        }
        let Some(display) = &self.rig.display else {
            log::warn!("[avatar] thinking requested but the avatar has no display");
            return false;
        };
        self.loops.equalizer = Some(EqualizerLoop::new(
            display.clone(),
            self.personality.animations.equalizer.clone(),
            loop_rng(self.seed, LoopKind::Equalizer, 0),
        ));
        true
    }

    /// Make sure the live signal instance runs in `mode`, replacing an
    /// instance of the other family.
    fn ensure_signal(&mut self, mode: SignalMode) {
        if self.loops.signal.as_ref().is_some_and(|s| s.mode() == mode) {
            return;
        }
        if let Some(mut old) = self.loops.signal.take() {
            let mut ctx = LoopCtx {
                scheduler: &mut self.scheduler,
                elements: &mut self.elements,
            };
            old.stop(&mut ctx);
        }
        self.signal_spawns += 1;
        let signals = self.rig.mouth.clone();
        let fresh: Box<dyn SignalDriver> = match mode {
            SignalMode::Shimmer => Box::new(ShimmerSignal::new(
                signals,
                self.personality.animations.mouth_signal.clone(),
                loop_rng(self.seed, LoopKind::MouthSignal, self.signal_spawns),
            )),
            SignalMode::Pulse => Box::new(PulseSignal::new(signals)),
        };
        log::debug!("[avatar] new {mode} signal instance #{}", self.signal_spawns);
        self.loops.signal = Some(fresh);
    }

    fn enter(&mut self, state: &InteractionState) {
        match state {
            InteractionState::Idle => {
                self.stop(LoopKind::Equalizer);
                self.stop(LoopKind::MouthSignal);
            }
            InteractionState::Listening => {
                self.stop(LoopKind::Equalizer);
                self.ensure_signal(SignalMode::Pulse);
                self.start(LoopKind::MouthSignal);
            }
            InteractionState::Thinking => {
                self.stop(LoopKind::MouthSignal);
                if self.ensure_equalizer() {
                    self.start(LoopKind::Equalizer);
                }
            }
            InteractionState::Speaking => {
                self.stop(LoopKind::Equalizer);
                self.ensure_signal(SignalMode::Shimmer);
                self.start(LoopKind::MouthSignal);
            }
            InteractionState::Unrecognized(name) => {
                log::warn!("[avatar] unknown state `{name}`; loops unchanged");
            }
        }
    }

    fn dispatch(&mut self, owner: LoopKind, driver: DriverId) {
        let failed = self.with_loop(owner, |anim, ctx| match anim.on_fire(driver, ctx) {
            Ok(()) => false,
            Err(err) => {
                log::error!("[avatar] {:?} step failed, loop halted: {err}", owner);
                anim.halt(ctx.scheduler);
                true
            }
        });
        if failed.is_none() {
            log::debug!("[avatar] driver {:?} fired for absent {:?} loop", driver, owner);
        }
    }

    /// Fire due timers in order, then run every live frame driver once at
    /// `until_ms`, then commit finished host transitions.
    fn run_until(&mut self, until_ms: f64) {
        while let Some(firing) = self.scheduler.pop_due(until_ms) {
            self.dispatch(firing.owner, firing.id);
        }
        self.scheduler.advance_to(until_ms);
        for (id, owner) in self.scheduler.frame_drivers() {
            // An earlier step in this frame may have cancelled it.
            if self.scheduler.is_live(id) {
                self.dispatch(owner, id);
            }
        }
        self.elements.settle(self.scheduler.now());
    }

    fn apply_profiles(&mut self, profiles: AnimationProfiles) {
        let signal_changed = self.personality.animations.mouth_signal != profiles.mouth_signal;
        self.personality.animations = profiles;
        let fresh = self.personality.animations.clone();
        for kind in [LoopKind::Blink, LoopKind::Breath, LoopKind::Lights] {
            let enabled = match kind {
                LoopKind::Blink => fresh.eyes_blink.enabled,
                LoopKind::Breath => fresh.head_idle_swaying.enabled,
                _ => fresh.lights_pulse.enabled,
            };
            let exists = self.loops.get(kind).is_some();
            match (exists, enabled) {
                (false, true) => {
                    self.build_continuous(kind);
                    self.start(kind);
                }
                (true, false) => {
                    self.stop(kind);
                    match kind {
                        LoopKind::Blink => self.loops.blink = None,
                        LoopKind::Breath => self.loops.breath = None,
                        _ => self.loops.lights = None,
                    }
                    log::info!("[avatar] {:?} disabled", kind);
                }
                _ => {}
            }
        }
        if let Some(blink) = self.loops.blink.as_mut() {
            blink.update_params(fresh.eyes_blink.clone());
        }
        if let Some(breath) = self.loops.breath.as_mut() {
            breath.update_params(fresh.head_idle_swaying.clone());
        }
        if let Some(lights) = self.loops.lights.as_mut() {
            lights.update_params(fresh.lights_pulse.clone());
        }
        // Regenerating draws fresh oscillators, so only do it on a real change.
        if let Some(signal) = self.loops.signal.as_mut().filter(|_| signal_changed) {
            signal.set_frequency_range(
                fresh.mouth_signal.min_frequency,
                fresh.mouth_signal.max_frequency,
            );
        }
    }
}

enum Lifecycle {
    Constructed,
    Live(Box<Runtime>),
    Destroyed,
}

/// Animated avatar driven by the host through `set_state` and `tick`.
///
/// Construction is pure; `init` loads descriptors, builds the element arena
/// and starts the enabled continuous loops (blink, breath, lights). The
/// equalizer and mouth signal loops follow the interaction state.
pub struct LivingAvatar {
    avatar_id: String,
    personality_id: String,
    seed: Option<u64>,
    state: InteractionState,
    lifecycle: Lifecycle,
}

impl LivingAvatar {
    pub fn new(avatar_id: &str, personality_id: &str) -> Self {
        Self {
            avatar_id: avatar_id.to_string(),
            personality_id: personality_id.to_string(),
            seed: None,
            state: InteractionState::Idle,
            lifecycle: Lifecycle::Constructed,
        }
    }

    /// Fix the seed every loop RNG is derived from.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn init(
        &mut self,
        surface: &Surface,
        provider: &dyn AvatarDataProvider,
    ) -> Result<(), InitError> {
        match self.lifecycle {
            Lifecycle::Constructed => {}
            Lifecycle::Live(_) => return Err(InitError::AlreadyInitialized),
            Lifecycle::Destroyed => return Err(InitError::Destroyed),
        }
        surface.validate()?;
        let avatar = provider.avatar(&self.avatar_id)?;
        let personality = provider.personality(&self.personality_id)?;
        personality.animations.validate()?;
        let (elements, rig) = rig::build(&avatar, surface.size)?;
        let seed = self.seed.unwrap_or_else(rand::random);

        let mut rt = Box::new(Runtime {
            avatar,
            personality,
            elements,
            rig,
            scheduler: Scheduler::new(),
            loops: Loops::default(),
            seed,
            signal_spawns: 0,
        });
        for kind in [LoopKind::Blink, LoopKind::Breath, LoopKind::Lights] {
            rt.build_continuous(kind);
            rt.start(kind);
        }
        log::info!(
            "[avatar] `{}` ({}) ready on `{}`: {} elements, seed={}",
            self.avatar_id,
            self.personality_id,
            surface.id,
            rt.elements.len(),
            seed
        );
        self.state = InteractionState::Idle;
        self.lifecycle = Lifecycle::Live(rt);
        Ok(())
    }

    /// Parse a state name and transition. Unknown names are recorded and
    /// warned about without touching any loop.
    pub fn set_state(&mut self, name: &str) {
        self.transition(InteractionState::parse(name));
    }

    pub fn transition(&mut self, next: InteractionState) {
        let Lifecycle::Live(rt) = &mut self.lifecycle else {
            log::warn!("[avatar] state `{next}` ignored: avatar is not live");
            return;
        };
        log::info!("[avatar] state {} -> {}", self.state, next);
        rt.enter(&next);
        self.state = next;
    }

    /// Advance the virtual clock by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        let until = self.now() + dt.as_nanos() as f64 / 1e6;
        self.advance_to(until);
    }

    /// Advance the virtual clock to `now_ms`. Never moves backwards.
    pub fn advance_to(&mut self, now_ms: f64) {
        if let Lifecycle::Live(rt) = &mut self.lifecycle {
            rt.run_until(now_ms);
        }
    }

    /// Validate and push new profiles into the live loops.
    pub fn update_profiles(&mut self, profiles: AnimationProfiles) -> Result<(), ProfileError> {
        profiles.validate()?;
        match &mut self.lifecycle {
            Lifecycle::Live(rt) => {
                rt.apply_profiles(profiles);
                log::info!("[avatar] profiles updated");
            }
            _ => log::warn!("[avatar] profile update ignored: avatar is not live"),
        }
        Ok(())
    }

    /// Active personality's animation profiles.
    pub fn animation_params(&self) -> Option<&AnimationProfiles> {
        self.runtime().map(|rt| &rt.personality.animations)
    }

    /// Suspend a loop's driver without stopping it. Returns false when the
    /// loop does not exist.
    pub fn pause_loop(&mut self, kind: LoopKind) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Live(rt) => rt
                .with_loop(kind, |anim, ctx| anim.pause(ctx.scheduler))
                .is_some(),
            _ => false,
        }
    }

    pub fn resume_loop(&mut self, kind: LoopKind) -> bool {
        match &mut self.lifecycle {
            Lifecycle::Live(rt) => rt
                .with_loop(kind, |anim, ctx| anim.resume(ctx.scheduler))
                .is_some(),
            _ => false,
        }
    }

    /// Stop every loop and release the element arena. The avatar cannot be
    /// re-initialized afterwards.
    pub fn destroy(&mut self) -> Teardown {
        let mut teardown = Teardown::default();
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Destroyed) {
            Lifecycle::Live(mut rt) => {
                for kind in LoopKind::ALL {
                    let was_running = rt.with_loop(kind, |anim, ctx| {
                        let running = anim.is_running();
                        anim.stop(ctx);
                        running
                    });
                    if was_running == Some(true) {
                        teardown.stopped.push(kind);
                    }
                }
                teardown.pending_drivers = rt.scheduler.pending_count();
                log::info!(
                    "[avatar] `{}` destroyed, stopped {:?}",
                    self.avatar_id,
                    teardown.stopped
                );
            }
            Lifecycle::Constructed => log::info!("[avatar] `{}` destroyed before init", self.avatar_id),
            Lifecycle::Destroyed => log::warn!("[avatar] `{}` already destroyed", self.avatar_id),
        }
        teardown
    }

    fn runtime(&self) -> Option<&Runtime> {
        match &self.lifecycle {
            Lifecycle::Live(rt) => Some(&**rt),
            _ => None,
        }
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    pub fn personality_id(&self) -> &str {
        &self.personality_id
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Destroyed)
    }

    /// Seed in use once initialized.
    pub fn seed(&self) -> Option<u64> {
        self.runtime().map(|rt| rt.seed)
    }

    pub fn now(&self) -> f64 {
        self.runtime().map_or(0.0, |rt| rt.scheduler.now())
    }

    pub fn avatar(&self) -> Option<&AvatarDescriptor> {
        self.runtime().map(|rt| &rt.avatar)
    }

    pub fn elements(&self) -> Option<&ElementSet> {
        self.runtime().map(|rt| &rt.elements)
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.runtime().map(|rt| &rt.rig)
    }

    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.runtime().map(|rt| &rt.scheduler)
    }

    /// An element's visual state as drawn right now.
    pub fn visual(&self, id: ElementId) -> Option<Visual> {
        let rt = self.runtime()?;
        rt.elements.resolved(id, rt.scheduler.now())
    }

    pub fn is_running(&self, kind: LoopKind) -> bool {
        self.runtime()
            .and_then(|rt| rt.loops.get(kind))
            .is_some_and(|l| l.is_running())
    }

    pub fn blink(&self) -> Option<&BlinkLoop> {
        self.runtime().and_then(|rt| rt.loops.blink.as_ref())
    }

    pub fn breath(&self) -> Option<&BreathLoop> {
        self.runtime().and_then(|rt| rt.loops.breath.as_ref())
    }

    pub fn lights(&self) -> Option<&LightsLoop> {
        self.runtime().and_then(|rt| rt.loops.lights.as_ref())
    }

    pub fn equalizer(&self) -> Option<&EqualizerLoop> {
        self.runtime().and_then(|rt| rt.loops.equalizer.as_ref())
    }

    pub fn signal(&self) -> Option<&dyn SignalDriver> {
        self.runtime().and_then(|rt| rt.loops.signal.as_deref())
    }

    /// Number of signal instances created so far.
    pub fn signal_spawns(&self) -> u64 {
        self.runtime().map_or(0, |rt| rt.signal_spawns)
    }

    pub fn snapshot(&self) -> AvatarSnapshot {
        let rt = self.runtime();
        let blink = self.blink().map(BlinkLoop::stats).unwrap_or_default();
        AvatarSnapshot {
            state: self.state.clone(),
            now_ms: self.now(),
            running: rt.map(|rt| rt.loops.running()).unwrap_or_default(),
            signal_mode: self.signal().map(|s| s.mode()),
            pending_drivers: rt.map_or(0, |rt| rt.scheduler.pending_count()),
            active_transitions: rt.map_or(0, |rt| rt.elements.active_transitions()),
            blinks: blink.cycles,
            double_blinks: blink.double_blinks,
            equalizer_batches: self.equalizer().map_or(0, EqualizerLoop::batches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_round_trip() {
        for name in ["idle", "listening", "thinking", "speaking"] {
            assert_eq!(InteractionState::parse(name).as_str(), name);
        }
        assert_eq!(
            InteractionState::parse("dancing"),
            InteractionState::Unrecognized("dancing".to_string())
        );
    }

    #[test]
    fn loop_rngs_differ_per_loop_and_spawn() {
        let a = loop_rng(42, LoopKind::Blink, 0).gen::<u64>();
        let b = loop_rng(42, LoopKind::Equalizer, 0).gen::<u64>();
        let c = loop_rng(42, LoopKind::MouthSignal, 1).gen::<u64>();
        let d = loop_rng(42, LoopKind::MouthSignal, 2).gen::<u64>();
        assert_ne!(a, b);
        assert_ne!(c, d);
        assert_eq!(a, loop_rng(42, LoopKind::Blink, 0).gen::<u64>());
    }

    #[test]
    fn surfaces_without_area_are_rejected() {
        assert!(Surface::square("stage", 256.0).validate().is_ok());
        assert!(Surface::square("stage", 0.0).validate().is_err());
        assert!(Surface::new("", Vec2::splat(10.0)).validate().is_err());
        assert!(Surface::new("stage", Vec2::new(f32::NAN, 1.0)).validate().is_err());
    }

    #[test]
    fn construction_is_inert() {
        let mut avatar = LivingAvatar::new("a", "p");
        avatar.set_state("thinking");
        avatar.tick(Duration::from_millis(100));
        assert_eq!(avatar.state(), &InteractionState::Idle);
        assert!(!avatar.is_initialized());
        assert_eq!(avatar.now(), 0.0);
    }
}
