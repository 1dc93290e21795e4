// Interaction state machine tests driven through the public avatar surface.

mod common;

use avatar_core::*;
use common::*;

#[test]
fn init_builds_the_rig_and_starts_continuous_loops() {
    let avatar = live_avatar(1);
    assert!(avatar.is_initialized());
    assert_eq!(avatar.state(), &InteractionState::Idle);

    // body + 3 lights + background + 5 bars + 2 eyes + 8 mouth signals
    assert_eq!(avatar.elements().unwrap().len(), 20);
    assert!(avatar.is_running(LoopKind::Blink));
    assert!(avatar.is_running(LoopKind::Breath));
    assert!(avatar.is_running(LoopKind::Lights));

    // State-dependent loops are created lazily.
    assert!(avatar.equalizer().is_none());
    assert!(avatar.signal().is_none());
    assert_eq!(avatar.scheduler().unwrap().pending_count(), 3);
}

#[test]
fn disabled_profiles_are_never_constructed() {
    let avatar = live_avatar_with(2, |_, p| {
        p.eyes_blink.enabled = false;
        p.lights_pulse.enabled = false;
    });
    assert!(avatar.blink().is_none());
    assert!(avatar.lights().is_none());
    assert!(avatar.breath().is_some());
    assert_eq!(pending_for(&avatar, LoopKind::Blink), 0);
    assert_eq!(pending_for(&avatar, LoopKind::Lights), 0);

    // Lights never started, so they keep their construction opacity.
    let rig = avatar.rig().unwrap();
    assert_eq!(opacity(&avatar, rig.lights[0]), constants::LIGHT_INITIAL_OPACITY);
}

#[test]
fn thinking_then_speaking_is_mutually_exclusive() {
    let mut avatar = live_avatar(3);
    avatar.set_state("thinking");
    run_frames(&mut avatar, 10);

    let display = avatar.rig().unwrap().display.clone().unwrap();
    assert!(avatar.is_running(LoopKind::Equalizer));
    assert_eq!(opacity(&avatar, display.background), constants::EQ_DISPLAY_OPACITY);

    avatar.set_state("speaking");
    run_frames(&mut avatar, 2);

    assert!(!avatar.is_running(LoopKind::Equalizer));
    assert_eq!(pending_for(&avatar, LoopKind::Equalizer), 0);
    assert_eq!(opacity(&avatar, display.background), 0.0);
    for &bar in &display.bars {
        assert_eq!(opacity(&avatar, bar), 0.0);
    }

    let signal = avatar.signal().unwrap();
    assert_eq!(signal.mode(), SignalMode::Shimmer);
    assert!(signal.is_running());
    assert_eq!(avatar.signal_spawns(), 1);
    assert_eq!(pending_for(&avatar, LoopKind::MouthSignal), 1);
}

#[test]
fn rapid_transitions_settle_into_a_clean_idle() {
    let mut avatar = live_avatar(4);
    for state in ["idle", "listening", "thinking", "speaking", "idle"] {
        avatar.set_state(state);
    }
    run_frames(&mut avatar, 3);

    assert_eq!(avatar.state(), &InteractionState::Idle);
    assert!(!avatar.is_running(LoopKind::Equalizer));
    assert!(!avatar.is_running(LoopKind::MouthSignal));
    assert_eq!(pending_for(&avatar, LoopKind::Equalizer), 0);
    assert_eq!(pending_for(&avatar, LoopKind::MouthSignal), 0);

    let rig = avatar.rig().unwrap().clone();
    let elements = avatar.elements().unwrap();
    for &id in &rig.mouth {
        assert_eq!(opacity(&avatar, id), 0.0);
        assert!(elements.get(id).unwrap().transition().is_none());
    }
    // blink timer + breath frame + lights frame
    assert_eq!(avatar.scheduler().unwrap().pending_count(), 3);
}

#[test]
fn signal_instances_are_replaced_only_when_the_mode_changes() {
    let mut avatar = live_avatar(5);
    avatar.set_state("listening");
    let mouth = avatar.rig().unwrap().mouth.clone();
    assert_eq!(avatar.signal().unwrap().mode(), SignalMode::Pulse);
    assert_eq!(opacity(&avatar, mouth[0]), constants::PULSE_HIGH);
    // The pulse is a host transition, not a scheduler driver.
    assert_eq!(pending_for(&avatar, LoopKind::MouthSignal), 0);

    avatar.set_state("listening");
    avatar.set_state("idle");
    avatar.set_state("listening");
    assert_eq!(avatar.signal_spawns(), 1);

    avatar.set_state("speaking");
    assert_eq!(avatar.signal_spawns(), 2);
    assert_eq!(avatar.signal().unwrap().mode(), SignalMode::Shimmer);
    let elements = avatar.elements().unwrap();
    assert!(mouth
        .iter()
        .all(|&id| elements.get(id).unwrap().transition().is_none()));

    avatar.set_state("listening");
    assert_eq!(avatar.signal_spawns(), 3);
    assert_eq!(pending_for(&avatar, LoopKind::MouthSignal), 0);
}

#[test]
fn shimmer_starts_without_fade_in() {
    let mut avatar = live_avatar(6);
    avatar.set_state("speaking");
    avatar.tick(FRAME);
    for &id in avatar.rig().unwrap().mouth.iter() {
        let o = opacity(&avatar, id);
        assert!((0.4 - 1e-6..=1.0 + 1e-6).contains(&o), "opacity {o}");
    }
}

#[test]
fn unknown_state_is_recorded_but_changes_no_loop() {
    let mut avatar = live_avatar(7);
    avatar.set_state("thinking");
    avatar.set_state("dancing");
    assert_eq!(
        avatar.state(),
        &InteractionState::Unrecognized("dancing".to_string())
    );
    assert!(avatar.is_running(LoopKind::Equalizer));
    assert_eq!(pending_for(&avatar, LoopKind::Equalizer), 1);
}

#[test]
fn thinking_without_a_display_changes_state_only() {
    let mut avatar = live_avatar_with(8, |a, _| a.calibration.display = None);
    avatar.set_state("thinking");
    assert_eq!(avatar.state(), &InteractionState::Thinking);
    assert!(avatar.equalizer().is_none());
    assert_eq!(pending_for(&avatar, LoopKind::Equalizer), 0);
}

#[test]
fn init_failures_are_surfaced() {
    let mut avatar = LivingAvatar::new("missing", PERSONALITY_ID);
    assert!(matches!(
        avatar.init(&surface(), &provider()),
        Err(InitError::Provider(ProviderError::AvatarNotFound(_)))
    ));
    assert!(!avatar.is_initialized());

    let mut avatar = LivingAvatar::new(AVATAR_ID, PERSONALITY_ID);
    assert!(matches!(
        avatar.init(&Surface::square("", 256.0), &provider()),
        Err(InitError::InvalidContainer(_))
    ));

    let bad = provider_with(|_, p| p.eyes_blink.jitter_ratio = 2.0);
    assert!(matches!(
        avatar.init(&surface(), &bad),
        Err(InitError::InvalidProfile(ProfileError { field: "jitterRatio", .. }))
    ));

    let inverted = provider_with(|a, _| {
        std::mem::swap(&mut a.calibration.mouth.left, &mut a.calibration.mouth.right)
    });
    assert!(matches!(
        avatar.init(&surface(), &inverted),
        Err(InitError::Geometry(GeometryError::InvertedMouth { .. }))
    ));

    let wide_mouth = provider_with(|a, _| a.calibration.mouth.right.x = 1.0e30);
    assert!(matches!(
        avatar.init(&surface(), &wide_mouth),
        Err(InitError::Geometry(GeometryError::ArenaFull))
    ));

    let many_bars = provider_with(|a, _| {
        a.calibration.display.as_mut().unwrap().equalizer.bar_count = usize::MAX
    });
    assert!(matches!(
        avatar.init(&surface(), &many_bars),
        Err(InitError::Geometry(GeometryError::ArenaFull))
    ));
    assert!(!avatar.is_initialized());

    avatar.init(&surface(), &provider()).unwrap();
    assert!(matches!(
        avatar.init(&surface(), &provider()),
        Err(InitError::AlreadyInitialized)
    ));
}

#[test]
fn destroy_stops_every_loop_and_blocks_reuse() {
    let mut avatar = live_avatar(9);
    avatar.set_state("speaking");
    run_frames(&mut avatar, 5);

    let teardown = avatar.destroy();
    assert_eq!(
        teardown.stopped.as_slice(),
        &[
            LoopKind::Blink,
            LoopKind::Breath,
            LoopKind::Lights,
            LoopKind::MouthSignal
        ]
    );
    assert_eq!(teardown.pending_drivers, 0);
    assert!(avatar.is_destroyed());
    assert!(avatar.elements().is_none());

    avatar.set_state("thinking");
    avatar.tick(FRAME);
    assert_eq!(avatar.state(), &InteractionState::Speaking);
    assert_eq!(avatar.destroy(), Teardown::default());
    assert!(matches!(
        avatar.init(&surface(), &provider()),
        Err(InitError::Destroyed)
    ));
}

#[test]
fn failing_step_halts_only_its_own_loop() {
    // A height range this wide overflows to infinity when targets are drawn.
    let mut avatar = live_avatar_with(10, |a, _| {
        let eq = &mut a.calibration.display.as_mut().unwrap().equalizer;
        eq.bar_min_height = -3.0e38;
        eq.bar_max_height = 3.0e38;
    });
    avatar.set_state("thinking");
    run_frames(&mut avatar, 5);

    assert!(!avatar.is_running(LoopKind::Equalizer));
    assert_eq!(pending_for(&avatar, LoopKind::Equalizer), 0);
    assert!(avatar.is_running(LoopKind::Blink));
    assert!(avatar.is_running(LoopKind::Breath));
    assert!(avatar.is_running(LoopKind::Lights));
    assert_eq!(avatar.state(), &InteractionState::Thinking);

    // Siblings keep animating.
    let body = avatar.rig().unwrap().body;
    let before = avatar.visual(body).unwrap().scale;
    avatar.advance_to(avatar.now() + 500.0);
    assert_ne!(avatar.visual(body).unwrap().scale, before);
}

#[test]
fn profile_updates_reach_live_loops() {
    let mut avatar = live_avatar(11);
    let mut profiles = avatar.animation_params().unwrap().clone();
    assert_eq!(profiles.eyes_blink.base_interval, 4000.0);

    profiles.lights_pulse.enabled = false;
    profiles.eyes_blink.base_interval = 2500.0;
    avatar.update_profiles(profiles.clone()).unwrap();

    assert!(avatar.lights().is_none());
    assert_eq!(pending_for(&avatar, LoopKind::Lights), 0);
    let rig = avatar.rig().unwrap().clone();
    assert!(rig.lights.iter().all(|&id| opacity(&avatar, id) == 0.0));
    assert_eq!(avatar.blink().unwrap().profile().base_interval, 2500.0);

    profiles.lights_pulse.enabled = true;
    avatar.update_profiles(profiles.clone()).unwrap();
    assert!(avatar.is_running(LoopKind::Lights));

    profiles.lights_pulse.intensity = 4.0;
    assert!(avatar.update_profiles(profiles).is_err());
    assert_eq!(avatar.lights().unwrap().profile().intensity, 0.75);
}

#[test]
fn pause_and_resume_keep_the_loop_running() {
    let mut avatar = live_avatar(12);
    assert!(!avatar.pause_loop(LoopKind::Equalizer));

    assert!(avatar.pause_loop(LoopKind::Lights));
    assert!(avatar.is_running(LoopKind::Lights));
    assert!(avatar.lights().unwrap().is_paused());
    assert_eq!(pending_for(&avatar, LoopKind::Lights), 0);

    let light = avatar.rig().unwrap().lights[0];
    run_frames(&mut avatar, 2);
    let frozen = opacity(&avatar, light);
    run_frames(&mut avatar, 10);
    assert_eq!(opacity(&avatar, light), frozen);

    assert!(avatar.resume_loop(LoopKind::Lights));
    assert!(avatar.resume_loop(LoopKind::Lights));
    assert_eq!(pending_for(&avatar, LoopKind::Lights), 1);
}

#[test]
fn snapshot_summarises_the_live_avatar() {
    let mut avatar = live_avatar(13);
    avatar.set_state("thinking");
    run_frames(&mut avatar, 4);
    let snap = avatar.snapshot();
    assert_eq!(snap.state, InteractionState::Thinking);
    assert_eq!(
        snap.running.as_slice(),
        &[
            LoopKind::Blink,
            LoopKind::Breath,
            LoopKind::Lights,
            LoopKind::Equalizer
        ]
    );
    assert_eq!(snap.signal_mode, None);
    assert_eq!(snap.pending_drivers, 4);
    assert!(snap.equalizer_batches >= 1);
    assert!(snap.to_string().contains("state=thinking"));
}

#[test]
fn shimmer_is_only_regenerated_when_its_range_changes() {
    let mut updated = live_avatar(14);
    let mut untouched = live_avatar(14);
    for avatar in [&mut updated, &mut untouched] {
        avatar.set_state("speaking");
        run_frames(avatar, 3);
    }
    let mouth = updated.rig().unwrap().mouth.clone();
    let opacities = |avatar: &LivingAvatar| -> Vec<f32> {
        mouth.iter().map(|&id| opacity(avatar, id)).collect()
    };

    let mut profiles = updated.animation_params().unwrap().clone();
    profiles.eyes_blink.base_interval = 2500.0;
    updated.update_profiles(profiles.clone()).unwrap();
    run_frames(&mut updated, 3);
    run_frames(&mut untouched, 3);
    assert_eq!(opacities(&updated), opacities(&untouched));

    profiles.mouth_signal.min_frequency = 1000.0;
    profiles.mouth_signal.max_frequency = 1200.0;
    updated.update_profiles(profiles).unwrap();
    run_frames(&mut updated, 3);
    run_frames(&mut untouched, 3);
    assert_ne!(opacities(&updated), opacities(&untouched));
}
