// Shared fixtures: the bundled demo avatar and personality, loaded through the
// in-memory provider.

#![allow(dead_code)]

use avatar_core::*;
use std::time::Duration;

pub const AVATAR_ID: &str = "cyborg-female";
pub const PERSONALITY_ID: &str = "ENFJ";
pub const AVATAR_JSON: &str = include_str!("../../../../demos/data/avatars/cyborg-female.json");
pub const PERSONALITY_JSON: &str = include_str!("../../../../demos/data/personalities/ENFJ.json");
pub const FRAME: Duration = Duration::from_millis(16);

pub fn avatar_descriptor() -> AvatarDescriptor {
    serde_json::from_str(AVATAR_JSON).unwrap()
}

pub fn personality_descriptor() -> PersonalityDescriptor {
    serde_json::from_str(PERSONALITY_JSON).unwrap()
}

pub fn provider_with(tweak: impl FnOnce(&mut AvatarDescriptor, &mut AnimationProfiles)) -> StaticProvider {
    let mut avatar = avatar_descriptor();
    let mut personality = personality_descriptor();
    tweak(&mut avatar, &mut personality.animations);
    StaticProvider::new()
        .with_avatar(AVATAR_ID, avatar)
        .with_personality(PERSONALITY_ID, personality)
}

pub fn provider() -> StaticProvider {
    provider_with(|_, _| {})
}

pub fn surface() -> Surface {
    Surface::square("stage", 256.0)
}

pub fn live_avatar_with(
    seed: u64,
    tweak: impl FnOnce(&mut AvatarDescriptor, &mut AnimationProfiles),
) -> LivingAvatar {
    let mut avatar = LivingAvatar::new(AVATAR_ID, PERSONALITY_ID).with_seed(seed);
    avatar.init(&surface(), &provider_with(tweak)).unwrap();
    avatar
}

pub fn live_avatar(seed: u64) -> LivingAvatar {
    live_avatar_with(seed, |_, _| {})
}

pub fn run_frames(avatar: &mut LivingAvatar, frames: usize) {
    for _ in 0..frames {
        avatar.tick(FRAME);
    }
}

pub fn opacity(avatar: &LivingAvatar, id: ElementId) -> f32 {
    avatar.visual(id).unwrap().opacity
}

pub fn pending_for(avatar: &LivingAvatar, kind: LoopKind) -> usize {
    avatar.scheduler().map_or(0, |s| s.pending_for(kind))
}
