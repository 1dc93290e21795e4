//! Per-animation parameter profiles supplied by the personality descriptor.
//!
//! Field names follow the camelCase descriptor format; the legacy backend
//! names (`frequency`, `duration`, `randomness`, ...) are accepted as aliases.

use crate::constants::*;
use crate::error::ProfileError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkMethod {
    /// Vertical squash of the eye overlay.
    Scale,
    /// Lid drops a few units while fading in.
    Offset,
    /// Plain opacity overlay. Unrecognized methods fall back to this.
    #[default]
    #[serde(other)]
    Opacity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathWaveform {
    #[default]
    Sine,
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightsPattern {
    Static,
    /// Shared sinusoidal pulse. Unrecognized patterns fall back to this.
    #[default]
    #[serde(other)]
    Pulse,
}

/// Fields absent from the descriptor take their defaults, so a disabled
/// profile may be just `{"enabled": false}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlinkProfile {
    #[serde(default)]
    pub enabled: bool,
    #[serde(alias = "frequency")]
    pub base_interval: f64,
    #[serde(alias = "randomness")]
    pub jitter_ratio: f64,
    #[serde(alias = "duration")]
    pub blink_duration: f64,
    #[serde(alias = "doubleBlinkChance")]
    pub double_blink_probability: f64,
    #[serde(alias = "method", default)]
    pub visual_method: BlinkMethod,
}

impl Default for BlinkProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval: 4000.0,
            jitter_ratio: 0.3,
            blink_duration: 150.0,
            double_blink_probability: 0.1,
            visual_method: BlinkMethod::Opacity,
        }
    }
}

impl BlinkProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("eyesBlink", "baseInterval", self.base_interval)?;
        unit_range("eyesBlink", "jitterRatio", self.jitter_ratio)?;
        positive("eyesBlink", "blinkDuration", self.blink_duration)?;
        unit_range(
            "eyesBlink",
            "doubleBlinkProbability",
            self.double_blink_probability,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreathProfile {
    #[serde(default)]
    pub enabled: bool,
    #[serde(alias = "angle")]
    pub amplitude_angle: f32,
    #[serde(alias = "speed")]
    pub cycle_period: f64,
    /// Sway axis as named by the descriptor; the sway renders as uniform scale.
    #[serde(default)]
    pub axis: String,
    #[serde(alias = "pattern", default)]
    pub waveform: BreathWaveform,
}

impl Default for BreathProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            amplitude_angle: 5.0,
            cycle_period: 4000.0,
            axis: "z".to_string(),
            waveform: BreathWaveform::Sine,
        }
    }
}

impl BreathProfile {
    /// Peak scale delta above 1.0.
    #[inline]
    pub fn scale_amount(&self) -> f32 {
        self.amplitude_angle * BREATH_SCALE_PER_DEGREE
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("headIdleSwaying", "cyclePeriod", self.cycle_period)?;
        finite(
            "headIdleSwaying",
            "amplitudeAngle",
            self.amplitude_angle as f64,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightsProfile {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub pattern: LightsPattern,
    #[serde(alias = "speed", default = "default_lights_period")]
    pub period: f64,
    #[serde(default = "default_lights_intensity")]
    pub intensity: f32,
}

fn default_lights_period() -> f64 {
    LIGHTS_DEFAULT_PERIOD_MS
}

fn default_lights_intensity() -> f32 {
    LIGHTS_DEFAULT_INTENSITY
}

impl Default for LightsProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            pattern: LightsPattern::Pulse,
            period: LIGHTS_DEFAULT_PERIOD_MS,
            intensity: LIGHTS_DEFAULT_INTENSITY,
        }
    }
}

impl LightsProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("lightsPulse", "period", self.period)?;
        unit_range("lightsPulse", "intensity", self.intensity as f64)
    }
}

/// Equalizer tuning. Bar height bounds come from the display calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerProfile {
    #[serde(default = "default_eq_speed")]
    pub speed: f64,
}

fn default_eq_speed() -> f64 {
    EQ_DEFAULT_SPEED
}

impl Default for EqualizerProfile {
    fn default() -> Self {
        Self {
            speed: EQ_DEFAULT_SPEED,
        }
    }
}

impl EqualizerProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("equalizer", "speed", self.speed)
    }
}

/// Oscillation period range (ms) for the speaking shimmer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouthSignalProfile {
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f64,
    #[serde(default = "default_max_frequency")]
    pub max_frequency: f64,
}

fn default_min_frequency() -> f64 {
    SIGNAL_DEFAULT_MIN_PERIOD_MS
}

fn default_max_frequency() -> f64 {
    SIGNAL_DEFAULT_MAX_PERIOD_MS
}

impl Default for MouthSignalProfile {
    fn default() -> Self {
        Self {
            min_frequency: SIGNAL_DEFAULT_MIN_PERIOD_MS,
            max_frequency: SIGNAL_DEFAULT_MAX_PERIOD_MS,
        }
    }
}

impl MouthSignalProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("mouthSignal", "minFrequency", self.min_frequency)?;
        if !(self.max_frequency >= self.min_frequency) {
            return Err(ProfileError {
                profile: "mouthSignal",
                field: "maxFrequency",
                value: self.max_frequency,
                expected: ">= minFrequency",
            });
        }
        Ok(())
    }
}

/// All animation profiles of one personality, keyed by animation type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationProfiles {
    pub eyes_blink: BlinkProfile,
    pub head_idle_swaying: BreathProfile,
    pub lights_pulse: LightsProfile,
    #[serde(default)]
    pub equalizer: EqualizerProfile,
    #[serde(default)]
    pub mouth_signal: MouthSignalProfile,
}

impl AnimationProfiles {
    /// Validate every profile whose loop could be constructed.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.eyes_blink.enabled {
            self.eyes_blink.validate()?;
        }
        if self.head_idle_swaying.enabled {
            self.head_idle_swaying.validate()?;
        }
        if self.lights_pulse.enabled {
            self.lights_pulse.validate()?;
        }
        self.equalizer.validate()?;
        self.mouth_signal.validate()
    }
}

fn positive(profile: &'static str, field: &'static str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError {
            profile,
            field,
            value,
            expected: "> 0",
        })
    }
}

fn unit_range(profile: &'static str, field: &'static str, value: f64) -> Result<(), ProfileError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ProfileError {
            profile,
            field,
            value,
            expected: "0..=1",
        })
    }
}

fn finite(profile: &'static str, field: &'static str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProfileError {
            profile,
            field,
            value,
            expected: "finite",
        })
    }
}
