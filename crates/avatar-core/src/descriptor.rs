//! Avatar and personality descriptors as delivered by the data provider.

use crate::profile::AnimationProfiles;
use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<Point> for Vec2 {
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EyesCalibration {
    pub left: Point,
    pub right: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MouthCenter {
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MouthCalibration {
    pub left: Point,
    pub right: Point,
    pub center: MouthCenter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightCalibration {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: String,
    #[serde(default)]
    pub group: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayStyle {
    pub background_color: String,
    pub border_color: String,
    pub border_width: f32,
    pub border_radius: f32,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        Self {
            background_color: "#0a1020".to_string(),
            border_color: "#00e5ff".to_string(),
            border_width: 1.0,
            border_radius: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EqualizerGeometry {
    pub bar_count: usize,
    pub bar_width: f32,
    pub bar_spacing: f32,
    pub bar_color: String,
    pub bar_min_height: f32,
    pub bar_max_height: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayCalibration {
    pub top_left: Point,
    pub bottom_right: Point,
    #[serde(default)]
    pub style: DisplayStyle,
    pub equalizer: EqualizerGeometry,
}

/// Geometry metadata used once to construct the element arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub eyes: EyesCalibration,
    pub mouth: MouthCalibration,
    #[serde(default)]
    pub lights: Vec<LightCalibration>,
    #[serde(default)]
    pub display: Option<DisplayCalibration>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "imageURL", alias = "imageUrl")]
    pub image_reference: String,
    pub calibration: Calibration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityDescriptor {
    #[serde(default, alias = "characterName")]
    pub name: String,
    pub animations: AnimationProfiles,
}
