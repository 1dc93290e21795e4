//! Builds the element arena from calibration geometry and partitions the
//! resulting handles between the loops that own them.

use crate::constants::*;
use crate::descriptor::{AvatarDescriptor, DisplayCalibration, MouthCalibration, Point};
use crate::elements::{ElementId, ElementRecord, ElementRole, ElementSet};
use crate::error::GeometryError;
use glam::Vec2;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EyePair {
    pub left: ElementId,
    pub right: ElementId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayHandles {
    pub background: ElementId,
    pub bars: SmallVec<[ElementId; 16]>,
    pub min_height: f32,
    pub max_height: f32,
}

/// Handles to every element, grouped by owning loop.
#[derive(Clone, Debug, PartialEq)]
pub struct Rig {
    pub body: ElementId,
    pub lights: SmallVec<[ElementId; 8]>,
    pub display: Option<DisplayHandles>,
    pub eyes: EyePair,
    pub mouth: SmallVec<[ElementId; 16]>,
}

/// Number of mouth signal elements that fit the calibrated mouth span.
pub fn signal_count(mouth: &MouthCalibration) -> Result<usize, GeometryError> {
    let span = mouth.right.x - mouth.left.x;
    if !(span >= 0.0) {
        return Err(GeometryError::InvertedMouth {
            left: mouth.left.x,
            right: mouth.right.x,
        });
    }
    let count = (span / SIGNAL_SPACING).floor();
    if count >= ElementSet::CAPACITY as f32 {
        return Err(GeometryError::ArenaFull);
    }
    Ok(count as usize)
}

/// Create all elements back to front: body image, lights, display, eyes,
/// mouth signals.
pub fn build(avatar: &AvatarDescriptor, surface: Vec2) -> Result<(ElementSet, Rig), GeometryError> {
    let cal = &avatar.calibration;
    let mut set = ElementSet::new();

    let body = set.push(ElementRecord::image(
        surface * 0.5,
        surface,
        &avatar.image_reference,
    ))?;

    let mut lights = SmallVec::new();
    for light in &cal.lights {
        let record = ElementRecord::circle(
            ElementRole::Light,
            Vec2::new(light.x, light.y),
            light.size,
            &light.color,
        )
        .with_stroke(&light.color, LIGHT_STROKE_WIDTH, 0.5)
        .with_opacity(LIGHT_INITIAL_OPACITY)
        .with_group(&light.group);
        lights.push(set.push(record)?);
    }

    let display = match &cal.display {
        Some(d) => Some(build_display(&mut set, d)?),
        None => None,
    };

    let eye = |p: Point| {
        ElementRecord::circle(ElementRole::Eye, Vec2::from(p), EYE_SIZE, EYE_FILL).with_opacity(0.0)
    };
    let eyes = EyePair {
        left: set.push(eye(cal.eyes.left))?,
        right: set.push(eye(cal.eyes.right))?,
    };

    let count = signal_count(&cal.mouth)?;
    set.reserve_exact(count)?;
    let mut mouth = SmallVec::with_capacity(count);
    for i in 0..count {
        let center = Vec2::new(
            cal.mouth.left.x + i as f32 * SIGNAL_SPACING,
            cal.mouth.center.y,
        );
        let record = ElementRecord::circle(ElementRole::MouthSignal, center, SIGNAL_SIZE, SIGNAL_FILL)
            .with_stroke(SIGNAL_STROKE, SIGNAL_STROKE_WIDTH, 1.0)
            .with_opacity(0.0);
        mouth.push(set.push(record)?);
    }

    log::debug!(
        "[rig] elements={} lights={} bars={} mouth={}",
        set.len(),
        lights.len(),
        display.as_ref().map_or(0, |d: &DisplayHandles| d.bars.len()),
        mouth.len()
    );

    Ok((
        set,
        Rig {
            body,
            lights,
            display,
            eyes,
            mouth,
        },
    ))
}

fn build_display(
    set: &mut ElementSet,
    d: &DisplayCalibration,
) -> Result<DisplayHandles, GeometryError> {
    let eq = &d.equalizer;
    let top_left = Vec2::from(d.top_left);
    let size = Vec2::from(d.bottom_right) - top_left;
    if !(size.x > 0.0 && size.y > 0.0) {
        return Err(GeometryError::EmptyDisplay);
    }
    if eq.bar_count == 0 || !(eq.bar_width > 0.0) {
        return Err(GeometryError::NoBars);
    }
    if !(eq.bar_min_height <= eq.bar_max_height) {
        return Err(GeometryError::InvertedBarRange {
            min: eq.bar_min_height,
            max: eq.bar_max_height,
        });
    }
    set.reserve_exact(eq.bar_count.saturating_add(1))?;
    let center = top_left + size * 0.5;

    let background = set.push(
        ElementRecord::rect(
            ElementRole::DisplayBackground,
            center,
            size,
            &d.style.background_color,
        )
        .with_stroke(&d.style.border_color, d.style.border_width, 1.0)
        .with_corner_radius(d.style.border_radius)
        .with_opacity(0.0),
    )?;

    let n = eq.bar_count as f32;
    let group_width = n * eq.bar_width + (n - 1.0) * eq.bar_spacing;
    let first_x = center.x - group_width / 2.0 + eq.bar_width / 2.0;
    let mut bars = SmallVec::with_capacity(eq.bar_count);
    for i in 0..eq.bar_count {
        let x = first_x + i as f32 * (eq.bar_width + eq.bar_spacing);
        let record = ElementRecord::rect(
            ElementRole::EqualizerBar,
            Vec2::new(x, center.y),
            Vec2::new(eq.bar_width, eq.bar_min_height),
            &eq.bar_color,
        )
        .with_opacity(0.0);
        bars.push(set.push(record)?);
    }

    Ok(DisplayHandles {
        background,
        bars,
        min_height: eq.bar_min_height,
        max_height: eq.bar_max_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MouthCenter;

    fn mouth(left: f32, right: f32) -> MouthCalibration {
        MouthCalibration {
            left: Point { x: left, y: 180.0 },
            right: Point { x: right, y: 180.0 },
            center: MouthCenter { y: 182.0 },
        }
    }

    #[test]
    fn signal_count_is_span_over_spacing() {
        assert_eq!(signal_count(&mouth(100.0, 140.0)).unwrap(), 8);
        assert_eq!(signal_count(&mouth(100.0, 104.9)).unwrap(), 0);
        assert_eq!(signal_count(&mouth(100.0, 112.0)).unwrap(), 2);
    }

    #[test]
    fn oversized_mouth_span_is_rejected_before_allocating() {
        assert_eq!(signal_count(&mouth(0.0, 1.0e30)), Err(GeometryError::ArenaFull));
        assert_eq!(
            signal_count(&mouth(0.0, f32::INFINITY)),
            Err(GeometryError::ArenaFull)
        );
    }

    #[test]
    fn inverted_mouth_is_rejected() {
        assert!(matches!(
            signal_count(&mouth(150.0, 100.0)),
            Err(GeometryError::InvertedMouth { .. })
        ));
    }
}
