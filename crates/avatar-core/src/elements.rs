//! Arena of drawable avatar elements addressed by small integer handles.
//!
//! The arena is created once from the calibration geometry and never changes
//! shape afterwards. Loops hold only the handles they own and mutate visual
//! properties (opacity, offset, scale, size, fill) through it; the element
//! count and anchor positions are fixed at construction.
//!
//! Host-side transitions ("animate this element towards these visuals over N
//! ms") are stored per element and evaluated lazily with [`ElementSet::resolved`].

use crate::error::GeometryError;
use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u16);

impl ElementId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementRole {
    BodyImage,
    Light,
    DisplayBackground,
    EqualizerBar,
    Eye,
    MouthSignal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Circle,
    Rect { corner_radius: f32 },
    Image,
}

/// Mutable visual state of one element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Visual {
    pub opacity: f32,
    pub offset: Vec2,
    pub scale: Vec2,
    pub size: Vec2,
}

impl Visual {
    pub fn with_size(size: Vec2) -> Self {
        Self {
            opacity: 1.0,
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            size,
        }
    }

    /// Linear blend; exact endpoints at `t <= 0` and `t >= 1`.
    pub fn lerp(&self, to: &Visual, t: f32) -> Visual {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *to;
        }
        Visual {
            opacity: self.opacity + (to.opacity - self.opacity) * t,
            offset: self.offset.lerp(to.offset, t),
            scale: self.scale.lerp(to.scale, t),
            size: self.size.lerp(to.size, t),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Once,
    /// Back and forth forever: from -> to -> from -> ...
    PingPong,
}

/// A linear tween between two visual states, owned by the rendering host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub from: Visual,
    pub to: Visual,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub repeat: Repeat,
}

impl Transition {
    pub fn sample(&self, now_ms: f64) -> Visual {
        if self.duration_ms <= 0.0 {
            return self.to;
        }
        let t = ((now_ms - self.start_ms) / self.duration_ms).max(0.0);
        match self.repeat {
            Repeat::Once => self.from.lerp(&self.to, t.min(1.0) as f32),
            Repeat::PingPong => {
                let cycle = t % 2.0;
                let k = if cycle <= 1.0 { cycle } else { 2.0 - cycle };
                self.from.lerp(&self.to, k as f32)
            }
        }
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.repeat == Repeat::Once && now_ms >= self.start_ms + self.duration_ms
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementRecord {
    pub role: ElementRole,
    pub shape: Shape,
    /// Anchor position in calibration space. Never mutated by loops.
    pub center: Vec2,
    pub fill: String,
    pub stroke: Option<Stroke>,
    pub href: Option<String>,
    pub group: Option<String>,
    visual: Visual,
    transition: Option<Transition>,
}

impl ElementRecord {
    pub fn circle(role: ElementRole, center: Vec2, diameter: f32, fill: &str) -> Self {
        Self::new(role, Shape::Circle, center, Vec2::splat(diameter), fill)
    }

    pub fn rect(role: ElementRole, center: Vec2, size: Vec2, fill: &str) -> Self {
        Self::new(role, Shape::Rect { corner_radius: 0.0 }, center, size, fill)
    }

    pub fn image(center: Vec2, size: Vec2, href: &str) -> Self {
        let mut record = Self::new(ElementRole::BodyImage, Shape::Image, center, size, "none");
        record.href = Some(href.to_string());
        record
    }

    fn new(role: ElementRole, shape: Shape, center: Vec2, size: Vec2, fill: &str) -> Self {
        Self {
            role,
            shape,
            center,
            fill: fill.to_string(),
            stroke: None,
            href: None,
            group: None,
            visual: Visual::with_size(size),
            transition: None,
        }
    }

    pub fn with_stroke(mut self, color: &str, width: f32, opacity: f32) -> Self {
        self.stroke = Some(Stroke {
            color: color.to_string(),
            width,
            opacity,
        });
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.visual.opacity = opacity;
        self
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        if let Shape::Rect { corner_radius } = &mut self.shape {
            *corner_radius = radius;
        }
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Committed visual state, ignoring any running transition.
    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ElementSet {
    records: Vec<ElementRecord>,
}

impl ElementSet {
    /// Most elements one arena can address.
    pub const CAPACITY: usize = u16::MAX as usize + 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ElementRecord) -> Result<ElementId, GeometryError> {
        let index = u16::try_from(self.records.len()).map_err(|_| GeometryError::ArenaFull)?;
        self.records.push(record);
        Ok(ElementId(index))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Fail before allocating `extra` more records the arena could not address.
    pub fn reserve_exact(&mut self, extra: usize) -> Result<(), GeometryError> {
        if extra > Self::CAPACITY - self.records.len() {
            return Err(GeometryError::ArenaFull);
        }
        self.records.reserve_exact(extra);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementRecord> {
        self.records.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &ElementRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (ElementId(i as u16), r))
    }

    /// Visual state as the host would draw it at `now_ms`.
    pub fn resolved(&self, id: ElementId, now_ms: f64) -> Option<Visual> {
        self.get(id).map(|r| match &r.transition {
            Some(tr) => tr.sample(now_ms),
            None => r.visual,
        })
    }

    pub fn visual_mut(&mut self, id: ElementId) -> Option<&mut Visual> {
        self.records.get_mut(id.index()).map(|r| &mut r.visual)
    }

    pub fn set_opacity(&mut self, id: ElementId, opacity: f32) -> Option<()> {
        self.visual_mut(id).map(|v| v.opacity = opacity)
    }

    pub fn set_fill(&mut self, id: ElementId, fill: &str) -> Option<()> {
        let record = self.records.get_mut(id.index())?;
        record.fill.clear();
        record.fill.push_str(fill);
        Some(())
    }

    pub fn set_stroke(&mut self, id: ElementId, stroke: Stroke) -> Option<()> {
        self.records.get_mut(id.index()).map(|r| r.stroke = Some(stroke))
    }

    /// Start a transition from the currently drawn state towards the state
    /// produced by `target`. Replaces any transition already running.
    pub fn animate(
        &mut self,
        id: ElementId,
        now_ms: f64,
        duration_ms: f64,
        repeat: Repeat,
        target: impl FnOnce(&mut Visual),
    ) -> Option<()> {
        let from = self.resolved(id, now_ms)?;
        let mut to = from;
        target(&mut to);
        let record = self.records.get_mut(id.index())?;
        record.visual = from;
        record.transition = Some(Transition {
            from,
            to,
            start_ms: now_ms,
            duration_ms,
            repeat,
        });
        Some(())
    }

    /// Stop a running transition, freezing the element at its drawn state.
    pub fn clear_transition(&mut self, id: ElementId, now_ms: f64) -> Option<()> {
        let frozen = self.resolved(id, now_ms)?;
        let record = self.records.get_mut(id.index())?;
        if record.transition.take().is_some() {
            record.visual = frozen;
        }
        Some(())
    }

    /// Commit every finished one-shot transition into the element's visual state.
    pub fn settle(&mut self, now_ms: f64) {
        for record in &mut self.records {
            if let Some(tr) = record.transition {
                if tr.is_finished(now_ms) {
                    record.visual = tr.to;
                    record.transition = None;
                }
            }
        }
    }

    pub fn active_transitions(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.transition.is_some())
            .count()
    }
}
