use crate::elements::ElementId;
use crate::scheduler::LoopKind;
use thiserror::Error;

/// Failure to obtain an avatar or personality descriptor from the data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("avatar `{0}` not found")]
    AvatarNotFound(String),
    #[error("personality `{0}` not found")]
    PersonalityNotFound(String),
    #[error("malformed descriptor `{id}`: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// A profile field outside its accepted range.
#[derive(Debug, Error, PartialEq)]
#[error("{profile}.{field} = {value} is out of range ({expected})")]
pub struct ProfileError {
    pub profile: &'static str,
    pub field: &'static str,
    pub value: f64,
    pub expected: &'static str,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("mouth span is inverted: left.x={left} right.x={right}")]
    InvertedMouth { left: f32, right: f32 },
    #[error("display box is empty or inverted")]
    EmptyDisplay,
    #[error("equalizer needs at least one bar with positive width")]
    NoBars,
    #[error("equalizer height range is inverted: min={min} max={max}")]
    InvertedBarRange { min: f32, max: f32 },
    #[error("too many elements for the arena")]
    ArenaFull,
}

/// Errors surfaced to the host by `LivingAvatar::init`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("container `{0}` is missing or has no area")]
    InvalidContainer(String),
    #[error("avatar is already initialized")]
    AlreadyInitialized,
    #[error("avatar has been destroyed")]
    Destroyed,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("invalid calibration: {0}")]
    Geometry(#[from] GeometryError),
}

/// A failure inside one timer or frame step. Halts the failing loop only.
#[derive(Debug, Error, PartialEq)]
pub enum AnimationError {
    #[error("{owner:?} addressed unknown element {id:?}")]
    MissingElement { owner: LoopKind, id: ElementId },
    #[error("{owner:?} computed a non-finite {what}")]
    NonFinite { owner: LoopKind, what: &'static str },
}
