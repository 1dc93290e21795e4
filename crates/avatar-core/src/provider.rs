use crate::descriptor::{AvatarDescriptor, PersonalityDescriptor};
use crate::error::ProviderError;
use fnv::FnvHashMap;

/// Source of avatar and personality descriptors. Constructed and owned by
/// the host and passed to `LivingAvatar::init`.
pub trait AvatarDataProvider {
    fn avatar(&self, avatar_id: &str) -> Result<AvatarDescriptor, ProviderError>;
    fn personality(&self, personality_id: &str) -> Result<PersonalityDescriptor, ProviderError>;
}

/// In-memory provider for hosts that already hold their descriptors.
#[derive(Clone, Debug, Default)]
pub struct StaticProvider {
    avatars: FnvHashMap<String, AvatarDescriptor>,
    personalities: FnvHashMap<String, PersonalityDescriptor>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_avatar(mut self, id: &str, avatar: AvatarDescriptor) -> Self {
        self.avatars.insert(id.to_string(), avatar);
        self
    }

    pub fn with_personality(mut self, id: &str, personality: PersonalityDescriptor) -> Self {
        self.personalities.insert(id.to_string(), personality);
        self
    }

    pub fn insert_avatar_json(&mut self, id: &str, json: &str) -> Result<(), ProviderError> {
        let avatar = serde_json::from_str(json).map_err(|source| ProviderError::Malformed {
            id: id.to_string(),
            source,
        })?;
        self.avatars.insert(id.to_string(), avatar);
        Ok(())
    }

    pub fn insert_personality_json(&mut self, id: &str, json: &str) -> Result<(), ProviderError> {
        let personality =
            serde_json::from_str(json).map_err(|source| ProviderError::Malformed {
                id: id.to_string(),
                source,
            })?;
        self.personalities.insert(id.to_string(), personality);
        Ok(())
    }
}

impl AvatarDataProvider for StaticProvider {
    fn avatar(&self, avatar_id: &str) -> Result<AvatarDescriptor, ProviderError> {
        self.avatars
            .get(avatar_id)
            .cloned()
            .ok_or_else(|| ProviderError::AvatarNotFound(avatar_id.to_string()))
    }

    fn personality(&self, personality_id: &str) -> Result<PersonalityDescriptor, ProviderError> {
        self.personalities
            .get(personality_id)
            .cloned()
            .ok_or_else(|| ProviderError::PersonalityNotFound(personality_id.to_string()))
    }
}
