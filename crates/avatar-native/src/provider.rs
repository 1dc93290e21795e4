use anyhow::Context;
use avatar_core::{AvatarDataProvider, AvatarDescriptor, PersonalityDescriptor, ProviderError};
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

/// Loads descriptors from `<root>/avatars/<id>.json` and
/// `<root>/personalities/<id>.json`.
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Ok(None)` when the descriptor does not exist.
    fn read(&self, dir: &str, id: &str) -> anyhow::Result<Option<String>> {
        // Ids name files directly under `dir`, never paths.
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Ok(None);
        }
        let path = self.root.join(dir).join(format!("{id}.json"));
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("[provider] loaded {}", path.display());
                Ok(Some(text))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn load<T: DeserializeOwned>(
        &self,
        dir: &str,
        id: &str,
        not_found: impl FnOnce(String) -> ProviderError,
    ) -> Result<T, ProviderError> {
        let text = self
            .read(dir, id)
            .map_err(|err| ProviderError::Unavailable(format!("{err:#}")))?
            .ok_or_else(|| not_found(id.to_string()))?;
        serde_json::from_str(&text).map_err(|source| ProviderError::Malformed {
            id: id.to_string(),
            source,
        })
    }
}

impl AvatarDataProvider for FsProvider {
    fn avatar(&self, avatar_id: &str) -> Result<AvatarDescriptor, ProviderError> {
        self.load("avatars", avatar_id, ProviderError::AvatarNotFound)
    }

    fn personality(&self, personality_id: &str) -> Result<PersonalityDescriptor, ProviderError> {
        self.load("personalities", personality_id, ProviderError::PersonalityNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> FsProvider {
        FsProvider::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/data"))
    }

    #[test]
    fn loads_the_bundled_demo_descriptors() {
        let provider = demo();
        let avatar = provider.avatar("cyborg-female").unwrap();
        assert_eq!(avatar.calibration.lights.len(), 3);
        let personality = provider.personality("ENFJ").unwrap();
        assert!(personality.animations.eyes_blink.enabled);
    }

    #[test]
    fn missing_ids_map_to_not_found() {
        let provider = demo();
        assert!(matches!(
            provider.avatar("nobody"),
            Err(ProviderError::AvatarNotFound(_))
        ));
        assert!(matches!(
            provider.personality("../avatars/cyborg-female"),
            Err(ProviderError::PersonalityNotFound(_))
        ));
    }

    #[test]
    fn malformed_files_are_reported() {
        let root = std::env::temp_dir().join(format!("avatar-native-{}", std::process::id()));
        std::fs::create_dir_all(root.join("avatars")).unwrap();
        std::fs::write(root.join("avatars/broken.json"), "{\"calibration\": 3}").unwrap();
        let provider = FsProvider::new(&root);
        let err = provider.avatar("broken").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
        std::fs::remove_dir_all(&root).unwrap();
    }
}
