//! Artifact hashing for change detection.
//!
//! Rendered zone artifacts are hashed so that an update can report whether
//! anything on disk actually changed.

use sha2::{Digest, Sha256};

use crate::model::Component;
use crate::zone::ZoneArtifacts;

/// Hasher for zone artifacts and component declarations.
#[derive(Debug, Default)]
pub struct ArtifactHasher;

impl ArtifactHasher {
    /// Creates a new artifact hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of all rendered artifacts of a zone.
    #[must_use]
    pub fn hash_artifacts(&self, artifacts: &ZoneArtifacts) -> String {
        self.hash_parts(&artifacts.vars, &artifacts.hosts, &artifacts.computed)
    }

    /// Computes a hash of the three artifact texts.
    ///
    /// Each part is length-prefixed so moving text between parts changes
    /// the hash.
    #[must_use]
    pub fn hash_parts(&self, vars: &str, hosts: &str, computed: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [vars, hosts, computed] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Computes a hash of a component's resolved declaration.
    ///
    /// Computed services are part of the hash. Returns `None` if the
    /// component cannot be serialized.
    #[must_use]
    pub fn hash_component(&self, component: &Component) -> Option<String> {
        let rendered = serde_yaml::to_string(component).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(component.name.as_bytes());
        hasher.update(rendered.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_artifacts(vars: &str) -> ZoneArtifacts {
        ZoneArtifacts {
            vars: vars.to_string(),
            hosts: "all: {}\n".to_string(),
            computed: "{}\n".to_string(),
        }
    }

    #[test]
    fn test_artifact_hash_deterministic() {
        let hasher = ArtifactHasher::new();
        let artifacts = create_test_artifacts("a: 1\n");
        assert_eq!(hasher.hash_artifacts(&artifacts), hasher.hash_artifacts(&artifacts));
    }

    #[test]
    fn test_different_artifacts_different_hash() {
        let hasher = ArtifactHasher::new();
        let hash1 = hasher.hash_artifacts(&create_test_artifacts("a: 1\n"));
        let hash2 = hasher.hash_artifacts(&create_test_artifacts("a: 2\n"));
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_parts_are_delimited() {
        let hasher = ArtifactHasher::new();
        assert_ne!(hasher.hash_parts("ab", "c", ""), hasher.hash_parts("a", "bc", ""));
    }

    #[test]
    fn test_component_hash_changes_with_version() {
        let hasher = ArtifactHasher::new();
        let mut component = Component::new("web");
        let before = hasher.hash_component(&component).unwrap();
        component.version = "2".to_string();
        assert_ne!(before, hasher.hash_component(&component).unwrap());
    }

    #[test]
    fn test_short_hash() {
        let hasher = ArtifactHasher::new();
        let short = hasher.short_hash("abcdef1234567890abcdef1234567890");
        assert_eq!(short, "abcdef12");
    }
}
