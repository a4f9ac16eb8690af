//! Plays and playbooks as consumed by the configuration-management executor.

use serde::{Deserialize, Serialize};

use crate::error::PlaybookError;

/// Prefix of the tag selecting one component's play.
pub const PLAY_TAG_PREFIX: &str = "play-";

/// A role applied by a play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub role: String,
    /// Tags selecting this role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// One play of a playbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    /// Play name.
    pub name: String,

    /// Host pattern.
    pub hosts: String,

    /// Abort every host when one fails.
    pub any_errors_fatal: bool,

    /// Gather facts before running roles.
    pub gather_facts: bool,

    /// Escalate privileges.
    #[serde(rename = "become")]
    pub become_root: bool,

    /// Roles in application order.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Tags selecting the whole play.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Play {
    /// Creates a play with fact gathering and fatal errors.
    #[must_use]
    pub fn new(name: impl Into<String>, hosts: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: hosts.into(),
            any_errors_fatal: true,
            gather_facts: true,
            become_root: false,
            roles: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Returns the tag selecting this play, if it has one.
    #[must_use]
    pub fn play_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.starts_with(PLAY_TAG_PREFIX))
            .map(String::as_str)
    }
}

/// An ordered list of plays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playbook {
    plays: Vec<Play>,
}

impl Playbook {
    /// Creates a playbook from plays.
    #[must_use]
    pub const fn new(plays: Vec<Play>) -> Self {
        Self { plays }
    }

    /// Returns the plays.
    #[must_use]
    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    /// Returns the play tag of every component play, in order.
    #[must_use]
    pub fn plays_tags(&self) -> Vec<String> {
        self.plays
            .iter()
            .filter_map(Play::play_tag)
            .map(ToString::to_string)
            .collect()
    }

    /// Returns the play tags from the play of `component` onwards.
    ///
    /// `component` may be given with or without the `play-` prefix. An
    /// unknown component yields no tag.
    #[must_use]
    pub fn plays_tags_start_at(&self, component: &str) -> Vec<String> {
        let start = if component.starts_with(PLAY_TAG_PREFIX) {
            component.to_string()
        } else {
            format!("{PLAY_TAG_PREFIX}{component}")
        };
        self.plays_tags()
            .into_iter()
            .skip_while(|t| *t != start)
            .collect()
    }

    /// Renders the playbook as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, PlaybookError> {
        serde_yaml::to_string(self).map_err(|e| PlaybookError::Serialization {
            message: e.to_string(),
        })
    }

    /// Parses a playbook from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a list of plays.
    pub fn from_yaml(content: &str) -> Result<Self, PlaybookError> {
        serde_yaml::from_str(content).map_err(|e| PlaybookError::Serialization {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_playbook() -> Playbook {
        let mut facts = Play::new("gather facts", "all");
        facts.tags = vec!["gather-facts".to_string()];
        let plays = ["a", "b", "c"].iter().map(|n| {
            let mut play = Play::new(*n, *n);
            play.tags = vec![format!("play-{n}")];
            play
        });
        Playbook::new(std::iter::once(facts).chain(plays).collect())
    }

    #[test]
    fn test_plays_tags() {
        let playbook = create_test_playbook();
        assert_eq!(playbook.plays_tags(), vec!["play-a", "play-b", "play-c"]);
    }

    #[test]
    fn test_plays_tags_start_at() {
        let playbook = create_test_playbook();
        assert_eq!(playbook.plays_tags_start_at("b"), vec!["play-b", "play-c"]);
        assert_eq!(playbook.plays_tags_start_at("play-c"), vec!["play-c"]);
        assert!(playbook.plays_tags_start_at("zzz").is_empty());
    }

    #[test]
    fn test_become_key() {
        let yaml = Playbook::new(vec![Play::new("a", "a")]).to_yaml().unwrap();
        assert!(yaml.contains("become: false"));
        assert!(!yaml.contains("become_root"));
    }
}
