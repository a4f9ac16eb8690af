//! Playbook generation from a product's default components.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::play::{PLAY_TAG_PREFIX, Play, Playbook, Role};
use crate::error::PlaybookError;
use crate::model::{Component, Product};

/// Tag of the leading fact-gathering play.
pub const GATHER_FACTS_TAG: &str = "gather-facts";

/// Role of the fact-gathering play. Its name is also a reserved executor tag.
pub const ALWAYS_ROLE: &str = "always";

/// Returns the host pattern of a component's play.
///
/// The pattern lets the executor override the hosts of one play through the
/// `_ansiblepattern_<name>` variable, with `-` replaced by `_`.
#[must_use]
pub fn hosts_pattern(component: &str) -> String {
    format!(
        "{{{{ _ansiblepattern_{} | default('{}') }}}}",
        component.replace('-', "_"),
        component
    )
}

/// Returns the play that gathers facts on every host.
#[must_use]
pub fn gather_facts_play() -> Play {
    let mut play = Play::new("gather facts", "all");
    play.any_errors_fatal = false;
    play.roles.push(Role {
        role: ALWAYS_ROLE.to_string(),
        tags: Vec::new(),
    });
    play.tags.push(GATHER_FACTS_TAG.to_string());
    play
}

/// Returns the play of one component.
///
/// Roles listed in `shared_roles` also get a `<role>-<component>` tag.
#[must_use]
pub fn component_play(component: &Component, shared_roles: &BTreeSet<String>) -> Play {
    let mut play = Play::new(component.name.as_str(), hosts_pattern(&component.name));
    play.any_errors_fatal = false;
    play.tags.push(format!("{PLAY_TAG_PREFIX}{}", component.name));
    if let Some(group) = &component.group {
        play.tags.push(group.clone());
    }

    for role in component.resolved_roles() {
        let mut tags = vec![role.clone()];
        if shared_roles.contains(&role) {
            tags.push(format!("{role}-{}", component.name));
        }
        play.roles.push(Role { role, tags });
    }
    play
}

/// Generates the playbook of a product.
///
/// The first play gathers facts; then one play per default component
/// follows in deployment order.
///
/// # Errors
///
/// Returns an error if the order names an undeclared component or two tags
/// collide.
pub fn generate_playbook(product: &Product) -> Result<Playbook, PlaybookError> {
    let components = product
        .order()
        .into_iter()
        .map(|name| {
            product
                .default_components()
                .get(&name)
                .ok_or(PlaybookError::UndeclaredComponent { component: name })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let shared_roles = shared_roles(&components);
    let mut plays = vec![gather_facts_play()];
    plays.extend(components.iter().map(|c| component_play(c, &shared_roles)));
    check_tags(&plays)?;

    debug!("Generated {} play(s) for product {}", plays.len(), product.name);
    Ok(Playbook::new(plays))
}

fn shared_roles(components: &[&Component]) -> BTreeSet<String> {
    let mut users: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for component in components {
        for role in component.resolved_roles() {
            users.entry(role).or_default().insert(&component.name);
        }
    }
    users
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(role, _)| role)
        .collect()
}

fn is_reserved(tag: &str) -> bool {
    tag == GATHER_FACTS_TAG || tag == ALWAYS_ROLE || tag.starts_with(PLAY_TAG_PREFIX)
}

// Role and disambiguation tags select exactly one role each, play tags one
// play each. Group tags may repeat across plays but must not shadow either.
fn check_tags(plays: &[Play]) -> Result<(), PlaybookError> {
    let mut role_tags: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    let mut group_tags: Vec<(&str, &str)> = Vec::new();

    for play in plays.iter().skip(1) {
        for role in &play.roles {
            for tag in &role.tags {
                if is_reserved(tag) {
                    return Err(collision(tag, &play.name));
                }
                let owner = (role.role.as_str(), play.name.as_str());
                if let Some((owner_role, _)) = role_tags.insert(tag.as_str(), owner) {
                    if owner_role != role.role {
                        return Err(collision(tag, &play.name));
                    }
                }
            }
        }
        for tag in play.tags.iter().filter(|t| Some(t.as_str()) != play.play_tag()) {
            group_tags.push((tag.as_str(), play.name.as_str()));
        }
    }

    for (tag, component) in group_tags {
        if is_reserved(tag) || role_tags.contains_key(tag) {
            return Err(collision(tag, component));
        }
    }
    Ok(())
}

fn collision(tag: &str, component: &str) -> PlaybookError {
    PlaybookError::TagCollision {
        tag: tag.to_string(),
        component: component.to_string(),
    }
}
