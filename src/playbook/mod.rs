//! Playbook and tag generation.
//!
//! Components become one tagged play each, preceded by a fact-gathering
//! play, so an operator can (re)apply any subset of a product.

mod generator;
mod play;

pub use generator::{
    ALWAYS_ROLE, GATHER_FACTS_TAG, component_play, gather_facts_play, generate_playbook,
    hosts_pattern,
};
pub use play::{PLAY_TAG_PREFIX, Play, Playbook, Role};
