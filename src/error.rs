//! Error types for the sail zone resolution engine.
//!
//! This module provides the error hierarchy for every stage of resolving a
//! product against a zone: loading declarations, merging zone overrides,
//! patching the inventory, computing services and generating playbooks.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the sail resolution engine.
#[derive(Debug, Error)]
pub enum SailError {
    /// Declaration loading errors.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Zone override merge errors.
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Host patch errors.
    #[error("Host patch error: {0}")]
    Patch(#[from] PatchParseError),

    /// Component lookup and selection errors.
    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    /// Inventory errors.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Service computation errors.
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Playbook generation errors.
    #[error("Playbook error: {0}")]
    Playbook(#[from] PlaybookError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An explicit validation found service invariant violations.
    #[error("Check failed with {errors} error(s)")]
    CheckFailed {
        /// Number of violated invariants.
        errors: usize,
    },

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading product or zone declarations.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A required file was not found.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A declaration could not be parsed.
    #[error("Failed to parse declaration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// The same component is declared twice.
    #[error("Duplicate component definition '{name}' in {origin}")]
    DuplicateComponent {
        /// The duplicated component name.
        name: String,
        /// Declaration source holding the second definition.
        origin: String,
    },

    /// A component declaration could not be decoded.
    #[error("Invalid declaration for component '{component}': {message}")]
    InvalidDeclaration {
        /// Component being decoded.
        component: String,
        /// Decoder message.
        message: String,
    },

    /// The declared order names a component the product does not declare.
    #[error("Component '{component}' in order is not declared by product '{product}'")]
    UnknownOrderEntry {
        /// The unknown component.
        component: String,
        /// Product name.
        product: String,
    },

    /// A required zone metadata key is absent or not a string.
    #[error("Zone metadata '{key}' is missing or not a string")]
    MissingZoneMeta {
        /// The metadata key.
        key: String,
    },

    /// Unsupported helm mode in zone metadata.
    #[error("Unsupported helm mode '{value}', expected 'component' or 'product'")]
    InvalidHelmMode {
        /// The rejected value.
        value: String,
    },

    /// A zone is created where one already exists.
    #[error("Zone already exists at {path}")]
    ZoneExists {
        /// Zone directory.
        path: PathBuf,
    },
}

/// Errors raised while merging zone overrides onto default components.
#[derive(Debug, Error)]
pub enum MergeError {
    /// An override value could not be decoded into a partial component.
    #[error("Failed to decode override for component '{component}': {message}")]
    DecodeFailed {
        /// Component being overridden.
        component: String,
        /// Decoder message.
        message: String,
    },
}

/// Errors raised by the host patch mini-language.
#[derive(Debug, Error)]
pub enum PatchParseError {
    /// A patch token does not follow the grammar.
    #[error("Malformed host patch '{token}': {reason}")]
    Malformed {
        /// The offending token.
        token: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A patch targets a group that is neither a component nor the cluster group.
    #[error("Host patch targets unknown group '{group}', supported: {supported}")]
    UnknownTarget {
        /// The rejected group.
        group: String,
        /// Comma-separated list of valid targets.
        supported: String,
    },
}

/// Component lookup and selector errors.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// The product does not declare this component.
    #[error("Product does not have component '{name}'")]
    Unknown {
        /// The requested component.
        name: String,
    },

    /// A component selector does not follow `name[/version[/longVersion]]`.
    #[error("Invalid component selector '{selector}'")]
    InvalidSelector {
        /// The offending selector.
        selector: String,
    },
}

/// Inventory errors.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The group does not exist.
    #[error("Group not found: {name}")]
    GroupNotFound {
        /// Requested group name.
        name: String,
    },

    /// A group with this name already exists at this level.
    #[error("Group already exists: {name}")]
    DuplicateGroup {
        /// The duplicated group name.
        name: String,
    },

    /// A subnet specification could not be parsed.
    #[error("Invalid subnet: {spec}")]
    InvalidSubnet {
        /// The rejected specification.
        spec: String,
    },

    /// The inventory could not be encoded or decoded.
    #[error("Inventory serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },
}

/// Service computation errors.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// A service could not be computed.
    #[error("Failed to compute service '{service}' of component '{component}': {reason}")]
    ServiceFailed {
        /// Owning component.
        component: String,
        /// Service name.
        service: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Playbook generation errors.
#[derive(Debug, Error)]
pub enum PlaybookError {
    /// The order references a component without a default declaration.
    #[error("Component '{component}' is not declared by the product")]
    UndeclaredComponent {
        /// The missing component.
        component: String,
    },

    /// A generated tag collides with a reserved or already-owned tag.
    #[error("Tag '{tag}' of component '{component}' collides with another tag")]
    TagCollision {
        /// The colliding tag.
        tag: String,
        /// Component that introduced it.
        component: String,
    },

    /// The playbook could not be encoded or decoded.
    #[error("Playbook serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },
}

/// An advisory invariant failure found by an explicit check pass.
///
/// Check failures never block resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{component}.{service}: {message}")]
pub struct CheckError {
    /// Owning component.
    pub component: String,
    /// Service name.
    pub service: String,
    /// The violated invariant.
    pub message: String,
}

/// Result type alias for sail operations.
pub type Result<T> = std::result::Result<T, SailError>;

impl SailError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error comes from operator input rather than the
    /// declarations shipped with the product.
    #[must_use]
    pub const fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::Patch(_) | Self::Component(_) | Self::Merge(_) | Self::CheckFailed { .. }
        )
    }
}

impl LoadError {
    /// Creates a parse error with an optional location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }
}

impl PatchParseError {
    /// Creates a malformed-token error.
    #[must_use]
    pub fn malformed(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

impl InventoryError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl ComponentError {
    /// Creates an unknown-component error.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }
}
