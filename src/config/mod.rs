//! Workspace configuration and persistence.
//!
//! This module handles everything that touches the sail workspace on disk:
//! - Directory layout of products and target zones
//! - Loading products and zones, and writing zones back
//! - Hashing rendered artifacts for change detection

mod hash;
mod loader;
mod option;

pub use hash::ArtifactHasher;
pub use loader::{DumpReport, ZoneLoader, load_dotenv};
pub use option::{
    DEFAULT_PACKAGES_DIR, DEFAULT_PRODUCTS_DIR, DEFAULT_TARGETS_DIR, ProductPaths, SailOption,
    ZonePaths,
};
