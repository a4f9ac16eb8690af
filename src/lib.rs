// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Sail Deploy Zones
//!
//! Resolves declarative product definitions against deployment zones into
//! inventories, variable trees and playbooks.
//!
//! ## Overview
//!
//! A **product** declares components, each with services, roles and
//! variables. A **zone** deploys one product into one environment:
//!
//! - Zone overrides are merged field by field onto the product defaults
//! - Host patches edit the zone inventory (`+web/10.0.0.1`, `-10.0.0.2`)
//! - The CMDB places every enabled component onto hosts
//! - Every service gets its endpoints and URLs computed
//! - A playbook with one tagged play per component is generated
//!
//! ## Modules
//!
//! - [`inventory`]: Hierarchical host/group tree
//! - [`hostpatch`]: Host patch tokens and their application
//! - [`model`]: Products, components and services
//! - [`cmdb`]: Component placement and platform bindings
//! - [`playbook`]: Play and tag generation
//! - [`zone`]: A product resolved against one environment
//! - [`config`]: Workspace layout, loading and dumping
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # products/shop/components.yaml
//! web:
//!   enabled: true
//!   services:
//!     http:
//!       scheme: http
//!       port: 8080
//! db:
//!   enabled: true
//!   roleName: postgres
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cmdb;
pub mod config;
pub mod error;
pub mod hostpatch;
pub mod inventory;
pub mod model;
pub mod playbook;
pub mod zone;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cmdb::Cmdb;
pub use config::{ArtifactHasher, SailOption, ZoneLoader};
pub use error::{Result, SailError};
pub use hostpatch::HostsPatch;
pub use inventory::{Group, Inventory};
pub use model::{Component, Product, Service};
pub use playbook::{Playbook, generate_playbook};
pub use zone::{HelmMode, Zone};
