//! Advisory checks over a resolved product.

use serde::Serialize;

use crate::error::CheckError;

/// Result of a check pass containing every finding.
///
/// Nothing in a report blocks resolution.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Violated service invariants.
    pub errors: Vec<CheckError>,
    /// Suspicious but valid declarations.
    pub warnings: Vec<String>,
}

impl CheckReport {
    /// Returns true if no invariant is violated.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}
