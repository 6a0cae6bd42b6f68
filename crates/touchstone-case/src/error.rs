// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by capture operations.

use thiserror::Error;

/// Errors from test-case capture operations and store lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaseError {
    /// A capture operation contradicts the type already stored under a key.
    #[error("key \"{key}\" already holds a value of a different type")]
    TypeConflict {
        /// The conflicting result key.
        key: String,
    },

    /// The named key or test case does not exist.
    #[error("key \"{key}\" does not exist")]
    NotFound {
        /// The missing key or case name.
        key: String,
    },
}
