// SPDX-License-Identifier: MIT OR Apache-2.0
//! Test case documents and the in-process case store.
//!
//! A [`TestCase`] aggregates everything captured for one execution of a
//! workflow under test: categorized results (checks and assumptions), timed
//! metrics, and the `{team, suite, version, case}` identity it was captured
//! for. The [`CaseStore`] keeps the live cases of a client and resolves
//! which case a capture call targets, under either a process-wide or a
//! per-caller selection policy.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod resultfile;
mod store;
mod testcase;

pub use error::CaseError;
pub use resultfile::{ResultFile, ResultFileError};
pub use store::{CaseStore, Selection};
pub use testcase::{Category, Metadata, Overview, ResultEntry, TestCase};
