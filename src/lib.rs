// SPDX-License-Identifier: MIT OR Apache-2.0
//! Touchstone: a regression-testing data platform client and comparator.
//!
//! Instrumented programs capture named values, array accumulations, hit
//! counters, and timed metrics against test cases; captures form versioned
//! artifacts that are persisted locally or submitted to the platform. The
//! comparator service pulls pairs of artifacts and posts scored structural
//! diffs.
//!
//! This crate re-exports the public surface of the member crates. Most
//! programs only need [`Client`] and the [`DataPoint`] constructors:
//!
//! ```no_run
//! use touchstone::{Client, ClientOptions, DataPoint};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = Client::new();
//! client.configure(ClientOptions {
//!     api_key: "key".into(),
//!     api_url: "https://api.example.com/@/acme/suite/v1.0".into(),
//!     ..ClientOptions::default()
//! }).await?;
//!
//! client.declare_testcase("students");
//! client.check("gpa", DataPoint::number_double(3.9));
//! client.add_hit_count("lookups")?;
//! client.post().await;
//! client.seal().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use touchstone_case::{
    CaseError, CaseStore, Category, Metadata, Overview, ResultEntry, ResultFile, ResultFileError,
    Selection, TestCase,
};
pub use touchstone_client::{Client, ClientError, DataFormat, ScopedTimer};
pub use touchstone_compare::{
    CaseComparison, Cellar, ComparisonOverview, MatchType, SuiteComparison, TypeComparison,
    compare, flatten,
};
pub use touchstone_config::{ClientMode, ClientOptions, ConfigError, ServiceOptions};
pub use touchstone_platform::{ComparisonJob, Platform, PlatformError};
pub use touchstone_transport::{ApiUrl, ApiUrlError, HttpTransport, Response, Transport};
pub use touchstone_types::{DataPoint, ValueError, ValueKind};
pub use touchstone_wire::{DecodeError, Message, ResultCategory};
