// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparator service control loop.
//!
//! The service moves through `Init → Startup → Running → Terminated`. The
//! startup stage probes the platform until it reports ready or the attempt
//! budget runs out. The running stage polls the comparison job list,
//! processes each job in order — loading the two artifacts from the storage
//! tree, posting per-message summaries for sides the platform has not seen
//! yet, and submitting the scored comparison — and sleeps between empty
//! polls.
//!
//! The service tolerates individual job failures: an orphaned or undecodable
//! artifact is logged and counted, in the hope that a later cycle can
//! reprocess it. A run of consecutive failures past `min(batch_len,
//! max_failures)` aborts the batch and terminates the service, since it
//! usually means something is systemically wrong.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod logging;
mod service;
mod stats;

pub use logging::init_logging;
pub use service::{Service, ServiceError, ServiceState};
pub use stats::ServiceStats;
