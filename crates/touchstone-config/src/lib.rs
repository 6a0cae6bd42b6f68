// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration for the capture client and the comparator service.
//!
//! Client options resolve in three layers: explicit values, then the
//! `TOUCA_API_KEY` / `TOUCA_API_URL` / `TOUCA_TEST_VERSION` environment
//! overrides (environment wins), then the `{team, suite, version}` triple
//! carried by a long-form API URL — which must agree with any explicitly
//! configured slugs. A configuration with nothing set at all is accepted as
//! experimentation mode: the client stays unconfigured for submission and
//! captures become no-ops.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod service;

pub use client::{ClientMode, ClientOptions, ResolvedClient, resolve, resolve_with_env};
pub use service::ServiceOptions;

use thiserror::Error;
use touchstone_transport::ApiUrlError;

/// Errors from configuration parsing or resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required parameter was left unset.
    #[error("required configuration parameter \"{param}\" is missing")]
    Missing {
        /// Name of the missing parameter.
        param: String,
    },

    /// An explicitly configured slug disagrees with the API URL tail.
    #[error("parameter \"{param}\" is in conflict with API URL")]
    Conflict {
        /// Name of the conflicting parameter.
        param: String,
    },

    /// A parameter name was not recognized.
    #[error("unknown parameter \"{param}\"")]
    Unknown {
        /// The unrecognized name.
        param: String,
    },

    /// A parameter value failed validation.
    #[error("configuration parameter \"{param}\" is invalid: {reason}")]
    Invalid {
        /// Name of the offending parameter.
        param: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The API URL could not be parsed.
    #[error("invalid url: \"{url}\"")]
    InvalidUrl {
        /// The offending input.
        url: String,
    },

    /// The configuration profile file is absent.
    #[error("configuration file is missing")]
    FileMissing,

    /// The configuration profile file could not be interpreted.
    #[error("configuration file is not valid")]
    FileInvalid,
}

impl From<ApiUrlError> for ConfigError {
    fn from(error: ApiUrlError) -> Self {
        match error {
            ApiUrlError::Invalid { url } => ConfigError::InvalidUrl { url },
            ApiUrlError::Conflict { param } => ConfigError::Conflict { param },
        }
    }
}
