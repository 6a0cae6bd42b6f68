// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparator-service options.

use std::path::PathBuf;

use clap::Parser;

use crate::ConfigError;

/// Command-line options for the comparator service.
#[derive(Debug, Clone, Parser)]
#[command(name = "touchstone-cmp", about = "Comparator service for the results platform")]
pub struct ServiceOptions {
    /// Platform API URL.
    #[arg(long, env = "TOUCA_API_URL")]
    pub api_url: String,

    /// Root directory of the comparator deployment.
    #[arg(long)]
    pub project_dir: PathBuf,

    /// Directory holding stored artifacts as `<batch>/<message>` files.
    #[arg(long)]
    pub storage_dir: PathBuf,

    /// Directory for rotating log files; console-only when unset.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Minimum severity for console logging.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Upper bound on consecutive per-job failures before aborting.
    #[arg(long, default_value_t = 10)]
    pub max_failures: u32,

    /// Sleep between empty job polls, in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub polling_interval: u64,

    /// Sleep between failed handshake attempts, in milliseconds.
    #[arg(long, default_value_t = 6_000)]
    pub startup_interval: u64,

    /// Total time budget for the startup stage, in milliseconds.
    #[arg(long, default_value_t = 120_000)]
    pub startup_timeout: u64,
}

impl ServiceOptions {
    /// Validate option values that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::Missing {
                param: "api_url".to_string(),
            });
        }
        for (param, value) in [
            ("polling_interval", self.polling_interval),
            ("startup_interval", self.startup_interval),
            ("startup_timeout", self.startup_timeout),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    param: param.to_string(),
                    reason: "must be a positive number of milliseconds".to_string(),
                });
            }
        }
        if !matches!(
            self.log_level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::Invalid {
                param: "log_level".to_string(),
                reason: format!("unrecognized level \"{}\"", self.log_level),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
