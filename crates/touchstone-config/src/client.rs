// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capture-client options and their resolution.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use touchstone_transport::ApiUrl;

use crate::ConfigError;

/// Environment variables that override explicit configuration.
const ENV_API_KEY: &str = "TOUCA_API_KEY";
const ENV_API_URL: &str = "TOUCA_API_URL";
const ENV_TEST_VERSION: &str = "TOUCA_TEST_VERSION";

// ---------------------------------------------------------------------------
// ClientOptions
// ---------------------------------------------------------------------------

/// Recognized capture-client options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// API key for authenticating against the platform.
    pub api_key: String,
    /// Platform API URL; the long form may carry `/@/team/suite/version`.
    pub api_url: String,
    /// Team slug.
    pub team: String,
    /// Suite slug.
    pub suite: String,
    /// Version slug.
    pub version: String,
    /// Skip authentication and submission.
    pub offline: bool,
    /// `true` selects the process-wide shared case selection; `false` gives
    /// each caller thread its own current case.
    pub concurrency: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: String::new(),
            team: String::new(),
            suite: String::new(),
            version: String::new(),
            offline: false,
            concurrency: true,
        }
    }
}

impl ClientOptions {
    /// Build options from a string map, as front-ends pass them.
    ///
    /// Boolean parameters follow the reference behavior: any value other
    /// than `"false"` is true.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "api_key" => options.api_key = value.clone(),
                "api_url" => options.api_url = value.clone(),
                "team" => options.team = value.clone(),
                "suite" => options.suite = value.clone(),
                "version" => options.version = value.clone(),
                "offline" => options.offline = value != "false",
                "concurrency" => options.concurrency = value != "false",
                other => {
                    return Err(ConfigError::Unknown {
                        param: other.to_string(),
                    });
                }
            }
        }
        Ok(options)
    }

    /// Load options from a JSON profile with a top-level `touchstone`
    /// section whose string members mirror the option names.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileMissing);
        }
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileInvalid)?;
        let parsed: Value =
            serde_json::from_str(&content).map_err(|_| ConfigError::FileInvalid)?;
        let section = parsed
            .get("touchstone")
            .and_then(Value::as_object)
            .ok_or(ConfigError::FileInvalid)?;
        let mut map = BTreeMap::new();
        for (key, value) in section {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                // Non-scalar members are not configuration values.
                _ => continue,
            };
            map.insert(key.clone(), rendered);
        }
        Self::from_map(&map)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// What the resolved configuration lets the client do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Nothing was configured; captures are no-ops until configured.
    Pristine,
    /// Captures and local saves work; authentication and submission skipped.
    Offline,
    /// Full operation against the platform.
    Online,
}

/// Outcome of resolving client options.
#[derive(Debug, Clone)]
pub struct ResolvedClient {
    /// Options with the slug triple filled in.
    pub options: ClientOptions,
    /// Parsed API URL, present whenever one was configured.
    pub api: Option<ApiUrl>,
    /// What the configuration lets the client do.
    pub mode: ClientMode,
}

/// Resolve options against the process environment.
pub fn resolve(options: ClientOptions) -> Result<ResolvedClient, ConfigError> {
    resolve_with_env(options, |name| std::env::var(name).ok())
}

/// Resolve options with an explicit environment lookup.
pub fn resolve_with_env(
    mut options: ClientOptions,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedClient, ConfigError> {
    // Environment variables take precedence over explicit configuration.
    if let Some(value) = env(ENV_API_KEY) {
        options.api_key = value;
    }
    if let Some(value) = env(ENV_API_URL) {
        options.api_url = value;
    }
    if let Some(value) = env(ENV_TEST_VERSION) {
        options.version = value;
    }

    // A long-form API URL carries the slug triple; reconcile it with the
    // explicitly configured slugs.
    let api = if options.api_url.is_empty() {
        None
    } else {
        let mut api = ApiUrl::parse(&options.api_url)?;
        api.confirm(&options.team, &options.suite, &options.version)?;
        options.team = api.team.clone();
        options.suite = api.suite.clone();
        options.version = api.version.clone();
        Some(api)
    };

    // Nothing set at all: the user is experimenting locally.
    if options.api_key.is_empty()
        && options.api_url.is_empty()
        && options.team.is_empty()
        && options.suite.is_empty()
        && options.version.is_empty()
    {
        return Ok(ResolvedClient {
            options,
            api: None,
            mode: ClientMode::Pristine,
        });
    }

    for (param, value) in [
        ("team", &options.team),
        ("suite", &options.suite),
        ("version", &options.version),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Missing {
                param: param.to_string(),
            });
        }
    }

    if options.offline {
        return Ok(ResolvedClient {
            options,
            api,
            mode: ClientMode::Offline,
        });
    }

    for (param, value) in [("api_key", &options.api_key), ("api_url", &options.api_url)] {
        if value.is_empty() {
            return Err(ConfigError::Missing {
                param: param.to_string(),
            });
        }
    }

    Ok(ResolvedClient {
        options,
        api,
        mode: ClientMode::Online,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
