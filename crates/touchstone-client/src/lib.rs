// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capture client facade.
//!
//! A [`Client`] is the explicit handle an instrumented program talks to:
//! configure it once, declare a test case, and capture values against the
//! current case. Captures are deliberately forgiving — until the client is
//! configured and a case is declared they are silent no-ops, so
//! instrumentation can stay in production code paths. Submission
//! ([`Client::post`], [`Client::seal`]) and local persistence
//! ([`Client::save`]) operate on the cases captured so far.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use touchstone_case::{CaseError, CaseStore, Selection, TestCase};
use touchstone_config::{ClientMode, ClientOptions, ConfigError, ResolvedClient, resolve};
use touchstone_platform::{Platform, PlatformError};
use touchstone_types::DataPoint;
use tracing::{error, warn};

/// Maximum number of attempts to re-submit a failed batch.
const POST_MAX_RETRIES: u32 = 2;

/// Maximum number of cases grouped into a single submission.
const POST_MAX_CASES: usize = 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The platform rejected an operation.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A capture operation failed.
    #[error(transparent)]
    Case(#[from] CaseError),

    /// The operation needs a configured client.
    #[error("client is not configured to contact server")]
    NotConfigured,

    /// The save destination already exists and overwrite was not requested.
    #[error("file already exists")]
    FileExists,

    /// A filesystem operation failed.
    #[error("failed to save content to disk: {0}")]
    Io(#[source] std::io::Error),
}

/// Output format for locally saved artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Human-readable JSON document per case.
    Json,
    /// The binary batch envelope.
    Binary,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The capture client: an explicit handle owning the case store, the
/// resolved configuration, and the platform connection.
pub struct Client {
    store: Mutex<CaseStore>,
    resolved: Option<ResolvedClient>,
    platform: Option<Platform>,
    elements: Vec<String>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create an unconfigured client. Captures are no-ops until
    /// [`configure`](Self::configure) succeeds.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(CaseStore::new(Selection::Shared)),
            resolved: None,
            platform: None,
            elements: Vec::new(),
        }
    }

    /// Resolve the given options and, unless offline or pristine,
    /// authenticate against the platform and prefetch the baseline case
    /// names for this suite.
    pub async fn configure(&mut self, options: ClientOptions) -> Result<(), ClientError> {
        let resolved = resolve(options)?;
        let selection = if resolved.options.concurrency {
            Selection::Shared
        } else {
            Selection::PerCaller
        };
        *self.lock_store() = CaseStore::new(selection);

        if resolved.mode == ClientMode::Online {
            let api = resolved.api.clone().ok_or(ClientError::NotConfigured)?;
            let mut platform = Platform::from_api_url(api);
            platform.auth(&resolved.options.api_key).await?;
            self.elements = platform.elements().await?;
            self.platform = Some(platform);
        }
        self.resolved = Some(resolved);
        Ok(())
    }

    /// Configure from a string map, as command-line front-ends pass options.
    pub async fn configure_from_map(
        &mut self,
        map: &BTreeMap<String, String>,
    ) -> Result<(), ClientError> {
        self.configure(ClientOptions::from_map(map)?).await
    }

    /// Whether configuration has completed.
    pub fn is_configured(&self) -> bool {
        self.resolved.is_some()
    }

    /// Names of the baseline test cases fetched at configure time.
    pub fn get_testcases(&self) -> Vec<String> {
        self.elements.clone()
    }

    /// Declare `name` as the current test case for this caller, creating it
    /// on first reference. Without configuration this is a no-op.
    pub fn declare_testcase(&self, name: &str) {
        let Some(resolved) = &self.resolved else {
            return;
        };
        let options = &resolved.options;
        self.lock_store().declare(name, || {
            TestCase::new(&options.team, &options.suite, &options.version, name)
        });
    }

    /// Drop all data captured for the named case.
    pub fn forget_testcase(&self, name: &str) -> Result<(), ClientError> {
        let result = self.lock_store().forget(name);
        if let Err(err) = &result {
            warn!(%err, "failed to forget testcase");
        }
        Ok(result?)
    }

    /// Capture a value that contributes to regression scoring.
    pub fn check(&self, key: &str, value: DataPoint) {
        if let Some(case) = self.lock_store().current_mut() {
            case.check(key, value);
        }
    }

    /// Capture an invariant assumption.
    pub fn assume(&self, key: &str, value: DataPoint) {
        if let Some(case) = self.lock_store().current_mut() {
            case.assume(key, value);
        }
    }

    /// Append an element to the array captured under `key`.
    pub fn add_array_element(&self, key: &str, value: DataPoint) -> Result<(), ClientError> {
        match self.lock_store().current_mut() {
            Some(case) => Ok(case.add_array_element(key, value)?),
            None => Ok(()),
        }
    }

    /// Increment the hit counter captured under `key`.
    pub fn add_hit_count(&self, key: &str) -> Result<(), ClientError> {
        match self.lock_store().current_mut() {
            Some(case) => Ok(case.add_hit_count(key)?),
            None => Ok(()),
        }
    }

    /// Record a metric directly as a millisecond duration.
    pub fn add_metric(&self, key: &str, duration_ms: u64) {
        if let Some(case) = self.lock_store().current_mut() {
            case.add_metric(key, duration_ms);
        }
    }

    /// Start the metric `key` on the current case.
    pub fn start_timer(&self, key: &str) {
        if let Some(case) = self.lock_store().current_mut() {
            case.tic(key);
        }
    }

    /// Finalize the metric `key` on the current case.
    pub fn stop_timer(&self, key: &str) -> Result<(), ClientError> {
        match self.lock_store().current_mut() {
            Some(case) => Ok(case.toc(key)?),
            None => Ok(()),
        }
    }

    /// Time a region of code: starts the metric now, stops it when the
    /// returned guard is dropped.
    pub fn scoped_timer<'a>(&'a self, key: &str) -> ScopedTimer<'a> {
        ScopedTimer::new(self, key)
    }

    /// Save the named cases (all cases when `names` is empty) to `path`.
    pub fn save(
        &self,
        path: &Path,
        names: &[String],
        format: DataFormat,
        overwrite: bool,
    ) -> Result<(), ClientError> {
        if path.exists() && !overwrite {
            return Err(ClientError::FileExists);
        }
        let cases = self.find_testcases(names);
        match format {
            DataFormat::Json => {
                let doc: Vec<serde_json::Value> = cases.iter().map(TestCase::json).collect();
                let rendered =
                    serde_json::to_string(&doc).expect("case documents serialize to JSON");
                std::fs::write(path, rendered).map_err(ClientError::Io)
            }
            DataFormat::Binary => {
                std::fs::write(path, TestCase::serialize(&cases)).map_err(ClientError::Io)
            }
        }
    }

    /// Submit all unsent cases in groups, retrying each group.
    ///
    /// Submission errors are accumulated and logged; the return value is
    /// the overall success of the operation.
    pub async fn post(&self) -> bool {
        let Some(platform) = &self.platform else {
            error!("client is not configured to contact server");
            return false;
        };
        if !platform.has_token() {
            error!("client is not authenticated to the server");
            return false;
        }

        // Only cases that have never been posted, or have been re-dirtied
        // since, are submitted.
        let pending: Vec<(String, TestCase)> = {
            let store = self.lock_store();
            store
                .iter()
                .filter(|(_, case)| !case.is_posted())
                .map(|(name, case)| (name.clone(), case.clone()))
                .collect()
        };

        let mut all_posted = true;
        for group in pending.chunks(POST_MAX_CASES) {
            let cases: Vec<TestCase> = group.iter().map(|(_, case)| case.clone()).collect();
            let buffer = TestCase::serialize(&cases);
            let errors = platform.submit(&buffer, POST_MAX_RETRIES).await;
            if !errors.is_empty() {
                for message in &errors {
                    warn!("{message}");
                }
                error!("failed to post test results for a group of testcases");
                all_posted = false;
                continue;
            }
            let mut store = self.lock_store();
            for (name, _) in group {
                if let Some(case) = store.get_mut(name) {
                    case.mark_posted();
                }
            }
        }
        all_posted
    }

    /// Declare that no more artifacts will be submitted for this version.
    pub async fn seal(&self) -> bool {
        let Some(platform) = &self.platform else {
            error!("client is not configured to contact server");
            return false;
        };
        if !platform.has_token() {
            error!("client is not authenticated to the server");
            return false;
        }
        match platform.seal().await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to seal version");
                false
            }
        }
    }

    fn find_testcases(&self, names: &[String]) -> Vec<TestCase> {
        let store = self.lock_store();
        let selected: Vec<String> = if names.is_empty() {
            store.names()
        } else {
            names.to_vec()
        };
        selected
            .iter()
            .filter_map(|name| store.get(name).cloned())
            .collect()
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, CaseStore> {
        self.store.lock().expect("case store mutex poisoned")
    }
}

// ---------------------------------------------------------------------------
// ScopedTimer
// ---------------------------------------------------------------------------

/// Guard that times a region of code on the current test case.
///
/// The metric starts when the guard is created and stops when the guard is
/// dropped, so the measured span covers everything the guard outlives —
/// including suspension points inside the guarded region.
pub struct ScopedTimer<'a> {
    client: &'a Client,
    key: String,
}

impl<'a> ScopedTimer<'a> {
    fn new(client: &'a Client, key: &str) -> Self {
        client.start_timer(key);
        Self {
            client,
            key: key.to_string(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        // The matching tic was issued in the constructor; a failure here
        // means the case vanished in between and is not actionable.
        let _ = self.client.stop_timer(&self.key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
