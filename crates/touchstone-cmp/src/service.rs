// SPDX-License-Identifier: MIT OR Apache-2.0
//! The service state machine and per-job orchestration.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use touchstone_case::TestCase;
use touchstone_compare::CaseComparison;
use touchstone_config::{ConfigError, ServiceOptions};
use touchstone_platform::{ComparisonJob, Platform};
use touchstone_transport::ApiUrl;
use tracing::{debug, error, info, warn};

use crate::stats::ServiceStats;

// ---------------------------------------------------------------------------
// Errors and state
// ---------------------------------------------------------------------------

/// Errors that terminate the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The startup stage exhausted its handshake attempts.
    #[error("failed during start-up stage")]
    StartupFailed,

    /// Too many consecutive per-job failures.
    #[error("exceeded maximum consecutive failures")]
    TooManyFailures,

    /// The service was driven from the wrong state.
    #[error("service is not in the {expected:?} state")]
    InvalidState {
        /// State the operation requires.
        expected: ServiceState,
    },
}

/// Lifecycle of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Constructed, startup not yet attempted.
    Init,
    /// Probing the platform for readiness.
    Startup,
    /// Polling and processing comparison jobs.
    Running,
    /// Finished, successfully or not.
    Terminated,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The comparator service.
pub struct Service {
    options: ServiceOptions,
    platform: Platform,
    state: ServiceState,
    stats: ServiceStats,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Service {
    /// Validate the options and construct the service in the `Init` state.
    pub fn new(options: ServiceOptions) -> Result<Self, ServiceError> {
        options.validate()?;
        if !options.storage_dir.is_dir() {
            return Err(ServiceError::Config(ConfigError::Invalid {
                param: "storage_dir".to_string(),
                reason: format!("\"{}\" is not a directory", options.storage_dir.display()),
            }));
        }
        let api = ApiUrl::parse(&options.api_url).map_err(ConfigError::from)?;
        let platform = Platform::from_api_url(api);
        Ok(Self {
            options,
            platform,
            state: ServiceState::Init,
            stats: ServiceStats::default(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Statistics over the jobs processed so far.
    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// Run the startup stage: handshake until the platform reports ready,
    /// sleeping `startup_interval` between failures, within the
    /// `startup_timeout` attempt budget.
    pub async fn init(&mut self) -> Result<(), ServiceError> {
        if self.state != ServiceState::Init {
            return Err(ServiceError::InvalidState {
                expected: ServiceState::Init,
            });
        }
        self.state = ServiceState::Startup;
        info!("running start-up stage");

        let max_attempts = self.options.startup_timeout.div_ceil(self.options.startup_interval);
        let interval = Duration::from_millis(self.options.startup_interval);
        for attempt in 1..=max_attempts {
            if self.platform.handshake().await.is_ok() {
                info!("start-up phase completed");
                self.state = ServiceState::Running;
                return Ok(());
            }
            warn!("running start-up stage: attempt ({attempt}/{max_attempts})");
            tokio::time::sleep(interval).await;
        }
        self.state = ServiceState::Terminated;
        Err(ServiceError::StartupFailed)
    }

    /// The running stage: poll the job list, process batches, sleep between
    /// empty polls. Returns only when a batch aborts on the
    /// consecutive-failure guard.
    pub async fn run(&mut self) -> Result<(), ServiceError> {
        if self.state != ServiceState::Running {
            return Err(ServiceError::InvalidState {
                expected: ServiceState::Running,
            });
        }
        info!("starting to run comparator in service mode");
        let interval = Duration::from_millis(self.options.polling_interval);
        loop {
            let jobs = match self.platform.comparison_jobs().await {
                Ok(jobs) => jobs,
                Err(err) => {
                    warn!(%err, "failed to fetch comparison jobs");
                    tokio::time::sleep(interval).await;
                    continue;
                }
            };
            if jobs.is_empty() {
                tokio::time::sleep(interval).await;
                continue;
            }
            if let Err(err) = self.run_task(&jobs).await {
                warn!("failed to perform periodic operation");
                self.state = ServiceState::Terminated;
                return Err(err);
            }
        }
    }

    /// Process one batch of jobs in order.
    ///
    /// Individual failures are tolerated so a later cycle can reprocess the
    /// job, but a run of consecutive failures past `min(batch, max_failures)`
    /// aborts: it usually means something is systemically wrong, and pushing
    /// on risks corrupting the remaining jobs.
    pub async fn run_task(&mut self, jobs: &[ComparisonJob]) -> Result<(), ServiceError> {
        let batch_started = Instant::now();
        info!("processing {} comparison jobs", jobs.len());

        let limit = (jobs.len() as u32).min(self.options.max_failures);
        let mut failure_count = 0u32;
        for job in jobs {
            if limit < failure_count {
                error!("exceeded maximum consecutive failures");
                return Err(ServiceError::TooManyFailures);
            }
            if !self.process_job_attempt(job).await {
                error!("{}: failed to process comparison job", job.id);
                failure_count += 1;
                continue;
            }
            failure_count = 0;
        }

        let elapsed = batch_started.elapsed().as_millis();
        info!("processed {} comparison jobs: ({} ms)", jobs.len(), elapsed);
        info!(
            "average processing time: {:.2} ms per job",
            self.stats.average_ms()
        );
        if let Err(err) = self.platform.cmp_stats(&self.stats.json().to_string()).await {
            warn!(%err, "failed to submit comparator statistics");
        }
        Ok(())
    }

    /// Process a single job; `false` marks a per-job failure.
    async fn process_job_attempt(&mut self, job: &ComparisonJob) -> bool {
        let job_started = Instant::now();
        debug!("{}: processing comparison job", job.id);

        let dst = self.load_result_file(&job.dst_batch, &job.dst_message).await;
        let src = self.load_result_file(&job.src_batch, &job.src_message).await;
        let (Some(src), Some(dst)) = (src, dst) else {
            warn!("{}: comparison job is orphaned", job.id);
            return false;
        };

        let src_name = src.metadata().describe();
        let dst_name = dst.metadata().describe();

        // The platform needs a summary of each artifact before it can serve
        // the comparison; post them for any side it has not processed yet.
        if !job.dst_processed && !self.process_message(&dst, &job.dst_message).await {
            error!("{dst_name}: failed to process message");
            return false;
        }
        if job.dst_message != job.src_message
            && !job.src_processed
            && !self.process_message(&src, &job.src_message).await
        {
            error!("{src_name}: failed to process message");
            return false;
        }

        if !self.process_comparison(&src, &dst, &job.id).await {
            error!("{src_name}: failed to compare with {dst_name}");
            return false;
        }

        let elapsed = job_started.elapsed().as_millis() as u64;
        info!("{src_name}: compared with {dst_name} ({elapsed} ms)");
        self.stats.update(elapsed);
        true
    }

    /// Load one artifact from the storage tree.
    async fn load_result_file(&self, batch_id: &str, message_id: &str) -> Option<TestCase> {
        let path: PathBuf = self.options.storage_dir.join(batch_id).join(message_id);
        let buffer = match tokio::fs::read(&path).await {
            Ok(buffer) => buffer,
            Err(_) => {
                error!("{}: result file is missing", path.display());
                return None;
            }
        };
        match TestCase::decode(&buffer) {
            Ok(case) => Some(case),
            Err(err) => {
                error!("{}: failed to parse result: {err}", path.display());
                None
            }
        }
    }

    /// Post the per-message summary for one artifact.
    async fn process_message(&self, case: &TestCase, message_id: &str) -> bool {
        let desc = case.metadata().describe();
        debug!("{desc}: processing message");
        let output = serde_json::json!({
            "overview": case.overview().json(),
            "body": case.json(),
        });
        let route = format!("/cmp/message/{message_id}");
        if let Err(err) = self.platform.cmp_submit(&route, &output.to_string()).await {
            warn!(%err, "{desc}: failed to submit message");
            return false;
        }
        debug!("{desc}: processed message");
        true
    }

    /// Run the comparison for one job and post the result.
    async fn process_comparison(&self, src: &TestCase, dst: &TestCase, job_id: &str) -> bool {
        let tuple = format!(
            "{}_{}",
            dst.metadata().describe(),
            src.metadata().describe()
        );
        debug!("{tuple}: processing comparison job");

        let result = CaseComparison::new(src, dst);
        let output = serde_json::json!({
            "overview": result.overview().json(),
            "body": result.json(),
        });
        let route = format!("/cmp/job/{job_id}");
        if let Err(err) = self.platform.cmp_submit(&route, &output.to_string()).await {
            warn!(%err, "{tuple}: failed to submit comparison job");
            return false;
        }
        debug!("{tuple}: processed comparison job");
        true
    }
}
