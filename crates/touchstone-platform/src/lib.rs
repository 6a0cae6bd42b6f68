// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authenticated platform operations layered on the transport capability.
//!
//! [`Platform`] owns a parsed [`ApiUrl`] and a [`Transport`] and exposes the
//! operations both sides of the system need: the capture client performs the
//! readiness handshake, authenticates, prefetches the baseline case names,
//! submits binary batches, and seals a version; the comparator service polls
//! the comparison job list and submits results and statistics.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use touchstone_transport::{ApiUrl, HttpTransport, Response, Transport};
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from platform operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The request never produced a response.
    #[error("transport error: {message}")]
    Transport {
        /// Description from the transport layer.
        message: String,
    },

    /// Authentication was rejected.
    #[error("authentication failed: {status}")]
    Auth {
        /// HTTP status of the rejection.
        status: i32,
    },

    /// The server responded but the response was semantically rejected.
    #[error("{message}")]
    Server {
        /// What was wrong with the response.
        message: String,
    },
}

impl PlatformError {
    fn transport(response: &Response) -> Self {
        Self::Transport {
            message: response.body.clone(),
        }
    }

    fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonJob
// ---------------------------------------------------------------------------

/// A platform-assigned pair of stored artifacts to compare.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonJob {
    /// Job identifier, used when submitting the comparison result.
    pub id: String,
    /// Batch id of the candidate artifact.
    pub src_batch: String,
    /// Message id of the candidate artifact.
    pub src_message: String,
    /// Batch id of the reference artifact.
    pub dst_batch: String,
    /// Message id of the reference artifact.
    pub dst_message: String,
    /// Whether the candidate side already has a posted summary.
    #[serde(default)]
    pub src_processed: bool,
    /// Whether the reference side already has a posted summary.
    #[serde(default)]
    pub dst_processed: bool,
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Authenticated operations against the remote platform.
pub struct Platform {
    api: ApiUrl,
    transport: Box<dyn Transport>,
}

impl Platform {
    /// Build a platform client over an explicit transport.
    pub fn new(api: ApiUrl, transport: Box<dyn Transport>) -> Self {
        Self { api, transport }
    }

    /// Build a platform client with the default HTTP transport.
    pub fn from_api_url(api: ApiUrl) -> Self {
        let transport = HttpTransport::new(api.root());
        Self::new(api, Box::new(transport))
    }

    /// The parsed API URL this client talks to.
    pub fn api(&self) -> &ApiUrl {
        &self.api
    }

    /// Whether an authentication token has been cached on the transport.
    pub fn has_token(&self) -> bool {
        self.transport.has_token()
    }

    /// Probe that the platform is ready to serve requests.
    ///
    /// Succeeds iff the status endpoint responds 200 with `ready: true`.
    pub async fn handshake(&self) -> Result<(), PlatformError> {
        let response = self.transport.get(&self.api.route("/platform")).await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 200 {
            return Err(PlatformError::server("unexpected server response"));
        }
        let doc: Value = serde_json::from_str(&response.body)
            .map_err(|_| PlatformError::server("failed to parse response from the server"))?;
        match doc.get("ready").and_then(Value::as_bool) {
            None => Err(PlatformError::server(
                "response from the server is ill-formed",
            )),
            Some(false) => Err(PlatformError::server("server is not ready")),
            Some(true) => Ok(()),
        }
    }

    /// Exchange the API key for a token, cached for subsequent requests.
    pub async fn auth(&mut self, api_key: &str) -> Result<(), PlatformError> {
        let content = serde_json::json!({ "key": api_key }).to_string();
        let response = self
            .transport
            .post(&self.api.route("/client/signin"), &content)
            .await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 200 {
            return Err(PlatformError::Auth {
                status: response.status,
            });
        }
        let doc: Value = serde_json::from_str(&response.body)
            .map_err(|_| PlatformError::server("failed to parse server response"))?;
        match doc.get("token").and_then(Value::as_str) {
            Some(token) => {
                self.transport.set_token(token);
                Ok(())
            }
            None => Err(PlatformError::server("unexpected server response")),
        }
    }

    /// Names of the baseline test cases known for `{team, suite}`.
    pub async fn elements(&self) -> Result<Vec<String>, PlatformError> {
        let route = format!("/element/{}/{}", self.api.team, self.api.suite);
        let response = self.transport.get(&self.api.route(&route)).await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 200 {
            return Err(PlatformError::server("unexpected server response"));
        }
        let doc: Vec<Value> = serde_json::from_str(&response.body)
            .map_err(|_| PlatformError::server("failed to parse server response"))?;
        let elements: Vec<String> = doc
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        if elements.is_empty() {
            return Err(PlatformError::server("suite has no test case"));
        }
        Ok(elements)
    }

    /// Submit a binary batch payload, retrying up to `max_retries` times.
    ///
    /// Returns the accumulated error descriptions; an empty list means the
    /// submission succeeded.
    pub async fn submit(&self, content: &[u8], max_retries: u32) -> Vec<String> {
        let mut errors = Vec::new();
        for attempt in 1..=max_retries {
            let response = self
                .transport
                .binary_post(&self.api.route("/client/submit"), content)
                .await;
            if response.status == 204 {
                return Vec::new();
            }
            errors.push(format!(
                "failed to post testresults for a group of testcases ({attempt}/{max_retries})"
            ));
        }
        errors.push("giving up on submitting testresults".to_string());
        errors
    }

    /// Declare that no more artifacts will be submitted for this version.
    pub async fn seal(&self) -> Result<(), PlatformError> {
        let route = format!(
            "/batch/{}/{}/{}/seal2",
            self.api.team, self.api.suite, self.api.version
        );
        let response = self.transport.post(&self.api.route(&route), "").await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 204 {
            return Err(PlatformError::server(format!(
                "failed to seal specified version: {}",
                response.status
            )));
        }
        Ok(())
    }

    /// Fetch the raw comparison job list body.
    pub async fn cmp_jobs(&self) -> Result<String, PlatformError> {
        let response = self.transport.get(&self.api.route("/cmp")).await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 200 {
            return Err(PlatformError::server(format!(
                "unexpected server response: {}",
                response.status
            )));
        }
        Ok(response.body)
    }

    /// Fetch and parse the comparison job list.
    pub async fn comparison_jobs(&self) -> Result<Vec<ComparisonJob>, PlatformError> {
        let body = self.cmp_jobs().await?;
        serde_json::from_str(&body).map_err(|error| {
            warn!(%error, "malformed comparison job list");
            PlatformError::server("failed to parse comparison job list")
        })
    }

    /// Submit a comparison result or per-message summary to the given route.
    pub async fn cmp_submit(&self, url: &str, body: &str) -> Result<(), PlatformError> {
        let response = self.transport.patch(&self.api.route(url), body).await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 204 {
            return Err(PlatformError::server(format!(
                "failed to submit result: {}",
                response.status
            )));
        }
        Ok(())
    }

    /// Submit comparator service statistics.
    pub async fn cmp_stats(&self, body: &str) -> Result<(), PlatformError> {
        let response = self
            .transport
            .post(&self.api.route("/cmp/stats"), body)
            .await;
        if response.status == -1 {
            return Err(PlatformError::transport(&response));
        }
        if response.status != 204 {
            return Err(PlatformError::server(format!(
                "unexpected server response: {}",
                response.status
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_job_parses_camel_case() {
        let body = r#"{
            "id": "job-1",
            "srcBatch": "b2", "srcMessage": "m2",
            "dstBatch": "b1", "dstMessage": "m1",
            "srcProcessed": false, "dstProcessed": true
        }"#;
        let job: ComparisonJob = serde_json::from_str(body).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.src_batch, "b2");
        assert_eq!(job.dst_message, "m1");
        assert!(!job.src_processed);
        assert!(job.dst_processed);
    }

    #[test]
    fn processed_flags_default_to_false() {
        let body = r#"{
            "id": "job-1",
            "srcBatch": "b2", "srcMessage": "m2",
            "dstBatch": "b1", "dstMessage": "m1"
        }"#;
        let job: ComparisonJob = serde_json::from_str(body).unwrap();
        assert!(!job.src_processed);
        assert!(!job.dst_processed);
    }
}
