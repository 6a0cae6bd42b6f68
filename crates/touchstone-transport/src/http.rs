// SPDX-License-Identifier: MIT OR Apache-2.0
//! The HTTP transport capability.

use async_trait::async_trait;
use tracing::debug;

/// User agent attached to every request.
const USER_AGENT: &str = concat!("touchstone-client/", env!("CARGO_PKG_VERSION"));

/// Outcome of one HTTP exchange.
///
/// Transport-level failures (no response at all) are reported in-band as
/// status `-1` with the error text in the body, so callers branch on status
/// alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code, or `-1` for a transport-level failure.
    pub status: i32,
    /// Response body, or the failure description.
    pub body: String,
}

impl Response {
    /// A transport-level failure for the given verb and route.
    pub fn failure(verb: &str, route: &str) -> Self {
        Self {
            status: -1,
            body: format!("failed to submit HTTP {verb} request to {route}"),
        }
    }
}

/// Thin HTTP capability the platform layer is built on.
///
/// A bearer token, once set, is attached to every subsequent request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Cache a bearer token for subsequent requests.
    fn set_token(&mut self, token: &str);

    /// Whether a bearer token has been set.
    fn has_token(&self) -> bool;

    /// Perform a GET request.
    async fn get(&self, route: &str) -> Response;

    /// Perform a POST request with a JSON body.
    async fn post(&self, route: &str, body: &str) -> Response;

    /// Perform a PATCH request with a JSON body.
    async fn patch(&self, route: &str, body: &str) -> Response;

    /// Perform a POST request with an octet-stream body.
    async fn binary_post(&self, route: &str, content: &[u8]) -> Response;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    root: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a transport rooted at `root` (scheme, host, optional port).
    pub fn new(root: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to construct the HTTP client");
        Self {
            client,
            root: root.into(),
            token: None,
        }
    }

    fn request(&self, method: reqwest::Method, route: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.root, route);
        let mut builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("Accept-Charset", "utf-8");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn dispatch(
        &self,
        verb: &str,
        route: &str,
        builder: reqwest::RequestBuilder,
    ) -> Response {
        match builder.send().await {
            Ok(response) => {
                let status = i32::from(response.status().as_u16());
                let body = response.text().await.unwrap_or_default();
                debug!(verb, route, status, "platform request");
                Response { status, body }
            }
            Err(error) => {
                debug!(verb, route, %error, "platform request failed");
                Response::failure(verb, route)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn get(&self, route: &str) -> Response {
        let builder = self.request(reqwest::Method::GET, route);
        self.dispatch("GET", route, builder).await
    }

    async fn post(&self, route: &str, body: &str) -> Response {
        let builder = self
            .request(reqwest::Method::POST, route)
            .header("Content-Type", "application/json")
            .body(body.to_string());
        self.dispatch("POST", route, builder).await
    }

    async fn patch(&self, route: &str, body: &str) -> Response {
        let builder = self
            .request(reqwest::Method::PATCH, route)
            .header("Content-Type", "application/json")
            .body(body.to_string());
        self.dispatch("PATCH", route, builder).await
    }

    async fn binary_post(&self, route: &str, content: &[u8]) -> Response {
        let builder = self
            .request(reqwest::Method::POST, route)
            .header("Content-Type", "application/octet-stream")
            .body(content.to_vec());
        self.dispatch("POST", route, builder).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_response_shape() {
        let response = Response::failure("GET", "/platform");
        assert_eq!(response.status, -1);
        assert_eq!(
            response.body,
            "failed to submit HTTP GET request to /platform"
        );
    }
}
