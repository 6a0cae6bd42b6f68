// SPDX-License-Identifier: MIT OR Apache-2.0
//! API URL handling and the HTTP transport capability.
//!
//! The platform is addressed by a URL of the form
//! `<scheme>://<host>[:<port>][/<prefix>][/@/<team>/<suite>/<version>]`:
//! everything before the `@` marker is the route prefix, everything after it
//! names the `{team, suite, version}` triple. [`ApiUrl`] parses and
//! reassembles these, and [`ApiUrl::confirm`] reconciles the URL-borne triple
//! with explicitly configured slugs.
//!
//! [`Transport`] is the thin HTTP capability the platform layer is built on:
//! four verbs returning `{status, body}` with a transport-level failure
//! reported as status `-1` and the error text in the body, plus a mutable
//! bearer token attached to every request once set.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api_url;
mod http;

pub use api_url::{ApiUrl, ApiUrlError};
pub use http::{HttpTransport, Response, Transport};
