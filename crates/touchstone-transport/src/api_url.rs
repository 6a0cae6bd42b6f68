// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parsing and reassembly of platform API URLs.

use thiserror::Error;

/// Errors from parsing or reconciling an API URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiUrlError {
    /// The URL could not be parsed at all.
    #[error("invalid url: \"{url}\"")]
    Invalid {
        /// The offending input.
        url: String,
    },

    /// An explicitly configured slug disagrees with the URL tail.
    #[error("parameter \"{param}\" is in conflict with API URL")]
    Conflict {
        /// Name of the conflicting parameter.
        param: String,
    },
}

/// A parsed platform API URL.
///
/// The `{team, suite, version}` triple may come from the URL tail (after the
/// `@` marker), from explicit configuration via [`confirm`](Self::confirm),
/// or both — in which case they must agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiUrl {
    scheme: String,
    host: String,
    port: String,
    prefix: String,
    /// Team slug, possibly empty.
    pub team: String,
    /// Suite slug, possibly empty.
    pub suite: String,
    /// Version slug, possibly empty.
    pub version: String,
}

impl ApiUrl {
    /// Parse a URL of the form
    /// `<scheme>://<host>[:<port>][/<prefix>][/@/<team>/<suite>/<version>]`.
    pub fn parse(url: &str) -> Result<Self, ApiUrlError> {
        let mut out = Self::default();

        let rest = match url.split_once("://") {
            Some((scheme, rest)) => {
                out.scheme = scheme.to_string();
                rest
            }
            None => url,
        };

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, path),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(ApiUrlError::Invalid {
                url: url.to_string(),
            });
        }
        match authority.split_once(':') {
            Some((host, port)) => {
                if host.is_empty() || port.chars().any(|c| !c.is_ascii_digit()) {
                    return Err(ApiUrlError::Invalid {
                        url: url.to_string(),
                    });
                }
                out.host = host.to_string();
                out.port = port.to_string();
            }
            None => out.host = authority.to_string(),
        }

        if path.is_empty() {
            return Ok(out);
        }

        match path.rfind('@') {
            Some(index) => {
                out.prefix = path[..index].trim_end_matches('/').to_string();
                let mut slugs = path[index + 1..].split('/').filter(|s| !s.is_empty());
                out.team = slugs.next().unwrap_or_default().to_string();
                out.suite = slugs.next().unwrap_or_default().to_string();
                out.version = slugs.next().unwrap_or_default().to_string();
            }
            None => out.prefix = path.trim_end_matches('/').to_string(),
        }

        Ok(out)
    }

    /// The scheme/host/port part, suitable as an HTTP client root.
    pub fn root(&self) -> String {
        let mut output = self.host.clone();
        if !self.scheme.is_empty() {
            output = format!("{}://{}", self.scheme, output);
        }
        if !self.port.is_empty() {
            return format!("{}:{}", output, self.port);
        }
        output
    }

    /// Prepend the URL prefix to a route.
    pub fn route(&self, path: &str) -> String {
        if path.is_empty() {
            return self.prefix.clone();
        }
        if self.prefix.is_empty() {
            return path.to_string();
        }
        format!("/{}{}", self.prefix, path)
    }

    /// Reconcile explicitly configured slugs with the URL-borne triple.
    ///
    /// Empty sides are filled from the other; a non-empty disagreement is a
    /// configuration conflict.
    pub fn confirm(&mut self, team: &str, suite: &str, version: &str) -> Result<(), ApiUrlError> {
        if !team.is_empty() && self.team.is_empty() {
            self.team = team.to_string();
        }
        if !suite.is_empty() && self.suite.is_empty() {
            self.suite = suite.to_string();
        }
        if !version.is_empty() && self.version.is_empty() {
            self.version = version.to_string();
        }
        if !version.is_empty() && self.version != version {
            return Err(ApiUrlError::Conflict {
                param: "version".to_string(),
            });
        }
        if !suite.is_empty() && self.suite != suite {
            return Err(ApiUrlError::Conflict {
                param: "suite".to_string(),
            });
        }
        if !team.is_empty() && self.team != team {
            return Err(ApiUrlError::Conflict {
                param: "team".to_string(),
            });
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
    fn short_form_parses_host_only() {
        let api = ApiUrl::parse("https://api.example.com").unwrap();
        assert_eq!(api.root(), "https://api.example.com");
        assert_eq!(api.route("/platform"), "/platform");
        assert!(api.team.is_empty());
    }

    #[test]
    fn port_and_prefix_are_kept() {
        let api = ApiUrl::parse("http://localhost:8080/api").unwrap();
        assert_eq!(api.root(), "http://localhost:8080");
        assert_eq!(api.route("/platform"), "/api/platform");
        assert_eq!(api.route(""), "api");
    }

    #[test]
    fn long_form_extracts_the_slug_triple() {
        let api = ApiUrl::parse("https://api.example.com/v1/@/acme/suite/1.0").unwrap();
        assert_eq!(api.team, "acme");
        assert_eq!(api.suite, "suite");
        assert_eq!(api.version, "1.0");
        assert_eq!(api.route("/platform"), "/v1/platform");
    }

    #[test]
    fn partial_slug_tail_pads_with_empty() {
        let api = ApiUrl::parse("https://api.example.com/@/acme").unwrap();
        assert_eq!(api.team, "acme");
        assert!(api.suite.is_empty());
        assert!(api.version.is_empty());
    }

    #[test]
    fn scheme_is_optional() {
        let api = ApiUrl::parse("api.example.com/v1").unwrap();
        assert_eq!(api.root(), "api.example.com");
        assert_eq!(api.route("/x"), "/v1/x");
    }

    #[test]
    fn non_numeric_port_is_invalid() {
        let err = ApiUrl::parse("https://host:abc/x").unwrap_err();
        assert!(matches!(err, ApiUrlError::Invalid { .. }));
    }

    #[test]
    fn confirm_fills_empty_slugs() {
        let mut api = ApiUrl::parse("https://api.example.com").unwrap();
        api.confirm("acme", "suite", "1.0").unwrap();
        assert_eq!(api.team, "acme");
        assert_eq!(api.suite, "suite");
        assert_eq!(api.version, "1.0");
    }

    #[test]
    fn confirm_accepts_agreement() {
        let mut api = ApiUrl::parse("https://api.example.com/@/acme/suite/1.0").unwrap();
        api.confirm("acme", "suite", "1.0").unwrap();
    }

    #[test]
    fn confirm_rejects_conflicts() {
        let mut api = ApiUrl::parse("https://api.example.com/@/acme/suite/1.0").unwrap();
        let err = api.confirm("other", "suite", "1.0").unwrap_err();
        assert_eq!(
            err,
            ApiUrlError::Conflict {
                param: "team".to_string()
            }
        );
    }

    #[test]
    fn confirm_ignores_empty_arguments() {
        let mut api = ApiUrl::parse("https://api.example.com/@/acme/suite/1.0").unwrap();
        api.confirm("", "", "").unwrap();
        assert_eq!(api.team, "acme");
    }
}
