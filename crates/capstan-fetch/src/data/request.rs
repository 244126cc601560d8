//! Request descriptions and their resolution into wire-ready form.

use std::fmt;

use url::Url;

use crate::error::{FetchError, Result};

/// HTTP methods the executor issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes a request before it is resolved against executor defaults.
///
/// # Examples
///
/// ```
/// use capstan_fetch::{Method, RequestOptions};
///
/// let options = RequestOptions::new("api.example.com", "/v1/releases/latest")
///     .method(Method::Get)
///     .header("accept", "application/json")
///     .auth_token("s3cr3t");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub host: String,
    /// Scheme-default port when `None`.
    pub port: Option<u16>,
    pub scheme: Scheme,
    /// Path plus optional query string.
    pub path: String,
    /// Defaults to GET when unset.
    pub method: Option<Method>,
    /// Header names are matched case-insensitively everywhere.
    pub headers: Vec<(String, String)>,
    /// Raw credential for the `authorization` header. Values that already
    /// carry a scheme (`Bearer ...`, `Basic ...`) are sent verbatim,
    /// anything else is sent as a bearer token.
    pub auth_token: Option<String>,
}

impl RequestOptions {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse a full URL into options.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        let scheme = match parsed.scheme() {
            "https" => Scheme::Https,
            "http" => Scheme::Http,
            other => {
                return Err(FetchError::InvalidUrl(format!(
                    "unsupported scheme {other}: {url}"
                )));
            }
        };
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("missing host: {url}")))?
            .to_string();
        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok(Self {
            host,
            port: parsed.port(),
            scheme,
            path,
            method: None,
            headers: Vec::new(),
            auth_token: None,
        })
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a single header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Replace all headers at once.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// A fully resolved request: what goes over the wire for one hop.
///
/// The executor derives a fresh one per redirect hop, so the original
/// [`RequestOptions`] stay untouched by redirect handling.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: Url,
    pub method: Method,
    pub headers: Vec<(String, String)>,
}

impl WireRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

/// Resolve caller options and executor default headers into a wire-ready
/// request.
///
/// The method defaults to GET. Default headers are taken only where the
/// caller did not set the same name; the authorization header is filled
/// from `auth_token` unless one was given explicitly.
pub fn configure_request_options(
    options: &RequestOptions,
    defaults: &[(String, String)],
) -> Result<WireRequest> {
    let authority = match options.port {
        Some(port) => format!("{}:{}", options.host, port),
        None => options.host.clone(),
    };
    let path = if options.path.starts_with('/') {
        options.path.clone()
    } else {
        format!("/{}", options.path)
    };
    let raw = format!("{}://{}{}", options.scheme, authority, path);
    let url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;

    let mut headers: Vec<(String, String)> = Vec::with_capacity(defaults.len() + options.headers.len() + 1);
    for (key, value) in defaults {
        if !contains_header(&options.headers, key) {
            headers.push((key.clone(), value.clone()));
        }
    }
    headers.extend(options.headers.iter().cloned());

    if let Some(token) = &options.auth_token
        && !contains_header(&headers, "authorization")
    {
        let value = if token.starts_with("Bearer ") || token.starts_with("Basic ") {
            token.clone()
        } else {
            format!("Bearer {token}")
        };
        headers.push(("authorization".to_string(), value));
    }

    Ok(WireRequest {
        url,
        method: options.method.unwrap_or_default(),
        headers,
    })
}

/// Render a request for diagnostics. Authorization values are redacted so
/// dumps are safe to log.
pub fn dump_request_options(request: &WireRequest) -> String {
    let mut out = format!("{} {}", request.method, request.url);
    for (key, value) in &request.headers {
        let shown = if key.eq_ignore_ascii_case("authorization") {
            "<redacted>"
        } else {
            value.as_str()
        };
        out.push_str("\n  ");
        out.push_str(key);
        out.push_str(": ");
        out.push_str(shown);
    }
    out
}

fn contains_header(headers: &[(String, String)], key: &str) -> bool {
    headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(key))
}
