//! Transport abstraction: one HTTP exchange at a time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

use crate::data::request::WireRequest;

/// A boxed stream type for HTTP response bodies.
///
/// This type alias simplifies the stream type used throughout the crate.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Broad failure classes for transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The attempt exceeded its deadline.
    Timeout,
    /// Connection establishment failed (DNS, TCP, TLS).
    Connect,
    /// The connection dropped while the body was streaming.
    Interrupted,
    /// The peer produced unintelligible HTTP.
    Protocol,
    Other,
}

/// A failure raised by a [`Transport`] implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: TransportErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Transient failures are worth retrying; everything else is terminal.
    ///
    /// Timeouts, connection failures and mid-body drops are transient: the
    /// request may well succeed against another replica or a moment later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect | TransportErrorKind::Interrupted
        )
    }
}

/// One HTTP exchange's worth of response data.
///
/// The body is a stream so large downloads never sit in memory; dropping
/// it aborts the underlying connection.
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BoxStream<'static, std::result::Result<Bytes, TransportError>>,
}

impl TransportResponse {
    /// Case-insensitive header lookup. Missing headers are `None`, never a
    /// panic.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Parsed `Content-Length`, when present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"{ ... }")
            .finish()
    }
}

/// Minimal HTTP capability the executor needs.
///
/// Implementations perform exactly one exchange per call: no redirect
/// following, no retries, no policy. The executor layers those on top, so
/// swapping the transport (production client, scripted test double) never
/// changes resilience behavior.
pub trait Transport: Send + Sync {
    /// Issue a single request and expose the response body as a stream.
    ///
    /// A response with an error status is still `Ok`: transport errors are
    /// reserved for failures to produce a response at all.
    fn send(
        &self,
        request: &WireRequest,
        body: Option<Bytes>,
    ) -> impl Future<Output = std::result::Result<TransportResponse, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;

    use super::*;
    use crate::data::request::Method;
    use crate::error::{FetchError, Result};

    /// Production transport over a shared [`reqwest::Client`].
    ///
    /// Redirects are disabled on the client; the executor follows them
    /// itself so hop limits and method demotion live in one place.
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self> {
            let client = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| FetchError::Transport(TransportError::from(e)))?;
            Ok(Self { client })
        }

        /// Wrap an existing client. The client must have redirects
        /// disabled, otherwise hops are followed twice.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Transport for ReqwestTransport {
        async fn send(
            &self,
            request: &WireRequest,
            body: Option<Bytes>,
        ) -> std::result::Result<TransportResponse, TransportError> {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
                Method::Delete => reqwest::Method::DELETE,
                Method::Head => reqwest::Method::HEAD,
            };
            let mut builder = self.client.request(method, request.url.clone());
            for (key, value) in &request.headers {
                builder = builder.header(key, value);
            }
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(key, value)| {
                    (
                        key.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from));

            Ok(TransportResponse {
                status,
                headers,
                body: Box::pin(body),
            })
        }
    }

    impl From<reqwest::Error> for TransportError {
        fn from(error: reqwest::Error) -> Self {
            let kind = if error.is_timeout() {
                TransportErrorKind::Timeout
            } else if error.is_connect() {
                TransportErrorKind::Connect
            } else if error.is_body() || error.is_decode() {
                TransportErrorKind::Interrupted
            } else if error.is_builder() || error.is_request() {
                TransportErrorKind::Protocol
            } else {
                TransportErrorKind::Other
            };
            Self::with_source(kind, error)
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_headers(headers: Vec<(String, String)>) -> TransportResponse {
        TransportResponse {
            status: 200,
            headers,
            body: Box::pin(futures_util::stream::empty()),
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = response_with_headers(vec![(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(response.header("etag"), None);
    }

    #[test]
    fn content_length_parses_when_well_formed() {
        let response =
            response_with_headers(vec![("content-length".to_string(), "1234".to_string())]);
        assert_eq!(response.content_length(), Some(1234));

        let garbage =
            response_with_headers(vec![("content-length".to_string(), "many".to_string())]);
        assert_eq!(garbage.content_length(), None);

        assert_eq!(response_with_headers(Vec::new()).content_length(), None);
    }

    #[test]
    fn transient_classification() {
        assert!(TransportError::new(TransportErrorKind::Timeout, "t").is_transient());
        assert!(TransportError::new(TransportErrorKind::Connect, "c").is_transient());
        assert!(TransportError::new(TransportErrorKind::Interrupted, "i").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Protocol, "p").is_transient());
        assert!(!TransportError::new(TransportErrorKind::Other, "o").is_transient());
    }
}
