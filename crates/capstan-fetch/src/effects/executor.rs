//! The resilient request executor.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use capstan_verify::{Sha256Hasher, Sha512Hasher};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::core::backoff::backoff_delay;
use crate::core::rate::ProgressCounter;
use crate::core::redirect::{is_redirect, is_success, redirect_method, resolve_location};
use crate::data::checksum::HashAlgorithm;
use crate::data::config::ExecutorConfig;
use crate::data::download::DownloadOptions;
use crate::data::request::{
    RequestOptions, WireRequest, configure_request_options, dump_request_options,
};
use crate::effects::digest::DigestStream;
use crate::effects::progress::ProgressStream;
use crate::effects::transport::{
    BoxStream, Transport, TransportError, TransportErrorKind, TransportResponse,
};
use crate::error::{FetchError, Result};

/// Longest error or diagnostics body carried inside an error value.
const BODY_SNIPPET_LIMIT: usize = 512;

/// Issues HTTP requests with retry, redirect following and cancellation
/// layered over a bare [`Transport`].
///
/// The executor owns all resilience policy: transient transport failures
/// are retried with exponential backoff, redirects are followed up to a
/// hop limit with 303 demoting to GET, and every wait point races the
/// operation's [`CancellationToken`]. The transport underneath performs
/// exactly one exchange per call and stays policy-free, which is what
/// makes the executor testable against a scripted transport.
pub struct HttpExecutor<T: Transport> {
    transport: T,
    config: ExecutorConfig,
}

impl<T: Transport> HttpExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::default())
    }

    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Issue a request and buffer the response body as text.
    ///
    /// `body` is serialized as JSON and sent with matching `content-type`
    /// and `content-length` headers unless the caller set their own. An
    /// empty response body comes back as `None`.
    ///
    /// # Errors
    ///
    /// Terminal statuses surface as [`FetchError::Status`] carrying a
    /// snippet of the error body; transient transport failures that
    /// outlive the retry budget as [`FetchError::RetriesExhausted`].
    pub async fn request(
        &self,
        options: &RequestOptions,
        cancellation: &CancellationToken,
        body: Option<&serde_json::Value>,
    ) -> Result<Option<String>> {
        let result = async {
            let response = self.request_raw(options, cancellation, body).await?;
            let text = cancellation.run(read_body(response.body), || {}).await?;
            Ok((!text.is_empty()).then_some(text))
        }
        .await;
        result.map_err(|error| prefer_cancellation(cancellation, error))
    }

    /// Like [`request`](Self::request), but hands back the response with
    /// its headers and unconsumed body once a success status arrives.
    pub async fn request_raw(
        &self,
        options: &RequestOptions,
        cancellation: &CancellationToken,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse> {
        cancellation.check()?;

        let payload = body.map(|value| Bytes::from(value.to_string()));
        let mut defaults = vec![("user-agent".to_string(), self.config.user_agent.clone())];
        if let Some(payload) = &payload {
            defaults.push(("content-type".to_string(), "application/json".to_string()));
            defaults.push(("content-length".to_string(), payload.len().to_string()));
        }
        let request = configure_request_options(options, &defaults)?;
        trace!(request = %dump_request_options(&request), "resolved request");

        self.execute(request, payload, cancellation).await
    }

    /// Stream a URL to a file on disk.
    ///
    /// The destination is left either complete or absent: on any failure
    /// after the file was created, including checksum mismatch and
    /// cancellation, the partial file is removed. Progress reports and
    /// digest verification run on the byte stream as it is written, so
    /// the download is never buffered in memory.
    pub async fn download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> Result<()> {
        self.download_to(url, destination.as_ref(), options)
            .await
            .map_err(|error| prefer_cancellation(&options.cancellation, error))
    }

    async fn download_to(
        &self,
        url: &str,
        destination: &Path,
        options: &DownloadOptions,
    ) -> Result<()> {
        options.cancellation.check()?;
        let started = Instant::now();

        let request_options = RequestOptions::from_url(url)?.headers(options.headers.clone());
        let defaults = vec![("user-agent".to_string(), self.config.user_agent.clone())];
        let request = configure_request_options(&request_options, &defaults)?;

        let response = self.execute(request, None, &options.cancellation).await?;
        let total = response.content_length();

        // Pipeline: network -> progress accounting -> digest verification
        // -> file sink. The digest stage sits nearest the sink so nothing
        // unverified can reach the destination after the body ends.
        let mut stream: BoxStream<'static, Result<Bytes>> =
            Box::pin(response.body.map(|chunk| chunk.map_err(FetchError::from)));
        if let Some(on_progress) = options.on_progress.clone() {
            let counter = ProgressCounter::new(total, options.progress_interval, Instant::now());
            stream = Box::pin(ProgressStream::new(stream, counter, on_progress));
        }
        if let Some(checksum) = options.checksum.clone() {
            stream = match checksum.algorithm() {
                HashAlgorithm::Sha256 => {
                    Box::pin(DigestStream::new(stream, Sha256Hasher::new(), checksum))
                }
                HashAlgorithm::Sha512 => {
                    Box::pin(DigestStream::new(stream, Sha512Hasher::new(), checksum))
                }
            };
        }

        if !options.skip_dir_creation
            && let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        match write_stream(destination, stream, &options.cancellation).await {
            Ok(written) => {
                debug!(
                    %url,
                    destination = %destination.display(),
                    bytes = written,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "download complete"
                );
                Ok(())
            }
            Err(error) => {
                remove_partial(destination).await;
                Err(error)
            }
        }
    }

    /// Redirect-following loop over retried attempts. Returns the first
    /// response with a success status, errors on anything else.
    async fn execute(
        &self,
        mut request: WireRequest,
        mut body: Option<Bytes>,
        cancellation: &CancellationToken,
    ) -> Result<TransportResponse> {
        let mut hops = 0u32;
        loop {
            let response = self
                .attempt_with_retry(&request, body.clone(), cancellation)
                .await?;

            if is_success(response.status) {
                return Ok(response);
            }

            if is_redirect(response.status) {
                hops += 1;
                if hops > self.config.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        limit: self.config.max_redirects,
                    });
                }
                let location =
                    response
                        .header("location")
                        .ok_or_else(|| FetchError::Status {
                            status: response.status,
                            message: "redirect without a location header".to_string(),
                        })?;
                let next_url = resolve_location(&request.url, location)?;
                let next_method = redirect_method(response.status, request.method);
                if next_method != request.method {
                    // 303 demotes to GET; the replayed request carries no
                    // payload, so its content headers go too.
                    body = None;
                    request.headers.retain(|(name, _)| {
                        !name.eq_ignore_ascii_case("content-type")
                            && !name.eq_ignore_ascii_case("content-length")
                    });
                }
                debug!(status = response.status, location = %next_url, hop = hops, "following redirect");
                request.url = next_url;
                request.method = next_method;
                continue;
            }

            let status = response.status;
            let message = cancellation.run(read_snippet(response.body), || {}).await?;
            return Err(FetchError::Status { status, message });
        }
    }

    /// One wire destination, up to `1 + max_retries` attempts. Only
    /// transient transport failures are retried; responses, even error
    /// responses, end the loop.
    async fn attempt_with_retry(
        &self,
        request: &WireRequest,
        body: Option<Bytes>,
        cancellation: &CancellationToken,
    ) -> Result<TransportResponse> {
        let mut attempt = 0u32;
        loop {
            cancellation.check()?;
            debug!(method = %request.method, url = %request.url, attempt, "sending request");
            let outcome = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(FetchError::Cancelled),
                outcome = self.send_once(request, body.clone()) => outcome,
            };
            match outcome {
                Ok(response) => return Ok(response),
                Err(error) if error.is_transient() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt, self.config.retry_backoff);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient failure, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancellation.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(error) if error.is_transient() => {
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt + 1,
                        source: error,
                    });
                }
                Err(error) => return Err(FetchError::Transport(error)),
            }
        }
    }

    /// A single transport exchange under the configured attempt deadline.
    async fn send_once(
        &self,
        request: &WireRequest,
        body: Option<Bytes>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        match self.config.attempt_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.transport.send(request, body)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransportError::new(
                        TransportErrorKind::Timeout,
                        format!("no response within {}ms", deadline.as_millis()),
                    )),
                }
            }
            None => self.transport.send(request, body).await,
        }
    }
}

#[cfg(feature = "reqwest")]
impl HttpExecutor<crate::effects::transport::ReqwestTransport> {
    /// Executor over a freshly built HTTP client with default
    /// configuration.
    pub fn default_client() -> Result<Self> {
        Ok(Self::new(crate::effects::transport::ReqwestTransport::new()?))
    }
}

/// Await a pending [`request`](HttpExecutor::request) and parse its body
/// as JSON.
///
/// An empty body parses as JSON `null`, so optional payloads deserialize
/// cleanly into `Option<T>`. Parse failures carry a snippet of the
/// offending body for diagnostics.
///
/// # Examples
///
/// ```no_run
/// use capstan_fetch::{CancellationToken, HttpExecutor, RequestOptions, parse_json};
///
/// # async fn fetch() -> capstan_fetch::Result<()> {
/// #[derive(serde::Deserialize)]
/// struct Release {
///     tag_name: String,
/// }
///
/// let executor = HttpExecutor::default_client()?;
/// let token = CancellationToken::new();
/// let options = RequestOptions::new("api.example.com", "/v1/releases/latest");
/// let release: Release = parse_json(executor.request(&options, &token, None)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn parse_json<D>(pending: impl Future<Output = Result<Option<String>>>) -> Result<D>
where
    D: DeserializeOwned,
{
    let body = pending.await?;
    let text = body.as_deref().unwrap_or("null");
    serde_json::from_str(text).map_err(|source| FetchError::Json {
        source,
        body: snippet(text),
    })
}

/// Buffer an entire response body as text. Invalid UTF-8 is replaced
/// rather than rejected.
async fn read_body(
    mut body: BoxStream<'static, std::result::Result<Bytes, TransportError>>,
) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Best-effort read of an error body, capped at the snippet limit. Never
/// fails: a broken stream just ends the snippet early.
async fn read_snippet(
    mut body: BoxStream<'static, std::result::Result<Bytes, TransportError>>,
) -> Result<String> {
    let mut buf = Vec::new();
    while buf.len() < BODY_SNIPPET_LIMIT {
        match body.next().await {
            Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
            Some(Err(_)) | None => break,
        }
    }
    Ok(snippet(&String::from_utf8_lossy(&buf)))
}

async fn write_stream(
    destination: &Path,
    mut stream: BoxStream<'static, Result<Bytes>>,
    cancellation: &CancellationToken,
) -> Result<u64> {
    let mut file = File::create(destination).await?;
    let mut written = 0u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(FetchError::Cancelled),
            next = stream.next() => next,
        };
        match next {
            Some(chunk) => {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            None => break,
        }
    }
    file.flush().await?;
    Ok(written)
}

/// Once the caller's token has fired, a concurrently-arising failure is
/// reported as cancellation, so "I cancelled this" stays a reliable
/// branch. The abort often surfaces first as a transport or I/O casualty
/// of tearing the pipeline down.
fn prefer_cancellation(cancellation: &CancellationToken, error: FetchError) -> FetchError {
    if cancellation.is_cancelled() && !error.is_cancelled() {
        FetchError::Cancelled
    } else {
        error
    }
}

/// Remove a failed download's leftovers. A file that never came to exist
/// is fine; anything else that cannot be removed is logged, since the
/// original error is on its way to the caller.
async fn remove_partial(destination: &Path) {
    if let Err(error) = fs::remove_file(destination).await
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(destination = %destination.display(), %error, "failed to remove partial download");
    }
}

fn snippet(body: &str) -> String {
    if body.len() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_SNIPPET_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
