use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::core::rate::DEFAULT_PROGRESS_INTERVAL;
use crate::data::checksum::Checksum;
use crate::data::progress::Progress;

/// Configuration for a single download.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use capstan_fetch::{CancellationToken, Checksum, DownloadOptions};
///
/// let token = CancellationToken::new();
/// let options = DownloadOptions::default()
///     .checksum("sha256:dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
///         .parse::<Checksum>()
///         .unwrap())
///     .cancellation(token.clone())
///     .on_progress(Arc::new(|progress| {
///         if let Some(percent) = progress.percent() {
///             println!("{percent:.1}%");
///         }
///     }));
/// ```
#[derive(Clone)]
pub struct DownloadOptions {
    /// Extra headers sent with the download request (and every redirect
    /// hop and retry).
    pub headers: Vec<(String, String)>,

    /// Expected digest, verified while the body streams to disk. On
    /// mismatch the destination file is removed.
    ///
    /// Default: None
    pub checksum: Option<Checksum>,

    /// Token aborting this download. Each download gets a fresh token
    /// unless the caller supplies one.
    pub cancellation: CancellationToken,

    /// Progress callback.
    ///
    /// Invoked at most once per [`progress_interval`](Self::progress_interval)
    /// while chunks arrive, plus a final report when the body ends. No
    /// report is ever issued after cancellation.
    ///
    /// Default: None
    pub on_progress: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,

    /// Minimum time between two progress reports.
    ///
    /// Default: 100ms
    pub progress_interval: Duration,

    /// Skip creating the destination's parent directories.
    ///
    /// Default: false
    pub skip_dir_creation: bool,
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("headers", &self.headers)
            .field("checksum", &self.checksum)
            .field("cancellation", &self.cancellation)
            .field("on_progress", &"{ ... }")
            .field("progress_interval", &self.progress_interval)
            .field("skip_dir_creation", &self.skip_dir_creation)
            .finish()
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            checksum: None,
            cancellation: CancellationToken::new(),
            on_progress: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            skip_dir_creation: false,
        }
    }
}

impl DownloadOptions {
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

    /// Set the expected digest.
    #[must_use]
    pub fn checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Set the minimum time between progress reports.
    #[must_use]
    pub fn progress_interval(mut self, progress_interval: Duration) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    /// Do not create parent directories for the destination.
    #[must_use]
    pub fn skip_dir_creation(mut self, skip: bool) -> Self {
        self.skip_dir_creation = skip;
        self
    }
}
