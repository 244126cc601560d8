//! Resilient, cancellable HTTP for tools that fetch artifacts.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration and types
//! - `core` - Pure transformations
//! - `effects` - I/O operations with trait abstraction
//!
//! # Key Features
//!
//! - **Policy over mechanism**: a [`Transport`] performs one HTTP exchange;
//!   [`HttpExecutor`] layers retry, redirect following and cancellation on top
//! - **Streaming verification**: digests are computed while the body streams
//!   to disk, never from a buffered copy
//! - **Cooperative cancellation**: every operation takes a
//!   [`CancellationToken`] and aborts promptly, removing partial files
//! - **All-or-nothing downloads**: the destination is left complete or absent
//!
//! # Examples
//!
//! Fetch release metadata, then download the artifact it names:
//!
//! ```no_run
//! use std::sync::Arc;
//! use capstan_fetch::{
//!     CancellationToken, DownloadOptions, HttpExecutor, RequestOptions, parse_json,
//! };
//!
//! #[derive(serde::Deserialize)]
//! struct Release {
//!     version: String,
//!     url: String,
//!     sha256: String,
//! }
//!
//! # async fn run() -> capstan_fetch::Result<()> {
//! let executor = HttpExecutor::default_client()?;
//! let token = CancellationToken::new();
//!
//! let options = RequestOptions::new("api.example.com", "/v1/releases/latest");
//! let release: Release = parse_json(executor.request(&options, &token, None)).await?;
//!
//! let download = DownloadOptions::default()
//!     .checksum(release.sha256.parse()?)
//!     .cancellation(token.child())
//!     .on_progress(Arc::new(|progress| {
//!         if let Some(percent) = progress.percent() {
//!             println!("{percent:>5.1}%");
//!         }
//!     }));
//! executor
//!     .download(&release.url, format!("tool-{}", release.version), &download)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cancel;
mod core;
mod data;
mod effects;
mod error;

pub use self::cancel::CancellationToken;
pub use self::core::{
    DEFAULT_PROGRESS_INTERVAL, ProgressCounter, backoff_delay, is_redirect, is_success,
    redirect_method,
};
pub use self::data::{
    Checksum, ChecksumEncoding, DownloadOptions, ExecutorConfig, HashAlgorithm, Method, Progress,
    RequestOptions, Scheme, WireRequest, configure_request_options, dump_request_options,
};
pub use self::effects::{
    BoxStream, DigestStream, HttpExecutor, ProgressStream, Transport, TransportError,
    TransportErrorKind, TransportResponse, parse_json,
};
pub use self::error::{FetchError, Result};

#[cfg(feature = "reqwest")]
pub use self::effects::ReqwestTransport;
