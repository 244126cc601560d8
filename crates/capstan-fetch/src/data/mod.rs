//! Immutable configuration and types.

pub mod checksum;
pub mod config;
pub mod download;
pub mod progress;
pub mod request;

pub use checksum::{Checksum, ChecksumEncoding, HashAlgorithm};
pub use config::ExecutorConfig;
pub use download::DownloadOptions;
pub use progress::Progress;
pub use request::{
    Method, RequestOptions, Scheme, WireRequest, configure_request_options, dump_request_options,
};
