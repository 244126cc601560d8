//! Content verification primitives for downloaded artifacts.
//!
//! Provides incremental hashing without enforcing specific hash algorithms
//! or verification policies. Callers feed chunks as data streams through and
//! compare the finalized digest however their artifact feed encodes it.
//!
//! # Key Features
//!
//! - **Incremental**: Computes digests as data streams through
//! - **Single-pass**: Bytes are hashed while they are moved, never buffered twice
//! - **Extensible**: Minimal [`Hasher`] trait allows custom implementations
//!
//! # Example
//!
//! ```
//! use capstan_verify::{Hasher, Sha256Hasher};
//!
//! let mut hasher = Sha256Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//!
//! assert_eq!(hasher.finalize(), Sha256Hasher::digest(b"hello world"));
//! ```

pub use self::hasher::{DigestHasher, Hasher};

#[cfg(feature = "sha256")]
pub use self::hasher::Sha256Hasher;

#[cfg(feature = "sha512")]
pub use self::hasher::Sha512Hasher;

mod hasher;
