//! Streaming digest verification.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use capstan_verify::Hasher;
use futures_util::Stream;

use crate::data::checksum::Checksum;
use crate::error::{FetchError, Result};

/// Pass-through stream stage that hashes every chunk it forwards.
///
/// Chunks are never modified or buffered; the digest is computed
/// incrementally as data flows by. When the underlying stream ends the
/// digest is finalized and compared against the expected checksum: a
/// mismatch surfaces as one [`FetchError::ChecksumMismatch`] item naming
/// the expected and actual values, after which the stream is fused.
pub struct DigestStream<S, H: Hasher> {
    inner: S,
    hasher: Option<H>,
    expected: Checksum,
    done: bool,
}

impl<S, H> DigestStream<S, H>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    H: Hasher + Unpin,
{
    pub fn new(inner: S, hasher: H, expected: Checksum) -> Self {
        Self {
            inner,
            hasher: Some(hasher),
            expected,
            done: false,
        }
    }
}

impl<S, H> Stream for DigestStream<S, H>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    H: Hasher + Unpin,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(hasher) = this.hasher.as_mut() {
                    hasher.update(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.done = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.done = true;
                match this.hasher.take() {
                    Some(hasher) => {
                        let digest = hasher.finalize();
                        if this.expected.matches(&digest) {
                            Poll::Ready(None)
                        } else {
                            Poll::Ready(Some(Err(FetchError::ChecksumMismatch {
                                expected: this.expected.expected().to_string(),
                                actual: this.expected.encode(&digest),
                            })))
                        }
                    }
                    None => Poll::Ready(None),
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
