//! Progress reporting for byte streams.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures_util::Stream;

use crate::core::rate::ProgressCounter;
use crate::data::progress::Progress;
use crate::error::Result;

/// Pass-through stream stage that reports transfer progress.
///
/// Each forwarded chunk is accounted through a [`ProgressCounter`], and the
/// callback fires whenever the counter decides a report is due. When the
/// underlying stream ends cleanly a final report is emitted whose
/// `transferred` equals the expected total, so observers always see the
/// transfer land on 100%. Upstream errors pass through without a report.
pub struct ProgressStream<S> {
    inner: S,
    counter: ProgressCounter,
    on_progress: Arc<dyn Fn(&Progress) + Send + Sync>,
    finished: bool,
}

impl<S> ProgressStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub fn new(
        inner: S,
        counter: ProgressCounter,
        on_progress: Arc<dyn Fn(&Progress) + Send + Sync>,
    ) -> Self {
        Self {
            inner,
            counter,
            on_progress,
            finished: false,
        }
    }
}

impl<S> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(report) = this.counter.record(Instant::now(), chunk.len() as u64) {
                    (this.on_progress)(&report);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                let report = this.counter.finish(Instant::now());
                (this.on_progress)(&report);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use futures_util::{StreamExt, stream};

    use crate::error::FetchError;

    use super::*;

    fn collector() -> (Arc<Mutex<Vec<Progress>>>, Arc<dyn Fn(&Progress) + Send + Sync>) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let callback: Arc<dyn Fn(&Progress) + Send + Sync> = Arc::new(move |progress: &Progress| {
            sink.lock().unwrap().push(progress.clone());
        });
        (reports, callback)
    }

    fn chunks(parts: Vec<Result<Bytes>>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(parts)
    }

    #[tokio::test]
    async fn reports_each_chunk_when_interval_is_zero() {
        let (reports, callback) = collector();
        let counter = ProgressCounter::new(Some(10), Duration::ZERO, Instant::now());
        let inner = chunks(vec![
            Ok(Bytes::from_static(b"1234")),
            Ok(Bytes::from_static(b"567890")),
        ]);
        let stream = ProgressStream::new(inner, counter, callback);

        let forwarded: Vec<_> = stream.collect().await;
        assert_eq!(forwarded.len(), 2);

        let reports = reports.lock().unwrap();
        let transferred: Vec<u64> = reports.iter().map(|report| report.transferred).collect();
        assert_eq!(transferred, vec![4, 10, 10]);
        assert!(transferred.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(reports.last().unwrap().is_complete());
    }

    #[tokio::test]
    async fn final_report_lands_on_total_despite_throttling() {
        let (reports, callback) = collector();
        // Interval far beyond the test runtime: only the final report fires.
        let counter = ProgressCounter::new(Some(10), Duration::from_secs(3600), Instant::now());
        let inner = chunks(vec![
            Ok(Bytes::from_static(b"1234")),
            Ok(Bytes::from_static(b"567890")),
        ]);
        let stream = ProgressStream::new(inner, counter, callback);

        let _: Vec<_> = stream.collect().await;

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].transferred, 10);
        assert_eq!(reports[0].delta, 10);
        assert_eq!(reports[0].total, Some(10));
    }

    #[tokio::test]
    async fn errors_pass_through_without_a_final_report() {
        let (reports, callback) = collector();
        let counter = ProgressCounter::new(Some(10), Duration::from_secs(3600), Instant::now());
        let inner = chunks(vec![
            Ok(Bytes::from_static(b"1234")),
            Err(FetchError::Cancelled),
        ]);
        let mut stream = ProgressStream::new(inner, counter, callback);

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await,
            Some(Err(FetchError::Cancelled))
        ));
        assert!(stream.next().await.is_none());
        assert!(reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_total_still_gets_a_final_report() {
        let (reports, callback) = collector();
        let counter = ProgressCounter::new(None, Duration::from_secs(3600), Instant::now());
        let inner = chunks(vec![Ok(Bytes::from_static(b"hello"))]);
        let stream = ProgressStream::new(inner, counter, callback);

        let _: Vec<_> = stream.collect().await;

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].transferred, 5);
        assert_eq!(reports[0].total, None);
        assert!(!reports[0].is_complete());
    }
}
