//! Caller-owned cancellation contexts.
//!
//! A [`CancellationToken`] is an explicit value threaded through every
//! operation that should be abortable. There is no global signal handling
//! here; the embedding application decides what triggers cancellation and
//! calls [`CancellationToken::cancel`].

use std::future::{self, Future};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::select_all;
use tokio::sync::watch;

use crate::error::{FetchError, Result};

#[derive(Debug)]
struct Shared {
    cancelled: AtomicBool,
    disposed: AtomicBool,
    tx: watch::Sender<bool>,
}

/// A one-shot, broadcast cancellation signal.
///
/// Cancellation is monotonic: once [`cancel`](Self::cancel) has been called
/// the token stays cancelled forever, and every waiter observes the signal
/// exactly once. Clones share the same underlying state; use
/// [`child`](Self::child) for a token that can be cancelled independently
/// while still observing its parent.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    shared: Arc<Shared>,
    /// Channels of every ancestor. Cancelling any of them cancels this
    /// token too; cancelling this token leaves them untouched.
    parents: Vec<watch::Receiver<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                tx,
            }),
            parents: Vec::new(),
        }
    }

    /// Derive a token that is cancelled whenever `self` or any of its
    /// ancestors is cancelled. Cancelling the child never affects the
    /// parent.
    pub fn child(&self) -> Self {
        let mut parents = self.parents.clone();
        parents.push(self.shared.tx.subscribe());
        let (tx, _rx) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                tx,
            }),
            parents,
        }
    }

    /// Request cancellation.
    ///
    /// The first call flips the token and wakes every waiter; later calls
    /// are no-ops. Cancelling a disposed token has no effect.
    pub fn cancel(&self) {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return;
        }
        if !self.shared.cancelled.swap(true, Ordering::SeqCst) {
            self.shared.tx.send_replace(true);
        }
    }

    /// Returns `true` once this token or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        !self.shared.disposed.load(Ordering::SeqCst) && self.parents.iter().any(|rx| *rx.borrow())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Fail-fast check used at operation boundaries.
    pub fn check(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(FetchError::Disposed);
        }
        if self.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        Ok(())
    }

    /// Resolves when the token is cancelled; immediately if it already is.
    ///
    /// On a disposed token this never resolves. Waiters deregister simply
    /// by dropping the future.
    pub async fn cancelled(&self) {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return;
        }
        if self.is_disposed() {
            future::pending::<()>().await;
        }
        if self.parents.is_empty() {
            fired(self.shared.tx.subscribe()).await;
            return;
        }
        let mut waits: Vec<Pin<Box<dyn Future<Output = ()> + Send>>> =
            Vec::with_capacity(self.parents.len() + 1);
        waits.push(Box::pin(fired(self.shared.tx.subscribe())));
        for rx in &self.parents {
            waits.push(Box::pin(fired(rx.clone())));
        }
        select_all(waits).await;
    }

    /// Run `op` under this token.
    ///
    /// Fails fast with [`FetchError::Cancelled`] (or
    /// [`FetchError::Disposed`]) without ever polling `op` when the token
    /// is already unusable; otherwise races `op` against cancellation. When
    /// cancellation wins, `op` is dropped so its resources are released,
    /// then `on_cancel` runs for caller-side cleanup and `Cancelled` is
    /// returned. Cancellation takes precedence over a concurrently failing
    /// `op`.
    pub async fn run<F, T, C>(&self, op: F, on_cancel: C) -> Result<T>
    where
        F: Future<Output = Result<T>>,
        C: FnOnce(),
    {
        self.check()?;
        {
            let mut op = std::pin::pin!(op);
            tokio::select! {
                biased;
                _ = self.cancelled() => {}
                res = &mut op => return res,
            }
        }
        on_cancel();
        Err(FetchError::Cancelled)
    }

    /// Render the token inert.
    ///
    /// After disposal new operations fail fast, pending waiters never
    /// settle and ancestor cancellations are no longer observed. Idempotent.
    pub fn dispose(&self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
    }
}

async fn fired(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        // Sender gone without ever cancelling; this arm can no longer fire.
        future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_idempotent_and_monotonic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("pre-cancelled token must resolve immediately");
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters_exactly_once() {
        let token = CancellationToken::new();
        let woken = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let token = token.clone();
            let woken = Arc::clone(&woken);
            handles.push(tokio::spawn(async move {
                token.cancelled().await;
                woken.fetch_add(1, Ordering::SeqCst);
            }));
        }

        tokio::task::yield_now().await;
        token.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(woken.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn run_returns_operation_result_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = token.run(async { Ok(7) }, || {}).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_rejects_pre_cancelled_token_without_polling_op() {
        let token = CancellationToken::new();
        token.cancel();

        let polled = Arc::new(AtomicBool::new(false));
        let cleaned = Arc::new(AtomicBool::new(false));
        let polled_inner = Arc::clone(&polled);
        let cleaned_inner = Arc::clone(&cleaned);

        let result = token
            .run(
                async move {
                    polled_inner.store(true, Ordering::SeqCst);
                    Ok(())
                },
                move || cleaned_inner.store(true, Ordering::SeqCst),
            )
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
        assert!(!cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn run_cancels_in_flight_operation_and_runs_cleanup() {
        let token = CancellationToken::new();
        let cleaned = Arc::new(AtomicBool::new(false));
        let cleaned_inner = Arc::clone(&cleaned);

        let runner = token.clone();
        let handle = tokio::spawn(async move {
            runner
                .run(
                    async {
                        future::pending::<()>().await;
                        Ok(())
                    },
                    move || cleaned_inner.store(true, Ordering::SeqCst),
                )
                .await
        });

        tokio::task::yield_now().await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(cleaned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_takes_precedence_over_concurrent_completion() {
        let token = CancellationToken::new();
        token.cancel();

        // Both arms are ready on the first poll; cancellation must win.
        let result = token.run(async { Ok(1) }, || {}).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn child_observes_parent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child();
        let grandchild = child.child();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());

        tokio::time::timeout(Duration::from_millis(100), grandchild.cancelled())
            .await
            .expect("descendant must observe ancestor cancellation");
    }

    #[tokio::test]
    async fn child_cancellation_leaves_parent_untouched() {
        let parent = CancellationToken::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn disposed_token_fails_fast() {
        let token = CancellationToken::new();
        token.dispose();
        token.dispose();

        let result = token.run(async { Ok(()) }, || {}).await;
        assert!(matches!(result, Err(FetchError::Disposed)));

        // Cancellation after disposal is a no-op.
        token.cancel();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn disposed_child_ignores_parent() {
        let parent = CancellationToken::new();
        let child = parent.child();
        child.dispose();

        parent.cancel();
        assert!(!child.is_cancelled());
    }
}
