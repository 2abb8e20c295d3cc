// ── Shared in-flight round trips ──
//
// Coalesces concurrent demands for the same device round trip. The first
// caller launches the work on a detached task; everyone who arrives while
// it runs is added to the waiter batch. When the work lands, the batch is
// taken out of the slot under the lock and only then released, so a caller
// arriving after that point starts a fresh round trip instead of joining
// a batch that has already been answered.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::error::CoreError;

type Waiters<T> = Vec<oneshot::Sender<Result<T, CoreError>>>;

/// A single-flight slot: `None` when idle, `Some(waiters)` while a round
/// trip is running.
pub(crate) struct Flight<T> {
    label: &'static str,
    slot: Arc<Mutex<Option<Waiters<T>>>>,
}

impl<T: Clone + Send + 'static> Flight<T> {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Join the round trip in flight, or start one with `start`.
    ///
    /// `start` is only called when no round trip is running. The work it
    /// returns runs to completion even if every caller stops waiting.
    pub(crate) async fn join<F, Fut>(&self, start: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.join_and_publish(start, |_| {}).await
    }

    /// Like [`join`](Self::join), but `publish` sees the outcome while the
    /// slot is still locked, before any waiter is released. Anything it
    /// records is visible to every caller that arrives after landing, and
    /// to none that could still join the finished batch.
    pub(crate) async fn join_and_publish<F, Fut, P>(
        &self,
        start: F,
        publish: P,
    ) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
        P: FnOnce(&Result<T, CoreError>) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let work = {
            let mut slot = self.slot.lock().await;
            if let Some(waiters) = slot.as_mut() {
                waiters.push(tx);
                debug!(flight = self.label, waiters = waiters.len(), "joined in-flight request");
                None
            } else {
                *slot = Some(vec![tx]);
                Some(start())
            }
        };

        if let Some(work) = work {
            debug!(flight = self.label, "starting request");
            tokio::spawn(land(self.label, Arc::clone(&self.slot), work, publish));
        }

        rx.await.map_err(|_| CoreError::CoordinatorClosed)?
    }

    /// `true` while a round trip is running.
    pub(crate) async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

async fn land<T, Fut, P>(
    label: &'static str,
    slot: Arc<Mutex<Option<Waiters<T>>>>,
    work: Fut,
    publish: P,
) where
    T: Clone + Send + 'static,
    Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    P: FnOnce(&Result<T, CoreError>) + Send + 'static,
{
    let result = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Internal(format!("{label} task panicked"))),
    };

    // Publishing, resetting the slot, and capturing the batch happen
    // under one lock.
    let batch = {
        let mut slot = slot.lock().await;
        publish(&result);
        slot.take().unwrap_or_default()
    };

    debug!(
        flight = label,
        waiters = batch.len(),
        ok = result.is_ok(),
        "request landed"
    );

    for tx in batch {
        let _ = tx.send(result.clone());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;
    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_request() {
        let flight = Flight::<u32>::new("test");
        let started = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let callers = (0..8).map(|_| {
            let started = Arc::clone(&started);
            let gate = Arc::clone(&gate);
            flight.join(move || async move {
                started.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(42)
            })
        });

        let opener = async {
            tokio::task::yield_now().await;
            gate.notify_one();
        };

        let (results, ()) = tokio::join!(join_all(callers), opener);

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Ok(42))));
        assert!(!flight.is_active().await);
    }

    #[tokio::test]
    async fn every_waiter_gets_the_same_error() {
        let flight = Flight::<u32>::new("test");

        let callers = (0..4).map(|_| {
            flight.join(|| async {
                tokio::task::yield_now().await;
                Err(CoreError::SnapshotFailed {
                    source: Arc::new(igenix_api::Error::Disconnected),
                })
            })
        });
        let results = join_all(callers).await;

        let sources: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap_err().link_error().unwrap().clone())
            .collect();
        assert!(sources.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn next_caller_after_landing_starts_fresh() {
        let flight = Flight::<usize>::new("test");
        let started = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let started = Arc::clone(&started);
            let value = flight
                .join(move || async move { Ok(started.fetch_add(1, Ordering::SeqCst) + 1) })
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
    }

    #[tokio::test]
    #[allow(unreachable_code)]
    async fn panicking_work_releases_waiters() {
        let flight = Flight::<u32>::new("test");

        let result = flight
            .join(|| async {
                panic!("boom");
                Ok(1)
            })
            .await;

        assert!(matches!(result, Err(CoreError::Internal(_))));
        assert!(!flight.is_active().await);
    }

    #[tokio::test]
    async fn outcome_is_published_before_waiters_wake() {
        let flight = Flight::<u32>::new("test");
        let published = Arc::new(AtomicUsize::new(0));

        let callers = (0..3).map(|_| {
            let hook = Arc::clone(&published);
            flight.join_and_publish(
                || async {
                    tokio::task::yield_now().await;
                    Ok(7)
                },
                move |result| {
                    if matches!(result, Ok(7)) {
                        hook.fetch_add(1, Ordering::SeqCst);
                    }
                },
            )
        });
        let observed: Vec<usize> = join_all(callers.map(|caller| {
            let published = Arc::clone(&published);
            async move {
                caller.await.unwrap();
                published.load(Ordering::SeqCst)
            }
        }))
        .await;

        // Only the starter's hook runs, and every waiter sees its effect.
        assert_eq!(observed, vec![1, 1, 1]);
    }

    #[tokio::test]
    #[allow(unreachable_code)]
    async fn panicking_work_still_publishes_an_error() {
        let flight = Flight::<u32>::new("test");
        let saw_error = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&saw_error);

        let result = flight
            .join_and_publish(
                || async {
                    panic!("boom");
                    Ok(1)
                },
                move |result| {
                    if matches!(result, Err(CoreError::Internal(_))) {
                        hook.fetch_add(1, Ordering::SeqCst);
                    }
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(saw_error.load(Ordering::SeqCst), 1);
    }
}
