//! Single-flight coalescing of concurrent computations.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type Inflight<K, V> = Arc<Mutex<HashMap<K, Shared<BoxFuture<'static, V>>>>>;

/// The value produced by a flight, and whether this caller led it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<V> {
    /// Result of the shared computation.
    pub value: V,
    /// Whether this caller started the computation.
    pub leader: bool,
}

/// Collapses concurrent computations for the same key into one.
///
/// The first caller for a key starts the computation; callers arriving while
/// it is in flight await the same result. The key is released as soon as the
/// computation finishes, so later callers start fresh (and are expected to
/// find the result in the cache). The computation keeps running as long as
/// any caller is still awaiting it.
pub struct SingleFlight<K, V> {
    inflight: Inflight<K, V>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<K, V> fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SingleFlight")
            .field("inflight", &inflight)
            .finish()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `compute` for `key`, or joins the computation already in flight.
    ///
    /// `compute` is only called when this caller becomes the leader.
    pub async fn run<F, Fut>(&self, key: K, compute: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (shared, leader) = {
            let mut inflight = self
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match inflight.get(&key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let registry = Arc::clone(&self.inflight);
                    let release = key.clone();
                    let future = compute();
                    let shared = async move {
                        let value = future.await;
                        registry
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&release);
                        value
                    }
                    .boxed()
                    .shared();

                    inflight.insert(key, shared.clone());
                    (shared, true)
                }
            }
        };

        Flight {
            value: shared.await,
            leader,
        }
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let group: SingleFlight<&'static str, u32> = SingleFlight::new();
        let calls = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let group = group.clone();
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    group
                        .run("landscape", move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            42
                        })
                        .await
                })
            })
            .collect();

        let mut leaders = 0;
        for task in tasks {
            let flight = task.await.unwrap();
            assert_eq!(flight.value, 42);
            leaders += u32::from(flight.leader);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_recompute() {
        let group: SingleFlight<u8, u32> = SingleFlight::new();
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let flight = group
                .run(1, move || async move { calls.fetch_add(1, Ordering::SeqCst) })
                .await;
            assert!(flight.leader);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let group: SingleFlight<u8, u8> = SingleFlight::new();
        let (a, b) = tokio::join!(
            group.run(1, || async { 1 }),
            group.run(2, || async { 2 })
        );
        assert_eq!((a.value, b.value), (1, 2));
        assert!(a.leader && b.leader);
    }
}
