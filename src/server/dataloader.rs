use std::collections::HashMap;
use std::fmt::Debug;
use std::future::poll_fn;
use std::hash::Hash;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::task::{self, Poll, Waker};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::LoadError;

/// Outcome of one bulk fetch: either one entry per requested key, or a failure of the whole batch.
pub type BatchResult<V> = Result<Vec<Result<V, LoadError>>, LoadError>;

/// The bulk-fetch half of a [`DataLoader`].
pub trait BatchFn: Send + Sync + 'static {
    type K: Hash + Eq + Clone + Debug + Send + Sync + 'static;
    type V: Clone + Send + Sync + 'static;

    /// Fetches all `keys` in one round trip.
    ///
    /// On success the returned vector must have exactly `keys.len()` entries, entry `i` belonging
    /// to `keys[i]`. The future must not borrow `self`, so implementations clone whatever handle
    /// they need into it.
    fn load_batch(
        &self,
        keys: Vec<Self::K>,
    ) -> impl Future<Output = BatchResult<Self::V>> + Send + 'static;
}

enum Slot<V> {
    Pending(Vec<Waker>),
    Settled(Result<V, LoadError>),
}

/// A write-once handle to a value that is being loaded.
///
/// Every clone observes the same slot, and awaiting any of them yields the same settlement.
/// A `Deferred` only makes progress while the loader that produced it is being driven
/// (see [`drive`]).
pub struct Deferred<V> {
    slot: Arc<Mutex<Slot<V>>>,
}

impl<V> Clone for Deferred<V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<V> Deferred<V> {
    fn pending() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Pending(vec![]))),
        }
    }

    fn settled(result: Result<V, LoadError>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Settled(result))),
        }
    }

    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Settled(_))
    }

    /// Settles the slot and wakes every observer. Later calls are ignored.
    fn settle(&self, result: Result<V, LoadError>) {
        let mut slot = self.slot.lock();
        let Slot::Pending(wakers) = &mut *slot else {
            return;
        };
        let wakers = std::mem::take(wakers);
        *slot = Slot::Settled(result);
        drop(slot);

        for w in wakers {
            w.wake();
        }
    }
}

impl<V: Clone> Future for Deferred<V> {
    type Output = Result<V, LoadError>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Settled(result) => Poll::Ready(result.clone()),
            Slot::Pending(wakers) => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

struct LoaderInner<K, V> {
    cache: HashMap<K, Deferred<V>>,
    /// Keys requested since the last flush, in first-requested order.
    pending: Vec<(K, Deferred<V>)>,
}

/// Deduplicates and batches key-based loads for the lifetime of one operation.
pub struct DataLoader<B: BatchFn> {
    batch_fn: Arc<B>,
    inner: Arc<Mutex<LoaderInner<B::K, B::V>>>,
}

impl<B: BatchFn> Clone for DataLoader<B> {
    fn clone(&self) -> Self {
        Self {
            batch_fn: self.batch_fn.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<B: BatchFn> DataLoader<B> {
    pub fn new(batch_fn: B) -> Self {
        let inner = LoaderInner {
            cache: Default::default(),
            pending: Default::default(),
        };
        Self {
            batch_fn: Arc::new(batch_fn),
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<B>()
    }

    /// Requests `key`.
    ///
    /// The key is registered right away: a cache hit returns the existing handle, a miss queues
    /// the key for the next flush. Nothing is fetched until the loader is driven.
    pub fn load(&self, key: B::K) -> Deferred<B::V> {
        let mut inner = self.inner.lock();
        if let Some(deferred) = inner.cache.get(&key) {
            return deferred.clone();
        }

        tracing::trace!(loader = self.name(), ?key, "queueing key");
        let deferred = Deferred::pending();
        inner.cache.insert(key.clone(), deferred.clone());
        inner.pending.push((key, deferred.clone()));
        deferred
    }

    /// Calls [`load`](Self::load) for every key; duplicates share one handle.
    pub fn load_many(&self, keys: impl IntoIterator<Item = B::K>) -> Vec<Deferred<B::V>> {
        keys.into_iter().map(|key| self.load(key)).collect()
    }

    /// Seeds the cache with a known value. Does nothing if `key` is already cached.
    pub fn prime(&self, key: B::K, value: B::V) {
        self.inner
            .lock()
            .cache
            .entry(key)
            .or_insert_with(|| Deferred::settled(Ok(value)));
    }

    /// Forgets `key`, so the next load fetches it again.
    ///
    /// Handles that were already given out still settle with the result of their own batch.
    /// Loading the key again before that batch is flushed does not fetch it twice: both handles
    /// settle from the same fetch.
    #[allow(dead_code)]
    pub fn clear(&self, key: &B::K) {
        self.inner.lock().cache.remove(key);
    }

    #[allow(dead_code)]
    pub fn clear_all(&self) {
        self.inner.lock().cache.clear();
    }

    /// Drives `fut` to completion, flushing this loader whenever `fut` stalls.
    #[cfg(test)]
    pub async fn wrap<O>(&self, fut: impl Future<Output = O>) -> O {
        let loaders: [&dyn Flush; 1] = [self];
        drive(&loaders, fut).await
    }
}

/// A loader that can be flushed by [`drive`].
pub trait Flush: Send + Sync {
    /// Takes the pending batch and returns the future that fetches and settles it, or `None`
    /// if nothing is pending.
    fn start_flush(&self) -> Option<BoxFuture<'static, ()>>;
}

impl<B: BatchFn> Flush for DataLoader<B> {
    fn start_flush(&self) -> Option<BoxFuture<'static, ()>> {
        let pending = {
            let mut inner = self.inner.lock();
            if inner.pending.is_empty() {
                return None;
            }
            std::mem::take(&mut inner.pending)
        };

        let name = self.name();
        let batch = dedup_pending(pending);
        let keys: Vec<B::K> = batch.iter().map(|(k, _)| k.clone()).collect();
        tracing::debug!(loader = name, batch_size = keys.len(), ?keys, "flushing batch");

        let load = self.batch_fn.load_batch(keys);
        Some(
            async move {
                let outcome = load.await;
                settle_batch(name, batch, outcome);
            }
            .boxed(),
        )
    }
}

/// Merges handles queued under the same key, which happens when a key is cleared and loaded
/// again before its batch was flushed.
fn dedup_pending<K: Hash + Eq + Clone, V>(
    pending: Vec<(K, Deferred<V>)>,
) -> Vec<(K, Vec<Deferred<V>>)> {
    let mut batch: Vec<(K, Vec<Deferred<V>>)> = Vec::with_capacity(pending.len());
    let mut index: HashMap<K, usize> = HashMap::with_capacity(pending.len());
    for (key, deferred) in pending {
        match index.get(&key) {
            Some(&i) => batch[i].1.push(deferred),
            None => {
                index.insert(key.clone(), batch.len());
                batch.push((key, vec![deferred]));
            }
        }
    }
    batch
}

fn settle_batch<K, V: Clone>(
    loader: &str,
    batch: Vec<(K, Vec<Deferred<V>>)>,
    outcome: BatchResult<V>,
) {
    let err = match outcome {
        Ok(results) if results.len() == batch.len() => {
            for ((_, handles), result) in batch.into_iter().zip(results) {
                for deferred in handles {
                    deferred.settle(result.clone());
                }
            }
            return;
        }
        Ok(results) => {
            let err = LoadError::BatchSize {
                expected: batch.len(),
                actual: results.len(),
            };
            tracing::error!(loader, %err, "batch function broke its contract");
            err
        }
        Err(err) => {
            tracing::warn!(loader, %err, batch_size = batch.len(), "batch load failed");
            err
        }
    };

    for deferred in batch.into_iter().flat_map(|(_, handles)| handles) {
        deferred.settle(Err(err.clone()));
    }
}

/// Runs `fut` while flushing `loaders` at every point where it cannot make progress.
///
/// Each poll of `fut` lets all of its resolvers run until they block on a [`Deferred`]; the
/// keys they registered are then flushed together, at most one bulk fetch per loader.
/// `fut` is not polled again until every fetch of that cycle has settled, so cycles of the
/// same loader never overlap.
pub async fn drive<O>(loaders: &[&dyn Flush], fut: impl Future<Output = O>) -> O {
    let mut in_flight: Vec<BoxFuture<'static, ()>> = Vec::new();

    let mut fut = pin!(fut);
    poll_fn(move |cx| {
        in_flight.retain_mut(|flush| flush.as_mut().poll(cx).is_pending());
        if !in_flight.is_empty() {
            return Poll::Pending;
        }

        let res = fut.as_mut().poll(cx);
        if res.is_pending() {
            // We have polled the inner future once, during which it may have registered more
            // keys to load.
            in_flight.extend(loaders.iter().filter_map(|loader| loader.start_flush()));

            // Wake immediately, to instruct the runtime to call `poll` again.
            if !in_flight.is_empty() {
                cx.waker().wake_by_ref();
            }
        }
        res
    })
    .await
}
