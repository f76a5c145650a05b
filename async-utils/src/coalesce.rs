use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::Instrument;
use tracing::debug;

/// Delivered to waiters when the task driving their key was dropped or
/// panicked before producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("in-flight task was dropped before it settled")]
pub struct Abandoned;

type Waiters<V, E> = Vec<oneshot::Sender<Result<V, E>>>;

/// Merges concurrent requests for the same key into a single task.
///
/// The first caller for a key runs the factory; the resulting future is
/// spawned onto the runtime and every caller that arrives while it is
/// pending waits for the same result. The pending entry is removed before
/// the result is delivered, whether the task succeeded, failed, or was
/// abandoned, so a later call for the key always starts fresh.
///
/// Dropping a caller never cancels the spawned task.
pub struct Coalescer<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

struct Inner<K, V, E> {
    pending: Mutex<HashMap<K, Waiters<V, E>>>,
    in_flight: watch::Sender<usize>,
}

impl<K, V, E> Clone for Coalescer<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> Default for Coalescer<K, V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> Coalescer<K, V, E> {
    pub fn new() -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                in_flight,
            }),
        }
    }

    /// Number of keys with a task currently in flight.
    pub fn len(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until no key is pending.
    pub async fn settled(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl<K, V, E> Coalescer<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
    E: Clone + From<Abandoned> + Send + 'static,
{
    pub fn in_flight(&self, key: &K) -> bool {
        self.inner.pending.lock().contains_key(key)
    }

    pub async fn resolve<F, Fut>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let rx = self.start_or_join(key, factory);
        rx.await.unwrap_or_else(|_| Err(E::from(Abandoned)))
    }

    fn start_or_join<F, Fut>(&self, key: K, factory: F) -> oneshot::Receiver<Result<V, E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        if !self.join_or_register(&key, tx) {
            debug!(?key, "joining in-flight resolution");
            return rx;
        }

        // Created before the factory runs so a panicking factory still
        // releases the slot.
        let guard = SettleGuard {
            inner: Arc::clone(&self.inner),
            key: Some(key),
        };
        let task = factory();
        tokio::spawn(
            async move {
                let result = task.await;
                guard.settle(result);
            }
            .in_current_span(),
        );
        rx
    }

    fn join_or_register(&self, key: &K, tx: oneshot::Sender<Result<V, E>>) -> bool {
        let mut pending = self.inner.pending.lock();
        if let Some(waiters) = pending.get_mut(key) {
            waiters.push(tx);
            return false;
        }
        pending.insert(key.clone(), vec![tx]);
        self.inner.in_flight.send_modify(|count| *count += 1);
        true
    }
}

impl<K: Eq + Hash, V, E> Inner<K, V, E> {
    fn release(&self, key: &K) -> Waiters<V, E> {
        let waiters = self.pending.lock().remove(key);
        if waiters.is_some() {
            self.in_flight
                .send_modify(|count| *count = count.saturating_sub(1));
        }
        waiters.unwrap_or_default()
    }
}

struct SettleGuard<K: Eq + Hash, V, E> {
    inner: Arc<Inner<K, V, E>>,
    key: Option<K>,
}

impl<K: Eq + Hash, V: Clone, E: Clone> SettleGuard<K, V, E> {
    fn settle(mut self, result: Result<V, E>) {
        let Some(key) = self.key.take() else {
            return;
        };
        for waiter in self.inner.release(&key) {
            let _ = waiter.send(result.clone());
        }
    }
}

impl<K: Eq + Hash, V, E> Drop for SettleGuard<K, V, E> {
    fn drop(&mut self) {
        // Dropping the senders wakes every waiter with `Abandoned`.
        if let Some(key) = self.key.take() {
            drop(self.inner.release(&key));
        }
    }
}
