//! Observer registry shared by the heartbeat publisher and monitor.
//!
//! Registration appends under a lock; dispatch snapshots the list, releases
//! the lock, and runs each observer on its own task under a timeout. A slow
//! or stuck observer can neither block the caller nor its siblings.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Async observer of events of type `T`
pub type Callback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`Callback`]
pub fn callback<T, F, Fut>(f: F) -> Callback<T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

pub struct CallbackRegistry<T> {
    name: &'static str,
    callbacks: Mutex<Vec<Callback<T>>>,
    timeout: Duration,
}

impl<T> std::fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks.lock().len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T> CallbackRegistry<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(name: &'static str, timeout: Duration) -> Self {
        Self {
            name,
            callbacks: Mutex::new(Vec::new()),
            timeout,
        }
    }

    pub fn register(&self, callback: Callback<T>) {
        self.callbacks.lock().push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn one task per registered callback; returns their handles
    pub fn dispatch(&self, event: T) -> Vec<JoinHandle<()>> {
        let snapshot: Vec<Callback<T>> = self.callbacks.lock().clone();
        let name = self.name;
        let timeout = self.timeout;

        snapshot
            .into_iter()
            .enumerate()
            .map(|(index, callback)| {
                let event = event.clone();
                tokio::spawn(async move {
                    if tokio::time::timeout(timeout, callback(event)).await.is_err() {
                        warn!(
                            registry = name,
                            callback_index = index,
                            timeout_ms = timeout.as_millis() as u64,
                            "⏰ Callback timed out"
                        );
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_dispatch_reaches_every_callback() {
        let registry = CallbackRegistry::<u32>::new("test", Duration::from_secs(1));
        let total = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let total = total.clone();
            registry.register(callback(move |value: u32| {
                let total = total.clone();
                async move {
                    total.fetch_add(value, Ordering::SeqCst);
                }
            }));
        }

        for handle in registry.dispatch(2) {
            handle.await.unwrap();
        }
        assert_eq!(total.load(Ordering::SeqCst), 6);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_callback_is_cut_off() {
        let registry = CallbackRegistry::<()>::new("test", Duration::from_millis(50));
        let finished = Arc::new(AtomicU32::new(0));
        let fast_finished = finished.clone();

        registry.register(callback(|_: ()| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));
        registry.register(callback(move |_: ()| {
            let finished = fast_finished.clone();
            async move {
                finished.fetch_add(1, Ordering::SeqCst);
            }
        }));

        for handle in registry.dispatch(()) {
            handle.await.unwrap();
        }
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_registry_dispatches_nothing() {
        let registry = CallbackRegistry::<u32>::new("test", Duration::from_secs(1));
        assert!(registry.is_empty());
        assert!(registry.dispatch(1).is_empty());
    }
}
