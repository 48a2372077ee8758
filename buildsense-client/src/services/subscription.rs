use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use futures::stream::BoxStream;
use uuid::Uuid;

type Disposer = Box<dyn FnOnce() + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shared half of a subscription, kept by the adapter so that cleanup can
/// dispose registrations the caller still holds.
pub(crate) struct Registration {
    id: Uuid,
    label: String,
    dispose: Mutex<Option<Disposer>>,
}

impl Registration {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn is_active(&self) -> bool {
        lock(&self.dispose).is_some()
    }

    /// Runs the disposer once. Returns whether this call disposed it.
    pub(crate) fn dispose(&self) -> bool {
        let dispose = lock(&self.dispose).take();
        match dispose {
            Some(dispose) => {
                dispose();
                true
            }
            None => false,
        }
    }
}

/// Handle to a live change registration. Unsubscribing is idempotent and
/// synchronous: once it returns the callback never runs again. Dropping the
/// handle unsubscribes too.
pub struct Subscription {
    inner: Arc<Registration>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Registration {
                id: Uuid::new_v4(),
                label: label.into(),
                dispose: Mutex::new(Some(Box::new(dispose))),
            }),
        }
    }

    pub fn label(&self) -> &str {
        self.inner.label()
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn unsubscribe(&self) {
        self.inner.dispose();
    }

    pub(crate) fn registration(&self) -> Arc<Registration> {
        Arc::clone(&self.inner)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id())
            .field("label", &self.inner.label())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Spawns a task feeding every item of `stream` to `callback`, returning the
/// closure that stops it.
///
/// The callback runs under its slot lock and stopping empties the slot under
/// the same lock, so no invocation starts or is still running once the stop
/// closure returns. A callback must not stop its own listener.
pub(crate) fn spawn_listener<T, F>(stream: BoxStream<'static, T>, callback: F) -> impl FnOnce() + Send + 'static
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let slot: Arc<Mutex<Option<Box<dyn FnMut(T) + Send>>>> = Arc::new(Mutex::new(Some(Box::new(callback))));
    let task_slot = Arc::clone(&slot);

    let handle = tokio::spawn(async move {
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            let mut callback = lock(&task_slot);
            match callback.as_mut() {
                Some(callback) => callback(item),
                None => break,
            }
        }
    });

    move || {
        lock(&slot).take();
        handle.abort();
    }
}

pub fn listen<T, F>(label: impl Into<String>, stream: BoxStream<'static, T>, callback: F) -> Subscription
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    Subscription::new(label, spawn_listener(stream, callback))
}
