use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{PushIdGenerator, RemoteStore, SnapshotStream, tree};
use crate::errors::StoreError;

const CONNECTED_PATH: [&str; 2] = [".info", "connected"];

type SnapshotSender = mpsc::UnboundedSender<Result<Option<Value>, StoreError>>;

struct Watcher {
    segments: Vec<String>,
    last: Option<Value>,
    sender: SnapshotSender,
}

impl Watcher {
    fn current(&self, root: &Value) -> Option<Value> {
        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        tree::value_at(root, &segments).cloned()
    }
}

struct State {
    root: Value,
    watchers: Vec<Watcher>,
    offline: bool,
    report_connected: bool,
}

/// In-process store with the same write and notification semantics as the
/// realtime database. Watchers receive the full value at their path, once on
/// registration and again after every write that changes it.
pub struct MemoryStore {
    state: Mutex<State>,
    ids: PushIdGenerator,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_root(Value::Null)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: Value) -> Self {
        Self {
            state: Mutex::new(State {
                root: tree::normalize(root),
                watchers: Vec::new(),
                offline: false,
                report_connected: true,
            }),
            ids: PushIdGenerator::new(),
        }
    }

    /// Whole tree as currently stored.
    pub fn snapshot(&self) -> Value {
        self.lock().root.clone()
    }

    /// While offline every operation fails with [`StoreError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Controls what `.info/connected` reads as while online.
    pub fn set_report_connected(&self, connected: bool) {
        self.lock().report_connected = connected;
    }

    /// Delivers a subscription error to every live watcher.
    pub fn fail_subscriptions(&self, message: &str) {
        let mut state = self.lock();
        state
            .watchers
            .retain(|watcher| watcher.sender.send(Err(StoreError::Subscription(message.to_string()))).is_ok());
    }

    /// Registrations whose stream has not been dropped yet.
    pub fn watcher_count(&self) -> usize {
        let mut state = self.lock();
        state.watchers.retain(|watcher| !watcher.sender.is_closed());
        state.watchers.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn online(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self.lock();
        if state.offline {
            return Err(StoreError::Unreachable);
        }
        Ok(state)
    }

    fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut state = self.online()?;
        tree::write(&mut state.root, &tree::segments(path), value);

        let State { root, watchers, .. } = &mut *state;
        watchers.retain_mut(|watcher| {
            let current = watcher.current(root);
            if current == watcher.last {
                return !watcher.sender.is_closed();
            }
            watcher.last = current.clone();
            watcher.sender.send(Ok(current)).is_ok()
        });

        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let state = self.online()?;
        let segments = tree::segments(path);

        if segments == CONNECTED_PATH {
            return Ok(Some(Value::Bool(state.report_connected)));
        }

        Ok(tree::value_at(&state.root, &segments).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.write(path, value)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.write(path, Value::Null)
    }

    async fn push(&self, _collection: &str) -> Result<String, StoreError> {
        drop(self.online()?);
        Ok(self.ids.generate())
    }

    async fn subscribe(&self, path: &str) -> Result<SnapshotStream, StoreError> {
        let mut state = self.online()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut watcher = Watcher {
            segments: tree::segments(path).into_iter().map(str::to_string).collect(),
            last: None,
            sender,
        };
        watcher.last = watcher.current(&state.root);
        // Receiver is still held, so the first send cannot fail.
        let _ = watcher.sender.send(Ok(watcher.last.clone()));
        state.watchers.push(watcher);

        Ok(UnboundedReceiverStream::new(receiver).boxed())
    }
}
