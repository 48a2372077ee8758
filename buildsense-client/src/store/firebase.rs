use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::sse::{EventDecoder, ServerEvent};
use super::{PushIdGenerator, RemoteStore, SnapshotStream, tree};
use crate::configs::settings::Store;
use crate::errors::StoreError;

/// Realtime database client over the REST and event-stream endpoints.
pub struct FirebaseStore {
    client: Client,
    database_url: String,
    auth_token: Option<String>,
    ids: PushIdGenerator,
}

impl FirebaseStore {
    pub fn new(database_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            database_url: database_url.into().trim_end_matches('/').to_string(),
            auth_token,
            ids: PushIdGenerator::new(),
        }
    }

    pub fn from_settings(store: &Store) -> Self {
        Self::new(store.database_url.clone(), store.auth_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied(message),
            _ => StoreError::Status {
                code: status.as_u16(),
                message,
            },
        })
    }

    async fn read(request: RequestBuilder) -> Result<Option<Value>, StoreError> {
        let value: Value = Self::send(request).await?.json().await?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Self::read(self.request(Method::GET, path)).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        Self::send(self.request(Method::PUT, path).json(&value)).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        Self::send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn push(&self, _collection: &str) -> Result<String, StoreError> {
        Ok(self.ids.generate())
    }

    async fn subscribe(&self, path: &str) -> Result<SnapshotStream, StoreError> {
        let request = self
            .request(Method::GET, path)
            .header(ACCEPT, "text/event-stream");
        let response = Self::send(request).await?;

        let mirror = EventMirror {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            decoder: EventDecoder::new(),
            root: Value::Null,
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(futures::stream::unfold(mirror, EventMirror::next).boxed())
    }

    async fn probe(&self) -> Result<(), StoreError> {
        let request = self.request(Method::GET, "").query(&[("shallow", "true")]);
        Self::read(request).await.map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Local copy of the subscribed subtree, rebuilt from `put` and `patch`
/// events. Every applied event yields the full subtree.
struct EventMirror {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: EventDecoder,
    root: Value,
    pending: VecDeque<Result<Option<Value>, StoreError>>,
    finished: bool,
}

type Snapshot = Result<Option<Value>, StoreError>;

impl EventMirror {
    async fn next(mut self) -> Option<(Snapshot, Self)> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some((item, self));
            }
            if self.finished {
                return None;
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in self.decoder.feed(&chunk) {
                        if let Some(item) = self.apply(event) {
                            self.pending.push_back(item);
                        }
                    }
                }
                Some(Err(error)) => {
                    self.finished = true;
                    self.pending.push_back(Err(error.into()));
                }
                None => {
                    self.finished = true;
                    self.pending
                        .push_back(Err(StoreError::Subscription("event stream closed".to_string())));
                }
            }
        }
    }

    fn apply(&mut self, event: ServerEvent) -> Option<Snapshot> {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: EventPayload = match serde_json::from_str(&event.data) {
                    Ok(payload) => payload,
                    Err(error) => return Some(Err(error.into())),
                };
                let base = tree::segments(&payload.path);

                if event.event == "put" {
                    tree::write(&mut self.root, &base, payload.data);
                } else if let Value::Object(children) = payload.data {
                    for (child, value) in children {
                        let mut segments = base.clone();
                        segments.extend(tree::segments(&child));
                        tree::write(&mut self.root, &segments, value);
                    }
                }

                Some(Ok((!self.root.is_null()).then(|| self.root.clone())))
            }
            "cancel" => {
                self.finished = true;
                Some(Err(StoreError::PermissionDenied(format!("subscription cancelled: {}", event.data))))
            }
            "auth_revoked" => {
                self.finished = true;
                Some(Err(StoreError::PermissionDenied("credential expired".to_string())))
            }
            _ => None,
        }
    }
}
