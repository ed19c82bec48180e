use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::client::RemoteApi;
use super::query::ApiQuery;
use crate::error::ApiError;

#[derive(Clone, Debug)]
enum Reply {
    Payload(Value),
    Status(u16),
    Transport,
}

/// In-memory `RemoteApi` answering from a script, for testing and offline
/// demos. Unscripted queries answer 404, i.e. nothing exists yet.
#[derive(Clone, Default)]
pub struct ScriptedRemote {
    replies: Arc<Mutex<HashMap<ApiQuery, Reply>>>,
    calls: Arc<Mutex<Vec<ApiQuery>>>,
}

impl ScriptedRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, query: ApiQuery, reply: Reply) {
        if let Ok(mut guard) = self.replies.lock() {
            guard.insert(query, reply);
        }
    }

    /// Answer `query` with `payload` from now on.
    pub fn respond(&self, query: ApiQuery, payload: Value) {
        self.script(query, Reply::Payload(payload));
    }

    /// Answer `query` with a non-success `status` (404 included).
    pub fn status(&self, query: ApiQuery, status: u16) {
        self.script(query, Reply::Status(status));
    }

    /// Fail `query` as if the network were down.
    pub fn unreachable(&self, query: ApiQuery) {
        self.script(query, Reply::Transport);
    }

    /// Every query received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiQuery> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn fetch(&self, query: &ApiQuery) -> Result<Value, ApiError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.clone());
        }
        let reply = self
            .replies
            .lock()
            .map_err(|err| ApiError::Transport(err.to_string()))?
            .get(query)
            .cloned();

        match reply {
            Some(Reply::Payload(value)) => Ok(value),
            None | Some(Reply::Status(404)) => Err(ApiError::NotFound(query.path())),
            Some(Reply::Status(code)) => Err(ApiError::Status {
                status: reqwest::StatusCode::from_u16(code)
                    .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                path: query.path(),
            }),
            Some(Reply::Transport) => Err(ApiError::Transport("connection refused".into())),
        }
    }
}
