//! In-memory [`RemoteStore`] double for tests.
//!
//! Responses are scripted per `METHOD path`; every call is recorded in order
//! so tests can assert which requests were issued and when. The last scripted
//! response for a route is reused for any further calls.

use crate::error::{Failure, Result};
use crate::store::{Method, RemoteStore, Route};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A request the scripted store received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RecordedCall {
    /// `"PUT /api/admin/users/1/role"`
    pub fn line(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

#[derive(Default)]
pub struct ScriptedStore {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body for `"METHOD /path"`
    pub fn ok(self, line: &str, body: Value) -> Self {
        self.push(line, Ok(body));
        self
    }

    /// Queue a failure for `"METHOD /path"`
    pub fn fail(self, line: &str, failure: Failure) -> Self {
        self.push(line, Err(failure));
        self
    }

    /// Queue an HTTP error status with an optional body
    pub fn status(self, line: &str, status: u16, body: &str) -> Self {
        self.fail(line, Failure::from_status(status, body))
    }

    pub fn push(&self, line: &str, response: Result<Value>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(line.to_string())
                .or_default()
                .push_back(response);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Recorded calls as `"METHOD /path"` lines
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::line).collect()
    }

    /// Calls other than list fetches
    pub fn mutation_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|c| c.method != Method::Get)
            .map(RecordedCall::line)
            .collect()
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn execute(&self, route: &Route, body: Option<Value>) -> Result<Value> {
        let line = route.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                method: route.method,
                path: route.path.clone(),
                body,
            });
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| Failure::network("scripted store poisoned"))?;
        let queue = responses.get_mut(&line).ok_or_else(|| {
            Failure::network(format!("no scripted response for {}", line))
        })?;
        match queue.len() {
            0 => Err(Failure::network(format!("no scripted response for {}", line))),
            1 => queue.front().cloned().unwrap_or(Ok(Value::Null)),
            _ => queue.pop_front().unwrap_or(Ok(Value::Null)),
        }
    }
}
