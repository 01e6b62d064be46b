//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use knox_client::codec::Envelope;
use knox_client::{HttpRequest, Transport, TransportError};
use serde::Serialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport that records every request and replays queued bodies
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_raw(&self, body: impl Into<Vec<u8>>) {
        self.responses.lock().unwrap().push_back(Ok(body.into()));
    }

    /// Queue a success envelope around `data`
    pub fn respond_ok<T: Serialize>(&self, data: T) {
        let body = serde_json::to_vec(&Envelope::ok("test", 1234567890, data)).unwrap();
        self.respond_raw(body);
    }

    pub fn respond_error(&self, code: i64, message: &str) {
        let body = json!({
            "status": "error",
            "code": code,
            "host": "test",
            "ts": 1234567890,
            "message": message,
            "data": null,
        });
        self.respond_raw(serde_json::to_vec(&body).unwrap());
    }

    pub fn fail_with(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(TransportError::Connection(message)),
            None => Err(TransportError::Connection("no response queued".to_string())),
        }
    }
}
