use std::sync::Mutex;

use serde_json::Value;

use super::{HttpRequest, HttpResponse, Transport, TransportError};

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// In-memory stand-in for the store. Answers every request with `handler`
/// and keeps a log of what was sent.
pub struct FakeStore {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeStore {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(vec![]),
        }
    }

    /// Answers everything with the same status and JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(move |_| Ok(respond(status, &body)))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn respond(status: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status,
        body: serde_json::to_vec(body).unwrap(),
    }
}

pub fn body_json(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).unwrap()
}

/// Answers a multi-metric query with the records it asked for.
pub fn serve_records(records: Vec<Value>) -> impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> {
    move |request| {
        let asked = body_json(request);
        let asked: Vec<&str> = asked["metrics"]
            .as_array()
            .map(|m| m.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let metrics: Vec<Value> = records
            .iter()
            .filter(|r| r["metric"].as_str().map_or(false, |m| asked.contains(&m)))
            .cloned()
            .collect();
        Ok(respond(200, &serde_json::json!({ "metrics": metrics })))
    }
}

impl Transport for FakeStore {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}
