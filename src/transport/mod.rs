use std::time::Duration;

use thiserror::Error;

pub mod http;

#[cfg(test)]
pub mod fake_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    // JSON encoded.
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    // The store refused the credentials the request carried.
    pub fn is_rejection(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("error connecting to {url}")]
    Connect {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("protocol error talking to {url}")]
    Protocol {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Sends one request and returns one response. A response with any status
/// code is a success at this level; only failing to get one is an error.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
